//! Labeled grid types produced by the assembler.

use std::cmp::Ordering;
use std::collections::BTreeMap;

use chrono::NaiveDate;
use ndarray::{Array2, Array3};
use serde::{Deserialize, Serialize};

/// String attributes attached to arrays and coordinates.
pub type Attributes = BTreeMap<String, String>;

/// Dimension names of a [`LabeledArray`], in storage order.
pub const DATA_DIMS: [&str; 3] = ["time", "lat", "lon"];

/// Dimension names of a [`LabeledMask`].
pub const MASK_DIMS: [&str; 2] = ["lat", "lon"];

/// Values of a coordinate axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "values", rename_all = "snake_case")]
pub enum CoordValues {
    Float(Vec<f64>),
    Date(Vec<NaiveDate>),
}

impl CoordValues {
    pub fn len(&self) -> usize {
        match self {
            CoordValues::Float(v) => v.len(),
            CoordValues::Date(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_float(&self) -> Option<&[f64]> {
        match self {
            CoordValues::Float(v) => Some(v),
            CoordValues::Date(_) => None,
        }
    }

    pub fn as_dates(&self) -> Option<&[NaiveDate]> {
        match self {
            CoordValues::Date(v) => Some(v),
            CoordValues::Float(_) => None,
        }
    }

    /// Indices that stably sort the values ascending.
    ///
    /// Floats use IEEE total order, so NaN sorts last.
    pub fn sort_permutation(&self) -> Vec<usize> {
        let mut indices: Vec<usize> = (0..self.len()).collect();
        match self {
            CoordValues::Float(v) => indices.sort_by(|&a, &b| v[a].total_cmp(&v[b])),
            CoordValues::Date(v) => indices.sort_by(|&a, &b| v[a].cmp(&v[b])),
        }
        indices
    }

    /// Values reordered by `indices`.
    pub fn select(&self, indices: &[usize]) -> Self {
        match self {
            CoordValues::Float(v) => CoordValues::Float(indices.iter().map(|&i| v[i]).collect()),
            CoordValues::Date(v) => CoordValues::Date(indices.iter().map(|&i| v[i]).collect()),
        }
    }

    /// True when no value is followed by a smaller one.
    pub fn is_sorted(&self) -> bool {
        match self {
            CoordValues::Float(v) => v
                .windows(2)
                .all(|w| w[0].total_cmp(&w[1]) != Ordering::Greater),
            CoordValues::Date(v) => v.windows(2).all(|w| w[0] <= w[1]),
        }
    }
}

/// A named coordinate axis with its attributes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub name: String,
    pub values: CoordValues,
    pub attributes: Attributes,
}

impl Coordinate {
    pub fn new(name: impl Into<String>, values: CoordValues) -> Self {
        Self {
            name: name.into(),
            values,
            attributes: Attributes::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: &str) -> Self {
        self.attributes.insert(key.to_string(), value.to_string());
        self
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// A `(time, lat, lon)` data cube with coordinates and attributes.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledArray {
    pub name: String,
    pub data: Array3<f32>,
    pub time: Coordinate,
    pub lat: Coordinate,
    pub lon: Coordinate,
    pub attributes: Attributes,
}

impl LabeledArray {
    /// `(time, lat, lon)` lengths.
    pub fn shape(&self) -> (usize, usize, usize) {
        self.data.dim()
    }

    pub fn units(&self) -> Option<&str> {
        self.attributes.get("units").map(String::as_str)
    }
}

/// The land/sea mask as a `(lat, lon)` array.
#[derive(Debug, Clone, PartialEq)]
pub struct LabeledMask {
    pub data: Array2<i32>,
    pub lat: Coordinate,
    pub lon: Coordinate,
}

/// Output of [`crate::assemble`].
#[derive(Debug, Clone, PartialEq)]
pub struct AssembledGrid {
    pub array: LabeledArray,
    pub mask: LabeledMask,
}
