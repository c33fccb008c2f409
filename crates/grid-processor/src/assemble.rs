//! Assembly of decoded DYM data into labeled, sorted grids.

use dym_common::{normalize_longitude, TimeAxis};
use dym_parser::DecodedDym;
use ndarray::{Array2, Array3, Axis};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{GridProcessorError, Result};
use crate::types::{AssembledGrid, Attributes, CoordValues, Coordinate, LabeledArray, LabeledMask};

/// Value marking missing cells in DYM data.
pub const DEFAULT_NODATA: f32 = -999.0;

/// Array name used when none is given.
pub const DEFAULT_NAME: &str = "Dymfile";

/// Assembly options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssembleConfig {
    /// Name of the data array.
    pub name: String,
    /// Optional `units` attribute.
    pub units: Option<String>,
    /// Cells equal to this value become NaN. `Some(0.0)` matches files
    /// written with zero as the missing value.
    pub nodata_value: Option<f32>,
    /// Map longitudes into `[-180, 180)` and re-sort.
    pub normalize_longitude: bool,
    /// Extra attributes for the data array. They override the generated
    /// ones on conflict.
    pub attributes: Attributes,
}

impl Default for AssembleConfig {
    fn default() -> Self {
        Self {
            name: DEFAULT_NAME.to_string(),
            units: None,
            nodata_value: Some(DEFAULT_NODATA),
            normalize_longitude: false,
            attributes: Attributes::new(),
        }
    }
}

/// Assemble a decoded file.
pub fn assemble_decoded(decoded: DecodedDym, config: &AssembleConfig) -> Result<AssembledGrid> {
    assemble(
        decoded.data,
        &decoded.mask,
        decoded.time,
        &decoded.lon_grid,
        &decoded.lat_grid,
        config,
    )
}

/// Build a labeled `(time, lat, lon)` array from raw decoded parts.
///
/// `data` is indexed `[level, lat, lon]`; `mask`, `lon_grid` and `lat_grid`
/// are indexed `[lon, lat]`. Longitudes come from the first latitude column
/// of `lon_grid` and latitudes from the first longitude row of `lat_grid`;
/// the grids are assumed separable.
///
/// Cells matching the no-data value or masked as land (mask `0`) become
/// NaN. Every axis is then sorted ascending.
pub fn assemble(
    data: Array3<f32>,
    mask: &Array2<i32>,
    time: TimeAxis,
    lon_grid: &Array2<f32>,
    lat_grid: &Array2<f32>,
    config: &AssembleConfig,
) -> Result<AssembledGrid> {
    let (nlevel, nlat, nlon) = data.dim();
    check_grid("lon_grid", lon_grid.dim(), (nlon, nlat))?;
    check_grid("lat_grid", lat_grid.dim(), (nlon, nlat))?;
    check_grid("mask", mask.dim(), (nlon, nlat))?;
    if time.len() != nlevel {
        return Err(GridProcessorError::shape_mismatch("time", nlevel, time.len()));
    }

    let lon: Vec<f64> = if nlat > 0 {
        lon_grid.column(0).iter().map(|&v| f64::from(v)).collect()
    } else {
        Vec::new()
    };
    let lat: Vec<f64> = if nlon > 0 {
        lat_grid.row(0).iter().map(|&v| f64::from(v)).collect()
    } else {
        Vec::new()
    };
    if lon.len() != nlon {
        return Err(GridProcessorError::shape_mismatch("lon", nlon, lon.len()));
    }
    if lat.len() != nlat {
        return Err(GridProcessorError::shape_mismatch("lat", nlat, lat.len()));
    }

    // mask is [lon, lat]; data and the labeled mask are [lat, lon]
    let mask = mask.t().to_owned();
    let mut data = data;
    for ((_, j, i), value) in data.indexed_iter_mut() {
        if config.nodata_value == Some(*value) || mask[[j, i]] == 0 {
            *value = f32::NAN;
        }
    }

    let time = match time {
        TimeAxis::Raw(values) => CoordValues::Float(values.into_iter().map(f64::from).collect()),
        TimeAxis::Dates(dates) => CoordValues::Date(dates),
    };

    let mut grid = AssembledGrid {
        array: LabeledArray {
            name: config.name.clone(),
            data,
            time: time_coordinate(time),
            lat: lat_coordinate(CoordValues::Float(lat.clone())),
            lon: lon_coordinate(CoordValues::Float(lon.clone())),
            attributes: data_attributes(config),
        },
        mask: LabeledMask {
            data: mask,
            lat: lat_coordinate(CoordValues::Float(lat)),
            lon: lon_coordinate(CoordValues::Float(lon)),
        },
    };

    sort_grid(&mut grid);
    if config.normalize_longitude {
        normalize_grid_longitude(&mut grid);
    }

    debug!(
        name = %grid.array.name,
        ntime = nlevel,
        nlat,
        nlon,
        normalized = config.normalize_longitude,
        "Assembled grid"
    );
    Ok(grid)
}

/// Map longitudes into `[-180, 180)` and re-sort every axis.
pub fn normalize_grid_longitude(grid: &mut AssembledGrid) {
    for lon in [&mut grid.array.lon, &mut grid.mask.lon] {
        if let CoordValues::Float(values) = &mut lon.values {
            for value in values.iter_mut() {
                *value = normalize_longitude(*value);
            }
        }
    }
    sort_grid(grid);
}

/// Stable ascending sort along time, lat and lon.
pub fn sort_grid(grid: &mut AssembledGrid) {
    let array = &mut grid.array;

    let order = array.time.values.sort_permutation();
    array.data = array.data.select(Axis(0), &order);
    array.time.values = array.time.values.select(&order);

    let order = array.lat.values.sort_permutation();
    array.data = array.data.select(Axis(1), &order);
    array.lat.values = array.lat.values.select(&order);

    let order = array.lon.values.sort_permutation();
    array.data = array.data.select(Axis(2), &order);
    array.lon.values = array.lon.values.select(&order);

    let mask = &mut grid.mask;

    let order = mask.lat.values.sort_permutation();
    mask.data = mask.data.select(Axis(0), &order);
    mask.lat.values = mask.lat.values.select(&order);

    let order = mask.lon.values.sort_permutation();
    mask.data = mask.data.select(Axis(1), &order);
    mask.lon.values = mask.lon.values.select(&order);
}

fn check_grid(name: &str, found: (usize, usize), expected: (usize, usize)) -> Result<()> {
    if found.0 != expected.0 {
        return Err(GridProcessorError::shape_mismatch(
            format!("{} lon", name),
            expected.0,
            found.0,
        ));
    }
    if found.1 != expected.1 {
        return Err(GridProcessorError::shape_mismatch(
            format!("{} lat", name),
            expected.1,
            found.1,
        ));
    }
    Ok(())
}

fn lat_coordinate(values: CoordValues) -> Coordinate {
    Coordinate::new("lat", values)
        .with_attribute("standard_name", "latitude")
        .with_attribute("long_name", "latitude")
        .with_attribute("units", "degrees_north")
}

fn lon_coordinate(values: CoordValues) -> Coordinate {
    Coordinate::new("lon", values)
        .with_attribute("standard_name", "longitude")
        .with_attribute("long_name", "longitude")
        .with_attribute("units", "degrees_east")
}

fn time_coordinate(values: CoordValues) -> Coordinate {
    Coordinate::new("time", values)
        .with_attribute("standard_name", "time")
        .with_attribute("long_name", "time")
}

fn data_attributes(config: &AssembleConfig) -> Attributes {
    let mut attrs = Attributes::new();
    attrs.insert("standard_name".to_string(), config.name.clone());
    attrs.insert("long_name".to_string(), config.name.clone());
    if let Some(units) = &config.units {
        attrs.insert("units".to_string(), units.clone());
    }
    for (key, value) in &config.attributes {
        attrs.insert(key.clone(), value.clone());
    }
    attrs
}
