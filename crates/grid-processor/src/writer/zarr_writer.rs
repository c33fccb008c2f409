//! Zarr V3 writer for assembled grids.
//!
//! A grid is stored as a group holding one array per variable:
//!
//! ```text
//! /              group, data attributes + detected resolutions
//! /<name>        float32 (time, lat, lon), NaN fill
//! /time          int64 days since 1970-01-01, or float64 raw values
//! /lat, /lon     float64
//! /mask          int32 (lat, lon)
//! ```
//!
//! Every array carries an `_ARRAY_DIMENSIONS` attribute naming its axes.

use std::path::Path;
use std::sync::Arc;

use chrono::NaiveDate;
use dym_common::find_resolution;
use serde_json::{json, Map, Value};
use tracing::{debug, info};
use zarrs::array::codec::bytes_to_bytes::blosc::{
    BloscCodec, BloscCompressionLevel, BloscCompressor, BloscShuffleMode,
};
use zarrs::array::{ArrayBuilder, DataType, Element, FillValue};
use zarrs::array_subset::ArraySubset;
use zarrs::group::GroupBuilder;
use zarrs::storage::{ReadableStorageTraits, WritableStorageTraits};
use zarrs_filesystem::FilesystemStore;

use crate::config::{ZarrCompression, ZarrWriterConfig};
use crate::error::{GridProcessorError, Result};
use crate::types::{AssembledGrid, Attributes, CoordValues, Coordinate, DATA_DIMS, MASK_DIMS};

/// Units of an encoded date time axis.
pub const TIME_UNITS: &str = "days since 1970-01-01";

const RESERVED_NAMES: [&str; 4] = ["time", "lat", "lon", "mask"];

/// Summary of a written grid.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ZarrMetadata {
    /// Data array name.
    pub name: String,
    /// Grid dimensions (time, lat, lon).
    pub shape: (usize, usize, usize),
    /// Chunk dimensions of the data array.
    pub chunk_shape: Vec<u64>,
    /// Data type.
    pub dtype: String,
    /// Compression codec used.
    pub compression: String,
    /// Physical units, if known.
    pub units: Option<String>,
    /// Units of the time array when it holds dates.
    pub time_units: Option<String>,
    /// Most common spacing of the coordinate axes.
    pub lon_resolution: Option<f64>,
    pub lat_resolution: Option<f64>,
}

impl ZarrMetadata {
    /// Serialize to JSON.
    pub fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(self).unwrap_or_default()
    }
}

/// Result of writing a grid.
#[derive(Debug)]
pub struct ZarrWriteResult {
    pub metadata: ZarrMetadata,
    /// Total uncompressed bytes written.
    pub bytes_written: u64,
}

/// Writer for storing assembled grids as Zarr V3 groups.
pub struct ZarrWriter {
    config: ZarrWriterConfig,
}

impl ZarrWriter {
    /// Create a new ZarrWriter with the given configuration.
    pub fn new(config: ZarrWriterConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ZarrWriterConfig {
        &self.config
    }

    /// Write a grid into a directory on the local filesystem.
    pub fn write_to_path(&self, path: &Path, grid: &AssembledGrid) -> Result<ZarrWriteResult> {
        std::fs::create_dir_all(path)?;
        let store = FilesystemStore::new(path)
            .map_err(|e| GridProcessorError::storage_error(e.to_string()))?;
        self.write_grid(store, grid)
    }

    /// Write a grid as a Zarr group rooted at `/`.
    pub fn write_grid<S: ReadableStorageTraits + WritableStorageTraits + 'static>(
        &self,
        storage: S,
        grid: &AssembledGrid,
    ) -> Result<ZarrWriteResult> {
        self.config
            .validate()
            .map_err(GridProcessorError::ConfigError)?;

        let array = &grid.array;
        check_array_name(&array.name)?;
        let (ntime, nlat, nlon) = array.shape();

        let lon = float_values(&array.lon)?;
        let lat = float_values(&array.lat)?;
        let lon_resolution = find_resolution(lon);
        let lat_resolution = find_resolution(lat);

        let store = Arc::new(storage);

        // Group
        let mut group_attrs = to_json_map(&array.attributes);
        if let Some(res) = lon_resolution {
            group_attrs.insert("lon_resolution".to_string(), json!(res));
        }
        if let Some(res) = lat_resolution {
            group_attrs.insert("lat_resolution".to_string(), json!(res));
        }
        let group = GroupBuilder::new()
            .attributes(group_attrs)
            .build(store.clone(), "/")
            .map_err(|e| GridProcessorError::zarr_error(e.to_string()))?;
        group
            .store_metadata()
            .map_err(|e| GridProcessorError::storage_error(e.to_string()))?;

        let chunk_size = self.config.zarr_chunk_size;
        let chunk_shape = vec![1, chunk_edge(nlat, chunk_size), chunk_edge(nlon, chunk_size)];
        let mut bytes_written = 0;

        // Data
        let values: Vec<f32> = array.data.iter().copied().collect();
        bytes_written += self.write_array(
            &store,
            &format!("/{}", array.name),
            vec![ntime as u64, nlat as u64, nlon as u64],
            chunk_shape.clone(),
            DataType::Float32,
            FillValue::from(f32::NAN),
            with_dimensions(&array.attributes, &DATA_DIMS),
            &values,
        )?;

        // Coordinates
        for (coord, values) in [(&array.lat, lat), (&array.lon, lon)] {
            bytes_written += self.write_array(
                &store,
                &format!("/{}", coord.name),
                vec![values.len() as u64],
                vec![chunk_edge(values.len(), chunk_size)],
                DataType::Float64,
                FillValue::from(f64::NAN),
                with_dimensions(&coord.attributes, &[coord.name.as_str()]),
                values,
            )?;
        }

        let time_path = format!("/{}", array.time.name);
        let time_dims = [array.time.name.as_str()];
        let time_chunks = vec![chunk_edge(ntime, chunk_size)];
        let mut time_attrs = with_dimensions(&array.time.attributes, &time_dims);
        let time_units = match &array.time.values {
            CoordValues::Date(dates) => {
                time_attrs.insert("units".to_string(), json!(TIME_UNITS));
                time_attrs.insert("calendar".to_string(), json!("proleptic_gregorian"));
                let days: Vec<i64> = dates.iter().map(|d| days_since_epoch(*d)).collect();
                bytes_written += self.write_array(
                    &store,
                    &time_path,
                    vec![ntime as u64],
                    time_chunks,
                    DataType::Int64,
                    FillValue::from(i64::MIN),
                    time_attrs,
                    &days,
                )?;
                Some(TIME_UNITS.to_string())
            }
            CoordValues::Float(values) => {
                bytes_written += self.write_array(
                    &store,
                    &time_path,
                    vec![ntime as u64],
                    time_chunks,
                    DataType::Float64,
                    FillValue::from(f64::NAN),
                    time_attrs,
                    values,
                )?;
                None
            }
        };

        // Mask
        let mask = &grid.mask;
        let mask_values: Vec<i32> = mask.data.iter().copied().collect();
        let (mask_lat, mask_lon) = mask.data.dim();
        bytes_written += self.write_array(
            &store,
            "/mask",
            vec![mask_lat as u64, mask_lon as u64],
            vec![chunk_edge(mask_lat, chunk_size), chunk_edge(mask_lon, chunk_size)],
            DataType::Int32,
            FillValue::from(0i32),
            with_dimensions(&Attributes::new(), &MASK_DIMS),
            &mask_values,
        )?;

        info!(
            name = %array.name,
            ntime,
            nlat,
            nlon,
            compression = %self.config.zarr_compression,
            bytes_written,
            "Wrote Zarr grid"
        );

        Ok(ZarrWriteResult {
            metadata: ZarrMetadata {
                name: array.name.clone(),
                shape: (ntime, nlat, nlon),
                chunk_shape,
                dtype: "float32".to_string(),
                compression: self.config.zarr_compression.as_str().to_string(),
                units: array.units().map(str::to_string),
                time_units,
                lon_resolution,
                lat_resolution,
            },
            bytes_written,
        })
    }

    /// Create, describe and fill one array. Returns the bytes written.
    #[allow(clippy::too_many_arguments)]
    fn write_array<S, T>(
        &self,
        store: &Arc<S>,
        path: &str,
        shape: Vec<u64>,
        chunk_shape: Vec<u64>,
        data_type: DataType,
        fill_value: FillValue,
        attrs: Map<String, Value>,
        values: &[T],
    ) -> Result<u64>
    where
        S: ReadableStorageTraits + WritableStorageTraits + 'static,
        T: Element,
    {
        let element_size = std::mem::size_of::<T>();

        let chunk_grid: zarrs::array::ChunkGrid = chunk_shape
            .try_into()
            .map_err(|e| GridProcessorError::ConfigError(format!("{:?}", e)))?;

        let mut binding = ArrayBuilder::new(shape.clone(), data_type, chunk_grid, fill_value);
        let mut builder = binding.attributes(attrs);

        if self.config.zarr_compression != ZarrCompression::None {
            let codec = self.create_compression_codec(element_size)?;
            builder = builder.bytes_to_bytes_codecs(vec![codec]);
        }

        let array = builder
            .build(store.clone(), path)
            .map_err(|e| GridProcessorError::StorageError(e.to_string()))?;
        array
            .store_metadata()
            .map_err(|e| GridProcessorError::StorageError(e.to_string()))?;

        if !values.is_empty() {
            let subset = ArraySubset::new_with_start_shape(vec![0; shape.len()], shape)
                .map_err(|e| GridProcessorError::StorageError(e.to_string()))?;
            array
                .store_array_subset_elements(&subset, values)
                .map_err(|e| GridProcessorError::StorageError(e.to_string()))?;
        }

        debug!(path, elements = values.len(), "Wrote Zarr array");
        Ok((values.len() * element_size) as u64)
    }

    /// Create the compression codec based on configuration.
    fn create_compression_codec(
        &self,
        element_size: usize,
    ) -> Result<Arc<dyn zarrs::array::codec::BytesToBytesCodecTraits>> {
        let level = BloscCompressionLevel::try_from(self.config.zarr_compression_level)
            .map_err(|_| GridProcessorError::ConfigError("Invalid compression level".to_string()))?;

        let shuffle = if self.config.zarr_shuffle {
            BloscShuffleMode::Shuffle
        } else {
            BloscShuffleMode::NoShuffle
        };

        // typesize is required when shuffle is enabled
        let typesize = if self.config.zarr_shuffle {
            Some(element_size)
        } else {
            None
        };

        let compressor = match self.config.zarr_compression {
            ZarrCompression::None => {
                return Err(GridProcessorError::ConfigError(
                    "No compression configured".to_string(),
                ))
            }
            ZarrCompression::BloscLz4 => BloscCompressor::LZ4,
            ZarrCompression::BloscZstd => BloscCompressor::Zstd,
        };

        let codec = BloscCodec::new(compressor, level, None, shuffle, typesize)
            .map_err(|e| GridProcessorError::ConfigError(e.to_string()))?;

        Ok(Arc::new(codec))
    }
}

fn check_array_name(name: &str) -> Result<()> {
    if name.is_empty() || name == "." || name == ".." || name.contains('/') || name.starts_with("__") {
        return Err(GridProcessorError::config_error(format!(
            "'{}' is not a valid Zarr array name",
            name
        )));
    }
    if RESERVED_NAMES.contains(&name) {
        return Err(GridProcessorError::config_error(format!(
            "array name '{}' collides with a coordinate array",
            name
        )));
    }
    Ok(())
}

fn float_values(coord: &Coordinate) -> Result<&[f64]> {
    coord.values.as_float().ok_or_else(|| {
        GridProcessorError::config_error(format!("coordinate '{}' must be numeric", coord.name))
    })
}

// Chunks must be non-empty even for zero-length axes.
fn chunk_edge(len: usize, chunk_size: usize) -> u64 {
    len.min(chunk_size).max(1) as u64
}

fn days_since_epoch(date: NaiveDate) -> i64 {
    // NaiveDate::default() is 1970-01-01
    date.signed_duration_since(NaiveDate::default()).num_days()
}

fn to_json_map(attrs: &Attributes) -> Map<String, Value> {
    attrs
        .iter()
        .map(|(k, v)| (k.clone(), Value::String(v.clone())))
        .collect()
}

fn with_dimensions(attrs: &Attributes, dims: &[&str]) -> Map<String, Value> {
    let mut map = to_json_map(attrs);
    map.insert("_ARRAY_DIMENSIONS".to_string(), json!(dims));
    map
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_days_since_epoch() {
        let d = |y, m, dd| NaiveDate::from_ymd_opt(y, m, dd).unwrap();
        assert_eq!(days_since_epoch(d(1970, 1, 1)), 0);
        assert_eq!(days_since_epoch(d(2000, 1, 15)), 10971);
        assert_eq!(days_since_epoch(d(1969, 12, 31)), -1);
    }

    #[test]
    fn test_chunk_edge() {
        assert_eq!(chunk_edge(0, 512), 1);
        assert_eq!(chunk_edge(10, 512), 10);
        assert_eq!(chunk_edge(1000, 512), 512);
    }

    #[test]
    fn test_array_name_rules() {
        assert!(check_array_name("skj_biomass").is_ok());
        assert!(check_array_name("").is_err());
        assert!(check_array_name("a/b").is_err());
        assert!(check_array_name("__zarr").is_err());
        assert!(check_array_name("lat").is_err());
        assert!(check_array_name("mask").is_err());
    }
}
