//! Grid assembly and export for decoded DYM files.
//!
//! A decoded DYM file is a raw `(level, lat, lon)` cube plus per-cell
//! coordinate grids and a mask. This crate turns it into a labeled array:
//!
//! ```text
//! DecodedDym
//!      │
//!      ▼
//! assemble()
//!      │
//!      ├─► Extract lon/lat vectors from the coordinate grids
//!      ├─► Replace no-data values and land cells with NaN
//!      ├─► Sort time, lat and lon ascending
//!      └─► Optionally normalize longitudes to [-180, 180)
//!               │
//!               ▼
//!          AssembledGrid ──► ZarrWriter::write_grid()
//! ```
//!
//! # Example
//!
//! ```ignore
//! use grid_processor::{assemble_decoded, AssembleConfig, ZarrWriter, ZarrWriterConfig};
//!
//! let grid = assemble_decoded(decoded, &AssembleConfig::default())?;
//! ZarrWriter::new(ZarrWriterConfig::default())
//!     .write_to_path("skj.zarr".as_ref(), &grid)?;
//! ```

pub mod assemble;
pub mod config;
pub mod error;
pub mod types;
pub mod writer;

// Re-export commonly used types at crate root
pub use assemble::{
    assemble, assemble_decoded, normalize_grid_longitude, sort_grid, AssembleConfig,
    DEFAULT_NAME, DEFAULT_NODATA,
};
pub use config::{ZarrCompression, ZarrWriterConfig};
pub use error::{GridProcessorError, Result};
pub use types::{
    AssembledGrid, Attributes, CoordValues, Coordinate, LabeledArray, LabeledMask, DATA_DIMS,
    MASK_DIMS,
};
pub use writer::{ZarrMetadata, ZarrWriteResult, ZarrWriter, TIME_UNITS};
