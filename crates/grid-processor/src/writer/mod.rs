//! Zarr export of assembled grids.

mod zarr_writer;

pub use zarr_writer::{ZarrMetadata, ZarrWriteResult, ZarrWriter, TIME_UNITS};
