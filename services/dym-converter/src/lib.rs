//! DYM to Zarr conversion.
//!
//! The `dymconvert` binary is a thin shell over [`convert::run`]; the
//! library half exists so the pipeline can be driven from tests.

pub mod config;
pub mod convert;

pub use config::{parse_attribute, Args, ConvertConfig, NoData, TimeAxisArg};
pub use convert::{run, ConversionReport};
