//! Decoder for DYM binary gridded time series.
//!
//! DYM files hold a stack of 2-D grids (one per time level) together with
//! the longitude/latitude of every cell, a land mask and fractional-year
//! dates. This crate sniffs the flavour of a file, decodes `DYM2` headers
//! and data blocks, and builds the time coordinate.
//!
//! ```no_run
//! use dym_common::Diagnostics;
//! use dym_parser::{decode, ByteSource, DecodeOptions};
//!
//! let mut diag = Diagnostics::new();
//! let source = ByteSource::from_path("skj_biomass.dym");
//! let decoded = decode(&source, &DecodeOptions::default(), &mut diag)?;
//! println!("{} levels", decoded.header.nlevel);
//! # Ok::<(), dym_parser::DymError>(())
//! ```

pub mod data;
pub mod decode;
pub mod error;
pub mod format;
pub mod header;
pub mod source;

pub use data::{read_all_levels, read_level, DymReader};
pub use decode::{build_time_axis, decode, decode_reader, is_decodable, DecodeOptions, DecodedDym};
pub use error::{DymError, DymResult};
pub use format::{sniff_bytes, sniff_file, sniff_source, FileFormat};
pub use header::{read_header, CoordinateGrids, DymFileHeader, DymHeader, FIXED_HEADER_SIZE};
pub use source::{ByteSource, SourceReader};
