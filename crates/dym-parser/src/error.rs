//! Error types for DYM decoding.

use thiserror::Error;

/// Result type for DYM parser operations.
pub type DymResult<T> = Result<T, DymError>;

/// Error types for DYM decoding.
///
/// Every variant carries the name of the source being read (a path, or
/// `<buffer>` for in-memory input).
#[derive(Error, Debug)]
pub enum DymError {
    /// The source is not in a format this crate can decode, or not the
    /// format the caller asked for.
    #[error("{source_name}: {reason}")]
    Format { source_name: String, reason: String },

    /// The fixed header or one of the coordinate blocks could not be read.
    #[error("{source_name}: failed to read header")]
    HeaderRead {
        source_name: String,
        source: std::io::Error,
    },

    /// A data level could not be read.
    #[error("{source_name}: failed to read level {level} at byte offset {offset}")]
    LevelRead {
        source_name: String,
        level: usize,
        offset: u64,
        source: std::io::Error,
    },

    /// The declared dimensions need more bytes than the source holds.
    #[error("{source_name}: declared dimensions need {expected} bytes, source has {available}")]
    Truncated {
        source_name: String,
        expected: u64,
        available: u64,
    },

    /// Opening or seeking the source failed.
    #[error("{source_name}: I/O error")]
    Io {
        source_name: String,
        source: std::io::Error,
    },

    /// Header values are inconsistent (negative dimensions, out-of-range
    /// level index).
    #[error("{source_name}: invalid DYM data: {reason}")]
    Decode { source_name: String, reason: String },
}

impl DymError {
    pub fn format(source_name: &str, reason: impl Into<String>) -> Self {
        DymError::Format {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    pub fn header_read(source_name: &str, source: std::io::Error) -> Self {
        DymError::HeaderRead {
            source_name: source_name.to_string(),
            source,
        }
    }

    pub fn level_read(source_name: &str, level: usize, offset: u64, source: std::io::Error) -> Self {
        DymError::LevelRead {
            source_name: source_name.to_string(),
            level,
            offset,
            source,
        }
    }

    pub fn io(source_name: &str, source: std::io::Error) -> Self {
        DymError::Io {
            source_name: source_name.to_string(),
            source,
        }
    }

    pub fn decode(source_name: &str, reason: impl Into<String>) -> Self {
        DymError::Decode {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }

    /// True for failures caused by reading the underlying bytes.
    pub fn is_io(&self) -> bool {
        matches!(
            self,
            DymError::HeaderRead { .. }
                | DymError::LevelRead { .. }
                | DymError::Truncated { .. }
                | DymError::Io { .. }
        )
    }
}
