//! Byte sources a DYM file can be decoded from.

use std::fs::File;
use std::io::{self, BufReader, Cursor, Read, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use bytes::Bytes;

use crate::error::{DymError, DymResult};

/// Name reported for in-memory sources.
pub const BUFFER_NAME: &str = "<buffer>";

/// Array name used when the source has no file name.
pub const DEFAULT_VARIABLE_NAME: &str = "Dymfile";

/// A filesystem path or an in-memory buffer.
#[derive(Debug, Clone)]
pub enum ByteSource {
    Path(PathBuf),
    Buffer(Bytes),
}

impl ByteSource {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        ByteSource::Path(path.into())
    }

    pub fn from_bytes(data: impl Into<Bytes>) -> Self {
        ByteSource::Buffer(data.into())
    }

    /// Name used in errors and logs.
    pub fn name(&self) -> String {
        match self {
            ByteSource::Path(path) => path.display().to_string(),
            ByteSource::Buffer(_) => BUFFER_NAME.to_string(),
        }
    }

    /// Default variable name: the file stem, or `Dymfile` for buffers.
    pub fn default_variable_name(&self) -> String {
        match self {
            ByteSource::Path(path) => path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .filter(|stem| !stem.is_empty())
                .unwrap_or_else(|| DEFAULT_VARIABLE_NAME.to_string()),
            ByteSource::Buffer(_) => DEFAULT_VARIABLE_NAME.to_string(),
        }
    }

    pub fn path(&self) -> Option<&Path> {
        match self {
            ByteSource::Path(path) => Some(path),
            ByteSource::Buffer(_) => None,
        }
    }

    /// Total number of bytes available.
    pub fn len(&self) -> DymResult<u64> {
        match self {
            ByteSource::Path(path) => std::fs::metadata(path)
                .map(|meta| meta.len())
                .map_err(|e| DymError::io(&self.name(), e)),
            ByteSource::Buffer(data) => Ok(data.len() as u64),
        }
    }

    pub fn is_empty(&self) -> DymResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Open a seekable reader over the source.
    pub fn open(&self) -> DymResult<SourceReader> {
        match self {
            ByteSource::Path(path) => File::open(path)
                .map(|file| SourceReader::File(BufReader::new(file)))
                .map_err(|e| DymError::io(&self.name(), e)),
            ByteSource::Buffer(data) => Ok(SourceReader::Memory(Cursor::new(data.clone()))),
        }
    }
}

impl From<PathBuf> for ByteSource {
    fn from(path: PathBuf) -> Self {
        ByteSource::Path(path)
    }
}

impl From<&Path> for ByteSource {
    fn from(path: &Path) -> Self {
        ByteSource::Path(path.to_path_buf())
    }
}

impl From<Bytes> for ByteSource {
    fn from(data: Bytes) -> Self {
        ByteSource::Buffer(data)
    }
}

impl From<Vec<u8>> for ByteSource {
    fn from(data: Vec<u8>) -> Self {
        ByteSource::Buffer(Bytes::from(data))
    }
}

/// Reader returned by [`ByteSource::open`].
pub enum SourceReader {
    File(BufReader<File>),
    Memory(Cursor<Bytes>),
}

impl Read for SourceReader {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            SourceReader::File(reader) => reader.read(buf),
            SourceReader::Memory(cursor) => cursor.read(buf),
        }
    }
}

impl Seek for SourceReader {
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        match self {
            SourceReader::File(reader) => reader.seek(pos),
            SourceReader::Memory(cursor) => cursor.seek(pos),
        }
    }
}
