//! Level data access.
//!
//! Levels are stored one after another right after the header, each as a
//! row-major `nlat x nlon` block of `f32`. A level can be read on its own by
//! seeking to its offset, or all levels can be streamed in order.

use std::io::{Read, Seek, SeekFrom};

use ndarray::{Array2, Array3};
use tracing::debug;

use crate::error::{DymError, DymResult};
use crate::header::{
    check_available, read_f32_block, read_header_blocks, stream_len, DymFileHeader, DymHeader,
};
use crate::source::{ByteSource, SourceReader};

/// Read one level (1-based) by seeking to its offset.
///
/// Returns an array indexed `[lat, lon]`.
pub fn read_level<R: Read + Seek>(
    reader: &mut R,
    header: &DymHeader,
    level: usize,
    source_name: &str,
) -> DymResult<Array2<f32>> {
    if level == 0 || level > header.nlevel {
        return Err(DymError::decode(
            source_name,
            format!("level {} out of range 1..={}", level, header.nlevel),
        ));
    }

    let offset = header.level_offset(level);
    reader
        .seek(SeekFrom::Start(offset))
        .map_err(|e| DymError::level_read(source_name, level, offset, e))?;

    let values = read_f32_block(reader, header.cells())
        .map_err(|e| DymError::level_read(source_name, level, offset, e))?;

    Array2::from_shape_vec((header.nlat, header.nlon), values)
        .map_err(|e| DymError::decode(source_name, e.to_string()))
}

/// Read every level in file order from a reader positioned at the first one.
///
/// Returns an array indexed `[level, lat, lon]`.
pub fn read_all_levels<R: Read>(
    reader: &mut R,
    header: &DymHeader,
    source_name: &str,
) -> DymResult<Array3<f32>> {
    let mut values = Vec::new();

    for level in 1..=header.nlevel {
        let block = read_f32_block(reader, header.cells())
            .map_err(|e| DymError::level_read(source_name, level, header.level_offset(level), e))?;
        values.extend_from_slice(&block);
    }

    Array3::from_shape_vec((header.nlevel, header.nlat, header.nlon), values)
        .map_err(|e| DymError::decode(source_name, e.to_string()))
}

/// Random-access reader over a DYM2 file.
///
/// Reads the header once and then serves individual levels on demand.
pub struct DymReader<R> {
    reader: R,
    source_name: String,
    file_header: DymFileHeader,
}

impl DymReader<SourceReader> {
    /// Open a DYM2 source for random access.
    pub fn open(source: &ByteSource) -> DymResult<Self> {
        let reader = source.open()?;
        Self::new(reader, source.name())
    }
}

impl<R: Read + Seek> DymReader<R> {
    /// Read the header of a seekable stream.
    ///
    /// Declared dimensions are checked against the stream length before any
    /// coordinate block is read.
    pub fn new(mut reader: R, source_name: impl Into<String>) -> DymResult<Self> {
        let source_name = source_name.into();
        let available = stream_len(&mut reader).map_err(|e| DymError::io(&source_name, e))?;
        let header = DymHeader::read(&mut reader, &source_name)?;
        check_available(&header, available, &source_name)?;
        let file_header = read_header_blocks(&mut reader, header, &source_name)?;
        debug!(source = %source_name, nlevel = file_header.header.nlevel, "Opened DYM reader");
        Ok(Self {
            reader,
            source_name,
            file_header,
        })
    }

    pub fn header(&self) -> &DymHeader {
        &self.file_header.header
    }

    pub fn file_header(&self) -> &DymFileHeader {
        &self.file_header
    }

    pub fn source_name(&self) -> &str {
        &self.source_name
    }

    /// Read one level (1-based), indexed `[lat, lon]`.
    pub fn read_level(&mut self, level: usize) -> DymResult<Array2<f32>> {
        read_level(
            &mut self.reader,
            &self.file_header.header,
            level,
            &self.source_name,
        )
    }

    /// Read every level, indexed `[level, lat, lon]`.
    pub fn read_all(&mut self) -> DymResult<Array3<f32>> {
        let offset = self.file_header.header.header_size();
        self.reader
            .seek(SeekFrom::Start(offset))
            .map_err(|e| DymError::io(&self.source_name, e))?;
        read_all_levels(&mut self.reader, &self.file_header.header, &self.source_name)
    }

    pub fn into_file_header(self) -> DymFileHeader {
        self.file_header
    }
}
