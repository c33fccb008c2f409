//! DYM2 header layout.
//!
//! All fields are little-endian and 4 bytes wide:
//!
//! ```text
//! tag          4 bytes   "DYM2"
//! function_id  i32
//! min_value    f32
//! max_value    f32
//! nlon         i32
//! nlat         i32
//! nlevel       i32
//! first_date   f32
//! last_date    f32
//! lon grid     nlat x nlon f32
//! lat grid     nlat x nlon f32
//! levels       nlevel f32
//! mask         nlat x nlon i32
//! ```
//!
//! Grids and mask are stored row-major in (lat, lon) order and exposed
//! transposed, indexed `[lon, lat]`.

use std::io::{self, Read, Seek, SeekFrom};

use byteorder::{ByteOrder, LittleEndian, ReadBytesExt};
use ndarray::Array2;
use serde::Serialize;
use tracing::debug;

use crate::error::{DymError, DymResult};
use crate::format::TAG_LEN;

const FIELD_SIZE: u64 = 4;
const INT_FIELDS: u64 = 4;
const FLOAT_FIELDS: u64 = 4;

/// Bytes taken by the tag and the eight scalar fields.
pub const FIXED_HEADER_SIZE: u64 = TAG_LEN as u64 + (INT_FIELDS + FLOAT_FIELDS) * FIELD_SIZE;

/// Scalar part of a DYM2 header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DymHeader {
    /// Raw 4-byte tag, decoded lossily.
    pub format_id: String,
    /// Identifier of the producing function. Carried, not interpreted.
    pub function_id: i32,
    /// Declared data range. Carried, not validated against the data.
    pub min_value: f32,
    pub max_value: f32,
    pub nlon: usize,
    pub nlat: usize,
    pub nlevel: usize,
    /// Fractional-year dates of the first and last level.
    pub first_date: f32,
    pub last_date: f32,
}

impl DymHeader {
    /// Read the tag and scalar fields.
    pub fn read<R: Read>(reader: &mut R, source_name: &str) -> DymResult<Self> {
        let io = |e| DymError::header_read(source_name, e);

        let mut tag = [0u8; TAG_LEN];
        reader.read_exact(&mut tag).map_err(io)?;

        let function_id = reader.read_i32::<LittleEndian>().map_err(io)?;
        let min_value = reader.read_f32::<LittleEndian>().map_err(io)?;
        let max_value = reader.read_f32::<LittleEndian>().map_err(io)?;
        let nlon = reader.read_i32::<LittleEndian>().map_err(io)?;
        let nlat = reader.read_i32::<LittleEndian>().map_err(io)?;
        let nlevel = reader.read_i32::<LittleEndian>().map_err(io)?;
        let first_date = reader.read_f32::<LittleEndian>().map_err(io)?;
        let last_date = reader.read_f32::<LittleEndian>().map_err(io)?;

        let header = DymHeader {
            format_id: String::from_utf8_lossy(&tag).into_owned(),
            function_id,
            min_value,
            max_value,
            nlon: dimension(nlon, "nlon", source_name)?,
            nlat: dimension(nlat, "nlat", source_name)?,
            nlevel: dimension(nlevel, "nlevel", source_name)?,
            first_date,
            last_date,
        };
        header.check_sizes(source_name)?;
        Ok(header)
    }

    /// Cells per level.
    pub fn cells(&self) -> usize {
        self.nlon * self.nlat
    }

    /// Offset of the first data level.
    pub fn header_size(&self) -> u64 {
        let cells = self.cells() as u64;
        FIXED_HEADER_SIZE
            + 2 * cells * FIELD_SIZE
            + cells * FIELD_SIZE
            + self.nlevel as u64 * FIELD_SIZE
    }

    /// Size of one data level.
    pub fn block_size(&self) -> u64 {
        self.cells() as u64 * FIELD_SIZE
    }

    pub fn data_size(&self) -> u64 {
        self.block_size() * self.nlevel as u64
    }

    /// Minimum length of a well-formed file.
    pub fn file_size(&self) -> u64 {
        self.header_size() + self.data_size()
    }

    /// Byte offset of a 1-based level index.
    pub fn level_offset(&self, level: usize) -> u64 {
        self.header_size() + level.saturating_sub(1) as u64 * self.block_size()
    }

    // Three grids plus one block per level must be addressable.
    fn check_sizes(&self, source_name: &str) -> DymResult<()> {
        let total = self
            .nlon
            .checked_mul(self.nlat)
            .and_then(|cells| cells.checked_mul(self.nlevel + 3))
            .and_then(|values| values.checked_mul(FIELD_SIZE as usize));
        if total.is_none() {
            return Err(DymError::decode(
                source_name,
                format!(
                    "dimensions {} x {} x {} are too large",
                    self.nlon, self.nlat, self.nlevel
                ),
            ));
        }
        Ok(())
    }
}

fn dimension(value: i32, field: &str, source_name: &str) -> DymResult<usize> {
    usize::try_from(value).map_err(|_| {
        DymError::decode(source_name, format!("negative {} in header: {}", field, value))
    })
}

/// Longitude and latitude of every cell, indexed `[lon, lat]`.
#[derive(Debug, Clone, PartialEq)]
pub struct CoordinateGrids {
    pub lon: Array2<f32>,
    pub lat: Array2<f32>,
}

impl CoordinateGrids {
    /// Longitudes taken from the first latitude column.
    pub fn lon_vector(&self) -> Vec<f32> {
        if self.lon.ncols() == 0 {
            return Vec::new();
        }
        self.lon.column(0).to_vec()
    }

    /// Latitudes taken from the first longitude row.
    pub fn lat_vector(&self) -> Vec<f32> {
        if self.lat.nrows() == 0 {
            return Vec::new();
        }
        self.lat.row(0).to_vec()
    }
}

/// Everything stored before the first data level.
#[derive(Debug, Clone, PartialEq)]
pub struct DymFileHeader {
    pub header: DymHeader,
    pub grids: CoordinateGrids,
    /// One fractional-year value per level.
    pub levels: Vec<f32>,
    /// Ocean/land mask indexed `[lon, lat]`; zero is land.
    pub mask: Array2<i32>,
}

/// Read the full header, leaving `reader` at the first data level.
pub fn read_header<R: Read>(reader: &mut R, source_name: &str) -> DymResult<DymFileHeader> {
    let header = DymHeader::read(reader, source_name)?;
    read_header_blocks(reader, header, source_name)
}

/// Read the coordinate blocks following an already-read [`DymHeader`].
pub fn read_header_blocks<R: Read>(
    reader: &mut R,
    header: DymHeader,
    source_name: &str,
) -> DymResult<DymFileHeader> {
    let io = |e| DymError::header_read(source_name, e);
    let (nlon, nlat) = (header.nlon, header.nlat);

    let lon = read_f32_grid(reader, nlon, nlat, source_name)?;
    let lat = read_f32_grid(reader, nlon, nlat, source_name)?;

    let levels = read_f32_block(reader, header.nlevel).map_err(io)?;

    let mask = read_i32_block(reader, header.cells()).map_err(io)?;
    let mask = Array2::from_shape_vec((nlat, nlon), mask)
        .map_err(|e| DymError::decode(source_name, e.to_string()))?
        .reversed_axes();

    debug!(
        source = source_name,
        nlon,
        nlat,
        nlevel = header.nlevel,
        header_size = header.header_size(),
        "Read DYM header"
    );

    Ok(DymFileHeader {
        header,
        grids: CoordinateGrids { lon, lat },
        levels,
        mask,
    })
}

fn read_f32_grid<R: Read>(
    reader: &mut R,
    nlon: usize,
    nlat: usize,
    source_name: &str,
) -> DymResult<Array2<f32>> {
    let values =
        read_f32_block(reader, nlon * nlat).map_err(|e| DymError::header_read(source_name, e))?;
    let grid = Array2::from_shape_vec((nlat, nlon), values)
        .map_err(|e| DymError::decode(source_name, e.to_string()))?;
    Ok(grid.reversed_axes())
}

/// Read `len` bytes, growing the buffer only as data arrives.
///
/// Declared sizes come from the file itself, so nothing is allocated up
/// front; a short source fails with `UnexpectedEof`.
pub(crate) fn read_bytes<R: Read>(reader: &mut R, len: u64) -> io::Result<Vec<u8>> {
    let mut buf = Vec::new();
    reader.take(len).read_to_end(&mut buf)?;
    if (buf.len() as u64) < len {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            format!("expected {} bytes, got {}", len, buf.len()),
        ));
    }
    Ok(buf)
}

pub(crate) fn read_f32_block<R: Read>(reader: &mut R, count: usize) -> io::Result<Vec<f32>> {
    let bytes = read_bytes(reader, count as u64 * FIELD_SIZE)?;
    let mut values = vec![0f32; count];
    LittleEndian::read_f32_into(&bytes, &mut values);
    Ok(values)
}

fn read_i32_block<R: Read>(reader: &mut R, count: usize) -> io::Result<Vec<i32>> {
    let bytes = read_bytes(reader, count as u64 * FIELD_SIZE)?;
    let mut values = vec![0i32; count];
    LittleEndian::read_i32_into(&bytes, &mut values);
    Ok(values)
}

/// Total length of a seekable stream. The position is restored.
pub(crate) fn stream_len<R: Seek>(reader: &mut R) -> io::Result<u64> {
    let position = reader.stream_position()?;
    let len = reader.seek(SeekFrom::End(0))?;
    reader.seek(SeekFrom::Start(position))?;
    Ok(len)
}

/// Fail with [`DymError::Truncated`] when `available` bytes cannot hold
/// the whole file `header` describes.
pub(crate) fn check_available(header: &DymHeader, available: u64, source_name: &str) -> DymResult<()> {
    let expected = header.file_size();
    if expected > available {
        return Err(DymError::Truncated {
            source_name: source_name.to_string(),
            expected,
            available,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(nlon: usize, nlat: usize, nlevel: usize) -> DymHeader {
        DymHeader {
            format_id: "DYM2".to_string(),
            function_id: 0,
            min_value: 0.0,
            max_value: 1.0,
            nlon,
            nlat,
            nlevel,
            first_date: 2000.0,
            last_date: 2000.0,
        }
    }

    #[test]
    fn test_sizes() {
        let h = header(3, 2, 4);
        assert_eq!(FIXED_HEADER_SIZE, 36);
        assert_eq!(h.header_size(), 36 + 2 * 6 * 4 + 6 * 4 + 4 * 4);
        assert_eq!(h.block_size(), 24);
        assert_eq!(h.level_offset(1), h.header_size());
        assert_eq!(h.level_offset(3), h.header_size() + 48);
        assert_eq!(h.file_size(), h.header_size() + 96);
    }

    #[test]
    fn test_empty_grid_sizes() {
        let h = header(0, 0, 2);
        assert_eq!(h.block_size(), 0);
        assert_eq!(h.header_size(), 36 + 8);
    }

    #[test]
    fn test_negative_dimension_rejected() {
        let mut bytes = b"DYM2".to_vec();
        for v in [0i32, 0, 0, -1, 2, 1] {
            // function_id, min, max (bit patterns), nlon, nlat, nlevel
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&[0u8; 8]);
        let err = DymHeader::read(&mut bytes.as_slice(), "t").unwrap_err();
        assert!(matches!(err, DymError::Decode { .. }));
    }

    #[test]
    fn test_short_header_is_read_error() {
        let err = DymHeader::read(&mut &b"DYM2\x01\x00"[..], "t").unwrap_err();
        assert!(matches!(err, DymError::HeaderRead { .. }));
    }

    #[test]
    fn test_oversized_grid_is_read_error() {
        let mut bytes = b"DYM2".to_vec();
        for v in [0i32, 0, 0, 1 << 20, 1 << 20, 0] {
            bytes.extend_from_slice(&v.to_le_bytes());
        }
        bytes.extend_from_slice(&[0u8; 8]);
        let err = read_header(&mut bytes.as_slice(), "t").unwrap_err();
        assert!(matches!(err, DymError::HeaderRead { .. }));
    }

    #[test]
    fn test_read_bytes_short_source() {
        let err = read_bytes(&mut &[1u8, 2, 3][..], 8).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
        assert_eq!(read_bytes(&mut &[1u8, 2, 3][..], 2).unwrap(), vec![1, 2]);
    }

    #[test]
    fn test_stream_len_restores_position() {
        let mut cursor = io::Cursor::new(vec![0u8; 10]);
        cursor.set_position(4);
        assert_eq!(stream_len(&mut cursor).unwrap(), 10);
        assert_eq!(cursor.position(), 4);
    }

    #[test]
    fn test_coordinate_vectors() {
        // stored (lat, lon) rows: lon varies along a row
        let lon = Array2::from_shape_vec((2, 3), vec![10.0, 11.0, 12.0, 10.0, 11.0, 12.0])
            .unwrap()
            .reversed_axes();
        let lat = Array2::from_shape_vec((2, 3), vec![-5.0, -5.0, -5.0, 5.0, 5.0, 5.0])
            .unwrap()
            .reversed_axes();
        let grids = CoordinateGrids { lon, lat };
        assert_eq!(grids.lon_vector(), vec![10.0, 11.0, 12.0]);
        assert_eq!(grids.lat_vector(), vec![-5.0, 5.0]);
    }
}
