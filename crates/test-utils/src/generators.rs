//! Synthetic DYM data generators.
//!
//! [`DymFileBuilder`] writes byte-exact DYM2 files so tests never depend on
//! real model output.

use std::io::{Cursor, Write};

/// Creates one level of predictable values.
///
/// Each cell value is `level * 100 + lat * 10 + lon`, in row-major
/// `(lat, lon)` order, so a misplaced cell is easy to spot.
///
/// # Example
///
/// ```
/// use test_utils::create_level_values;
///
/// let values = create_level_values(3, 2, 1);
/// assert_eq!(values.len(), 6);
/// assert_eq!(values[0], 100.0); // lat=0, lon=0
/// assert_eq!(values[1], 101.0); // lat=0, lon=1
/// assert_eq!(values[3], 110.0); // lat=1, lon=0
/// ```
pub fn create_level_values(nlon: usize, nlat: usize, level: usize) -> Vec<f32> {
    let mut data = Vec::with_capacity(nlon * nlat);
    for lat in 0..nlat {
        for lon in 0..nlon {
            data.push((level * 100 + lat * 10 + lon) as f32);
        }
    }
    data
}

/// Builder for DYM2 files.
///
/// Coordinates are given as vectors; the builder expands them into the
/// full per-cell grids the format stores. Mask and level values are
/// row-major `(lat, lon)`.
#[derive(Debug, Clone)]
pub struct DymFileBuilder {
    tag: [u8; 4],
    function_id: i32,
    min_value: f32,
    max_value: f32,
    lon: Vec<f32>,
    lat: Vec<f32>,
    first_date: f32,
    last_date: f32,
    mask: Option<Vec<i32>>,
    levels: Vec<(f32, Vec<f32>)>,
}

impl DymFileBuilder {
    pub fn new(lon: Vec<f32>, lat: Vec<f32>) -> Self {
        Self {
            tag: *b"DYM2",
            function_id: 0,
            min_value: 0.0,
            max_value: 0.0,
            lon,
            lat,
            first_date: 0.0,
            last_date: 0.0,
            mask: None,
            levels: Vec::new(),
        }
    }

    /// Override the 4-byte format tag.
    pub fn tag(mut self, tag: &[u8; 4]) -> Self {
        self.tag = *tag;
        self
    }

    pub fn function_id(mut self, id: i32) -> Self {
        self.function_id = id;
        self
    }

    pub fn value_range(mut self, min: f32, max: f32) -> Self {
        self.min_value = min;
        self.max_value = max;
        self
    }

    /// Header first/last dates (fractional years).
    pub fn dates(mut self, first: f32, last: f32) -> Self {
        self.first_date = first;
        self.last_date = last;
        self
    }

    /// Row-major `(lat, lon)` mask. Defaults to all ones.
    pub fn mask(mut self, mask: Vec<i32>) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Append a level with its fractional-year value.
    pub fn level(mut self, date: f32, values: Vec<f32>) -> Self {
        self.levels.push((date, values));
        self
    }

    pub fn nlon(&self) -> usize {
        self.lon.len()
    }

    pub fn nlat(&self) -> usize {
        self.lat.len()
    }

    /// Bytes taken by everything before the first level.
    pub fn header_len(&self) -> usize {
        let cells = self.nlon() * self.nlat();
        36 + 3 * cells * 4 + self.levels.len() * 4
    }

    /// Serialize to DYM2 bytes.
    ///
    /// Panics when the mask or a level has the wrong number of cells.
    pub fn build(&self) -> Vec<u8> {
        let (nlon, nlat) = (self.nlon(), self.nlat());
        let cells = nlon * nlat;
        let mut out = Vec::with_capacity(self.header_len() + self.levels.len() * cells * 4);

        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&self.function_id.to_le_bytes());
        out.extend_from_slice(&self.min_value.to_le_bytes());
        out.extend_from_slice(&self.max_value.to_le_bytes());
        out.extend_from_slice(&(nlon as i32).to_le_bytes());
        out.extend_from_slice(&(nlat as i32).to_le_bytes());
        out.extend_from_slice(&(self.levels.len() as i32).to_le_bytes());
        out.extend_from_slice(&self.first_date.to_le_bytes());
        out.extend_from_slice(&self.last_date.to_le_bytes());

        for _ in 0..nlat {
            for lon in &self.lon {
                out.extend_from_slice(&lon.to_le_bytes());
            }
        }
        for lat in &self.lat {
            for _ in 0..nlon {
                out.extend_from_slice(&lat.to_le_bytes());
            }
        }
        for (date, _) in &self.levels {
            out.extend_from_slice(&date.to_le_bytes());
        }

        let mask = self.mask.clone().unwrap_or_else(|| vec![1; cells]);
        assert_eq!(mask.len(), cells, "mask must have nlat * nlon cells");
        for m in mask {
            out.extend_from_slice(&m.to_le_bytes());
        }

        for (index, (_, values)) in self.levels.iter().enumerate() {
            assert_eq!(values.len(), cells, "level {} must have nlat * nlon cells", index + 1);
            for v in values {
                out.extend_from_slice(&v.to_le_bytes());
            }
        }

        out
    }
}

/// Build a zip archive from `(name, contents)` members, stored uncompressed.
pub fn create_zip_archive(members: &[(&str, &[u8])]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    let options = zip::write::SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored);
    for (name, contents) in members {
        writer
            .start_file(*name, options)
            .expect("Failed to start zip member");
        writer
            .write_all(contents)
            .expect("Failed to write zip member");
    }
    writer
        .finish()
        .expect("Failed to finish zip archive")
        .into_inner()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_layout() {
        let bytes = DymFileBuilder::new(vec![1.0, 2.0, 3.0], vec![10.0, 20.0])
            .dates(2000.0, 2000.5)
            .level(2000.0, create_level_values(3, 2, 1))
            .level(2000.5, create_level_values(3, 2, 2))
            .build();
        let header = 36 + 3 * 6 * 4 + 2 * 4;
        assert_eq!(bytes.len(), header + 2 * 6 * 4);
        assert_eq!(&bytes[..4], b"DYM2");
        // nlon, nlat, nlevel
        assert_eq!(i32::from_le_bytes(bytes[16..20].try_into().unwrap()), 3);
        assert_eq!(i32::from_le_bytes(bytes[20..24].try_into().unwrap()), 2);
        assert_eq!(i32::from_le_bytes(bytes[24..28].try_into().unwrap()), 2);
    }

    #[test]
    fn test_create_zip_archive() {
        let bytes = create_zip_archive(&[("a.xml", &b"<a/>"[..]), ("a.dym", &b"DYM3"[..])]);
        assert_eq!(&bytes[..2], b"PK");
    }
}
