//! Common test fixtures.

use crate::generators::DymFileBuilder;

/// The 2 x 2 x 3 file used by the end-to-end tests.
///
/// Longitudes and latitudes are stored descending so that sorting is
/// observable. Cell `(lat=-5, lon=10)` is land, and level 2 holds one
/// `-999` sentinel at `(lat=5, lon=10)`.
pub mod small {
    use super::DymFileBuilder;

    /// Longitudes in file order.
    pub const LON: [f32; 2] = [20.0, 10.0];

    /// Latitudes in file order.
    pub const LAT: [f32; 2] = [5.0, -5.0];

    /// Level dates: mid-January, mid-February, mid-March 2000.
    pub const LEVEL_DATES: [f32; 3] = [2000.04, 2000.125, 2000.21];

    pub const FIRST_DATE: f32 = 2000.04;
    pub const LAST_DATE: f32 = 2000.21;

    /// Row-major `(lat, lon)` mask.
    pub const MASK: [i32; 4] = [1, 1, 1, 0];

    pub const SENTINEL: f32 = -999.0;

    /// Row-major `(lat, lon)` values per level.
    pub const LEVELS: [[f32; 4]; 3] = [
        [1.0, 2.0, 3.0, 4.0],
        [5.0, SENTINEL, 7.0, 8.0],
        [9.0, 10.0, 11.0, 12.0],
    ];

    pub fn builder() -> DymFileBuilder {
        let mut builder = DymFileBuilder::new(LON.to_vec(), LAT.to_vec())
            .function_id(1)
            .value_range(1.0, 12.0)
            .dates(FIRST_DATE, LAST_DATE)
            .mask(MASK.to_vec());
        for (date, values) in LEVEL_DATES.iter().zip(LEVELS.iter()) {
            builder = builder.level(*date, values.to_vec());
        }
        builder
    }

    pub fn bytes() -> Vec<u8> {
        builder().build()
    }
}

/// A well-formed DYMZ archive: XML metadata plus a `DYM3` payload.
pub fn dymz_archive() -> Vec<u8> {
    let payload = DymFileBuilder::new(vec![0.0], vec![0.0])
        .tag(b"DYM3")
        .level(2000.5, vec![1.0])
        .build();
    crate::generators::create_zip_archive(&[
        ("meta.xml", &b"<?xml version=\"1.0\"?>\n<metadata><unit>t</unit></metadata>\n"[..]),
        ("skj.dym", &payload[..]),
    ])
}
