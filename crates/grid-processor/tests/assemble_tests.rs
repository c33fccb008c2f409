//! Integration tests: decode synthetic DYM2 files and assemble them.

use chrono::NaiveDate;
use dym_common::{Diagnostics, TimeAxis, TimeAxisMode};
use dym_parser::{decode, ByteSource, DecodeOptions};
use grid_processor::{assemble, assemble_decoded, AssembleConfig, AssembledGrid, CoordValues};
use ndarray::{Array2, Array3};
use test_utils::{assert_approx_eq, small, DymFileBuilder};

fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn assemble_bytes(bytes: Vec<u8>, options: &DecodeOptions, config: &AssembleConfig) -> AssembledGrid {
    let mut diag = Diagnostics::new();
    let decoded = decode(&ByteSource::from_bytes(bytes), options, &mut diag).unwrap();
    assemble_decoded(decoded, config).unwrap()
}

/// Compare with NaN == NaN.
fn assert_cells(actual: &Array3<f32>, expected: &[[[f32; 2]; 2]]) {
    for (t, level) in expected.iter().enumerate() {
        for (j, row) in level.iter().enumerate() {
            for (i, &want) in row.iter().enumerate() {
                let got = actual[[t, j, i]];
                if want.is_nan() {
                    assert!(got.is_nan(), "[{}, {}, {}] = {}, expected NaN", t, j, i, got);
                } else {
                    assert_eq!(got, want, "[{}, {}, {}]", t, j, i);
                }
            }
        }
    }
}

// ============================================================================
// End-to-end
// ============================================================================

#[test]
fn test_small_file_end_to_end() {
    let grid = assemble_bytes(
        small::bytes(),
        &DecodeOptions::default(),
        &AssembleConfig::default(),
    );
    let array = &grid.array;
    const NAN: f32 = f32::NAN;

    assert_eq!(array.shape(), (3, 2, 2));
    assert_eq!(array.lat.values, CoordValues::Float(vec![-5.0, 5.0]));
    assert_eq!(array.lon.values, CoordValues::Float(vec![10.0, 20.0]));
    assert_eq!(
        array.time.values,
        CoordValues::Date(vec![ymd(2000, 1, 15), ymd(2000, 2, 15), ymd(2000, 3, 15)])
    );

    // rows are lat [-5, 5], columns lon [10, 20]
    assert_cells(
        &array.data,
        &[
            [[NAN, 3.0], [2.0, 1.0]],
            [[NAN, 7.0], [NAN, 5.0]],
            [[NAN, 11.0], [10.0, 9.0]],
        ],
    );

    assert_eq!(grid.mask.data, ndarray::array![[0, 1], [1, 1]]);
    assert_eq!(grid.mask.lat.values, array.lat.values);
    assert_eq!(grid.mask.lon.values, array.lon.values);
}

#[test]
fn test_attributes() {
    let config = AssembleConfig {
        name: "skj_biomass".to_string(),
        units: Some("g/m2".to_string()),
        ..Default::default()
    };
    let grid = assemble_bytes(small::bytes(), &DecodeOptions::default(), &config);
    let array = &grid.array;

    assert_eq!(array.name, "skj_biomass");
    assert_eq!(array.attributes["standard_name"], "skj_biomass");
    assert_eq!(array.attributes["long_name"], "skj_biomass");
    assert_eq!(array.units(), Some("g/m2"));

    assert_eq!(array.lat.attributes["standard_name"], "latitude");
    assert_eq!(array.lat.attributes["units"], "degrees_north");
    assert_eq!(array.lon.attributes["long_name"], "longitude");
    assert_eq!(array.lon.attributes["units"], "degrees_east");
    assert_eq!(array.time.attributes["standard_name"], "time");
}

#[test]
fn test_no_units_attribute_by_default() {
    let grid = assemble_bytes(small::bytes(), &DecodeOptions::default(), &AssembleConfig::default());
    assert_eq!(grid.array.units(), None);
    assert_eq!(grid.array.name, "Dymfile");
}

#[test]
fn test_sentinel_disabled_keeps_value() {
    let config = AssembleConfig {
        nodata_value: None,
        ..Default::default()
    };
    let grid = assemble_bytes(small::bytes(), &DecodeOptions::default(), &config);
    // level 2, lat 5, lon 10
    assert_eq!(grid.array.data[[1, 1, 0]], small::SENTINEL);
}

#[test]
fn test_raw_time_axis_sorted() {
    let bytes = DymFileBuilder::new(vec![0.0], vec![0.0])
        .level(2001.5, vec![1.0])
        .level(2000.5, vec![2.0])
        .build();
    let options = DecodeOptions {
        time_axis: TimeAxisMode::Raw,
        ..Default::default()
    };
    let grid = assemble_bytes(bytes, &options, &AssembleConfig::default());
    assert_eq!(grid.array.time.values, CoordValues::Float(vec![2000.5, 2001.5]));
    assert_eq!(grid.array.data[[0, 0, 0]], 2.0);
    assert_eq!(grid.array.data[[1, 0, 0]], 1.0);
}

#[test]
fn test_monthly_axis_length_mismatch_is_fatal() {
    // header spans Jan..Mar but only two levels are stored
    let bytes = DymFileBuilder::new(vec![0.0], vec![0.0])
        .dates(small::FIRST_DATE, small::LAST_DATE)
        .level(2000.04, vec![1.0])
        .level(2000.125, vec![2.0])
        .build();
    let mut diag = Diagnostics::new();
    let decoded = decode(&ByteSource::from_bytes(bytes), &DecodeOptions::default(), &mut diag).unwrap();
    assert_eq!(decoded.time.len(), 3);

    let err = assemble_decoded(decoded, &AssembleConfig::default()).unwrap_err();
    assert!(err.to_string().contains("time"));
}

// ============================================================================
// Longitude normalization
// ============================================================================

#[test]
fn test_normalize_longitude_reorders_columns() {
    let bytes = DymFileBuilder::new(vec![10.0, 190.0], vec![0.0])
        .level(2000.5, vec![1.0, 2.0])
        .build();
    let options = DecodeOptions {
        time_axis: TimeAxisMode::Raw,
        ..Default::default()
    };

    let plain = assemble_bytes(bytes.clone(), &options, &AssembleConfig::default());
    assert_eq!(plain.array.lon.values, CoordValues::Float(vec![10.0, 190.0]));

    let config = AssembleConfig {
        normalize_longitude: true,
        ..Default::default()
    };
    let grid = assemble_bytes(bytes, &options, &config);
    assert_eq!(grid.array.lon.values, CoordValues::Float(vec![-170.0, 10.0]));
    assert_eq!(grid.array.data[[0, 0, 0]], 2.0);
    assert_eq!(grid.array.data[[0, 0, 1]], 1.0);
    assert_eq!(grid.mask.lon.values, grid.array.lon.values);
}

// ============================================================================
// Properties over generated grids
// ============================================================================

/// Small deterministic generator so the property checks are reproducible.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self.0.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn below(&mut self, n: u64) -> u64 {
        self.next() % n
    }
}

struct Generated {
    data: Array3<f32>,
    mask: Array2<i32>,
    lon: Vec<f32>,
    lat: Vec<f32>,
    time: Vec<f32>,
}

fn generate(rng: &mut Lcg) -> Generated {
    let nlon = 1 + rng.below(6) as usize;
    let nlat = 1 + rng.below(5) as usize;
    let nlevel = 1 + rng.below(4) as usize;

    let lon: Vec<f32> = (0..nlon).map(|_| rng.below(720) as f32 - 360.0).collect();
    let lat: Vec<f32> = (0..nlat).map(|_| rng.below(180) as f32 - 90.0).collect();
    let time: Vec<f32> = (0..nlevel).map(|_| 2000.0 + rng.below(100) as f32 / 10.0).collect();

    let data = Array3::from_shape_fn((nlevel, nlat, nlon), |_| match rng.below(5) {
        0 => -999.0,
        _ => rng.below(1000) as f32,
    });
    let mask = Array2::from_shape_fn((nlon, nlat), |_| rng.below(3) as i32);

    Generated { data, mask, lon, lat, time }
}

fn grids(lon: &[f32], lat: &[f32]) -> (Array2<f32>, Array2<f32>) {
    let lon_grid = Array2::from_shape_fn((lon.len(), lat.len()), |(i, _)| lon[i]);
    let lat_grid = Array2::from_shape_fn((lon.len(), lat.len()), |(_, j)| lat[j]);
    (lon_grid, lat_grid)
}

#[test]
fn test_properties_over_generated_grids() {
    let mut rng = Lcg(42);

    for case in 0..200 {
        let g = generate(&mut rng);
        let (lon_grid, lat_grid) = grids(&g.lon, &g.lat);
        let normalize = case % 2 == 0;
        let config = AssembleConfig {
            normalize_longitude: normalize,
            ..Default::default()
        };

        let grid = assemble(
            g.data.clone(),
            &g.mask,
            TimeAxis::Raw(g.time.clone()),
            &lon_grid,
            &lat_grid,
            &config,
        )
        .unwrap();
        let array = &grid.array;

        // every axis non-decreasing
        assert!(array.time.values.is_sorted(), "case {}", case);
        assert!(array.lat.values.is_sorted(), "case {}", case);
        assert!(array.lon.values.is_sorted(), "case {}", case);

        let lons = array.lon.values.as_float().unwrap();
        let lats = array.lat.values.as_float().unwrap();
        let times = array.time.values.as_float().unwrap();

        if normalize {
            for &lon in lons {
                assert!((-180.0..180.0).contains(&lon), "case {}: {}", case, lon);
            }
        }

        // each output cell maps back to one input cell with the same coordinates
        let (nt, nlat, nlon) = array.shape();
        let mut used = vec![false; nt * nlat * nlon];
        for t in 0..nt {
            for j in 0..nlat {
                for i in 0..nlon {
                    let source = (0..g.time.len())
                        .flat_map(|st| (0..g.lat.len()).map(move |sj| (st, sj)))
                        .flat_map(|(st, sj)| (0..g.lon.len()).map(move |si| (st, sj, si)))
                        .find(|&(st, sj, si)| {
                            let index = (st * g.lat.len() + sj) * g.lon.len() + si;
                            !used[index]
                                && f64::from(g.time[st]) == times[t]
                                && f64::from(g.lat[sj]) == lats[j]
                                && congruent(f64::from(g.lon[si]), lons[i])
                                && same_cell(&g, st, sj, si, array.data[[t, j, i]])
                        });
                    let (st, sj, si) = source.unwrap_or_else(|| {
                        panic!("case {}: no source for [{}, {}, {}]", case, t, j, i)
                    });
                    used[(st * g.lat.len() + sj) * g.lon.len() + si] = true;
                }
            }
        }
    }
}

fn congruent(a: f64, b: f64) -> bool {
    let diff = (a - b).rem_euclid(360.0);
    diff < 1e-9 || (360.0 - diff) < 1e-9
}

/// Output value is NaN iff the source was masked or the sentinel,
/// otherwise it is the source value.
fn same_cell(g: &Generated, t: usize, j: usize, i: usize, value: f32) -> bool {
    let source = g.data[[t, j, i]];
    let missing = g.mask[[i, j]] == 0 || source == -999.0;
    if missing {
        value.is_nan()
    } else {
        value == source
    }
}

#[test]
fn test_resolution_of_sorted_axes() {
    let grid = assemble_bytes(small::bytes(), &DecodeOptions::default(), &AssembleConfig::default());
    let lon = grid.array.lon.values.as_float().unwrap();
    assert_approx_eq!(dym_common::find_resolution(lon).unwrap(), 10.0, 1e-9);
}
