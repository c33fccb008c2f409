//! Longitude and axis helpers.

/// Map a longitude into `[-180, 180)`.
///
/// Uses a floored modulo, so the result is congruent to `lon` mod 360.
pub fn normalize_longitude(lon: f64) -> f64 {
    let mut shifted = (lon + 180.0).rem_euclid(360.0);
    // rem_euclid can round up to exactly 360 for tiny negative inputs
    if shifted >= 360.0 {
        shifted = 0.0;
    }
    shifted - 180.0
}

/// Most common difference between consecutive values.
///
/// Ties go to the difference seen first. Returns `None` for fewer than two
/// values.
pub fn find_resolution(values: &[f64]) -> Option<f64> {
    let mut counts: Vec<(u64, usize)> = Vec::new();
    for pair in values.windows(2) {
        let bits = (pair[1] - pair[0]).to_bits();
        match counts.iter_mut().find(|(b, _)| *b == bits) {
            Some((_, count)) => *count += 1,
            None => counts.push((bits, 1)),
        }
    }

    let mut best: Option<(u64, usize)> = None;
    for &(bits, count) in &counts {
        if best.map_or(true, |(_, best_count)| count > best_count) {
            best = Some((bits, count));
        }
    }
    best.map(|(bits, _)| f64::from_bits(bits))
}
