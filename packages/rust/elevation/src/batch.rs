//! Batch partitioning and value shaping for elevation lookups.

use std::ops::Range;
use std::time::Duration;

use trackalt_shared::Coordinate;

/// Split `len` points into consecutive ranges of at most `size`.
///
/// Batch `n` covers `[n * size, min((n + 1) * size, len))`. A `size` of zero
/// is treated as one.
pub fn batch_ranges(len: usize, size: usize) -> Vec<Range<usize>> {
    let size = size.max(1);
    (0..len)
        .step_by(size)
        .map(|start| start..(start + size).min(len))
        .collect()
}

/// Encode a batch as the service's `locations` parameter: `lat,lon|lat,lon|...`.
pub fn locations_param(batch: &[Coordinate]) -> String {
    batch
        .iter()
        .map(|c| format!("{},{}", c.lat, c.lon))
        .collect::<Vec<_>>()
        .join("|")
}

/// Round to the nearest 0.1 m.
pub fn round_elevation(meters: f64) -> f64 {
    (meters * 10.0).round() / 10.0
}

/// Delay before the attempt following `attempt` (1-based): `attempt * base`,
/// saturating at `Duration::MAX`.
pub fn backoff_delay(base: Duration, attempt: u32) -> Duration {
    base.saturating_mul(attempt)
}
