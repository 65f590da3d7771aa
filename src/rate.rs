// Throughput from two counter readings, wrap-aware

use crate::models::CounterWidth;

const BITS_PER_BYTE: f64 = 8.0;
const BITS_PER_MEGABIT: f64 = 1_000_000.0;

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum RateError {
    #[error("rate interval must be > 0 seconds, got {0}")]
    NonPositiveInterval(f64),
}

/// Octets elapsed between `first` and `second`, assuming at most one wrap of a `width`-bit counter.
pub fn counter_delta(first: u64, second: u64, width: CounterWidth) -> u128 {
    if second >= first {
        (second - first) as u128
    } else {
        width
            .modulus()
            .saturating_sub(first as u128)
            .saturating_add(second as u128)
    }
}

/// Megabits per second between two octet-counter readings taken `interval_secs` apart.
///
/// A counter that went backwards is treated as one wrap at 2^width. A device reboot
/// (counter reset to zero) therefore shows up as one spurious large sample.
pub fn compute_rate(
    first: u64,
    second: u64,
    interval_secs: f64,
    width: CounterWidth,
) -> Result<f64, RateError> {
    if !interval_secs.is_finite() || interval_secs <= 0.0 {
        return Err(RateError::NonPositiveInterval(interval_secs));
    }
    let delta = counter_delta(first, second, width);
    let bits_per_sec = delta as f64 * BITS_PER_BYTE / interval_secs;
    Ok((bits_per_sec / BITS_PER_MEGABIT).max(0.0))
}
