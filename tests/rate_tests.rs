// Rate calculation: plain deltas, wraparound, never negative

use ifstat::models::CounterWidth;
use ifstat::rate::{RateError, compute_rate, counter_delta};

#[test]
fn rate_without_wrap_is_delta_over_interval() {
    let cases: [(u64, u64, f64); 4] = [
        (0, 125_000, 1.0),
        (1_000, 1_000, 1.0),
        (10, 4_294_967_295, 2.0),
        (3_000_000, 3_750_000, 0.5),
    ];
    for (first, second, interval) in cases {
        let rate = compute_rate(first, second, interval, CounterWidth::Bits32).unwrap();
        let expected = (second - first) as f64 * 8.0 / interval / 1e6;
        assert_eq!(rate, expected, "first={first} second={second}");
    }
}

#[test]
fn one_megabit_per_second() {
    let rate = compute_rate(1_000, 126_000, 1.0, CounterWidth::Bits32).unwrap();
    assert_eq!(rate, 1.0);
}

#[test]
fn wraparound_32_bit() {
    let rate = compute_rate(4_294_967_290, 5, 1.0, CounterWidth::Bits32).unwrap();
    assert_eq!(counter_delta(4_294_967_290, 5, CounterWidth::Bits32), 11);
    assert_eq!(rate, 11.0 * 8.0 / 1e6);
}

#[test]
fn wraparound_64_bit() {
    assert_eq!(counter_delta(u64::MAX - 4, 5, CounterWidth::Bits64), 10);
    let rate = compute_rate(u64::MAX - 4, 5, 2.0, CounterWidth::Bits64).unwrap();
    assert_eq!(rate, 10.0 * 8.0 / 2.0 / 1e6);
}

#[test]
fn reading_above_32_bit_range_never_goes_negative() {
    // A 32-bit counter that reports a value beyond 2^32 then drops: delta saturates instead of underflowing.
    let rate = compute_rate(u64::MAX, 1, 1.0, CounterWidth::Bits32).unwrap();
    assert!(rate >= 0.0);
}

#[test]
fn rate_is_never_negative() {
    let values = [0, 1, 5, 4_294_967_290, 4_294_967_295, 1 << 40, u64::MAX - 1, u64::MAX];
    for width in [CounterWidth::Bits32, CounterWidth::Bits64] {
        for first in values {
            for second in values {
                let rate = compute_rate(first, second, 0.25, width).unwrap();
                assert!(rate >= 0.0, "first={first} second={second} width={width:?}");
                assert!(rate.is_finite());
            }
        }
    }
}

#[test]
fn non_positive_interval_is_rejected() {
    assert_eq!(
        compute_rate(0, 10, 0.0, CounterWidth::Bits32),
        Err(RateError::NonPositiveInterval(0.0))
    );
    assert!(compute_rate(0, 10, -1.0, CounterWidth::Bits32).is_err());
    assert!(compute_rate(0, 10, f64::NAN, CounterWidth::Bits32).is_err());
}
