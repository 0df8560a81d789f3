//! Mark aggregation: overflow-checked summation and deterministic rounding.

/// Sum an iterator of marks, counting as it goes.
///
/// The addition is checked: wrapping silently would corrupt every average
/// served afterwards, so overflow is fatal by contract. It is unreachable
/// for realistic mark ranges.
pub fn checked_sum<I: IntoIterator<Item = i64>>(marks: I) -> (i64, u64) {
    let mut sum: i64 = 0;
    let mut count: u64 = 0;
    for mark in marks {
        sum = match sum.checked_add(mark) {
            Some(s) => s,
            None => panic!("mark summation overflowed at count {count}"),
        };
        count += 1;
    }
    (sum, count)
}

/// Average of a mark sequence, rounded to 5 fractional digits. An empty
/// sequence averages to exactly 0.
pub fn average<I: IntoIterator<Item = i64>>(marks: I) -> f64 {
    let (sum, count) = checked_sum(marks);
    if count == 0 {
        return 0.0;
    }
    round5(sum as f64 / count as f64)
}

/// Round half away from zero to 5 fractional digits (`f64::round` rounds
/// half away from zero).
pub fn round5(value: f64) -> f64 {
    (value * 100_000.0).round() / 100_000.0
}
