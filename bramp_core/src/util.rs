//! Integer helpers shared by all duration math.

/// Number of milliseconds in one second.
pub const MILLIS_PER_SEC: u64 = 1_000;
/// Number of milliseconds in one minute.
pub const MILLIS_PER_MIN: u64 = 60 * MILLIS_PER_SEC;
/// Number of milliseconds in one hour.
pub const MILLIS_PER_HOUR: u64 = 60 * MILLIS_PER_MIN;

/// `num / den` rounded to nearest, ties away from zero.
///
/// Operands are unsigned, so "away from zero" is "up": the result is
/// `floor((2*num + den) / (2*den))`. `den` must be non-zero.
#[inline]
pub fn div_round_nearest_u128(num: u128, den: u128) -> u128 {
    debug_assert!(den != 0, "div_round_nearest_u128: zero denominator");
    (num.saturating_mul(2).saturating_add(den)) / den.saturating_mul(2)
}

/// Narrow a `u128` to `u64`, saturating at `u64::MAX`.
#[inline]
pub fn saturate_u64(v: u128) -> u64 {
    u64::try_from(v).unwrap_or(u64::MAX)
}
