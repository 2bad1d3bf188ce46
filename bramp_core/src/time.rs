//! Millisecond durations.
//!
//! `TimeValue` is the unit every step, interval and exposure is expressed
//! in. Arithmetic is checked or saturating; nothing wraps.

use std::fmt;
use std::iter::Sum;
use std::str::FromStr;
use std::time::Duration;

use thiserror::Error;

use crate::util::{
    MILLIS_PER_HOUR, MILLIS_PER_MIN, MILLIS_PER_SEC, div_round_nearest_u128, saturate_u64,
};

/// A non-negative whole number of milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct TimeValue(u64);

impl TimeValue {
    pub const ZERO: Self = Self(0);
    pub const MAX: Self = Self(u64::MAX);

    #[inline]
    pub const fn from_millis(ms: u64) -> Self {
        Self(ms)
    }

    #[inline]
    pub const fn from_secs(secs: u64) -> Self {
        Self(secs.saturating_mul(MILLIS_PER_SEC))
    }

    #[inline]
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn as_duration(self) -> Duration {
        Duration::from_millis(self.0)
    }

    /// Whole milliseconds of `d`, rounded down and saturating at `MAX`.
    #[inline]
    pub fn from_duration(d: Duration) -> Self {
        Self(saturate_u64(d.as_millis()))
    }

    #[inline]
    pub const fn checked_add(self, rhs: Self) -> Option<Self> {
        match self.0.checked_add(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_sub(self, rhs: Self) -> Option<Self> {
        match self.0.checked_sub(rhs.0) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[inline]
    pub const fn checked_mul(self, n: u64) -> Option<Self> {
        match self.0.checked_mul(n) {
            Some(v) => Some(Self(v)),
            None => None,
        }
    }

    #[inline]
    pub const fn saturating_add(self, rhs: Self) -> Self {
        Self(self.0.saturating_add(rhs.0))
    }

    #[inline]
    pub const fn saturating_sub(self, rhs: Self) -> Self {
        Self(self.0.saturating_sub(rhs.0))
    }

    #[inline]
    pub const fn saturating_mul(self, n: u64) -> Self {
        Self(self.0.saturating_mul(n))
    }

    /// Shutter-speed style label: `1/N` below one second, otherwise the
    /// regular display form. N keeps one decimal below 10 (`1/2.5`).
    pub fn shutter_label(self) -> String {
        if self.0 == 0 || self.0 >= MILLIS_PER_SEC {
            return self.to_string();
        }
        // N in tenths, rounded half away from zero
        let tenths = div_round_nearest_u128(10_000, u128::from(self.0));
        if tenths >= 100 {
            format!("1/{}", div_round_nearest_u128(tenths, 10))
        } else if tenths % 10 == 0 {
            format!("1/{}", tenths / 10)
        } else {
            format!("1/{}.{}", tenths / 10, tenths % 10)
        }
    }
}

impl From<Duration> for TimeValue {
    fn from(d: Duration) -> Self {
        Self::from_duration(d)
    }
}

impl From<TimeValue> for Duration {
    fn from(t: TimeValue) -> Self {
        t.as_duration()
    }
}

impl Sum for TimeValue {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::ZERO, Self::saturating_add)
    }
}

impl<'a> Sum<&'a Self> for TimeValue {
    fn sum<I: Iterator<Item = &'a Self>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

/// Write `ms` (< 60 s) as seconds with trailing zero decimals trimmed.
fn write_secs(f: &mut fmt::Formatter<'_>, ms: u64) -> fmt::Result {
    let whole = ms / MILLIS_PER_SEC;
    let frac = ms % MILLIS_PER_SEC;
    if frac == 0 {
        return write!(f, "{whole}s");
    }
    let digits = format!("{frac:03}");
    write!(f, "{whole}.{}s", digits.trim_end_matches('0'))
}

impl fmt::Display for TimeValue {
    /// `250ms`, `1.5s`, `1m 30s`, `2h 5m`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let ms = self.0;
        if ms < MILLIS_PER_SEC {
            return write!(f, "{ms}ms");
        }
        if ms < MILLIS_PER_MIN {
            return write_secs(f, ms);
        }
        let hours = ms / MILLIS_PER_HOUR;
        let mins = (ms % MILLIS_PER_HOUR) / MILLIS_PER_MIN;
        let rest = ms % MILLIS_PER_MIN;
        let mut parts_written = false;
        if hours > 0 {
            write!(f, "{hours}h")?;
            parts_written = true;
        }
        if mins > 0 {
            if parts_written {
                f.write_str(" ")?;
            }
            write!(f, "{mins}m")?;
            parts_written = true;
        }
        if rest > 0 {
            if parts_written {
                f.write_str(" ")?;
            }
            if rest < MILLIS_PER_SEC {
                write!(f, "{rest}ms")?;
            } else {
                write_secs(f, rest)?;
            }
        }
        Ok(())
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ParseTimeError {
    #[error("empty duration")]
    Empty,
    #[error("invalid number {0:?}")]
    InvalidNumber(String),
    #[error("unknown unit {0:?} (expected ms, s, m or h)")]
    UnknownUnit(String),
    #[error("missing unit after {0:?}")]
    MissingUnit(String),
    #[error("shutter fraction has a zero denominator")]
    ZeroDenominator,
    #[error("duration too large")]
    Overflow,
}

/// A decimal literal kept exact as `mantissa / scale` (`1.25` -> 125/100).
fn parse_decimal(s: &str) -> Result<(u128, u128), ParseTimeError> {
    let invalid = || ParseTimeError::InvalidNumber(s.to_string());
    let (int_part, frac_part) = match s.split_once('.') {
        Some((i, f)) => (i, f),
        None => (s, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return Err(invalid());
    }
    if !int_part.chars().chain(frac_part.chars()).all(|c| c.is_ascii_digit()) {
        return Err(invalid());
    }
    if frac_part.len() > 9 {
        return Err(invalid());
    }
    let digits = format!("{int_part}{frac_part}");
    let mantissa: u128 = digits.parse().map_err(|_| ParseTimeError::Overflow)?;
    let scale = 10u128.pow(u32::try_from(frac_part.len()).map_err(|_| invalid())?);
    Ok((mantissa, scale))
}

fn unit_ms(unit: &str) -> Result<u128, ParseTimeError> {
    match unit {
        "ms" => Ok(1),
        "s" | "sec" => Ok(u128::from(MILLIS_PER_SEC)),
        "m" | "min" => Ok(u128::from(MILLIS_PER_MIN)),
        "h" => Ok(u128::from(MILLIS_PER_HOUR)),
        other => Err(ParseTimeError::UnknownUnit(other.to_string())),
    }
}

/// `1/30` style shutter fractions, interpreted in seconds.
fn parse_fraction(num: &str, den: &str) -> Result<TimeValue, ParseTimeError> {
    let (n_mant, n_scale) = parse_decimal(num.trim())?;
    let (d_mant, d_scale) = parse_decimal(den.trim())?;
    if d_mant == 0 {
        return Err(ParseTimeError::ZeroDenominator);
    }
    // ms = 1000 * (n_mant/n_scale) / (d_mant/d_scale)
    let top = n_mant
        .checked_mul(u128::from(MILLIS_PER_SEC))
        .and_then(|v| v.checked_mul(d_scale))
        .ok_or(ParseTimeError::Overflow)?;
    let bottom = d_mant.checked_mul(n_scale).ok_or(ParseTimeError::Overflow)?;
    let ms = div_round_nearest_u128(top, bottom);
    u64::try_from(ms)
        .map(TimeValue)
        .map_err(|_| ParseTimeError::Overflow)
}

impl FromStr for TimeValue {
    type Err = ParseTimeError;

    /// Accepts `250`, `250ms`, `1.5s`, `2m`, `1h`, `1m30s`, `1m 30.5s`
    /// and shutter fractions such as `1/30`. A bare number is milliseconds.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let compact: String = s.chars().filter(|c| !c.is_whitespace()).collect();
        if compact.is_empty() {
            return Err(ParseTimeError::Empty);
        }
        if let Some((num, den)) = compact.split_once('/') {
            return parse_fraction(num, den);
        }

        let bytes = compact.as_bytes();
        let mut total: u128 = 0;
        let mut pos = 0;
        let mut terms = 0;
        while pos < bytes.len() {
            let num_start = pos;
            while pos < bytes.len() && (bytes[pos].is_ascii_digit() || bytes[pos] == b'.') {
                pos += 1;
            }
            let unit_start = pos;
            while pos < bytes.len() && bytes[pos].is_ascii_alphabetic() {
                pos += 1;
            }
            let number = &compact[num_start..unit_start];
            let unit = compact[unit_start..pos].to_ascii_lowercase();
            if number.is_empty() {
                return Err(ParseTimeError::InvalidNumber(compact[num_start..].to_string()));
            }
            let (mantissa, scale) = parse_decimal(number)?;
            let per_unit = if unit.is_empty() {
                // A bare number only stands alone
                if terms > 0 || pos < bytes.len() {
                    return Err(ParseTimeError::MissingUnit(number.to_string()));
                }
                1
            } else {
                unit_ms(&unit)?
            };
            let term = div_round_nearest_u128(
                mantissa.checked_mul(per_unit).ok_or(ParseTimeError::Overflow)?,
                scale,
            );
            total = total.checked_add(term).ok_or(ParseTimeError::Overflow)?;
            terms += 1;
        }
        u64::try_from(total)
            .map(TimeValue)
            .map_err(|_| ParseTimeError::Overflow)
    }
}
