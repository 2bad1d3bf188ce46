//! Bulb-ramp sequence calculation.
//!
//! Pure functions: the same four inputs always give the same sequence.
//! A ramp of `n` photos becomes `2n - 1` alternating steps,
//! `Pulse, Delay, Pulse, ..., Pulse`, where every pulse+delay pair spans
//! exactly one interval and no delay trails the last pulse.

use crate::error::BrampError;
use crate::sequence::{Sequence, Step};
use crate::time::TimeValue;
use crate::util::{div_round_nearest_u128, saturate_u64};

/// How exposures move from the first to the last value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RampCurve {
    /// Equal millisecond increments.
    #[default]
    Linear,
    /// Equal ratio between neighbours (equal fractions of a stop).
    Exponential,
}

impl RampCurve {
    pub const fn name(self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Exponential => "exponential",
        }
    }
}

/// The scalar inputs of a bulb ramp.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrampingParams {
    pub photo_count: u32,
    pub first_exposure: TimeValue,
    pub last_exposure: TimeValue,
    pub interval: TimeValue,
    pub curve: RampCurve,
}

impl BrampingParams {
    pub const fn new(
        photo_count: u32,
        first_exposure: TimeValue,
        last_exposure: TimeValue,
        interval: TimeValue,
    ) -> Self {
        Self {
            photo_count,
            first_exposure,
            last_exposure,
            interval,
            curve: RampCurve::Linear,
        }
    }

    #[must_use]
    pub const fn with_curve(mut self, curve: RampCurve) -> Self {
        self.curve = curve;
        self
    }

    pub fn validate(&self) -> Result<(), BrampError> {
        if self.photo_count == 0 {
            return Err(BrampError::InvalidParameters(
                "photo count must be >= 1".into(),
            ));
        }
        if self.interval.is_zero() {
            return Err(BrampError::InvalidParameters("interval must be > 0".into()));
        }
        for (name, exposure) in [
            ("first", self.first_exposure),
            ("last", self.last_exposure),
        ] {
            if exposure > self.interval {
                return Err(BrampError::InvalidParameters(format!(
                    "{name} exposure ({exposure}) exceeds the interval ({})",
                    self.interval
                )));
            }
        }
        if self.curve == RampCurve::Exponential
            && (self.first_exposure.is_zero() || self.last_exposure.is_zero())
        {
            return Err(BrampError::InvalidParameters(
                "an exponential ramp needs non-zero first and last exposures".into(),
            ));
        }
        Ok(())
    }

    /// Exposure of photo `index` (0-based). Indexes past the end return the
    /// last exposure. Assumes the params are valid.
    pub fn exposure_at(&self, index: u32) -> TimeValue {
        let steps = self.photo_count.saturating_sub(1);
        if steps == 0 || index == 0 {
            return self.first_exposure;
        }
        if index >= steps {
            return self.last_exposure;
        }
        match self.curve {
            RampCurve::Linear => self.linear_at(index, steps),
            RampCurve::Exponential => self.exponential_at(index, steps),
        }
    }

    /// `round(first + (last - first) * i / steps)` in exact integer math.
    ///
    /// The interpolated value lies between the endpoints and is therefore
    /// non-negative, so rounding half away from zero is rounding half up
    /// on `first * steps + (last - first) * i` over `steps`.
    fn linear_at(&self, index: u32, steps: u32) -> TimeValue {
        let first = i128::from(self.first_exposure.as_millis());
        let last = i128::from(self.last_exposure.as_millis());
        let steps_i = i128::from(steps);
        let num = first * steps_i + (last - first) * i128::from(index);
        debug_assert!(num >= 0, "linear interpolation left the endpoint range");
        let num = u128::try_from(num).unwrap_or(0);
        let ms = div_round_nearest_u128(num, u128::from(steps));
        TimeValue::from_millis(saturate_u64(ms))
    }

    /// `first * (last / first)^(i / steps)`, rounded and kept within the
    /// endpoint range so float error can never escape it.
    fn exponential_at(&self, index: u32, steps: u32) -> TimeValue {
        let first = self.first_exposure.as_millis();
        let last = self.last_exposure.as_millis();
        #[allow(clippy::cast_precision_loss)]
        let (f, l) = (first as f64, last as f64);
        let t = f64::from(index) / f64::from(steps);
        let v = (f * (l / f).powf(t)).round();
        let (lo, hi) = (first.min(last), first.max(last));
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let ms = if v.is_finite() && v >= 0.0 { v as u64 } else { lo };
        TimeValue::from_millis(ms.clamp(lo, hi))
    }

    /// Rough running time as shown before a run starts: photos x interval.
    pub fn estimated_duration(&self) -> TimeValue {
        self.interval.saturating_mul(u64::from(self.photo_count))
    }

    /// Exact running time of the computed sequence:
    /// `(n - 1) * interval + exposure(n - 1)`.
    pub fn total_duration(&self) -> TimeValue {
        let n = self.photo_count.max(1);
        self.interval
            .saturating_mul(u64::from(n - 1))
            .saturating_add(self.exposure_at(n - 1))
    }

    pub fn sequence(&self) -> Result<Sequence, BrampError> {
        self.validate()?;
        let n = self.photo_count;
        let mut steps = Vec::with_capacity((n as usize).saturating_mul(2).saturating_sub(1));
        for i in 0..n {
            let exposure = self.exposure_at(i);
            steps.push(Step::pulse(exposure));
            if i + 1 < n {
                steps.push(Step::delay(self.interval.saturating_sub(exposure)));
            }
        }
        tracing::debug!(
            photos = n,
            interval_ms = self.interval.as_millis(),
            first_ms = self.first_exposure.as_millis(),
            last_ms = self.last_exposure.as_millis(),
            curve = self.curve.name(),
            "bramping sequence computed"
        );
        Ok(Sequence::from_steps(steps))
    }
}

/// Linear bulb ramp of `photo_count` exposures spaced `interval` apart.
///
/// Fails with `InvalidParameters` when `photo_count` is zero, `interval` is
/// zero, or either exposure is longer than `interval`.
pub fn compute_bramping_sequence(
    photo_count: u32,
    first_exposure: TimeValue,
    last_exposure: TimeValue,
    interval: TimeValue,
) -> Result<Sequence, BrampError> {
    BrampingParams::new(photo_count, first_exposure, last_exposure, interval).sequence()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn ms(v: u64) -> TimeValue {
        TimeValue::from_millis(v)
    }

    #[test]
    fn three_photo_example() {
        let seq = compute_bramping_sequence(3, ms(100), ms(300), ms(1_000)).unwrap();
        assert_eq!(
            seq.steps(),
            &[
                Step::pulse(ms(100)),
                Step::delay(ms(900)),
                Step::pulse(ms(200)),
                Step::delay(ms(800)),
                Step::pulse(ms(300)),
            ]
        );
        assert_eq!(seq.total_duration(), ms(2_300));
    }

    #[test]
    fn single_photo_is_one_pulse_of_first_exposure() {
        let seq = compute_bramping_sequence(1, ms(250), ms(900), ms(1_000)).unwrap();
        assert_eq!(seq.steps(), &[Step::pulse(ms(250))]);
    }

    #[test]
    fn rounds_half_away_from_zero() {
        // 100 + 1 * 1/2 = 100.5 -> 101
        let p = BrampingParams::new(3, ms(100), ms(101), ms(1_000));
        assert_eq!(p.exposure_at(1), ms(101));
        // descending: 101 - 0.5 = 100.5 -> 101, not 100
        let p = BrampingParams::new(3, ms(101), ms(100), ms(1_000));
        assert_eq!(p.exposure_at(1), ms(101));
        // 0 + 1/3 -> 0, 0 + 2/3 -> 1
        let p = BrampingParams::new(4, ms(0), ms(1), ms(10));
        assert_eq!(
            (0..4).map(|i| p.exposure_at(i).as_millis()).collect::<Vec<_>>(),
            vec![0, 0, 1, 1]
        );
    }

    #[rstest]
    #[case(0, 100, 100, 1_000, "photo count")]
    #[case(3, 100, 100, 0, "interval must be > 0")]
    #[case(3, 1_001, 100, 1_000, "first exposure")]
    #[case(3, 100, 1_001, 1_000, "last exposure")]
    fn rejects_invalid(
        #[case] n: u32,
        #[case] first: u64,
        #[case] last: u64,
        #[case] interval: u64,
        #[case] needle: &str,
    ) {
        let err = compute_bramping_sequence(n, ms(first), ms(last), ms(interval)).unwrap_err();
        match err {
            BrampError::InvalidParameters(msg) => assert!(msg.contains(needle), "{msg}"),
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn exposure_equal_to_interval_leaves_zero_delay() {
        let seq = compute_bramping_sequence(2, ms(500), ms(500), ms(500)).unwrap();
        assert_eq!(
            seq.steps(),
            &[Step::pulse(ms(500)), Step::delay(ms(0)), Step::pulse(ms(500))]
        );
    }

    #[test]
    fn exponential_doubles_per_equal_step() {
        let p = BrampingParams::new(5, ms(100), ms(1_600), ms(2_000))
            .with_curve(RampCurve::Exponential);
        let exposures: Vec<u64> = p.sequence().unwrap().exposures().map(TimeValue::as_millis).collect();
        assert_eq!(exposures, vec![100, 200, 400, 800, 1_600]);
    }

    #[test]
    fn exponential_rejects_zero_endpoint() {
        let p = BrampingParams::new(5, ms(0), ms(1_600), ms(2_000))
            .with_curve(RampCurve::Exponential);
        assert!(matches!(p.validate(), Err(BrampError::InvalidParameters(_))));
    }

    #[test]
    fn total_duration_matches_formula() {
        let p = BrampingParams::new(360, ms(250), ms(2_000), ms(10_000));
        let seq = p.sequence().unwrap();
        assert_eq!(seq.total_duration(), p.total_duration());
        assert_eq!(p.total_duration(), ms(359 * 10_000 + 2_000));
        assert_eq!(p.estimated_duration(), ms(3_600_000));
    }
}
