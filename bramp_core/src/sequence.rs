//! Timed steps and the immutable sequence the dispatcher plays.

use std::fmt;

use crate::time::TimeValue;

/// One timed step of a sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Step {
    /// Shutter held open for `duration`.
    Pulse { duration: TimeValue },
    /// Shutter released for `duration`.
    Delay { duration: TimeValue },
}

impl Step {
    #[inline]
    pub const fn pulse(duration: TimeValue) -> Self {
        Self::Pulse { duration }
    }

    #[inline]
    pub const fn delay(duration: TimeValue) -> Self {
        Self::Delay { duration }
    }

    #[inline]
    pub const fn duration(&self) -> TimeValue {
        match *self {
            Self::Pulse { duration } | Self::Delay { duration } => duration,
        }
    }

    #[inline]
    pub const fn is_pulse(&self) -> bool {
        matches!(self, Self::Pulse { .. })
    }

    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Pulse { .. } => "pulse",
            Self::Delay { .. } => "delay",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.kind(), self.duration())
    }
}

/// An ordered, immutable list of steps.
///
/// The total duration is always derived from the steps; there is no
/// separately stored total that could drift from them.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Sequence {
    steps: Box<[Step]>,
}

impl Sequence {
    pub fn from_steps(steps: impl Into<Vec<Step>>) -> Self {
        Self {
            steps: steps.into().into_boxed_slice(),
        }
    }

    #[inline]
    pub fn steps(&self) -> &[Step] {
        &self.steps
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Step> {
        self.steps.iter()
    }

    pub fn total_duration(&self) -> TimeValue {
        self.steps.iter().map(Step::duration).sum()
    }

    pub fn pulse_count(&self) -> usize {
        self.steps.iter().filter(|s| s.is_pulse()).count()
    }

    /// Exposure of every pulse, in order.
    pub fn exposures(&self) -> impl Iterator<Item = TimeValue> + '_ {
        self.steps
            .iter()
            .filter(|s| s.is_pulse())
            .map(Step::duration)
    }

    /// Offset of the start of step `index` from the start of the sequence.
    /// Indexes past the end give the total duration.
    pub fn offset_of(&self, index: usize) -> TimeValue {
        self.steps
            .iter()
            .take(index)
            .map(Step::duration)
            .sum()
    }
}

impl<'a> IntoIterator for &'a Sequence {
    type Item = &'a Step;
    type IntoIter = std::slice::Iter<'a, Step>;

    fn into_iter(self) -> Self::IntoIter {
        self.steps.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> TimeValue {
        TimeValue::from_millis(v)
    }

    #[test]
    fn total_is_sum_of_steps() {
        let seq = Sequence::from_steps(vec![
            Step::pulse(ms(100)),
            Step::delay(ms(900)),
            Step::pulse(ms(0)),
        ]);
        assert_eq!(seq.total_duration(), ms(1_000));
        assert_eq!(seq.pulse_count(), 2);
        assert_eq!(seq.exposures().collect::<Vec<_>>(), vec![ms(100), ms(0)]);
    }

    #[test]
    fn offsets_accumulate() {
        let seq = Sequence::from_steps(vec![Step::pulse(ms(10)), Step::delay(ms(20))]);
        assert_eq!(seq.offset_of(0), ms(0));
        assert_eq!(seq.offset_of(1), ms(10));
        assert_eq!(seq.offset_of(2), ms(30));
        assert_eq!(seq.offset_of(99), ms(30));
    }

    #[test]
    fn empty_sequence_has_zero_duration() {
        let seq = Sequence::default();
        assert!(seq.is_empty());
        assert_eq!(seq.total_duration(), TimeValue::ZERO);
    }

    #[test]
    fn step_display() {
        assert_eq!(Step::pulse(ms(1_500)).to_string(), "pulse 1.5s");
        assert_eq!(Step::delay(ms(20)).to_string(), "delay 20ms");
    }
}
