//! Standard shutter-speed ladder offered for first/last exposure.
//!
//! Third-stop steps starting at 1/16 s: `round(62.5 * 2^(k/3))` ms for
//! k = 0, 1, ... up to the longest supported exposure.

use crate::time::TimeValue;

/// Shortest ladder exposure (1/16 s, rounded).
pub const LADDER_MIN: TimeValue = TimeValue::from_millis(63);
/// Longest ladder exposure.
pub const LADDER_MAX: TimeValue = TimeValue::from_millis(bramp_config::MAX_EXPOSURE_MS);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposurePreset {
    pub label: String,
    pub exposure: TimeValue,
}

/// Strictly increasing list of exposure presets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExposureLadder {
    presets: Vec<ExposurePreset>,
}

impl ExposureLadder {
    pub fn standard() -> Self {
        let mut presets = Vec::new();
        for k in 0..64 {
            let ms = (62.5_f64 * 2f64.powf(f64::from(k) / 3.0)).round();
            #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
            let exposure = TimeValue::from_millis(ms as u64);
            if exposure > LADDER_MAX {
                break;
            }
            presets.push(ExposurePreset {
                label: exposure.shutter_label(),
                exposure,
            });
        }
        Self { presets }
    }

    /// Build from presets that are already known to be strictly increasing
    /// and non-empty (see `bramp_config::validate_ladder`).
    pub(crate) fn from_sorted(presets: Vec<ExposurePreset>) -> Self {
        debug_assert!(
            presets.windows(2).all(|w| w[0].exposure < w[1].exposure),
            "ladder must be strictly increasing"
        );
        Self { presets }
    }

    pub fn presets(&self) -> &[ExposurePreset] {
        &self.presets
    }

    pub fn len(&self) -> usize {
        self.presets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.presets.is_empty()
    }

    pub fn first(&self) -> Option<&ExposurePreset> {
        self.presets.first()
    }

    pub fn last(&self) -> Option<&ExposurePreset> {
        self.presets.last()
    }

    /// Longest preset that still fits in `limit`; the picker maximum once an
    /// interval has been chosen. `None` when even the shortest is too long.
    pub fn largest_at_most(&self, limit: TimeValue) -> Option<&ExposurePreset> {
        let idx = self.presets.partition_point(|p| p.exposure <= limit);
        idx.checked_sub(1).map(|i| &self.presets[i])
    }

    /// Presets usable with `interval`.
    pub fn up_to(&self, interval: TimeValue) -> &[ExposurePreset] {
        let idx = self.presets.partition_point(|p| p.exposure <= interval);
        &self.presets[..idx]
    }

    pub fn find_label(&self, label: &str) -> Option<&ExposurePreset> {
        self.presets.iter().find(|p| p.label == label)
    }
}

impl Default for ExposureLadder {
    fn default() -> Self {
        Self::standard()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ms(v: u64) -> TimeValue {
        TimeValue::from_millis(v)
    }

    #[test]
    fn standard_ladder_spans_supported_range() {
        let ladder = ExposureLadder::standard();
        assert_eq!(ladder.first().map(|p| p.exposure), Some(LADDER_MIN));
        assert_eq!(ladder.len(), 51);
        assert!(ladder.last().is_some_and(|p| p.exposure <= LADDER_MAX));
        assert!(
            ladder
                .presets()
                .windows(2)
                .all(|w| w[0].exposure < w[1].exposure)
        );
        // whole stops land exactly
        for expected in [125, 250, 500, 1_000, 2_000, 16_000] {
            assert!(ladder.presets().iter().any(|p| p.exposure == ms(expected)));
        }
    }

    #[test]
    fn largest_at_most_includes_equal_value() {
        let ladder = ExposureLadder::standard();
        assert_eq!(
            ladder.largest_at_most(ms(1_000)).map(|p| p.exposure),
            Some(ms(1_000))
        );
        assert_eq!(
            ladder.largest_at_most(ms(999)).map(|p| p.exposure),
            Some(ms(794))
        );
        assert_eq!(ladder.largest_at_most(ms(62)), None);
        assert_eq!(ladder.up_to(ms(125)).len(), 4);
    }

    #[test]
    fn labels_use_shutter_notation() {
        let ladder = ExposureLadder::standard();
        assert!(ladder.find_label("1/16").is_some());
        assert!(ladder.find_label("1/8").is_some());
        assert!(ladder.find_label("2s").is_some());
    }
}
