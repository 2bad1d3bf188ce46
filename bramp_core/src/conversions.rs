//! Conversions from `bramp_config` types to `bramp_core` types.

use crate::calculator::{BrampingParams, RampCurve};
use crate::config::DispatchCfg;
use crate::error::BrampError;
use crate::presets::{ExposureLadder, ExposurePreset};
use crate::time::TimeValue;

impl From<&bramp_config::DispatchCfg> for DispatchCfg {
    fn from(c: &bramp_config::DispatchCfg) -> Self {
        Self { poll_ms: c.poll_ms }
    }
}

impl From<bramp_config::CurveName> for RampCurve {
    fn from(c: bramp_config::CurveName) -> Self {
        match c {
            bramp_config::CurveName::Linear => Self::Linear,
            bramp_config::CurveName::Exponential => Self::Exponential,
        }
    }
}

fn parse_field(name: &str, raw: &str) -> Result<TimeValue, BrampError> {
    raw.parse::<TimeValue>()
        .map_err(|e| BrampError::InvalidParameters(format!("sequence.{name} '{raw}': {e}")))
}

/// Parses the duration strings; the result still needs `validate()`.
impl TryFrom<&bramp_config::SequenceDefaults> for BrampingParams {
    type Error = BrampError;

    fn try_from(c: &bramp_config::SequenceDefaults) -> Result<Self, Self::Error> {
        Ok(Self::new(
            c.photos,
            parse_field("first_exposure", &c.first_exposure)?,
            parse_field("last_exposure", &c.last_exposure)?,
            parse_field("interval", &c.interval)?,
        )
        .with_curve(c.curve.into()))
    }
}

impl TryFrom<&[bramp_config::LadderRow]> for ExposureLadder {
    type Error = BrampError;

    fn try_from(rows: &[bramp_config::LadderRow]) -> Result<Self, Self::Error> {
        bramp_config::validate_ladder(rows)
            .map_err(|e| BrampError::InvalidParameters(e.to_string()))?;
        Ok(Self::from_sorted(
            rows.iter()
                .map(|r| ExposurePreset {
                    label: r.label.clone(),
                    exposure: TimeValue::from_millis(r.ms),
                })
                .collect(),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_defaults_parse() {
        let d = bramp_config::SequenceDefaults::default();
        let p = BrampingParams::try_from(&d).unwrap();
        assert_eq!(p.photo_count, 360);
        assert_eq!(p.first_exposure, TimeValue::from_millis(250));
        assert_eq!(p.last_exposure, TimeValue::from_secs(2));
        assert_eq!(p.interval, TimeValue::from_secs(10));
        assert_eq!(p.curve, RampCurve::Linear);
    }

    #[test]
    fn bad_duration_names_the_field() {
        let d = bramp_config::SequenceDefaults {
            interval: "ten".into(),
            ..Default::default()
        };
        let err = BrampingParams::try_from(&d).unwrap_err();
        assert!(err.to_string().contains("sequence.interval"), "{err}");
    }

    #[test]
    fn ladder_rows_convert() {
        let rows = vec![
            bramp_config::LadderRow { label: "1/8".into(), ms: 125 },
            bramp_config::LadderRow { label: "1/4".into(), ms: 250 },
        ];
        let ladder = ExposureLadder::try_from(rows.as_slice()).unwrap();
        assert_eq!(ladder.len(), 2);
        assert_eq!(
            ladder.largest_at_most(TimeValue::from_millis(200)).map(|p| p.label.as_str()),
            Some("1/8")
        );
    }
}
