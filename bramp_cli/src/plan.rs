//! Resolving ramp parameters from flags and config, and the `plan` command.

use bramp_config::Config;
use bramp_core::error::Report;
use bramp_core::{BrampError, BrampingParams, ExposureLadder, Sequence, TimeValue, limits};
use eyre::Result;
use serde_json::json;

use crate::cli::SequenceArgs;

fn parse_flag(name: &str, raw: &str) -> std::result::Result<TimeValue, BrampError> {
    raw.parse::<TimeValue>()
        .map_err(|e| BrampError::InvalidParameters(format!("--{name} '{raw}': {e}")))
}

/// Merge CLI flags over `[sequence]`, then check everything the calculator
/// and the trigger need.
pub fn resolve_params(args: &SequenceArgs, cfg: &Config) -> Result<BrampingParams> {
    let mut params = BrampingParams::try_from(&cfg.sequence).map_err(Report::new)?;
    if let Some(n) = args.photos {
        params.photo_count = n;
    }
    if let Some(s) = &args.interval {
        params.interval = parse_flag("interval", s).map_err(Report::new)?;
    }
    if let Some(s) = &args.first {
        params.first_exposure = parse_flag("first", s).map_err(Report::new)?;
    }
    if let Some(s) = &args.last {
        params.last_exposure = parse_flag("last", s).map_err(Report::new)?;
    }
    if let Some(c) = args.curve {
        params.curve = c.into();
    }

    params.validate().map_err(Report::new)?;
    let pulse = TimeValue::from_millis(cfg.hardware.pulse_length_ms);
    limits::check_interval(&params, pulse).map_err(Report::new)?;
    if limits::has_short_exposures(&params, pulse) {
        tracing::warn!(
            pulse_ms = pulse.as_millis(),
            "some exposures are shorter than the trigger pulse; the camera may stretch them"
        );
    }
    Ok(params)
}

pub fn summary_json(params: &BrampingParams, seq: &Sequence) -> serde_json::Value {
    json!({
        "photos": params.photo_count,
        "interval_ms": params.interval.as_millis(),
        "first_exposure_ms": params.first_exposure.as_millis(),
        "last_exposure_ms": params.last_exposure.as_millis(),
        "curve": params.curve.name(),
        "steps": seq.len(),
        "total_ms": seq.total_duration().as_millis(),
        "estimated_ms": params.estimated_duration().as_millis(),
    })
}

pub fn print_plan(params: &BrampingParams, seq: &Sequence, json_mode: bool, with_steps: bool) {
    if json_mode {
        let mut obj = summary_json(params, seq);
        if with_steps {
            let exposures: Vec<u64> = seq.exposures().map(TimeValue::as_millis).collect();
            obj["exposures_ms"] = json!(exposures);
        }
        println!("{obj}");
        return;
    }

    println!(
        "{} photos every {}, {} -> {} ({})",
        params.photo_count,
        params.interval,
        params.first_exposure,
        params.last_exposure,
        params.curve.name()
    );
    println!("Steps: {}", seq.len());
    println!("Total duration: {}", seq.total_duration());
    if with_steps {
        for (i, exposure) in seq.exposures().enumerate() {
            println!("{:>6}  {exposure}", i + 1);
        }
    }
}

pub fn run_plan(
    args: &SequenceArgs,
    cfg: &Config,
    json_mode: bool,
    with_steps: bool,
) -> Result<()> {
    let params = resolve_params(args, cfg)?;
    let seq = params.sequence().map_err(Report::new)?;
    print_plan(&params, &seq, json_mode, with_steps);
    Ok(())
}

pub fn run_presets(ladder: &ExposureLadder, interval: Option<&str>, json_mode: bool) -> Result<()> {
    let presets = match interval {
        Some(raw) => {
            let limit = parse_flag("interval", raw).map_err(Report::new)?;
            ladder.up_to(limit)
        }
        None => ladder.presets(),
    };
    if json_mode {
        let rows: Vec<_> = presets
            .iter()
            .map(|p| json!({ "label": p.label, "ms": p.exposure.as_millis() }))
            .collect();
        println!("{}", json!(rows));
    } else {
        for p in presets {
            println!("{:>8}  {}", p.label, p.exposure);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_override_config() {
        let cfg = Config::default();
        let args = SequenceArgs {
            photos: Some(3),
            interval: Some("1s".into()),
            first: Some("100ms".into()),
            last: Some("300ms".into()),
            curve: None,
        };
        let p = resolve_params(&args, &cfg).unwrap();
        assert_eq!(p.photo_count, 3);
        assert_eq!(p.interval, TimeValue::from_secs(1));
    }

    #[test]
    fn interval_below_pulse_is_rejected() {
        let cfg = Config::default();
        let args = SequenceArgs {
            photos: Some(3),
            interval: Some("80ms".into()),
            first: Some("0".into()),
            last: Some("0".into()),
            curve: None,
        };
        let err = resolve_params(&args, &cfg).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<BrampError>(),
            Some(BrampError::InvalidParameters(_))
        ));
    }
}
