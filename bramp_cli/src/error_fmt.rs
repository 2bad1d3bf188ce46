//! Human-readable error descriptions and structured JSON error formatting.

use bramp_core::BrampError;

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BrampError>() {
        return match be {
            BrampError::InvalidParameters(msg) => format!(
                "What happened: The ramp parameters are invalid ({msg}).\nLikely causes: An exposure longer than the interval, zero photos, or an interval shorter than the trigger pulse.\nHow to fix: Check --photos/--interval/--first/--last (or [sequence] in the config) and run `bramp plan` to preview."
            ),
            BrampError::AlreadyPlaying => {
                "What happened: A sequence is already playing.\nLikely causes: Another playback in this process has not finished.\nHow to fix: Cancel the running sequence first.".to_string()
            }
            BrampError::HardwareFault(msg) => format!(
                "What happened: The camera trigger failed ({msg}).\nLikely causes: Release cable unplugged, wrong trigger pin, or missing GPIO permissions.\nHow to fix: Check the cable and hardware.trigger_pin, then start a new run. The shutter line was released."
            ),
            BrampError::Cancelled => {
                "What happened: The sequence was cancelled.\nLikely causes: Ctrl-C or another stop request.\nHow to fix: Start a new run when ready.".to_string()
            }
            BrampError::Unavailable(msg) => format!(
                "What happened: The dispatcher could not start ({msg}).\nLikely causes: A previous playback crashed or the system is out of threads.\nHow to fix: Restart the program; re-run with --log-level=debug for detail."
            ),
        };
    }

    // String-based heuristics for errors coming from init or config
    let msg = err.to_string();
    let lower = msg.to_ascii_lowercase();

    if lower.contains("trigger_pin missing") || lower.contains("open trigger pin") {
        return "What happened: Failed to initialize the trigger pin.\nLikely causes: hardware.trigger_pin unset or wrong, or insufficient GPIO permissions.\nHow to fix: Fix [hardware] in the config; ensure the process may access GPIO.".to_string();
    }

    if lower.contains("exposure ladder csv must have headers") {
        return "Invalid headers in exposure ladder CSV. Expected 'label,ms'.".to_string();
    }

    if lower.contains("read config") || lower.contains("parse config") {
        return format!(
            "What happened: The configuration could not be loaded.\nLikely causes: Missing file or invalid TOML.\nHow to fix: Check the --config path and syntax. Original: {msg}"
        );
    }

    // Generic fallback
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Exit status: 0 ok, 1 generic, 2 usage (clap), 3 invalid parameters,
/// 4 cancelled, 5 hardware fault.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    match err.downcast_ref::<BrampError>() {
        Some(BrampError::InvalidParameters(_)) => 3,
        Some(BrampError::Cancelled) => 4,
        Some(BrampError::HardwareFault(_)) => 5,
        _ => 1,
    }
}

fn reason_name(err: &eyre::Report) -> &'static str {
    match err.downcast_ref::<BrampError>() {
        Some(BrampError::InvalidParameters(_)) => "InvalidParameters",
        Some(BrampError::AlreadyPlaying) => "AlreadyPlaying",
        Some(BrampError::HardwareFault(_)) => "HardwareFault",
        Some(BrampError::Cancelled) => "Cancelled",
        Some(BrampError::Unavailable(_)) => "Unavailable",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(BrampError::InvalidParameters("x".into()), 3)]
    #[case(BrampError::Cancelled, 4)]
    #[case(BrampError::HardwareFault("unplugged".into()), 5)]
    #[case(BrampError::AlreadyPlaying, 1)]
    fn exit_codes(#[case] e: BrampError, #[case] code: i32) {
        let report = eyre::Report::new(e).wrap_err("context");
        assert_eq!(exit_code_for_error(&report), code);
    }

    #[test]
    fn json_error_names_reason() {
        let report = eyre::Report::new(BrampError::HardwareFault("unplugged".into()));
        let v: serde_json::Value = serde_json::from_str(&format_error_json(&report)).unwrap();
        assert_eq!(v["reason"], "HardwareFault");
        assert_eq!(v["exit_code"], 5);
        assert!(v["message"].as_str().unwrap().contains("unplugged"));
    }
}
