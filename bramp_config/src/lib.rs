#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and exposure ladder parsing for the bulb-ramping sequencer.
//!
//! - `Config` and its sections are deserialized from TOML and validated.
//!   Every section has defaults, so an empty file is a valid config.
//! - The exposure ladder CSV loader enforces headers and strict ordering.
use serde::Deserialize;

/// Longest exposure any ladder entry may carry (~113 minutes).
pub const MAX_EXPOSURE_MS: u64 = 6_800_000;

/// Exposure ladder CSV schema.
///
/// Expected headers:
/// label,ms
///
/// Example:
/// label,ms
/// 1/15,67
/// 1/8,125
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LadderRow {
    pub label: String,
    pub ms: u64,
}

/// Default sequence parameters used when the CLI flags are omitted.
///
/// Durations are plain strings so the config can say `"1/15"` or `"10s"`;
/// they are parsed by the core `TimeValue` parser.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct SequenceDefaults {
    pub photos: u32,
    pub interval: String,
    pub first_exposure: String,
    pub last_exposure: String,
    /// "linear" | "exponential"
    pub curve: CurveName,
}

impl Default for SequenceDefaults {
    fn default() -> Self {
        Self {
            photos: 360,
            interval: "10s".into(),
            first_exposure: "1/4".into(),
            last_exposure: "2s".into(),
            curve: CurveName::Linear,
        }
    }
}

#[derive(Debug, Deserialize, Clone, Copy, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CurveName {
    #[default]
    Linear,
    Exponential,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Hardware {
    /// GPIO pin driving the shutter (only used with the `hardware` feature)
    pub trigger_pin: Option<u8>,
    /// Treat a low level as "shutter held" when true
    pub active_low: bool,
    /// Minimum reliable trigger pulse the camera registers (ms)
    pub pulse_length_ms: u64,
}

impl Default for Hardware {
    fn default() -> Self {
        Self {
            trigger_pin: None,
            active_low: false,
            pulse_length_ms: 100,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct DispatchCfg {
    /// Longest single sleep inside a step wait; bounds cancel latency (ms)
    pub poll_ms: u64,
}

impl Default for DispatchCfg {
    fn default() -> Self {
        Self { poll_ms: 10 }
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    pub file: Option<String>,  // path to .log (JSON lines)
    pub level: Option<String>, // "info","debug"
    /// Log rotation policy: "never" | "daily" | "hourly" (default: never)
    pub rotation: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Config {
    pub sequence: SequenceDefaults,
    pub hardware: Hardware,
    pub dispatch: DispatchCfg,
    pub logging: Logging,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    pub fn validate(&self) -> eyre::Result<()> {
        // Sequence
        if self.sequence.photos == 0 {
            eyre::bail!("sequence.photos must be >= 1");
        }
        for (name, v) in [
            ("sequence.interval", &self.sequence.interval),
            ("sequence.first_exposure", &self.sequence.first_exposure),
            ("sequence.last_exposure", &self.sequence.last_exposure),
        ] {
            if v.trim().is_empty() {
                eyre::bail!("{name} must not be empty");
            }
        }

        // Hardware
        if self.hardware.pulse_length_ms == 0 {
            eyre::bail!("hardware.pulse_length_ms must be >= 1");
        }
        if self.hardware.pulse_length_ms > 10_000 {
            eyre::bail!("hardware.pulse_length_ms is unreasonably large (>10s)");
        }

        // Dispatch
        if !(1..=50).contains(&self.dispatch.poll_ms) {
            eyre::bail!("dispatch.poll_ms must be in [1, 50]");
        }

        // Logging
        if let Some(r) = self.logging.rotation.as_deref()
            && !matches!(r, "never" | "daily" | "hourly")
        {
            eyre::bail!("logging.rotation must be one of never|daily|hourly, got {r:?}");
        }

        Ok(())
    }
}

/// Validate ladder rows: at least one entry, strictly increasing, each
/// within `1..=MAX_EXPOSURE_MS`, non-empty labels.
pub fn validate_ladder(rows: &[LadderRow]) -> eyre::Result<()> {
    if rows.is_empty() {
        eyre::bail!("exposure ladder must contain at least one row");
    }
    for (i, row) in rows.iter().enumerate() {
        if row.label.trim().is_empty() {
            eyre::bail!("exposure ladder row {} has an empty label", i + 2);
        }
        if !(1..=MAX_EXPOSURE_MS).contains(&row.ms) {
            eyre::bail!(
                "exposure ladder row {} ({}) must be within 1..={MAX_EXPOSURE_MS} ms, got {}",
                i + 2,
                row.label,
                row.ms
            );
        }
    }
    for pair in rows.windows(2) {
        if pair[1].ms <= pair[0].ms {
            eyre::bail!(
                "exposure ladder must be strictly increasing: {} ({} ms) follows {} ({} ms)",
                pair[1].label,
                pair[1].ms,
                pair[0].label,
                pair[0].ms
            );
        }
    }
    Ok(())
}

pub fn load_ladder_csv(path: &std::path::Path) -> eyre::Result<Vec<LadderRow>> {
    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| eyre::eyre!("open exposure ladder CSV {:?}: {}", path, e))?;

    // Enforce exact headers
    let headers = rdr
        .headers()
        .map_err(|e| eyre::eyre!("read CSV headers {:?}: {}", path, e))?
        .clone();
    let expected = ["label", "ms"];
    let actual: Vec<String> = headers.iter().map(ToString::to_string).collect();
    if actual != expected {
        eyre::bail!(
            "exposure ladder CSV must have headers 'label,ms', got: {}",
            actual.join(",")
        );
    }

    let mut rows = Vec::new();
    for (idx, rec) in rdr.deserialize::<LadderRow>().enumerate() {
        match rec {
            Ok(row) => rows.push(row),
            Err(e) => {
                eyre::bail!("invalid CSV row {}: {}", idx + 2, e);
            }
        }
    }

    validate_ladder(&rows)?;
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_is_default_config() {
        let cfg = load_toml("").expect("empty toml parses");
        cfg.validate().expect("defaults validate");
        assert_eq!(cfg.sequence.photos, 360);
        assert_eq!(cfg.dispatch.poll_ms, 10);
        assert_eq!(cfg.hardware.pulse_length_ms, 100);
    }

    #[test]
    fn curve_names_are_lowercase() {
        let cfg = load_toml("[sequence]\ncurve = \"exponential\"\n").unwrap();
        assert_eq!(cfg.sequence.curve, CurveName::Exponential);
        assert!(load_toml("[sequence]\ncurve = \"Cubic\"\n").is_err());
    }
}
