mod cli;
mod error_fmt;
mod plan;
mod rt;
mod run;

use std::path::Path;

use bramp_config::Config;
use bramp_core::ExposureLadder;
use bramp_core::error::Report;
use clap::Parser;
use eyre::{Result, WrapErr};

use crate::cli::{Cli, Commands, DEFAULT_CONFIG, FILE_GUARD, JSON_MODE, SequenceArgs};
use crate::error_fmt::{exit_code_for_error, format_error_json, humanize};

fn main() {
    // clap exits with status 2 on usage errors
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    if let Err(e) = color_eyre::install() {
        eprintln!("warning: color-eyre not installed: {e}");
    }

    let code = match real_main(cli) {
        Ok(()) => 0,
        Err(err) => {
            if JSON_MODE.get().copied().unwrap_or(false) {
                eprintln!("{}", format_error_json(&err));
            } else {
                eprintln!("{}", humanize(&err));
            }
            tracing::debug!(error = ?err, "command failed");
            exit_code_for_error(&err)
        }
    };
    std::process::exit(code);
}

fn real_main(cli: Cli) -> Result<()> {
    let cfg = load_config(cli.config.as_deref())?;
    cfg.validate().wrap_err("invalid configuration")?;
    init_tracing(cli.json, cli.log_level.as_deref(), &cfg.logging)?;

    let ladder = match &cli.presets {
        Some(path) => {
            let rows = bramp_config::load_ladder_csv(path)?;
            ExposureLadder::try_from(rows.as_slice()).map_err(Report::new)?
        }
        None => ExposureLadder::standard(),
    };

    match cli.cmd {
        Commands::Plan { seq, steps } => plan::run_plan(&seq, &cfg, cli.json, steps),
        Commands::Run {
            seq,
            rt,
            rt_prio,
            rt_lock,
        } => {
            let trigger = run::make_trigger(&cfg)?;
            run::run_sequence(&seq, &cfg, cli.json, trigger, (rt, rt_prio, rt_lock))
        }
        Commands::Presets { interval } => plan::run_presets(&ladder, interval.as_deref(), cli.json),
        Commands::SelfCheck => self_check(&cfg, &ladder, cli.json),
    }
}

/// An explicit `--config` must exist; the default path is optional.
fn load_config(path: Option<&Path>) -> Result<Config> {
    let (path, required) = match path {
        Some(p) => (p, true),
        None => (Path::new(DEFAULT_CONFIG), false),
    };
    if !required && !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)
        .wrap_err_with(|| format!("read config {}", path.display()))?;
    bramp_config::load_toml(&text).wrap_err_with(|| format!("parse config {}", path.display()))
}

fn init_tracing(json: bool, level: Option<&str>, logging: &bramp_config::Logging) -> Result<()> {
    use tracing_subscriber::{EnvFilter, Layer, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    // RUST_LOG wins over --log-level, which wins over logging.level
    let level = level.or(logging.level.as_deref()).unwrap_or("info");
    let filter = match EnvFilter::try_from_default_env() {
        Ok(f) => f,
        Err(_) => EnvFilter::try_new(level).wrap_err_with(|| format!("invalid log level {level:?}"))?,
    };

    // stdout carries results; logs go to stderr
    let console = if json {
        fmt::layer().json().with_writer(std::io::stderr).boxed()
    } else {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .boxed()
    };

    let file_layer = match logging.file.as_deref() {
        Some(file) => {
            let path = Path::new(file);
            let dir = path
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or_else(|| Path::new("."));
            let name = path
                .file_name()
                .ok_or_else(|| eyre::eyre!("logging.file has no file name: {file}"))?;
            let appender = match logging.rotation.as_deref() {
                Some("daily") => tracing_appender::rolling::daily(dir, name),
                Some("hourly") => tracing_appender::rolling::hourly(dir, name),
                _ => tracing_appender::rolling::never(dir, name),
            };
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let _ = FILE_GUARD.set(guard);
            Some(fmt::layer().json().with_writer(writer).boxed())
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file_layer)
        .try_init()
        .wrap_err("init tracing")
}

fn self_check(cfg: &Config, ladder: &ExposureLadder, json: bool) -> Result<()> {
    let params = plan::resolve_params(&SequenceArgs::default(), cfg)?;
    let _trigger = run::make_trigger(cfg)?;
    let backend = if cfg!(all(feature = "hardware", target_os = "linux")) {
        "gpio"
    } else {
        "simulated"
    };
    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "trigger": backend,
                "presets": ladder.len(),
                "default_photos": params.photo_count,
            })
        );
    } else {
        println!("Config OK, trigger: {backend}, {} presets", ladder.len());
    }
    tracing::info!(trigger = backend, "self-check passed");
    Ok(())
}
