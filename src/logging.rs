// src/logging.rs

//! `tracing` subscriber setup.
//!
//! The filter comes from `--log-level` when given, otherwise from the
//! `SITEPIPE_LOG` environment variable, which accepts full `EnvFilter`
//! directives (`sitepipe=debug,hyper=warn`). Without either, sitepipe logs at
//! `info` and the HTTP stack only reports warnings.
//!
//! Everything goes to stderr so `--dry-run` output on stdout stays clean.

use anyhow::{anyhow, Result};
use tracing_subscriber::EnvFilter;

use crate::cli::LogLevel;

pub const LOG_ENV_VAR: &str = "SITEPIPE_LOG";

const DEFAULT_DIRECTIVES: &str = "info,hyper=warn,axum=warn";

pub fn init_logging(cli_level: Option<LogLevel>) -> Result<()> {
    let filter = build_filter(cli_level, std::env::var(LOG_ENV_VAR).ok().as_deref())?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| anyhow!("failed to install log subscriber: {e}"))
}

fn build_filter(cli_level: Option<LogLevel>, env: Option<&str>) -> Result<EnvFilter> {
    let directives = match (cli_level, env) {
        (Some(level), _) => format!("{},hyper=warn,axum=warn", level_directive(level)),
        (None, Some(env)) if !env.trim().is_empty() => env.trim().to_string(),
        _ => DEFAULT_DIRECTIVES.to_string(),
    };
    EnvFilter::try_new(&directives)
        .map_err(|e| anyhow!("invalid log filter '{directives}' (from {LOG_ENV_VAR}?): {e}"))
}

fn level_directive(level: LogLevel) -> &'static str {
    match level {
        LogLevel::Error => "error",
        LogLevel::Warn => "warn",
        LogLevel::Info => "info",
        LogLevel::Debug => "debug",
        LogLevel::Trace => "trace",
    }
}
