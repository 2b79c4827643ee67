//! Tracing setup for the agent.
//!
//! Logs go to stderr. Stdout belongs to the `check` reports and the
//! console approval prompt, and a log line must never land in the middle
//! of either.

use std::fmt;
use std::io::{self, IsTerminal};

use serde::Deserialize;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::{fmt as subscriber, EnvFilter};

/// HTTP client crates that are chatty below `warn`. Source polling would
/// otherwise drown the agent's own events at `debug`.
const QUIET_TARGETS: &[&str] = &["hyper", "hyper_util", "reqwest", "h2"];

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl fmt::Display for LogFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Pretty => "pretty",
            Self::Json => "json",
        })
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// A bare level (`info`) or a filter directive list (`agora=debug,warn`).
    pub level: String,
    pub format: LogFormat,
}

impl LoggingConfig {
    /// Check `level` is a level or a directive list.
    ///
    /// A bare word that is not a level would parse as a target name and
    /// silently enable trace for it, so it is rejected here.
    pub fn check_level(&self) -> Result<(), String> {
        let level = self.level.trim();
        if level.parse::<LevelFilter>().is_ok() {
            return Ok(());
        }
        if !level.contains('=') {
            return Err(format!("'{level}' is not a log level"));
        }
        EnvFilter::try_new(level)
            .map(|_| ())
            .map_err(|e| e.to_string())
    }

    /// Filter directives for the configured level.
    pub fn directives(&self) -> String {
        let mut directives = self.level.trim().to_string();
        for target in QUIET_TARGETS {
            directives.push_str(&format!(",{target}=warn"));
        }
        directives
    }

    fn filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env()
            .or_else(|_| EnvFilter::try_new(self.directives()))
            .unwrap_or_else(|_| EnvFilter::new("info"))
    }

    /// Install the global subscriber. `RUST_LOG` overrides `level`.
    ///
    /// Later calls are no-ops, so the CLI and tests may both call this.
    pub fn init(&self) {
        let filter = self.filter();
        let ansi = io::stderr().is_terminal();

        match self.format {
            LogFormat::Json => {
                let _ = subscriber()
                    .json()
                    .with_env_filter(filter)
                    .with_writer(io::stderr)
                    .try_init();
            }
            LogFormat::Pretty => {
                let _ = subscriber()
                    .with_env_filter(filter)
                    .with_ansi(ansi)
                    .with_writer(io::stderr)
                    .try_init();
            }
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            format: LogFormat::Pretty,
        }
    }
}
