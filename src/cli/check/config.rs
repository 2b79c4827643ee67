use std::path::Path;

use crate::cli::output;
use crate::config::{Config, AUDIT_MODE_ENV, DATABASE_ENV};
use crate::error::{ConfigError, Result};

/// Validate configuration file without starting the agent.
#[allow(clippy::result_large_err)]
pub fn execute_config<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let path = config_path.as_ref();
    output::note(&format!("Checking configuration: {}", path.display()));

    if !path.exists() {
        output::note("Configuration file not found. Create one by copying the example:");
        output::note("  cp config.example.toml agora.toml");
        return Err(ConfigError::ReadFile(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} not found", path.display()),
        ))
        .into());
    }

    let config = Config::load(path)?;

    output::ok("Configuration file is valid");

    output::section("Summary");
    output::key_value("Strategies", config.strategies.enabled.join(", "));
    output::key_value("Audit mode", config.audit.mode);
    output::key_value("Dry-run", config.dry_run);
    output::key_value("Database", &config.treasury.database);
    output::key_value("Interval", format!("{}s", config.agent.interval_secs));
    output::key_value("Sources", config.scanner.sources.len());
    output::key_value("Worker", config.worker.program.display());
    println!();

    if config.scanner.sources.is_empty() {
        output::warn("No opportunity sources configured; every cycle will be empty");
    }
    for var in [AUDIT_MODE_ENV, DATABASE_ENV] {
        if std::env::var(var).is_ok() {
            output::note(&format!("  {var} is set and overrides the file"));
        }
    }

    output::note("Configuration is ready to use.");
    Ok(())
}
