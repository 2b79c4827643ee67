use std::path::Path;
use std::time::Duration;

use crate::app::build_source;
use crate::cli::output;
use crate::config::Config;
use crate::domain::RawOpportunity;
use crate::error::{Result, SourceError};

/// Fetch every configured source once and report what came back.
#[allow(clippy::result_large_err)]
pub async fn execute_sources<P: AsRef<Path>>(config_path: P) -> Result<()> {
    let config = Config::load(config_path)?;
    let timeout = Duration::from_secs(config.scanner.source_timeout_secs);

    output::section("Opportunity sources");
    if config.scanner.sources.is_empty() {
        output::warn("No sources configured");
        return Ok(());
    }

    let mut failed = 0usize;
    for source_config in &config.scanner.sources {
        let source = build_source(source_config)?;
        output::progress(source.name());

        let result = match tokio::time::timeout(timeout, source.fetch()).await {
            Ok(result) => result,
            Err(_) => Err(SourceError::Timeout(source.name().to_string())),
        };

        match result {
            Ok(records) => {
                output::progress_done(true);
                report(source.name(), &records);
            }
            Err(e) => {
                output::progress_done(false);
                output::error(&e.to_string());
                failed += 1;
            }
        }
    }

    println!();
    if failed == 0 {
        output::ok("All sources responded");
    } else {
        output::warn(&format!(
            "{failed} of {} sources failed; the scanner skips them",
            config.scanner.sources.len()
        ));
    }
    Ok(())
}

fn report(source_id: &str, records: &[RawOpportunity]) {
    let usable = records
        .iter()
        .filter(|record| record.validate(source_id).is_ok())
        .count();
    output::key_value("  records", records.len());
    output::key_value("  usable", usable);
}
