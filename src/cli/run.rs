//! Handler for the `run` command.

use tokio::signal;
use tracing::info;

use crate::app::App;
use crate::audit::AuditMode;
use crate::cli::RunArgs;
use crate::config::{Config, LogFormat};
use crate::error::Result;

/// Execute the run command.
pub async fn execute(args: &RunArgs) -> Result<()> {
    let mut config = Config::load(&args.config)?;

    if let Some(ref level) = args.log_level {
        config.logging.level = level.clone();
    }
    if args.json_logs {
        config.logging.format = LogFormat::Json;
    }
    if args.audit {
        config.audit.mode = AuditMode::Audit;
    }
    if args.dry_run {
        config.dry_run = true;
    }

    config.init_logging();
    info!(
        strategies = ?config.strategies.enabled,
        audit = %config.audit.mode,
        dry_run = config.dry_run,
        "agora starting"
    );

    let app = App::build(&config, args.max_cycles)?;
    let handle = app.handle();

    let run = app.run();
    tokio::pin!(run);
    tokio::select! {
        () = &mut run => {}
        _ = signal::ctrl_c() => {
            info!("Shutdown signal received");
            handle.shutdown();
            run.await;
        }
    }

    info!(cycles = handle.cycle_count(), "agora stopped");
    Ok(())
}
