//! Execution-unit abstraction.

use std::time::Duration;

use async_trait::async_trait;

use crate::domain::WorkerId;
use crate::error::WorkerError;

/// Everything a runtime needs to start one unit. `task_json` and
/// `log_level` are the only values that reach the unit itself.
#[derive(Debug, Clone, PartialEq)]
pub struct LaunchSpec {
    pub worker_id: WorkerId,
    pub task_json: String,
    pub log_level: String,
    pub cpu_limit: f64,
    pub memory_limit_mb: u64,
    pub timeout: Duration,
}

/// How a unit ended on its own.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnitExit {
    pub success: bool,
    pub exit_code: Option<i32>,
    /// Last JSON object line written to stdout, if any.
    pub result_line: Option<String>,
}

/// Starts isolated execution units.
#[async_trait]
pub trait WorkerRuntime: Send + Sync {
    async fn launch(&self, spec: LaunchSpec) -> Result<Box<dyn ExecutionUnit>, WorkerError>;
}

/// A running unit owned by its supervisor.
#[async_trait]
pub trait ExecutionUnit: Send {
    /// Wait for the unit to exit on its own.
    async fn wait(&mut self) -> Result<UnitExit, WorkerError>;

    /// Forcibly terminate the unit.
    async fn kill(&mut self) -> Result<(), WorkerError>;
}
