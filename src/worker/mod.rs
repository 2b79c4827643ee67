//! Worker lifecycle: isolated, budgeted execution units.

mod envelope;
mod manager;
mod process;
mod runtime;

pub use envelope::ResultEnvelope;
pub use manager::{WorkerHandle, WorkerManager, WorkerSettings};
pub use process::ProcessRuntime;
pub use runtime::{ExecutionUnit, LaunchSpec, UnitExit, WorkerRuntime};
