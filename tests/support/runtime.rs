use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use agora::error::WorkerError;
use agora::worker::{ExecutionUnit, LaunchSpec, UnitExit, WorkerRuntime};
use async_trait::async_trait;
use parking_lot::Mutex;

/// How every unit launched by a [`ScriptedRuntime`] behaves.
#[derive(Debug, Clone)]
pub enum Script {
    /// Exit immediately with this status and stdout result line.
    Exit { success: bool, line: Option<String> },
    /// Never exit on its own; only a kill or timeout ends it.
    Hang,
    /// Refuse to launch.
    LaunchError(String),
}

/// Runtime whose units follow a fixed script and whose launches are recorded.
pub struct ScriptedRuntime {
    script: Script,
    launches: Mutex<Vec<LaunchSpec>>,
    kills: Arc<AtomicUsize>,
}

impl ScriptedRuntime {
    pub fn new(script: Script) -> Self {
        Self {
            script,
            launches: Mutex::new(Vec::new()),
            kills: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Units that complete with `result` as their JSON result object.
    pub fn completing(result: serde_json::Value) -> Self {
        Self::new(Script::Exit {
            success: true,
            line: Some(serde_json::json!({ "status": "completed", "result": result }).to_string()),
        })
    }

    pub fn failing(error: &str) -> Self {
        Self::new(Script::Exit {
            success: false,
            line: Some(serde_json::json!({ "status": "failed", "error": error }).to_string()),
        })
    }

    pub fn hanging() -> Self {
        Self::new(Script::Hang)
    }

    pub fn launches(&self) -> Vec<LaunchSpec> {
        self.launches.lock().clone()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.lock().len()
    }

    pub fn kill_count(&self) -> usize {
        self.kills.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl WorkerRuntime for ScriptedRuntime {
    async fn launch(&self, spec: LaunchSpec) -> Result<Box<dyn ExecutionUnit>, WorkerError> {
        if let Script::LaunchError(reason) = &self.script {
            return Err(WorkerError::Launch(reason.clone()));
        }
        self.launches.lock().push(spec);
        Ok(Box::new(ScriptedUnit {
            script: self.script.clone(),
            kills: Arc::clone(&self.kills),
        }))
    }
}

struct ScriptedUnit {
    script: Script,
    kills: Arc<AtomicUsize>,
}

#[async_trait]
impl ExecutionUnit for ScriptedUnit {
    async fn wait(&mut self) -> Result<UnitExit, WorkerError> {
        match &self.script {
            Script::Exit { success, line } => Ok(UnitExit {
                success: *success,
                exit_code: Some(if *success { 0 } else { 1 }),
                result_line: line.clone(),
            }),
            Script::Hang | Script::LaunchError(_) => std::future::pending().await,
        }
    }

    async fn kill(&mut self) -> Result<(), WorkerError> {
        self.kills.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
