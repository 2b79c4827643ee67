//! OS-process execution units.
//!
//! Each worker is a child process started with a cleared environment. Only
//! `TASK_JSON`, `LOG_LEVEL` and a fixed `PATH` are set. On Unix the child
//! gets its own process group plus address-space and CPU-time limits
//! before exec.

use std::path::PathBuf;
use std::process::Stdio;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, Command};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::envelope::is_result_line;
use super::runtime::{ExecutionUnit, LaunchSpec, UnitExit, WorkerRuntime};
use crate::domain::WorkerId;
use crate::error::WorkerError;

const WORKER_PATH: &str = "/usr/local/bin:/usr/bin:/bin";

/// Time allowed for output pipes to drain after the child exits.
const IO_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Launches workers as child processes of `program`.
#[derive(Debug, Clone)]
pub struct ProcessRuntime {
    program: PathBuf,
    args: Vec<String>,
}

impl ProcessRuntime {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

#[async_trait]
impl WorkerRuntime for ProcessRuntime {
    async fn launch(&self, spec: LaunchSpec) -> Result<Box<dyn ExecutionUnit>, WorkerError> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .env_clear()
            .env("TASK_JSON", &spec.task_json)
            .env("LOG_LEVEL", &spec.log_level)
            .env("PATH", WORKER_PATH)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(unix)]
        apply_limits(&mut command, &spec);

        let mut child = command
            .spawn()
            .map_err(|e| WorkerError::Launch(format!("{}: {e}", self.program.display())))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| WorkerError::Launch("stdout pipe unavailable".into()))?;
        let stderr = child.stderr.take();

        let worker_id = spec.worker_id.clone();
        let stdout_task = tokio::spawn(async move {
            let mut lines = BufReader::new(stdout).lines();
            let mut last = None;
            while let Ok(Some(line)) = lines.next_line().await {
                if is_result_line(&line) {
                    last = Some(line);
                }
            }
            last
        });

        if let Some(stderr) = stderr {
            let worker_id = worker_id.clone();
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(worker_id = %worker_id, "{line}");
                }
            });
        }

        debug!(worker_id = %worker_id, pid = ?child.id(), "Worker process started");
        Ok(Box::new(ProcessUnit {
            worker_id,
            child,
            stdout_task: Some(stdout_task),
        }))
    }
}

#[cfg(unix)]
fn apply_limits(command: &mut Command, spec: &LaunchSpec) {
    let memory_bytes = spec.memory_limit_mb.saturating_mul(1024 * 1024);
    let cpu_seconds = (spec.timeout.as_secs_f64() * spec.cpu_limit).ceil().max(1.0) as u64;

    // SAFETY: the closure only calls async-signal-safe libc functions.
    unsafe {
        command.pre_exec(move || {
            if libc::setpgid(0, 0) != 0 {
                return Err(std::io::Error::last_os_error());
            }
            set_limit(libc::RLIMIT_AS, memory_bytes)?;
            set_limit(libc::RLIMIT_CPU, cpu_seconds)?;
            Ok(())
        });
    }
}

#[cfg(all(unix, target_env = "gnu"))]
type RlimitResource = libc::__rlimit_resource_t;

#[cfg(all(unix, not(target_env = "gnu")))]
type RlimitResource = libc::c_int;

#[cfg(unix)]
fn set_limit(resource: RlimitResource, value: u64) -> std::io::Result<()> {
    if value == 0 {
        return Ok(());
    }
    let limit = libc::rlimit {
        rlim_cur: value as libc::rlim_t,
        rlim_max: value as libc::rlim_t,
    };
    // SAFETY: `limit` is a valid rlimit for the duration of the call.
    if unsafe { libc::setrlimit(resource, &limit) } != 0 {
        return Err(std::io::Error::last_os_error());
    }
    Ok(())
}

struct ProcessUnit {
    worker_id: WorkerId,
    child: Child,
    stdout_task: Option<JoinHandle<Option<String>>>,
}

impl ProcessUnit {
    async fn drain_stdout(&mut self) -> Option<String> {
        let mut task = self.stdout_task.take()?;
        match tokio::time::timeout(IO_DRAIN_TIMEOUT, &mut task).await {
            Ok(Ok(line)) => line,
            Ok(Err(e)) => {
                warn!(worker_id = %self.worker_id, error = %e, "Stdout reader failed");
                None
            }
            Err(_) => {
                task.abort();
                warn!(worker_id = %self.worker_id, "Stdout did not drain in time");
                None
            }
        }
    }

    #[cfg(unix)]
    fn kill_process_group(&self) {
        if let Some(pid) = self.child.id() {
            // SAFETY: signalling a process group we created; failure is harmless.
            unsafe {
                libc::kill(-(pid as libc::pid_t), libc::SIGKILL);
            }
        }
    }
}

#[async_trait]
impl ExecutionUnit for ProcessUnit {
    async fn wait(&mut self) -> Result<UnitExit, WorkerError> {
        let status = self.child.wait().await.map_err(|e| WorkerError::Failure {
            worker_id: self.worker_id.clone(),
            reason: e.to_string(),
        })?;
        let result_line = self.drain_stdout().await;
        Ok(UnitExit {
            success: status.success(),
            exit_code: status.code(),
            result_line,
        })
    }

    async fn kill(&mut self) -> Result<(), WorkerError> {
        #[cfg(unix)]
        self.kill_process_group();

        self.child.start_kill().map_err(|e| WorkerError::Failure {
            worker_id: self.worker_id.clone(),
            reason: format!("kill failed: {e}"),
        })?;
        let _ = self.child.wait().await;
        if let Some(task) = self.stdout_task.take() {
            task.abort();
        }
        Ok(())
    }
}
