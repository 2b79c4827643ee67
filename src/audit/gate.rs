//! The audit gate.
//!
//! Sits immediately before every irreversible effect. In passive mode it
//! approves everything without blocking. In audit mode it blocks the caller
//! until the approval channel answers, the timeout elapses, or shutdown is
//! signalled. Anything other than an explicit approval is a denial.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures_util::future::{BoxFuture, FutureExt};
use tokio::sync::watch;
use tracing::{debug, info, warn};

use super::action::{AuditAction, AuditDecision, AuditMode};
use super::channel::ApprovalChannel;
use super::log::AuditLog;
use crate::error::AuditError;

struct Unattended;

#[async_trait]
impl ApprovalChannel for Unattended {
    async fn request(&self, _action: &AuditAction) -> Option<bool> {
        None
    }
}

/// Human-in-the-loop circuit breaker.
pub struct AuditGate {
    audit: AtomicBool,
    timeout: Duration,
    channel: Arc<dyn ApprovalChannel>,
    log: Option<AuditLog>,
    shutdown: Option<watch::Receiver<bool>>,
}

impl AuditGate {
    pub fn new(mode: AuditMode, timeout: Duration, channel: Arc<dyn ApprovalChannel>) -> Self {
        Self {
            audit: AtomicBool::new(mode == AuditMode::Audit),
            timeout,
            channel,
            log: None,
            shutdown: None,
        }
    }

    /// A gate that approves everything until switched to audit mode, at
    /// which point every request times out into a denial.
    #[must_use]
    pub fn passive() -> Self {
        Self::new(AuditMode::Passive, Duration::from_secs(30), Arc::new(Unattended))
    }

    #[must_use]
    pub fn with_log(mut self, log: AuditLog) -> Self {
        self.log = Some(log);
        self
    }

    /// Pending authorizations resolve to denied once `shutdown` flips to true.
    #[must_use]
    pub fn with_shutdown(mut self, shutdown: watch::Receiver<bool>) -> Self {
        self.shutdown = Some(shutdown);
        self
    }

    #[must_use]
    pub fn mode(&self) -> AuditMode {
        if self.audit.load(Ordering::SeqCst) {
            AuditMode::Audit
        } else {
            AuditMode::Passive
        }
    }

    pub fn set_mode(&self, mode: AuditMode) {
        let previous = self.mode();
        self.audit.store(mode == AuditMode::Audit, Ordering::SeqCst);
        if previous != mode {
            info!(from = %previous, to = %mode, "Audit mode changed");
        }
    }

    /// Ask for permission to perform `action`.
    pub async fn authorize(&self, action: &AuditAction) -> AuditDecision {
        if self.mode() == AuditMode::Passive {
            debug!(kind = %action.kind, title = %action.title, "Passive mode, action allowed");
            return AuditDecision::Approved;
        }

        let decision = self.await_decision(action.clone()).await;
        self.record(action, decision);
        decision
    }

    /// Like [`authorize`](Self::authorize), mapped to an error on anything
    /// but approval.
    pub async fn require(&self, action: &AuditAction) -> Result<(), AuditError> {
        match self.authorize(action).await {
            AuditDecision::Approved => Ok(()),
            AuditDecision::Denied => Err(AuditError::Denied(action.title.clone())),
            AuditDecision::Timeout => Err(AuditError::Timeout(action.title.clone())),
        }
    }

    /// The wait owns its action, channel and shutdown receiver, so callers
    /// never hold a borrow of the gate across the approval.
    fn await_decision(&self, action: AuditAction) -> BoxFuture<'static, AuditDecision> {
        let channel = Arc::clone(&self.channel);
        let timeout = self.timeout;
        let shutdown = self.shutdown.clone();

        async move {
            let answer = tokio::time::timeout(timeout, channel.request(&action));
            tokio::select! {
                result = answer => match result {
                    Ok(Some(true)) => AuditDecision::Approved,
                    Ok(Some(false) | None) => AuditDecision::Denied,
                    Err(_) => AuditDecision::Timeout,
                },
                () = shutdown_signalled(shutdown) => AuditDecision::Denied,
            }
        }
        .boxed()
    }

    fn record(&self, action: &AuditAction, decision: AuditDecision) {
        match decision {
            AuditDecision::Approved => {
                info!(kind = %action.kind, title = %action.title, "Audit approved");
            }
            AuditDecision::Denied => {
                warn!(kind = %action.kind, title = %action.title, "Audit denied");
            }
            AuditDecision::Timeout => {
                warn!(
                    kind = %action.kind,
                    title = %action.title,
                    timeout_secs = self.timeout.as_secs(),
                    "Audit timed out, denying"
                );
            }
        }

        if let Some(log) = &self.log {
            if let Err(e) = log.append(action, decision) {
                warn!(error = %e, path = %log.path().display(), "Audit log write failed");
            }
        }
    }
}

/// Resolves once shutdown is signalled; never resolves without a receiver
/// or after the sender is gone.
async fn shutdown_signalled(shutdown: Option<watch::Receiver<bool>>) {
    if let Some(mut rx) = shutdown {
        if rx.wait_for(|stop| *stop).await.is_ok() {
            return;
        }
    }
    std::future::pending::<()>().await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::channel::QueueApproval;

    #[tokio::test]
    async fn passive_mode_approves_without_asking() {
        let gate = AuditGate::passive();
        assert_eq!(
            gate.authorize(&AuditAction::worker("spawn")).await,
            AuditDecision::Approved
        );
    }

    #[tokio::test]
    async fn audit_mode_uses_channel_answer() {
        let (channel, mut rx) = QueueApproval::new(4);
        let gate = AuditGate::new(AuditMode::Audit, Duration::from_secs(5), Arc::new(channel));
        tokio::spawn(async move {
            rx.recv().await.unwrap().approve();
            rx.recv().await.unwrap().deny();
        });

        assert!(gate.require(&AuditAction::worker("one")).await.is_ok());
        assert_eq!(
            gate.require(&AuditAction::worker("two")).await,
            Err(AuditError::Denied("two".into()))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn silence_times_out_to_denial() {
        let (channel, _rx) = QueueApproval::new(4);
        let gate = AuditGate::new(AuditMode::Audit, Duration::from_secs(2), Arc::new(channel));
        assert_eq!(
            gate.authorize(&AuditAction::transaction("pay")).await,
            AuditDecision::Timeout
        );
    }

    #[tokio::test]
    async fn shutdown_denies_pending_request() {
        let (channel, _rx) = QueueApproval::new(4);
        let (tx, shutdown) = watch::channel(false);
        let gate = Arc::new(
            AuditGate::new(AuditMode::Audit, Duration::from_secs(600), Arc::new(channel))
                .with_shutdown(shutdown),
        );

        let pending = {
            let gate = Arc::clone(&gate);
            tokio::spawn(async move { gate.authorize(&AuditAction::strategy("run")).await })
        };
        tokio::task::yield_now().await;
        tx.send(true).unwrap();

        assert_eq!(pending.await.unwrap(), AuditDecision::Denied);
    }

    #[tokio::test]
    async fn mode_switches_at_runtime() {
        let gate = AuditGate::passive();
        gate.set_mode(AuditMode::Audit);
        assert_eq!(gate.mode(), AuditMode::Audit);
        assert!(gate.require(&AuditAction::worker("x")).await.is_err());
    }
}
