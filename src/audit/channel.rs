//! Approval channels: how a pending action reaches a human.

use std::io;

use async_trait::async_trait;
use dialoguer::{theme::ColorfulTheme, Confirm};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::action::AuditAction;

/// Presents an action to an operator and returns their answer.
///
/// `None` means no answer will ever arrive (channel closed, prompt
/// aborted). The gate treats that as a denial.
#[async_trait]
pub trait ApprovalChannel: Send + Sync {
    async fn request(&self, action: &AuditAction) -> Option<bool>;
}

/// Asks one approval question. Implementations may block.
pub trait ConfirmPrompt: Send + 'static {
    fn confirm(&mut self, action: &AuditAction) -> io::Result<bool>;

    /// Called when an answer arrives after its request was already denied.
    fn expired(&mut self, _action: &AuditAction) {}
}

/// `dialoguer` confirm on the terminal, default deny.
#[derive(Debug, Default)]
pub struct TerminalPrompt;

impl ConfirmPrompt for TerminalPrompt {
    fn confirm(&mut self, action: &AuditAction) -> io::Result<bool> {
        eprintln!();
        eprintln!("  [{}] {} (risk: {})", action.kind, action.title, action.risk);
        for (key, value) in &action.details {
            eprintln!("    {key:<14} {value}");
        }
        Confirm::with_theme(&ColorfulTheme::default())
            .with_prompt("Approve?")
            .default(false)
            .interact()
            .map_err(|e| io::Error::other(e.to_string()))
    }

    fn expired(&mut self, action: &AuditAction) {
        eprintln!("  '{}' had already timed out and was denied", action.title);
    }
}

struct PromptJob {
    action: AuditAction,
    reply: oneshot::Sender<bool>,
}

/// Interactive approval served by one prompt thread.
///
/// Requests queue behind the prompt on screen. A request whose caller gave
/// up (gate timeout, shutdown) is never shown, and a late answer to one
/// already on screen is discarded instead of leaking into the next request.
#[derive(Debug, Clone)]
pub struct ConsoleApproval {
    jobs: mpsc::Sender<PromptJob>,
}

impl ConsoleApproval {
    pub fn new() -> io::Result<Self> {
        Self::with_prompt(TerminalPrompt)
    }

    pub fn with_prompt(prompt: impl ConfirmPrompt) -> io::Result<Self> {
        let (jobs, queue) = mpsc::channel(16);
        std::thread::Builder::new()
            .name("agora-approval".into())
            .spawn(move || serve_prompts(prompt, queue))?;
        Ok(Self { jobs })
    }
}

fn serve_prompts(mut prompt: impl ConfirmPrompt, mut queue: mpsc::Receiver<PromptJob>) {
    while let Some(job) = queue.blocking_recv() {
        if job.reply.is_closed() {
            debug!(title = %job.action.title, "Approval request expired before it was shown");
            continue;
        }
        let approved = prompt.confirm(&job.action).unwrap_or_else(|e| {
            warn!(error = %e, "Approval prompt failed, denying");
            false
        });
        if job.reply.send(approved).is_err() {
            warn!(title = %job.action.title, "Late approval answer discarded");
            prompt.expired(&job.action);
        }
    }
}

#[async_trait]
impl ApprovalChannel for ConsoleApproval {
    async fn request(&self, action: &AuditAction) -> Option<bool> {
        let (reply, answer) = oneshot::channel();
        let job = PromptJob {
            action: action.clone(),
            reply,
        };
        self.jobs.send(job).await.ok()?;
        answer.await.ok()
    }
}

/// A pending request delivered through [`QueueApproval`].
#[derive(Debug)]
pub struct ApprovalRequest {
    pub action: AuditAction,
    reply: oneshot::Sender<bool>,
}

impl ApprovalRequest {
    pub fn approve(self) {
        let _ = self.reply.send(true);
    }

    pub fn deny(self) {
        let _ = self.reply.send(false);
    }
}

/// In-process channel: requests are queued for an embedder to answer.
#[derive(Debug, Clone)]
pub struct QueueApproval {
    tx: mpsc::Sender<ApprovalRequest>,
}

impl QueueApproval {
    /// Create the channel and the receiving end of its request queue.
    #[must_use]
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<ApprovalRequest>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

#[async_trait]
impl ApprovalChannel for QueueApproval {
    async fn request(&self, action: &AuditAction) -> Option<bool> {
        let (reply, answer) = oneshot::channel();
        let request = ApprovalRequest {
            action: action.clone(),
            reply,
        };
        self.tx.send(request).await.ok()?;
        answer.await.ok()
    }
}
