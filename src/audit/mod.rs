//! Audit gate: the human-in-the-loop circuit breaker.

mod action;
mod channel;
mod gate;
mod log;

pub use action::{ActionKind, AuditAction, AuditDecision, AuditMode, RiskLevel};
pub use channel::{
    ApprovalChannel, ApprovalRequest, ConfirmPrompt, ConsoleApproval, QueueApproval, TerminalPrompt,
};
pub use gate::AuditGate;
pub use log::{AuditLog, AuditRecord};
