use std::time::Duration;

use thiserror::Error;

/// Unified error type for the entire Echo bot.
#[derive(Error, Debug)]
pub enum EchoError {
    // ── Runtime errors ─────────────────────────────────────────
    #[error("runtime error: {0}")]
    Runtime(String),

    // ── Command errors ─────────────────────────────────────────
    #[error("usage error: {0}")]
    Usage(String),

    // ── Chronicle errors ───────────────────────────────────────
    #[error("chronicle store error: {0}")]
    Store(String),

    #[error("chronicle store busy: lock not acquired within {0:?}")]
    StoreBusy(Duration),

    #[error("invalid chronicle entry: {0}")]
    InvalidEntry(String),

    // ── Collaborator errors ────────────────────────────────────
    #[error("{collaborator} failed: {reason}")]
    Collaborator { collaborator: String, reason: String },

    // ── Channel errors ─────────────────────────────────────────
    #[error("channel error: {channel}: {reason}")]
    Channel { channel: String, reason: String },

    // ── Config errors ──────────────────────────────────────────
    #[error("config error: {0}")]
    Config(String),

    // ── Generic wrappers ───────────────────────────────────────
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl EchoError {
    /// Shorthand for a collaborator failure.
    pub fn collaborator(collaborator: impl Into<String>, reason: impl ToString) -> Self {
        Self::Collaborator {
            collaborator: collaborator.into(),
            reason: reason.to_string(),
        }
    }

    /// True for errors caused by the user's input rather than the system.
    /// These are answered but never reported to operators as failures.
    pub fn is_user_error(&self) -> bool {
        matches!(self, Self::Usage(_))
    }

    /// True for failures of the Chronicle persistence layer.
    pub fn is_store_error(&self) -> bool {
        matches!(
            self,
            Self::Store(_) | Self::StoreBusy(_) | Self::InvalidEntry(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, EchoError>;
