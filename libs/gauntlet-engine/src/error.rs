use gauntlet_common::{FailureKind, Language};
use thiserror::Error;

/// Every way an execution can fail before per-test evaluation
#[derive(Debug, Error)]
pub enum ExecutionError {
    #[error("unsupported language: {0}")]
    UnsupportedLanguage(String),

    #[error("could not find a {language} function declaration in the submitted code")]
    SignatureNotFound { language: Language },

    #[error("failed to render {language} harness: {message}")]
    Template { language: Language, message: String },

    #[error("rate limit exceeded")]
    RateLimited { attempts: u32 },

    #[error("sandbox request failed: {0}")]
    Transport(String),

    #[error("sandbox returned HTTP {status}: {message}")]
    Sandbox { status: u16, message: String },

    #[error("invalid sandbox response: {0}")]
    InvalidResponse(String),
}

impl ExecutionError {
    pub fn kind(&self) -> FailureKind {
        match self {
            ExecutionError::UnsupportedLanguage(_) => FailureKind::UnsupportedLanguage,
            ExecutionError::SignatureNotFound { .. } => FailureKind::SignatureNotFound,
            ExecutionError::Template { .. } => FailureKind::Internal,
            ExecutionError::RateLimited { .. } => FailureKind::RateLimited,
            ExecutionError::Transport(_)
            | ExecutionError::Sandbox { .. }
            | ExecutionError::InvalidResponse(_) => FailureKind::Transport,
        }
    }

    /// Transport-level failures are worth another attempt; everything else is final
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ExecutionError::Transport(_) | ExecutionError::Sandbox { .. }
        )
    }
}
