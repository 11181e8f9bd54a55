use thiserror::Error;

/// Why a commit did not go through.
///
/// Every variant is recoverable: pending edits stay in place and the user
/// may retry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CommitError {
    #[error("a commit is already in flight")]
    InFlight,

    #[error("there are no pending changes to commit")]
    NothingToCommit,

    #[error("failed to reach the release service: {0}")]
    Transport(String),

    #[error("release service rejected the commit with status {status}: {message}")]
    Server { status: u16, message: String },

    #[error("failed to decode the release service response: {0}")]
    Decode(String),

    #[error("commit {0} is not the one in flight")]
    StaleTicket(u64),
}

impl CommitError {
    /// Whether retrying the same request may succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            CommitError::Transport(_) => true,
            CommitError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}
