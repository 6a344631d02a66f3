use thiserror::Error;

/// Failure of a reply source to produce an assistant message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReplyError {
    #[error("{0}")]
    Failed(String),

    #[error("reply was cancelled")]
    Cancelled,
}

impl ReplyError {
    pub fn failed(reason: impl Into<String>) -> Self {
        ReplyError::Failed(reason.into())
    }
}
