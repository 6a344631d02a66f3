use crate::error::ReplyError;

/// Produces the assistant's answer once a scheduled reply is due.
#[cfg_attr(test, mockall::automock)]
pub trait ReplySource {
    fn reply(&mut self, prompt: &str) -> Result<String, ReplyError>;
}

/// Answers every prompt with the same text. Blank text is reported as a failure.
#[derive(Debug, Clone)]
pub struct CannedReply {
    text: String,
}

impl CannedReply {
    pub fn new(text: impl Into<String>) -> Self {
        Self { text: text.into() }
    }
}

impl ReplySource for CannedReply {
    fn reply(&mut self, _prompt: &str) -> Result<String, ReplyError> {
        if self.text.trim().is_empty() {
            return Err(ReplyError::failed("no reply text configured"));
        }
        Ok(self.text.clone())
    }
}
