//! Conversation-layer errors.

use std::error::Error;
use std::fmt::{Display, Formatter};

use ctlprovider::{FailureClass, ProviderError};
use ctlrpc::RpcError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    /// A turn is already in flight.
    Busy,
    InvalidRequest,
    /// Non-retryable generation failure, such as a missing model.
    Provider,
    /// The retry ceiling was reached for the current turn.
    RetriesExhausted,
    /// Tool discovery through `tools/list` failed.
    Tooling,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    /// Upstream status of the generation failure behind this error, if any.
    pub status: Option<u16>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            status: None,
        }
    }

    pub fn busy(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Busy, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::InvalidRequest, message)
    }

    pub fn tooling(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Tooling, message)
    }

    pub fn retries_exhausted(attempts: u32, last: &ProviderError) -> Self {
        Self {
            kind: ChatErrorKind::RetriesExhausted,
            message: format!("generation failed {attempts} times in a row; last error: {last}"),
            status: last.status,
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self.kind, ChatErrorKind::Provider)
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        let kind = match value.failure_class() {
            FailureClass::Rejected => ChatErrorKind::InvalidRequest,
            _ => ChatErrorKind::Provider,
        };

        Self {
            kind,
            message: value.to_string(),
            status: value.status,
        }
    }
}

impl From<RpcError> for ChatError {
    fn from(value: RpcError) -> Self {
        ChatError::tooling(value.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn provider_errors_keep_their_status() {
        let error = ChatError::from(ProviderError::authentication("bad key").with_status(401));
        assert_eq!(error.kind, ChatErrorKind::Provider);
        assert_eq!(error.status, Some(401));
        assert!(error.is_fatal());
    }

    #[test]
    fn exhausted_retries_mention_the_last_failure() {
        let last = ProviderError::from_status(502, "bad gateway");
        let error = ChatError::retries_exhausted(8, &last);

        assert_eq!(error.kind, ChatErrorKind::RetriesExhausted);
        assert_eq!(error.status, Some(502));
        assert!(error.message.starts_with("generation failed 8 times in a row"));
    }
}
