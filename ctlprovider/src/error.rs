//! Provider error kinds and the failure classes the orchestrator branches on.
//!
//! ```rust
//! use ctlprovider::{FailureClass, ProviderError};
//!
//! let rejected = ProviderError::from_status(400, "prompt too long");
//! assert_eq!(rejected.failure_class(), FailureClass::Rejected);
//!
//! let throttled = ProviderError::from_status(429, "slow down");
//! assert_eq!(throttled.failure_class(), FailureClass::Throttled);
//!
//! let timeout = ProviderError::timeout("temporary timeout");
//! assert!(timeout.retryable);
//! assert_eq!(timeout.failure_class(), FailureClass::Transient);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    Configuration,
    Authentication,
    RateLimited,
    InvalidRequest,
    Timeout,
    Transport,
    Unavailable,
    Other,
}

/// How a conversation loop reacts to a failed generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// The upstream refused the prompt; shrink it and retry.
    Rejected,
    /// The upstream is rate limiting; wait and retry with the same prompt.
    Throttled,
    /// Retrying cannot help.
    Fatal,
    /// Anything else; wait and retry.
    Transient,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
    pub status: Option<u16>,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            status: None,
        }
    }

    /// Maps an upstream HTTP status onto an error kind, keeping the status.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let error = match status {
            400 | 422 => Self::invalid_request(message),
            401 | 403 => Self::authentication(message),
            429 => Self::rate_limited(message),
            408 | 504 => Self::timeout(message),
            500..=599 => Self::unavailable(message),
            _ => Self::transport(message),
        };

        error.with_status(status)
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Configuration, message, false)
    }

    pub fn authentication(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Authentication, message, false)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message, true)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::InvalidRequest, message, false)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message, true)
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message, true)
    }

    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Unavailable, message, true)
    }

    pub fn other(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Other, message, false)
    }

    /// Status first, kind second: a 400 is a rejection whatever its kind.
    pub fn failure_class(&self) -> FailureClass {
        match (self.status, self.kind) {
            (Some(400), _) | (None, ProviderErrorKind::InvalidRequest) => FailureClass::Rejected,
            (Some(429), _) | (_, ProviderErrorKind::RateLimited) => FailureClass::Throttled,
            (_, ProviderErrorKind::Configuration | ProviderErrorKind::Authentication) => {
                FailureClass::Fatal
            }
            _ => FailureClass::Transient,
        }
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.status {
            Some(status) => write!(f, "{:?} ({status}): {}", self.kind, self.message),
            None => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for ProviderError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping_covers_common_codes() {
        assert_eq!(
            ProviderError::from_status(401, "x").kind,
            ProviderErrorKind::Authentication
        );
        assert_eq!(
            ProviderError::from_status(503, "x").kind,
            ProviderErrorKind::Unavailable
        );
        assert_eq!(
            ProviderError::from_status(504, "x").kind,
            ProviderErrorKind::Timeout
        );
        assert_eq!(
            ProviderError::from_status(302, "x").kind,
            ProviderErrorKind::Transport
        );
        assert_eq!(ProviderError::from_status(418, "x").status, Some(418));
    }

    #[test]
    fn unprocessable_entity_is_not_a_prompt_rejection() {
        let error = ProviderError::from_status(422, "schema");
        assert_eq!(error.kind, ProviderErrorKind::InvalidRequest);
        assert_eq!(error.failure_class(), FailureClass::Transient);
    }

    #[test]
    fn failure_classes_follow_status_then_kind() {
        assert_eq!(
            ProviderError::invalid_request("local").failure_class(),
            FailureClass::Rejected
        );
        assert_eq!(
            ProviderError::configuration("No model configured").failure_class(),
            FailureClass::Fatal
        );
        assert_eq!(
            ProviderError::from_status(403, "forbidden").failure_class(),
            FailureClass::Fatal
        );
        assert_eq!(
            ProviderError::from_status(500, "boom").failure_class(),
            FailureClass::Transient
        );
    }

    #[test]
    fn display_includes_status_when_known() {
        let error = ProviderError::from_status(429, "slow down");
        assert_eq!(error.to_string(), "RateLimited (429): slow down");
        assert_eq!(
            ProviderError::other("plain").to_string(),
            "Other: plain"
        );
    }
}
