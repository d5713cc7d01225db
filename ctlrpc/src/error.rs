//! Client-side RPC error kinds.

use std::error::Error;
use std::fmt::{Display, Formatter};

use serde_json::Value;

use crate::JsonRpcError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcErrorKind {
    /// The request never produced a JSON-RPC envelope.
    Transport,
    /// The server answered with a JSON-RPC error object.
    Remote,
    /// The envelope arrived but its result had an unexpected shape.
    InvalidResponse,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RpcError {
    pub kind: RpcErrorKind,
    pub message: String,
    pub code: Option<i64>,
    pub status: Option<u16>,
    pub data: Option<Value>,
}

impl RpcError {
    pub fn new(kind: RpcErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            code: None,
            status: None,
            data: None,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(RpcErrorKind::Transport, message)
    }

    pub fn invalid_response(message: impl Into<String>) -> Self {
        Self::new(RpcErrorKind::InvalidResponse, message)
    }

    pub fn remote(error: JsonRpcError) -> Self {
        Self {
            kind: RpcErrorKind::Remote,
            message: error.message,
            code: Some(error.code),
            status: None,
            data: error.data,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// JSON-RPC code for remote errors, `-32603` for everything else.
    pub fn code_or_internal(&self) -> i64 {
        self.code.unwrap_or(crate::INTERNAL_ERROR)
    }
}

impl Display for RpcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match (self.code, self.status) {
            (Some(code), _) => write!(f, "{:?} ({code}): {}", self.kind, self.message),
            (None, Some(status)) => write!(f, "{:?} [status={status}]: {}", self.kind, self.message),
            (None, None) => write!(f, "{:?}: {}", self.kind, self.message),
        }
    }
}

impl Error for RpcError {}

impl From<JsonRpcError> for RpcError {
    fn from(value: JsonRpcError) -> Self {
        Self::remote(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn remote_errors_keep_code_and_data() {
        let error = RpcError::from(JsonRpcError::tool_not_found("nope"));

        assert_eq!(error.kind, RpcErrorKind::Remote);
        assert_eq!(error.code, Some(crate::METHOD_NOT_FOUND));
        assert_eq!(error.to_string(), "Remote (-32601): tool not found: nope");
        assert!(error.data.is_some());
    }

    #[test]
    fn local_errors_fall_back_to_internal_code() {
        let error = RpcError::transport("connection refused").with_status(502);
        assert_eq!(error.code_or_internal(), crate::INTERNAL_ERROR);
        assert_eq!(error.to_string(), "Transport [status=502]: connection refused");
    }
}
