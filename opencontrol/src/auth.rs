//! Shared-secret bearer gate for the generate and mcp endpoints.
//!
//! ```rust
//! use opencontrol::{AuthErrorKind, BearerGate};
//!
//! let gate = BearerGate::new("hunter2");
//! assert!(gate.authorize(Some("Bearer hunter2")).is_ok());
//!
//! let error = gate.authorize(Some("Bearer nope")).expect_err("wrong token");
//! assert_eq!(error.kind, AuthErrorKind::InvalidToken);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use ctlprovider::SecretString;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    MissingHeader,
    MalformedHeader,
    InvalidToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthError {
    pub kind: AuthErrorKind,
}

impl AuthError {
    pub fn new(kind: AuthErrorKind) -> Self {
        Self { kind }
    }
}

impl Display for AuthError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let message = match self.kind {
            AuthErrorKind::MissingHeader => "missing authorization header",
            AuthErrorKind::MalformedHeader => "authorization header is not a bearer token",
            AuthErrorKind::InvalidToken => "invalid bearer token",
        };
        f.write_str(message)
    }
}

impl Error for AuthError {}

#[derive(Debug, Clone)]
pub struct BearerGate {
    token: SecretString,
}

impl BearerGate {
    pub fn new(token: impl Into<String>) -> Self {
        Self::from_secret(SecretString::new(token))
    }

    pub fn from_secret(token: SecretString) -> Self {
        Self { token }
    }

    /// Checks a raw `Authorization` header value.
    pub fn authorize(&self, header: Option<&str>) -> Result<(), AuthError> {
        let header = header.ok_or(AuthError::new(AuthErrorKind::MissingHeader))?;
        let presented = bearer_token(header)
            .ok_or(AuthError::new(AuthErrorKind::MalformedHeader))?;

        if constant_time_eq(presented.as_bytes(), self.token.expose().as_bytes()) {
            Ok(())
        } else {
            Err(AuthError::new(AuthErrorKind::InvalidToken))
        }
    }
}

fn bearer_token(header: &str) -> Option<&str> {
    let (scheme, token) = header.trim().split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }

    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Runtime depends only on the lengths, not on where the inputs differ.
/// Hand-rolled because no crate in the dependency tree offers a constant-time
/// comparison; a single byte-fold is all the bearer check needs.
fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }

    left.iter()
        .zip(right)
        .fold(0u8, |diff, (a, b)| diff | (a ^ b))
        == 0
}
