//! Protocol-specific error types
//!
//! Every failure of a request, from socket errors to replies the issuing
//! command does not understand, surfaces through [`ProtocolError`].

use crate::config::ConfigError;
use crate::protocol::codes::ReturnCode;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Protocol-specific error types
#[derive(Error, Debug)]
pub enum ProtocolError {
    /// Socket send/receive failure
    #[error("Network I/O error: {0}")]
    Transport(#[from] std::io::Error),

    /// No reply arrived within the request timeout
    #[error("No response after {0:?}")]
    Timeout(Duration),

    /// The reply carried a return code the issuing command does not accept
    #[error("Unexpected response to {command}: {code}")]
    UnexpectedResponse {
        command: &'static str,
        code: ReturnCode,
        body: String,
    },

    /// The reply matched an accepted code but lacks a field its contract requires
    #[error("Malformed {command} response ({code}): missing or invalid field '{field}'")]
    MalformedField {
        command: &'static str,
        code: ReturnCode,
        field: &'static str,
        body: String,
    },

    /// The session is gone (expired, invalidated or banned); log in again
    #[error("Session invalidated: {code} {message}")]
    SessionInvalidated { code: ReturnCode, message: String },

    /// Login was rejected
    #[error("Authentication failed: {code} {message}")]
    AuthenticationFailed { code: ReturnCode, message: String },

    /// Server reported a temporary condition; the caller may resubmit later
    #[error("AniDB server busy: {code}")]
    ServerBusy { code: ReturnCode },

    /// A session-bound command was issued without an authenticated session
    #[error("Not authenticated with AniDB")]
    NotAuthenticated,

    /// Connection state machine refused a transition
    #[error("Invalid connection state transition: {from} -> {to}")]
    InvalidState { from: String, to: String },

    /// Settings were refused before connecting
    #[error("Invalid client settings: {0}")]
    InvalidConfig(#[from] ConfigError),

    /// Request object is missing data needed to render the command
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Encoding error
    #[error("Encoding error: {message}")]
    Encoding { message: String },

    /// Decoding error
    #[error("Decoding error: {message}")]
    Decoding { message: String },

    /// Packet too large
    #[error("Packet size {size} exceeds maximum {max_size}")]
    PacketTooLarge { size: usize, max_size: usize },
}

/// Coarse error category used by schedulers to pick a retry policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Socket failure or timeout; retry with backoff
    Transport,
    /// Server temporarily unavailable; retry later
    ServerBusy,
    /// Reply code not understood by the command; do not retry
    UnexpectedResponse,
    /// Reply violated the command's contract; do not retry
    MalformedField,
    /// Session lost; re-authenticate before anything else
    SessionInvalidated,
    /// Login rejected
    Authentication,
    /// Caller error (bad request, wrong state)
    Usage,
}

impl ProtocolError {
    /// Create an unexpected response error
    pub fn unexpected(command: &'static str, code: ReturnCode, body: impl Into<String>) -> Self {
        Self::UnexpectedResponse {
            command,
            code,
            body: body.into(),
        }
    }

    /// Create a malformed field error
    pub fn malformed(
        command: &'static str,
        code: ReturnCode,
        field: &'static str,
        body: impl Into<String>,
    ) -> Self {
        Self::MalformedField {
            command,
            code,
            field,
            body: body.into(),
        }
    }

    /// Create a session invalidated error
    pub fn session_invalidated(code: ReturnCode, message: impl Into<String>) -> Self {
        Self::SessionInvalidated {
            code,
            message: message.into(),
        }
    }

    /// Create an authentication failed error
    pub fn authentication_failed(code: ReturnCode, message: impl Into<String>) -> Self {
        Self::AuthenticationFailed {
            code,
            message: message.into(),
        }
    }

    /// Create an invalid request error
    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create an encoding error
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// Create a decoding error
    pub fn decoding(message: impl Into<String>) -> Self {
        Self::Decoding {
            message: message.into(),
        }
    }

    /// Create a packet too large error
    pub fn packet_too_large(size: usize, max_size: usize) -> Self {
        Self::PacketTooLarge { size, max_size }
    }

    /// Classify the error
    ///
    /// A reply that carried an accepted code but broke the command's field
    /// contract is reported as [`ErrorKind::MalformedField`], separately
    /// from [`ErrorKind::UnexpectedResponse`]. Use
    /// [`is_unexpected_response`](Self::is_unexpected_response) to treat
    /// both as "the server said something this command cannot use".
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport(_) | Self::Timeout(_) | Self::Decoding { .. } => ErrorKind::Transport,
            Self::ServerBusy { .. } => ErrorKind::ServerBusy,
            Self::UnexpectedResponse { .. } => ErrorKind::UnexpectedResponse,
            Self::MalformedField { .. } => ErrorKind::MalformedField,
            Self::SessionInvalidated { .. } => ErrorKind::SessionInvalidated,
            Self::AuthenticationFailed { .. } => ErrorKind::Authentication,
            Self::NotAuthenticated
            | Self::InvalidState { .. }
            | Self::InvalidRequest { .. }
            | Self::InvalidConfig(_)
            | Self::Encoding { .. }
            | Self::PacketTooLarge { .. } => ErrorKind::Usage,
        }
    }

    /// Check if this error is transient and the request can be reissued
    pub fn is_transient(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::ServerBusy)
    }

    /// Reply was not usable by the issuing command, either because of its
    /// code or because a required field was missing or invalid
    pub fn is_unexpected_response(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::UnexpectedResponse | ErrorKind::MalformedField
        )
    }

    /// Check if this error indicates a need to re-authenticate
    pub fn requires_reauth(&self) -> bool {
        matches!(self, Self::SessionInvalidated { .. } | Self::NotAuthenticated)
    }

    /// Check if this error means the account or client is banned.
    /// Schedulers must stop issuing requests entirely on this.
    pub fn is_ban(&self) -> bool {
        match self {
            Self::SessionInvalidated { code, .. } | Self::AuthenticationFailed { code, .. } => {
                code.is_banned()
            }
            _ => false,
        }
    }

    /// Return code carried by the error, if any
    pub fn return_code(&self) -> Option<ReturnCode> {
        match self {
            Self::UnexpectedResponse { code, .. }
            | Self::MalformedField { code, .. }
            | Self::SessionInvalidated { code, .. }
            | Self::AuthenticationFailed { code, .. }
            | Self::ServerBusy { code } => Some(*code),
            _ => None,
        }
    }
}
