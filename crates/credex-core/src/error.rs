//! # Error Types: Coded Error Hierarchy
//!
//! Every failure surfaced by the exchange is a [`CredexError`]: an
//! [`ErrorKind`] with a stable numeric code plus a human-readable detail.
//! Binding layers report the code; the detail goes to logs.
//!
//! ## Design
//!
//! - Kinds are discrete and never merged. `UnknownError` and
//!   `InvalidProofHandle` stay distinct even where a caller might expect
//!   one to cover the other.
//! - Malformed structured input maps to `InvalidJson`; missing required
//!   input maps to `InvalidOption`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Code returned by operations that complete without error.
pub const SUCCESS_CODE: u32 = 0;

/// The discrete error kinds, each bound to a stable numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u32)]
pub enum ErrorKind {
    /// Fallback for failures with no more specific kind.
    UnknownError = 1001,
    /// The connection could not carry the message.
    ConnectionError = 1002,
    /// The connection handle is dead, uninitialized, or not connected.
    InvalidConnectionHandle = 1003,
    /// Agent configuration is missing or malformed.
    InvalidConfiguration = 1004,
    /// The object is not in a state that permits the operation.
    NotReady = 1005,
    /// A required creation option is missing.
    InvalidOption = 1007,
    /// The transport refused or failed to queue a message.
    PostMessageFailure = 1010,
    /// The requesting object's handle is dead or uninitialized.
    InvalidIssuerCredentialHandle = 1015,
    /// Structured data was malformed or unparseable.
    InvalidJson = 1016,
    /// The proof handle is dead or uninitialized.
    InvalidProofHandle = 1017,
    /// An inbound message could not be interpreted.
    InvalidMessages = 1020,
    /// Attribute or predicate descriptors are structurally invalid.
    InvalidAttributesStructure = 1021,
    /// A received proof could not be processed.
    InvalidProof = 1023,
}

impl ErrorKind {
    /// All kinds, in code order.
    pub const ALL: [ErrorKind; 13] = [
        Self::UnknownError,
        Self::ConnectionError,
        Self::InvalidConnectionHandle,
        Self::InvalidConfiguration,
        Self::NotReady,
        Self::InvalidOption,
        Self::PostMessageFailure,
        Self::InvalidIssuerCredentialHandle,
        Self::InvalidJson,
        Self::InvalidProofHandle,
        Self::InvalidMessages,
        Self::InvalidAttributesStructure,
        Self::InvalidProof,
    ];

    /// The numeric code of this kind.
    pub fn code(&self) -> u32 {
        *self as u32
    }

    /// Look up a kind by its numeric code.
    pub fn from_code(code: u32) -> Option<Self> {
        Self::ALL.iter().copied().find(|k| k.code() == code)
    }

    /// The fixed description for this kind.
    pub fn message(&self) -> &'static str {
        match self {
            Self::UnknownError => "Unknown Error",
            Self::ConnectionError => "Error with Connection",
            Self::InvalidConnectionHandle => "Invalid Connection Handle",
            Self::InvalidConfiguration => "Invalid Configuration",
            Self::NotReady => "Object not ready for specified action",
            Self::InvalidOption => "Invalid Option",
            Self::PostMessageFailure => "Message failed in post",
            Self::InvalidIssuerCredentialHandle => "Invalid Credential Issuer Handle",
            Self::InvalidJson => "Invalid JSON string",
            Self::InvalidProofHandle => "Invalid Proof Handle",
            Self::InvalidMessages => "Invalid Messages",
            Self::InvalidAttributesStructure => "Attributes provided to Credential Offer are not correct, possibly malformed",
            Self::InvalidProof => "Proof had invalid format",
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

/// Describe a numeric code, including [`SUCCESS_CODE`].
pub fn error_message(code: u32) -> &'static str {
    if code == SUCCESS_CODE {
        return "Success";
    }
    ErrorKind::from_code(code)
        .map(|k| k.message())
        .unwrap_or("Unknown Error")
}

/// An error raised by an exchange operation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{} ({}): {}", .kind, .kind.code(), .detail)]
pub struct CredexError {
    kind: ErrorKind,
    detail: String,
}

impl CredexError {
    /// Create an error of the given kind with a detail message.
    pub fn new(kind: ErrorKind, detail: impl Into<String>) -> Self {
        Self {
            kind,
            detail: detail.into(),
        }
    }

    /// The error kind.
    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    /// The numeric code of the error kind.
    pub fn code(&self) -> u32 {
        self.kind.code()
    }

    /// The detail message.
    pub fn detail(&self) -> &str {
        &self.detail
    }

    /// Replace the kind, keeping the detail.
    pub fn with_kind(self, kind: ErrorKind) -> Self {
        Self { kind, ..self }
    }
}

impl From<ErrorKind> for CredexError {
    fn from(kind: ErrorKind) -> Self {
        Self::new(kind, kind.message())
    }
}

impl From<serde_json::Error> for CredexError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(ErrorKind::InvalidJson, err.to_string())
    }
}

/// Result alias used throughout the workspace.
pub type CredexResult<T> = Result<T, CredexError>;

/// Error during canonical serialization.
#[derive(Error, Debug)]
pub enum CanonicalizationError {
    /// Float values are not permitted in canonical representations.
    #[error("float values are not permitted in canonical representations: {0}")]
    FloatRejected(f64),

    /// JSON serialization failed.
    #[error("serialization failed: {0}")]
    SerializationFailed(#[from] serde_json::Error),
}

impl From<CanonicalizationError> for CredexError {
    fn from(err: CanonicalizationError) -> Self {
        Self::new(ErrorKind::InvalidJson, err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_stable() {
        assert_eq!(ErrorKind::UnknownError.code(), 1001);
        assert_eq!(ErrorKind::InvalidConnectionHandle.code(), 1003);
        assert_eq!(ErrorKind::InvalidOption.code(), 1007);
        assert_eq!(ErrorKind::InvalidIssuerCredentialHandle.code(), 1015);
        assert_eq!(ErrorKind::InvalidJson.code(), 1016);
        assert_eq!(ErrorKind::InvalidProofHandle.code(), 1017);
    }

    #[test]
    fn from_code_inverts_code() {
        for kind in ErrorKind::ALL {
            assert_eq!(ErrorKind::from_code(kind.code()), Some(kind));
        }
        assert_eq!(ErrorKind::from_code(SUCCESS_CODE), None);
        assert_eq!(ErrorKind::from_code(9999), None);
    }

    #[test]
    fn error_message_covers_success_and_unknown_codes() {
        assert_eq!(error_message(0), "Success");
        assert_eq!(error_message(1017), "Invalid Proof Handle");
        assert_eq!(error_message(4242), "Unknown Error");
    }

    #[test]
    fn unknown_error_and_invalid_handle_are_distinct() {
        assert_ne!(
            ErrorKind::UnknownError.code(),
            ErrorKind::InvalidProofHandle.code()
        );
    }

    #[test]
    fn display_includes_code_and_detail() {
        let err = CredexError::new(ErrorKind::InvalidOption, "source_id is required");
        assert_eq!(
            err.to_string(),
            "Invalid Option (1007): source_id is required"
        );
    }

    #[test]
    fn serde_json_errors_map_to_invalid_json() {
        let parse: Result<serde_json::Value, _> = serde_json::from_str("{not json");
        let err: CredexError = parse.unwrap_err().into();
        assert_eq!(err.kind(), ErrorKind::InvalidJson);
    }

    #[test]
    fn with_kind_keeps_detail() {
        let err = CredexError::new(ErrorKind::InvalidProofHandle, "handle 7")
            .with_kind(ErrorKind::InvalidIssuerCredentialHandle);
        assert_eq!(err.kind(), ErrorKind::InvalidIssuerCredentialHandle);
        assert_eq!(err.detail(), "handle 7");
    }
}
