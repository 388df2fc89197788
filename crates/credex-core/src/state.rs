//! # Exchange States
//!
//! The lifecycle states shared by every exchange object, and the
//! verification outcome of a received proof.
//!
//! ```text
//! None ──create()──▶ Initialized ──send──▶ OfferSent ──poll──▶ RequestReceived ──▶ Accepted
//! ```
//!
//! Numeric values are part of the external contract and never change.

use serde::{Deserialize, Serialize};

/// Lifecycle state of an exchange object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[repr(u32)]
pub enum StateType {
    /// No object, or an object that was never initialized.
    None = 0,
    /// Created; nothing sent yet.
    Initialized = 1,
    /// The outbound message (invite or proof request) has been queued.
    OfferSent = 2,
    /// The counterparty's response has been received.
    RequestReceived = 3,
    /// The exchange completed.
    Accepted = 4,
    /// The counterparty declined.
    Unfulfilled = 5,
    /// The exchange timed out.
    Expired = 6,
    /// The exchange was revoked.
    Revoked = 7,
}

impl StateType {
    /// The numeric value of this state.
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }

    /// Look up a state by its numeric value.
    pub fn from_u32(value: u32) -> Option<Self> {
        match value {
            0 => Some(Self::None),
            1 => Some(Self::Initialized),
            2 => Some(Self::OfferSent),
            3 => Some(Self::RequestReceived),
            4 => Some(Self::Accepted),
            5 => Some(Self::Unfulfilled),
            6 => Some(Self::Expired),
            7 => Some(Self::Revoked),
            _ => None,
        }
    }
}

impl std::fmt::Display for StateType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::None => "NONE",
            Self::Initialized => "INITIALIZED",
            Self::OfferSent => "OFFER_SENT",
            Self::RequestReceived => "REQUEST_RECEIVED",
            Self::Accepted => "ACCEPTED",
            Self::Unfulfilled => "UNFULFILLED",
            Self::Expired => "EXPIRED",
            Self::Revoked => "REVOKED",
        };
        f.write_str(s)
    }
}

/// Verification outcome of a received proof.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[repr(u32)]
pub enum ProofState {
    /// No proof has been received yet.
    #[default]
    Undefined = 0,
    /// The proof satisfied the request.
    Verified = 1,
    /// The proof did not satisfy the request.
    Invalid = 2,
}

impl ProofState {
    /// The numeric value of this outcome.
    pub fn as_u32(&self) -> u32 {
        *self as u32
    }
}

impl std::fmt::Display for ProofState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Undefined => "UNDEFINED",
            Self::Verified => "VERIFIED",
            Self::Invalid => "INVALID",
        };
        f.write_str(s)
    }
}
