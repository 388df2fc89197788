//! # Typed Handles
//!
//! Newtype wrappers for the opaque handles that callers hold in place of
//! objects. You cannot pass a `ConnectionHandle` where a `ProofHandle` is
//! expected.
//!
//! The raw value `0` is never allocated and stands for "no object", the
//! value a binding passes when its wrapper was never initialized.

use serde::{Deserialize, Serialize};

/// Conversion between a typed handle and its raw `u32`.
pub trait HandleId: Copy + Eq + std::hash::Hash + std::fmt::Display + Send + Sync + 'static {
    /// Wrap a raw handle value.
    fn from_raw(raw: u32) -> Self;

    /// The raw handle value.
    fn raw(&self) -> u32;

    /// Whether this is the null handle (`0`).
    fn is_null(&self) -> bool {
        self.raw() == 0
    }
}

/// Handle to a proof exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProofHandle(u32);

/// Handle to a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionHandle(u32);

impl ProofHandle {
    /// The null proof handle.
    pub const NULL: ProofHandle = ProofHandle(0);
}

impl ConnectionHandle {
    /// The null connection handle.
    pub const NULL: ConnectionHandle = ConnectionHandle(0);
}

impl HandleId for ProofHandle {
    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    fn raw(&self) -> u32 {
        self.0
    }
}

impl HandleId for ConnectionHandle {
    fn from_raw(raw: u32) -> Self {
        Self(raw)
    }

    fn raw(&self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for ProofHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "proof:{}", self.0)
    }
}

impl std::fmt::Display for ConnectionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "connection:{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_handles_are_null() {
        assert!(ProofHandle::NULL.is_null());
        assert!(ConnectionHandle::NULL.is_null());
        assert!(!ProofHandle::from_raw(7).is_null());
    }

    #[test]
    fn display_is_namespaced() {
        assert_eq!(ProofHandle::from_raw(3).to_string(), "proof:3");
        assert_eq!(ConnectionHandle::from_raw(3).to_string(), "connection:3");
    }

    #[test]
    fn serializes_as_bare_number() {
        let json = serde_json::to_string(&ProofHandle::from_raw(42)).unwrap();
        assert_eq!(json, "42");
    }
}
