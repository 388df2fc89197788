//! # credex-core: Foundational Types for Credential Exchange
//!
//! Every other crate in the workspace depends on `credex-core`; it depends
//! on nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Numeric error codes.** Every failure is a [`CredexError`] carrying an
//!    [`ErrorKind`] with a stable numeric code. Binding layers surface the
//!    code, not a Rust type.
//!
//! 2. **Typed handles.** `ProofHandle` and `ConnectionHandle` are distinct
//!    newtypes over a `u32`. A connection handle cannot be passed where a
//!    proof handle is expected.
//!
//! 3. **Registry-owned state.** Objects live in a [`HandleRegistry`]; callers
//!    hold only handles, validated on every access.
//!
//! 4. **Canonical snapshots.** Serialized objects flow through
//!    [`CanonicalBytes`] so that `serialize → deserialize → serialize` is
//!    byte-identical.
//!
//! ## Crate Policy
//!
//! - No dependencies on other `credex-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod canonical;
pub mod config;
pub mod digest;
pub mod encoding;
pub mod error;
pub mod handle;
pub mod registry;
pub mod state;
pub mod temporal;

pub use canonical::CanonicalBytes;
pub use config::CredexConfig;
pub use digest::{sha256_digest, ContentDigest};
pub use encoding::encode_attribute_value;
pub use error::{error_message, CredexError, CredexResult, ErrorKind, SUCCESS_CODE};
pub use handle::{ConnectionHandle, HandleId, ProofHandle};
pub use registry::HandleRegistry;
pub use state::{ProofState, StateType};
pub use temporal::Timestamp;
