//! # credex-exchange: Verifier-Side Proof Exchange
//!
//! Implements the objects a verifier drives through a proof exchange and
//! the handle-keyed operations a binding layer calls on them.
//!
//! - **Context** (`context.rs`): the agent configuration, the injected
//!   transport, and the proof and connection registries. Cheap to clone;
//!   every clone shares the same registries.
//!
//! - **Connection** (`connection.rs`): the pairwise channel a proof request
//!   travels over. `Initialized → OfferSent → Accepted`.
//!
//! - **Proof** (`proof.rs`): one proof request/response cycle.
//!   `Initialized → OfferSent → RequestReceived`, with the verification
//!   outcome recorded when the presentation arrives.
//!
//! - **Verification** (`verification.rs`): checks a presentation against the
//!   request it answers.
//!
//! ## Handle Contract
//!
//! Operations take a typed handle and validate it on every call. A handle
//! is live from `create`/`from_string` until `release`; afterwards every
//! operation fails with the invalid-handle kind of its registry.

pub mod connection;
pub mod context;
pub mod proof;
pub mod verification;

pub use connection::{ConnectOptions, Connection, ConnectionType, InviteDetails};
pub use context::Context;
pub use proof::{ProofCreateData, ProofExchange, ProofResult, TransitionRecord};
pub use verification::{verify_presentation, VerificationFailure};
