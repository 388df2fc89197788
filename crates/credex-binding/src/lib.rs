//! # credex-binding: Async Binding Objects
//!
//! Owned wrappers a host-language binding exposes: [`Proof`] and
//! [`Connection`]. Each wraps an optional handle into the shared
//! [`Context`] and releases it when dropped, so an object that goes out of
//! scope never leaks its registry entry.
//!
//! Every operation is `async` and runs the exchange call on tokio's
//! blocking pool, the way a native callback would complete it.
//!
//! ```no_run
//! # async fn demo(ctx: credex_binding::Context) -> credex_binding::CredexResult<()> {
//! use credex_binding::{Connection, Proof, ProofCreateData};
//! use serde_json::json;
//!
//! let connection = Connection::create(&ctx, "alice").await?;
//! connection.connect(None).await?;
//!
//! let proof = Proof::create(&ctx, ProofCreateData {
//!     source_id: Some("kyc".into()),
//!     attrs: Some(json!([{ "name": "email" }])),
//!     name: Some("KYC".into()),
//!     ..Default::default()
//! }).await?;
//! proof.request_proof(&connection).await?;
//! proof.update_state().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod logging;
pub mod proof;
mod runtime;

pub use connection::Connection;
pub use logging::init_default_logger;
pub use proof::Proof;

pub use credex_core::{
    error_message, CredexConfig, CredexError, CredexResult, ErrorKind, ProofState, StateType,
    SUCCESS_CODE,
};
pub use credex_exchange::{ConnectOptions, Context, InviteDetails, ProofCreateData, ProofResult};
pub use credex_transport::{LoopbackTransport, Transport};
