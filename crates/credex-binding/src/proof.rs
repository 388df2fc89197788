//! # Proof Object
//!
//! The binding-side owner of a proof exchange handle.
//!
//! A `Proof` is either initialized (it holds a live handle) or not. The
//! uninitialized object exists so hosts can construct first and fill in
//! later; operations on it behave as follows:
//!
//! | operation       | uninitialized           |
//! |-----------------|-------------------------|
//! | `serialize`     | `InvalidProofHandle`    |
//! | `release`       | `UnknownError`          |
//! | `update_state`  | no-op                   |
//! | `get_state`     | `StateType::None`       |
//! | `request_proof` | `InvalidIssuerCredentialHandle` |
//! | `get_proof`     | `InvalidProofHandle`    |
//!
//! Dropping an initialized `Proof` releases its handle.

use serde_json::Value;

use credex_core::{
    CredexError, CredexResult, ErrorKind, ProofHandle, ProofState, StateType, SUCCESS_CODE,
};
use credex_exchange::{proof, Context, ProofCreateData, ProofResult};

use crate::connection::Connection;
use crate::runtime::run_blocking;

/// Owned proof exchange; see the module docs.
#[derive(Debug)]
pub struct Proof {
    ctx: Context,
    handle: Option<ProofHandle>,
    source_id: String,
}

impl Proof {
    /// A proof that was never initialized.
    pub fn uninitialized(ctx: &Context) -> Self {
        Self {
            ctx: ctx.clone(),
            handle: None,
            source_id: String::new(),
        }
    }

    /// Create a proof exchange from request parameters.
    pub async fn create(ctx: &Context, data: ProofCreateData) -> CredexResult<Self> {
        let source_id = data.source_id.clone().unwrap_or_default();
        let worker = ctx.clone();
        let handle = run_blocking(move || proof::create(&worker, data)).await?;
        Ok(Self {
            ctx: ctx.clone(),
            handle: Some(handle),
            source_id,
        })
    }

    /// Rebuild a proof from a snapshot produced by [`Proof::serialize`].
    pub async fn deserialize(ctx: &Context, data: &Value) -> CredexResult<Self> {
        let text = serde_json::to_string(data)?;
        let worker = ctx.clone();
        let (handle, source_id) =
            run_blocking(move || proof::restore(&worker, &text)).await?;
        Ok(Self {
            ctx: ctx.clone(),
            handle: Some(handle),
            source_id,
        })
    }

    pub fn handle(&self) -> Option<ProofHandle> {
        self.handle
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    fn live_handle(&self, kind: ErrorKind) -> CredexResult<ProofHandle> {
        self.handle
            .ok_or_else(|| CredexError::new(kind, "proof object is not initialized"))
    }

    /// Structured snapshot of the exchange.
    pub async fn serialize(&self) -> CredexResult<Value> {
        let handle = self.live_handle(ErrorKind::InvalidProofHandle)?;
        let ctx = self.ctx.clone();
        let text = run_blocking(move || proof::to_string(&ctx, handle)).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Release the handle. Returns the success code.
    pub async fn release(&mut self) -> CredexResult<u32> {
        let handle = self.live_handle(ErrorKind::UnknownError)?;
        self.handle = None;
        let ctx = self.ctx.clone();
        run_blocking(move || proof::release(&ctx, handle)).await?;
        Ok(SUCCESS_CODE)
    }

    /// Poll once for the presentation.
    ///
    /// Uninitialized and released handles are a no-op; transport failures
    /// propagate.
    pub async fn update_state(&self) -> CredexResult<()> {
        let Some(handle) = self.handle else {
            return Ok(());
        };
        let ctx = self.ctx.clone();
        match run_blocking(move || proof::update_state(&ctx, handle)).await {
            Ok(state) => {
                tracing::debug!(%handle, %state, "proof polled");
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::InvalidProofHandle => {
                tracing::debug!(%handle, "poll on released proof ignored");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    pub async fn get_state(&self) -> CredexResult<StateType> {
        let Some(handle) = self.handle else {
            return Ok(StateType::None);
        };
        let ctx = self.ctx.clone();
        run_blocking(move || proof::get_state(&ctx, handle)).await
    }

    pub async fn proof_state(&self) -> CredexResult<ProofState> {
        let handle = self.live_handle(ErrorKind::InvalidProofHandle)?;
        let ctx = self.ctx.clone();
        run_blocking(move || proof::get_proof_state(&ctx, handle)).await
    }

    /// Send the proof request over `connection`.
    pub async fn request_proof(&self, connection: &Connection) -> CredexResult<()> {
        let handle = self.live_handle(ErrorKind::InvalidIssuerCredentialHandle)?;
        let conn = connection.live_handle()?;
        let ctx = self.ctx.clone();
        run_blocking(move || proof::send_proof_request(&ctx, handle, conn)).await
    }

    /// The received presentation and its verification outcome.
    pub async fn get_proof(&self, connection: &Connection) -> CredexResult<ProofResult> {
        let handle = self.live_handle(ErrorKind::InvalidProofHandle)?;
        let conn = connection.live_handle()?;
        let ctx = self.ctx.clone();
        run_blocking(move || proof::get_proof(&ctx, handle, conn)).await
    }
}

impl Drop for Proof {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            match proof::release(&self.ctx, handle) {
                Ok(()) => tracing::debug!(%handle, "proof released on drop"),
                Err(e) => tracing::debug!(%handle, error = %e, "proof already gone on drop"),
            }
        }
    }
}
