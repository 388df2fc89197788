//! Binding-side owner of a connection handle. Dropping an initialized
//! `Connection` releases its handle.

use serde_json::Value;

use credex_core::{ConnectionHandle, CredexError, CredexResult, ErrorKind, StateType, SUCCESS_CODE};
use credex_exchange::{connection, ConnectOptions, Context, InviteDetails};

use crate::runtime::run_blocking;

/// Owned pairwise connection.
#[derive(Debug)]
pub struct Connection {
    ctx: Context,
    handle: Option<ConnectionHandle>,
    source_id: String,
}

impl Connection {
    /// A connection that was never initialized.
    pub fn uninitialized(ctx: &Context) -> Self {
        Self {
            ctx: ctx.clone(),
            handle: None,
            source_id: String::new(),
        }
    }

    pub async fn create(ctx: &Context, source_id: &str) -> CredexResult<Self> {
        let worker = ctx.clone();
        let id = source_id.to_string();
        let handle = run_blocking(move || connection::create(&worker, &id)).await?;
        Ok(Self {
            ctx: ctx.clone(),
            handle: Some(handle),
            source_id: source_id.to_string(),
        })
    }

    pub async fn deserialize(ctx: &Context, data: &Value) -> CredexResult<Self> {
        let text = serde_json::to_string(data)?;
        let worker = ctx.clone();
        let (handle, source_id) =
            run_blocking(move || connection::restore(&worker, &text)).await?;
        Ok(Self {
            ctx: ctx.clone(),
            handle: Some(handle),
            source_id,
        })
    }

    pub fn handle(&self) -> Option<ConnectionHandle> {
        self.handle
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    /// Whether the handle is initialized and still live.
    pub fn is_valid(&self) -> bool {
        self.handle
            .is_some_and(|h| connection::is_valid_handle(&self.ctx, h))
    }

    pub(crate) fn live_handle(&self) -> CredexResult<ConnectionHandle> {
        self.handle.ok_or_else(|| {
            CredexError::new(
                ErrorKind::InvalidConnectionHandle,
                "connection object is not initialized",
            )
        })
    }

    /// Send the invitation.
    pub async fn connect(&self, options: Option<ConnectOptions>) -> CredexResult<InviteDetails> {
        let handle = self.live_handle()?;
        let ctx = self.ctx.clone();
        run_blocking(move || connection::connect(&ctx, handle, options)).await
    }

    /// Poll once for the counterparty's answer.
    pub async fn update_state(&self) -> CredexResult<StateType> {
        let handle = self.live_handle()?;
        let ctx = self.ctx.clone();
        run_blocking(move || connection::update_state(&ctx, handle)).await
    }

    pub async fn get_state(&self) -> CredexResult<StateType> {
        let Some(handle) = self.handle else {
            return Ok(StateType::None);
        };
        let ctx = self.ctx.clone();
        run_blocking(move || connection::get_state(&ctx, handle)).await
    }

    pub async fn invite_details(&self) -> CredexResult<Option<InviteDetails>> {
        let handle = self.live_handle()?;
        let ctx = self.ctx.clone();
        run_blocking(move || connection::invite_details(&ctx, handle)).await
    }

    pub async fn serialize(&self) -> CredexResult<Value> {
        let handle = self.live_handle()?;
        let ctx = self.ctx.clone();
        let text = run_blocking(move || connection::to_string(&ctx, handle)).await?;
        Ok(serde_json::from_str(&text)?)
    }

    pub async fn release(&mut self) -> CredexResult<u32> {
        let handle = self.handle.take().ok_or_else(|| {
            CredexError::new(ErrorKind::UnknownError, "connection object is not initialized")
        })?;
        let ctx = self.ctx.clone();
        run_blocking(move || connection::release(&ctx, handle)).await?;
        Ok(SUCCESS_CODE)
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        if let Some(handle) = self.handle.take() {
            if connection::release(&self.ctx, handle).is_ok() {
                tracing::debug!(%handle, "connection released on drop");
            }
        }
    }
}
