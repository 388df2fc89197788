//! # Connection Lifecycle
//!
//! The pairwise channel a proof request travels over.
//!
//! ```text
//! Initialized ──connect()──▶ OfferSent ──answer received──▶ Accepted
//! ```
//!
//! A connection counts as connected once its invitation is out
//! (`OfferSent`) or answered (`Accepted`). Proof requests need a connected
//! channel.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use credex_core::{
    CanonicalBytes, ConnectionHandle, CredexConfig, CredexError, CredexResult, ErrorKind,
    StateType,
};
use credex_transport::{ChannelId, MessageId, MessageKind, OutboundMessage, Transport};

use crate::context::Context;

// ─── Options ─────────────────────────────────────────────────────────

/// How the invitation reaches the counterparty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    /// The invitation is rendered for scanning.
    #[default]
    Qr,
    /// The invitation is texted to `phone`.
    Sms,
}

/// Options for [`connect`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectOptions {
    #[serde(default)]
    pub connection_type: ConnectionType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

/// The invitation sent to the counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InviteDetails {
    pub sender_did: String,
    pub sender_verkey: String,
    pub sender_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sender_logo_url: Option<String>,
    pub agency_endpoint: String,
    pub connection_type: ConnectionType,
    pub status_msg: String,
}

// ─── Connection ──────────────────────────────────────────────────────

/// One pairwise connection.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Connection {
    source_id: String,
    pw_did: ChannelId,
    pw_verkey: String,
    state: StateType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invite_msg_id: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    invite_details: Option<InviteDetails>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    their_pw_did: Option<String>,
    version: String,
}

impl Connection {
    /// A fresh connection with newly generated pairwise keys.
    pub fn new(source_id: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            pw_did: ChannelId::generate(),
            pw_verkey: Uuid::new_v4().simple().to_string(),
            state: StateType::Initialized,
            invite_msg_id: None,
            invite_details: None,
            their_pw_did: None,
            version: version.into(),
        }
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn state(&self) -> StateType {
        self.state
    }

    /// The channel proof requests are sent on.
    pub fn channel(&self) -> &ChannelId {
        &self.pw_did
    }

    pub fn invite_details(&self) -> Option<&InviteDetails> {
        self.invite_details.as_ref()
    }

    /// The counterparty's pairwise DID, once the invitation was answered.
    pub fn their_pw_did(&self) -> Option<&str> {
        self.their_pw_did.as_deref()
    }

    pub fn is_connected(&self) -> bool {
        matches!(self.state, StateType::OfferSent | StateType::Accepted)
    }

    /// Send the invitation.
    pub fn connect(
        &mut self,
        config: &CredexConfig,
        transport: &dyn Transport,
        options: &ConnectOptions,
    ) -> CredexResult<InviteDetails> {
        if self.state != StateType::Initialized {
            return Err(CredexError::new(
                ErrorKind::NotReady,
                format!("cannot connect from state {}", self.state),
            ));
        }
        if options.connection_type == ConnectionType::Sms
            && options.phone.as_deref().map_or(true, str::is_empty)
        {
            return Err(CredexError::new(
                ErrorKind::InvalidOption,
                "sms connections require a phone number",
            ));
        }

        let invite = InviteDetails {
            sender_did: self.pw_did.to_string(),
            sender_verkey: self.pw_verkey.clone(),
            sender_name: config.institution_name.clone(),
            sender_logo_url: config.institution_logo_url.clone(),
            agency_endpoint: config.agency_endpoint.clone(),
            connection_type: options.connection_type,
            status_msg: "message sent".to_string(),
        };
        let message = OutboundMessage::new(MessageKind::ConnectionRequest, &invite)?;
        let msg_id = transport.send(&self.pw_did, message)?;

        tracing::info!(
            source_id = %self.source_id,
            channel = %self.pw_did,
            msg_id = %msg_id,
            "connection invitation sent"
        );
        self.invite_msg_id = Some(msg_id);
        self.invite_details = Some(invite.clone());
        self.state = StateType::OfferSent;
        Ok(invite)
    }

    /// Poll for the counterparty's answer.
    pub fn poll(&mut self, transport: &dyn Transport) -> CredexResult<StateType> {
        let Some(msg_id) = self.invite_msg_id.as_ref() else {
            return Ok(self.state);
        };
        if self.state != StateType::OfferSent {
            return Ok(self.state);
        }
        let Some(reply) = transport.poll(&self.pw_did, msg_id)? else {
            return Ok(self.state);
        };
        if reply.kind != MessageKind::ConnectionAnswer {
            tracing::warn!(
                source_id = %self.source_id,
                kind = ?reply.kind,
                "ignoring unexpected reply to connection invitation"
            );
            return Ok(self.state);
        }
        let their_did = reply
            .payload
            .get("sender_did")
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                CredexError::new(
                    ErrorKind::InvalidMessages,
                    "connection answer carries no sender_did",
                )
            })?;
        self.their_pw_did = Some(their_did.to_string());
        self.state = StateType::Accepted;
        tracing::info!(source_id = %self.source_id, their_did, "connection accepted");
        Ok(self.state)
    }
}

// ─── Handle operations ───────────────────────────────────────────────

/// Create a connection and return its handle.
pub fn create(ctx: &Context, source_id: &str) -> CredexResult<ConnectionHandle> {
    let connection = Connection::new(source_id, ctx.config().protocol_version.clone());
    let handle = ctx.connections().add(connection);
    tracing::debug!(%handle, source_id, "connection created");
    Ok(handle)
}

/// Send the invitation for `handle`.
pub fn connect(
    ctx: &Context,
    handle: ConnectionHandle,
    options: Option<ConnectOptions>,
) -> CredexResult<InviteDetails> {
    let options = options.unwrap_or_default();
    ctx.connections()
        .get_mut(handle, |c| c.connect(ctx.config(), ctx.transport(), &options))
}

/// Poll the transport and return the resulting state.
pub fn update_state(ctx: &Context, handle: ConnectionHandle) -> CredexResult<StateType> {
    ctx.connections()
        .get_mut(handle, |c| c.poll(ctx.transport()))
}

pub fn get_state(ctx: &Context, handle: ConnectionHandle) -> CredexResult<StateType> {
    ctx.connections().get(handle, |c| Ok(c.state()))
}

pub fn get_source_id(ctx: &Context, handle: ConnectionHandle) -> CredexResult<String> {
    ctx.connections().get(handle, |c| Ok(c.source_id().to_string()))
}

pub fn invite_details(
    ctx: &Context,
    handle: ConnectionHandle,
) -> CredexResult<Option<InviteDetails>> {
    ctx.connections()
        .get(handle, |c| Ok(c.invite_details().cloned()))
}

pub fn is_valid_handle(ctx: &Context, handle: ConnectionHandle) -> bool {
    ctx.connections().has_handle(handle)
}

/// The channel of a live, connected connection.
///
/// Fails with `InvalidConnectionHandle` for dead handles and for
/// connections whose invitation has not gone out.
pub fn channel_for(ctx: &Context, handle: ConnectionHandle) -> CredexResult<ChannelId> {
    ctx.connections().get(handle, |c| {
        if c.is_connected() {
            Ok(c.channel().clone())
        } else {
            Err(CredexError::new(
                ErrorKind::InvalidConnectionHandle,
                format!("{handle} is not connected (state {})", c.state()),
            ))
        }
    })
}

/// Canonical JSON snapshot of the connection.
pub fn to_string(ctx: &Context, handle: ConnectionHandle) -> CredexResult<String> {
    ctx.connections()
        .get(handle, |c| Ok(CanonicalBytes::new(c)?.into_string()))
}

/// Rebuild a connection from a snapshot under a new handle.
pub fn from_string(ctx: &Context, data: &str) -> CredexResult<ConnectionHandle> {
    restore(ctx, data).map(|(handle, _)| handle)
}

/// Like [`from_string`], also returning the restored source id.
pub fn restore(ctx: &Context, data: &str) -> CredexResult<(ConnectionHandle, String)> {
    let connection: Connection = serde_json::from_str(data)?;
    let source_id = connection.source_id().to_string();
    let handle = ctx.connections().add(connection);
    tracing::debug!(%handle, %source_id, "connection restored from snapshot");
    Ok((handle, source_id))
}

pub fn release(ctx: &Context, handle: ConnectionHandle) -> CredexResult<()> {
    ctx.connections().release(handle)
}
