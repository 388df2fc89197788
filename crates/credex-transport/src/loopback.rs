//! In-process transport backed by DashMap mailboxes.
//!
//! Sent messages accumulate per channel until the counterparty takes them;
//! replies are stored under `(channel, reply_to)` until the sender polls
//! for them. Each reply is delivered once.

use dashmap::DashMap;
use serde_json::Value;

use credex_core::CredexResult;

use crate::messages::{ChannelId, Envelope, InboundMessage, MessageId, MessageKind, OutboundMessage};
use crate::Transport;

/// Mailbox transport for parties living in the same process.
#[derive(Debug, Default)]
pub struct LoopbackTransport {
    outbox: DashMap<ChannelId, Vec<Envelope>>,
    replies: DashMap<(ChannelId, MessageId), InboundMessage>,
}

impl LoopbackTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take every message sent on `channel` since the last call.
    pub fn take_sent(&self, channel: &ChannelId) -> Vec<Envelope> {
        self.outbox
            .remove(channel)
            .map(|(_, envelopes)| envelopes)
            .unwrap_or_default()
    }

    /// Post a reply to `reply_to` on `channel`, replacing any reply not yet
    /// polled.
    pub fn reply(
        &self,
        channel: &ChannelId,
        reply_to: &MessageId,
        kind: MessageKind,
        payload: Value,
    ) -> MessageId {
        let id = MessageId::generate();
        let message = InboundMessage {
            id: id.clone(),
            reply_to: reply_to.clone(),
            kind,
            payload,
        };
        self.replies
            .insert((channel.clone(), reply_to.clone()), message);
        tracing::debug!(%channel, %reply_to, ?kind, "loopback reply posted");
        id
    }

    /// Drop both mailboxes of `channel`. Returns how many messages went.
    pub fn clear_channel(&self, channel: &ChannelId) -> usize {
        let sent = self.outbox.remove(channel).map_or(0, |(_, e)| e.len());
        let before = self.replies.len();
        self.replies.retain(|(c, _), _| c != channel);
        let cleared = sent + before.saturating_sub(self.replies.len());
        tracing::debug!(%channel, cleared, "loopback channel cleared");
        cleared
    }

    /// Replies posted but not yet polled, across all channels.
    pub fn pending_replies(&self) -> usize {
        self.replies.len()
    }
}

impl Transport for LoopbackTransport {
    fn send(&self, channel: &ChannelId, message: OutboundMessage) -> CredexResult<MessageId> {
        let id = MessageId::generate();
        tracing::debug!(%channel, id = %id, kind = ?message.kind, "loopback send");
        self.outbox
            .entry(channel.clone())
            .or_default()
            .push(Envelope {
                id: id.clone(),
                message,
            });
        Ok(id)
    }

    fn poll(
        &self,
        channel: &ChannelId,
        reply_to: &MessageId,
    ) -> CredexResult<Option<InboundMessage>> {
        Ok(self
            .replies
            .remove(&(channel.clone(), reply_to.clone()))
            .map(|(_, message)| message))
    }

    fn discard(&self, channel: &ChannelId, reply_to: &MessageId) {
        if self
            .replies
            .remove(&(channel.clone(), reply_to.clone()))
            .is_some()
        {
            tracing::debug!(%channel, %reply_to, "loopback reply discarded");
        }
    }
}
