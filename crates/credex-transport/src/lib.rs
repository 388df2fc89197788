//! # credex-transport: Message Transport Abstraction
//!
//! The exchange objects never talk to a network directly. They hand
//! messages to a [`Transport`] and poll it for replies. The transport is
//! injected when the agent context is built, so tests swap in a scripted
//! implementation without any global test-mode switch.
//!
//! ## Architecture
//!
//! - **Messages** (`messages.rs`): channel and message identifiers, the
//!   envelope types, and the wire payloads of a proof request and its
//!   presentation.
//!
//! - **Loopback** (`loopback.rs`): `LoopbackTransport` keeps per-channel
//!   mailboxes in process memory so a second party in the same process can
//!   read requests and post replies.
//!
//! - **Mock** (`mock.rs`, feature `mock`): `MockTransport` answers polls
//!   from a queue of canned responses that a test pushes ahead of time.

pub mod loopback;
pub mod messages;
#[cfg(feature = "mock")]
pub mod mock;

pub use loopback::LoopbackTransport;
pub use messages::{
    AttrInfo, ChannelId, Envelope, Filter, InboundMessage, MessageId, MessageKind,
    NonRevokedInterval, OutboundMessage, PredicateInfo, Presentation, ProofRequestMessage,
    RequestedProof, RevealedAttr, SubProofReferent,
};
#[cfg(feature = "mock")]
pub use mock::{MockMessage, MockTransport};

use credex_core::CredexResult;

/// A channel that carries messages to counterparties.
///
/// Implementations must be `Send + Sync`; one transport is shared by every
/// object in an agent context.
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Queue `message` on `channel`. Returns the id the counterparty will
    /// reference when replying.
    fn send(&self, channel: &ChannelId, message: OutboundMessage) -> CredexResult<MessageId>;

    /// Check once for a reply to `reply_to` on `channel`. Never blocks
    /// waiting for one.
    fn poll(
        &self,
        channel: &ChannelId,
        reply_to: &MessageId,
    ) -> CredexResult<Option<InboundMessage>>;

    /// Drop any undelivered reply to `reply_to`; nobody will poll for it.
    fn discard(&self, _channel: &ChannelId, _reply_to: &MessageId) {}
}
