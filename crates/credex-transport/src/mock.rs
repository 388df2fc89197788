//! # Mock Transport
//!
//! A scripted transport for deterministic tests. Sends always succeed (or
//! always fail, when told to) and are recorded. Each poll pops the next
//! queued [`MockMessage`] and turns it into the reply a counterparty would
//! have sent.
//!
//! Proof replies are built against the proof request actually sent under
//! the polled message id, so a "verified" reply satisfies whatever the test
//! requested and an "invalid" one fails verification on the same request.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::Mutex;
use serde_json::{json, Value};

use credex_core::{CredexError, CredexResult, ErrorKind};

use crate::messages::{
    ChannelId, Envelope, InboundMessage, MessageId, MessageKind, OutboundMessage, Presentation,
    ProofRequestMessage,
};
use crate::Transport;

/// A canned counterparty response.
#[derive(Debug, Clone, PartialEq)]
pub enum MockMessage {
    /// The counterparty accepted a connection invitation.
    ConnectionAccepted,
    /// A presentation that satisfies the polled proof request.
    VerifiedProof,
    /// A presentation whose revealed values do not match their encodings.
    InvalidProof,
    /// An arbitrary reply.
    Raw { kind: MessageKind, payload: Value },
}

/// Scripted transport; see the module docs.
#[derive(Debug, Default)]
pub struct MockTransport {
    queued: Mutex<VecDeque<MockMessage>>,
    sent: Mutex<Vec<(ChannelId, Envelope)>>,
    fail_sends: AtomicBool,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue the response returned by a later poll.
    pub fn set_next(&self, message: MockMessage) {
        self.queued.lock().push_back(message);
    }

    /// Number of queued responses not yet polled.
    pub fn pending(&self) -> usize {
        self.queued.lock().len()
    }

    /// Every message sent so far, in order.
    pub fn sent_messages(&self) -> Vec<(ChannelId, Envelope)> {
        self.sent.lock().clone()
    }

    /// Make subsequent sends fail with `PostMessageFailure`.
    pub fn fail_sends(&self, fail: bool) {
        self.fail_sends.store(fail, Ordering::SeqCst);
    }

    fn sent_proof_request(
        &self,
        channel: &ChannelId,
        id: &MessageId,
    ) -> CredexResult<ProofRequestMessage> {
        let sent = self.sent.lock();
        let envelope = sent
            .iter()
            .find(|(c, e)| {
                c == channel && &e.id == id && e.message.kind == MessageKind::ProofRequest
            })
            .map(|(_, e)| e)
            .ok_or_else(|| {
                CredexError::new(
                    ErrorKind::InvalidMessages,
                    format!("no proof request {id} was sent on {channel}"),
                )
            })?;
        Ok(serde_json::from_value(envelope.message.payload.clone())?)
    }

    fn presentation_for(
        &self,
        channel: &ChannelId,
        reply_to: &MessageId,
        honest: bool,
    ) -> CredexResult<Value> {
        let request = self.sent_proof_request(channel, reply_to)?;
        let mut presentation = Presentation::answering(&request, |name| format!("mock-{name}"));
        if !honest {
            for attr in presentation.requested_proof.revealed_attrs.values_mut() {
                attr.encoded = "0".to_string();
            }
        }
        Ok(serde_json::to_value(presentation)?)
    }
}

impl Transport for MockTransport {
    fn send(&self, channel: &ChannelId, message: OutboundMessage) -> CredexResult<MessageId> {
        if self.fail_sends.load(Ordering::SeqCst) {
            return Err(CredexError::new(
                ErrorKind::PostMessageFailure,
                format!("mock transport refused message on {channel}"),
            ));
        }
        let id = MessageId::generate();
        self.sent.lock().push((
            channel.clone(),
            Envelope {
                id: id.clone(),
                message,
            },
        ));
        Ok(id)
    }

    fn poll(
        &self,
        channel: &ChannelId,
        reply_to: &MessageId,
    ) -> CredexResult<Option<InboundMessage>> {
        let Some(next) = self.queued.lock().pop_front() else {
            return Ok(None);
        };
        let (kind, payload) = match next {
            MockMessage::ConnectionAccepted => (
                MessageKind::ConnectionAnswer,
                json!({ "sender_did": format!("mock-peer-{channel}") }),
            ),
            MockMessage::VerifiedProof => (
                MessageKind::Proof,
                self.presentation_for(channel, reply_to, true)?,
            ),
            MockMessage::InvalidProof => (
                MessageKind::Proof,
                self.presentation_for(channel, reply_to, false)?,
            ),
            MockMessage::Raw { kind, payload } => (kind, payload),
        };
        Ok(Some(InboundMessage {
            id: MessageId::generate(),
            reply_to: reply_to.clone(),
            kind,
            payload,
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::messages::AttrInfo;
    use std::collections::BTreeMap;

    fn send_request(t: &MockTransport, channel: &ChannelId) -> MessageId {
        let mut requested_attributes = BTreeMap::new();
        requested_attributes.insert(
            "attribute_0".to_string(),
            AttrInfo {
                name: "email".into(),
                restrictions: None,
            },
        );
        let request = ProofRequestMessage {
            nonce: "42".into(),
            name: "req".into(),
            version: "1.0".into(),
            requested_attributes,
            requested_predicates: BTreeMap::new(),
            non_revoked: None,
            requester_did: "did1".into(),
            requester_name: "Acme".into(),
        };
        t.send(
            channel,
            OutboundMessage::new(MessageKind::ProofRequest, &request).unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn empty_queue_polls_none() {
        let t = MockTransport::new();
        let channel = ChannelId::new("c");
        assert!(t.poll(&channel, &MessageId::new("x")).unwrap().is_none());
    }

    #[test]
    fn verified_proof_answers_the_sent_request() {
        let t = MockTransport::new();
        let channel = ChannelId::new("c");
        let id = send_request(&t, &channel);
        t.set_next(MockMessage::VerifiedProof);

        let reply = t.poll(&channel, &id).unwrap().expect("reply");
        assert_eq!(reply.kind, MessageKind::Proof);
        let p: Presentation = serde_json::from_value(reply.payload).unwrap();
        assert_eq!(p.requested_proof.revealed_attrs["attribute_0"].raw, "mock-email");
        assert_eq!(t.pending(), 0);
    }

    #[test]
    fn invalid_proof_breaks_encodings() {
        let t = MockTransport::new();
        let channel = ChannelId::new("c");
        let id = send_request(&t, &channel);
        t.set_next(MockMessage::InvalidProof);

        let reply = t.poll(&channel, &id).unwrap().expect("reply");
        let p: Presentation = serde_json::from_value(reply.payload).unwrap();
        assert_eq!(p.requested_proof.revealed_attrs["attribute_0"].encoded, "0");
    }

    #[test]
    fn proof_reply_without_request_is_invalid_messages() {
        let t = MockTransport::new();
        t.set_next(MockMessage::VerifiedProof);
        let err = t
            .poll(&ChannelId::new("c"), &MessageId::new("missing"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidMessages);
    }

    #[test]
    fn failing_sends_report_post_message_failure() {
        let t = MockTransport::new();
        t.fail_sends(true);
        let err = t
            .send(
                &ChannelId::new("c"),
                OutboundMessage {
                    kind: MessageKind::ConnectionRequest,
                    payload: json!({}),
                },
            )
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::PostMessageFailure);
        assert!(t.sent_messages().is_empty());
    }
}
