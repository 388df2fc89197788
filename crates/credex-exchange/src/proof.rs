//! # Proof Exchange State Machine
//!
//! One verifier-side proof request/response cycle.
//!
//! ## States
//!
//! ```text
//! None ──create()──▶ Initialized ──send_proof_request()──▶ OfferSent
//!                                                             │
//!                                      update_state() (reply) │
//!                                                             ▼
//!                                                      RequestReceived
//! ```
//!
//! `update_state` performs at most one transport poll per call. When a
//! presentation arrives it is verified against the request that was sent,
//! its canonical SHA-256 digest recorded, and the outcome stored as the
//! [`ProofState`].
//!
//! Every transition is appended to the transition log with a UTC timestamp.
//! The log is part of the snapshot, so a restored exchange keeps its
//! history.

use rand::Rng;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use credex_core::{
    sha256_digest, CanonicalBytes, ConnectionHandle, CredexConfig, CredexError, CredexResult,
    ErrorKind, ProofHandle, ProofState, StateType, Timestamp,
};
use credex_transport::{
    AttrInfo, ChannelId, MessageId, MessageKind, NonRevokedInterval, OutboundMessage,
    PredicateInfo, ProofRequestMessage, Transport,
};

use crate::connection;
use crate::context::Context;
use crate::verification;

// ─── Creation parameters ─────────────────────────────────────────────

/// Parameters for [`create`].
///
/// `attrs` and `preds` accept either a JSON array or a string holding
/// JSON array text.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProofCreateData {
    #[serde(default)]
    pub source_id: Option<String>,
    #[serde(default)]
    pub attrs: Option<Value>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub preds: Option<Value>,
    #[serde(default)]
    pub revocation_interval: Option<NonRevokedInterval>,
}

/// Result of [`get_proof`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofResult {
    pub proof_state: ProofState,
    pub proof: Value,
}

/// A recorded state change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionRecord {
    pub from: StateType,
    pub to: StateType,
    pub timestamp: Timestamp,
}

fn missing_option(field: &str) -> CredexError {
    CredexError::new(ErrorKind::InvalidOption, format!("missing required field `{field}`"))
}

/// Parse a descriptor list supplied as a JSON array or as JSON array text.
fn parse_descriptors<T: serde::de::DeserializeOwned>(
    field: &str,
    value: Value,
) -> CredexResult<Vec<T>> {
    let parsed = match value {
        Value::Array(_) => serde_json::from_value(value),
        Value::String(text) => serde_json::from_str(&text),
        other => {
            return Err(CredexError::new(
                ErrorKind::InvalidJson,
                format!("`{field}` must be a JSON array, got {other}"),
            ))
        }
    };
    parsed.map_err(|e| CredexError::new(ErrorKind::InvalidJson, format!("`{field}`: {e}")))
}

fn generate_nonce() -> String {
    rand::thread_rng().gen::<u64>().to_string()
}

// ─── Proof exchange ──────────────────────────────────────────────────

/// One proof request/response cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProofExchange {
    source_id: String,
    name: String,
    requested_attrs: Vec<AttrInfo>,
    #[serde(default)]
    requested_predicates: Vec<PredicateInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    revocation_interval: Option<NonRevokedInterval>,
    state: StateType,
    #[serde(default)]
    proof_state: ProofState,
    version: String,
    nonce: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    channel: Option<ChannelId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    msg_uid: Option<MessageId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proof_request: Option<ProofRequestMessage>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proof: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    proof_digest: Option<String>,
    #[serde(default)]
    transitions: Vec<TransitionRecord>,
}

impl ProofExchange {
    /// Validate `data` and build an exchange in `Initialized`.
    pub fn create(data: ProofCreateData, version: &str) -> CredexResult<Self> {
        let source_id = data.source_id.ok_or_else(|| missing_option("source_id"))?;
        let attrs = data.attrs.ok_or_else(|| missing_option("attrs"))?;
        let name = data.name.ok_or_else(|| missing_option("name"))?;

        let requested_attrs: Vec<AttrInfo> = parse_descriptors("attrs", attrs)?;
        if requested_attrs.is_empty() {
            return Err(CredexError::new(
                ErrorKind::InvalidOption,
                "`attrs` must request at least one attribute",
            ));
        }
        if requested_attrs.iter().any(|a| a.name.trim().is_empty()) {
            return Err(CredexError::new(
                ErrorKind::InvalidAttributesStructure,
                "every requested attribute needs a name",
            ));
        }

        let requested_predicates: Vec<PredicateInfo> = match data.preds {
            Some(preds) => parse_descriptors("preds", preds)?,
            None => Vec::new(),
        };
        if let Some(p) = requested_predicates.iter().find(|p| !p.has_valid_type()) {
            return Err(CredexError::new(
                ErrorKind::InvalidAttributesStructure,
                format!("unsupported predicate type `{}` on `{}`", p.p_type, p.name),
            ));
        }

        let mut proof = Self {
            source_id,
            name,
            requested_attrs,
            requested_predicates,
            revocation_interval: data.revocation_interval,
            state: StateType::None,
            proof_state: ProofState::Undefined,
            version: version.to_string(),
            nonce: generate_nonce(),
            channel: None,
            msg_uid: None,
            proof_request: None,
            proof: None,
            proof_digest: None,
            transitions: Vec::new(),
        };
        proof.do_transition(StateType::Initialized);
        Ok(proof)
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> StateType {
        self.state
    }

    pub fn proof_state(&self) -> ProofState {
        self.proof_state
    }

    pub fn requested_attrs(&self) -> &[AttrInfo] {
        &self.requested_attrs
    }

    pub fn requested_predicates(&self) -> &[PredicateInfo] {
        &self.requested_predicates
    }

    /// The request message, once it has been sent.
    pub fn proof_request(&self) -> Option<&ProofRequestMessage> {
        self.proof_request.as_ref()
    }

    /// Hex SHA-256 of the canonical presentation, once received.
    pub fn proof_digest(&self) -> Option<&str> {
        self.proof_digest.as_deref()
    }

    pub fn transitions(&self) -> &[TransitionRecord] {
        &self.transitions
    }

    /// Build the request message stamped with the requester's identity.
    pub fn request_message(&self, config: &CredexConfig) -> ProofRequestMessage {
        let requested_attributes = self
            .requested_attrs
            .iter()
            .enumerate()
            .map(|(i, attr)| (ProofRequestMessage::attribute_referent(i), attr.clone()))
            .collect();
        let requested_predicates = self
            .requested_predicates
            .iter()
            .enumerate()
            .map(|(i, pred)| (ProofRequestMessage::predicate_referent(i), pred.clone()))
            .collect();
        ProofRequestMessage {
            nonce: self.nonce.clone(),
            name: self.name.clone(),
            version: self.version.clone(),
            requested_attributes,
            requested_predicates,
            non_revoked: self.revocation_interval.clone(),
            requester_did: config.institution_did.clone(),
            requester_name: config.institution_name.clone(),
        }
    }

    /// Send the proof request on `channel`. `Initialized → OfferSent`.
    pub fn send_request(
        &mut self,
        config: &CredexConfig,
        transport: &dyn Transport,
        channel: ChannelId,
    ) -> CredexResult<()> {
        self.require_state(StateType::Initialized, "send proof request")?;

        let request = self.request_message(config);
        let message = OutboundMessage::new(MessageKind::ProofRequest, &request)?;
        let msg_uid = transport.send(&channel, message).map_err(|e| {
            tracing::warn!(source_id = %self.source_id, %channel, error = %e, "proof request not sent");
            e
        })?;

        tracing::info!(
            source_id = %self.source_id,
            %channel,
            msg_uid = %msg_uid,
            "proof request sent"
        );
        self.channel = Some(channel);
        self.msg_uid = Some(msg_uid);
        self.proof_request = Some(request);
        self.do_transition(StateType::OfferSent);
        Ok(())
    }

    /// Poll once for the presentation. Returns the resulting state.
    pub fn poll(&mut self, transport: &dyn Transport) -> CredexResult<StateType> {
        if self.state != StateType::OfferSent {
            return Ok(self.state);
        }
        let (Some(channel), Some(msg_uid)) = (self.channel.as_ref(), self.msg_uid.as_ref()) else {
            return Err(CredexError::new(
                ErrorKind::UnknownError,
                "offered proof has no outstanding request",
            ));
        };
        let Some(reply) = transport.poll(channel, msg_uid)? else {
            tracing::debug!(source_id = %self.source_id, "no presentation yet");
            return Ok(self.state);
        };
        if reply.kind != MessageKind::Proof {
            tracing::warn!(
                source_id = %self.source_id,
                kind = ?reply.kind,
                "ignoring unexpected reply to proof request"
            );
            return Ok(self.state);
        }
        self.receive_presentation(reply.payload)?;
        Ok(self.state)
    }

    fn receive_presentation(&mut self, payload: Value) -> CredexResult<()> {
        let request = self.proof_request.as_ref().ok_or_else(|| {
            CredexError::new(ErrorKind::UnknownError, "presentation without a sent request")
        })?;
        let canonical = CanonicalBytes::new(&payload)
            .map_err(|e| CredexError::new(ErrorKind::InvalidProof, e.to_string()))?;
        let digest = sha256_digest(&canonical);
        let proof_state = verification::proof_state_for(request, &payload);

        tracing::info!(
            source_id = %self.source_id,
            %proof_state,
            digest = %digest,
            "presentation received"
        );
        self.proof_state = proof_state;
        self.proof = Some(payload);
        self.proof_digest = Some(digest.to_hex());
        self.do_transition(StateType::RequestReceived);
        Ok(())
    }

    /// The received presentation and its verification outcome.
    pub fn proof_result(&self) -> CredexResult<ProofResult> {
        match (&self.proof, self.state >= StateType::RequestReceived) {
            (Some(proof), true) => Ok(ProofResult {
                proof_state: self.proof_state,
                proof: proof.clone(),
            }),
            _ => Err(CredexError::new(
                ErrorKind::NotReady,
                format!("no presentation received (state {})", self.state),
            )),
        }
    }

    /// The sent request still waiting for its presentation.
    fn awaiting_reply(&self) -> Option<(ChannelId, MessageId)> {
        if self.state != StateType::OfferSent {
            return None;
        }
        Some((self.channel.clone()?, self.msg_uid.clone()?))
    }

    /// Reject snapshots whose fields contradict their state.
    fn check_consistent(&self) -> CredexResult<()> {
        let contradicts = |what: &str| {
            Err(CredexError::new(
                ErrorKind::InvalidJson,
                format!("snapshot in state {} {what}", self.state),
            ))
        };
        if self.state == StateType::None {
            return contradicts("was never initialized");
        }
        if self.requested_attrs.is_empty() {
            return contradicts("requests no attributes");
        }
        let sent = self.channel.is_some() || self.msg_uid.is_some() || self.proof_request.is_some();
        let fully_sent =
            self.channel.is_some() && self.msg_uid.is_some() && self.proof_request.is_some();
        let received = self.proof.is_some()
            || self.proof_digest.is_some()
            || self.proof_state != ProofState::Undefined;
        if self.state >= StateType::OfferSent {
            if !fully_sent {
                return contradicts("is missing the sent request");
            }
        } else if sent {
            return contradicts("carries a sent request");
        }
        if self.state >= StateType::RequestReceived {
            if self.proof.is_none() || self.proof_digest.is_none() {
                return contradicts("is missing the received proof");
            }
        } else if received {
            return contradicts("carries a received proof");
        }
        if let (Some(request), Some(proof), Some(recorded)) =
            (&self.proof_request, &self.proof, &self.proof_digest)
        {
            if sha256_digest(&CanonicalBytes::new(proof)?).to_hex() != *recorded {
                return contradicts("records a digest that does not match its proof");
            }
            if verification::proof_state_for(request, proof) != self.proof_state {
                return contradicts("records a verification outcome its proof does not support");
            }
        }
        Ok(())
    }

    /// Validate that the exchange is in the expected state.
    fn require_state(&self, expected: StateType, action: &str) -> CredexResult<()> {
        if self.state != expected {
            return Err(CredexError::new(
                ErrorKind::NotReady,
                format!("cannot {action} in state {} (requires {expected})", self.state),
            ));
        }
        Ok(())
    }

    /// Record a state transition.
    fn do_transition(&mut self, to: StateType) {
        self.transitions.push(TransitionRecord {
            from: self.state,
            to,
            timestamp: Timestamp::now(),
        });
        self.state = to;
    }
}

// ─── Handle operations ───────────────────────────────────────────────

/// Create a proof exchange and return its handle.
pub fn create(ctx: &Context, data: ProofCreateData) -> CredexResult<ProofHandle> {
    let proof = ProofExchange::create(data, &ctx.config().protocol_version)?;
    let source_id = proof.source_id().to_string();
    let handle = ctx.proofs().add(proof);
    tracing::info!(%handle, %source_id, "proof created");
    Ok(handle)
}

pub fn is_valid_handle(ctx: &Context, handle: ProofHandle) -> bool {
    ctx.proofs().has_handle(handle)
}

pub fn get_state(ctx: &Context, handle: ProofHandle) -> CredexResult<StateType> {
    ctx.proofs().get(handle, |p| Ok(p.state()))
}

pub fn get_proof_state(ctx: &Context, handle: ProofHandle) -> CredexResult<ProofState> {
    ctx.proofs().get(handle, |p| Ok(p.proof_state()))
}

pub fn get_source_id(ctx: &Context, handle: ProofHandle) -> CredexResult<String> {
    ctx.proofs().get(handle, |p| Ok(p.source_id().to_string()))
}

pub fn get_proof_request(
    ctx: &Context,
    handle: ProofHandle,
) -> CredexResult<Option<ProofRequestMessage>> {
    ctx.proofs().get(handle, |p| Ok(p.proof_request().cloned()))
}

/// Send the proof request of `handle` over `connection`.
///
/// A dead proof handle fails with `InvalidIssuerCredentialHandle`; a dead
/// or unconnected connection with `InvalidConnectionHandle`.
pub fn send_proof_request(
    ctx: &Context,
    handle: ProofHandle,
    connection: ConnectionHandle,
) -> CredexResult<()> {
    let as_requester = |e: CredexError| {
        if e.kind() == ErrorKind::InvalidProofHandle {
            e.with_kind(ErrorKind::InvalidIssuerCredentialHandle)
        } else {
            e
        }
    };
    if !ctx.proofs().has_handle(handle) {
        return Err(CredexError::new(
            ErrorKind::InvalidIssuerCredentialHandle,
            format!("{handle} is not a live proof"),
        ));
    }
    let channel = connection::channel_for(ctx, connection)?;
    ctx.proofs()
        .get_mut(handle, |p| p.send_request(ctx.config(), ctx.transport(), channel))
        .map_err(as_requester)
}

/// Poll once for the presentation and return the resulting state.
pub fn update_state(ctx: &Context, handle: ProofHandle) -> CredexResult<StateType> {
    ctx.proofs().get_mut(handle, |p| p.poll(ctx.transport()))
}

/// The received presentation and its verification outcome.
pub fn get_proof(
    ctx: &Context,
    handle: ProofHandle,
    connection: ConnectionHandle,
) -> CredexResult<ProofResult> {
    if !ctx.proofs().has_handle(handle) {
        return ctx.proofs().get(handle, |p| p.proof_result());
    }
    if !connection::is_valid_handle(ctx, connection) {
        return Err(CredexError::new(
            ErrorKind::InvalidConnectionHandle,
            format!("{connection} is not a live connection"),
        ));
    }
    ctx.proofs().get(handle, |p| p.proof_result())
}

/// Canonical JSON snapshot of the exchange.
pub fn to_string(ctx: &Context, handle: ProofHandle) -> CredexResult<String> {
    ctx.proofs()
        .get(handle, |p| Ok(CanonicalBytes::new(p)?.into_string()))
}

/// Rebuild an exchange from a snapshot under a new handle.
pub fn from_string(ctx: &Context, data: &str) -> CredexResult<ProofHandle> {
    restore(ctx, data).map(|(handle, _)| handle)
}

/// Like [`from_string`], also returning the restored source id.
pub fn restore(ctx: &Context, data: &str) -> CredexResult<(ProofHandle, String)> {
    let proof: ProofExchange = serde_json::from_str(data)?;
    proof.check_consistent()?;
    CanonicalBytes::new(&proof)?;
    let source_id = proof.source_id().to_string();
    let handle = ctx.proofs().add(proof);
    tracing::info!(%handle, %source_id, "proof restored from snapshot");
    Ok((handle, source_id))
}

pub fn release(ctx: &Context, handle: ProofHandle) -> CredexResult<()> {
    let awaiting = ctx.proofs().get(handle, |p| Ok(p.awaiting_reply()))?;
    ctx.proofs().release(handle)?;
    if let Some((channel, msg_uid)) = awaiting {
        ctx.transport().discard(&channel, &msg_uid);
    }
    tracing::info!(%handle, "proof released");
    Ok(())
}

/// Release every live proof. Returns how many were released.
pub fn release_all(ctx: &Context) -> usize {
    ctx.proofs()
        .handles()
        .into_iter()
        .filter(|h| release(ctx, *h).is_ok())
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use credex_core::HandleId;
    use credex_transport::{MockMessage, MockTransport};
    use proptest::prelude::*;
    use serde_json::json;

    fn setup() -> (Context, Arc<MockTransport>) {
        let transport = Arc::new(MockTransport::new());
        let ctx = Context::new(
            CredexConfig::new("Acme", "did:acme", "http://agency.local"),
            transport.clone(),
        )
        .unwrap();
        (ctx, transport)
    }

    fn data() -> ProofCreateData {
        ProofCreateData {
            source_id: Some("kyc-1".into()),
            attrs: Some(json!([
                { "name": "name" },
                { "name": "email", "restrictions": [{ "issuer_did": "did:issuer" }] }
            ])),
            name: Some("Proof".into()),
            preds: Some(json!([{ "attr_name": "age", "p_type": ">=", "p_value": 18 }])),
            revocation_interval: None,
        }
    }

    fn connected(ctx: &Context) -> ConnectionHandle {
        let c = connection::create(ctx, "peer").unwrap();
        connection::connect(ctx, c, None).unwrap();
        c
    }

    #[test]
    fn create_starts_initialized() {
        let (ctx, transport) = setup();
        let h = create(&ctx, data()).unwrap();
        assert_eq!(get_state(&ctx, h).unwrap(), StateType::Initialized);
        assert_eq!(get_proof_state(&ctx, h).unwrap(), ProofState::Undefined);
        assert_eq!(get_source_id(&ctx, h).unwrap(), "kyc-1");
        assert!(get_proof_request(&ctx, h).unwrap().is_none());
        assert!(transport.sent_messages().is_empty());
    }

    #[test]
    fn create_requires_each_field() {
        let (ctx, _) = setup();
        for strip in 0..3 {
            let mut d = data();
            match strip {
                0 => d.source_id = None,
                1 => d.attrs = None,
                _ => d.name = None,
            }
            assert_eq!(create(&ctx, d).unwrap_err().kind(), ErrorKind::InvalidOption);
        }
    }

    #[test]
    fn create_rejects_unstructured_attrs() {
        let (ctx, _) = setup();
        let mut d = data();
        d.attrs = Some(json!("foo"));
        assert_eq!(create(&ctx, d).unwrap_err().kind(), ErrorKind::InvalidJson);

        let mut d = data();
        d.attrs = Some(json!({ "name": "x" }));
        assert_eq!(create(&ctx, d).unwrap_err().kind(), ErrorKind::InvalidJson);
    }

    #[test]
    fn create_accepts_attrs_as_json_text() {
        let (ctx, _) = setup();
        let mut d = data();
        d.attrs = Some(json!(r#"[{"name":"phone"}]"#));
        let h = create(&ctx, d).unwrap();
        ctx.proofs()
            .get(h, |p| {
                assert_eq!(p.requested_attrs()[0].name, "phone");
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn create_rejects_empty_attrs_and_bad_predicates() {
        let (ctx, _) = setup();
        let mut d = data();
        d.attrs = Some(json!([]));
        assert_eq!(create(&ctx, d).unwrap_err().kind(), ErrorKind::InvalidOption);

        let mut d = data();
        d.preds = Some(json!([{ "attr_name": "age", "p_type": "GE", "p_value": 18 }]));
        assert_eq!(
            create(&ctx, d).unwrap_err().kind(),
            ErrorKind::InvalidAttributesStructure
        );

        let mut d = data();
        d.preds = Some(json!(7));
        assert_eq!(create(&ctx, d).unwrap_err().kind(), ErrorKind::InvalidJson);
    }

    #[test]
    fn request_message_uses_referents_and_identity() {
        let (ctx, _) = setup();
        let h = create(
            &ctx,
            ProofCreateData {
                revocation_interval: Some(NonRevokedInterval {
                    from: None,
                    to: Some(1_700_000_000),
                }),
                ..data()
            },
        )
        .unwrap();
        let req = ctx
            .proofs()
            .get(h, |p| Ok(p.request_message(ctx.config())))
            .unwrap();
        assert_eq!(req.requested_attributes["attribute_0"].name, "name");
        assert_eq!(req.requested_attributes["attribute_1"].name, "email");
        assert_eq!(req.requested_predicates["predicate_0"].name, "age");
        assert_eq!(req.requester_did, "did:acme");
        assert!(req.nonce.parse::<u64>().is_ok());
        assert_eq!(req.non_revoked.and_then(|i| i.to), Some(1_700_000_000));
    }

    #[test]
    fn full_cycle_verifies() {
        let (ctx, transport) = setup();
        let conn = connected(&ctx);
        let h = create(&ctx, data()).unwrap();

        send_proof_request(&ctx, h, conn).unwrap();
        assert_eq!(get_state(&ctx, h).unwrap(), StateType::OfferSent);
        assert!(get_proof_request(&ctx, h).unwrap().is_some());

        assert_eq!(update_state(&ctx, h).unwrap(), StateType::OfferSent);
        transport.set_next(MockMessage::VerifiedProof);
        assert_eq!(update_state(&ctx, h).unwrap(), StateType::RequestReceived);

        let result = get_proof(&ctx, h, conn).unwrap();
        assert_eq!(result.proof_state, ProofState::Verified);
        assert_eq!(get_proof_state(&ctx, h).unwrap(), ProofState::Verified);

        ctx.proofs()
            .get(h, |p| {
                assert_eq!(p.proof_digest().map(str::len), Some(64));
                let path: Vec<_> = p.transitions().iter().map(|t| t.to).collect();
                assert_eq!(
                    path,
                    [
                        StateType::Initialized,
                        StateType::OfferSent,
                        StateType::RequestReceived
                    ]
                );
                Ok(())
            })
            .unwrap();
    }

    #[test]
    fn tampered_presentation_is_invalid() {
        let (ctx, transport) = setup();
        let conn = connected(&ctx);
        let h = create(&ctx, data()).unwrap();
        send_proof_request(&ctx, h, conn).unwrap();
        transport.set_next(MockMessage::InvalidProof);
        update_state(&ctx, h).unwrap();
        assert_eq!(
            get_proof(&ctx, h, conn).unwrap().proof_state,
            ProofState::Invalid
        );
    }

    #[test]
    fn unrelated_reply_is_ignored() {
        let (ctx, transport) = setup();
        let conn = connected(&ctx);
        let h = create(&ctx, data()).unwrap();
        send_proof_request(&ctx, h, conn).unwrap();
        transport.set_next(MockMessage::Raw {
            kind: MessageKind::ConnectionAnswer,
            payload: json!({}),
        });
        assert_eq!(update_state(&ctx, h).unwrap(), StateType::OfferSent);
    }

    #[test]
    fn float_presentation_is_invalid_proof() {
        let (ctx, transport) = setup();
        let conn = connected(&ctx);
        let h = create(&ctx, data()).unwrap();
        send_proof_request(&ctx, h, conn).unwrap();
        transport.set_next(MockMessage::Raw {
            kind: MessageKind::Proof,
            payload: json!({ "score": 0.5 }),
        });
        assert_eq!(update_state(&ctx, h).unwrap_err().kind(), ErrorKind::InvalidProof);
        assert_eq!(get_state(&ctx, h).unwrap(), StateType::OfferSent);
    }

    #[test]
    fn get_proof_before_reply_is_not_ready() {
        let (ctx, _) = setup();
        let conn = connected(&ctx);
        let h = create(&ctx, data()).unwrap();
        send_proof_request(&ctx, h, conn).unwrap();
        assert_eq!(get_proof(&ctx, h, conn).unwrap_err().kind(), ErrorKind::NotReady);
    }

    #[test]
    fn send_error_kinds() {
        let (ctx, transport) = setup();
        let conn = connected(&ctx);
        let h = create(&ctx, data()).unwrap();

        assert_eq!(
            send_proof_request(&ctx, ProofHandle::from_raw(4242), conn)
                .unwrap_err()
                .kind(),
            ErrorKind::InvalidIssuerCredentialHandle
        );
        let unconnected = connection::create(&ctx, "idle").unwrap();
        assert_eq!(
            send_proof_request(&ctx, h, unconnected).unwrap_err().kind(),
            ErrorKind::InvalidConnectionHandle
        );

        transport.fail_sends(true);
        assert_eq!(
            send_proof_request(&ctx, h, conn).unwrap_err().kind(),
            ErrorKind::PostMessageFailure
        );
        assert_eq!(get_state(&ctx, h).unwrap(), StateType::Initialized);

        transport.fail_sends(false);
        send_proof_request(&ctx, h, conn).unwrap();
        assert_eq!(
            send_proof_request(&ctx, h, conn).unwrap_err().kind(),
            ErrorKind::NotReady
        );
    }

    #[test]
    fn snapshot_keeps_received_proof() {
        let (ctx, transport) = setup();
        let conn = connected(&ctx);
        let h = create(&ctx, data()).unwrap();
        send_proof_request(&ctx, h, conn).unwrap();
        transport.set_next(MockMessage::VerifiedProof);
        update_state(&ctx, h).unwrap();

        let snapshot = to_string(&ctx, h).unwrap();
        let (restored, source_id) = restore(&ctx, &snapshot).unwrap();
        assert_eq!(source_id, "kyc-1");
        assert_eq!(to_string(&ctx, restored).unwrap(), snapshot);
        assert_eq!(
            get_proof(&ctx, restored, conn).unwrap(),
            get_proof(&ctx, h, conn).unwrap()
        );
    }

    #[test]
    fn incomplete_snapshots_are_invalid_json() {
        let (ctx, _) = setup();
        for data in [
            r#"{"source_id":"Invalid"}"#,
            "not json",
            r#"{"source_id":"x","name":"n","requested_attrs":[],"state":"Initialized","version":"1.0","nonce":"1"}"#,
            r#"{"source_id":"x","name":"n","requested_attrs":[{"name":"a"}],"state":"OfferSent","version":"1.0","nonce":"1"}"#,
        ] {
            assert_eq!(
                from_string(&ctx, data).unwrap_err().kind(),
                ErrorKind::InvalidJson,
                "{data}"
            );
        }
    }

    fn received_snapshot(ctx: &Context, transport: &MockTransport) -> Value {
        let conn = connected(ctx);
        let h = create(ctx, data()).unwrap();
        send_proof_request(ctx, h, conn).unwrap();
        transport.set_next(MockMessage::VerifiedProof);
        update_state(ctx, h).unwrap();
        serde_json::from_str(&to_string(ctx, h).unwrap()).unwrap()
    }

    #[test]
    fn snapshots_contradicting_their_state_are_invalid_json() {
        let (ctx, transport) = setup();
        let h = create(&ctx, data()).unwrap();
        let initialized: Value = serde_json::from_str(&to_string(&ctx, h).unwrap()).unwrap();

        let mut forged_outcome = initialized.clone();
        forged_outcome["proof_state"] = json!("Verified");
        forged_outcome["proof"] = json!({ "forged": true });

        let mut early_channel = initialized;
        early_channel["channel"] = json!("ch-1");

        let received = received_snapshot(&ctx, &transport);

        let mut float_in_proof = received.clone();
        float_in_proof["proof"]["score"] = json!(0.5);

        let mut tampered_proof = received.clone();
        tampered_proof["proof"]["extra"] = json!("x");

        let mut flipped_outcome = received.clone();
        flipped_outcome["proof_state"] = json!("Invalid");

        let mut no_digest = received;
        no_digest.as_object_mut().unwrap().remove("proof_digest");

        for snapshot in [
            forged_outcome,
            early_channel,
            float_in_proof,
            tampered_proof,
            flipped_outcome,
            no_digest,
        ] {
            let text = snapshot.to_string();
            assert_eq!(
                from_string(&ctx, &text).unwrap_err().kind(),
                ErrorKind::InvalidJson,
                "{text}"
            );
        }
        assert_eq!(ctx.proofs().len(), 2);
    }

    #[test]
    fn released_handle_rejects_everything() {
        let (ctx, _) = setup();
        let conn = connected(&ctx);
        let h = create(&ctx, data()).unwrap();
        release(&ctx, h).unwrap();

        assert!(!is_valid_handle(&ctx, h));
        assert_eq!(to_string(&ctx, h).unwrap_err().kind(), ErrorKind::InvalidProofHandle);
        assert_eq!(update_state(&ctx, h).unwrap_err().kind(), ErrorKind::InvalidProofHandle);
        assert_eq!(get_proof(&ctx, h, conn).unwrap_err().kind(), ErrorKind::InvalidProofHandle);
        assert_eq!(release(&ctx, h).unwrap_err().kind(), ErrorKind::InvalidProofHandle);
    }

    proptest! {
        #[test]
        fn snapshot_round_trip_is_byte_identical(
            source_id in "[ -~]{0,24}",
            name in "[a-zA-Z0-9 ]{1,16}",
            attrs in prop::collection::vec("[a-z_]{1,12}", 1..5),
        ) {
            let (ctx, _) = setup();
            let attrs: Vec<Value> = attrs.iter().map(|a| json!({ "name": a })).collect();
            let h = create(&ctx, ProofCreateData {
                source_id: Some(source_id),
                attrs: Some(Value::Array(attrs)),
                name: Some(name),
                ..ProofCreateData::default()
            }).unwrap();

            let first = to_string(&ctx, h).unwrap();
            let restored = from_string(&ctx, &first).unwrap();
            prop_assert_eq!(to_string(&ctx, restored).unwrap(), first);
        }
    }
}
