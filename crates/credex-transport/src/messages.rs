//! # Wire Messages
//!
//! Identifiers, envelopes, and the two payloads of a proof exchange: the
//! verifier's proof request and the prover's presentation.
//!
//! Maps are `BTreeMap` so payloads serialize in a stable order.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

use credex_core::{encode_attribute_value, CredexResult};

/// One pairwise channel, named by the local side's pairwise DID.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ChannelId(String);

impl ChannelId {
    /// Wrap an existing channel name.
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Generate a fresh random channel name.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().simple().to_string())
    }

    /// The channel name.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ChannelId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Identifier of a message queued on a transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(String);

impl MessageId {
    /// Wrap an existing message id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a fresh random message id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// The message id.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for MessageId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// Message types carried by the transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageKind {
    /// Connection invitation.
    ConnectionRequest,
    /// Counterparty's acceptance of an invitation.
    ConnectionAnswer,
    /// Verifier's proof request.
    ProofRequest,
    /// Prover's presentation.
    Proof,
}

/// A message handed to a transport for delivery.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutboundMessage {
    /// Message type.
    pub kind: MessageKind,
    /// Message body.
    pub payload: Value,
}

impl OutboundMessage {
    /// Wrap a serializable payload.
    pub fn new(kind: MessageKind, payload: &impl Serialize) -> CredexResult<Self> {
        Ok(Self {
            kind,
            payload: serde_json::to_value(payload)?,
        })
    }
}

/// A sent message together with the id the transport assigned it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Transport-assigned id.
    pub id: MessageId,
    /// The message.
    pub message: OutboundMessage,
}

/// A reply received from a counterparty.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Id of this reply.
    pub id: MessageId,
    /// Id of the message it answers.
    pub reply_to: MessageId,
    /// Message type.
    pub kind: MessageKind,
    /// Message body.
    pub payload: Value,
}

// ─── Proof request ───────────────────────────────────────────────────

/// Restriction on which credentials may satisfy an attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Filter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_issuer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema_version: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issuer_did: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_def_id: Option<String>,
}

/// A requested attribute.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AttrInfo {
    /// Attribute name.
    pub name: String,
    /// Credentials allowed to supply it; any credential if absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<Filter>>,
}

/// A requested predicate, e.g. `age >= 18`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PredicateInfo {
    /// Attribute the predicate is evaluated over.
    #[serde(alias = "attr_name")]
    pub name: String,
    /// Comparison: one of `>=`, `>`, `<=`, `<`.
    pub p_type: String,
    /// Comparison operand.
    pub p_value: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restrictions: Option<Vec<Filter>>,
}

impl PredicateInfo {
    /// Accepted values of `p_type`.
    pub const PREDICATE_TYPES: [&'static str; 4] = [">=", ">", "<=", "<"];

    /// Whether `p_type` is a supported comparison.
    pub fn has_valid_type(&self) -> bool {
        Self::PREDICATE_TYPES.contains(&self.p_type.as_str())
    }
}

/// Interval for which credentials must not have been revoked.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonRevokedInterval {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<u64>,
}

/// The verifier's proof request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProofRequestMessage {
    /// Random decimal nonce binding the presentation to this request.
    pub nonce: String,
    /// Human-readable request name.
    pub name: String,
    /// Protocol version.
    pub version: String,
    /// Requested attributes keyed by referent (`attribute_<i>`).
    pub requested_attributes: BTreeMap<String, AttrInfo>,
    /// Requested predicates keyed by referent (`predicate_<i>`).
    pub requested_predicates: BTreeMap<String, PredicateInfo>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub non_revoked: Option<NonRevokedInterval>,
    /// DID of the requesting institution.
    pub requester_did: String,
    /// Name of the requesting institution.
    pub requester_name: String,
}

impl ProofRequestMessage {
    /// Referent of the `index`-th requested attribute.
    pub fn attribute_referent(index: usize) -> String {
        format!("attribute_{index}")
    }

    /// Referent of the `index`-th requested predicate.
    pub fn predicate_referent(index: usize) -> String {
        format!("predicate_{index}")
    }
}

// ─── Presentation ────────────────────────────────────────────────────

/// A revealed attribute value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevealedAttr {
    pub sub_proof_index: u32,
    pub raw: String,
    pub encoded: String,
}

/// Reference to the sub-proof covering an unrevealed attribute or a
/// predicate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubProofReferent {
    pub sub_proof_index: u32,
}

/// How each requested referent was answered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestedProof {
    #[serde(default)]
    pub revealed_attrs: BTreeMap<String, RevealedAttr>,
    #[serde(default)]
    pub self_attested_attrs: BTreeMap<String, String>,
    #[serde(default)]
    pub unrevealed_attrs: BTreeMap<String, SubProofReferent>,
    #[serde(default)]
    pub predicates: BTreeMap<String, SubProofReferent>,
}

/// The prover's presentation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Presentation {
    pub requested_proof: RequestedProof,
    /// Opaque cryptographic proof material.
    pub proof: Value,
    #[serde(default)]
    pub identifiers: Vec<Value>,
}

impl Presentation {
    /// Build a presentation that reveals every requested attribute with the
    /// value `value_of(name)` and covers every requested predicate.
    ///
    /// This is what an honest prover sends; test counterparties use it.
    pub fn answering(request: &ProofRequestMessage, value_of: impl Fn(&str) -> String) -> Self {
        let revealed_attrs = request
            .requested_attributes
            .iter()
            .map(|(referent, attr)| {
                let raw = value_of(&attr.name);
                let encoded = encode_attribute_value(&raw);
                (
                    referent.clone(),
                    RevealedAttr {
                        sub_proof_index: 0,
                        raw,
                        encoded,
                    },
                )
            })
            .collect();
        let predicates = request
            .requested_predicates
            .keys()
            .map(|referent| (referent.clone(), SubProofReferent { sub_proof_index: 0 }))
            .collect();
        Self {
            requested_proof: RequestedProof {
                revealed_attrs,
                predicates,
                ..RequestedProof::default()
            },
            proof: serde_json::json!({
                "aggregated_proof": { "c_hash": request.nonce },
                "proofs": [],
            }),
            identifiers: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request() -> ProofRequestMessage {
        let mut requested_attributes = BTreeMap::new();
        requested_attributes.insert(
            ProofRequestMessage::attribute_referent(0),
            AttrInfo {
                name: "name".into(),
                restrictions: None,
            },
        );
        let mut requested_predicates = BTreeMap::new();
        requested_predicates.insert(
            ProofRequestMessage::predicate_referent(0),
            PredicateInfo {
                name: "age".into(),
                p_type: ">=".into(),
                p_value: 18,
                restrictions: None,
            },
        );
        ProofRequestMessage {
            nonce: "123".into(),
            name: "kyc".into(),
            version: "1.0".into(),
            requested_attributes,
            requested_predicates,
            non_revoked: None,
            requester_did: "did1".into(),
            requester_name: "Acme".into(),
        }
    }

    #[test]
    fn predicate_accepts_attr_name_alias() {
        let p: PredicateInfo =
            serde_json::from_str(r#"{"attr_name":"age","p_type":">=","p_value":18}"#).unwrap();
        assert_eq!(p.name, "age");
        assert!(p.has_valid_type());
    }

    #[test]
    fn predicate_type_is_checked() {
        let p: PredicateInfo =
            serde_json::from_str(r#"{"name":"age","p_type":"GE","p_value":18}"#).unwrap();
        assert!(!p.has_valid_type());
    }

    #[test]
    fn empty_filter_fields_are_omitted() {
        let f = Filter {
            issuer_did: Some("did9".into()),
            ..Filter::default()
        };
        assert_eq!(serde_json::to_string(&f).unwrap(), r#"{"issuer_did":"did9"}"#);
    }

    #[test]
    fn answering_reveals_every_attribute_with_correct_encoding() {
        let req = request();
        let p = Presentation::answering(&req, |name| format!("value-of-{name}"));
        let revealed = &p.requested_proof.revealed_attrs["attribute_0"];
        assert_eq!(revealed.raw, "value-of-name");
        assert_eq!(revealed.encoded, encode_attribute_value("value-of-name"));
        assert!(p.requested_proof.predicates.contains_key("predicate_0"));
        assert_eq!(p.proof["aggregated_proof"]["c_hash"], "123");
    }

    #[test]
    fn presentation_maps_default_when_absent() {
        let p: Presentation = serde_json::from_str(
            r#"{"requested_proof":{"revealed_attrs":{}},"proof":{}}"#,
        )
        .unwrap();
        assert!(p.requested_proof.predicates.is_empty());
        assert!(p.identifiers.is_empty());
    }
}
