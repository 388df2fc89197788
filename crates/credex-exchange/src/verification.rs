//! # Presentation Verification
//!
//! Checks a received presentation against the proof request it answers.
//!
//! A presentation is accepted when:
//!
//! - it parses, and its `proof` is a non-empty object;
//! - its aggregated proof is bound to the request's nonce;
//! - every requested attribute is revealed, unrevealed, or (when the
//!   attribute carries no restrictions) self-attested;
//! - every revealed attribute's `encoded` value is the encoding of its `raw`
//!   value;
//! - every requested predicate is covered by a sub-proof.
//!
//! Cryptographic validity of the proof material is the ledger's concern
//! and is not checked here.

use serde_json::Value;
use thiserror::Error;

use credex_core::{encode_attribute_value, ProofState};
use credex_transport::{Presentation, ProofRequestMessage};

/// Reason a presentation was rejected.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum VerificationFailure {
    #[error("presentation is malformed: {0}")]
    Malformed(String),

    #[error("presentation carries no proof material")]
    EmptyProof,

    #[error("presentation is not bound to the request nonce")]
    NonceMismatch,

    #[error("requested attribute {referent} is not answered")]
    MissingAttribute { referent: String },

    #[error("attribute {referent} is restricted and cannot be self-attested")]
    RestrictedSelfAttested { referent: String },

    #[error("attribute {referent} has an encoded value that does not match its raw value")]
    EncodingMismatch { referent: String },

    #[error("requested predicate {referent} is not covered")]
    MissingPredicate { referent: String },
}

/// Verify `payload` against `request`.
pub fn verify_presentation(
    request: &ProofRequestMessage,
    payload: &Value,
) -> Result<(), VerificationFailure> {
    let presentation: Presentation = serde_json::from_value(payload.clone())
        .map_err(|e| VerificationFailure::Malformed(e.to_string()))?;

    match presentation.proof.as_object() {
        Some(map) if !map.is_empty() => {}
        _ => return Err(VerificationFailure::EmptyProof),
    }
    let bound_nonce = presentation.proof["aggregated_proof"]["c_hash"].as_str();
    if bound_nonce != Some(request.nonce.as_str()) {
        return Err(VerificationFailure::NonceMismatch);
    }

    let answered = &presentation.requested_proof;
    for (referent, attr) in &request.requested_attributes {
        if let Some(revealed) = answered.revealed_attrs.get(referent) {
            if revealed.encoded != encode_attribute_value(&revealed.raw) {
                return Err(VerificationFailure::EncodingMismatch {
                    referent: referent.clone(),
                });
            }
        } else if answered.self_attested_attrs.contains_key(referent) {
            if attr.restrictions.as_ref().is_some_and(|r| !r.is_empty()) {
                return Err(VerificationFailure::RestrictedSelfAttested {
                    referent: referent.clone(),
                });
            }
        } else if !answered.unrevealed_attrs.contains_key(referent) {
            return Err(VerificationFailure::MissingAttribute {
                referent: referent.clone(),
            });
        }
    }

    if let Some(referent) = request
        .requested_predicates
        .keys()
        .find(|referent| !answered.predicates.contains_key(*referent))
    {
        return Err(VerificationFailure::MissingPredicate {
            referent: referent.clone(),
        });
    }

    Ok(())
}

/// The [`ProofState`] a presentation earns.
pub fn proof_state_for(request: &ProofRequestMessage, payload: &Value) -> ProofState {
    match verify_presentation(request, payload) {
        Ok(()) => ProofState::Verified,
        Err(failure) => {
            tracing::warn!(nonce = %request.nonce, %failure, "presentation rejected");
            ProofState::Invalid
        }
    }
}
