//! Shared fixtures for the binding integration tests.

#![allow(dead_code)]

use std::sync::Arc;

use credex_binding::{Connection, Context, CredexConfig, Proof, ProofCreateData};
use credex_transport::MockTransport;
use serde_json::json;

pub fn config() -> CredexConfig {
    CredexConfig::new("Acme Verifier", "did:acme:verifier", "http://agency.local")
}

/// A context over a fresh mock transport.
pub fn mock_context() -> (Context, Arc<MockTransport>) {
    let transport = Arc::new(MockTransport::new());
    let ctx = Context::new(config(), transport.clone()).expect("valid config");
    (ctx, transport)
}

pub fn proof_data() -> ProofCreateData {
    ProofCreateData {
        source_id: Some("Proof ID".into()),
        attrs: Some(json!([
            { "name": "attr1", "restrictions": [{ "issuer_did": "did:issuer" }] },
            { "name": "attr2" }
        ])),
        name: Some("Proof".into()),
        ..ProofCreateData::default()
    }
}

pub async fn create_proof(ctx: &Context) -> Proof {
    Proof::create(ctx, proof_data()).await.expect("proof created")
}

pub async fn connected(ctx: &Context) -> Connection {
    let connection = Connection::create(ctx, "connection_source_id")
        .await
        .expect("connection created");
    connection.connect(None).await.expect("connected");
    connection
}
