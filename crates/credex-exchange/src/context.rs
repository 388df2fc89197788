//! # Agent Context
//!
//! Shared state for every exchange object of one agent: configuration, the
//! injected transport, and the handle registries.
//!
//! Cheaply cloneable via `Arc`; all clones share the same registries.

use std::sync::Arc;

use credex_core::{
    ConnectionHandle, CredexConfig, CredexResult, ErrorKind, HandleRegistry, ProofHandle,
};
use credex_transport::Transport;

use crate::connection::Connection;
use crate::proof::ProofExchange;

struct Inner {
    config: CredexConfig,
    transport: Arc<dyn Transport>,
    proofs: HandleRegistry<ProofHandle, ProofExchange>,
    connections: HandleRegistry<ConnectionHandle, Connection>,
}

/// Configuration, transport and registries of one agent.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

impl Context {
    /// Build a context over `transport`. Fails if `config` is invalid.
    pub fn new(config: CredexConfig, transport: Arc<dyn Transport>) -> CredexResult<Self> {
        config.validate()?;
        tracing::info!(
            institution = %config.institution_name,
            protocol_version = %config.protocol_version,
            "agent context initialized"
        );
        Ok(Self {
            inner: Arc::new(Inner {
                config,
                transport,
                proofs: HandleRegistry::new("proof", ErrorKind::InvalidProofHandle),
                connections: HandleRegistry::new(
                    "connection",
                    ErrorKind::InvalidConnectionHandle,
                ),
            }),
        })
    }

    pub fn config(&self) -> &CredexConfig {
        &self.inner.config
    }

    pub fn transport(&self) -> &dyn Transport {
        self.inner.transport.as_ref()
    }

    pub fn proofs(&self) -> &HandleRegistry<ProofHandle, ProofExchange> {
        &self.inner.proofs
    }

    pub fn connections(&self) -> &HandleRegistry<ConnectionHandle, Connection> {
        &self.inner.connections
    }

    /// Release every live object. Returns how many handles were released.
    pub fn shutdown(&self) -> usize {
        let released = crate::proof::release_all(self) + self.inner.connections.release_all();
        tracing::info!(released, "agent context shut down");
        released
    }
}

impl std::fmt::Debug for Context {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("config", &self.inner.config)
            .field("transport", &self.inner.transport)
            .field("proofs", &self.inner.proofs)
            .field("connections", &self.inner.connections)
            .finish()
    }
}
