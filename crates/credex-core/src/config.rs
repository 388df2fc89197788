//! # Agent Configuration
//!
//! The identity an agent presents to counterparties and where its messages
//! are routed. Accepted as JSON (the form bindings pass at initialization)
//! or YAML (the form deployments keep on disk).
//!
//! ```yaml
//! institution_name: Acme Verifier
//! institution_did: V4SGRU86Z58d6TV7PBUe6f
//! agency_endpoint: https://agency.example.com
//! protocol_version: "1.0"
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{CredexError, CredexResult, ErrorKind};

fn default_protocol_version() -> String {
    "1.0".to_string()
}

/// Configuration of a credential-exchange agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredexConfig {
    /// Display name stamped into outgoing invitations and proof requests.
    pub institution_name: String,
    /// DID the institution is known by.
    pub institution_did: String,
    /// Logo shown to counterparties.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub institution_logo_url: Option<String>,
    /// Endpoint of the agency that relays messages.
    pub agency_endpoint: String,
    /// Message protocol version.
    #[serde(default = "default_protocol_version")]
    pub protocol_version: String,
    /// Ledger pool name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pool_name: Option<String>,
}

impl CredexConfig {
    /// Build a configuration with the default protocol version.
    pub fn new(
        institution_name: impl Into<String>,
        institution_did: impl Into<String>,
        agency_endpoint: impl Into<String>,
    ) -> Self {
        Self {
            institution_name: institution_name.into(),
            institution_did: institution_did.into(),
            institution_logo_url: None,
            agency_endpoint: agency_endpoint.into(),
            protocol_version: default_protocol_version(),
            pool_name: None,
        }
    }

    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> CredexResult<Self> {
        let config: Self = serde_json::from_str(json).map_err(|e| {
            CredexError::new(ErrorKind::InvalidConfiguration, format!("config json: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a YAML configuration.
    pub fn from_yaml_str(yaml: &str) -> CredexResult<Self> {
        let config: Self = serde_yaml::from_str(yaml).map_err(|e| {
            CredexError::new(ErrorKind::InvalidConfiguration, format!("config yaml: {e}"))
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> CredexResult<Self> {
        let path = path.as_ref();
        let yaml = std::fs::read_to_string(path).map_err(|e| {
            CredexError::new(
                ErrorKind::InvalidConfiguration,
                format!("cannot read {}: {e}", path.display()),
            )
        })?;
        Self::from_yaml_str(&yaml)
    }

    /// Reject configurations with empty required fields.
    pub fn validate(&self) -> CredexResult<()> {
        let required = [
            ("institution_name", &self.institution_name),
            ("institution_did", &self.institution_did),
            ("agency_endpoint", &self.agency_endpoint),
            ("protocol_version", &self.protocol_version),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CredexError::new(
                    ErrorKind::InvalidConfiguration,
                    format!("{field} must not be empty"),
                ));
            }
        }
        Ok(())
    }
}
