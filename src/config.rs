//! Relying Party configuration
//!
//! The RP identity every ceremony is verified against. The origin is
//! normalized to its ASCII serialization (scheme://host[:port], no trailing
//! slash) so string comparison against the client data origin is exact.

use url::{Origin, Url};

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid origin URL: {0}")]
    InvalidOrigin(String),

    #[error("relying party id must not be empty")]
    EmptyRpId,

    /// The RP id must equal the origin host or be a parent domain of it.
    #[error("relying party id {rp_id:?} does not match origin host {origin_host:?}")]
    RpIdMismatch { rp_id: String, origin_host: String },
}

/// Validated Relying Party identity
#[derive(Debug, Clone)]
pub struct RelyingParty {
    id: String,
    name: String,
    origin: String,
}

impl RelyingParty {
    /// Create a validated configuration
    ///
    /// # Arguments
    ///
    /// * `id` - Relying Party ID (typically the domain name)
    /// * `name` - Human-readable name for the Relying Party
    /// * `origin` - Expected web origin of ceremony responses
    pub fn new(id: &str, name: &str, origin: &str) -> Result<Self, ConfigError> {
        if id.is_empty() {
            return Err(ConfigError::EmptyRpId);
        }

        let url =
            Url::parse(origin).map_err(|e| ConfigError::InvalidOrigin(format!("{origin}: {e}")))?;
        let parsed = url.origin();
        let origin = match parsed {
            Origin::Tuple(..) => parsed.ascii_serialization(),
            Origin::Opaque(_) => {
                return Err(ConfigError::InvalidOrigin(format!(
                    "{origin}: not a web origin"
                )))
            }
        };

        // RP id must sit on a label boundary of the origin host
        let host = url.host_str().unwrap_or_default().to_string();
        if host != id && !host.ends_with(&format!(".{id}")) {
            return Err(ConfigError::RpIdMismatch {
                rp_id: id.to_string(),
                origin_host: host,
            });
        }

        Ok(Self {
            id: id.to_string(),
            name: name.to_string(),
            origin,
        })
    }

    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `WEBAUTHN_RP_ID` - Relying Party ID (default: "localhost")
    /// - `WEBAUTHN_RP_NAME` - RP display name (default: "Passkey Flow")
    /// - `WEBAUTHN_RP_ORIGIN` - Expected origin (default: "http://localhost:8000")
    pub fn from_env() -> Result<Self, ConfigError> {
        let id = std::env::var("WEBAUTHN_RP_ID").unwrap_or_else(|_| "localhost".to_string());
        let name =
            std::env::var("WEBAUTHN_RP_NAME").unwrap_or_else(|_| "Passkey Flow".to_string());
        let origin = std::env::var("WEBAUTHN_RP_ORIGIN")
            .unwrap_or_else(|_| "http://localhost:8000".to_string());

        Self::new(&id, &name, &origin)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Normalized expected origin (no trailing slash)
    pub fn origin(&self) -> &str {
        &self.origin
    }
}
