//! Stored credential records
//!
//! Credentials are persisted by the embedding application (this crate never
//! writes them); they arrive here as read-only inputs to the ceremony
//! services. Binary material is kept as base64url text at rest, matching how
//! typical credential tables store it, and decoded on demand.

use serde::{Deserialize, Serialize};

use crate::codec::{base64url_decode, base64url_encode};
use crate::registration::VerifiedRegistration;
use crate::types::{AuthenticatorTransport, CredentialDescriptor};

/// Whether a credential is bound to one authenticator or synced across a
/// provider's devices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialDeviceType {
    SingleDevice,
    MultiDevice,
}

/// A registered WebAuthn credential as the application persists it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisteredCredential {
    /// Credential id, base64url
    pub id: String,
    /// COSE public key, base64url
    pub public_key: String,
    pub sign_count: u32,
    /// Owning account; authoritative, never taken from client input
    pub username: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
    pub device_type: CredentialDeviceType,
    pub backed_up: bool,
    /// From the `credProps` extension at registration; absent when the
    /// client did not report it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_discoverable: Option<bool>,
    pub aaguid: String,
}

impl RegisteredCredential {
    /// Build a persistable record from a verified registration and the
    /// username the application authenticated out of band.
    pub fn from_verified(verified: &VerifiedRegistration, username: impl Into<String>) -> Self {
        Self {
            id: base64url_encode(&verified.credential_id),
            public_key: base64url_encode(&verified.public_key),
            sign_count: verified.sign_count,
            username: username.into(),
            transports: verified.transports.clone(),
            device_type: verified.device_type,
            backed_up: verified.backed_up,
            is_discoverable: verified.is_discoverable,
            aaguid: verified.aaguid.clone(),
        }
    }

    /// Raw credential id bytes
    pub fn decoded_id(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64url_decode(&self.id)
    }

    /// Raw COSE public key bytes
    pub fn decoded_public_key(&self) -> Result<Vec<u8>, base64::DecodeError> {
        base64url_decode(&self.public_key)
    }

    /// Descriptor for allow/exclude lists in ceremony options
    pub fn descriptor(&self) -> Result<CredentialDescriptor, base64::DecodeError> {
        Ok(CredentialDescriptor::public_key(
            self.decoded_id()?,
            self.transports.clone(),
        ))
    }
}
