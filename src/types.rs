//! Wire types for WebAuthn ceremony options and client responses
//!
//! These mirror the JSON shapes exchanged with browsers (camelCase field
//! names, unpadded base64url for binary values). Fields that carry raw bytes
//! on the wire are declared as `Vec<u8>` and routed through the codec
//! adapters, so a record that has been through the cache comes back with
//! byte-identical challenge and credential ids.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Requested user-verification behavior for a ceremony
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserVerificationPolicy {
    Discouraged,
    Preferred,
    Required,
}

/// Unrecognized user-verification policy string
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown user verification policy: {0:?}")]
pub struct UnknownPolicy(pub String);

impl FromStr for UserVerificationPolicy {
    type Err = UnknownPolicy;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "discouraged" => Ok(Self::Discouraged),
            "preferred" => Ok(Self::Preferred),
            "required" => Ok(Self::Required),
            other => Err(UnknownPolicy(other.to_string())),
        }
    }
}

impl fmt::Display for UserVerificationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Discouraged => write!(f, "discouraged"),
            Self::Preferred => write!(f, "preferred"),
            Self::Required => write!(f, "required"),
        }
    }
}

/// How an authenticator communicates with the client
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorTransport {
    Usb,
    Nfc,
    Ble,
    SmartCard,
    Hybrid,
    Internal,
    Cable,
    /// Transports defined after this crate was written still deserialize
    #[serde(other)]
    Unknown,
}

/// Authenticator attachment modality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthenticatorAttachment {
    Platform,
    CrossPlatform,
}

/// Client-side discoverable credential requirement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResidentKeyRequirement {
    Discouraged,
    Preferred,
    Required,
}

/// Attestation conveyance preference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttestationConveyance {
    None,
    Indirect,
    Direct,
    Enterprise,
}

/// Reference to a registered credential, narrowing which authenticators may
/// respond to a ceremony
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialDescriptor {
    pub r#type: String,
    #[serde(with = "crate::codec::base64url")]
    pub id: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

impl CredentialDescriptor {
    /// Descriptor for a public-key credential (the only type WebAuthn defines)
    pub fn public_key(id: Vec<u8>, transports: Option<Vec<AuthenticatorTransport>>) -> Self {
        Self {
            r#type: "public-key".to_string(),
            id,
            transports,
        }
    }
}

/// Server-chosen options for an authentication (assertion) ceremony
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationOptions {
    #[serde(with = "crate::codec::base64url")]
    pub challenge: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    pub rp_id: String,
    #[serde(default)]
    pub allow_credentials: Vec<CredentialDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerificationPolicy>,
}

/// Relying party entity inside registration options
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RpEntity {
    pub id: String,
    pub name: String,
}

/// User entity inside registration options; the id is an opaque handle the
/// server mints, never the username
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserEntity {
    #[serde(with = "crate::codec::base64url")]
    pub id: Vec<u8>,
    pub name: String,
    pub display_name: String,
}

/// Acceptable credential algorithm (COSE identifier)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialParameters {
    pub r#type: String,
    pub alg: i32,
}

impl CredentialParameters {
    pub fn public_key(alg: i32) -> Self {
        Self {
            r#type: "public-key".to_string(),
            alg,
        }
    }
}

/// Authenticator requirements for a registration ceremony
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticatorSelection {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_attachment: Option<AuthenticatorAttachment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resident_key: Option<ResidentKeyRequirement>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub require_resident_key: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_verification: Option<UserVerificationPolicy>,
}

/// Server-chosen options for a registration (attestation) ceremony
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationOptions {
    #[serde(with = "crate::codec::base64url")]
    pub challenge: Vec<u8>,
    pub rp: RpEntity,
    pub user: UserEntity,
    pub pub_key_cred_params: Vec<CredentialParameters>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout: Option<u32>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_credentials: Vec<CredentialDescriptor>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authenticator_selection: Option<AuthenticatorSelection>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attestation: Option<AttestationConveyance>,
}

/// Client response to an authentication ceremony
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthenticationResponse {
    pub id: String,
    #[serde(with = "crate::codec::base64url")]
    pub raw_id: Vec<u8>,
    pub response: AssertionData,
    #[serde(default)]
    pub client_extension_results: ClientExtensionResults,
    pub r#type: String,
}

/// The authenticator assertion inside an authentication response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssertionData {
    #[serde(rename = "clientDataJSON", with = "crate::codec::base64url")]
    pub client_data_json: Vec<u8>,
    #[serde(with = "crate::codec::base64url")]
    pub authenticator_data: Vec<u8>,
    #[serde(with = "crate::codec::base64url")]
    pub signature: Vec<u8>,
    #[serde(
        default,
        with = "crate::codec::base64url::option",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_handle: Option<Vec<u8>>,
}

/// Client response to a registration ceremony
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationResponse {
    pub id: String,
    #[serde(with = "crate::codec::base64url")]
    pub raw_id: Vec<u8>,
    pub response: AttestationData,
    #[serde(default)]
    pub client_extension_results: ClientExtensionResults,
    pub r#type: String,
}

/// The authenticator attestation inside a registration response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttestationData {
    #[serde(rename = "clientDataJSON", with = "crate::codec::base64url")]
    pub client_data_json: Vec<u8>,
    #[serde(with = "crate::codec::base64url")]
    pub attestation_object: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
}

/// Client extension outputs reported alongside a response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientExtensionResults {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cred_props: Option<CredentialProperties>,
}

/// `credProps` extension output; `rk` reports whether the created credential
/// is client-side discoverable
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialProperties {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rk: Option<bool>,
}
