//! Boundary to the WebAuthn protocol library
//!
//! All cryptographic ceremony work (challenge generation, signature and
//! attestation verification, CBOR/COSE parsing) happens behind
//! [`CeremonyEngine`]. The services in this crate only move bytes between the
//! engine and the cache; an implementation typically wraps a FIDO2 library.
//! Engine calls are synchronous CPU work; the only await points in the
//! services are cache operations.

use thiserror::Error;

use crate::credential::CredentialDeviceType;
use crate::types::{
    AuthenticationOptions, AuthenticationResponse, CredentialDescriptor, RegistrationOptions,
    RegistrationResponse, UserVerificationPolicy,
};

/// Errors reported by the protocol library
#[derive(Error, Debug)]
pub enum EngineError {
    #[error("options generation failed: {0}")]
    OptionsGeneration(String),

    /// The ceremony response failed cryptographic or policy checks.
    #[error("ceremony response rejected: {0}")]
    Rejected(String),

    #[error("unparseable authenticator payload: {0}")]
    Malformed(String),
}

/// Inputs for generating authentication options
#[derive(Debug)]
pub struct AssertionRequest<'a> {
    pub rp_id: &'a str,
    pub user_verification: UserVerificationPolicy,
    pub allow_credentials: Vec<CredentialDescriptor>,
}

/// Inputs for verifying an authentication response.
///
/// Everything the library needs is passed explicitly: the challenge that was
/// stored at begin, the configured RP identity, and the stored credential's
/// key material and counter.
#[derive(Debug)]
pub struct AssertionVerification<'a> {
    pub response: &'a AuthenticationResponse,
    pub expected_challenge: &'a [u8],
    pub expected_rp_id: &'a str,
    pub expected_origin: &'a str,
    pub require_user_verification: bool,
    pub credential_public_key: &'a [u8],
    pub credential_current_sign_count: u32,
}

/// Inputs for generating registration options
#[derive(Debug)]
pub struct AttestationRequest<'a> {
    pub rp_id: &'a str,
    pub rp_name: &'a str,
    pub user_name: &'a str,
    pub user_display_name: &'a str,
    pub user_verification: UserVerificationPolicy,
    pub exclude_credentials: Vec<CredentialDescriptor>,
}

/// Inputs for verifying a registration response
#[derive(Debug)]
pub struct AttestationVerification<'a> {
    pub response: &'a RegistrationResponse,
    pub expected_challenge: &'a [u8],
    pub expected_rp_id: &'a str,
    pub expected_origin: &'a str,
    pub require_user_verification: bool,
}

/// Successful authentication verdict from the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAssertion {
    pub credential_id: Vec<u8>,
    pub new_sign_count: u32,
    pub user_verified: bool,
}

/// Successful registration verdict from the library
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedAttestation {
    pub credential_id: Vec<u8>,
    /// COSE-encoded credential public key
    pub public_key: Vec<u8>,
    pub sign_count: u32,
    pub aaguid: String,
    pub device_type: CredentialDeviceType,
    pub backed_up: bool,
    pub user_verified: bool,
}

/// Capability interface over an external WebAuthn library.
///
/// Implementations must be thread-safe (`Send + Sync`).
pub trait CeremonyEngine: Send + Sync {
    /// Produce assertion options with a fresh challenge.
    fn generate_authentication_options(
        &self,
        request: AssertionRequest<'_>,
    ) -> Result<AuthenticationOptions, EngineError>;

    /// Verify an assertion against the expected challenge, RP identity and
    /// stored credential state.
    fn verify_authentication_response(
        &self,
        verification: AssertionVerification<'_>,
    ) -> Result<VerifiedAssertion, EngineError>;

    /// Produce creation options with a fresh challenge and user handle.
    fn generate_registration_options(
        &self,
        request: AttestationRequest<'_>,
    ) -> Result<RegistrationOptions, EngineError>;

    /// Verify an attestation and extract the new credential's material.
    fn verify_registration_response(
        &self,
        verification: AttestationVerification<'_>,
    ) -> Result<VerifiedAttestation, EngineError>;
}

impl<T: CeremonyEngine + ?Sized> CeremonyEngine for std::sync::Arc<T> {
    fn generate_authentication_options(
        &self,
        request: AssertionRequest<'_>,
    ) -> Result<AuthenticationOptions, EngineError> {
        (**self).generate_authentication_options(request)
    }

    fn verify_authentication_response(
        &self,
        verification: AssertionVerification<'_>,
    ) -> Result<VerifiedAssertion, EngineError> {
        (**self).verify_authentication_response(verification)
    }

    fn generate_registration_options(
        &self,
        request: AttestationRequest<'_>,
    ) -> Result<RegistrationOptions, EngineError> {
        (**self).generate_registration_options(request)
    }

    fn verify_registration_response(
        &self,
        verification: AttestationVerification<'_>,
    ) -> Result<VerifiedAttestation, EngineError> {
        (**self).verify_registration_response(verification)
    }
}
