//! Registration (attestation) ceremony orchestration
//!
//! Mirror of the authentication flow for creating credentials: `begin` parks
//! creation options in the cache, `finish` consumes them once and verifies
//! the attestation. The verdict carries everything the application needs to
//! persist a [`RegisteredCredential`](crate::credential::RegisteredCredential),
//! including the wire-level extras the protocol library does not see
//! (discoverability from the `credProps` extension, reported transports).

use serde::{Deserialize, Serialize};

use crate::config::RelyingParty;
use crate::credential::{CredentialDeviceType, RegisteredCredential};
use crate::engine::{AttestationRequest, AttestationVerification, CeremonyEngine};
use crate::error::{CeremonyError, Result};
use crate::storage::{ChallengeCache, OptionsCache};
use crate::types::{
    AuthenticatorTransport, RegistrationOptions, RegistrationResponse, UserVerificationPolicy,
};

/// Cache namespace for pending registration ceremonies
const CACHE_NAMESPACE: &str = "regn";

/// Outcome of a verified registration ceremony
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedRegistration {
    #[serde(with = "crate::codec::base64url")]
    pub credential_id: Vec<u8>,
    /// COSE-encoded credential public key
    #[serde(with = "crate::codec::base64url")]
    pub public_key: Vec<u8>,
    pub sign_count: u32,
    pub aaguid: String,
    pub device_type: CredentialDeviceType,
    pub backed_up: bool,
    /// From the `credProps` client extension; `None` when unreported
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_discoverable: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transports: Option<Vec<AuthenticatorTransport>>,
    /// The opaque user handle the options were issued for
    #[serde(with = "crate::codec::base64url")]
    pub user_handle: Vec<u8>,
}

/// Orchestrates attestation ceremonies over an engine and a cache
#[derive(Debug)]
pub struct RegistrationService<E, C> {
    engine: E,
    store: OptionsCache<C>,
    rp: RelyingParty,
}

impl<E, C> RegistrationService<E, C>
where
    E: CeremonyEngine,
    C: ChallengeCache,
{
    pub fn new(engine: E, cache: C, rp: RelyingParty) -> Self {
        Self {
            engine,
            store: OptionsCache::new(cache, CACHE_NAMESPACE),
            rp,
        }
    }

    /// Start a registration ceremony.
    ///
    /// Every existing credential becomes an exclude entry so the
    /// authenticator refuses to re-register itself. The returned options are
    /// stored under `cache_key` until `finish` consumes them or the TTL runs
    /// out.
    pub async fn begin(
        &self,
        cache_key: &str,
        username: &str,
        user_verification: &str,
        existing_credentials: &[RegisteredCredential],
    ) -> Result<RegistrationOptions> {
        let policy: UserVerificationPolicy = user_verification.parse()?;

        let exclude_credentials = existing_credentials
            .iter()
            .map(RegisteredCredential::descriptor)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let options = self.engine.generate_registration_options(AttestationRequest {
            rp_id: self.rp.id(),
            rp_name: self.rp.name(),
            user_name: username,
            user_display_name: username,
            user_verification: policy,
            exclude_credentials,
        })?;

        self.store.save(cache_key, &options, options.timeout).await?;

        tracing::debug!(
            cache_key = %cache_key,
            username = %username,
            exclude_credentials = options.exclude_credentials.len(),
            "registration ceremony started"
        );
        Ok(options)
    }

    /// Complete a registration ceremony.
    ///
    /// Consumes the pending options before verification, so a stored
    /// challenge satisfies at most one finish. User verification is enforced
    /// exactly when the stored authenticator selection requested `required`.
    pub async fn finish(
        &self,
        cache_key: &str,
        client_response: &serde_json::Value,
    ) -> Result<VerifiedRegistration> {
        let response: RegistrationResponse = serde_json::from_value(client_response.clone())
            .map_err(CeremonyError::MalformedResponse)?;

        let options: RegistrationOptions = self
            .store
            .consume(cache_key)
            .await?
            .ok_or_else(|| CeremonyError::MissingCeremonyState(cache_key.to_string()))?;

        let require_user_verification = options
            .authenticator_selection
            .as_ref()
            .and_then(|selection| selection.user_verification)
            == Some(UserVerificationPolicy::Required);

        let verified = self.engine.verify_registration_response(AttestationVerification {
            response: &response,
            expected_challenge: &options.challenge,
            expected_rp_id: self.rp.id(),
            expected_origin: self.rp.origin(),
            require_user_verification,
        })?;

        let is_discoverable = response
            .client_extension_results
            .cred_props
            .as_ref()
            .and_then(|props| props.rk);

        tracing::info!(
            cache_key = %cache_key,
            aaguid = %verified.aaguid,
            backed_up = verified.backed_up,
            "registration ceremony verified"
        );

        Ok(VerifiedRegistration {
            credential_id: verified.credential_id,
            public_key: verified.public_key,
            sign_count: verified.sign_count,
            aaguid: verified.aaguid,
            device_type: verified.device_type,
            backed_up: verified.backed_up,
            is_discoverable,
            transports: response.response.transports.clone(),
            user_handle: options.user.id,
        })
    }
}
