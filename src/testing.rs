//! Deterministic ceremony doubles for tests.
//!
//! [`StubEngine`] stands in for a real WebAuthn library: fixed challenge and
//! credential material, scripted rejections, and owned recordings of every
//! call so tests can assert exactly what the services passed across the
//! boundary. [`RecordingCache`] wraps [`MemoryCache`] and remembers each
//! store together with its TTL.
//!
//! WARNING: Do not use in production - nothing here verifies anything!

use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use crate::credential::CredentialDeviceType;
use crate::engine::{
    AssertionRequest, AssertionVerification, AttestationRequest, AttestationVerification,
    CeremonyEngine, EngineError, VerifiedAssertion, VerifiedAttestation,
};
use crate::storage::{CacheError, ChallengeCache, MemoryCache};
use crate::types::{
    AttestationConveyance, AuthenticationOptions, AuthenticatorSelection, CredentialDescriptor,
    CredentialParameters, RegistrationOptions, ResidentKeyRequirement, RpEntity, UserEntity,
    UserVerificationPolicy,
};

/// Snapshot of a `generate_authentication_options` call
#[derive(Debug, Clone)]
pub struct RecordedAssertionRequest {
    pub rp_id: String,
    pub user_verification: UserVerificationPolicy,
    pub allow_credentials: Vec<CredentialDescriptor>,
}

/// Snapshot of a `verify_authentication_response` call
#[derive(Debug, Clone)]
pub struct RecordedAssertionVerification {
    pub expected_challenge: Vec<u8>,
    pub expected_rp_id: String,
    pub expected_origin: String,
    pub require_user_verification: bool,
    pub credential_public_key: Vec<u8>,
    pub credential_current_sign_count: u32,
}

/// Snapshot of a `generate_registration_options` call
#[derive(Debug, Clone)]
pub struct RecordedAttestationRequest {
    pub rp_id: String,
    pub rp_name: String,
    pub user_name: String,
    pub user_display_name: String,
    pub user_verification: UserVerificationPolicy,
    pub exclude_credentials: Vec<CredentialDescriptor>,
}

/// Snapshot of a `verify_registration_response` call
#[derive(Debug, Clone)]
pub struct RecordedAttestationVerification {
    pub expected_challenge: Vec<u8>,
    pub expected_rp_id: String,
    pub expected_origin: String,
    pub require_user_verification: bool,
}

/// Deterministic [`CeremonyEngine`] double.
///
/// Generated options echo the request (policy, allow/exclude lists) around a
/// fixed challenge; verification succeeds by default, returning the
/// response's raw id and an incremented sign count, and can be scripted to
/// reject instead.
pub struct StubEngine {
    challenge: Vec<u8>,
    timeout: Option<u32>,
    user_handle: Vec<u8>,
    aaguid: String,
    public_key: Vec<u8>,
    device_type: CredentialDeviceType,
    backed_up: bool,
    reject_assertion: Mutex<Option<String>>,
    reject_attestation: Mutex<Option<String>>,
    assertion_requests: Mutex<Vec<RecordedAssertionRequest>>,
    assertion_verifications: Mutex<Vec<RecordedAssertionVerification>>,
    attestation_requests: Mutex<Vec<RecordedAttestationRequest>>,
    attestation_verifications: Mutex<Vec<RecordedAttestationVerification>>,
}

impl StubEngine {
    pub fn new() -> Self {
        Self {
            challenge: b"deterministic-stub-challenge-32B".to_vec(),
            timeout: Some(60000),
            user_handle: b"stub-user-handle".to_vec(),
            aaguid: "00000000-0000-0000-0000-000000000000".to_string(),
            public_key: vec![0xA5; 77],
            device_type: CredentialDeviceType::MultiDevice,
            backed_up: true,
            reject_assertion: Mutex::new(None),
            reject_attestation: Mutex::new(None),
            assertion_requests: Mutex::new(Vec::new()),
            assertion_verifications: Mutex::new(Vec::new()),
            attestation_requests: Mutex::new(Vec::new()),
            attestation_verifications: Mutex::new(Vec::new()),
        }
    }

    /// Fixed challenge to embed in generated options
    pub fn with_challenge(mut self, challenge: Vec<u8>) -> Self {
        self.challenge = challenge;
        self
    }

    /// Timeout to embed in generated options (`None` omits it)
    pub fn with_timeout(mut self, timeout: Option<u32>) -> Self {
        self.timeout = timeout;
        self
    }

    /// User handle minted for registration options
    pub fn with_user_handle(mut self, user_handle: Vec<u8>) -> Self {
        self.user_handle = user_handle;
        self
    }

    /// AAGUID reported by verified attestations
    pub fn with_aaguid(mut self, aaguid: &str) -> Self {
        self.aaguid = aaguid.to_string();
        self
    }

    /// Device type reported by verified attestations
    pub fn with_device_type(mut self, device_type: CredentialDeviceType) -> Self {
        self.device_type = device_type;
        self
    }

    /// Make every assertion verification fail
    pub fn reject_assertions(&self, reason: &str) {
        *self.reject_assertion.lock().expect("stub mutex poisoned") = Some(reason.to_string());
    }

    /// Make every attestation verification fail
    pub fn reject_attestations(&self, reason: &str) {
        *self.reject_attestation.lock().expect("stub mutex poisoned") = Some(reason.to_string());
    }

    pub fn assertion_requests(&self) -> Vec<RecordedAssertionRequest> {
        self.assertion_requests
            .lock()
            .expect("stub mutex poisoned")
            .clone()
    }

    pub fn assertion_verifications(&self) -> Vec<RecordedAssertionVerification> {
        self.assertion_verifications
            .lock()
            .expect("stub mutex poisoned")
            .clone()
    }

    pub fn attestation_requests(&self) -> Vec<RecordedAttestationRequest> {
        self.attestation_requests
            .lock()
            .expect("stub mutex poisoned")
            .clone()
    }

    pub fn attestation_verifications(&self) -> Vec<RecordedAttestationVerification> {
        self.attestation_verifications
            .lock()
            .expect("stub mutex poisoned")
            .clone()
    }
}

impl Default for StubEngine {
    fn default() -> Self {
        Self::new()
    }
}

impl CeremonyEngine for StubEngine {
    fn generate_authentication_options(
        &self,
        request: AssertionRequest<'_>,
    ) -> Result<AuthenticationOptions, EngineError> {
        self.assertion_requests
            .lock()
            .expect("stub mutex poisoned")
            .push(RecordedAssertionRequest {
                rp_id: request.rp_id.to_string(),
                user_verification: request.user_verification,
                allow_credentials: request.allow_credentials.clone(),
            });

        Ok(AuthenticationOptions {
            challenge: self.challenge.clone(),
            timeout: self.timeout,
            rp_id: request.rp_id.to_string(),
            allow_credentials: request.allow_credentials,
            user_verification: Some(request.user_verification),
        })
    }

    fn verify_authentication_response(
        &self,
        verification: AssertionVerification<'_>,
    ) -> Result<VerifiedAssertion, EngineError> {
        self.assertion_verifications
            .lock()
            .expect("stub mutex poisoned")
            .push(RecordedAssertionVerification {
                expected_challenge: verification.expected_challenge.to_vec(),
                expected_rp_id: verification.expected_rp_id.to_string(),
                expected_origin: verification.expected_origin.to_string(),
                require_user_verification: verification.require_user_verification,
                credential_public_key: verification.credential_public_key.to_vec(),
                credential_current_sign_count: verification.credential_current_sign_count,
            });

        if let Some(reason) = self.reject_assertion.lock().expect("stub mutex poisoned").clone() {
            return Err(EngineError::Rejected(reason));
        }

        Ok(VerifiedAssertion {
            credential_id: verification.response.raw_id.clone(),
            new_sign_count: verification.credential_current_sign_count + 1,
            user_verified: verification.require_user_verification,
        })
    }

    fn generate_registration_options(
        &self,
        request: AttestationRequest<'_>,
    ) -> Result<RegistrationOptions, EngineError> {
        self.attestation_requests
            .lock()
            .expect("stub mutex poisoned")
            .push(RecordedAttestationRequest {
                rp_id: request.rp_id.to_string(),
                rp_name: request.rp_name.to_string(),
                user_name: request.user_name.to_string(),
                user_display_name: request.user_display_name.to_string(),
                user_verification: request.user_verification,
                exclude_credentials: request.exclude_credentials.clone(),
            });

        Ok(RegistrationOptions {
            challenge: self.challenge.clone(),
            rp: RpEntity {
                id: request.rp_id.to_string(),
                name: request.rp_name.to_string(),
            },
            user: UserEntity {
                id: self.user_handle.clone(),
                name: request.user_name.to_string(),
                display_name: request.user_display_name.to_string(),
            },
            pub_key_cred_params: vec![
                CredentialParameters::public_key(-7),
                CredentialParameters::public_key(-257),
            ],
            timeout: self.timeout,
            exclude_credentials: request.exclude_credentials,
            authenticator_selection: Some(AuthenticatorSelection {
                authenticator_attachment: None,
                resident_key: Some(ResidentKeyRequirement::Preferred),
                require_resident_key: None,
                user_verification: Some(request.user_verification),
            }),
            attestation: Some(AttestationConveyance::None),
        })
    }

    fn verify_registration_response(
        &self,
        verification: AttestationVerification<'_>,
    ) -> Result<VerifiedAttestation, EngineError> {
        self.attestation_verifications
            .lock()
            .expect("stub mutex poisoned")
            .push(RecordedAttestationVerification {
                expected_challenge: verification.expected_challenge.to_vec(),
                expected_rp_id: verification.expected_rp_id.to_string(),
                expected_origin: verification.expected_origin.to_string(),
                require_user_verification: verification.require_user_verification,
            });

        if let Some(reason) = self
            .reject_attestation
            .lock()
            .expect("stub mutex poisoned")
            .clone()
        {
            return Err(EngineError::Rejected(reason));
        }

        Ok(VerifiedAttestation {
            credential_id: verification.response.raw_id.clone(),
            public_key: self.public_key.clone(),
            sign_count: 0,
            aaguid: self.aaguid.clone(),
            device_type: self.device_type,
            backed_up: self.backed_up,
            user_verified: verification.require_user_verification,
        })
    }
}

impl std::fmt::Debug for StubEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StubEngine")
            .field("challenge", &self.challenge.len())
            .field("timeout", &self.timeout)
            .finish()
    }
}

/// Recorded `store` call with its TTL
#[derive(Debug, Clone)]
pub struct RecordedStore {
    pub key: String,
    pub value: String,
    pub ttl: Duration,
}

/// [`MemoryCache`] wrapper that remembers every store
#[derive(Debug, Default)]
pub struct RecordingCache {
    inner: MemoryCache,
    stores: Mutex<Vec<RecordedStore>>,
}

impl RecordingCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stores(&self) -> Vec<RecordedStore> {
        self.stores.lock().expect("stub mutex poisoned").clone()
    }
}

#[async_trait]
impl ChallengeCache for RecordingCache {
    async fn store(&self, key: &str, value: &str, ttl: Duration) -> Result<(), CacheError> {
        self.stores
            .lock()
            .expect("stub mutex poisoned")
            .push(RecordedStore {
                key: key.to_string(),
                value: value.to_string(),
                ttl,
            });
        self.inner.store(key, value, ttl).await
    }

    async fn take(&self, key: &str) -> Result<Option<String>, CacheError> {
        self.inner.take(key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.inner.delete(key).await
    }
}

/// Browser-shaped assertion response JSON for the given credential id
pub fn assertion_response_json(credential_id: &[u8]) -> serde_json::Value {
    let id = crate::codec::base64url_encode(credential_id);
    serde_json::json!({
        "id": id,
        "rawId": id,
        "response": {
            "clientDataJSON": crate::codec::base64url_encode(b"{\"type\":\"webauthn.get\"}"),
            "authenticatorData": crate::codec::base64url_encode([0u8; 37]),
            "signature": crate::codec::base64url_encode([0xD5; 70]),
            "userHandle": null
        },
        "clientExtensionResults": {},
        "type": "public-key"
    })
}

/// Browser-shaped attestation response JSON for the given credential id;
/// reports an internal transport and a discoverable credential
pub fn attestation_response_json(credential_id: &[u8]) -> serde_json::Value {
    let id = crate::codec::base64url_encode(credential_id);
    serde_json::json!({
        "id": id,
        "rawId": id,
        "response": {
            "clientDataJSON": crate::codec::base64url_encode(b"{\"type\":\"webauthn.create\"}"),
            "attestationObject": crate::codec::base64url_encode([0xA3; 54]),
            "transports": ["internal"]
        },
        "clientExtensionResults": { "credProps": { "rk": true } },
        "type": "public-key"
    })
}
