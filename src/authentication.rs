//! Authentication (assertion) ceremony orchestration
//!
//! Bridges the two halves of a passkey sign-in across the network round trip:
//! `begin` asks the protocol library for assertion options and parks them in
//! the cache; `finish` consumes them exactly once and hands everything the
//! library needs to the verifier. The username in the result always comes
//! from the server-side credential record, never from client input.

use serde::{Deserialize, Serialize};

use crate::config::RelyingParty;
use crate::credential::RegisteredCredential;
use crate::engine::{AssertionRequest, AssertionVerification, CeremonyEngine};
use crate::error::{CeremonyError, Result};
use crate::storage::{ChallengeCache, OptionsCache};
use crate::types::{AuthenticationOptions, AuthenticationResponse, UserVerificationPolicy};

/// Cache namespace for pending authentication ceremonies
const CACHE_NAMESPACE: &str = "authn";

/// Authenticators cap how many allowed credentials they accept; keep only the
/// most recently registered ones
const MAX_ALLOWED_CREDENTIALS: usize = 64;

/// Outcome of a verified authentication ceremony.
///
/// The caller persists `new_sign_count` on the credential record; nothing is
/// written here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerifiedAuthentication {
    #[serde(with = "crate::codec::base64url")]
    pub credential_id: Vec<u8>,
    pub new_sign_count: u32,
    pub username: String,
}

/// Orchestrates assertion ceremonies over an engine and a cache
#[derive(Debug)]
pub struct AuthenticationService<E, C> {
    engine: E,
    store: OptionsCache<C>,
    rp: RelyingParty,
}

impl<E, C> AuthenticationService<E, C>
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

    /// Start an authentication ceremony.
    ///
    /// `user_verification` must be one of `discouraged`, `preferred` or
    /// `required`; anything else is rejected before the engine or cache is
    /// touched. At most the last [`MAX_ALLOWED_CREDENTIALS`] entries of
    /// `existing_credentials` become the allow list, in their given order.
    /// The returned options are stored under `cache_key` until `finish`
    /// consumes them or the TTL runs out.
    pub async fn begin(
        &self,
        cache_key: &str,
        user_verification: &str,
        existing_credentials: &[RegisteredCredential],
    ) -> Result<AuthenticationOptions> {
        let policy: UserVerificationPolicy = user_verification.parse()?;

        let skip = existing_credentials
            .len()
            .saturating_sub(MAX_ALLOWED_CREDENTIALS);
        let allow_credentials = existing_credentials[skip..]
            .iter()
            .map(RegisteredCredential::descriptor)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let options = self.engine.generate_authentication_options(AssertionRequest {
            rp_id: self.rp.id(),
            user_verification: policy,
            allow_credentials,
        })?;

        self.store.save(cache_key, &options, options.timeout).await?;

        tracing::debug!(
            cache_key = %cache_key,
            allow_credentials = options.allow_credentials.len(),
            user_verification = %policy,
            "authentication ceremony started"
        );
        Ok(options)
    }

    /// Complete an authentication ceremony.
    ///
    /// The pending options are consumed before verification runs, so one
    /// stored challenge can never satisfy two finishes regardless of the
    /// verification outcome. User verification is enforced exactly when the
    /// stored options requested the `required` policy.
    pub async fn finish(
        &self,
        cache_key: &str,
        existing_credential: &RegisteredCredential,
        client_response: &serde_json::Value,
    ) -> Result<VerifiedAuthentication> {
        let response: AuthenticationResponse = serde_json::from_value(client_response.clone())
            .map_err(CeremonyError::MalformedResponse)?;

        let options: AuthenticationOptions = self
            .store
            .consume(cache_key)
            .await?
            .ok_or_else(|| CeremonyError::MissingCeremonyState(cache_key.to_string()))?;

        let require_user_verification =
            options.user_verification == Some(UserVerificationPolicy::Required);
        let public_key = existing_credential.decoded_public_key()?;

        let verified = self.engine.verify_authentication_response(AssertionVerification {
            response: &response,
            expected_challenge: &options.challenge,
            expected_rp_id: self.rp.id(),
            expected_origin: self.rp.origin(),
            require_user_verification,
            credential_public_key: &public_key,
            credential_current_sign_count: existing_credential.sign_count,
        })?;

        tracing::info!(
            cache_key = %cache_key,
            username = %existing_credential.username,
            sign_count = verified.new_sign_count,
            user_verified = verified.user_verified,
            "authentication ceremony verified"
        );

        Ok(VerifiedAuthentication {
            credential_id: verified.credential_id,
            new_sign_count: verified.new_sign_count,
            username: existing_credential.username.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::base64url_encode;
    use crate::credential::CredentialDeviceType;
    use crate::storage::MemoryCache;
    use crate::testing::{assertion_response_json, StubEngine};

    fn relying_party() -> RelyingParty {
        RelyingParty::new("example.org", "Example", "https://example.org").unwrap()
    }

    fn credential(id_byte: u8, username: &str) -> RegisteredCredential {
        RegisteredCredential {
            id: base64url_encode([id_byte; 16]),
            public_key: base64url_encode([0xC0; 77]),
            sign_count: 41,
            username: username.to_string(),
            transports: None,
            device_type: CredentialDeviceType::MultiDevice,
            backed_up: true,
            is_discoverable: None,
            aaguid: "00000000-0000-0000-0000-000000000000".to_string(),
        }
    }

    fn service(engine: StubEngine) -> AuthenticationService<StubEngine, MemoryCache> {
        AuthenticationService::new(engine, MemoryCache::new(), relying_party())
    }

    #[tokio::test]
    async fn test_begin_rejects_unknown_policy() {
        let service = service(StubEngine::new());
        let err = service
            .begin("session-1", "mandatory", &[])
            .await
            .unwrap_err();

        assert!(matches!(err, CeremonyError::Policy(_)));
        // Nothing was generated or stored
        let call_count = service.engine.assertion_requests().len();
        assert_eq!(call_count, 0);
    }

    #[tokio::test]
    async fn test_begin_truncates_allow_list_to_last_64() {
        let service = service(StubEngine::new());
        let credentials: Vec<_> = (0..100).map(|i| credential(i as u8, "alice")).collect();

        service
            .begin("session-1", "preferred", &credentials)
            .await
            .unwrap();

        let requests = service.engine.assertion_requests();
        let allow = &requests[0].allow_credentials;
        assert_eq!(allow.len(), 64);
        // The first 36 are dropped; order of the rest is preserved
        assert_eq!(allow.first().unwrap().id, vec![36u8; 16]);
        assert_eq!(allow.last().unwrap().id, vec![99u8; 16]);
    }

    #[tokio::test]
    async fn test_begin_keeps_small_lists_whole() {
        let service = service(StubEngine::new());
        let credentials: Vec<_> = (0..3).map(|i| credential(i as u8, "alice")).collect();

        service
            .begin("session-1", "required", &credentials)
            .await
            .unwrap();

        let requests = service.engine.assertion_requests();
        assert_eq!(requests[0].allow_credentials.len(), 3);
        assert_eq!(
            requests[0].user_verification,
            UserVerificationPolicy::Required
        );
    }

    #[tokio::test]
    async fn test_finish_without_begin_is_missing_state() {
        let service = service(StubEngine::new());
        let err = service
            .finish(
                "session-9",
                &credential(1, "alice"),
                &assertion_response_json(&[1; 16]),
            )
            .await
            .unwrap_err();

        match err {
            CeremonyError::MissingCeremonyState(key) => assert_eq!(key, "session-9"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_finish_is_single_use() {
        let service = service(StubEngine::new());
        let alice = credential(1, "alice");
        service.begin("session-1", "preferred", &[alice.clone()]).await.unwrap();

        let response = assertion_response_json(&[1; 16]);
        service.finish("session-1", &alice, &response).await.unwrap();
        let err = service.finish("session-1", &alice, &response).await.unwrap_err();

        assert!(matches!(err, CeremonyError::MissingCeremonyState(_)));
    }

    #[tokio::test]
    async fn test_failed_verification_still_consumes_state() {
        let engine = StubEngine::new();
        engine.reject_assertions("signature mismatch");
        let service = service(engine);
        let alice = credential(1, "alice");
        service.begin("session-1", "preferred", &[alice.clone()]).await.unwrap();

        let response = assertion_response_json(&[1; 16]);
        let first = service.finish("session-1", &alice, &response).await.unwrap_err();
        assert!(matches!(first, CeremonyError::Engine(_)));

        // The challenge is burned even though verification failed
        let second = service.finish("session-1", &alice, &response).await.unwrap_err();
        assert!(matches!(second, CeremonyError::MissingCeremonyState(_)));
    }

    #[tokio::test]
    async fn test_malformed_response_leaves_state_intact() {
        let service = service(StubEngine::new());
        let alice = credential(1, "alice");
        service.begin("session-1", "preferred", &[alice.clone()]).await.unwrap();

        let garbage = serde_json::json!({ "id": 42 });
        let err = service.finish("session-1", &alice, &garbage).await.unwrap_err();
        assert!(matches!(err, CeremonyError::MalformedResponse(_)));

        // A well-formed retry still finds the pending ceremony
        let response = assertion_response_json(&[1; 16]);
        service.finish("session-1", &alice, &response).await.unwrap();
    }

    #[tokio::test]
    async fn test_user_verification_required_iff_stored_policy_required() {
        for (policy, expected) in [
            ("discouraged", false),
            ("preferred", false),
            ("required", true),
        ] {
            let service = service(StubEngine::new());
            let alice = credential(1, "alice");
            service.begin("session-1", policy, &[alice.clone()]).await.unwrap();
            service
                .finish("session-1", &alice, &assertion_response_json(&[1; 16]))
                .await
                .unwrap();

            let verifications = service.engine.assertion_verifications();
            assert_eq!(
                verifications[0].require_user_verification, expected,
                "policy {policy:?}"
            );
        }
    }

    #[tokio::test]
    async fn test_finish_passes_stored_challenge_and_credential_state() {
        let engine = StubEngine::new().with_challenge(vec![0x5A; 32]);
        let service = service(engine);
        let alice = credential(7, "alice");
        service.begin("session-1", "preferred", &[alice.clone()]).await.unwrap();
        service
            .finish("session-1", &alice, &assertion_response_json(&[7; 16]))
            .await
            .unwrap();

        let verifications = service.engine.assertion_verifications();
        assert_eq!(verifications[0].expected_challenge, vec![0x5A; 32]);
        assert_eq!(verifications[0].expected_rp_id, "example.org");
        assert_eq!(verifications[0].expected_origin, "https://example.org");
        assert_eq!(verifications[0].credential_public_key, vec![0xC0; 77]);
        assert_eq!(verifications[0].credential_current_sign_count, 41);
    }

    #[tokio::test]
    async fn test_username_comes_from_server_record() {
        let service = service(StubEngine::new());
        let alice = credential(1, "alice");
        service.begin("session-1", "preferred", &[alice.clone()]).await.unwrap();

        // The client claims a different user handle; it must not win
        let mut response = assertion_response_json(&[1; 16]);
        response["response"]["userHandle"] = serde_json::Value::String(
            crate::codec::base64url_encode(b"mallory"),
        );

        let verified = service.finish("session-1", &alice, &response).await.unwrap();
        assert_eq!(verified.username, "alice");
    }

    #[tokio::test]
    async fn test_corrupt_public_key_is_reported() {
        let service = service(StubEngine::new());
        let mut alice = credential(1, "alice");
        service.begin("session-1", "preferred", &[alice.clone()]).await.unwrap();

        alice.public_key = "!!!".to_string();
        let err = service
            .finish("session-1", &alice, &assertion_response_json(&[1; 16]))
            .await
            .unwrap_err();
        assert!(matches!(err, CeremonyError::CorruptCredential(_)));
    }
}
