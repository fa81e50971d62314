//! End-to-end ceremony flows over the stub engine and in-memory cache.

use std::sync::Arc;
use std::time::Duration;

use passkey_flow::codec::base64url_encode;
use passkey_flow::testing::{
    assertion_response_json, attestation_response_json, RecordingCache, StubEngine,
};
use passkey_flow::{
    provider_name, AuthenticationService, CeremonyError, CredentialDeviceType, MemoryCache,
    RegisteredCredential, RegistrationService, RelyingParty,
};

fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().try_init();
}

fn relying_party() -> RelyingParty {
    RelyingParty::new("example.org", "Example", "https://example.org").unwrap()
}

fn alice_credential(id: &[u8]) -> RegisteredCredential {
    RegisteredCredential {
        id: base64url_encode(id),
        public_key: base64url_encode([0xC0; 77]),
        sign_count: 41,
        username: "alice".to_string(),
        transports: None,
        device_type: CredentialDeviceType::MultiDevice,
        backed_up: true,
        is_discoverable: Some(true),
        aaguid: "f24a8e70-d0d3-f82c-2937-32523cc4de5a".to_string(),
    }
}

#[tokio::test]
async fn authentication_ceremony_lifecycle() {
    init_tracing();

    let engine = Arc::new(StubEngine::new());
    let cache = Arc::new(RecordingCache::new());
    let service =
        AuthenticationService::new(Arc::clone(&engine), Arc::clone(&cache), relying_party());

    let cache_key = uuid::Uuid::new_v4().to_string();
    let credential_id = vec![0x2A; 16];
    let credential = alice_credential(&credential_id);

    // Options are cached for twice the 60 second ceremony window
    let options = service
        .begin(&cache_key, "preferred", &[credential.clone()])
        .await
        .unwrap();
    assert_eq!(options.timeout, Some(60000));

    let stores = cache.stores();
    assert_eq!(stores.len(), 1);
    assert_eq!(stores[0].key, format!("authn:{cache_key}"));
    assert_eq!(stores[0].ttl, Duration::from_secs(120));

    // Finish verifies against the stored challenge and moves the counter
    let response = assertion_response_json(&credential_id);
    let verified = service
        .finish(&cache_key, &credential, &response)
        .await
        .unwrap();
    assert_eq!(verified.credential_id, credential_id);
    assert_eq!(verified.new_sign_count, 42);
    assert_eq!(verified.username, "alice");

    let verifications = engine.assertion_verifications();
    assert_eq!(verifications.len(), 1);
    assert_eq!(verifications[0].expected_challenge, options.challenge);
    assert_eq!(verifications[0].expected_origin, "https://example.org");

    // The ceremony is spent; a replay finds nothing
    let err = service
        .finish(&cache_key, &credential, &response)
        .await
        .unwrap_err();
    assert!(matches!(err, CeremonyError::MissingCeremonyState(_)));
}

#[tokio::test]
async fn registration_ceremony_produces_a_persistable_credential() {
    init_tracing();

    let engine = Arc::new(
        StubEngine::new()
            .with_aaguid("f24a8e70-d0d3-f82c-2937-32523cc4de5a")
            .with_device_type(CredentialDeviceType::MultiDevice),
    );
    let cache = Arc::new(RecordingCache::new());
    let service =
        RegistrationService::new(Arc::clone(&engine), Arc::clone(&cache), relying_party());

    let cache_key = uuid::Uuid::new_v4().to_string();
    let options = service
        .begin(&cache_key, "alice", "required", &[])
        .await
        .unwrap();
    assert_eq!(options.rp.id, "example.org");
    assert_eq!(cache.stores()[0].key, format!("regn:{cache_key}"));

    let verified = service
        .finish(&cache_key, &attestation_response_json(&[0x77; 16]))
        .await
        .unwrap();
    assert_eq!(verified.credential_id, vec![0x77; 16]);
    assert_eq!(verified.is_discoverable, Some(true));

    // Registration demanded user verification, so finish enforced it
    let verifications = engine.attestation_verifications();
    assert!(verifications[0].require_user_verification);

    // The verdict maps straight onto a stored record with display metadata
    let record = RegisteredCredential::from_verified(&verified, "alice");
    assert_eq!(record.username, "alice");
    assert_eq!(record.device_type, CredentialDeviceType::MultiDevice);
    assert_eq!(
        provider_name(&record.aaguid, record.device_type),
        Some("Apple iCloud Keychain")
    );

    // Same single-use rule as authentication
    let err = service
        .finish(&cache_key, &attestation_response_json(&[0x77; 16]))
        .await
        .unwrap_err();
    assert!(matches!(err, CeremonyError::MissingCeremonyState(_)));
}

#[tokio::test]
async fn options_without_timeout_get_the_default_ttl() {
    init_tracing();

    let engine = Arc::new(StubEngine::new().with_timeout(None));
    let cache = Arc::new(RecordingCache::new());
    let service =
        AuthenticationService::new(Arc::clone(&engine), Arc::clone(&cache), relying_party());

    service.begin("session-no-timeout", "preferred", &[]).await.unwrap();
    assert_eq!(cache.stores()[0].ttl, Duration::from_secs(120));
}

#[tokio::test]
async fn concurrent_finishes_consume_exactly_one_ceremony() {
    init_tracing();

    let engine = Arc::new(StubEngine::new());
    let cache = Arc::new(MemoryCache::new());
    let service = Arc::new(AuthenticationService::new(
        Arc::clone(&engine),
        Arc::clone(&cache),
        relying_party(),
    ));

    let credential_id = vec![0x2A; 16];
    let credential = alice_credential(&credential_id);
    service
        .begin("session-race", "preferred", &[credential.clone()])
        .await
        .unwrap();

    let response = assertion_response_json(&credential_id);
    let first = tokio::spawn({
        let service = Arc::clone(&service);
        let credential = credential.clone();
        let response = response.clone();
        async move { service.finish("session-race", &credential, &response).await }
    });
    let second = tokio::spawn({
        let service = Arc::clone(&service);
        let credential = credential.clone();
        let response = response.clone();
        async move { service.finish("session-race", &credential, &response).await }
    });

    let outcomes = [first.await.unwrap(), second.await.unwrap()];
    let wins = outcomes.iter().filter(|outcome| outcome.is_ok()).count();
    assert_eq!(wins, 1, "exactly one finish may observe the ceremony");
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(CeremonyError::MissingCeremonyState(_)))));
}
