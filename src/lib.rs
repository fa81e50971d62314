//! Passkey Flow - cache-backed WebAuthn ceremony orchestration
//!
//! This crate is the service layer between a web application and a WebAuthn
//! protocol library: it issues ceremony options, parks them in a cache across
//! the client round trip, and feeds the response back to the library for
//! verification. The cryptography lives behind the [`CeremonyEngine`] port
//! and the cache technology behind [`ChallengeCache`]; what lives here is the
//! state handling that makes ceremonies single-use:
//!
//! - typed wire schema with base64url codecs on exactly the binary fields
//! - TTL derivation from the ceremony timeout (twice the client window)
//! - atomic consume-before-verify, so a challenge can never be replayed
//! - strict user-verification policy parsing and gating
//!
//! # Example
//!
//! ```no_run
//! use passkey_flow::{AuthenticationService, CeremonyEngine, MemoryCache, RelyingParty};
//!
//! # async fn example<E: CeremonyEngine>(engine: E) -> passkey_flow::Result<()> {
//! let rp = RelyingParty::new("example.org", "Example", "https://example.org")
//!     .expect("valid RP configuration");
//! let service = AuthenticationService::new(engine, MemoryCache::new(), rp);
//!
//! // Issue options; the challenge is cached under the session key
//! let options = service.begin("session-abc", "preferred", &[]).await?;
//!
//! // ...client ceremony happens, then:
//! // let verified = service.finish("session-abc", &credential, &response).await?;
//! # let _ = options;
//! # Ok(())
//! # }
//! ```

pub mod authentication;
pub mod codec;
pub mod config;
pub mod credential;
pub mod engine;
pub mod error;
pub mod metadata;
pub mod registration;
pub mod storage;
pub mod types;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types for convenience
pub use authentication::{AuthenticationService, VerifiedAuthentication};
pub use config::{ConfigError, RelyingParty};
pub use credential::{CredentialDeviceType, RegisteredCredential};
pub use engine::{
    AssertionRequest, AssertionVerification, AttestationRequest, AttestationVerification,
    CeremonyEngine, EngineError, VerifiedAssertion, VerifiedAttestation,
};
pub use error::{CeremonyError, Result};
pub use metadata::provider_name;
pub use registration::{RegistrationService, VerifiedRegistration};
pub use storage::{CacheError, ChallengeCache, MemoryCache, OptionsCache};
pub use types::{
    AuthenticationOptions, AuthenticationResponse, AuthenticatorTransport, CredentialDescriptor,
    RegistrationOptions, RegistrationResponse, UnknownPolicy, UserVerificationPolicy,
};
