use thiserror::Error;

use crate::engine::EngineError;
use crate::storage::CacheError;
use crate::types::UnknownPolicy;

/// Failures surfaced by the ceremony services.
///
/// None of these are retryable with the same inputs: missing state means the
/// ceremony was already consumed or expired, and everything else is either a
/// bad input or a failure reported by a collaborator.
#[derive(Error, Debug)]
pub enum CeremonyError {
    /// No pending ceremony record for the key: never issued, expired, or
    /// already consumed by an earlier finish.
    #[error("no pending ceremony for cache key {0:?}")]
    MissingCeremonyState(String),

    #[error(transparent)]
    Policy(#[from] UnknownPolicy),

    #[error("malformed client response: {0}")]
    MalformedResponse(#[source] serde_json::Error),

    /// A server-side credential record holds undecodable base64url text.
    #[error("corrupt stored credential: {0}")]
    CorruptCredential(#[from] base64::DecodeError),

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Cache(#[from] CacheError),
}

pub type Result<T> = std::result::Result<T, CeremonyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_state_names_the_key() {
        let err = CeremonyError::MissingCeremonyState("session-42".to_string());
        assert!(err.to_string().contains("session-42"));
    }

    #[test]
    fn test_policy_error_is_transparent() {
        let err = CeremonyError::from(UnknownPolicy("mandatory".to_string()));
        assert_eq!(
            err.to_string(),
            "unknown user verification policy: \"mandatory\""
        );
    }
}
