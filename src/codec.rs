//! Base64url codec for binary wire fields
//!
//! WebAuthn carries raw bytes (challenges, credential ids, authenticator
//! payloads) as unpadded base64url text in JSON. The serde adapters here are
//! attached with `#[serde(with = ...)]` to exactly those fields, so the typed
//! structs hold decoded bytes while the wire stays text.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;

/// Base64url encode bytes (unpadded)
pub fn base64url_encode(bytes: impl AsRef<[u8]>) -> String {
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Decode unpadded base64url text back to bytes
pub fn base64url_decode(text: &str) -> Result<Vec<u8>, base64::DecodeError> {
    URL_SAFE_NO_PAD.decode(text)
}

/// Serde adapter for required `Vec<u8>` fields carried as base64url text
pub mod base64url {
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::base64url_encode(bytes))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Vec<u8>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let text = String::deserialize(deserializer)?;
        super::base64url_decode(&text).map_err(serde::de::Error::custom)
    }

    /// Variant for `Option<Vec<u8>>` fields (e.g. the assertion user handle)
    pub mod option {
        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
        where
            S: Serializer,
        {
            match bytes {
                Some(bytes) => serializer.serialize_some(&crate::codec::base64url_encode(bytes)),
                None => serializer.serialize_none(),
            }
        }

        pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
        where
            D: Deserializer<'de>,
        {
            let text: Option<String> = Option::deserialize(deserializer)?;
            text.map(|text| {
                crate::codec::base64url_decode(&text).map_err(serde::de::Error::custom)
            })
            .transpose()
        }
    }
}
