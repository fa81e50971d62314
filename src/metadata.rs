//! Authenticator provider metadata
//!
//! Maps AAGUIDs to human-readable provider names for display next to a
//! registered credential. Synced passkey providers and device-bound security
//! keys publish AAGUIDs in disjoint sets, so the lookup is split by
//! credential device type; a miss falls through to the other table since
//! providers occasionally report the unexpected type.

use crate::credential::CredentialDeviceType;

/// Authenticators that conceal their model report an all-zero AAGUID
const ZERO_AAGUID: &str = "00000000-0000-0000-0000-000000000000";

/// Synced passkey providers (multi-device credentials)
static PASSKEY_PROVIDERS: &[(&str, &str)] = &[
    ("f24a8e70-d0d3-f82c-2937-32523cc4de5a", "Apple iCloud Keychain"),
    ("adce0002-35bc-c60a-648b-0b25f1f05503", "Google Password Manager"),
    ("bada5566-a7aa-401f-bd96-45619a55120d", "1Password"),
    ("d548826e-79b4-db40-a3d8-11116f7e8349", "Dashlane"),
    ("53414d53-554e-4700-0000-000000000000", "Samsung Pass"),
];

/// Device-bound authenticators (single-device credentials)
static SECURITY_KEYS: &[(&str, &str)] = &[
    ("2fc0579f-8113-47ea-b116-bb5a8db9202a", "YubiKey 5 NFC"),
    ("c5ef55ff-ad9a-4b9f-b580-adebafe026d0", "YubiKey 5Ci"),
    ("fa2b99dc-9e39-4257-8f92-4a30d23c4118", "YubiKey 5 FIPS"),
    ("73bb0cd4-e502-49b8-9c6f-b59445bf720b", "YubiKey 5 Bio"),
    ("ea9b8d66-4d01-1d21-3ce4-b6b48cb575d4", "Google Titan Security Key"),
    ("77010bd7-212a-4fc9-b236-d2ca5e9d4084", "Feitian BioPass K27"),
    ("3e22415d-7fdf-4ea4-8a0c-dd60c4249b9d", "Feitian ePass FIDO2"),
    ("6028b017-b1d4-4c02-b4b3-afcdafc96bb2", "Windows Hello"),
    ("08987058-cadc-4b81-b6e1-30de50dcbe96", "Windows Hello Hardware"),
];

/// Provider name for an AAGUID, or `None` when the model is unknown or
/// concealed
pub fn provider_name(aaguid: &str, device_type: CredentialDeviceType) -> Option<&'static str> {
    if aaguid == ZERO_AAGUID {
        return None;
    }

    let (preferred, fallback) = match device_type {
        CredentialDeviceType::MultiDevice => (PASSKEY_PROVIDERS, SECURITY_KEYS),
        CredentialDeviceType::SingleDevice => (SECURITY_KEYS, PASSKEY_PROVIDERS),
    };

    lookup(preferred, aaguid).or_else(|| lookup(fallback, aaguid))
}

fn lookup(table: &[(&'static str, &'static str)], aaguid: &str) -> Option<&'static str> {
    table
        .iter()
        .find(|(known, _)| *known == aaguid)
        .map(|(_, name)| *name)
}
