//! Certificate inspection: identity URIs, public key, validity window and
//! critical-extension checks.

use crate::fields::{Certificate, PublicKeyInfo, SanEntry};
use crate::oid;
use crate::pubkey::PublicKey;

/// Identity URIs asserted in the Subject Alternative Name extension.
///
/// URIs keep their SAN order; repeated entries are dropped after the first
/// occurrence. Returns an empty list when the extension is absent.
pub fn extract_identity_uris(cert: &Certificate) -> Vec<String> {
    let mut uris: Vec<String> = Vec::new();
    for entry in cert.subject_alt_name().unwrap_or_default() {
        if let SanEntry::Uri(uri) = entry {
            if !uris.contains(uri) {
                uris.push(uri.clone());
            }
        }
    }
    uris
}

/// The certificate's RSA public key, if both modulus and exponent were recognised.
pub fn extract_public_key(cert: &Certificate) -> Option<PublicKey> {
    let info = &cert.public_key;
    match (&info.modulus, info.exponent) {
        (Some(modulus), Some(exponent)) => Some(PublicKey::new(modulus, exponent)),
        _ => None,
    }
}

/// True iff both modulus and exponent were extracted from the key.
pub fn is_public_key_well_formed(info: &PublicKeyInfo) -> bool {
    info.modulus.is_some() && info.exponent.is_some()
}

/// True iff `not_before < now < not_after` (Unix seconds).
pub fn check_validity_window(cert: &Certificate, now: i64) -> bool {
    cert.not_before.timestamp < now && now < cert.not_after.timestamp
}

/// True iff no critical extension other than subjectAltName is present.
pub fn check_no_other_critical_extensions(cert: &Certificate) -> bool {
    cert.critical_extensions()
        .all(|ext| ext.oid == oid::EXT_SUBJECT_ALT_NAME)
}

/// Whole days until `not_after`; negative once the certificate has expired.
pub fn days_to_expiry(cert: &Certificate, now: i64) -> i64 {
    (cert.not_after.timestamp - now).div_euclid(86_400)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::fields::{DateTime, DistinguishedName, Extension, ExtensionValue};

    fn cert_with(extensions: Vec<Extension>, modulus: Option<&str>, exponent: Option<u64>) -> Certificate {
        Certificate {
            version: 3,
            serial: "01".into(),
            issuer: DistinguishedName { components: vec![] },
            subject: DistinguishedName { components: vec![] },
            not_before: DateTime::from_timestamp(1_000),
            not_after: DateTime::from_timestamp(2_000),
            public_key: PublicKeyInfo {
                algorithm: "RSA".into(),
                key_size: Some(16),
                modulus: modulus.map(str::to_string),
                exponent,
            },
            extensions,
            raw_der: vec![],
        }
    }

    fn san(entries: Vec<SanEntry>, critical: bool) -> Extension {
        Extension {
            oid: oid::EXT_SUBJECT_ALT_NAME.into(),
            name: "Subject Alternative Name".into(),
            critical,
            value: ExtensionValue::SubjectAltName(entries),
        }
    }

    #[test]
    fn identity_uris_keep_san_order_without_duplicates() {
        let cert = cert_with(
            vec![san(
                vec![
                    SanEntry::Uri("https://b.example/#me".into()),
                    SanEntry::Dns("b.example".into()),
                    SanEntry::Uri("https://a.example/#me".into()),
                    SanEntry::Uri("https://b.example/#me".into()),
                ],
                false,
            )],
            None,
            None,
        );
        assert_eq!(
            extract_identity_uris(&cert),
            vec!["https://b.example/#me", "https://a.example/#me"]
        );
    }

    #[test]
    fn identity_uris_empty_without_san() {
        let cert = cert_with(vec![], None, None);
        assert!(extract_identity_uris(&cert).is_empty());
    }

    #[test]
    fn validity_window_is_exclusive() {
        let cert = cert_with(vec![], None, None);
        assert!(!check_validity_window(&cert, 1_000));
        assert!(check_validity_window(&cert, 1_500));
        assert!(!check_validity_window(&cert, 2_000));
    }

    #[test]
    fn critical_san_is_allowed_other_critical_is_not() {
        let ok = cert_with(vec![san(vec![], true)], None, None);
        assert!(check_no_other_critical_extensions(&ok));

        let bc = Extension {
            oid: oid::EXT_BASIC_CONSTRAINTS.into(),
            name: "Basic Constraints".into(),
            critical: true,
            value: ExtensionValue::BasicConstraints { ca: false, path_len: None },
        };
        let bad = cert_with(vec![san(vec![], false), bc], None, None);
        assert!(!check_no_other_critical_extensions(&bad));
    }

    #[test]
    fn public_key_requires_both_parts() {
        let full = cert_with(vec![], Some("AB01"), Some(65537));
        assert!(is_public_key_well_formed(&full.public_key));
        assert_eq!(extract_public_key(&full), Some(PublicKey::new("ab01", 65537)));

        let partial = cert_with(vec![], Some("ab01"), None);
        assert!(!is_public_key_well_formed(&partial.public_key));
        assert_eq!(extract_public_key(&partial), None);
    }

    #[test]
    fn days_to_expiry_goes_negative() {
        let cert = cert_with(vec![], None, None);
        assert_eq!(days_to_expiry(&cert, 2_000 - 86_400 * 3), 3);
        assert_eq!(days_to_expiry(&cert, 2_001), -1);
    }
}
