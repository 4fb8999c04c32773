//! Certificate fingerprints, used to point audit records at the certificate
//! that was presented.

use crate::fields::DigestAlgorithm;
use crate::util;
use digest::Digest;

impl DigestAlgorithm {
    /// Label used in audit pointers, e.g. "SHA-256".
    pub fn label(self) -> &'static str {
        match self {
            DigestAlgorithm::Sha256 => "SHA-256",
            DigestAlgorithm::Sha384 => "SHA-384",
            DigestAlgorithm::Sha512 => "SHA-512",
            DigestAlgorithm::Sha1 => "SHA-1",
        }
    }
}

/// Compute the fingerprint of DER-encoded certificate bytes.
///
/// Returns a colon-separated uppercase hex string (e.g., "AB:CD:EF:...").
pub fn compute_fingerprint(der_bytes: &[u8], algorithm: DigestAlgorithm) -> String {
    let digest = match algorithm {
        DigestAlgorithm::Sha256 => sha2::Sha256::digest(der_bytes).to_vec(),
        DigestAlgorithm::Sha384 => sha2::Sha384::digest(der_bytes).to_vec(),
        DigestAlgorithm::Sha512 => sha2::Sha512::digest(der_bytes).to_vec(),
        DigestAlgorithm::Sha1 => sha1::Sha1::digest(der_bytes).to_vec(),
    };
    util::hex_colon_upper(&digest)
}

/// Fingerprint prefixed with its algorithm label ("SHA-256 AB:CD:...").
pub(crate) fn labelled_fingerprint(der_bytes: &[u8], algorithm: DigestAlgorithm) -> String {
    format!(
        "{} {}",
        algorithm.label(),
        compute_fingerprint(der_bytes, algorithm)
    )
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn sha256_of_empty_input() {
        let fp = compute_fingerprint(b"", DigestAlgorithm::Sha256);
        assert!(fp.starts_with("E3:B0:C4:42"));
        assert_eq!(fp.split(':').count(), 32);
    }

    #[test]
    fn labelled_form_names_algorithm() {
        let fp = labelled_fingerprint(b"", DigestAlgorithm::Sha1);
        assert!(fp.starts_with("SHA-1 DA:39:A3:EE"));
    }
}
