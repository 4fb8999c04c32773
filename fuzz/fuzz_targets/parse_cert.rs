#![no_main]

use libfuzzer_sys::fuzz_target;
use webid_lib::{parse_cert, DigestAlgorithm};

fuzz_target!(|data: &[u8]| {
    // The parser must never panic, regardless of input.
    if let Ok(cert) = parse_cert(data) {
        let _ = cert.subject_string();
        let _ = cert.issuer_string();
        let _ = cert.fingerprint(DigestAlgorithm::Sha256);
        let _ = cert.modulus_hex();
        let _ = cert.subject_alt_name_string();

        let _ = webid_lib::extract_identity_uris(&cert);
        let _ = webid_lib::extract_public_key(&cert);
        let _ = webid_lib::is_public_key_well_formed(&cert.public_key);
        let _ = webid_lib::check_validity_window(&cert, 0);
        let _ = webid_lib::check_no_other_critical_extensions(&cert);

        let _ = webid_lib::display_certificate(&cert, 0);
        let _ = webid_lib::to_json(&cert);
    }
});
