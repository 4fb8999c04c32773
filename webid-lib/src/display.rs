//! Human-readable and JSON formatting of certificates and validation outcomes.

use crate::check::{days_to_expiry, extract_identity_uris};
use crate::fields::{Certificate, DigestAlgorithm, Extension, ExtensionValue};
use crate::result::{TestResult, ValidationOutcome};
use crate::WebidError;
use serde::Serialize;

/// Format the parts of a certificate WebID verification looks at.
///
/// `now` (Unix seconds) is used for the days-to-expiry line.
pub fn display_certificate(cert: &Certificate, now: i64) -> String {
    let mut out = String::new();

    out.push_str("Certificate:\n");
    out.push_str(&format!("  Serial: {}\n", cert.serial));
    out.push_str(&format!("  Subject: {}\n", cert.subject_string()));
    out.push_str(&format!("  Issuer: {}\n", cert.issuer_string()));
    out.push_str("  Validity:\n");
    out.push_str(&format!("    Not Before: {}\n", cert.not_before));
    out.push_str(&format!("    Not After:  {}\n", cert.not_after));
    let days = days_to_expiry(cert, now);
    if days < 0 {
        out.push_str(&format!("    Expired {} day(s) ago\n", -days));
    } else {
        out.push_str(&format!("    Expires in {} day(s)\n", days));
    }

    out.push_str("  Public Key:\n");
    out.push_str(&format!("    Algorithm: {}", cert.public_key.algorithm));
    if let Some(bits) = cert.public_key.key_size {
        out.push_str(&format!(" ({} bit)", bits));
    }
    out.push('\n');
    if let Some(modulus) = &cert.public_key.modulus {
        out.push_str(&format!("    Modulus: {}\n", modulus));
    }
    if let Some(exponent) = cert.public_key.exponent {
        out.push_str(&format!("    Exponent: {}\n", exponent));
    }

    let uris = extract_identity_uris(cert);
    if uris.is_empty() {
        out.push_str("  Identity URIs: (none)\n");
    } else {
        out.push_str("  Identity URIs:\n");
        for uri in &uris {
            out.push_str(&format!("    {}\n", uri));
        }
    }

    if !cert.extensions.is_empty() {
        out.push_str("  Extensions:\n");
        for ext in &cert.extensions {
            format_extension(&mut out, ext);
        }
    }

    out.push_str(&format!(
        "  Fingerprint (SHA-256): {}\n",
        cert.fingerprint(DigestAlgorithm::Sha256)
    ));

    out
}

fn format_extension(out: &mut String, ext: &Extension) {
    let critical_str = if ext.critical { " [critical]" } else { "" };

    match &ext.value {
        ExtensionValue::BasicConstraints { ca, path_len } => {
            let pl = match path_len {
                Some(n) => format!(", pathlen:{}", n),
                None => String::new(),
            };
            out.push_str(&format!(
                "    Basic Constraints:{} CA={}{}\n",
                critical_str, ca, pl
            ));
        }
        ExtensionValue::ExtendedKeyUsage(usages) => {
            out.push_str(&format!(
                "    Extended Key Usage:{} {}\n",
                critical_str,
                usages.join(", ")
            ));
        }
        ExtensionValue::SubjectAltName(entries) => {
            out.push_str(&format!("    Subject Alternative Name:{}\n", critical_str));
            for entry in entries {
                out.push_str(&format!("      {}\n", entry));
            }
        }
        ExtensionValue::Raw(hex) => {
            out.push_str(&format!("    {} ({}):{}", ext.name, ext.oid, critical_str));
            match hex.get(..40) {
                Some(prefix) if hex.len() > 40 => out.push_str(&format!(" {}...\n", prefix)),
                _ => out.push_str(&format!(" {}\n", hex)),
            }
        }
    }
}

/// Format the verdict and the ordered result trail of a run.
pub fn display_outcome(outcome: &ValidationOutcome) -> String {
    let mut out = String::new();

    match &outcome.matched_uri {
        Some(uri) => out.push_str(&format!("WebID validated: {}\n", uri)),
        None => out.push_str("WebID NOT validated\n"),
    }
    if let Some(info) = outcome.profile_info().filter(|info| !info.is_empty()) {
        out.push_str("  Profile:\n");
        let fields = [
            ("Name", &info.name),
            ("Nick", &info.nick),
            ("Mailbox", &info.mbox),
            ("Given name", &info.given_name),
            ("Family name", &info.family_name),
        ];
        for (label, value) in fields {
            if let Some(value) = value {
                out.push_str(&format!("    {}: {}\n", label, value));
            }
        }
    }
    out.push_str(&format!("  Mode: {}\n", outcome.session.mode()));
    if let Some(error) = outcome.session.certificate_error() {
        out.push_str(&format!("  Certificate error: {}\n", error));
    }
    for uri in outcome.session.identity_uris() {
        if let Some(error) = outcome.session.profile_error(uri) {
            out.push_str(&format!("  Profile error for {}: {}\n", uri, error));
        }
    }

    out.push_str("  Checks:\n");
    for result in outcome.trail() {
        format_result(&mut out, result);
    }
    out
}

fn format_result(out: &mut String, result: &TestResult) {
    let status = if result.passed { "PASS" } else { "FAIL" };
    out.push_str(&format!("    [{}] {:>2} {}", status, result.order, result.check));
    if let Some(uri) = &result.uri {
        out.push_str(&format!(" <{}>", uri));
    }
    out.push('\n');
    if let Some(key) = &result.pubkey {
        out.push_str(&format!("           key: {}\n", key));
    }
    if let Some(details) = &result.details {
        out.push_str(&format!("           {}\n", details));
    }
}

/// Serialize any result type to a pretty-printed JSON string.
pub fn to_json<T: Serialize + ?Sized>(value: &T) -> Result<String, WebidError> {
    serde_json::to_string_pretty(value).map_err(WebidError::Json)
}
