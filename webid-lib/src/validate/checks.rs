//! Atomic checks and the reporting fields attached to every result.

use super::session::ValidationSession;
use super::{CheckInput, ValidateOptions};
use crate::catalog::{CheckId, CheckSpec, InfoSource};
use crate::check::{
    check_no_other_critical_extensions, check_validity_window, extract_identity_uris,
    extract_public_key, is_public_key_well_formed,
};
use crate::credentials::extract_claims;
use crate::fields::{DateTime, DigestAlgorithm};
use crate::fingerprint::labelled_fingerprint;
use crate::parser::parse_cert;
use crate::profile::ProfileStore;
use crate::result::TestResult;
use tracing::debug;

/// Run an atomic or terminal check and return its verdict.
///
/// Side effects on the session (parsed certificate, identity URIs, fetched
/// documents, extracted claims) happen here, in check order.
pub(crate) fn run_atomic<S: ProfileStore + ?Sized>(
    id: CheckId,
    session: &mut ValidationSession,
    store: &S,
    input: &mut CheckInput<'_>,
    options: &ValidateOptions,
) -> bool {
    match id {
        CheckId::CertificateProvided => certificate_provided(session, input.certificate),
        CheckId::CertificateProvidedSan => {
            let Some(cert) = session.certificate() else {
                return false;
            };
            let has_san = cert.subject_alt_name().is_some();
            let uris = extract_identity_uris(cert);
            debug!(uris = ?uris, "identity URIs from subjectAltName");
            let passed = has_san && !uris.is_empty();
            session.set_identity_uris(uris);
            passed
        }
        CheckId::CertificateDateOk => session
            .certificate()
            .is_some_and(|c| check_validity_window(c, session.verified_at())),
        CheckId::CertificatePubkeyRecognised => session
            .certificate()
            .is_some_and(|c| is_public_key_well_formed(&c.public_key)),
        CheckId::CertificateCriticalExtensionsOk => session
            .certificate()
            .is_some_and(check_no_other_critical_extensions),
        CheckId::ProfileGet => match input.uri {
            Some(uri) => profile_get(session, store, uri, input, options),
            None => false,
        },
        CheckId::ProfileWellFormed => match input.uri {
            Some(uri) => profile_well_formed(session, store, uri),
            None => false,
        },
        CheckId::PubkeyRsaModulusFunctional => {
            input.key.is_some_and(|k| k.modulus_hex().is_some())
        }
        CheckId::PubkeyRsaModulusLiteral => input.key.is_some_and(|k| k.modulus.literal),
        CheckId::PubkeyRsaExponentFunctional => {
            input.key.is_some_and(|k| k.exponent_value().is_some())
        }
        CheckId::PubkeyRsaExponentLiteral => input.key.is_some_and(|k| k.exponent.literal),
        CheckId::WebidAuthentication => match input.uri {
            Some(uri) => authenticate(session, uri),
            None => false,
        },
        CheckId::CertificateOk
        | CheckId::PubkeyRsaModulus
        | CheckId::PubkeyRsaExponent
        | CheckId::ProfileWellFormedPubkey
        | CheckId::ProfileAllKeysWellFormed
        | CheckId::ProfileOk
        | CheckId::WebidClaim => false,
    }
}

fn certificate_provided(session: &mut ValidationSession, bytes: Option<&[u8]>) -> bool {
    let Some(bytes) = bytes.filter(|b| !b.is_empty()) else {
        debug!("no certificate supplied");
        return false;
    };
    match parse_cert(bytes) {
        Ok(cert) => {
            session.set_certificate(cert);
            true
        }
        Err(e) => {
            debug!(error = %e, "certificate could not be parsed");
            session.set_certificate_error(e.to_string());
            false
        }
    }
}

fn profile_get<S: ProfileStore + ?Sized>(
    session: &mut ValidationSession,
    store: &S,
    uri: &str,
    input: &mut CheckInput<'_>,
    options: &ValidateOptions,
) -> bool {
    let fetched = match input.prefetched.take() {
        Some(result) => result,
        None => store.fetch(uri, options.preferred_format),
    };
    match fetched {
        Ok(document) => {
            debug!(uri, document = %document.uri, media_type = %document.media_type, "profile retrieved");
            session.store_document(uri, document);
            true
        }
        Err(e) => {
            debug!(uri, error = %e, "profile not retrieved");
            session.store_fetch_failure(uri, e);
            false
        }
    }
}

fn profile_well_formed<S: ProfileStore + ?Sized>(
    session: &mut ValidationSession,
    store: &S,
    uri: &str,
) -> bool {
    let Some(document) = session.document(uri) else {
        return false;
    };
    match store.parse(document) {
        Ok(graph) => {
            let claims = extract_claims(&graph, uri);
            debug!(uri, triples = graph.len(), claims = claims.len(), "profile parsed");
            session.store_profile(uri, graph, claims);
            true
        }
        Err(e) => {
            debug!(uri, error = %e, "profile could not be parsed");
            session.store_parse_failure(uri, e.to_string());
            false
        }
    }
}

/// The certificate key is among the well-formed keys published for `uri`.
fn authenticate(session: &ValidationSession, uri: &str) -> bool {
    let Some(cert_key) = session.certificate().and_then(extract_public_key) else {
        return false;
    };
    let matched = session.keys(uri).is_some_and(|keys| keys.contains(&cert_key));
    debug!(uri, key = %cert_key, matched, "compared certificate key with profile keys");
    matched
}

/// Build the result record for `spec`, filling the fields its reporting
/// descriptor names.
pub(crate) fn report(
    spec: &CheckSpec,
    passed: bool,
    session: &ValidationSession,
    input: &CheckInput<'_>,
) -> TestResult {
    let field = |source: Option<InfoSource>| source.and_then(|s| describe(s, session, input));
    TestResult {
        check: spec.id,
        order: spec.order,
        passed,
        pointer: field(spec.reporting.pointer),
        subject: field(spec.reporting.subject),
        details: field(spec.reporting.details),
        uri: input.uri.map(str::to_string),
        pubkey: input.key.cloned(),
    }
}

fn describe(source: InfoSource, session: &ValidationSession, input: &CheckInput<'_>) -> Option<String> {
    let cert = session.certificate();
    let profile_uri = input.uri;
    match source {
        InfoSource::Certificate => {
            cert.map(|c| labelled_fingerprint(&c.raw_der, DigestAlgorithm::Sha256))
        }
        InfoSource::SubjectAltName => cert.and_then(|c| c.subject_alt_name_string()),
        InfoSource::VerificationTime => {
            Some(DateTime::from_timestamp(session.verified_at()).to_string())
        }
        InfoSource::CertificatePubkey => cert.and_then(extract_public_key).map(|k| k.to_string()),
        InfoSource::Profile => profile_uri.map(|uri| {
            session
                .document(uri)
                .map_or_else(|| uri.to_string(), |d| d.uri.clone())
        }),
        InfoSource::ProfileGraph => profile_uri
            .and_then(|uri| session.graph(uri))
            .map(|g| g.to_ntriples()),
        InfoSource::ResponseStatus => {
            let uri = profile_uri?;
            if let Some(document) = session.document(uri) {
                Some(format!("response status code: {}", document.status))
            } else {
                let failure = session.fetch_failure(uri)?;
                Some(match failure.status() {
                    Some(status) => format!("response status code: {}", status),
                    None => failure.to_string(),
                })
            }
        }
        InfoSource::KeyUnderTest => input.key.map(|k| k.to_string()),
    }
}
