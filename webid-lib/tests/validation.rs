#![allow(
    clippy::expect_used,
    clippy::unwrap_used,
    clippy::panic,
    clippy::indexing_slicing
)]
//! End-to-end validation runs over OpenSSL-generated certificates and
//! identity documents served from a `StaticProfileStore`.
//!
//! Fixtures in `tests/data/`:
//! - `alice.pem`: RSA, critical SAN listing `https://alice.example/card#me`,
//!   `https://bob.example/profile#i`, a DNS name and a repeated URI.
//! - `alice_card.rdf`: publishes a different key and a malformed key.
//! - `bob_profile.rdf`: publishes alice's key (uppercase hex, `00` prefix,
//!   split over two lines).
//! - `critical_ext.pem` / `crit_card.html`: RSA with a critical
//!   basicConstraints extension, and its XHTML+RDFa profile.
//! - `crit_card_xhtml.html`: the same key in an XHTML+RDFa 1.0 document with
//!   a DOCTYPE, XHTML named entities and FOAF naming properties.
//! - `ec.pem`, `no_san.pem`, `dns_only_san.pem`.

use std::path::PathBuf;
use std::sync::Arc;
use webid_lib::*;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

const ALICE_URI: &str = "https://alice.example/card#me";
const BOB_URI: &str = "https://bob.example/profile#i";
const CRIT_URI: &str = "https://crit.example/card#me";

/// Inside every fixture's validity window (2033).
const IN_VALIDITY: i64 = 2_000_000_000;

/// Later than every fixture's notAfter (2126).
const FAR_FUTURE: i64 = 5_000_000_000;

fn data(name: &str) -> Vec<u8> {
    let mut p = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
    p.push("tests");
    p.push("data");
    p.push(name);
    std::fs::read(&p).unwrap_or_else(|e| panic!("reading {}: {}", p.display(), e))
}

fn store() -> StaticProfileStore {
    StaticProfileStore::new()
        .with_document("https://alice.example/card", "application/rdf+xml", data("alice_card.rdf"))
        .with_document("https://bob.example/profile", "application/rdf+xml", data("bob_profile.rdf"))
        .with_document(
            "https://crit.example/card",
            "application/xhtml+xml; charset=utf-8",
            data("crit_card.html"),
        )
}

fn options(mode: Mode) -> ValidateOptions {
    ValidateOptions {
        mode,
        at_time: Some(IN_VALIDITY),
        ..ValidateOptions::default()
    }
}

fn engine_with(store: StaticProfileStore, options: ValidateOptions) -> ValidationEngine<StaticProfileStore> {
    let catalog = Arc::new(TestCatalog::bundled().unwrap());
    ValidationEngine::new(catalog, store, options)
}

fn engine(mode: Mode) -> ValidationEngine<StaticProfileStore> {
    engine_with(store(), options(mode))
}

fn passed(outcome: &ValidationOutcome, check: CheckId, uri: &str) -> Option<bool> {
    outcome
        .session
        .results()
        .last_for_uri(check, uri)
        .map(|r| r.passed)
}

// ---------------------------------------------------------------------------
// Modes
// ---------------------------------------------------------------------------

#[test]
fn firstmatch_matches_second_uri_after_first_fails() {
    let engine = engine(Mode::FirstMatch);
    let outcome = engine.validate(Some(&data("alice.pem")));

    assert!(outcome.validated);
    assert_eq!(outcome.matched_uri.as_deref(), Some(BOB_URI));
    assert_eq!(outcome.session.validated_uri(), Some(BOB_URI));

    // The first URI ran to its terminal check and failed it.
    assert_eq!(passed(&outcome, CheckId::WebidAuthentication, ALICE_URI), Some(false));
    assert_eq!(passed(&outcome, CheckId::WebidAuthentication, BOB_URI), Some(true));

    // The run stopped on the terminal pass.
    let last = outcome.trail().last().unwrap();
    assert_eq!(last.check, CheckId::WebidAuthentication);
    assert!(last.passed);
    assert_eq!(
        engine.store().requests(),
        vec![ALICE_URI.to_string(), BOB_URI.to_string()]
    );
}

#[test]
fn identity_uris_keep_san_order_without_repeats() {
    let outcome = engine(Mode::Exhaustive).validate(Some(&data("alice.pem")));
    assert_eq!(
        outcome.session.identity_uris(),
        &[ALICE_URI.to_string(), BOB_URI.to_string()]
    );
}

#[test]
fn strict_halts_on_expired_certificate_before_any_fetch() {
    let engine = engine_with(
        store(),
        ValidateOptions {
            at_time: Some(FAR_FUTURE),
            ..options(Mode::Strict)
        },
    );
    let outcome = engine.validate(Some(&data("alice.pem")));

    assert!(!outcome.validated);
    assert!(outcome.matched_uri.is_none());
    assert!(engine.store().requests().is_empty());

    let last = outcome.trail().last().unwrap();
    assert_eq!(last.check, CheckId::CertificateDateOk);
    assert!(!last.passed);
    assert_eq!(outcome.trail().len(), 3);
}

#[test]
fn certificate_not_yet_valid_fails_date_check() {
    let engine = engine_with(
        store(),
        ValidateOptions {
            at_time: Some(0),
            ..options(Mode::FirstMatch)
        },
    );
    let outcome = engine.validate(Some(&data("alice.pem")));
    let date = outcome
        .session
        .results()
        .for_check(CheckId::CertificateDateOk)
        .next()
        .unwrap();
    assert!(!date.passed);
    assert_eq!(date.details.as_deref(), Some("1970-01-01T00:00:00Z"));
}

#[test]
fn strict_halts_on_malformed_key_in_first_document() {
    let engine = engine(Mode::Strict);
    let outcome = engine.validate(Some(&data("alice.pem")));

    assert!(!outcome.validated);
    assert!(outcome.session.validated_uri().is_none());
    let last = outcome.trail().last().unwrap();
    assert_eq!(last.check, CheckId::PubkeyRsaModulusFunctional);
    assert!(!last.passed);
    assert_eq!(engine.store().requests(), vec![ALICE_URI.to_string()]);
}

#[test]
fn exhaustive_runs_every_uri_and_key() {
    let engine = engine(Mode::Exhaustive);
    let outcome = engine.validate(Some(&data("alice.pem")));

    assert!(outcome.validated);
    assert_eq!(outcome.matched_uri.as_deref(), Some(BOB_URI));

    let log = outcome.session.results();
    assert_eq!(log.for_check(CheckId::WebidAuthentication).count(), 2);
    // Two keys in alice's card, one in bob's profile.
    assert_eq!(log.for_check(CheckId::ProfileWellFormedPubkey).count(), 3);
    assert_eq!(outcome.session.claimed_keys(ALICE_URI).len(), 2);
    assert_eq!(outcome.session.claimed_keys(BOB_URI).len(), 1);
}

#[test]
fn exhaustive_keeps_first_uri_when_a_later_one_fails() {
    // Alice's URI serves the document holding her key; Bob's does not.
    let store = StaticProfileStore::new()
        .with_document("https://alice.example/card", "application/rdf+xml", data("bob_profile.rdf"))
        .with_document("https://bob.example/profile", "application/rdf+xml", data("alice_card.rdf"));
    let outcome = engine_with(store, options(Mode::Exhaustive)).validate(Some(&data("alice.pem")));

    assert!(outcome.validated);
    assert_eq!(outcome.matched_uri.as_deref(), Some(ALICE_URI));
    assert_eq!(outcome.session.validated_uri(), Some(ALICE_URI));
    assert_eq!(passed(&outcome, CheckId::WebidAuthentication, ALICE_URI), Some(true));
    assert_eq!(passed(&outcome, CheckId::WebidAuthentication, BOB_URI), Some(false));
    // The later failure is the last terminal result in the trail.
    let last = outcome
        .session
        .results()
        .for_check(CheckId::WebidAuthentication)
        .last()
        .unwrap();
    assert_eq!(last.uri.as_deref(), Some(BOB_URI));
    assert!(!last.passed);
}

#[test]
fn exhaustive_verdict_is_false_when_no_uri_authenticates() {
    let store = StaticProfileStore::new().with_document(
        "https://alice.example/card",
        "application/rdf+xml",
        data("alice_card.rdf"),
    );
    let engine = engine_with(
        store,
        options(Mode::Exhaustive),
    );
    let outcome = engine.validate(Some(&data("alice.pem")));

    assert!(!outcome.validated);
    assert!(outcome.matched_uri.is_none());
    assert_eq!(passed(&outcome, CheckId::ProfileGet, BOB_URI), Some(false));
    assert_eq!(passed(&outcome, CheckId::WebidAuthentication, BOB_URI), Some(false));
    assert!(outcome.session.profile_error(BOB_URI).is_some());
}

#[test]
fn parallel_fetch_gives_the_sequential_verdict() {
    for mode in [Mode::FirstMatch, Mode::Exhaustive] {
        let sequential = engine(mode).validate(Some(&data("alice.pem")));
        let parallel = engine_with(
            store(),
            ValidateOptions {
                parallel_fetch: true,
                fetch_workers: 2,
                ..options(mode)
            },
        )
        .validate(Some(&data("alice.pem")));

        assert_eq!(parallel.validated, sequential.validated);
        assert_eq!(parallel.matched_uri, sequential.matched_uri);
        let checks = |o: &ValidationOutcome| {
            o.trail()
                .iter()
                .map(|r| (r.check, r.passed, r.uri.clone()))
                .collect::<Vec<_>>()
        };
        assert_eq!(checks(&parallel), checks(&sequential));
    }
}

// ---------------------------------------------------------------------------
// Keys and documents
// ---------------------------------------------------------------------------

#[test]
fn modulus_comparison_ignores_case_and_leading_zeros() {
    let outcome = engine(Mode::Exhaustive).validate(Some(&data("alice.pem")));
    let cert_key = extract_public_key(outcome.session.certificate().unwrap()).unwrap();
    let bob_keys = outcome.session.keys(BOB_URI).unwrap();
    assert!(bob_keys.contains(&cert_key));

    let claimed = &outcome.session.claimed_keys(BOB_URI)[0];
    assert_eq!(claimed.modulus.text, cert_key.modulus());
    assert_eq!(claimed.exponent_value(), Some(65537));
}

#[test]
fn uppercase_document_modulus_authenticates() {
    let cert = parse_cert(&data("alice.pem")).unwrap();
    let modulus = cert.public_key.modulus.clone().unwrap().to_ascii_uppercase();
    let profile = format!(
        r##"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                    xmlns:cert="http://www.w3.org/ns/auth/cert#">
             <rdf:Description rdf:about="https://alice.example/card#me">
               <cert:key rdf:parseType="Resource">
                 <cert:modulus>{}</cert:modulus>
                 <cert:exponent>65537</cert:exponent>
               </cert:key>
             </rdf:Description>
           </rdf:RDF>"##,
        modulus
    );
    let store = StaticProfileStore::new().with_document(
        "https://alice.example/card",
        "application/rdf+xml",
        profile,
    );
    let outcome = engine_with(store, options(Mode::FirstMatch)).validate(Some(&data("alice.pem")));
    assert_eq!(outcome.matched_uri.as_deref(), Some(ALICE_URI));
}

#[test]
fn malformed_key_fails_only_its_own_checks() {
    let outcome = engine(Mode::Exhaustive).validate(Some(&data("alice.pem")));
    let log = outcome.session.results();

    let modulus_checks: Vec<_> = log
        .for_check(CheckId::PubkeyRsaModulusFunctional)
        .filter(|r| r.uri.as_deref() == Some(ALICE_URI))
        .collect();
    assert_eq!(modulus_checks.len(), 2);
    assert!(modulus_checks[0].passed);
    assert!(!modulus_checks[1].passed);
    assert_eq!(
        modulus_checks[1].pubkey.as_ref().map(|k| k.modulus.text.as_str()),
        Some("notamodulus")
    );

    // Literal-ness still holds for the malformed key.
    assert!(log
        .for_check(CheckId::PubkeyRsaModulusLiteral)
        .all(|r| r.passed));

    // The optional all-keys composite fails; the document itself is fine.
    assert_eq!(passed(&outcome, CheckId::ProfileAllKeysWellFormed, ALICE_URI), Some(false));
    assert_eq!(passed(&outcome, CheckId::ProfileOk, ALICE_URI), Some(true));
    assert_eq!(passed(&outcome, CheckId::WebidClaim, ALICE_URI), Some(true));
}

#[test]
fn document_without_keys_fails_the_all_keys_composite() {
    let store = StaticProfileStore::new().with_document(
        "https://alice.example/card",
        "application/rdf+xml",
        r##"<rdf:RDF xmlns:rdf="http://www.w3.org/1999/02/22-rdf-syntax-ns#"
                    xmlns:foaf="http://xmlns.com/foaf/0.1/">
             <foaf:Person rdf:about="#me"><foaf:name>Alice</foaf:name></foaf:Person>
           </rdf:RDF>"##,
    );
    let outcome = engine_with(
        store,
        options(Mode::Exhaustive),
    )
    .validate(Some(&data("alice.pem")));

    assert!(outcome.session.claims(ALICE_URI).is_empty());
    assert_eq!(passed(&outcome, CheckId::ProfileWellFormed, ALICE_URI), Some(true));
    assert_eq!(passed(&outcome, CheckId::ProfileAllKeysWellFormed, ALICE_URI), Some(false));
    assert_eq!(passed(&outcome, CheckId::WebidAuthentication, ALICE_URI), Some(false));
}

#[test]
fn rdfa_profile_authenticates_despite_optional_critical_extension_failure() {
    let outcome = engine(Mode::FirstMatch).validate(Some(&data("critical_ext.pem")));

    assert!(outcome.validated);
    assert_eq!(outcome.matched_uri.as_deref(), Some(CRIT_URI));

    let log = outcome.session.results();
    let critical = log
        .for_check(CheckId::CertificateCriticalExtensionsOk)
        .next()
        .unwrap();
    assert!(!critical.passed);
    assert!(log.for_check(CheckId::CertificateOk).next().unwrap().passed);

    let document = outcome.session.document(CRIT_URI).unwrap();
    assert_eq!(document.media_type, MediaType::XhtmlRdfa);
}

#[test]
fn xhtml_profile_with_named_entities_authenticates() {
    let store = StaticProfileStore::new().with_document(
        "https://crit.example/card",
        "application/xhtml+xml",
        data("crit_card_xhtml.html"),
    );
    let outcome = engine_with(store, options(Mode::FirstMatch)).validate(Some(&data("critical_ext.pem")));

    assert_eq!(passed(&outcome, CheckId::ProfileWellFormed, CRIT_URI), Some(true));
    assert!(outcome.session.profile_error(CRIT_URI).is_none());
    assert!(outcome.validated);
    assert_eq!(outcome.matched_uri.as_deref(), Some(CRIT_URI));

    let info = outcome.profile_info().unwrap();
    assert_eq!(info.uri, CRIT_URI);
    assert_eq!(info.name.as_deref(), Some("Critical\u{a0}Example"));
    assert_eq!(info.nick.as_deref(), Some("crit"));
    assert_eq!(info.mbox.as_deref(), Some("mailto:crit@crit.example"));
    assert_eq!(info.given_name.as_deref(), Some("Critical"));
    assert_eq!(info.family_name.as_deref(), Some("Example"));
}

#[test]
fn malformed_document_fails_well_formed_check() {
    let store = StaticProfileStore::new().with_document(
        "https://alice.example/card",
        "application/rdf+xml",
        "<rdf:RDF><unclosed>",
    );
    let outcome = engine_with(
        store,
        options(Mode::Exhaustive),
    )
    .validate(Some(&data("alice.pem")));

    assert_eq!(passed(&outcome, CheckId::ProfileGet, ALICE_URI), Some(true));
    assert_eq!(passed(&outcome, CheckId::ProfileWellFormed, ALICE_URI), Some(false));
    assert!(outcome.session.profile_error(ALICE_URI).is_some());
    assert!(outcome.session.graph(ALICE_URI).is_none());
}

#[test]
fn unsupported_content_type_fails_profile_get() {
    let store = StaticProfileStore::new().with_document(
        "https://alice.example/card",
        "text/turtle",
        "<#me> a <http://xmlns.com/foaf/0.1/Person> .",
    );
    let outcome = engine_with(store, options(Mode::FirstMatch)).validate(Some(&data("alice.pem")));

    assert!(matches!(
        outcome.session.fetch_failure(ALICE_URI),
        Some(ProfileFetchError::UnsupportedContentType { .. })
    ));
    let get = outcome
        .session
        .results()
        .last_for_uri(CheckId::ProfileGet, ALICE_URI)
        .unwrap();
    assert!(!get.passed);
    assert!(get.details.as_deref().unwrap().contains("text/turtle"));
}

// ---------------------------------------------------------------------------
// Certificates
// ---------------------------------------------------------------------------

#[test]
fn missing_certificate_fails_every_certificate_check() {
    let outcome = engine(Mode::FirstMatch).validate(None);
    assert!(!outcome.validated);
    assert_eq!(outcome.trail().len(), 6);
    assert!(outcome.trail().iter().all(|r| !r.passed));
}

#[test]
fn garbage_certificate_is_reported_not_raised() {
    let outcome = engine(Mode::FirstMatch).validate(Some(b"definitely not a certificate"));
    assert!(!outcome.validated);
    assert!(outcome.session.certificate_error().is_some());
    assert!(!outcome.trail()[0].passed);
}

#[test]
fn certificate_without_san_has_no_identity_uris() {
    for fixture in ["no_san.pem", "dns_only_san.pem"] {
        let engine = engine(Mode::Exhaustive);
        let outcome = engine.validate(Some(&data(fixture)));
        assert!(!outcome.validated, "{fixture}");
        assert!(outcome.session.identity_uris().is_empty(), "{fixture}");
        let san = outcome
            .session
            .results()
            .for_check(CheckId::CertificateProvidedSan)
            .next()
            .unwrap();
        assert!(!san.passed, "{fixture}");
        assert!(engine.store().requests().is_empty(), "{fixture}");
    }
}

#[test]
fn ec_certificate_key_is_not_recognised() {
    let outcome = engine(Mode::Exhaustive).validate(Some(&data("ec.pem")));
    let log = outcome.session.results();
    assert!(!log.for_check(CheckId::CertificatePubkeyRecognised).next().unwrap().passed);
    assert!(!log.for_check(CheckId::CertificateOk).next().unwrap().passed);
    assert!(!outcome.validated);
}

// ---------------------------------------------------------------------------
// Reporting
// ---------------------------------------------------------------------------

#[test]
fn results_carry_reporting_fields() {
    let outcome = engine(Mode::FirstMatch).validate(Some(&data("alice.pem")));
    let log = outcome.session.results();

    let provided = log.for_check(CheckId::CertificateProvided).next().unwrap();
    assert!(provided.pointer.as_deref().unwrap().starts_with("SHA-256 "));

    let san = log.for_check(CheckId::CertificateProvidedSan).next().unwrap();
    assert!(san.details.as_deref().unwrap().contains("URI:https://bob.example/profile#i"));

    let get = log.last_for_uri(CheckId::ProfileGet, BOB_URI).unwrap();
    assert_eq!(get.subject.as_deref(), Some("https://bob.example/profile"));
    assert_eq!(get.details.as_deref(), Some("response status code: 200"));

    let well_formed = log.last_for_uri(CheckId::ProfileWellFormed, BOB_URI).unwrap();
    assert!(well_formed
        .subject
        .as_deref()
        .unwrap()
        .contains("<http://www.w3.org/ns/auth/cert#key>"));

    for r in log.for_check(CheckId::PubkeyRsaExponent) {
        assert!(r.pubkey.is_some());
        assert!(r.subject.as_deref().unwrap().starts_with("RSA(exp="));
    }
}

#[test]
fn outcome_serializes_to_json() {
    let outcome = engine(Mode::FirstMatch).validate(Some(&data("alice.pem")));
    let json: serde_json::Value = serde_json::from_str(&to_json(&outcome).unwrap()).unwrap();
    assert_eq!(json["validated"], true);
    assert_eq!(json["matched_uri"], BOB_URI);
    assert_eq!(json["session"]["mode"], "firstmatch");
    assert_eq!(json["session"]["results"][0]["check"], "certificateProvided");
}

#[test]
fn outcome_text_lists_the_trail() {
    let outcome = engine(Mode::FirstMatch).validate(Some(&data("alice.pem")));
    let text = display_outcome(&outcome);
    assert!(text.starts_with("WebID validated: https://bob.example/profile#i\n"));
    assert!(text.contains("[PASS]  1 certificateProvided"));
    assert!(text.contains("[FAIL] 22 webidAuthentication <https://alice.example/card#me>"));
}

#[test]
fn validated_profile_details_are_reported() {
    let outcome = engine(Mode::FirstMatch).validate(Some(&data("alice.pem")));
    let info = outcome.profile_info().unwrap();
    assert_eq!(info.uri, BOB_URI);
    assert_eq!(info.name.as_deref(), Some("Alice (hosted by Bob)"));
    assert!(info.mbox.is_none());

    let text = display_outcome(&outcome);
    assert!(text.contains("  Profile:\n    Name: Alice (hosted by Bob)\n"));
    let json: serde_json::Value = serde_json::from_str(&to_json(&outcome).unwrap()).unwrap();
    assert_eq!(json["session"]["profile_info"]["name"], "Alice (hosted by Bob)");
    assert!(json["session"]["profile_info"].get("nick").is_none());
}

#[test]
fn failed_run_has_no_profile_details() {
    let store = StaticProfileStore::new().with_document(
        "https://alice.example/card",
        "application/rdf+xml",
        data("alice_card.rdf"),
    );
    let outcome = engine_with(store, options(Mode::Exhaustive)).validate(Some(&data("alice.pem")));
    assert!(!outcome.validated);
    assert!(outcome.profile_info().is_none());
    assert!(!display_outcome(&outcome).contains("Profile:"));
}

// ---------------------------------------------------------------------------
// Catalog and sharing
// ---------------------------------------------------------------------------

#[test]
fn unknown_metadata_entry_is_fatal() {
    let mut metadata = OntologyMetadata::bundled().unwrap();
    metadata.tests.push(webid_lib::metadata::TestMetadata {
        name: "http://www.w3.org/2005/Incubator/webid/earl/RelyingParty#profileTeleported".into(),
        ..Default::default()
    });
    let err = TestCatalog::from_metadata(&metadata).unwrap_err();
    assert_eq!(err, ImplementationError::UnknownCheck("profileTeleported".into()));
}

#[test]
fn bundled_catalog_describes_every_check() {
    let catalog = TestCatalog::bundled().unwrap();
    assert!(catalog.missing_checks().is_empty());
    assert!(catalog.unannotated().is_empty());
    assert_eq!(catalog.coverage(), Some(1.0));
}

#[test]
fn one_engine_serves_concurrent_runs() {
    let engine = engine(Mode::FirstMatch);
    let alice = data("alice.pem");
    let crit = data("critical_ext.pem");
    std::thread::scope(|s| {
        let a = s.spawn(|| engine.validate(Some(&alice)));
        let c = s.spawn(|| engine.validate(Some(&crit)));
        assert_eq!(a.join().unwrap().matched_uri.as_deref(), Some(BOB_URI));
        assert_eq!(c.join().unwrap().matched_uri.as_deref(), Some(CRIT_URI));
    });
}
