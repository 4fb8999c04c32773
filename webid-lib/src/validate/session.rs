//! Mutable state of a single validation run.

use super::Mode;
use crate::credentials::{profile_info, ProfileInfo, WebIdClaim};
use crate::fields::Certificate;
use crate::profile::{FetchedDocument, Graph, ProfileFetchError};
use crate::pubkey::{ClaimedKey, PublicKey};
use crate::result::{ResultLog, TestResult};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};

/// Everything one `validate()` call learns, in the order it learns it.
///
/// Owned by the run that creates it and handed to the caller inside the
/// [`ValidationOutcome`](crate::ValidationOutcome).
#[derive(Debug, Serialize)]
pub struct ValidationSession {
    mode: Mode,
    /// Unix time at which the certificate validity window was evaluated.
    verified_at: i64,
    certificate: Option<Certificate>,
    #[serde(skip_serializing_if = "Option::is_none")]
    certificate_error: Option<String>,
    identity_uris: Vec<String>,
    #[serde(skip)]
    documents: BTreeMap<String, FetchedDocument>,
    #[serde(skip)]
    fetch_failures: BTreeMap<String, ProfileFetchError>,
    #[serde(skip)]
    graphs: BTreeMap<String, Graph>,
    /// Fetch and parse failures, by identity URI.
    profile_errors: BTreeMap<String, String>,
    claims: BTreeMap<String, Vec<WebIdClaim>>,
    #[serde(skip)]
    keys: BTreeMap<String, BTreeSet<PublicKey>>,
    validated_uri: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    profile_info: Option<ProfileInfo>,
    results: ResultLog,
}

impl ValidationSession {
    pub(crate) fn new(mode: Mode, verified_at: i64) -> Self {
        Self {
            mode,
            verified_at,
            certificate: None,
            certificate_error: None,
            identity_uris: Vec::new(),
            documents: BTreeMap::new(),
            fetch_failures: BTreeMap::new(),
            graphs: BTreeMap::new(),
            profile_errors: BTreeMap::new(),
            claims: BTreeMap::new(),
            keys: BTreeMap::new(),
            validated_uri: None,
            profile_info: None,
            results: ResultLog::new(),
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn verified_at(&self) -> i64 {
        self.verified_at
    }

    pub fn certificate(&self) -> Option<&Certificate> {
        self.certificate.as_ref()
    }

    /// Why the supplied certificate bytes could not be parsed.
    pub fn certificate_error(&self) -> Option<&str> {
        self.certificate_error.as_deref()
    }

    /// Identity URIs from the certificate, in SAN order.
    pub fn identity_uris(&self) -> &[String] {
        &self.identity_uris
    }

    pub fn document(&self, uri: &str) -> Option<&FetchedDocument> {
        self.documents.get(uri)
    }

    pub fn fetch_failure(&self, uri: &str) -> Option<&ProfileFetchError> {
        self.fetch_failures.get(uri)
    }

    pub fn graph(&self, uri: &str) -> Option<&Graph> {
        self.graphs.get(uri)
    }

    pub fn profile_error(&self, uri: &str) -> Option<&str> {
        self.profile_errors.get(uri).map(String::as_str)
    }

    /// Claims found in the document of `uri`, in document order.
    pub fn claims(&self, uri: &str) -> &[WebIdClaim] {
        self.claims.get(uri).map(Vec::as_slice).unwrap_or_default()
    }

    /// Distinct claimed keys for `uri`, in the order they were found.
    pub fn claimed_keys(&self, uri: &str) -> Vec<ClaimedKey> {
        let mut keys: Vec<ClaimedKey> = Vec::new();
        for claim in self.claims(uri) {
            if !keys.contains(&claim.key) {
                keys.push(claim.key.clone());
            }
        }
        keys
    }

    /// Well-formed keys discovered for `uri`.
    pub fn keys(&self, uri: &str) -> Option<&BTreeSet<PublicKey>> {
        self.keys.get(uri)
    }

    /// URI that authenticated, once the run has finished.
    pub fn validated_uri(&self) -> Option<&str> {
        self.validated_uri.as_deref()
    }

    /// FOAF naming details published for the validated URI.
    pub fn profile_info(&self) -> Option<&ProfileInfo> {
        self.profile_info.as_ref()
    }

    pub fn results(&self) -> &ResultLog {
        &self.results
    }

    pub(crate) fn set_certificate(&mut self, certificate: Certificate) {
        self.certificate = Some(certificate);
    }

    pub(crate) fn set_certificate_error(&mut self, error: String) {
        self.certificate_error = Some(error);
    }

    pub(crate) fn set_identity_uris(&mut self, uris: Vec<String>) {
        self.identity_uris = uris;
    }

    pub(crate) fn store_document(&mut self, uri: &str, document: FetchedDocument) {
        self.documents.insert(uri.to_string(), document);
    }

    pub(crate) fn store_fetch_failure(&mut self, uri: &str, error: ProfileFetchError) {
        self.profile_errors.insert(uri.to_string(), error.to_string());
        self.fetch_failures.insert(uri.to_string(), error);
    }

    pub(crate) fn store_parse_failure(&mut self, uri: &str, error: String) {
        self.profile_errors.insert(uri.to_string(), error);
    }

    /// Record the parsed document and the claims it makes.
    pub(crate) fn store_profile(&mut self, uri: &str, graph: Graph, claims: Vec<WebIdClaim>) {
        let keys = claims.iter().filter_map(|c| c.key.public_key()).collect();
        self.keys.insert(uri.to_string(), keys);
        self.claims.insert(uri.to_string(), claims);
        self.graphs.insert(uri.to_string(), graph);
    }

    pub(crate) fn record(&mut self, result: TestResult) {
        self.results.push(result);
    }

    pub(crate) fn set_validated_uri(&mut self, uri: Option<String>) {
        self.profile_info = uri
            .as_deref()
            .and_then(|u| self.graphs.get(u).map(|graph| profile_info(graph, u)));
        self.validated_uri = uri;
    }
}
