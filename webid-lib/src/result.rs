//! Check results and the outcome of a validation run.

use crate::catalog::CheckId;
use crate::credentials::ProfileInfo;
use crate::pubkey::ClaimedKey;
use crate::validate::ValidationSession;
use serde::Serialize;

/// One executed check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TestResult {
    pub check: CheckId,
    pub order: u32,
    pub passed: bool,
    /// What the result points at (e.g. the certificate fingerprint).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pointer: Option<String>,
    /// The thing under test.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Free-form evidence (e.g. the HTTP status line).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    /// Identity URI the check ran for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Document key the check ran for.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pubkey: Option<ClaimedKey>,
}

/// Append-only log of results in execution order.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct ResultLog {
    results: Vec<TestResult>,
}

impl ResultLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, result: TestResult) {
        self.results.push(result);
    }

    pub fn as_slice(&self) -> &[TestResult] {
        &self.results
    }

    pub fn iter(&self) -> impl Iterator<Item = &TestResult> {
        self.results.iter()
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    /// Results of one check, in execution order.
    pub fn for_check(&self, check: CheckId) -> impl Iterator<Item = &TestResult> {
        self.results.iter().filter(move |r| r.check == check)
    }

    /// The most recent result of `check` recorded for `uri`.
    pub fn last_for_uri(&self, check: CheckId, uri: &str) -> Option<&TestResult> {
        self.results
            .iter()
            .rev()
            .find(|r| r.check == check && r.uri.as_deref() == Some(uri))
    }
}

/// Verdict of one run, with the session that produced it.
#[derive(Debug, Serialize)]
pub struct ValidationOutcome {
    pub validated: bool,
    /// Identity URI that authenticated, if any.
    pub matched_uri: Option<String>,
    pub session: ValidationSession,
}

impl ValidationOutcome {
    /// The ordered result trail.
    pub fn trail(&self) -> &[TestResult] {
        self.session.results().as_slice()
    }

    /// Naming details from the profile of the matched URI.
    pub fn profile_info(&self) -> Option<&ProfileInfo> {
        self.session.profile_info()
    }

    /// Failed checks, in execution order.
    pub fn failures(&self) -> impl Iterator<Item = &TestResult> {
        self.trail().iter().filter(|r| !r.passed)
    }
}
