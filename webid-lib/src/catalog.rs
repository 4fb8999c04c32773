//! The catalog of validation checks.
//!
//! [`REGISTRY`] is the fixed list of checks this crate implements, with their
//! execution order, iteration scope, kind, mandatory flag and reporting
//! descriptor. A [`TestCatalog`] merges the registry with
//! [`OntologyMetadata`] (titles, descriptions, composite parts) and rejects
//! metadata that does not fit the registry.

use crate::metadata::{local_name, OntologyMetadata, TestKind};
use crate::pubkey::ClaimedKey;
use crate::result::TestResult;
use crate::WebidError;
use serde::{Serialize, Serializer};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

/// Identifier of an implemented check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CheckId {
    CertificateProvided,
    CertificateProvidedSan,
    CertificateDateOk,
    CertificatePubkeyRecognised,
    CertificateCriticalExtensionsOk,
    CertificateOk,
    ProfileGet,
    ProfileWellFormed,
    PubkeyRsaModulusFunctional,
    PubkeyRsaModulusLiteral,
    PubkeyRsaModulus,
    PubkeyRsaExponentFunctional,
    PubkeyRsaExponentLiteral,
    PubkeyRsaExponent,
    ProfileWellFormedPubkey,
    ProfileAllKeysWellFormed,
    ProfileOk,
    WebidClaim,
    WebidAuthentication,
}

impl CheckId {
    pub const ALL: [CheckId; 19] = [
        CheckId::CertificateProvided,
        CheckId::CertificateProvidedSan,
        CheckId::CertificateDateOk,
        CheckId::CertificatePubkeyRecognised,
        CheckId::CertificateCriticalExtensionsOk,
        CheckId::CertificateOk,
        CheckId::ProfileGet,
        CheckId::ProfileWellFormed,
        CheckId::PubkeyRsaModulusFunctional,
        CheckId::PubkeyRsaModulusLiteral,
        CheckId::PubkeyRsaModulus,
        CheckId::PubkeyRsaExponentFunctional,
        CheckId::PubkeyRsaExponentLiteral,
        CheckId::PubkeyRsaExponent,
        CheckId::ProfileWellFormedPubkey,
        CheckId::ProfileAllKeysWellFormed,
        CheckId::ProfileOk,
        CheckId::WebidClaim,
        CheckId::WebidAuthentication,
    ];

    /// Vocabulary name of the check.
    pub fn as_str(self) -> &'static str {
        match self {
            CheckId::CertificateProvided => "certificateProvided",
            CheckId::CertificateProvidedSan => "certificateProvidedSAN",
            CheckId::CertificateDateOk => "certificateDateOk",
            CheckId::CertificatePubkeyRecognised => "certificatePubkeyRecognised",
            CheckId::CertificateCriticalExtensionsOk => "certificateCriticalExtensionsOk",
            CheckId::CertificateOk => "certificateOk",
            CheckId::ProfileGet => "profileGet",
            CheckId::ProfileWellFormed => "profileWellFormed",
            CheckId::PubkeyRsaModulusFunctional => "pubkeyRSAModulusFunctional",
            CheckId::PubkeyRsaModulusLiteral => "pubkeyRSAModulusLiteral",
            CheckId::PubkeyRsaModulus => "pubkeyRSAModulus",
            CheckId::PubkeyRsaExponentFunctional => "pubkeyRSAExponentFunctional",
            CheckId::PubkeyRsaExponentLiteral => "pubkeyRSAExponentLiteral",
            CheckId::PubkeyRsaExponent => "pubkeyRSAExponent",
            CheckId::ProfileWellFormedPubkey => "profileWellFormedPubkey",
            CheckId::ProfileAllKeysWellFormed => "profileAllKeysWellFormed",
            CheckId::ProfileOk => "profileOk",
            CheckId::WebidClaim => "webidClaim",
            CheckId::WebidAuthentication => "webidAuthentication",
        }
    }
}

impl fmt::Display for CheckId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CheckId {
    type Err = String;

    /// Accepts the bare name or a fragment IRI ending in `#name`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = local_name(s);
        CheckId::ALL
            .into_iter()
            .find(|id| id.as_str() == name)
            .ok_or_else(|| format!("unknown check: {}", s))
    }
}

impl Serialize for CheckId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

/// Which loop of the engine runs a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// Once per run, before any URI is visited.
    Certificate,
    /// Once per identity URI.
    Uri,
    /// Once per key found in a URI's document.
    UriKey,
    /// Once per identity URI, after its keys.
    Document,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Scope::Certificate => "certificate",
            Scope::Uri => "uri",
            Scope::UriKey => "uri+key",
            Scope::Document => "document",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckKind {
    /// Computes its verdict directly.
    Atomic,
    /// AND of its mandatory parts in the current context.
    Composite,
    /// The authentication decision; ends a `firstmatch` run when it passes.
    Terminal,
}

/// Session data a check reports in its `pointer`, `subject` or `details`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InfoSource {
    /// Labelled SHA-256 fingerprint of the certificate.
    Certificate,
    /// The Subject Alternative Name extension, OpenSSL style.
    SubjectAltName,
    /// Instant at which the validity window was evaluated.
    VerificationTime,
    /// The certificate's RSA key.
    CertificatePubkey,
    /// URI the profile document was retrieved from.
    Profile,
    /// The parsed profile in N-Triples.
    ProfileGraph,
    /// HTTP status of the profile response.
    ResponseStatus,
    /// The document key under test.
    KeyUnderTest,
}

/// Which result fields a check fills, and from where.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Reporting {
    pub pointer: Option<InfoSource>,
    pub subject: Option<InfoSource>,
    pub details: Option<InfoSource>,
}

impl Reporting {
    const NONE: Reporting = Reporting {
        pointer: None,
        subject: None,
        details: None,
    };

    const fn subject(source: InfoSource) -> Reporting {
        Reporting {
            pointer: None,
            subject: Some(source),
            details: None,
        }
    }
}

/// Static description of an implemented check.
#[derive(Debug, Clone, Copy)]
pub struct RegistryEntry {
    pub id: CheckId,
    pub order: u32,
    pub scope: Scope,
    pub kind: CheckKind,
    pub mandatory: bool,
    pub reporting: Reporting,
}

const fn entry(
    id: CheckId,
    order: u32,
    scope: Scope,
    kind: CheckKind,
    mandatory: bool,
    reporting: Reporting,
) -> RegistryEntry {
    RegistryEntry {
        id,
        order,
        scope,
        kind,
        mandatory,
        reporting,
    }
}

/// Every implemented check, by execution order. Orders 10, 14 and 18 belong
/// to retired vocabulary entries and stay unused.
pub static REGISTRY: [RegistryEntry; 19] = {
    use CheckKind::{Atomic, Composite, Terminal};
    use InfoSource as I;
    use Scope::{Certificate, Document, Uri, UriKey};
    let key = Reporting::subject(I::KeyUnderTest);
    [
        entry(
            CheckId::CertificateProvided,
            1,
            Certificate,
            Atomic,
            true,
            Reporting {
                pointer: Some(I::Certificate),
                subject: None,
                details: None,
            },
        ),
        entry(
            CheckId::CertificateProvidedSan,
            2,
            Certificate,
            Atomic,
            true,
            Reporting {
                pointer: Some(I::SubjectAltName),
                subject: Some(I::Certificate),
                details: Some(I::SubjectAltName),
            },
        ),
        entry(
            CheckId::CertificateDateOk,
            3,
            Certificate,
            Atomic,
            true,
            Reporting {
                pointer: None,
                subject: Some(I::Certificate),
                details: Some(I::VerificationTime),
            },
        ),
        entry(
            CheckId::CertificatePubkeyRecognised,
            4,
            Certificate,
            Atomic,
            true,
            Reporting {
                pointer: Some(I::CertificatePubkey),
                subject: Some(I::Certificate),
                details: None,
            },
        ),
        entry(
            CheckId::CertificateCriticalExtensionsOk,
            5,
            Certificate,
            Atomic,
            false,
            Reporting::subject(I::Certificate),
        ),
        entry(CheckId::CertificateOk, 6, Certificate, Composite, true, Reporting::NONE),
        entry(
            CheckId::ProfileGet,
            7,
            Uri,
            Atomic,
            true,
            Reporting {
                pointer: None,
                subject: Some(I::Profile),
                details: Some(I::ResponseStatus),
            },
        ),
        entry(
            CheckId::ProfileWellFormed,
            8,
            Uri,
            Atomic,
            true,
            Reporting::subject(I::ProfileGraph),
        ),
        entry(CheckId::PubkeyRsaModulusFunctional, 9, UriKey, Atomic, true, key),
        entry(CheckId::PubkeyRsaModulusLiteral, 11, UriKey, Atomic, true, key),
        entry(CheckId::PubkeyRsaModulus, 12, UriKey, Composite, true, key),
        entry(CheckId::PubkeyRsaExponentFunctional, 13, UriKey, Atomic, true, key),
        entry(CheckId::PubkeyRsaExponentLiteral, 15, UriKey, Atomic, true, key),
        entry(CheckId::PubkeyRsaExponent, 16, UriKey, Composite, true, key),
        entry(CheckId::ProfileWellFormedPubkey, 17, UriKey, Composite, true, key),
        entry(CheckId::ProfileAllKeysWellFormed, 19, Document, Composite, false, Reporting::NONE),
        entry(CheckId::ProfileOk, 20, Document, Composite, true, Reporting::NONE),
        entry(CheckId::WebidClaim, 21, Document, Composite, true, Reporting::NONE),
        entry(CheckId::WebidAuthentication, 22, Document, Terminal, true, Reporting::NONE),
    ]
};

/// Metadata that cannot be reconciled with the registry.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ImplementationError {
    #[error("metadata describes check {0:?}, which is not implemented")]
    UnknownCheck(String),

    #[error("check {check} names unknown part {part:?}")]
    UnknownPart { check: CheckId, part: String },

    #[error("atomic check {0} cannot have parts")]
    PartsOnAtomic(CheckId),

    #[error("part {part} of {check} does not run before it")]
    PartOrder { check: CheckId, part: CheckId },
}

/// A registry entry merged with its metadata.
#[derive(Debug, Clone, Serialize)]
pub struct CheckSpec {
    pub id: CheckId,
    pub order: u32,
    pub scope: Scope,
    pub kind: CheckKind,
    pub mandatory: bool,
    /// EARL `TestRequirement` rather than `TestCase`.
    pub requirement: bool,
    pub title: String,
    pub description: String,
    pub note: String,
    pub parts: Vec<CheckId>,
    pub reporting: Reporting,
}

impl CheckSpec {
    pub fn name(&self) -> &'static str {
        self.id.as_str()
    }

    pub fn is_terminal(&self) -> bool {
        self.kind == CheckKind::Terminal
    }

    fn unannotated(entry: &RegistryEntry) -> Self {
        Self {
            id: entry.id,
            order: entry.order,
            scope: entry.scope,
            kind: entry.kind,
            mandatory: entry.mandatory,
            requirement: false,
            title: String::new(),
            description: String::new(),
            note: String::new(),
            parts: Vec::new(),
            reporting: entry.reporting,
        }
    }
}

/// The checks of one validation setup, ordered by execution order.
///
/// Built once and shared read-only between runs.
#[derive(Debug, Clone, Serialize)]
pub struct TestCatalog {
    source: String,
    specs: Vec<CheckSpec>,
    described: BTreeSet<String>,
}

impl TestCatalog {
    /// Merge the registry with `metadata`.
    pub fn from_metadata(metadata: &OntologyMetadata) -> Result<Self, ImplementationError> {
        let mut specs: Vec<CheckSpec> = REGISTRY.iter().map(CheckSpec::unannotated).collect();
        specs.sort_by_key(|s| s.order);
        let mut described = BTreeSet::new();

        for test in &metadata.tests {
            let name = test.local_name();
            let id: CheckId = name
                .parse()
                .map_err(|_| ImplementationError::UnknownCheck(name.to_string()))?;
            described.insert(name.to_string());

            let Some(spec) = specs.iter_mut().find(|s| s.id == id) else {
                return Err(ImplementationError::UnknownCheck(name.to_string()));
            };
            spec.title.clone_from(&test.title);
            spec.description.clone_from(&test.description);
            spec.note.clone_from(&test.note);
            spec.requirement = test.kind == TestKind::TestRequirement;

            if !test.parts.is_empty() && spec.kind == CheckKind::Atomic {
                return Err(ImplementationError::PartsOnAtomic(id));
            }
            for part in &test.parts {
                let part_id: CheckId =
                    part.parse().map_err(|_| ImplementationError::UnknownPart {
                        check: id,
                        part: part.clone(),
                    })?;
                if !spec.parts.contains(&part_id) {
                    spec.parts.push(part_id);
                }
            }
        }

        for spec in &specs {
            for part in &spec.parts {
                let part_order = order_of(*part);
                if part_order >= spec.order {
                    return Err(ImplementationError::PartOrder {
                        check: spec.id,
                        part: *part,
                    });
                }
            }
        }

        Ok(Self {
            source: metadata.source.clone(),
            specs,
            described,
        })
    }

    /// Catalog built from the bundled metadata.
    pub fn bundled() -> Result<Self, WebidError> {
        Ok(Self::from_metadata(&OntologyMetadata::bundled()?)?)
    }

    /// IRI of the metadata source.
    pub fn source(&self) -> &str {
        &self.source
    }

    /// All checks in execution order.
    pub fn specs(&self) -> &[CheckSpec] {
        &self.specs
    }

    pub fn get(&self, id: CheckId) -> Option<&CheckSpec> {
        self.specs.iter().find(|s| s.id == id)
    }

    /// Checks of one scope, in execution order.
    pub fn in_scope(&self, scope: Scope) -> impl Iterator<Item = &CheckSpec> + '_ {
        self.specs.iter().filter(move |s| s.scope == scope)
    }

    /// Composite verdict for `id` over `results`.
    ///
    /// Keeps the results of every mandatory part whose context matches the
    /// supplied `uri` and `pubkey` (a `None` field is not filtered on), and
    /// passes iff at least one result was kept and all kept results passed.
    pub fn evaluate_composite(
        &self,
        id: CheckId,
        results: &[TestResult],
        uri: Option<&str>,
        pubkey: Option<&ClaimedKey>,
    ) -> bool {
        let Some(spec) = self.get(id) else {
            return false;
        };
        let mandatory: Vec<CheckId> = spec
            .parts
            .iter()
            .copied()
            .filter(|part| self.get(*part).is_some_and(|p| p.mandatory))
            .collect();

        let mut kept = results
            .iter()
            .filter(|r| mandatory.contains(&r.check))
            .filter(|r| uri.map_or(true, |u| r.uri.as_deref() == Some(u)))
            .filter(|r| pubkey.map_or(true, |k| r.pubkey.as_ref() == Some(k)))
            .peekable();

        kept.peek().is_some() && kept.all(|r| r.passed)
    }

    /// Metadata names without an implementation. Always empty once built.
    pub fn missing_checks(&self) -> BTreeSet<String> {
        self.described
            .iter()
            .filter(|name| name.parse::<CheckId>().is_err())
            .cloned()
            .collect()
    }

    /// Implemented checks the metadata does not describe.
    pub fn unannotated(&self) -> Vec<CheckId> {
        self.specs
            .iter()
            .filter(|s| !self.described.contains(s.name()))
            .map(|s| s.id)
            .collect()
    }

    /// Implemented checks per described check; `None` without metadata.
    pub fn coverage(&self) -> Option<f64> {
        if self.described.is_empty() {
            None
        } else {
            Some(self.specs.len() as f64 / self.described.len() as f64)
        }
    }
}

fn order_of(id: CheckId) -> u32 {
    REGISTRY
        .iter()
        .find(|e| e.id == id)
        .map_or(u32::MAX, |e| e.order)
}
