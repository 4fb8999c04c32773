//! Descriptive metadata for the check catalog.
//!
//! The metadata is a JSON rendering of the WebID EARL "RelyingParty"
//! vocabulary: one entry per test case or test requirement, carrying its
//! title, description, note and `dct:hasPart` list. The crate embeds a copy;
//! callers can load a newer one with [`OntologyMetadata::from_json`].

use serde::{Deserialize, Serialize};

/// Vocabulary namespace of the bundled metadata.
pub const RELYING_PARTY_NS: &str = "http://www.w3.org/2005/Incubator/webid/earl/RelyingParty#";

const BUNDLED: &str = include_str!("../data/relying_party.json");

/// Whether an entry is an EARL `TestCase` or a `TestRequirement`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestKind {
    #[default]
    TestCase,
    TestRequirement,
}

/// One described test.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TestMetadata {
    /// Bare name (`profileGet`) or fragment IRI (`...RelyingParty#profileGet`).
    pub name: String,
    pub kind: TestKind,
    pub title: String,
    pub description: String,
    pub note: String,
    /// Names of the parts of a composite test, in evaluation order.
    pub parts: Vec<String>,
}

impl TestMetadata {
    /// The name with any IRI prefix up to `#` removed.
    pub fn local_name(&self) -> &str {
        local_name(&self.name)
    }
}

/// The full metadata feed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OntologyMetadata {
    /// IRI of the vocabulary the feed was produced from.
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub tests: Vec<TestMetadata>,
}

impl OntologyMetadata {
    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// The copy embedded in the crate.
    pub fn bundled() -> Result<Self, serde_json::Error> {
        Self::from_json(BUNDLED)
    }

    /// Entry for a local check name.
    pub fn get(&self, name: &str) -> Option<&TestMetadata> {
        self.tests.iter().find(|t| t.local_name() == name)
    }
}

/// Text after the last `#`, or the whole string.
pub(crate) fn local_name(name: &str) -> &str {
    name.rsplit_once('#').map_or(name, |(_, local)| local)
}
