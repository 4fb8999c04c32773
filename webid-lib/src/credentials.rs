//! Extraction of WebID key claims from a parsed identity document.
//!
//! The document is matched against
//!
//! ```text
//! [] cert:key ?k .
//! ?k cert:modulus ?mod ;
//!    cert:exponent ?exp .
//! ```
//!
//! Every binding becomes one [`WebIdClaim`]. Bindings are kept even when the
//! modulus or exponent is malformed, so that the per-key checks can report
//! the failure for that key alone.
//!
//! [`profile_info`] reads the FOAF naming properties of the WebID, which a
//! relying party can use to populate a local account.

use crate::profile::{Graph, Term};
use crate::pubkey::ClaimedKey;
use serde::Serialize;
use tracing::debug;

/// `cert:` vocabulary namespace.
pub const CERT_NS: &str = "http://www.w3.org/ns/auth/cert#";

const CERT_KEY: &str = "http://www.w3.org/ns/auth/cert#key";
const CERT_MODULUS: &str = "http://www.w3.org/ns/auth/cert#modulus";
const CERT_EXPONENT: &str = "http://www.w3.org/ns/auth/cert#exponent";

const FOAF_NAME: &str = "http://xmlns.com/foaf/0.1/name";
const FOAF_NICK: &str = "http://xmlns.com/foaf/0.1/nick";
const FOAF_MBOX: &str = "http://xmlns.com/foaf/0.1/mbox";
const FOAF_GIVEN_NAME: &str = "http://xmlns.com/foaf/0.1/givenName";
const FOAF_FAMILY_NAME: &str = "http://xmlns.com/foaf/0.1/familyName";

/// A key asserted for `uri` by the document published at `uri`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct WebIdClaim {
    pub uri: String,
    pub key: ClaimedKey,
}

/// Claims for `uri` found in `graph`, de-duplicated by value in document order.
pub fn extract_claims(graph: &Graph, uri: &str) -> Vec<WebIdClaim> {
    let mut claims: Vec<WebIdClaim> = Vec::new();

    for key_node in graph.with_predicate(CERT_KEY).map(|t| &t.object) {
        for modulus in graph.objects(key_node, CERT_MODULUS) {
            for exponent in graph.objects(key_node, CERT_EXPONENT) {
                let claim = WebIdClaim {
                    uri: uri.to_string(),
                    key: claimed_key(modulus, exponent),
                };
                if !claims.contains(&claim) {
                    debug!(uri, key = %claim.key, "found key claim");
                    claims.push(claim);
                }
            }
        }
    }

    debug!(uri, claims = claims.len(), "extracted key claims");
    claims
}

/// FOAF naming details a profile publishes about its WebID.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProfileInfo {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub nick: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mbox: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub given_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub family_name: Option<String>,
}

impl ProfileInfo {
    /// True when the profile published none of the naming properties.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.nick.is_none()
            && self.mbox.is_none()
            && self.given_name.is_none()
            && self.family_name.is_none()
    }
}

/// Naming details for `uri` in `graph`. Each property takes the first value
/// in document order and is independent of the others.
pub fn profile_info(graph: &Graph, uri: &str) -> ProfileInfo {
    let subject = Term::iri(uri);
    let first = |predicate: &str| {
        graph
            .objects(&subject, predicate)
            .next()
            .map(|term| term.text().trim().to_string())
    };

    let info = ProfileInfo {
        uri: uri.to_string(),
        name: first(FOAF_NAME),
        nick: first(FOAF_NICK),
        mbox: first(FOAF_MBOX),
        given_name: first(FOAF_GIVEN_NAME),
        family_name: first(FOAF_FAMILY_NAME),
    };
    debug!(uri, name = ?info.name, "read profile details");
    info
}

fn claimed_key(modulus: &Term, exponent: &Term) -> ClaimedKey {
    ClaimedKey::new(
        modulus.text(),
        modulus.is_literal(),
        exponent.text(),
        exponent.is_literal(),
    )
}
