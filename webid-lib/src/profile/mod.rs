//! Fetching and parsing of WebID identity documents ("profiles").
//!
//! The validation engine talks to profiles through the [`ProfileStore`]
//! trait: `fetch` performs content negotiation for one URI, `parse` turns the
//! fetched bytes into a [`Graph`]. Only a closed set of media types is
//! understood (see [`MediaType`]); anything else is a per-URI fetch failure.
//!
//! Two stores ship with the crate: [`HttpProfileStore`], backed by a blocking
//! `reqwest` client, and [`StaticProfileStore`], an in-memory map used for
//! offline validation and tests.

mod entities;
mod graph;
mod http;
mod memory;
pub(crate) mod rdfa;
pub(crate) mod rdfxml;

pub use graph::{Graph, Term, Triple};
pub use http::HttpProfileStore;
pub use memory::StaticProfileStore;

use serde::Serialize;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Maximum accepted profile body size (10 MiB).
pub const DEFAULT_MAX_BODY_BYTES: u64 = 10 * 1024 * 1024;

/// Media types the profile parsers understand, in negotiation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum MediaType {
    /// `application/rdf+xml`
    RdfXml,
    /// `application/xhtml+xml` carrying RDFa annotations
    XhtmlRdfa,
}

impl MediaType {
    /// Every understood type, in the order offered to servers.
    pub const UNDERSTOOD: [MediaType; 2] = [MediaType::RdfXml, MediaType::XhtmlRdfa];

    pub fn mime(self) -> &'static str {
        match self {
            MediaType::RdfXml => "application/rdf+xml",
            MediaType::XhtmlRdfa => "application/xhtml+xml",
        }
    }

    /// Map a `Content-Type` header value to an understood type.
    ///
    /// Parameters such as `charset` are ignored; matching is case-insensitive.
    pub fn from_content_type(value: &str) -> Option<Self> {
        let essence = value.split(';').next().unwrap_or("").trim();
        Self::UNDERSTOOD
            .into_iter()
            .find(|t| t.mime().eq_ignore_ascii_case(essence))
    }

    /// `Accept` header value: the preferred type first (if any), then the
    /// remaining understood types with decreasing quality.
    pub fn accept_header(preferred: Option<MediaType>) -> String {
        let mut order: Vec<MediaType> = Vec::with_capacity(Self::UNDERSTOOD.len());
        order.extend(preferred);
        order.extend(Self::UNDERSTOOD.into_iter().filter(|t| Some(*t) != preferred));
        order
            .iter()
            .enumerate()
            .map(|(i, t)| match i {
                0 => t.mime().to_string(),
                _ => format!("{};q=0.{}", t.mime(), 10 - i.min(9)),
            })
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for MediaType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.mime())
    }
}

impl FromStr for MediaType {
    type Err = String;

    /// Accepts the short names `rdf`/`rdfxml` and `rdfa`/`xhtml`, or a MIME type.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rdf" | "rdfxml" | "rdf+xml" => Ok(MediaType::RdfXml),
            "rdfa" | "xhtml" => Ok(MediaType::XhtmlRdfa),
            other => MediaType::from_content_type(other)
                .ok_or_else(|| format!("unsupported profile format: {}", s)),
        }
    }
}

/// Why a profile could not be fetched. Local to one URI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileFetchError {
    #[error("failed to build HTTP client: {0}")]
    Client(String),

    #[error("request to {uri} failed: {reason}")]
    Transport { uri: String, reason: String },

    #[error("{uri} answered with HTTP status {status}")]
    Status { uri: String, status: u16 },

    #[error("{uri} served unsupported content type {content_type:?}")]
    UnsupportedContentType { uri: String, content_type: String },

    #[error("{uri} response exceeds {limit} bytes")]
    TooLarge { uri: String, limit: u64 },

    #[error("no document registered for {uri}")]
    NotFound { uri: String },

    #[error("fetch of {uri} was cancelled")]
    Cancelled { uri: String },
}

impl ProfileFetchError {
    /// HTTP status code carried by the error, if the server answered.
    pub fn status(&self) -> Option<u16> {
        match self {
            ProfileFetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Why a fetched profile could not be parsed. Local to one URI.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProfileParseError {
    #[error("document is not valid UTF-8: {0}")]
    Encoding(#[from] std::str::Utf8Error),

    #[error("malformed markup: {0}")]
    Markup(String),

    #[error("invalid IRI {iri:?}: {reason}")]
    InvalidIri { iri: String, reason: String },

    #[error("unsupported RDF/XML construct: {0}")]
    Unsupported(String),
}

/// A successfully fetched profile body.
#[derive(Debug, Clone)]
pub struct FetchedDocument {
    /// URI the body was retrieved from (after redirects); the parse base.
    pub uri: String,
    /// HTTP status of the response.
    pub status: u16,
    /// Raw `Content-Type` header value.
    pub content_type: String,
    /// The understood media type the body will be parsed as.
    pub media_type: MediaType,
    pub body: Vec<u8>,
}

/// Options for [`HttpProfileStore`].
///
/// **`verify_tls` defaults to `false`.** Profile hosts are then fetched
/// without checking their TLS certificates, so a network attacker can serve
/// a forged profile. This is an insecure default kept for compatibility with
/// self-hosted WebID profiles; set `verify_tls: true` in production.
#[derive(Debug, Clone)]
pub struct FetchOptions {
    /// Verify the TLS certificate of profile hosts (insecure default: `false`).
    pub verify_tls: bool,
    /// Overall request timeout. `None` waits indefinitely.
    pub timeout: Option<Duration>,
    /// `User-Agent` header sent with every request.
    pub user_agent: String,
    /// Bodies larger than this are rejected.
    pub max_body_bytes: u64,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            verify_tls: false,
            timeout: None,
            user_agent: concat!("webid-lib/", env!("CARGO_PKG_VERSION")).to_string(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

/// Source of identity documents.
pub trait ProfileStore: Send + Sync {
    /// Retrieve the document for `uri`, offering `preferred` first when given.
    fn fetch(&self, uri: &str, preferred: Option<MediaType>)
        -> Result<FetchedDocument, ProfileFetchError>;

    /// Parse a fetched document into a graph, based on its media type.
    fn parse(&self, document: &FetchedDocument) -> Result<Graph, ProfileParseError> {
        let text = std::str::from_utf8(&document.body)?;
        match document.media_type {
            MediaType::RdfXml => rdfxml::parse_rdfxml(text, &document.uri),
            MediaType::XhtmlRdfa => rdfa::parse_rdfa(text, &document.uri),
        }
    }
}

impl<T: ProfileStore + ?Sized> ProfileStore for Box<T> {
    fn fetch(
        &self,
        uri: &str,
        preferred: Option<MediaType>,
    ) -> Result<FetchedDocument, ProfileFetchError> {
        (**self).fetch(uri, preferred)
    }

    fn parse(&self, document: &FetchedDocument) -> Result<Graph, ProfileParseError> {
        (**self).parse(document)
    }
}

/// Base IRI against which relative references in a document are resolved.
#[derive(Debug, Clone)]
pub(crate) struct BaseIri(Option<Url>);

impl BaseIri {
    pub(crate) fn new(iri: &str) -> Self {
        BaseIri(Url::parse(iri).ok())
    }

    /// The base itself as a term (the document resource).
    pub(crate) fn term(&self) -> Term {
        let mut iri = self.0.clone();
        if let Some(url) = iri.as_mut() {
            url.set_fragment(None);
        }
        Term::Iri(iri.map(String::from).unwrap_or_default())
    }

    /// Resolve an absolute or relative reference.
    pub(crate) fn resolve(&self, reference: &str) -> Result<String, ProfileParseError> {
        let invalid = |reason: String| ProfileParseError::InvalidIri {
            iri: reference.to_string(),
            reason,
        };
        match Url::parse(reference) {
            Ok(url) => Ok(url.into()),
            Err(url::ParseError::RelativeUrlWithoutBase) => match &self.0 {
                Some(base) => base
                    .join(reference)
                    .map(String::from)
                    .map_err(|e| invalid(e.to_string())),
                None => Err(invalid("relative reference without a base".into())),
            },
            Err(e) => Err(invalid(e.to_string())),
        }
    }

    /// A new base obtained by resolving `reference` against this one.
    pub(crate) fn rebase(&self, reference: &str) -> Result<BaseIri, ProfileParseError> {
        let resolved = self.resolve(reference)?;
        Ok(BaseIri(Url::parse(&resolved).ok()))
    }
}

/// Concatenated text of every text node below `node`.
pub(crate) fn text_content(node: roxmltree::Node<'_, '_>) -> String {
    node.descendants()
        .filter(|n| n.is_text())
        .filter_map(|n| n.text())
        .collect()
}

/// roxmltree options: profiles are often XHTML with a DOCTYPE.
pub(crate) fn parsing_options() -> roxmltree::ParsingOptions {
    roxmltree::ParsingOptions {
        allow_dtd: true,
        ..roxmltree::ParsingOptions::default()
    }
}
