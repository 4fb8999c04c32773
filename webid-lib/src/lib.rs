//! webid-lib: Relying-party verification of WebID-TLS client certificates.
//!
//! Given a client certificate, the library checks whether the certificate's
//! public key is also asserted, in the identity document published at one of
//! the certificate's Subject Alternative Name URIs, as belonging to that URI.
//! Verification runs as an ordered catalog of named checks and produces a
//! verdict together with the full trail of check results.
//!
//! ```no_run
//! use std::sync::Arc;
//! use webid_lib::{FetchOptions, HttpProfileStore, TestCatalog, ValidateOptions, ValidationEngine};
//!
//! # fn main() -> Result<(), webid_lib::WebidError> {
//! let catalog = Arc::new(TestCatalog::bundled()?);
//! let store = HttpProfileStore::new(&FetchOptions::default())?;
//! let engine = ValidationEngine::new(catalog, store, ValidateOptions::default());
//! let pem = std::fs::read("client.pem")?;
//! let outcome = engine.validate(Some(&pem));
//! println!("validated: {} as {:?}", outcome.validated, outcome.matched_uri);
//! # Ok(())
//! # }
//! ```

pub mod catalog;
mod check;
pub mod credentials;
mod display;
mod fields;
mod fingerprint;
pub mod metadata;
mod oid;
mod parser;
pub mod profile;
mod pubkey;
pub mod result;
mod util;
pub mod validate;

pub use catalog::{CheckId, CheckKind, CheckSpec, ImplementationError, Scope, TestCatalog};
pub use check::{
    check_no_other_critical_extensions, check_validity_window, days_to_expiry,
    extract_identity_uris, extract_public_key, is_public_key_well_formed,
};
pub use credentials::{extract_claims, profile_info, ProfileInfo, WebIdClaim};
pub use display::{display_certificate, display_outcome, to_json};
pub use fields::{Certificate, DateTime, DigestAlgorithm, DistinguishedName, Extension, ExtensionValue, PublicKeyInfo, SanEntry};
pub use fingerprint::compute_fingerprint;
pub use metadata::OntologyMetadata;
pub use parser::{parse_cert, parse_der, parse_pem};
pub use profile::{
    FetchOptions, FetchedDocument, Graph, HttpProfileStore, MediaType, ProfileFetchError,
    ProfileParseError, ProfileStore, StaticProfileStore, Term, Triple,
};
pub use pubkey::{normalize_modulus, ClaimedKey, KeyComponent, PublicKey};
pub use result::{TestResult, ValidationOutcome};
pub use validate::{Mode, ValidateOptions, ValidationEngine, ValidationSession};

/// Errors returned by webid-lib.
#[derive(Debug, thiserror::Error)]
pub enum WebidError {
    #[error("Failed to parse certificate: {0}")]
    ParseError(String),

    #[error("Invalid PEM format: {0}")]
    PemError(String),

    #[error("Invalid DER format: {0}")]
    DerError(String),

    #[error("Failed to fetch profile: {0}")]
    ProfileFetch(#[from] ProfileFetchError),

    #[error("Failed to parse profile: {0}")]
    ProfileParse(#[from] ProfileParseError),

    #[error("Check catalog error: {0}")]
    Implementation(#[from] ImplementationError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}
