//! The validation engine.
//!
//! A run executes the catalog's checks in order over three nested loops:
//! certificate checks once, then for every identity URI (in SAN order) the
//! per-URI checks, the per-key checks for each key the URI's document
//! claims, and the per-document checks ending in `webidAuthentication`.
//! After each check the [`Mode`] decides whether the run stops early. Early
//! termination is a [`ControlFlow::Break`] carried up through the loops.

mod checks;
mod prefetch;
mod session;

pub use session::ValidationSession;

use crate::catalog::{CheckId, CheckKind, CheckSpec, Scope, TestCatalog};
use crate::profile::{FetchedDocument, MediaType, ProfileFetchError, ProfileStore};
use crate::pubkey::ClaimedKey;
use crate::result::ValidationOutcome;
use serde::Serialize;
use std::fmt;
use std::ops::ControlFlow;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::{debug, info, warn};

/// Termination policy of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Stop at the first identity URI that authenticates.
    #[default]
    FirstMatch,
    /// Stop at the first failing mandatory check; the run then fails.
    Strict,
    /// Visit every URI and key; succeed if any URI authenticated.
    Exhaustive,
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Mode::FirstMatch => "firstmatch",
            Mode::Strict => "strict",
            Mode::Exhaustive => "exhaustive",
        };
        f.write_str(s)
    }
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "firstmatch" | "first-match" => Ok(Mode::FirstMatch),
            "strict" => Ok(Mode::Strict),
            "exhaustive" => Ok(Mode::Exhaustive),
            _ => Err(format!(
                "unknown validation mode '{}' (expected firstmatch, strict or exhaustive)",
                s
            )),
        }
    }
}

/// Options controlling a validation run.
#[derive(Debug, Clone)]
pub struct ValidateOptions {
    pub mode: Mode,
    /// Evaluate the certificate validity window at this Unix time instead of
    /// now. Matches OpenSSL's `-attime` flag.
    pub at_time: Option<i64>,
    /// Media type offered first when fetching profiles.
    pub preferred_format: Option<MediaType>,
    /// Fetch all identity documents concurrently before running URI checks.
    pub parallel_fetch: bool,
    /// Worker threads for parallel fetching. Defaults to 4.
    pub fetch_workers: usize,
}

impl Default for ValidateOptions {
    fn default() -> Self {
        Self {
            mode: Mode::default(),
            at_time: None,
            preferred_format: None,
            parallel_fetch: false,
            fetch_workers: 4,
        }
    }
}

/// Why a run stopped before visiting every check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Halt {
    /// `firstmatch`: a URI authenticated.
    Matched,
    /// `strict`: a mandatory check failed.
    StrictFailed,
}

/// What a single check execution is about.
pub(crate) struct CheckInput<'a> {
    certificate: Option<&'a [u8]>,
    uri: Option<&'a str>,
    key: Option<&'a ClaimedKey>,
    /// Fetch result produced ahead of time for `uri`, consumed by `profileGet`.
    prefetched: Option<Result<FetchedDocument, ProfileFetchError>>,
}

impl<'a> CheckInput<'a> {
    fn certificate(bytes: Option<&'a [u8]>) -> Self {
        Self {
            certificate: bytes,
            uri: None,
            key: None,
            prefetched: None,
        }
    }

    fn uri(uri: &'a str) -> Self {
        Self {
            certificate: None,
            uri: Some(uri),
            key: None,
            prefetched: None,
        }
    }
}

/// Runs validations against a shared catalog and profile store.
///
/// The engine itself is immutable; every call to [`validate`](Self::validate)
/// creates its own [`ValidationSession`].
pub struct ValidationEngine<S> {
    catalog: Arc<TestCatalog>,
    store: S,
    options: ValidateOptions,
}

impl<S: ProfileStore> ValidationEngine<S> {
    pub fn new(catalog: Arc<TestCatalog>, store: S, options: ValidateOptions) -> Self {
        Self {
            catalog,
            store,
            options,
        }
    }

    pub fn catalog(&self) -> &TestCatalog {
        &self.catalog
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn options(&self) -> &ValidateOptions {
        &self.options
    }

    /// Validate a client certificate (PEM or DER), or the absence of one.
    pub fn validate(&self, certificate: Option<&[u8]>) -> ValidationOutcome {
        let verified_at = self.options.at_time.unwrap_or_else(unix_now);
        let mut session = ValidationSession::new(self.options.mode, verified_at);
        info!(mode = %self.options.mode, "starting WebID validation");

        let flow = self.drive(&mut session, certificate);

        let matched_uri = match flow {
            ControlFlow::Break(Halt::StrictFailed) => None,
            ControlFlow::Break(Halt::Matched) | ControlFlow::Continue(()) => {
                first_authenticated(&session)
            }
        };
        session.set_validated_uri(matched_uri.clone());
        let validated = matched_uri.is_some();

        match &matched_uri {
            Some(uri) => info!(uri = %uri, "WebID validated"),
            None => warn!(flow = ?flow, "WebID validation failed"),
        }

        ValidationOutcome {
            validated,
            matched_uri,
            session,
        }
    }

    fn drive(&self, session: &mut ValidationSession, certificate: Option<&[u8]>) -> ControlFlow<Halt> {
        let mut input = CheckInput::certificate(certificate);
        for spec in self.catalog.in_scope(Scope::Certificate) {
            self.run(spec, session, &mut input)?;
        }

        let uris = session.identity_uris().to_vec();
        let mut prefetched: Vec<Option<Result<FetchedDocument, ProfileFetchError>>> = if self.options.parallel_fetch && !uris.is_empty() {
            prefetch::prefetch(
                &self.store,
                &uris,
                self.options.preferred_format,
                self.options.fetch_workers,
                self.options.mode == Mode::Strict,
            )
            .into_iter()
            .map(Some)
            .collect()
        } else {
            Vec::new()
        };

        for (index, uri) in uris.iter().enumerate() {
            debug!(uri = %uri, position = index, "checking identity URI");
            let mut input = CheckInput::uri(uri);
            input.prefetched = prefetched.get_mut(index).and_then(Option::take);
            for spec in self.catalog.in_scope(Scope::Uri) {
                self.run(spec, session, &mut input)?;
            }

            let keys = session.claimed_keys(uri);
            for key in &keys {
                let mut input = CheckInput {
                    key: Some(key),
                    ..CheckInput::uri(uri)
                };
                for spec in self.catalog.in_scope(Scope::UriKey) {
                    self.run(spec, session, &mut input)?;
                }
            }

            let mut input = CheckInput::uri(uri);
            for spec in self.catalog.in_scope(Scope::Document) {
                self.run(spec, session, &mut input)?;
            }
        }

        ControlFlow::Continue(())
    }

    /// Execute one check, record its result and apply the mode policy.
    fn run(
        &self,
        spec: &CheckSpec,
        session: &mut ValidationSession,
        input: &mut CheckInput<'_>,
    ) -> ControlFlow<Halt> {
        let passed = match spec.kind {
            CheckKind::Composite => self.catalog.evaluate_composite(
                spec.id,
                session.results().as_slice(),
                input.uri,
                input.key,
            ),
            CheckKind::Atomic | CheckKind::Terminal => {
                checks::run_atomic(spec.id, session, &self.store, input, &self.options)
            }
        };

        let result = checks::report(spec, passed, session, input);
        session.record(result);

        let uri = input.uri.unwrap_or_default();
        if passed {
            info!(check = spec.name(), order = spec.order, uri, "check passed");
            if spec.is_terminal() && self.options.mode == Mode::FirstMatch {
                return ControlFlow::Break(Halt::Matched);
            }
        } else {
            warn!(
                check = spec.name(),
                order = spec.order,
                uri,
                mandatory = spec.mandatory,
                "check failed"
            );
            if spec.mandatory && self.options.mode == Mode::Strict {
                return ControlFlow::Break(Halt::StrictFailed);
            }
        }
        ControlFlow::Continue(())
    }
}

/// First identity URI, in SAN order, whose last terminal result passed.
fn first_authenticated(session: &ValidationSession) -> Option<String> {
    session
        .identity_uris()
        .iter()
        .find(|uri| {
            session
                .results()
                .last_for_uri(CheckId::WebidAuthentication, uri)
                .is_some_and(|r| r.passed)
        })
        .cloned()
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs() as i64
}
