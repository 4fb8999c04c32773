//! Concurrent retrieval of identity documents ahead of the URI checks.

use crate::profile::{FetchedDocument, MediaType, ProfileFetchError, ProfileStore};
use rayon::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{debug, warn};

/// Fetch every URI on a pool of `workers` threads.
///
/// Results come back in input order. With `stop_on_failure`, a failed fetch
/// at position `i` cancels every fetch at a later position that has not
/// started yet.
pub(crate) fn prefetch<S: ProfileStore + ?Sized>(
    store: &S,
    uris: &[String],
    preferred: Option<MediaType>,
    workers: usize,
    stop_on_failure: bool,
) -> Vec<Result<FetchedDocument, ProfileFetchError>> {
    let first_failure = AtomicUsize::new(usize::MAX);

    let fetch = |(index, uri): (usize, &String)| {
        if stop_on_failure && index > first_failure.load(Ordering::Acquire) {
            debug!(uri = %uri, position = index, "fetch cancelled");
            return Err(ProfileFetchError::Cancelled { uri: uri.clone() });
        }
        let result = store.fetch(uri, preferred);
        if stop_on_failure && result.is_err() {
            first_failure.fetch_min(index, Ordering::AcqRel);
        }
        result
    };

    match rayon::ThreadPoolBuilder::new()
        .num_threads(workers.max(1))
        .thread_name(|i| format!("webid-fetch-{}", i))
        .build()
    {
        Ok(pool) => {
            debug!(uris = uris.len(), workers, "prefetching profiles");
            pool.install(|| uris.par_iter().enumerate().map(fetch).collect())
        }
        Err(e) => {
            warn!(error = %e, "could not start fetch pool; fetching sequentially");
            uris.iter().enumerate().map(fetch).collect()
        }
    }
}
