//! In-memory profile store for offline validation and tests.

use super::{FetchedDocument, MediaType, ProfileFetchError, ProfileStore};
use std::collections::BTreeMap;
use std::sync::Mutex;
use tracing::debug;

#[derive(Debug, Clone)]
struct StoredDocument {
    content_type: String,
    body: Vec<u8>,
}

/// [`ProfileStore`] serving documents registered up front.
///
/// Documents are keyed by URI; a lookup that misses is retried with the
/// fragment removed, so registering `https://a.example/card` serves
/// `https://a.example/card#me`. Every fetch is recorded and can be read back
/// with [`StaticProfileStore::requests`].
#[derive(Debug, Default)]
pub struct StaticProfileStore {
    documents: BTreeMap<String, StoredDocument>,
    requests: Mutex<Vec<String>>,
}

impl StaticProfileStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a document body served with `content_type`.
    pub fn insert(
        &mut self,
        uri: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) {
        self.documents.insert(
            uri.into(),
            StoredDocument {
                content_type: content_type.into(),
                body: body.into(),
            },
        );
    }

    /// Builder form of [`insert`](Self::insert).
    pub fn with_document(
        mut self,
        uri: impl Into<String>,
        content_type: impl Into<String>,
        body: impl Into<Vec<u8>>,
    ) -> Self {
        self.insert(uri, content_type, body);
        self
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    /// URIs passed to `fetch`, in call order.
    pub fn requests(&self) -> Vec<String> {
        self.requests
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }

    fn lookup(&self, uri: &str) -> Option<(&str, &StoredDocument)> {
        if let Some((key, doc)) = self.documents.get_key_value(uri) {
            return Some((key.as_str(), doc));
        }
        let without_fragment = uri.split('#').next().unwrap_or(uri);
        self.documents
            .get_key_value(without_fragment)
            .map(|(key, doc)| (key.as_str(), doc))
    }
}

impl ProfileStore for StaticProfileStore {
    fn fetch(
        &self,
        uri: &str,
        _preferred: Option<MediaType>,
    ) -> Result<FetchedDocument, ProfileFetchError> {
        if let Ok(mut log) = self.requests.lock() {
            log.push(uri.to_string());
        }

        let (key, doc) = self.lookup(uri).ok_or_else(|| ProfileFetchError::NotFound {
            uri: uri.to_string(),
        })?;
        let media_type = MediaType::from_content_type(&doc.content_type).ok_or_else(|| {
            ProfileFetchError::UnsupportedContentType {
                uri: uri.to_string(),
                content_type: doc.content_type.clone(),
            }
        })?;

        debug!(uri, document = key, bytes = doc.body.len(), "serving static profile");
        Ok(FetchedDocument {
            uri: key.to_string(),
            status: 200,
            content_type: doc.content_type.clone(),
            media_type,
            body: doc.body.clone(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    #[test]
    fn fragment_is_ignored_on_lookup() {
        let store = StaticProfileStore::new().with_document(
            "https://a.example/card",
            "application/rdf+xml",
            "<rdf:RDF/>",
        );
        let doc = store.fetch("https://a.example/card#me", None).unwrap();
        assert_eq!(doc.uri, "https://a.example/card");
        assert_eq!(doc.media_type, MediaType::RdfXml);
        assert_eq!(store.requests(), vec!["https://a.example/card#me"]);
    }

    #[test]
    fn unknown_uri_and_content_type_fail() {
        let store = StaticProfileStore::new().with_document(
            "https://a.example/card",
            "text/turtle",
            "<#me> a <#Person> .",
        );
        assert!(matches!(
            store.fetch("https://b.example/", None),
            Err(ProfileFetchError::NotFound { .. })
        ));
        assert!(matches!(
            store.fetch("https://a.example/card", None),
            Err(ProfileFetchError::UnsupportedContentType { .. })
        ));
    }
}
