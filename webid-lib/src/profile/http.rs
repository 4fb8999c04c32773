//! Profile fetching over HTTP(S) with a blocking `reqwest` client.

use super::{FetchOptions, FetchedDocument, MediaType, ProfileFetchError, ProfileStore};
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::io::Read;
use tracing::{debug, warn};

/// [`ProfileStore`] that dereferences WebID URIs over the network.
///
/// The fragment of a WebID URI is never sent; redirects are followed and the
/// final URL becomes the parse base of the document.
#[derive(Debug, Clone)]
pub struct HttpProfileStore {
    client: reqwest::blocking::Client,
    max_body_bytes: u64,
}

impl HttpProfileStore {
    pub fn new(options: &FetchOptions) -> Result<Self, ProfileFetchError> {
        if !options.verify_tls {
            warn!("TLS certificate verification of profile hosts is disabled");
        }

        let client = reqwest::blocking::Client::builder()
            .danger_accept_invalid_certs(!options.verify_tls)
            .user_agent(options.user_agent.clone())
            .timeout(options.timeout)
            .build()
            .map_err(|e| ProfileFetchError::Client(e.to_string()))?;

        Ok(Self {
            client,
            max_body_bytes: options.max_body_bytes,
        })
    }
}

impl ProfileStore for HttpProfileStore {
    fn fetch(
        &self,
        uri: &str,
        preferred: Option<MediaType>,
    ) -> Result<FetchedDocument, ProfileFetchError> {
        let accept = MediaType::accept_header(preferred);
        debug!(uri, accept = %accept, "fetching profile");

        let transport = |e: reqwest::Error| ProfileFetchError::Transport {
            uri: uri.to_string(),
            reason: e.to_string(),
        };

        let response = self
            .client
            .get(uri)
            .header(ACCEPT, accept)
            .send()
            .map_err(transport)?;

        let status = response.status();
        let final_uri = response.url().to_string();
        if !status.is_success() {
            return Err(ProfileFetchError::Status {
                uri: uri.to_string(),
                status: status.as_u16(),
            });
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        let media_type = MediaType::from_content_type(&content_type).ok_or_else(|| {
            ProfileFetchError::UnsupportedContentType {
                uri: uri.to_string(),
                content_type: content_type.clone(),
            }
        })?;

        let too_large = || ProfileFetchError::TooLarge {
            uri: uri.to_string(),
            limit: self.max_body_bytes,
        };
        if response.content_length().is_some_and(|len| len > self.max_body_bytes) {
            return Err(too_large());
        }

        let mut body = Vec::new();
        response
            .take(self.max_body_bytes.saturating_add(1))
            .read_to_end(&mut body)
            .map_err(|e| ProfileFetchError::Transport {
                uri: uri.to_string(),
                reason: e.to_string(),
            })?;
        if body.len() as u64 > self.max_body_bytes {
            return Err(too_large());
        }

        debug!(
            uri,
            final_uri = %final_uri,
            status = status.as_u16(),
            content_type = %content_type,
            bytes = body.len(),
            "fetched profile"
        );

        Ok(FetchedDocument {
            uri: final_uri,
            status: status.as_u16(),
            content_type,
            media_type,
            body,
        })
    }
}
