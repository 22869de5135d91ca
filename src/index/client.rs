//! Module index feed API

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::debug;
use url::Url;

use crate::cancel::CancelToken;
use crate::error::FetchError;
use crate::proxy::client::FetchClient;

/// One change observed in the feed
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct FeedEvent {
    #[serde(alias = "path")]
    pub path: String,
    #[serde(alias = "version")]
    pub version: String,
    #[serde(alias = "timestamp")]
    pub timestamp: String,
}

impl FeedEvent {
    pub fn new(path: &str, version: &str, timestamp: &str) -> Self {
        Self {
            path: path.to_string(),
            version: version.to_string(),
            timestamp: timestamp.to_string(),
        }
    }
}

#[derive(Clone)]
pub struct IndexClient {
    fetch: Arc<FetchClient>,
    url: String,
}

impl IndexClient {
    pub fn new(fetch: Arc<FetchClient>, url: &str) -> Self {
        Self {
            fetch,
            url: url.to_string(),
        }
    }

    /// Reads one page of events.
    ///
    /// `since` is empty or a timestamp from a previously read event.
    /// `limit` is passed on to the index unless it is zero.
    pub async fn read_page(
        &self,
        since: &str,
        limit: usize,
        cancel: &CancelToken,
    ) -> Result<Vec<FeedEvent>, FetchError> {
        let url = self.page_url(since, limit)?;
        debug!("Reading index page {}", url);
        let body = self.fetch.fetch(&url, cancel).await?;

        // The index returns newline-delimited JSON objects.
        serde_json::Deserializer::from_slice(&body)
            .into_iter::<FeedEvent>()
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| FetchError::InvalidResponse(format!("decoding JSON: {}", e)))
    }

    fn page_url(&self, since: &str, limit: usize) -> Result<String, FetchError> {
        let mut url = Url::parse(&self.url)
            .map_err(|e| FetchError::InvalidPath(format!("index URL {:?}: {}", self.url, e)))?;
        {
            let mut query = url.query_pairs_mut();
            if !since.is_empty() {
                query.append_pair("since", since);
            }
            if limit > 0 {
                query.append_pair("limit", &limit.to_string());
            }
        }
        // Avoid a dangling '?' when no parameters were added.
        if url.query() == Some("") {
            url.set_query(None);
        }
        Ok(url.into())
    }
}
