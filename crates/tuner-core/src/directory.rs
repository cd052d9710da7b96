//! Station-directory search client
//!
//! Queries a radio-browser style JSON endpoint
//! (<https://www.radio-browser.info/>) for station metadata.  `Auto` mode
//! falls back across the concrete search modes in a fixed order, stopping
//! at the first one that returns results.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::DirectoryError;
use crate::protocol::StationRecord;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SearchMode {
    #[default]
    Name,
    Tag,
    Country,
    Language,
    Auto,
}

/// Fallback order tried by `Auto`.
const AUTO_ORDER: [SearchMode; 4] = [
    SearchMode::Name,
    SearchMode::Tag,
    SearchMode::Country,
    SearchMode::Language,
];

impl SearchMode {
    /// Query parameter name for a concrete mode; `Auto` has none.
    pub fn query_param(self) -> Option<&'static str> {
        match self {
            SearchMode::Name => Some("name"),
            SearchMode::Tag => Some("tag"),
            SearchMode::Country => Some("country"),
            SearchMode::Language => Some("language"),
            SearchMode::Auto => None,
        }
    }
}

/// One station as returned by the directory.  Transient: consumed by
/// "add selected" and discarded on the next search.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SearchResult {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub url_resolved: String,
}

impl SearchResult {
    /// Candidate stream URL: prefer `url_resolved`, fall back to `url`.
    pub fn stream_url(&self) -> &str {
        if self.url_resolved.is_empty() {
            &self.url
        } else {
            &self.url_resolved
        }
    }

    /// Build a station record from this result and an already-resolved URL.
    pub fn into_station(self, resolved_url: String) -> StationRecord {
        let name = if self.name.trim().is_empty() {
            "(no name)".to_string()
        } else {
            self.name
        };
        StationRecord::new(name, self.tags, resolved_url)
    }
}

#[derive(Clone)]
pub struct DirectoryClient {
    client: Client,
    base_url: String,
    limit: usize,
    timeout: Duration,
}

impl DirectoryClient {
    pub fn new(
        client: Client,
        base_url: impl Into<String>,
        limit: usize,
        timeout: Duration,
    ) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            limit,
            timeout,
        }
    }

    /// Search the directory.
    ///
    /// Concrete modes issue a single request.  `Auto` walks the fallback
    /// order and returns the first non-empty result set; a failing or empty
    /// mode is logged and the next one tried.  All modes empty is an empty
    /// `Ok`; only a hard failure of the final attempted mode surfaces as an
    /// error.
    pub async fn search(
        &self,
        query: &str,
        mode: SearchMode,
    ) -> Result<Vec<SearchResult>, DirectoryError> {
        let modes: &[SearchMode] = match mode {
            SearchMode::Auto => &AUTO_ORDER,
            _ => std::slice::from_ref(&mode),
        };

        let mut last_err = None;
        for m in modes {
            let Some(param) = m.query_param() else {
                continue;
            };
            match self.search_one(param, query).await {
                Ok(results) if !results.is_empty() => {
                    debug!(mode = param, count = results.len(), "directory search hit");
                    return Ok(results);
                }
                Ok(_) => {
                    debug!(mode = param, "directory search returned nothing");
                    last_err = None;
                }
                Err(err) => {
                    warn!(mode = param, error = %err, "directory search mode failed");
                    last_err = Some(err);
                }
            }
        }

        match last_err {
            Some(err) => Err(DirectoryError::from(err)),
            None => Ok(Vec::new()),
        }
    }

    async fn search_one(
        &self,
        param: &str,
        query: &str,
    ) -> Result<Vec<SearchResult>, reqwest::Error> {
        let url = format!("{}/json/stations/search", self.base_url);
        let limit = self.limit.to_string();
        self.client
            .get(&url)
            .query(&[(param, query), ("limit", limit.as_str()), ("hidebroken", "true")])
            .timeout(self.timeout)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await
    }
}
