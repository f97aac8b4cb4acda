//! HTTP fetching of subscription feeds.

use async_trait::async_trait;
use famdash_core::{EventFetcher, FamDashError, FamDashResult, RawEvent};
use tracing::debug;

use crate::parse::parse_events;

/// Fetches ICS subscription feeds and hands parsed events to the engine.
///
/// Cheap to clone; the underlying reqwest client pools connections.
#[derive(Clone)]
pub struct WebcalFetcher {
    client: reqwest::Client,
}

impl WebcalFetcher {
    pub fn new() -> Self {
        WebcalFetcher {
            client: reqwest::Client::new(),
        }
    }
}

impl Default for WebcalFetcher {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EventFetcher for WebcalFetcher {
    async fn fetch(&self, url: &str) -> FamDashResult<Vec<RawEvent>> {
        debug!(%url, "fetching subscription feed");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FamDashError::Fetch(e.to_string()))?;

        if !response.status().is_success() {
            return Err(FamDashError::Fetch(format!(
                "HTTP {} from {}",
                response.status(),
                url
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| FamDashError::Fetch(e.to_string()))?;

        parse_events(&body)
    }
}
