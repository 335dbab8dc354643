//! Yelp Fusion implementation of the business-directory search.

use std::time::Duration;

use async_trait::async_trait;
use grub_core::config::DirectoryConfig;
use grub_core::{BusinessResult, DirectoryError, DirectorySearch, SearchQuery};
use reqwest::{Client, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::{debug, warn};

#[derive(Deserialize)]
struct SearchResponse {
    #[serde(default)]
    businesses: Vec<BusinessResult>,
}

pub struct YelpClient {
    client: Client,
    base_url: String,
    api_key: SecretString,
    result_limit: u32,
}

impl YelpClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: SecretString,
        timeout: Duration,
        result_limit: u32,
    ) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|error| DirectoryError::Network(error.to_string()))?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_owned(),
            api_key,
            result_limit,
        })
    }

    pub fn from_config(config: &DirectoryConfig) -> Result<Self, DirectoryError> {
        Self::new(
            config.base_url.clone(),
            config.api_key.clone(),
            Duration::from_secs(config.timeout_secs),
            config.result_limit,
        )
    }
}

#[async_trait]
impl DirectorySearch for YelpClient {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<BusinessResult>, DirectoryError> {
        let limit = self.result_limit.to_string();
        let response = self
            .client
            .get(format!("{}/businesses/search", self.base_url))
            .bearer_auth(self.api_key.expose_secret())
            .query(&[
                ("term", query.term()),
                ("location", query.location()),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .map_err(|error| DirectoryError::Network(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            warn!(
                event_name = "egress.directory.http_status",
                status = %status,
                "directory search returned an error status"
            );
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => DirectoryError::Unauthorized,
                StatusCode::TOO_MANY_REQUESTS => DirectoryError::RateLimited,
                other => DirectoryError::UnexpectedStatus { status: other.as_u16() },
            });
        }

        let body: SearchResponse =
            response.json().await.map_err(|error| DirectoryError::Decode(error.to_string()))?;
        debug!(
            event_name = "egress.directory.search_succeeded",
            result_count = body.businesses.len(),
            "directory search succeeded"
        );
        Ok(body.businesses)
    }
}
