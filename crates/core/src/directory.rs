//! Business-directory search interface. The HTTP implementation lives in the
//! server binary; the core only depends on [`DirectorySearch`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SearchQuery {
    term: String,
    location: String,
}

impl SearchQuery {
    /// Fails fast when either field is blank rather than issuing a request
    /// that can only return noise.
    pub fn new(
        term: impl Into<String>,
        location: impl Into<String>,
    ) -> Result<Self, DirectoryError> {
        let term = term.into();
        let location = location.into();
        if term.trim().is_empty() {
            return Err(DirectoryError::EmptyQuery { field: "term" });
        }
        if location.trim().is_empty() {
            return Err(DirectoryError::EmptyQuery { field: "location" });
        }
        Ok(Self { term, location })
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn location(&self) -> &str {
        &self.location
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusinessResult {
    pub name: String,
    pub review_count: u64,
    pub rating: f64,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub image_url: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DirectoryError {
    #[error("search {field} must not be empty")]
    EmptyQuery { field: &'static str },
    #[error("directory request failed: {0}")]
    Network(String),
    #[error("directory rejected the api key")]
    Unauthorized,
    #[error("directory rate limit exceeded")]
    RateLimited,
    #[error("directory returned unexpected status {status}")]
    UnexpectedStatus { status: u16 },
    #[error("directory response could not be decoded: {0}")]
    Decode(String),
}

/// An empty `Vec` is a successful search with no matches, not an error.
#[async_trait]
pub trait DirectorySearch: Send + Sync {
    async fn search(&self, query: &SearchQuery) -> Result<Vec<BusinessResult>, DirectoryError>;
}

#[async_trait]
impl<T> DirectorySearch for Arc<T>
where
    T: DirectorySearch + ?Sized,
{
    async fn search(&self, query: &SearchQuery) -> Result<Vec<BusinessResult>, DirectoryError> {
        (**self).search(query).await
    }
}
