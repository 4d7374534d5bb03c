//! Summary generator contract and the values that flow through it

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

/// Article text to summarize
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SummaryInput {
    /// Must match the id the summary is requested for, when present
    pub article_id: Option<String>,
    pub title: Option<String>,
    pub content: String,
}

impl SummaryInput {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_article_id(mut self, article_id: impl Into<String>) -> Self {
        self.article_id = Some(article_id.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }
}

/// A generated summary, fresh or served from the cache
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SummaryResult {
    pub article_id: String,
    pub content: String,
    /// Name of the generator that produced `content`
    pub generator: String,
    pub generated_at: DateTime<Utc>,
    #[serde(default)]
    pub served_from_cache: bool,
}

impl SummaryResult {
    /// Same summary, marked as served from the cache
    pub fn from_cache(mut self) -> Self {
        self.served_from_cache = true;
        self
    }
}

/// Upstream summarization backend
///
/// Calls are slow and rate limited; the service invokes `generate` at most
/// once per leader and never retries.
#[async_trait]
pub trait SummaryGenerator: Send + Sync + Debug {
    fn name(&self) -> &str;

    /// Whether the backend is configured and reachable
    async fn is_available(&self) -> bool;

    async fn generate(&self, input: &SummaryInput) -> anyhow::Result<String>;
}
