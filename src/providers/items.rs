//! Random-item provider: reads previously submitted item texts (with their
//! emoji) from the external item store, used only to serve suggestions.
//!
//! The store is an opaque remote service. Failures degrade to an empty set;
//! nothing in the game loop depends on it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One suggested item.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Suggestion {
    pub text: String,
    pub emoji: String,
}

#[async_trait]
pub trait ItemStore: Send + Sync {
    /// Up to `n` random previously-submitted items; empty on any failure.
    async fn sample(&self, n: usize) -> Vec<Suggestion>;
}

/// HTTP client for the external item store.
pub struct HttpItemStore {
    client: reqwest::Client,
    base_url: String,
}

impl HttpItemStore {
    pub fn new(base_url: String, request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self { client, base_url }
    }
}

#[async_trait]
impl ItemStore for HttpItemStore {
    async fn sample(&self, n: usize) -> Vec<Suggestion> {
        let url = format!("{}/items/random", self.base_url.trim_end_matches('/'));
        let result = self
            .client
            .get(&url)
            .query(&[("count", n)])
            .send()
            .await
            .and_then(reqwest::Response::error_for_status);
        match result {
            Ok(response) => match response.json::<Vec<Suggestion>>().await {
                Ok(items) => items,
                Err(error) => {
                    tracing::warn!(%error, "item store returned malformed body");
                    Vec::new()
                }
            },
            Err(error) => {
                tracing::warn!(%error, "item store request failed");
                Vec::new()
            }
        }
    }
}

/// Used when no item store is configured.
pub struct NullItemStore;

#[async_trait]
impl ItemStore for NullItemStore {
    async fn sample(&self, _n: usize) -> Vec<Suggestion> {
        Vec::new()
    }
}
