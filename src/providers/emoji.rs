//! Emoji provider: assigns an emoji to a freshly submitted item text.
//!
//! The real implementation calls an external LLM-backed lookup service with
//! a process-wide daily budget. Overrunning the budget is not an error, it
//! is the signal to fall back to a fixed pool; the same pool covers service
//! failures and misconfigured deployments, so callers always get an emoji.

use async_trait::async_trait;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::hash::{Hash, Hasher};
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::time::Duration;

/// Fixed fallback pool; indexed deterministically by a hash of the text so
/// the same text always falls back to the same emoji.
pub const FALLBACK_EMOJI: &[&str] = &[
    "✨", "🎲", "🎯", "🍀", "🔥", "🌈", "⭐", "🎁", "🎪", "🧩", "🍉", "🚀", "🎨", "🪩", "🌊", "🦄",
];

/// Deterministic fallback emoji for an item text.
pub fn fallback_emoji(text: &str) -> &'static str {
    let mut hasher = std::collections::hash_map::DefaultHasher::new();
    text.hash(&mut hasher);
    let index = (hasher.finish() % FALLBACK_EMOJI.len() as u64) as usize;
    FALLBACK_EMOJI[index]
}

#[async_trait]
pub trait EmojiService: Send + Sync {
    /// Produce a single emoji for the text. Must never fail; degraded paths
    /// return a fallback.
    async fn emoji_for(&self, text: &str) -> String;
}

/// Process-wide daily usage counter. The count resets when the UTC day
/// rolls over; the reset is racy by design, which at worst grants a handful
/// of extra lookups around midnight.
#[derive(Debug)]
pub struct DailyBudget {
    limit: u32,
    used: AtomicU32,
    day: AtomicI64,
}

impl DailyBudget {
    pub fn new(limit: u32) -> Self {
        Self {
            limit,
            used: AtomicU32::new(0),
            day: AtomicI64::new(current_day()),
        }
    }

    /// Take one unit of budget; false means the caller should fall back.
    pub fn try_consume(&self) -> bool {
        let today = current_day();
        if self.day.swap(today, Ordering::Relaxed) != today {
            self.used.store(0, Ordering::Relaxed);
        }
        self.used.fetch_add(1, Ordering::Relaxed) < self.limit
    }

    pub fn used_today(&self) -> u32 {
        self.used.load(Ordering::Relaxed).min(self.limit)
    }
}

fn current_day() -> i64 {
    Utc::now().timestamp() / 86_400
}

#[derive(Debug, Serialize)]
struct LookupRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct LookupResponse {
    emoji: String,
}

/// HTTP client for the external emoji lookup service.
///
/// With no URL configured the service runs in disabled mode and every call
/// resolves from the fallback pool.
pub struct HttpEmojiService {
    client: reqwest::Client,
    url: Option<String>,
    budget: DailyBudget,
}

impl HttpEmojiService {
    pub fn new(url: Option<String>, daily_budget: u32, request_timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .build()
            .unwrap_or_default();
        Self {
            client,
            url,
            budget: DailyBudget::new(daily_budget),
        }
    }

    async fn lookup(&self, url: &str, text: &str) -> Result<String, reqwest::Error> {
        let response: LookupResponse = self
            .client
            .post(url)
            .json(&LookupRequest { text })
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;
        Ok(response.emoji)
    }
}

#[async_trait]
impl EmojiService for HttpEmojiService {
    async fn emoji_for(&self, text: &str) -> String {
        let Some(url) = &self.url else {
            return fallback_emoji(text).to_string();
        };
        if !self.budget.try_consume() {
            tracing::debug!("emoji budget exhausted for today, using fallback");
            return fallback_emoji(text).to_string();
        }
        match self.lookup(url, text).await {
            Ok(emoji) if crate::protocol::is_valid_emoji(&emoji) => emoji,
            Ok(other) => {
                tracing::warn!(emoji = %other, "emoji service returned a non-emoji, using fallback");
                fallback_emoji(text).to_string()
            }
            Err(error) => {
                tracing::warn!(%error, "emoji lookup failed, using fallback");
                fallback_emoji(text).to_string()
            }
        }
    }
}
