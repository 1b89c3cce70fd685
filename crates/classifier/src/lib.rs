//! Client for the transaction-category classifier sidecar.
//!
//! The classifier is an external HTTP service that, given a free-text entry
//! description, suggests a category string with a confidence score. It is
//! consulted for suggestions only: nothing here ever participates in balance
//! math, and a failed or slow prediction degrades to "no suggestion".
//!
//! Predictions are memoized in [`PredictionCache`], an explicitly owned
//! component with a bounded size and TTL eviction — constructed once at
//! process start and passed by reference, never a module-level global.

use std::collections::{HashMap, VecDeque};
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// A category suggestion returned by the classifier.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Suggestion {
    pub category: String,
    pub confidence: f64,
}

#[derive(Debug, thiserror::Error)]
pub enum ClassifierError {
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),
    #[error("{status}: {message}")]
    Server { status: StatusCode, message: String },
}

#[derive(Debug, Serialize)]
struct PredictRequest<'a> {
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct PredictData {
    category: String,
    confidence: f64,
}

#[derive(Debug, Deserialize)]
struct PredictResponse {
    data: PredictData,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    detail: String,
}

/// HTTP client for the classifier service.
#[derive(Clone, Debug)]
pub struct ClassifierClient {
    client: Client,
    base_url: String,
}

impl ClassifierClient {
    pub fn new(client: Client, base_url: String) -> Self {
        Self { client, base_url }
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    /// Ask the classifier for a category suggestion.
    pub async fn suggest(&self, text: &str) -> Result<Suggestion, ClassifierError> {
        let resp = self
            .client
            .post(self.url("/api/v1/predict"))
            .json(&PredictRequest { text })
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            let body = resp.json::<PredictResponse>().await?;
            return Ok(Suggestion {
                category: body.data.category,
                confidence: body.data.confidence,
            });
        }

        let message = match resp.json::<ErrorBody>().await {
            Ok(err) => err.detail,
            Err(_) => "classifier error".to_string(),
        };
        Err(ClassifierError::Server { status, message })
    }

    /// Like [`suggest`](Self::suggest), but consults the cache first and
    /// stores fresh predictions in it. Failures are logged and mapped to
    /// `None`: a missing suggestion is never an error for the caller.
    pub async fn suggest_cached(
        &self,
        cache: &mut PredictionCache,
        text: &str,
    ) -> Option<Suggestion> {
        if let Some(hit) = cache.get(text) {
            return Some(hit);
        }
        match self.suggest(text).await {
            Ok(suggestion) => {
                cache.insert(text.to_string(), suggestion.clone());
                Some(suggestion)
            }
            Err(err) => {
                tracing::warn!(error = %err, "category prediction unavailable");
                None
            }
        }
    }
}

struct CachedPrediction {
    suggestion: Suggestion,
    inserted_at: Instant,
}

/// Bounded, TTL-evicting memo of predictions keyed by input text.
///
/// Expired entries are dropped on access; when the cache is full the oldest
/// insertion is dropped first.
pub struct PredictionCache {
    entries: HashMap<String, CachedPrediction>,
    order: VecDeque<String>,
    capacity: usize,
    ttl: Duration,
}

impl PredictionCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::with_capacity(capacity),
            order: VecDeque::with_capacity(capacity),
            capacity,
            ttl,
        }
    }

    /// Returns the cached suggestion for `text` unless it has expired.
    pub fn get(&mut self, text: &str) -> Option<Suggestion> {
        let cached = self.entries.get(text)?;
        if cached.inserted_at.elapsed() > self.ttl {
            self.entries.remove(text);
            self.order.retain(|key| key != text);
            return None;
        }
        Some(cached.suggestion.clone())
    }

    /// Stores a suggestion, evicting the oldest entry when at capacity.
    pub fn insert(&mut self, text: String, suggestion: Suggestion) {
        if self.entries.contains_key(&text) {
            self.order.retain(|key| key != &text);
        } else if self.entries.len() >= self.capacity
            && let Some(oldest) = self.order.pop_front()
        {
            self.entries.remove(&oldest);
        }

        self.entries.insert(
            text.clone(),
            CachedPrediction {
                suggestion,
                inserted_at: Instant::now(),
            },
        );
        self.order.push_back(text);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
