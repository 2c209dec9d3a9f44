//! Memory Retrieval — additive multi-criterion scoring with pagination.
//!
//! One linear pass scores every stored memory (see [`scoring`]), non-zero
//! scores are ranked descending with ties kept in scan order, and the
//! requested page is cut out. Memories on the returned page get their
//! usage metadata touched.

pub mod scoring;

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::RetrievalConfig;
use crate::memory::Memory;
use crate::store::MemoryStore;
use crate::types::{MemoryId, MemoryType, RelevanceScore};

/// An inclusive time window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeRange {
    /// Window start (inclusive).
    pub start: DateTime<Utc>,
    /// Window end (inclusive).
    pub end: DateTime<Utc>,
}

impl TimeRange {
    /// Create a window.
    #[must_use]
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        Self { start, end }
    }

    /// Whether `t` lies in `[start, end]`.
    #[must_use]
    pub fn contains(&self, t: DateTime<Utc>) -> bool {
        self.start <= t && t <= self.end
    }
}

/// A retrieval query. Every criterion is optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RetrievalQuery {
    /// Hard filter on the memory variant.
    #[serde(default)]
    pub memory_type: Option<MemoryType>,
    /// Case-insensitive content substrings.
    #[serde(default)]
    pub keywords: Vec<String>,
    /// Timestamp window.
    #[serde(default)]
    pub time_range: Option<TimeRange>,
    /// Minimum importance.
    #[serde(default)]
    pub min_importance: Option<f32>,
    /// Entity names to match against extracted entity values.
    #[serde(default)]
    pub entities: Vec<String>,
    /// Page size (defaults to the configured limit).
    #[serde(default)]
    pub limit: Option<usize>,
    /// Number of ranked results to skip.
    #[serde(default)]
    pub offset: Option<usize>,
}

impl RetrievalQuery {
    /// An empty query.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Restrict to one variant.
    #[must_use]
    pub fn of_type(mut self, memory_type: MemoryType) -> Self {
        self.memory_type = Some(memory_type);
        self
    }

    /// Add keywords.
    #[must_use]
    pub fn with_keywords<I, S>(mut self, keywords: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.keywords.extend(keywords.into_iter().map(Into::into));
        self
    }

    /// Set the time window.
    #[must_use]
    pub fn within(mut self, range: TimeRange) -> Self {
        self.time_range = Some(range);
        self
    }

    /// Set the minimum importance.
    #[must_use]
    pub fn with_min_importance(mut self, min: f32) -> Self {
        self.min_importance = Some(min);
        self
    }

    /// Add entity names.
    #[must_use]
    pub fn with_entities<I, S>(mut self, entities: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.entities.extend(entities.into_iter().map(Into::into));
        self
    }

    /// Set the page size.
    #[must_use]
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Set the page offset.
    #[must_use]
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }
}

/// A ranked page of memories.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    /// The requested page, best first.
    pub memories: Vec<Memory>,
    /// Number of memories with a non-zero score, before pagination.
    pub total_count: usize,
    /// Score of every returned memory.
    pub relevance_scores: HashMap<MemoryId, f32>,
    /// Wall time spent answering the query.
    pub execution_time: Duration,
}

impl RetrievalResult {
    /// Score of a returned memory.
    #[must_use]
    pub fn score_of(&self, id: &MemoryId) -> Option<f32> {
        self.relevance_scores.get(id).copied()
    }
}

/// The retrieval engine.
#[derive(Debug, Clone)]
pub struct RetrievalEngine {
    config: RetrievalConfig,
}

impl RetrievalEngine {
    /// Create a new retrieval engine with the given configuration.
    #[must_use]
    pub fn new(config: RetrievalConfig) -> Self {
        Self { config }
    }

    /// Rank every stored memory against `query` and return one page.
    ///
    /// Performance target: < 100ms.
    pub fn retrieve(&self, store: &mut MemoryStore, query: &RetrievalQuery) -> RetrievalResult {
        let start = Instant::now();
        let limit = query.limit.unwrap_or(self.config.default_limit);
        let offset = query.offset.unwrap_or(0);

        let mut ranked: Vec<(MemoryId, RelevanceScore)> = store
            .iter()
            .map(|memory| (memory.id, scoring::score(memory, query)))
            .filter(|(_, score)| *score > RelevanceScore::ZERO)
            .collect();

        // Stable: equal scores keep scan order.
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        let total_count = ranked.len();
        let now = Utc::now();
        let mut memories = Vec::with_capacity(limit.min(total_count));
        let mut relevance_scores = HashMap::with_capacity(limit.min(total_count));

        for (id, score) in ranked.into_iter().skip(offset).take(limit) {
            if let Some(memory) = store.touch(&id, now) {
                memories.push(memory.clone());
                relevance_scores.insert(id, score.value());
            }
        }

        let execution_time = start.elapsed();
        if execution_time > Duration::from_millis(self.config.slow_query_ms) {
            warn!(
                elapsed_ms = execution_time.as_millis(),
                budget_ms = self.config.slow_query_ms,
                scanned = store.len(),
                "Slow retrieval query"
            );
        }
        debug!(
            total = total_count,
            returned = memories.len(),
            offset,
            limit,
            elapsed_us = execution_time.as_micros(),
            "Retrieved memories"
        );

        RetrievalResult {
            memories,
            total_count,
            relevance_scores,
            execution_time,
        }
    }
}
