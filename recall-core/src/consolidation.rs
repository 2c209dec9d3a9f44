//! Memory Consolidation — periodic inference of new associations.
//!
//! Every firing takes (and clears) the buffer of recently stored memory
//! ids, scores every unordered pair in that batch and links pairs whose
//! similarity exceeds the threshold with a one-directional semantic edge,
//! from the earlier-buffered memory to the later one.
//!
//! Similarity = Type + Temporal + Lexical, clamped to [0, 1]:
//!   Type      = 0.2 when both memories are the same variant
//!   Temporal  = 0.3 within one day, 0.15 within seven days, else 0
//!   Lexical   = 0.5 × Jaccard(lowercase word sets)
//!
//! The pass is O(n²) in batch size; `max_batch_size` bounds a single pass.

use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration, Instant};

use chrono::Duration as ChronoDuration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::memory::Memory;
use crate::store::MemoryStore;
use crate::types::{Association, AssociationType, MemoryId, clamp_unit};

/// Bonus for two memories of the same variant.
pub const TYPE_BONUS: f32 = 0.2;
/// Bonus for two memories formed within a day of each other.
pub const SAME_DAY_BONUS: f32 = 0.3;
/// Bonus for two memories formed within a week of each other.
pub const SAME_WEEK_BONUS: f32 = 0.15;
/// Weight of the word-set Jaccard similarity.
pub const LEXICAL_WEIGHT: f32 = 0.5;

/// Metadata key marking edges created by consolidation.
pub const ORIGIN_KEY: &str = "origin";
/// Metadata value marking edges created by consolidation.
pub const ORIGIN_CONSOLIDATION: &str = "consolidation";

/// Outcome of one consolidation pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConsolidationReport {
    /// Buffered ids taken for this pass.
    pub batch_size: usize,
    /// Pairs scored.
    pub pairs_compared: usize,
    /// Edges created, as `(source, target)`.
    pub created: Vec<(MemoryId, MemoryId)>,
    /// Wall time of the pass.
    pub elapsed: Duration,
}

/// Similarity of two memories, in `[0, 1]`.
#[must_use]
pub fn similarity(a: &Memory, b: &Memory) -> f32 {
    let type_bonus = if a.memory_type() == b.memory_type() {
        TYPE_BONUS
    } else {
        0.0
    };

    let gap = (a.timestamp - b.timestamp).abs();
    let temporal_bonus = if gap <= ChronoDuration::days(1) {
        SAME_DAY_BONUS
    } else if gap <= ChronoDuration::days(7) {
        SAME_WEEK_BONUS
    } else {
        0.0
    };

    let lexical = LEXICAL_WEIGHT * jaccard(&tokenize(&a.content), &tokenize(&b.content));

    clamp_unit(type_bonus + temporal_bonus + lexical)
}

/// Lowercase word set of `text`.
#[must_use]
pub fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Jaccard index of two sets; 0 when both are empty.
#[must_use]
pub fn jaccard(a: &HashSet<String>, b: &HashSet<String>) -> f32 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f32 / union as f32
}

/// Score every unordered pair of `batch` and link similar pairs.
///
/// Ids no longer in the store are skipped. Edge strength is the pair's
/// similarity.
pub fn consolidate_batch(
    store: &mut MemoryStore,
    batch: &[MemoryId],
    threshold: f32,
) -> ConsolidationReport {
    let start = Instant::now();
    let memories: Vec<Memory> = batch.iter().filter_map(|id| store.get(id).cloned()).collect();

    let mut report = ConsolidationReport {
        batch_size: batch.len(),
        ..ConsolidationReport::default()
    };

    for (i, source) in memories.iter().enumerate() {
        for target in &memories[i + 1..] {
            report.pairs_compared += 1;
            let score = similarity(source, target);
            if score <= threshold {
                continue;
            }
            let edge = Association::new(target.id, AssociationType::Semantic, score)
                .with_metadata(ORIGIN_KEY, ORIGIN_CONSOLIDATION.into());
            if store.attach(source.id, edge) {
                report.created.push((source.id, target.id));
            }
        }
    }

    report.elapsed = start.elapsed();
    debug!(
        batch = report.batch_size,
        pairs = report.pairs_compared,
        created = report.created.len(),
        elapsed_us = report.elapsed.as_micros(),
        "Consolidation pass finished"
    );
    report
}

// ---------------------------------------------------------------------------
// Periodic task
// ---------------------------------------------------------------------------

/// Handle to a running periodic consolidation task.
///
/// Shutting down (or dropping the handle) stops future firings. A pass
/// already in progress runs to completion.
#[derive(Debug)]
pub struct ConsolidationHandle {
    shutdown: watch::Sender<bool>,
    task: Option<JoinHandle<()>>,
}

impl ConsolidationHandle {
    /// Stop future firings and wait for the task loop to exit.
    pub async fn shutdown(mut self) {
        let _ = self.shutdown.send(true);
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }

    /// Whether the task loop has exited.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }
}

impl Drop for ConsolidationHandle {
    fn drop(&mut self) {
        let _ = self.shutdown.send(true);
    }
}

/// Spawn a task on the current tokio runtime that awaits `fire` every
/// `period`, starting one period from now. The loop ends when `fire`
/// resolves to `false` or the handle shuts down.
///
/// # Panics
/// Panics if called outside a tokio runtime.
pub fn spawn_periodic<F, Fut>(period: Duration, mut fire: F) -> ConsolidationHandle
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = bool> + Send + 'static,
{
    let period = period.max(Duration::from_millis(1));
    let (tx, mut rx) = watch::channel(false);
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        info!(period_ms = period.as_millis(), "Consolidation scheduler started");
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if !fire().await {
                        break;
                    }
                }
                changed = rx.changed() => {
                    if changed.is_err() || *rx.borrow() {
                        break;
                    }
                }
            }
        }
        info!("Consolidation scheduler stopped");
    });
    ConsolidationHandle {
        shutdown: tx,
        task: Some(task),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{Knowledge, NewMemory, Procedure};
    use chrono::Utc;

    fn fact(text: &str) -> NewMemory {
        NewMemory::semantic(text, Knowledge::new("s", "p", "o"))
    }

    #[test]
    fn tokenize_lowercases_and_splits() {
        let words = tokenize("Coffee, coffee & TEA!");
        assert_eq!(words.len(), 2);
        assert!(words.contains("coffee"));
        assert!(words.contains("tea"));
    }

    #[test]
    fn jaccard_edges() {
        let empty = HashSet::new();
        assert_eq!(jaccard(&empty, &empty), 0.0);
        assert!((jaccard(&tokenize("a b"), &tokenize("b c")) - 1.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn similarity_components() {
        let now = Utc::now();
        let mut store = MemoryStore::new();
        let a = store.insert(fact("coffee keeps me awake").with_timestamp(now));
        let b = store.insert(fact("coffee keeps me awake").with_timestamp(now));
        let c = store.insert(
            NewMemory::procedural("unrelated words", Procedure::new("x", ["y"], 0.5))
                .with_timestamp(now - ChronoDuration::days(3)),
        );
        let d = store.insert(fact("zzz").with_timestamp(now - ChronoDuration::days(30)));

        assert!((similarity(&a, &b) - 1.0).abs() < 1e-6);
        assert!((similarity(&a, &c) - SAME_WEEK_BONUS).abs() < 1e-6);
        assert!((similarity(&a, &d) - TYPE_BONUS).abs() < 1e-6);
    }

    #[test]
    fn links_similar_pairs_one_way() {
        let mut store = MemoryStore::new();
        let a = store.insert(fact("I love hiking in the mountains"));
        let b = store.insert(fact("I love hiking in the mountains"));
        let c = store.insert(fact("Quarterly tax paperwork"));

        let report = consolidate_batch(&mut store, &[a.id, b.id, c.id], 0.7);
        assert_eq!(report.pairs_compared, 3);
        assert_eq!(report.created, vec![(a.id, b.id)]);
        assert_eq!(store.associations_of(&a.id).len(), 1);
        assert!(store.associations_of(&b.id).is_empty());
        let edge = &store.associations_of(&a.id)[0];
        assert_eq!(edge.kind, AssociationType::Semantic);
        assert_eq!(
            edge.metadata.get(ORIGIN_KEY),
            Some(&serde_json::Value::from(ORIGIN_CONSOLIDATION))
        );
    }

    #[test]
    fn missing_ids_are_skipped() {
        let mut store = MemoryStore::new();
        let a = store.insert(fact("alpha"));
        let report = consolidate_batch(&mut store, &[a.id, MemoryId::new()], 0.7);
        assert_eq!(report.batch_size, 2);
        assert_eq!(report.pairs_compared, 0);
    }
}
