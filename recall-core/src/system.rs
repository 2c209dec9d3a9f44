//! The memory system facade.
//!
//! [`MemorySystem`] is a cheaply cloneable handle over one shared state:
//! the [`MemoryStore`] (both tables and the sequence counter behind a single
//! lock), the consolidation buffer, the in-progress guard, and the
//! encryption and compression units.
//!
//! Store, retrieval and association calls complete without yielding.
//! Encrypted export and import run key derivation on the blocking pool and
//! are the only async operations.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use crate::compression::{self, CompressionMode, Compressor};
use crate::config::RecallConfig;
use crate::consolidation::{self, ConsolidationHandle, ConsolidationReport};
use crate::crypto::{EncryptedPayload, Encryptor};
use crate::error::{RecallError, Result};
use crate::memory::{Emotion, EpisodicEvent, Knowledge, Memory, NewMemory, Procedure};
use crate::metrics::{CounterSnapshot, RecallCounters};
use crate::retrieval::{RetrievalEngine, RetrievalQuery, RetrievalResult};
use crate::snapshot::Snapshot;
use crate::store::{MemoryStore, StoreStats};
use crate::types::{Association, AssociationType, MemoryId};

struct Inner {
    config: RecallConfig,
    store: Mutex<MemoryStore>,
    /// Ids stored since the last consolidation pass.
    buffer: Mutex<Vec<MemoryId>>,
    consolidating: AtomicBool,
    encryptor: Encryptor,
    compressor: Compressor,
    retrieval: RetrievalEngine,
    counters: RecallCounters,
}

/// Handle to an embedded memory system.
#[derive(Clone)]
pub struct MemorySystem {
    inner: Arc<Inner>,
}

impl std::fmt::Debug for MemorySystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MemorySystem")
            .field("memories", &self.inner.store.lock().len())
            .field("encryptor", &self.inner.encryptor)
            .finish_non_exhaustive()
    }
}

impl Default for MemorySystem {
    fn default() -> Self {
        Self::new(RecallConfig::default())
    }
}

impl MemorySystem {
    /// Create an empty system. When a password is configured the master
    /// key is derived up front.
    #[must_use]
    pub fn new(config: RecallConfig) -> Self {
        let mut encryptor = Encryptor::new();
        if let Some(password) = &config.encryption_password {
            encryptor.initialize(password);
        }
        info!(
            max_memories = config.max_memories,
            consolidation_interval_ms = config.consolidation_interval_ms,
            encryption = encryptor.is_initialized(),
            "Memory system created"
        );
        Self {
            inner: Arc::new(Inner {
                store: Mutex::new(MemoryStore::new()),
                buffer: Mutex::new(Vec::new()),
                consolidating: AtomicBool::new(false),
                encryptor,
                compressor: Compressor::new(config.compression.clone()),
                retrieval: RetrievalEngine::new(config.retrieval.clone()),
                counters: RecallCounters::new(),
                config,
            }),
        }
    }

    /// Active configuration.
    #[must_use]
    pub fn config(&self) -> &RecallConfig {
        &self.inner.config
    }

    /// The encryption unit, keyed with the configured password if any.
    #[must_use]
    pub fn encryptor(&self) -> &Encryptor {
        &self.inner.encryptor
    }

    /// The compression unit.
    #[must_use]
    pub fn compressor(&self) -> &Compressor {
        &self.inner.compressor
    }

    /// Runtime counters.
    #[must_use]
    pub fn counters(&self) -> CounterSnapshot {
        self.inner.counters.snapshot()
    }

    // -----------------------------------------------------------------------
    // Store
    // -----------------------------------------------------------------------

    /// Store a draft and queue it for the next consolidation pass.
    pub fn store(&self, draft: NewMemory) -> Memory {
        let start = Instant::now();
        let (memory, total) = {
            let mut store = self.inner.store.lock();
            let memory = store.insert(draft);
            self.inner.buffer.lock().push(memory.id);
            (memory, store.len())
        };
        RecallCounters::incr(&self.inner.counters.memories_stored);

        if total > self.inner.config.max_memories {
            warn!(
                total,
                max = self.inner.config.max_memories,
                "Memory count above configured maximum"
            );
        }
        let elapsed = start.elapsed();
        if elapsed > Duration::from_millis(self.inner.config.store.slow_store_ms) {
            RecallCounters::incr(&self.inner.counters.slow_operations);
            warn!(
                elapsed_ms = elapsed.as_millis(),
                budget_ms = self.inner.config.store.slow_store_ms,
                "Slow store"
            );
        }
        memory
    }

    /// Store an episodic memory.
    pub fn create_episodic_memory(
        &self,
        content: impl Into<String>,
        event: EpisodicEvent,
    ) -> Memory {
        self.store(self.sourced(NewMemory::episodic(content, event)))
    }

    /// Store a semantic memory.
    pub fn create_semantic_memory(
        &self,
        content: impl Into<String>,
        knowledge: Knowledge,
    ) -> Memory {
        self.store(self.sourced(NewMemory::semantic(content, knowledge)))
    }

    /// Store a procedural memory.
    pub fn create_procedural_memory(
        &self,
        content: impl Into<String>,
        procedure: Procedure,
    ) -> Memory {
        self.store(self.sourced(NewMemory::procedural(content, procedure)))
    }

    /// Store an emotional memory.
    pub fn create_emotional_memory(&self, content: impl Into<String>, emotion: Emotion) -> Memory {
        self.store(self.sourced(NewMemory::emotional(content, emotion)))
    }

    fn sourced(&self, draft: NewMemory) -> NewMemory {
        draft.with_source(self.inner.config.store.default_source.clone())
    }

    /// Look up a memory without touching its access statistics.
    #[must_use]
    pub fn get_memory(&self, id: &MemoryId) -> Option<Memory> {
        self.inner.store.lock().get(id).cloned()
    }

    /// Number of stored memories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.store.lock().len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.inner.store.lock().is_empty()
    }

    /// Aggregate statistics.
    #[must_use]
    pub fn get_stats(&self) -> StoreStats {
        self.inner.store.lock().stats()
    }

    // -----------------------------------------------------------------------
    // Retrieval and associations
    // -----------------------------------------------------------------------

    /// Rank memories against `query`. Returned memories are touched.
    pub fn retrieve_memories(&self, query: &RetrievalQuery) -> RetrievalResult {
        let result = {
            let mut store = self.inner.store.lock();
            self.inner.retrieval.retrieve(&mut store, query)
        };
        RecallCounters::incr(&self.inner.counters.retrievals);
        let budget = Duration::from_millis(self.inner.config.retrieval.slow_query_ms);
        if result.execution_time > budget {
            RecallCounters::incr(&self.inner.counters.slow_operations);
        }
        result
    }

    /// Add a directed edge from `source` to `target`.
    ///
    /// # Errors
    /// Returns [`RecallError::NotFound`] if `source` is not stored.
    pub fn create_association(
        &self,
        source: MemoryId,
        target: MemoryId,
        kind: AssociationType,
        strength: f32,
    ) -> Result<Association> {
        let association = self
            .inner
            .store
            .lock()
            .create_association(source, target, kind, strength)?;
        RecallCounters::incr(&self.inner.counters.associations_created);
        Ok(association)
    }

    /// Memories reachable from `start` within `max_depth` hops.
    #[must_use]
    pub fn get_associated_memories(&self, start: MemoryId, max_depth: usize) -> Vec<Memory> {
        self.inner.store.lock().associated_memories(start, max_depth)
    }

    // -----------------------------------------------------------------------
    // Consolidation
    // -----------------------------------------------------------------------

    /// Run one consolidation pass over the buffered ids.
    ///
    /// Returns `None` without doing anything when another pass is still in
    /// progress.
    pub fn consolidate_now(&self) -> Option<ConsolidationReport> {
        let inner = &self.inner;
        if inner
            .consolidating
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            RecallCounters::incr(&inner.counters.consolidation_skipped);
            warn!("Consolidation pass still running, skipping firing");
            return None;
        }
        let _guard = PassGuard(&inner.consolidating);

        let batch: Vec<MemoryId> = {
            let mut buffer = inner.buffer.lock();
            let take = inner
                .config
                .consolidation
                .max_batch_size
                .map_or(buffer.len(), |cap| cap.min(buffer.len()));
            buffer.drain(..take).collect()
        };

        let report = if batch.len() < 2 {
            ConsolidationReport {
                batch_size: batch.len(),
                ..ConsolidationReport::default()
            }
        } else {
            let mut store = inner.store.lock();
            consolidation::consolidate_batch(
                &mut store,
                &batch,
                inner.config.consolidation.similarity_threshold,
            )
        };

        RecallCounters::incr(&inner.counters.consolidation_passes);
        RecallCounters::add(&inner.counters.pairs_compared, report.pairs_compared as u64);
        RecallCounters::add(&inner.counters.associations_inferred, report.created.len() as u64);
        if !report.created.is_empty() {
            info!(
                batch = report.batch_size,
                created = report.created.len(),
                "Consolidation inferred associations"
            );
        }
        Some(report)
    }

    /// Start periodic consolidation on the current tokio runtime.
    ///
    /// The task holds only a weak reference and stops by itself once every
    /// handle to this system is gone.
    ///
    /// # Panics
    /// Panics if called outside a tokio runtime.
    #[must_use = "dropping the handle stops the scheduler"]
    pub fn start_consolidation(&self) -> ConsolidationHandle {
        let weak = Arc::downgrade(&self.inner);
        consolidation::spawn_periodic(self.inner.config.consolidation_interval(), move || {
            let weak = weak.clone();
            async move {
                let Some(inner) = weak.upgrade() else {
                    debug!("Memory system dropped, stopping consolidation");
                    return false;
                };
                MemorySystem { inner }.consolidate_now();
                true
            }
        })
    }

    // -----------------------------------------------------------------------
    // Snapshots
    // -----------------------------------------------------------------------

    /// Export the whole store as snapshot JSON.
    ///
    /// # Errors
    /// Returns [`RecallError::Serialization`] if encoding fails.
    pub fn export_memories(&self) -> Result<String> {
        let snapshot = Snapshot::capture(&self.inner.store.lock());
        snapshot.to_json()
    }

    /// Replace the whole store with a snapshot. Returns the number of
    /// memories imported. On error the store is left unchanged.
    ///
    /// # Errors
    /// Returns [`RecallError::Serialization`] on a malformed snapshot.
    pub fn import_memories(&self, text: &str) -> Result<usize> {
        let restored = Snapshot::from_json(text)?.into_store();
        let count = restored.len();
        {
            let mut store = self.inner.store.lock();
            *store = restored;
            self.inner.buffer.lock().clear();
        }
        info!(memories = count, "Imported snapshot");
        Ok(count)
    }

    /// Export the store compressed and sealed with the configured password.
    ///
    /// # Errors
    /// Returns [`RecallError::Configuration`] if no password is configured,
    /// or the first failure of serialization, compression or encryption.
    pub async fn export_encrypted(&self) -> Result<EncryptedPayload> {
        let password = self.password()?;
        let json = self.export_memories()?;
        let inner = Arc::clone(&self.inner);
        tokio::task::spawn_blocking(move || {
            let packed = inner.compressor.compress(&json, CompressionMode::Lossless)?;
            inner.encryptor.encrypt(&packed.data, &password)
        })
        .await
        .map_err(|e| RecallError::Encryption(format!("export task failed: {e}")))?
    }

    /// Inverse of [`Self::export_encrypted`]; replaces the whole store.
    ///
    /// # Errors
    /// Returns [`RecallError::Configuration`] if no password is configured,
    /// [`RecallError::Decryption`] on a wrong password or tampered payload,
    /// or the first failure of decompression or snapshot decoding.
    pub async fn import_encrypted(&self, payload: EncryptedPayload) -> Result<usize> {
        let password = self.password()?;
        let inner = Arc::clone(&self.inner);
        let json = tokio::task::spawn_blocking(move || {
            let packed = inner.encryptor.decrypt(&payload, &password)?;
            compression::decompress_lossless(&packed)
        })
        .await
        .map_err(|e| RecallError::Decryption(format!("import task failed: {e}")))??;
        self.import_memories(&json)
    }

    fn password(&self) -> Result<String> {
        self.inner.config.encryption_password.clone().ok_or_else(|| {
            RecallError::Configuration("no encryption password configured".to_string())
        })
    }
}

/// Clears the in-progress flag when a pass ends, including by panic.
struct PassGuard<'a>(&'a AtomicBool);

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}
