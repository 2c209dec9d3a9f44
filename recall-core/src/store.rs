//! The memory store — id-keyed record table plus association index.
//!
//! Both tables live in one owned [`MemoryStore`] and are only mutated
//! through its methods, so an association is never visible in one table
//! without the other. Records are never deleted; the only mutations after
//! insertion are association attachment and retrieval metadata touches.
//!
//! Iteration follows insertion order, which is the "scan order" retrieval
//! uses to break score ties.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::debug;

use crate::memory::{Memory, MemoryKind, NewMemory};
use crate::types::{Association, MemoryId, MemoryType};

/// Aggregate statistics over the whole store.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreStats {
    /// Number of stored memories.
    pub total_memories: usize,
    /// Count per variant (every variant present, possibly zero).
    pub by_type: BTreeMap<MemoryType, usize>,
    /// Serialized size estimate of all records, in bytes.
    pub storage_bytes: usize,
    /// Total outgoing edges across all memories (not deduplicated).
    pub total_associations: usize,
    /// Mean importance, 0.0 when empty.
    pub average_importance: f32,
    /// Earliest memory timestamp.
    pub oldest: Option<DateTime<Utc>>,
    /// Latest memory timestamp.
    pub newest: Option<DateTime<Utc>>,
}

/// Owned record table and association index.
#[derive(Debug, Default)]
pub struct MemoryStore {
    memories: HashMap<MemoryId, Memory>,
    order: Vec<MemoryId>,
    associations: HashMap<MemoryId, Vec<Association>>,
    next_sequence: u64,
}

impl MemoryStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a draft, assigning a fresh id, version 1 and (for episodic
    /// drafts) the next sequence number. Pre-attached associations are
    /// indexed alongside the record.
    pub fn insert(&mut self, draft: NewMemory) -> Memory {
        let mut id = MemoryId::new();
        while self.memories.contains_key(&id) {
            id = MemoryId::new();
        }

        let mut memory = draft.into_memory(id);
        if let MemoryKind::Episodic(payload) = &mut memory.kind {
            self.next_sequence += 1;
            payload.sequence = self.next_sequence;
        }

        if !memory.associations.is_empty() {
            self.associations
                .entry(id)
                .or_default()
                .extend(memory.associations.iter().cloned());
        }

        debug!(
            memory = %id,
            kind = %memory.memory_type(),
            associations = memory.associations.len(),
            "Stored memory"
        );

        self.order.push(id);
        self.memories.insert(id, memory.clone());
        memory
    }

    /// Look up a memory.
    #[must_use]
    pub fn get(&self, id: &MemoryId) -> Option<&Memory> {
        self.memories.get(id)
    }

    /// Whether a memory exists.
    #[must_use]
    pub fn contains(&self, id: &MemoryId) -> bool {
        self.memories.contains_key(id)
    }

    /// Number of stored memories.
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Whether the store is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Iterate memories in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = &Memory> + '_ {
        self.order.iter().filter_map(|id| self.memories.get(id))
    }

    /// Indexed outgoing edges of a memory (empty if none).
    #[must_use]
    pub fn associations_of(&self, id: &MemoryId) -> &[Association] {
        self.associations.get(id).map_or(&[], Vec::as_slice)
    }

    /// Record a retrieval hit on a memory. Returns the updated record.
    pub fn touch(&mut self, id: &MemoryId, now: DateTime<Utc>) -> Option<&Memory> {
        let memory = self.memories.get_mut(id)?;
        memory.metadata.touch(now);
        Some(memory)
    }

    /// Append an edge to both the embedded list and the index.
    ///
    /// Callers must have checked that `source` exists.
    pub(crate) fn attach(&mut self, source: MemoryId, association: Association) -> bool {
        let Some(memory) = self.memories.get_mut(&source) else {
            return false;
        };
        memory.associations.push(association.clone());
        self.associations.entry(source).or_default().push(association);
        true
    }

    /// Compute store-wide statistics in a single pass.
    #[must_use]
    pub fn stats(&self) -> StoreStats {
        let mut by_type: BTreeMap<MemoryType, usize> =
            MemoryType::ALL.iter().map(|t| (*t, 0)).collect();
        let mut storage_bytes = 0usize;
        let mut total_associations = 0usize;
        let mut importance_sum = 0.0_f64;
        let mut oldest: Option<DateTime<Utc>> = None;
        let mut newest: Option<DateTime<Utc>> = None;

        for memory in self.iter() {
            *by_type.entry(memory.memory_type()).or_default() += 1;
            storage_bytes += serde_json::to_vec(memory).map_or(0, |v| v.len());
            total_associations += memory.associations.len();
            importance_sum += f64::from(memory.importance);
            oldest = Some(oldest.map_or(memory.timestamp, |t| t.min(memory.timestamp)));
            newest = Some(newest.map_or(memory.timestamp, |t| t.max(memory.timestamp)));
        }

        let total_memories = self.len();
        let average_importance = if total_memories == 0 {
            0.0
        } else {
            (importance_sum / total_memories as f64) as f32
        };

        StoreStats {
            total_memories,
            by_type,
            storage_bytes,
            total_associations,
            average_importance,
            oldest,
            newest,
        }
    }

    /// Ordered `(id, memory)` pairs, for export.
    #[must_use]
    pub fn memory_pairs(&self) -> Vec<(MemoryId, Memory)> {
        self.iter().map(|m| (m.id, m.clone())).collect()
    }

    /// Ordered `(id, edges)` pairs, for export.
    #[must_use]
    pub fn association_pairs(&self) -> Vec<(MemoryId, Vec<Association>)> {
        self.order
            .iter()
            .filter_map(|id| self.associations.get(id).map(|edges| (*id, edges.clone())))
            .collect()
    }

    /// Build a store from exported pairs, replacing nothing (fresh store).
    ///
    /// The episodic sequence counter resumes after the highest imported
    /// sequence.
    pub(crate) fn from_pairs(
        memories: Vec<(MemoryId, Memory)>,
        associations: Vec<(MemoryId, Vec<Association>)>,
    ) -> Self {
        let mut store = Self::new();
        for (id, memory) in memories {
            if let Some(seq) = memory.sequence() {
                store.next_sequence = store.next_sequence.max(seq);
            }
            if store.memories.insert(id, memory).is_none() {
                store.order.push(id);
            }
        }
        for (id, edges) in associations {
            store.associations.insert(id, edges);
        }
        store
    }
}
