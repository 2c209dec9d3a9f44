//! Snapshot codec — full-store export and import.
//!
//! The snapshot is a JSON document holding the id→memory table and the
//! id→association-list table as ordered `[key, value]` pairs, plus an
//! RFC 3339 export timestamp:
//!
//! ```json
//! {
//!   "format_version": 1,
//!   "exported_at": "2026-01-01T00:00:00Z",
//!   "memories": [["<id>", { ...memory... }], ...],
//!   "associations": [["<id>", [ { ...edge... } ]], ...]
//! }
//! ```
//!
//! Import replaces the store wholesale; it is not a merge. A document
//! whose association index disagrees with the edges embedded in its
//! memories is rejected.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{RecallError, Result};
use crate::memory::Memory;
use crate::store::MemoryStore;
use crate::types::{Association, MemoryId};

/// Current snapshot format.
pub const FORMAT_VERSION: u32 = 1;

/// A full export of the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Format version of the document.
    #[serde(default = "default_format_version")]
    pub format_version: u32,
    /// When the snapshot was taken.
    pub exported_at: DateTime<Utc>,
    /// `(id, memory)` pairs in store order.
    pub memories: Vec<(MemoryId, Memory)>,
    /// `(id, edges)` pairs in store order.
    pub associations: Vec<(MemoryId, Vec<Association>)>,
}

impl Snapshot {
    /// Capture the current contents of `store`.
    #[must_use]
    pub fn capture(store: &MemoryStore) -> Self {
        Self {
            format_version: FORMAT_VERSION,
            exported_at: Utc::now(),
            memories: store.memory_pairs(),
            associations: store.association_pairs(),
        }
    }

    /// Serialize to the JSON text format.
    ///
    /// # Errors
    /// Returns [`RecallError::Serialization`] if encoding fails.
    pub fn to_json(&self) -> Result<String> {
        let text = serde_json::to_string(self)?;
        debug!(
            memories = self.memories.len(),
            bytes = text.len(),
            "Encoded snapshot"
        );
        Ok(text)
    }

    /// Parse the JSON text format.
    ///
    /// # Errors
    /// Returns [`RecallError::Serialization`] on malformed input, an
    /// unsupported format version, a pair whose key differs from the
    /// memory's own id, a duplicate id, or an association index that
    /// disagrees with the memories' embedded edges.
    pub fn from_json(text: &str) -> Result<Self> {
        let snapshot: Self = serde_json::from_str(text)?;
        if snapshot.format_version > FORMAT_VERSION {
            return Err(RecallError::Serialization(format!(
                "unsupported snapshot format version {}",
                snapshot.format_version
            )));
        }
        snapshot.validate()?;
        Ok(snapshot)
    }

    /// Check that the memory table and the association index describe the
    /// same edges: unique keys, every key naming its memory, and every
    /// index entry equal to that memory's embedded list.
    fn validate(&self) -> Result<()> {
        let mut embedded: HashMap<MemoryId, &[Association]> =
            HashMap::with_capacity(self.memories.len());
        for (key, memory) in &self.memories {
            if *key != memory.id {
                return Err(invalid(format!(
                    "snapshot key {key} does not match memory id {}",
                    memory.id
                )));
            }
            if embedded.insert(*key, memory.associations.as_slice()).is_some() {
                return Err(invalid(format!("duplicate memory id {key}")));
            }
        }

        let mut indexed: HashSet<MemoryId> = HashSet::with_capacity(self.associations.len());
        for (source, edges) in &self.associations {
            if !indexed.insert(*source) {
                return Err(invalid(format!("duplicate association entry for {source}")));
            }
            let Some(own) = embedded.get(source) else {
                return Err(invalid(format!(
                    "associations indexed for unknown memory {source}"
                )));
            };
            if *own != edges.as_slice() {
                return Err(invalid(format!(
                    "association index for {source} disagrees with the memory's own edges"
                )));
            }
        }

        if let Some((id, _)) = embedded
            .iter()
            .find(|(id, own)| !own.is_empty() && !indexed.contains(*id))
        {
            return Err(invalid(format!("edges of memory {id} are missing from the index")));
        }
        Ok(())
    }

    /// Build a fresh store holding exactly this snapshot's contents.
    #[must_use]
    pub fn into_store(self) -> MemoryStore {
        info!(
            memories = self.memories.len(),
            exported_at = %self.exported_at,
            "Restoring snapshot"
        );
        MemoryStore::from_pairs(self.memories, self.associations)
    }
}

fn default_format_version() -> u32 {
    FORMAT_VERSION
}

fn invalid(reason: String) -> RecallError {
    RecallError::Serialization(reason)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RetrievalConfig;
    use crate::memory::{EpisodicEvent, Knowledge, NewMemory};
    use crate::retrieval::{RetrievalEngine, RetrievalQuery};
    use crate::types::AssociationType;

    fn episode(content: &str) -> NewMemory {
        NewMemory::episodic(content, EpisodicEvent::new("e", "d", 0.3))
    }

    /// Two memories with one edge `a -> b`, captured.
    fn linked_snapshot() -> (Snapshot, MemoryId, MemoryId) {
        let mut store = MemoryStore::new();
        let a = store.insert(episode("first")).id;
        let b = store.insert(NewMemory::semantic("second", Knowledge::new("a", "b", "c"))).id;
        store
            .create_association(a, b, AssociationType::Temporal, 0.6)
            .expect("source exists");
        (Snapshot::capture(&store), a, b)
    }

    fn rejects(snapshot: &Snapshot) -> bool {
        let text = serde_json::to_string(snapshot).expect("encode");
        matches!(Snapshot::from_json(&text), Err(RecallError::Serialization(_)))
    }

    #[test]
    fn round_trip_preserves_contents_and_order() {
        let mut store = MemoryStore::new();
        let a = store.insert(episode("first"));
        let b = store.insert(NewMemory::semantic("second", Knowledge::new("a", "b", "c")));
        store
            .create_association(a.id, b.id, AssociationType::Temporal, 0.6)
            .expect("source exists");

        let text = Snapshot::capture(&store).to_json().expect("encode");
        let restored = Snapshot::from_json(&text).expect("decode").into_store();

        let ids: Vec<_> = restored.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![a.id, b.id]);
        assert_eq!(restored.get(&a.id), store.get(&a.id));
        assert_eq!(restored.associations_of(&a.id), store.associations_of(&a.id));
    }

    #[test]
    fn round_trip_restores_last_accessed() {
        let mut store = MemoryStore::new();
        let m = store.insert(episode("coffee at noon"));
        RetrievalEngine::new(RetrievalConfig::default())
            .retrieve(&mut store, &RetrievalQuery::new().with_keywords(["coffee"]));
        let touched = store.get(&m.id).expect("stored").metadata.last_accessed;
        assert!(touched.is_some());

        let text = Snapshot::capture(&store).to_json().expect("encode");
        let restored = Snapshot::from_json(&text).expect("decode").into_store();
        let metadata = &restored.get(&m.id).expect("restored").metadata;
        assert_eq!(metadata.last_accessed, touched);
        assert_eq!(metadata.access_count, 1);
    }

    #[test]
    fn restored_store_continues_sequences() {
        let mut store = MemoryStore::new();
        store.insert(episode("one"));
        store.insert(episode("two"));
        let text = Snapshot::capture(&store).to_json().expect("encode");

        let mut restored = Snapshot::from_json(&text).expect("decode").into_store();
        let three = restored.insert(episode("three"));
        assert_eq!(three.sequence(), Some(3));
    }

    #[test]
    fn malformed_text_is_a_serialization_error() {
        let bad_date = r#"{"exported_at":"yesterday","memories":[],"associations":[]}"#;
        for bad in ["", "{", "[]", bad_date] {
            let result = Snapshot::from_json(bad);
            assert!(matches!(result, Err(RecallError::Serialization(_))), "{bad}");
        }
    }

    #[test]
    fn mismatched_key_is_rejected() {
        let (mut snapshot, ..) = linked_snapshot();
        snapshot.memories[0].0 = MemoryId::new();
        assert!(rejects(&snapshot));
    }

    #[test]
    fn duplicate_memory_is_rejected() {
        let (mut snapshot, ..) = linked_snapshot();
        let copy = snapshot.memories[1].clone();
        snapshot.memories.push(copy);
        assert!(rejects(&snapshot));
    }

    #[test]
    fn index_only_edge_is_rejected() {
        let (mut snapshot, _, b) = linked_snapshot();
        snapshot.associations[0]
            .1
            .push(Association::new(b, AssociationType::Causal, 0.9));
        assert!(rejects(&snapshot));
    }

    #[test]
    fn index_entry_for_unknown_source_is_rejected() {
        let (mut snapshot, a, _) = linked_snapshot();
        snapshot.associations.push((
            MemoryId::new(),
            vec![Association::new(a, AssociationType::Causal, 0.9)],
        ));
        assert!(rejects(&snapshot));
    }

    #[test]
    fn embedded_edge_missing_from_index_is_rejected() {
        let (mut snapshot, ..) = linked_snapshot();
        snapshot.associations.clear();
        assert!(rejects(&snapshot));
    }

    #[test]
    fn duplicate_index_entry_is_rejected() {
        let (mut snapshot, ..) = linked_snapshot();
        let copy = snapshot.associations[0].clone();
        snapshot.associations.push(copy);
        assert!(rejects(&snapshot));
    }

    #[test]
    fn consistent_snapshot_is_accepted() {
        let (snapshot, a, b) = linked_snapshot();
        let text = snapshot.to_json().expect("encode");
        let store = Snapshot::from_json(&text).expect("decode").into_store();
        assert_eq!(store.associated_memories(a, 1)[0].id, b);
        assert_eq!(store.stats().total_associations, 1);
    }
}
