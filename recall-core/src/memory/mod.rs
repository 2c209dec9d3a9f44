//! Memory record definitions.
//!
//! A [`Memory`] is a shared envelope (identity, content, provenance, scores,
//! metadata, outgoing associations) around exactly one variant payload held
//! in [`MemoryKind`]. Variant payloads never co-occur.
//!
//! New records are described by a [`NewMemory`] draft; the store assigns the
//! id, the version and (for episodic records) the sequence number.

pub mod emotional;
pub mod episodic;
pub mod procedural;
pub mod semantic;

pub use emotional::{Emotion, EmotionalPayload};
pub use episodic::{EpisodicEvent, EpisodicPayload};
pub use procedural::{Procedure, ProceduralPayload};
pub use semantic::{Knowledge, SemanticPayload};

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::{
    Association, ExtractedEntity, MemoryId, MemoryMetadata, MemoryType, PrivacyLevel,
    clamp_signed, clamp_unit,
};

/// Source tag used when the caller does not name one.
pub const DEFAULT_SOURCE: &str = "conversation";

/// Variant-specific payload of a memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MemoryKind {
    /// An experienced event.
    Episodic(EpisodicPayload),
    /// A subject–predicate–object fact.
    Semantic(SemanticPayload),
    /// A learned procedure.
    Procedural(ProceduralPayload),
    /// An emotional episode.
    Emotional(EmotionalPayload),
}

impl MemoryKind {
    /// The variant tag.
    #[must_use]
    pub fn memory_type(&self) -> MemoryType {
        match self {
            Self::Episodic(_) => MemoryType::Episodic,
            Self::Semantic(_) => MemoryType::Semantic,
            Self::Procedural(_) => MemoryType::Procedural,
            Self::Emotional(_) => MemoryType::Emotional,
        }
    }
}

/// A stored memory record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Memory {
    /// Unique, immutable identifier.
    pub id: MemoryId,
    /// Natural-language content.
    pub content: String,
    /// When the memory was formed. Immutable.
    pub timestamp: DateTime<Utc>,
    /// Provenance tag.
    pub source: String,
    /// Belief in the content, 0.0 to 1.0.
    pub confidence: f32,
    /// Sensitivity class.
    pub privacy_level: PrivacyLevel,
    /// Ranking weight, 0.0 to 1.0.
    pub importance: f32,
    /// Context, tags, entities, usage and affect.
    pub metadata: MemoryMetadata,
    /// Outgoing edges. Mirrored in the store's association index.
    pub associations: Vec<Association>,
    /// Record version. Starts at 1; nothing increments it yet.
    pub version: u32,
    /// Variant payload.
    pub kind: MemoryKind,
}

impl Memory {
    /// The variant tag.
    #[must_use]
    pub fn memory_type(&self) -> MemoryType {
        self.kind.memory_type()
    }

    /// Episodic sequence number, if this is an episodic memory.
    #[must_use]
    pub fn sequence(&self) -> Option<u64> {
        match &self.kind {
            MemoryKind::Episodic(p) => Some(p.sequence),
            _ => None,
        }
    }
}

/// A memory that has not been stored yet (no id, no version).
#[derive(Debug, Clone, PartialEq)]
pub struct NewMemory {
    /// Variant payload.
    pub kind: MemoryKind,
    /// Natural-language content.
    pub content: String,
    /// Formation time.
    pub timestamp: DateTime<Utc>,
    /// Provenance tag.
    pub source: String,
    /// Belief in the content, 0.0 to 1.0.
    pub confidence: f32,
    /// Sensitivity class.
    pub privacy_level: PrivacyLevel,
    /// Ranking weight, 0.0 to 1.0.
    pub importance: f32,
    /// Context, tags, entities, usage and affect.
    pub metadata: MemoryMetadata,
    /// Edges to index at insertion time.
    pub associations: Vec<Association>,
}

impl NewMemory {
    /// Shared envelope constructor used by the per-variant helpers.
    pub(crate) fn envelope(
        kind: MemoryKind,
        content: impl Into<String>,
        confidence: f32,
        privacy_level: PrivacyLevel,
        importance: f32,
    ) -> Self {
        Self {
            kind,
            content: content.into(),
            timestamp: Utc::now(),
            source: DEFAULT_SOURCE.to_string(),
            confidence: clamp_unit(confidence),
            privacy_level,
            importance: clamp_unit(importance),
            metadata: MemoryMetadata::default(),
            associations: Vec::new(),
        }
    }

    /// The variant tag.
    #[must_use]
    pub fn memory_type(&self) -> MemoryType {
        self.kind.memory_type()
    }

    /// Override the provenance tag.
    #[must_use]
    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    /// Override the formation time.
    #[must_use]
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// Override the importance (clamped).
    #[must_use]
    pub fn with_importance(mut self, importance: f32) -> Self {
        self.importance = clamp_unit(importance);
        self
    }

    /// Override the confidence (clamped).
    #[must_use]
    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = clamp_unit(confidence);
        self
    }

    /// Override the privacy level.
    #[must_use]
    pub fn with_privacy(mut self, privacy_level: PrivacyLevel) -> Self {
        self.privacy_level = privacy_level;
        self
    }

    /// Attach tags.
    #[must_use]
    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.metadata.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Attach extracted entities.
    #[must_use]
    pub fn with_entities(mut self, entities: impl IntoIterator<Item = ExtractedEntity>) -> Self {
        self.metadata.entities.extend(entities);
        self
    }

    /// Attach a context entry.
    #[must_use]
    pub fn with_context(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.context.insert(key.into(), value);
        self
    }

    /// Replace the whole context map.
    #[must_use]
    pub fn with_context_map(mut self, context: BTreeMap<String, serde_json::Value>) -> Self {
        self.metadata.context = context;
        self
    }

    /// Set emotional valence (clamped to `[-1, 1]`) and arousal (clamped to `[0, 1]`).
    #[must_use]
    pub fn with_affect(mut self, valence: f32, arousal: f32) -> Self {
        self.metadata.emotional_valence = clamp_signed(valence);
        self.metadata.emotional_arousal = clamp_unit(arousal);
        self
    }

    /// Pre-attach an outgoing association.
    #[must_use]
    pub fn with_association(mut self, association: Association) -> Self {
        self.associations.push(association);
        self
    }

    /// Turn the draft into a stored record.
    pub(crate) fn into_memory(self, id: MemoryId) -> Memory {
        Memory {
            id,
            content: self.content,
            timestamp: self.timestamp,
            source: self.source,
            confidence: self.confidence,
            privacy_level: self.privacy_level,
            importance: self.importance,
            metadata: self.metadata,
            associations: self.associations,
            version: 1,
            kind: self.kind,
        }
    }
}
