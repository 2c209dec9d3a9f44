//! Core type definitions for the recall memory system.
//!
//! Every type here is serializable; the snapshot codec relies on the
//! derived `serde` representations being stable.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use ordered_float::OrderedFloat;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Unique identifier for a memory record. Immutable once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MemoryId(pub Uuid);

impl MemoryId {
    /// Create a new random memory ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MemoryId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for MemoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Classification enums
// ---------------------------------------------------------------------------

/// The four memory variants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MemoryType {
    /// "What happened."
    Episodic,
    /// "What I know."
    Semantic,
    /// "What I know how to do."
    Procedural,
    /// "How I felt."
    Emotional,
}

impl MemoryType {
    /// All variants, in declaration order.
    pub const ALL: [Self; 4] = [
        Self::Episodic,
        Self::Semantic,
        Self::Procedural,
        Self::Emotional,
    ];
}

impl fmt::Display for MemoryType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Episodic => write!(f, "episodic"),
            Self::Semantic => write!(f, "semantic"),
            Self::Procedural => write!(f, "procedural"),
            Self::Emotional => write!(f, "emotional"),
        }
    }
}

/// How sensitive a memory is. Ordered from least to most restrictive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PrivacyLevel {
    /// Safe to surface anywhere.
    Public,
    /// Default for most memories.
    Private,
    /// Emotional or otherwise personal material.
    Sensitive,
}

impl Default for PrivacyLevel {
    fn default() -> Self {
        Self::Private
    }
}

/// Kind of link between two memories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssociationType {
    /// One memory caused the other.
    Causal,
    /// Close together in time.
    Temporal,
    /// Related in meaning.
    Semantic,
    /// Share an emotional tone.
    Emotional,
    /// Share a conversational context.
    Contextual,
}

// ---------------------------------------------------------------------------
// Associations
// ---------------------------------------------------------------------------

/// A directed, typed, weighted edge to another memory.
///
/// The target is never validated; an edge may point at an id the store
/// does not (yet) hold.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Association {
    /// Memory the edge points at.
    pub target_id: MemoryId,
    /// Edge type.
    #[serde(rename = "type")]
    pub kind: AssociationType,
    /// Edge weight, 0.0 to 1.0.
    pub strength: f32,
    /// Recorded for callers; traversal only follows outgoing edges.
    pub bidirectional: bool,
    /// Free-form edge annotations.
    #[serde(default)]
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl Association {
    /// Create a one-directional edge with a clamped strength.
    #[must_use]
    pub fn new(target_id: MemoryId, kind: AssociationType, strength: f32) -> Self {
        Self {
            target_id,
            kind,
            strength: clamp_unit(strength),
            bidirectional: false,
            metadata: BTreeMap::new(),
        }
    }

    /// Mark the edge as bidirectional.
    #[must_use]
    pub fn bidirectional(mut self) -> Self {
        self.bidirectional = true;
        self
    }

    /// Attach a metadata entry.
    #[must_use]
    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }
}

// ---------------------------------------------------------------------------
// Metadata
// ---------------------------------------------------------------------------

/// An entity extracted from memory content by an upstream analyser.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractedEntity {
    /// Entity category (person, place, product, ...).
    pub entity_type: String,
    /// Surface value, matched case-insensitively during retrieval.
    pub value: String,
    /// Extractor confidence, 0.0 to 1.0.
    pub confidence: f32,
}

impl ExtractedEntity {
    /// Create an entity with a clamped confidence.
    #[must_use]
    pub fn new(entity_type: impl Into<String>, value: impl Into<String>, confidence: f32) -> Self {
        Self {
            entity_type: entity_type.into(),
            value: value.into(),
            confidence: clamp_unit(confidence),
        }
    }
}

/// Context, tags, entities, usage and affect attached to every memory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MemoryMetadata {
    /// Arbitrary conversational context.
    #[serde(default)]
    pub context: BTreeMap<String, serde_json::Value>,
    /// Caller-supplied tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Entities extracted from the content.
    #[serde(default)]
    pub entities: Vec<ExtractedEntity>,
    /// How many times retrieval has returned this memory.
    #[serde(default)]
    pub access_count: u32,
    /// Last time retrieval returned this memory.
    #[serde(default)]
    pub last_accessed: Option<DateTime<Utc>>,
    /// Emotional valence, -1.0 (negative) to +1.0 (positive).
    #[serde(default)]
    pub emotional_valence: f32,
    /// Emotional arousal, 0.0 (calm) to 1.0 (excited).
    #[serde(default)]
    pub emotional_arousal: f32,
}

impl MemoryMetadata {
    /// Record a retrieval hit.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.access_count = self.access_count.saturating_add(1);
        self.last_accessed = Some(now);
    }
}

// ---------------------------------------------------------------------------
// Scores
// ---------------------------------------------------------------------------

/// Clamp a score to `[0, 1]`. NaN collapses to 0.
#[must_use]
pub fn clamp_unit(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) }
}

/// Clamp a signed score to `[-1, 1]`. NaN collapses to 0.
#[must_use]
pub fn clamp_signed(value: f32) -> f32 {
    if value.is_nan() { 0.0 } else { value.clamp(-1.0, 1.0) }
}

/// Relevance of a memory to a retrieval query, always in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelevanceScore(pub OrderedFloat<f32>);

impl RelevanceScore {
    /// Zero relevance.
    pub const ZERO: Self = Self(OrderedFloat(0.0));

    /// Create a relevance score, clamping to `[0, 1]`.
    #[must_use]
    pub fn new(score: f32) -> Self {
        Self(OrderedFloat(clamp_unit(score)))
    }

    /// Get the raw score value.
    #[must_use]
    pub fn value(self) -> f32 {
        self.0.into_inner()
    }
}
