//! Semantic Memory — "What I know"
//!
//! Subject–predicate–object facts. Verified facts start with higher
//! confidence than unverified ones.

use serde::{Deserialize, Serialize};

use super::{MemoryKind, NewMemory};
use crate::types::PrivacyLevel;

const VERIFIED_CONFIDENCE: f32 = 0.95;
const UNVERIFIED_CONFIDENCE: f32 = 0.7;
const SEMANTIC_IMPORTANCE: f32 = 0.6;

/// A fact in triple form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Knowledge {
    /// What the fact is about.
    pub subject: String,
    /// The relation.
    pub predicate: String,
    /// The related value.
    pub object: String,
    /// Topic categories.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Whether the fact has been confirmed.
    #[serde(default)]
    pub verified: bool,
    /// Where the fact came from.
    #[serde(default)]
    pub source: Option<String>,
}

impl Knowledge {
    /// Create an unverified fact.
    #[must_use]
    pub fn new(
        subject: impl Into<String>,
        predicate: impl Into<String>,
        object: impl Into<String>,
    ) -> Self {
        Self {
            subject: subject.into(),
            predicate: predicate.into(),
            object: object.into(),
            categories: Vec::new(),
            verified: false,
            source: None,
        }
    }

    /// Mark as verified.
    #[must_use]
    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    /// Add a category.
    #[must_use]
    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.categories.push(category.into());
        self
    }

    /// Record where the fact came from.
    #[must_use]
    pub fn from_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }
}

/// Semantic payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SemanticPayload {
    /// The fact.
    pub knowledge: Knowledge,
}

impl NewMemory {
    /// Draft a semantic memory.
    #[must_use]
    pub fn semantic(content: impl Into<String>, knowledge: Knowledge) -> Self {
        let confidence = if knowledge.verified {
            VERIFIED_CONFIDENCE
        } else {
            UNVERIFIED_CONFIDENCE
        };
        Self::envelope(
            MemoryKind::Semantic(SemanticPayload { knowledge }),
            content,
            confidence,
            PrivacyLevel::Private,
            SEMANTIC_IMPORTANCE,
        )
    }
}
