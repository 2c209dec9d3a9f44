//! Procedural Memory — "What I know how to do"
//!
//! Ordered steps with applicability conditions and an effectiveness score
//! that doubles as the record's default importance.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{MemoryKind, NewMemory};
use crate::types::{PrivacyLevel, clamp_unit};

const PROCEDURAL_CONFIDENCE: f32 = 0.8;

/// A learned procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Procedure {
    /// Procedure name.
    pub name: String,
    /// Steps, in order.
    pub steps: Vec<String>,
    /// When the procedure applies.
    #[serde(default)]
    pub conditions: BTreeMap<String, String>,
    /// How well it has worked (0.0 to 1.0).
    pub effectiveness_score: f32,
    /// Variations picked up over time.
    #[serde(default)]
    pub adaptations: Vec<String>,
}

impl Procedure {
    /// Create a procedure with a clamped effectiveness score.
    #[must_use]
    pub fn new<I, S>(name: impl Into<String>, steps: I, effectiveness_score: f32) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            steps: steps.into_iter().map(Into::into).collect(),
            conditions: BTreeMap::new(),
            effectiveness_score: clamp_unit(effectiveness_score),
            adaptations: Vec::new(),
        }
    }

    /// Add an applicability condition.
    #[must_use]
    pub fn when(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.insert(key.into(), value.into());
        self
    }

    /// Record an adaptation.
    #[must_use]
    pub fn adapted(mut self, adaptation: impl Into<String>) -> Self {
        self.adaptations.push(adaptation.into());
        self
    }
}

/// Procedural payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProceduralPayload {
    /// The procedure.
    pub procedure: Procedure,
}

impl NewMemory {
    /// Draft a procedural memory. Importance follows effectiveness.
    #[must_use]
    pub fn procedural(content: impl Into<String>, procedure: Procedure) -> Self {
        let importance = procedure.effectiveness_score;
        Self::envelope(
            MemoryKind::Procedural(ProceduralPayload { procedure }),
            content,
            PROCEDURAL_CONFIDENCE,
            PrivacyLevel::Private,
            importance,
        )
    }
}
