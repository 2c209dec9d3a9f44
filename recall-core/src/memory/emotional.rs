//! Emotional Memory — "How I felt"
//!
//! An emotional episode: what was felt, how strongly, what set it off and
//! how it was handled. Defaults to a stricter privacy level than the
//! other variants.

use serde::{Deserialize, Serialize};

use super::{MemoryKind, NewMemory};
use crate::types::{PrivacyLevel, clamp_unit};

const EMOTIONAL_CONFIDENCE: f32 = 0.8;

/// An emotional episode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Emotion {
    /// Dominant emotion label.
    pub primary_emotion: String,
    /// Other emotions present.
    #[serde(default)]
    pub secondary_emotions: Vec<String>,
    /// Strength of the feeling (0.0 to 1.0).
    pub intensity: f32,
    /// What caused it.
    pub trigger: String,
    /// How it was responded to.
    pub response: String,
    /// How well the response worked (0.0 to 1.0).
    pub effectiveness: f32,
}

impl Emotion {
    /// Create an emotion with clamped intensity and effectiveness.
    #[must_use]
    pub fn new(
        primary_emotion: impl Into<String>,
        intensity: f32,
        trigger: impl Into<String>,
        response: impl Into<String>,
        effectiveness: f32,
    ) -> Self {
        Self {
            primary_emotion: primary_emotion.into(),
            secondary_emotions: Vec::new(),
            intensity: clamp_unit(intensity),
            trigger: trigger.into(),
            response: response.into(),
            effectiveness: clamp_unit(effectiveness),
        }
    }

    /// Add a secondary emotion.
    #[must_use]
    pub fn with_secondary(mut self, emotion: impl Into<String>) -> Self {
        self.secondary_emotions.push(emotion.into());
        self
    }
}

/// Emotional payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionalPayload {
    /// The emotion.
    pub emotion: Emotion,
}

impl NewMemory {
    /// Draft an emotional memory. Importance and arousal follow intensity.
    #[must_use]
    pub fn emotional(content: impl Into<String>, emotion: Emotion) -> Self {
        let intensity = emotion.intensity;
        let mut draft = Self::envelope(
            MemoryKind::Emotional(EmotionalPayload { emotion }),
            content,
            EMOTIONAL_CONFIDENCE,
            PrivacyLevel::Sensitive,
            intensity,
        );
        draft.metadata.emotional_arousal = intensity;
        draft
    }
}
