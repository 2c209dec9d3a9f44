//! Episodic Memory — "What happened"
//!
//! A recorded event with its participants, place and emotional colouring.
//! Every episodic record carries a sequence number assigned by the store,
//! strictly increasing in creation order across all episodic records.

use serde::{Deserialize, Serialize};

use super::{MemoryKind, NewMemory};
use crate::types::{PrivacyLevel, clamp_unit};

/// Default confidence for first-hand experiences.
const EPISODIC_CONFIDENCE: f32 = 0.9;

/// The event an episodic memory describes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicEvent {
    /// Short event name.
    pub name: String,
    /// What happened.
    pub description: String,
    /// Who took part.
    #[serde(default)]
    pub participants: Vec<String>,
    /// Where it happened.
    #[serde(default)]
    pub location: Option<String>,
    /// How long it lasted, in seconds.
    #[serde(default)]
    pub duration_secs: Option<u64>,
    /// Emotions present during the event.
    #[serde(default)]
    pub emotional_state: Vec<String>,
    /// How significant the event was (0.0 to 1.0).
    pub significance: f32,
}

impl EpisodicEvent {
    /// Create an event with a clamped significance.
    #[must_use]
    pub fn new(name: impl Into<String>, description: impl Into<String>, significance: f32) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            participants: Vec::new(),
            location: None,
            duration_secs: None,
            emotional_state: Vec::new(),
            significance: clamp_unit(significance),
        }
    }

    /// Add participants.
    #[must_use]
    pub fn with_participants<I, S>(mut self, participants: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.participants.extend(participants.into_iter().map(Into::into));
        self
    }

    /// Set the location.
    #[must_use]
    pub fn at(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Set the duration.
    #[must_use]
    pub fn lasting(mut self, secs: u64) -> Self {
        self.duration_secs = Some(secs);
        self
    }

    /// Record an emotion felt during the event.
    #[must_use]
    pub fn feeling(mut self, emotion: impl Into<String>) -> Self {
        self.emotional_state.push(emotion.into());
        self
    }
}

/// Episodic payload: the event plus its global sequence number.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpisodicPayload {
    /// The event.
    pub event: EpisodicEvent,
    /// Position among all episodic records, assigned at insertion.
    pub sequence: u64,
}

impl NewMemory {
    /// Draft an episodic memory. Importance follows the event's significance.
    #[must_use]
    pub fn episodic(content: impl Into<String>, event: EpisodicEvent) -> Self {
        let importance = event.significance;
        Self::envelope(
            MemoryKind::Episodic(EpisodicPayload { event, sequence: 0 }),
            content,
            EPISODIC_CONFIDENCE,
            PrivacyLevel::Private,
            importance,
        )
    }
}
