//! Per-criterion scoring for memory retrieval.
//!
//! Score = Type + Keyword + Time + Importance + Entity, clamped to [0, 1]:
//!   Type        = 0.20 when a type filter is present and satisfied
//!   Keyword     = 0.30 × (matched query keywords / query keywords)
//!   Time        = 0.20 when the timestamp lies in the (inclusive) range
//!   Importance  = 0.15 when importance ≥ the query minimum
//!   Entity      = 0.15 × (matched query entities / query entities)
//!
//! A type filter is the only hard exclusion: a mismatching memory scores 0
//! regardless of every other criterion.

use crate::memory::Memory;
use crate::retrieval::RetrievalQuery;
use crate::types::RelevanceScore;

/// Weight of a satisfied type filter.
pub const TYPE_WEIGHT: f32 = 0.2;
/// Weight of the keyword match fraction.
pub const KEYWORD_WEIGHT: f32 = 0.3;
/// Weight of a satisfied time range.
pub const TIME_WEIGHT: f32 = 0.2;
/// Weight of a satisfied minimum importance.
pub const IMPORTANCE_WEIGHT: f32 = 0.15;
/// Weight of the entity match fraction.
pub const ENTITY_WEIGHT: f32 = 0.15;

/// Score a single memory against a query.
#[must_use]
pub fn score(memory: &Memory, query: &RetrievalQuery) -> RelevanceScore {
    let type_bonus = match query.memory_type {
        Some(wanted) if wanted != memory.memory_type() => return RelevanceScore::ZERO,
        Some(_) => TYPE_WEIGHT,
        None => 0.0,
    };

    let total = type_bonus
        + KEYWORD_WEIGHT * keyword_fraction(memory, &query.keywords)
        + time_bonus(memory, query)
        + importance_bonus(memory, query)
        + ENTITY_WEIGHT * entity_fraction(memory, &query.entities);

    RelevanceScore::new(total)
}

/// Fraction of keywords found as case-insensitive substrings of the content.
fn keyword_fraction(memory: &Memory, keywords: &[String]) -> f32 {
    if keywords.is_empty() {
        return 0.0;
    }
    let content = memory.content.to_lowercase();
    let matched = keywords
        .iter()
        .filter(|k| content.contains(&k.to_lowercase()))
        .count();
    matched as f32 / keywords.len() as f32
}

fn time_bonus(memory: &Memory, query: &RetrievalQuery) -> f32 {
    match &query.time_range {
        Some(range) if range.contains(memory.timestamp) => TIME_WEIGHT,
        _ => 0.0,
    }
}

fn importance_bonus(memory: &Memory, query: &RetrievalQuery) -> f32 {
    match query.min_importance {
        Some(min) if memory.importance >= min => IMPORTANCE_WEIGHT,
        _ => 0.0,
    }
}

/// Fraction of query entity names present among the extracted entity values.
fn entity_fraction(memory: &Memory, entities: &[String]) -> f32 {
    if entities.is_empty() {
        return 0.0;
    }
    let values: Vec<String> = memory
        .metadata
        .entities
        .iter()
        .map(|e| e.value.to_lowercase())
        .collect();
    let matched = entities
        .iter()
        .filter(|wanted| values.contains(&wanted.to_lowercase()))
        .count();
    matched as f32 / entities.len() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{EpisodicEvent, Knowledge, NewMemory};
    use crate::retrieval::TimeRange;
    use crate::types::{ExtractedEntity, MemoryId, MemoryType};
    use chrono::{Duration, Utc};

    fn memory(draft: NewMemory) -> Memory {
        draft.into_memory(MemoryId::new())
    }

    #[test]
    fn type_mismatch_forces_zero() {
        let fact = Knowledge::new("coffee", "contains", "caffeine");
        let m = memory(NewMemory::semantic("Coffee contains caffeine", fact).with_importance(1.0));
        let query = RetrievalQuery::new()
            .of_type(MemoryType::Episodic)
            .with_keywords(["coffee"])
            .with_min_importance(0.1);
        assert_eq!(score(&m, &query), RelevanceScore::ZERO);
    }

    #[test]
    fn all_criteria_sum_to_one() {
        let now = Utc::now();
        let event = EpisodicEvent::new("lunch", "cafe", 0.9);
        let m = memory(
            NewMemory::episodic("Lunch with Dana at the cafe", event)
                .with_timestamp(now)
                .with_entities([ExtractedEntity::new("person", "Dana", 0.9)]),
        );
        let query = RetrievalQuery::new()
            .of_type(MemoryType::Episodic)
            .with_keywords(["LUNCH", "cafe"])
            .within(TimeRange::new(now - Duration::hours(1), now))
            .with_min_importance(0.5)
            .with_entities(["dana"]);
        assert!((score(&m, &query).value() - 1.0).abs() < 1e-6);
    }

    #[test]
    fn partial_keyword_match_is_proportional() {
        let fact = Knowledge::new("tea", "is", "calming");
        let m = memory(NewMemory::semantic("Tea is calming", fact));
        let query = RetrievalQuery::new().with_keywords(["tea", "coffee"]);
        assert!((score(&m, &query).value() - KEYWORD_WEIGHT / 2.0).abs() < 1e-6);
    }

    #[test]
    fn time_range_is_inclusive() {
        let now = Utc::now();
        let m = memory(NewMemory::semantic("x", Knowledge::new("a", "b", "c")).with_timestamp(now));
        let query = RetrievalQuery::new().within(TimeRange::new(now, now));
        assert!((score(&m, &query).value() - TIME_WEIGHT).abs() < 1e-6);
    }
}
