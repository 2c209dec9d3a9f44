//! Property-Based Tests for Recall Core
//!
//! Uses `proptest` to check the invariants of the store, graph, retrieval,
//! compression and encryption units under random inputs.

use std::collections::HashSet;

use proptest::prelude::*;

use recall_core::compression::{compress_lossless, decompress_lossless};
use recall_core::config::RetrievalConfig;
use recall_core::crypto::Encryptor;
use recall_core::memory::{Emotion, EpisodicEvent, Knowledge, NewMemory, Procedure};
use recall_core::retrieval::scoring;
use recall_core::retrieval::{RetrievalEngine, RetrievalQuery};
use recall_core::store::MemoryStore;
use recall_core::{AssociationType, MemoryType, RecallError};

// ---------------------------------------------------------------------------
// Strategy helpers
// ---------------------------------------------------------------------------

fn arb_memory_type() -> impl Strategy<Value = MemoryType> {
    prop::sample::select(MemoryType::ALL.to_vec())
}

fn arb_draft() -> impl Strategy<Value = NewMemory> {
    (arb_memory_type(), "[a-z ]{0,40}", 0.0..1.0f32).prop_map(|(kind, content, importance)| {
        let draft = match kind {
            MemoryType::Episodic => {
                NewMemory::episodic(content, EpisodicEvent::new("e", "d", importance))
            }
            MemoryType::Semantic => NewMemory::semantic(content, Knowledge::new("s", "p", "o")),
            MemoryType::Procedural => {
                NewMemory::procedural(content, Procedure::new("p", ["step"], importance))
            }
            MemoryType::Emotional => {
                NewMemory::emotional(content, Emotion::new("joy", importance, "t", "r", 0.5))
            }
        };
        draft.with_importance(importance)
    })
}

fn arb_query() -> impl Strategy<Value = RetrievalQuery> {
    (
        prop::option::of(arb_memory_type()),
        prop::collection::vec("[a-z]{1,4}", 0..4),
        prop::option::of(0.0..1.0f32),
        prop::collection::vec("[a-z]{1,4}", 0..3),
    )
        .prop_map(|(kind, keywords, min_importance, entities)| {
            let mut query = RetrievalQuery::new().with_keywords(keywords).with_entities(entities);
            if let Some(kind) = kind {
                query = query.of_type(kind);
            }
            if let Some(min) = min_importance {
                query = query.with_min_importance(min);
            }
            query
        })
}

fn store_of(drafts: Vec<NewMemory>) -> MemoryStore {
    let mut store = MemoryStore::new();
    for draft in drafts {
        store.insert(draft);
    }
    store
}

// ---------------------------------------------------------------------------
// Compression and encryption
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn lossless_round_trips(text in "\\PC{0,2000}") {
        let packed = compress_lossless(&text).expect("compress");
        prop_assert_eq!(decompress_lossless(&packed).expect("decompress"), text);
    }
}

proptest! {
    // Each case runs two 100k-round key derivations.
    #![proptest_config(ProptestConfig::with_cases(4))]

    #[test]
    fn encryption_round_trips_and_rejects_other_passwords(
        text in "\\PC{0,200}",
        password in "[a-zA-Z0-9]{1,16}",
    ) {
        let unit = Encryptor::new();
        let sealed = unit.encrypt(&text, &password).expect("encrypt");
        prop_assert_eq!(unit.decrypt(&sealed, &password).expect("decrypt"), text);

        let wrong = format!("{password}!");
        prop_assert!(matches!(unit.decrypt(&sealed, &wrong), Err(RecallError::Decryption(_))));
    }
}

// ---------------------------------------------------------------------------
// Retrieval
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn relevance_is_clamped_and_type_filter_is_exclusive(
        drafts in prop::collection::vec(arb_draft(), 1..20),
        query in arb_query(),
    ) {
        let store = store_of(drafts);
        for memory in store.iter() {
            let score = scoring::score(memory, &query).value();
            prop_assert!((0.0..=1.0).contains(&score));
            if let Some(wanted) = query.memory_type {
                if wanted != memory.memory_type() {
                    prop_assert_eq!(score, 0.0);
                }
            }
        }
    }

    #[test]
    fn pagination_is_bounded(
        drafts in prop::collection::vec(arb_draft(), 0..30),
        query in arb_query(),
        limit in 0usize..10,
        offset in 0usize..10,
    ) {
        let mut store = store_of(drafts);
        let engine = RetrievalEngine::new(RetrievalConfig::default());
        let result = engine.retrieve(&mut store, &query.limit(limit).offset(offset));

        prop_assert!(result.memories.len() <= limit);
        prop_assert!(result.total_count >= result.memories.len());
        let scores: Vec<f32> = result
            .memories
            .iter()
            .map(|m| result.score_of(&m.id).expect("scored"))
            .collect();
        prop_assert!(scores.windows(2).all(|w| w[0] >= w[1]));
    }

    #[test]
    fn episodic_sequences_are_consecutive(drafts in prop::collection::vec(arb_draft(), 0..30)) {
        let mut store = MemoryStore::new();
        let sequences: Vec<u64> = drafts
            .into_iter()
            .filter_map(|draft| store.insert(draft).sequence())
            .collect();
        for (i, seq) in sequences.iter().enumerate() {
            prop_assert_eq!(*seq, i as u64 + 1);
        }
    }
}

// ---------------------------------------------------------------------------
// Association graph
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn traversal_is_monotone_in_depth_and_duplicate_free(
        nodes in 1usize..12,
        edges in prop::collection::vec((0usize..12, 0usize..12), 0..40),
        start in 0usize..12,
    ) {
        let mut store = MemoryStore::new();
        let node =
            |i: usize| NewMemory::semantic(format!("node {i}"), Knowledge::new("n", "is", "node"));
        let ids: Vec<_> = (0..nodes).map(|i| store.insert(node(i)).id).collect();
        for (from, to) in edges {
            let (from, to) = (ids[from % nodes], ids[to % nodes]);
            store
                .create_association(from, to, AssociationType::Contextual, 0.5)
                .expect("source exists");
        }
        let start = ids[start % nodes];

        let mut previous = 0;
        for depth in 0..6 {
            let reached = store.associated_memories(start, depth);
            let unique: HashSet<_> = reached.iter().map(|m| m.id).collect();
            prop_assert_eq!(unique.len(), reached.len());
            prop_assert!(!unique.contains(&start));
            prop_assert!(reached.len() >= previous);
            previous = reached.len();
        }
    }
}
