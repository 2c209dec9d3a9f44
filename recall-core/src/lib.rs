//! # Recall Core Library
//!
//! Embedded, in-process memory core for conversational agents.
//!
//! A [`MemorySystem`] holds typed memories in four variants:
//!
//! - **Episodic** — events that happened, numbered in storage order
//! - **Semantic** — subject–predicate–object facts
//! - **Procedural** — named step sequences with an effectiveness score
//! - **Emotional** — emotional episodes with trigger and response
//!
//! and layers on top of them a directed association graph, weighted
//! multi-criteria retrieval, periodic consolidation that infers new
//! associations between recently stored memories, lossless and lossy
//! compression, password-based authenticated encryption and full-store
//! snapshots.
//!
//! ## Performance Contract
//!
//! - Store: < 50ms (slower calls are logged)
//! - Retrieval over the whole store: < 100ms (slower queries are logged)
//! - Consolidation: O(n²) in the number of memories stored since the
//!   previous pass

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod compression;
pub mod config;
pub mod consolidation;
pub mod crypto;
pub mod error;
pub mod graph;
pub mod memory;
pub mod metrics;
pub mod retrieval;
pub mod snapshot;
pub mod store;
pub mod system;
pub mod types;

pub use config::RecallConfig;
pub use error::RecallError;
pub use memory::{Memory, NewMemory};
pub use system::MemorySystem;
pub use types::*;
