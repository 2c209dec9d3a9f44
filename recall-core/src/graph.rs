//! Association graph — directed, weighted, typed edges between memories.
//!
//! Edges are created only when the source exists; the target is never
//! checked, so dangling edges are allowed and simply fail to resolve
//! during traversal. Traversal follows outgoing edges only, even for
//! edges flagged `bidirectional`.

use std::collections::HashMap;

use tracing::debug;

use crate::error::{RecallError, Result};
use crate::memory::Memory;
use crate::store::MemoryStore;
use crate::types::{Association, AssociationType, MemoryId};

/// Default edge strength.
pub const DEFAULT_STRENGTH: f32 = 0.5;

/// Default traversal depth.
pub const DEFAULT_MAX_DEPTH: usize = 2;

impl MemoryStore {
    /// Link `source` to `target`.
    ///
    /// # Errors
    /// Returns [`RecallError::NotFound`] if `source` is not stored.
    pub fn create_association(
        &mut self,
        source: MemoryId,
        target: MemoryId,
        kind: AssociationType,
        strength: f32,
    ) -> Result<Association> {
        self.add_association(source, Association::new(target, kind, strength))
    }

    /// Attach a fully-built edge to `source`.
    ///
    /// # Errors
    /// Returns [`RecallError::NotFound`] if `source` is not stored.
    pub fn add_association(
        &mut self,
        source: MemoryId,
        association: Association,
    ) -> Result<Association> {
        if !self.attach(source, association.clone()) {
            return Err(RecallError::NotFound(source));
        }
        debug!(
            source = %source,
            target = %association.target_id,
            kind = ?association.kind,
            strength = association.strength,
            dangling = !self.contains(&association.target_id),
            "Created association"
        );
        Ok(association)
    }

    /// Memories reachable from `start` within `max_depth` outgoing hops,
    /// in depth-first discovery order, excluding `start` and duplicates.
    ///
    /// A node reached at `max_depth` is included but not expanded. A node
    /// reached again by a shorter path is re-expanded (not re-emitted), so
    /// the result is exactly the set of ids within `max_depth` hops.
    #[must_use]
    pub fn associated_memories(&self, start: MemoryId, max_depth: usize) -> Vec<Memory> {
        let mut depths: HashMap<MemoryId, usize> = HashMap::new();
        depths.insert(start, 0);
        let mut order = Vec::new();

        // Explicit DFS frames: (node, depth the node was expanded at, next edge index).
        let mut stack: Vec<(MemoryId, usize, usize)> = vec![(start, 0, 0)];
        while let Some(frame) = stack.last_mut() {
            let (node, depth, index) = *frame;
            let edges = self.associations_of(&node);
            if depth >= max_depth || index >= edges.len() {
                stack.pop();
                continue;
            }
            frame.2 += 1;

            let target = edges[index].target_id;
            if !self.contains(&target) {
                continue;
            }
            let next = depth + 1;
            match depths.get(&target) {
                Some(&seen) if seen <= next => continue,
                Some(_) => {}
                None => order.push(target),
            }
            depths.insert(target, next);
            stack.push((target, next, 0));
        }

        order
            .into_iter()
            .filter_map(|id| self.get(&id).cloned())
            .collect()
    }
}
