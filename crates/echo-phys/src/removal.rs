// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Queue of bodies to remove once the current step's collision pass is done.

use crate::ident::BodyId;

/// Bodies collected during one step and flushed at its end.
///
/// A body is queued at most once; insertion order is preserved.
#[derive(Debug, Default)]
pub struct DeferredRemoval {
    queue: Vec<BodyId>,
}

impl DeferredRemoval {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queues `id`; returns `false` if it was already queued.
    pub fn enqueue(&mut self, id: BodyId) -> bool {
        if self.queue.contains(&id) {
            return false;
        }
        self.queue.push(id);
        true
    }

    /// Takes every queued id, leaving the queue empty.
    pub fn drain(&mut self) -> Vec<BodyId> {
        std::mem::take(&mut self.queue)
    }

    /// Returns `true` if `id` is queued.
    pub fn contains(&self, id: BodyId) -> bool {
        self.queue.contains(&id)
    }

    /// Number of queued bodies.
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    /// Returns `true` when nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }
}
