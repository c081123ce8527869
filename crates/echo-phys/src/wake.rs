// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Wake-at timers run by the frame driver between steps.

use std::cmp::Reverse;
use std::collections::BinaryHeap;

use crate::ident::BodyId;

/// Deferred action fired once the simulation clock reaches its due time.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum WakeAction {
    /// Re-enable fracture on a debris body after its cool-down.
    RestoreBreakable(BodyId),
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord)]
struct Wake {
    due_ms: u64,
    seq: u64,
    action: WakeAction,
}

/// Min-heap of wakes ordered by `(due_ms, insertion sequence)`.
#[derive(Debug, Default)]
pub struct WakeQueue {
    heap: BinaryHeap<Reverse<Wake>>,
    seq: u64,
}

impl WakeQueue {
    /// Creates an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules `action` at simulation time `due_ms`.
    pub fn schedule(&mut self, due_ms: u64, action: WakeAction) {
        self.seq += 1;
        self.heap.push(Reverse(Wake {
            due_ms,
            seq: self.seq,
            action,
        }));
    }

    /// Pops every wake due at or before `now_ms`, earliest first.
    pub fn pop_due(&mut self, now_ms: u64) -> Vec<WakeAction> {
        let mut due = Vec::new();
        while let Some(Reverse(next)) = self.heap.peek() {
            if next.due_ms > now_ms {
                break;
            }
            if let Some(Reverse(wake)) = self.heap.pop() {
                due.push(wake.action);
            }
        }
        due
    }

    /// Due time of the earliest pending wake.
    pub fn next_due(&self) -> Option<u64> {
        self.heap.peek().map(|Reverse(w)| w.due_ms)
    }

    /// Number of pending wakes.
    pub fn len(&self) -> usize {
        self.heap.len()
    }

    /// Returns `true` when nothing is pending.
    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
