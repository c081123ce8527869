// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Collision pair lifecycle tracking and the listener bus.
//!
//! Pair identity is canonicalized as `(min_id, max_id)`, so the engine's
//! choice of "body 0" and "body 1" never produces two entries. Each step the
//! tracker diffs the pairs seen this step against the previous step:
//! new pairs emit [`CollisionKind::Start`], persisting pairs emit
//! [`CollisionKind::Colliding`] (once per step, however many manifolds the
//! pair has), and vanished pairs emit [`CollisionKind::End`].

use std::collections::BTreeSet;

use crate::ident::{BodyId, SubscriptionId};

/// Lifecycle stage of a contact pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum CollisionKind {
    /// First step the pair is in contact.
    Start,
    /// Contact persists from the previous step.
    Colliding,
    /// The pair separated since the previous step.
    End,
}

/// Participant as seen by listeners.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BodyRef {
    /// Body identity.
    pub id: BodyId,
    /// Display name at emission time.
    pub name: Option<String>,
}

/// A collision lifecycle event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollisionEvent {
    /// Participant with the smaller id.
    pub a: BodyRef,
    /// Participant with the larger id.
    pub b: BodyRef,
    /// Lifecycle stage.
    pub kind: CollisionKind,
}

impl CollisionEvent {
    /// Canonical pair key of the participants.
    pub fn key(&self) -> PairKey {
        PairKey::new(self.a.id, self.b.id)
    }

    /// Returns the other participant if `body` takes part in this event.
    pub fn other(&self, body: BodyId) -> Option<&BodyRef> {
        if self.a.id == body {
            Some(&self.b)
        } else if self.b.id == body {
            Some(&self.a)
        } else {
            None
        }
    }
}

/// Order-independent identity of a body pair.
#[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PairKey(BodyId, BodyId);

impl PairKey {
    /// Canonicalizes `(a, b)` so that the smaller id comes first.
    pub fn new(a: BodyId, b: BodyId) -> Self {
        if a <= b {
            Self(a, b)
        } else {
            Self(b, a)
        }
    }

    /// Participant with the smaller id.
    pub fn first(self) -> BodyId {
        self.0
    }

    /// Participant with the larger id.
    pub fn second(self) -> BodyId {
        self.1
    }
}

/// Diffs active pairs across consecutive steps.
#[derive(Debug, Default)]
pub struct CollisionTracker {
    previous: BTreeSet<PairKey>,
    current: BTreeSet<PairKey>,
}

impl CollisionTracker {
    /// Creates a tracker with no active pairs.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts a new step with an empty current set.
    pub fn begin_step(&mut self) {
        self.current.clear();
    }

    /// Records contact for `key` this step.
    ///
    /// Returns the kind to emit the first time the pair is seen this step and
    /// `None` for repeated manifolds of the same pair.
    pub fn observe(&mut self, key: PairKey) -> Option<CollisionKind> {
        if !self.current.insert(key) {
            return None;
        }
        if self.previous.contains(&key) {
            Some(CollisionKind::Colliding)
        } else {
            Some(CollisionKind::Start)
        }
    }

    /// Closes the step: returns pairs active last step but not this one (in
    /// key order) and makes the current set the new baseline.
    pub fn finish_step(&mut self) -> Vec<PairKey> {
        let ended = self.previous.difference(&self.current).copied().collect();
        std::mem::swap(&mut self.previous, &mut self.current);
        self.current.clear();
        ended
    }

    /// Returns `true` if `key` was in contact during the last finished step.
    pub fn is_active(&self, key: PairKey) -> bool {
        self.previous.contains(&key)
    }

    /// Number of pairs in contact during the last finished step.
    pub fn active_len(&self) -> usize {
        self.previous.len()
    }
}

type AnyCallback = Box<dyn FnMut(&CollisionEvent)>;
type BodyCallback = Box<dyn FnMut(&BodyRef, CollisionKind)>;
type PairCallback = Box<dyn FnMut(CollisionKind)>;
type UpdateCallback = Box<dyn FnMut()>;

enum Listener {
    Any(AnyCallback),
    Body { body: BodyId, callback: BodyCallback },
    Pair { key: PairKey, callback: PairCallback },
    Update {
        body: BodyId,
        once: bool,
        callback: UpdateCallback,
    },
}

/// Subscription registry for collision events and kinematic update
/// notifications.
#[derive(Default)]
pub struct CollisionBus {
    listeners: Vec<(SubscriptionId, Listener)>,
    next_id: u64,
}

impl CollisionBus {
    /// Creates an empty bus.
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, listener: Listener) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.listeners.push((id, listener));
        id
    }

    /// Subscribes to every event.
    pub fn subscribe<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&CollisionEvent) + 'static,
    {
        self.push(Listener::Any(Box::new(callback)))
    }

    /// Subscribes to events involving `body`; the callback receives the other
    /// participant.
    pub fn subscribe_body<F>(&mut self, body: BodyId, callback: F) -> SubscriptionId
    where
        F: FnMut(&BodyRef, CollisionKind) + 'static,
    {
        self.push(Listener::Body {
            body,
            callback: Box::new(callback),
        })
    }

    /// Subscribes to events between exactly `a` and `b`, in either order.
    pub fn subscribe_pair<F>(&mut self, a: BodyId, b: BodyId, callback: F) -> SubscriptionId
    where
        F: FnMut(CollisionKind) + 'static,
    {
        self.push(Listener::Pair {
            key: PairKey::new(a, b),
            callback: Box::new(callback),
        })
    }

    /// Subscribes to update notifications of `body`, fired on the step after
    /// a kinematic push completes. A `once` listener is dropped after its
    /// first call.
    pub fn subscribe_update<F>(
        &mut self,
        body: BodyId,
        once: bool,
        callback: F,
    ) -> SubscriptionId
    where
        F: FnMut() + 'static,
    {
        self.push(Listener::Update {
            body,
            once,
            callback: Box::new(callback),
        })
    }

    /// Removes a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(sid, _)| *sid != id);
        self.listeners.len() != before
    }

    /// Delivers `event` to matching listeners in subscription order.
    pub fn emit(&mut self, event: &CollisionEvent) {
        for (_, listener) in &mut self.listeners {
            match listener {
                Listener::Any(callback) => callback(event),
                Listener::Body { body, callback } => {
                    if let Some(other) = event.other(*body) {
                        callback(other, event.kind);
                    }
                }
                Listener::Pair { key, callback } => {
                    if *key == event.key() {
                        callback(event.kind);
                    }
                }
                Listener::Update { .. } => {}
            }
        }
    }

    /// Notifies update listeners of `body` in subscription order, then drops
    /// the `once` listeners that fired.
    pub fn emit_update(&mut self, body: BodyId) {
        for (_, listener) in &mut self.listeners {
            if let Listener::Update {
                body: target,
                callback,
                ..
            } = listener
            {
                if *target == body {
                    callback();
                }
            }
        }
        self.listeners.retain(|(_, listener)| match listener {
            Listener::Update {
                body: target,
                once: true,
                ..
            } => *target != body,
            _ => true,
        });
    }

    /// Number of live subscriptions.
    pub fn len(&self) -> usize {
        self.listeners.len()
    }

    /// Returns `true` when nobody is subscribed.
    pub fn is_empty(&self) -> bool {
        self.listeners.is_empty()
    }
}

impl core::fmt::Debug for CollisionBus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CollisionBus")
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    fn id(n: u64) -> BodyId {
        BodyId::from_raw(n)
    }

    fn event(a: u64, b: u64, kind: CollisionKind) -> CollisionEvent {
        CollisionEvent {
            a: BodyRef { id: id(a), name: None },
            b: BodyRef { id: id(b), name: None },
            kind,
        }
    }

    #[test]
    fn pair_key_is_order_independent() {
        assert_eq!(PairKey::new(id(3), id(1)), PairKey::new(id(1), id(3)));
        assert_eq!(PairKey::new(id(3), id(1)).first(), id(1));
    }

    #[test]
    fn repeated_manifolds_emit_once_per_step() {
        let mut t = CollisionTracker::new();
        t.begin_step();
        let k = PairKey::new(id(1), id(2));
        assert_eq!(t.observe(k), Some(CollisionKind::Start));
        assert_eq!(t.observe(PairKey::new(id(2), id(1))), None);
        assert!(t.finish_step().is_empty());

        t.begin_step();
        assert_eq!(t.observe(k), Some(CollisionKind::Colliding));
        assert_eq!(t.observe(k), None);
        assert!(t.finish_step().is_empty());

        t.begin_step();
        assert_eq!(t.finish_step(), vec![k]);
        assert!(!t.is_active(k));

        t.begin_step();
        assert!(t.finish_step().is_empty());
    }

    #[test]
    fn body_listener_receives_other_participant() {
        let mut bus = CollisionBus::new();
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        bus.subscribe_body(id(2), move |other, kind| {
            sink.borrow_mut().push((other.id, kind));
        });
        bus.emit(&event(1, 2, CollisionKind::Start));
        bus.emit(&event(1, 3, CollisionKind::Start));
        bus.emit(&event(2, 5, CollisionKind::End));
        assert_eq!(
            *seen.borrow(),
            vec![(id(1), CollisionKind::Start), (id(5), CollisionKind::End)]
        );
    }

    #[test]
    fn pair_listener_ignores_other_pairs_and_unsubscribe_stops_delivery() {
        let mut bus = CollisionBus::new();
        let count = Rc::new(RefCell::new(0));
        let sink = Rc::clone(&count);
        let sub = bus.subscribe_pair(id(4), id(1), move |_| *sink.borrow_mut() += 1);
        bus.emit(&event(1, 4, CollisionKind::Colliding));
        bus.emit(&event(1, 2, CollisionKind::Colliding));
        assert_eq!(*count.borrow(), 1);
        assert!(bus.unsubscribe(sub));
        assert!(!bus.unsubscribe(sub));
        bus.emit(&event(1, 4, CollisionKind::End));
        assert_eq!(*count.borrow(), 1);
    }

    #[test]
    fn once_update_listener_fires_a_single_time() {
        let mut bus = CollisionBus::new();
        let calls = Rc::new(RefCell::new(Vec::new()));
        let (every, first) = (Rc::clone(&calls), Rc::clone(&calls));
        bus.subscribe_update(id(1), false, move || every.borrow_mut().push("on"));
        bus.subscribe_update(id(1), true, move || first.borrow_mut().push("once"));
        bus.emit_update(id(2));
        bus.emit(&event(1, 2, CollisionKind::Start));
        assert!(calls.borrow().is_empty());

        bus.emit_update(id(1));
        bus.emit_update(id(1));
        assert_eq!(*calls.borrow(), vec!["on", "once", "on"]);
        assert_eq!(bus.len(), 1);
    }
}
