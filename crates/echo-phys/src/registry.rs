// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Registry of live rigid bodies keyed by engine handle and body id.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;
use thiserror::Error;
use tracing::warn;

use crate::body::{BodyMeta, RigidBody};
use crate::ident::{BodyHandle, BodyId, SceneNodeId};

/// Errors emitted by the body registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// The scene node already owns a rigid body.
    #[error("scene node {0:?} already has a body")]
    NodeHasBody(SceneNodeId),
    /// The engine handle is already mapped to a live body.
    #[error("engine handle {0:?} is already registered")]
    HandleInUse(BodyHandle),
    /// No live body with this id.
    #[error("unknown body: {0}")]
    UnknownBody(BodyId),
}

/// Single source of truth for which bodies exist.
///
/// Bodies live in a `BTreeMap` keyed by [`BodyId`]; ids are handed out in
/// increasing order, so iteration order equals registration order. Handle and
/// node lookups go through hash indices kept in lockstep with that map.
#[derive(Debug, Default)]
pub struct BodyRegistry {
    bodies: BTreeMap<BodyId, RigidBody>,
    by_handle: FxHashMap<BodyHandle, BodyId>,
    by_node: FxHashMap<SceneNodeId, BodyId>,
    next_id: u64,
}

impl BodyRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a new body for `node` backed by the engine `handle`.
    ///
    /// # Errors
    /// [`RegistryError::NodeHasBody`] if `node` already owns a body and
    /// [`RegistryError::HandleInUse`] if `handle` is live. The registry is left
    /// unchanged in both cases.
    pub fn register(
        &mut self,
        node: SceneNodeId,
        handle: BodyHandle,
        meta: BodyMeta,
    ) -> Result<BodyId, RegistryError> {
        if self.by_node.contains_key(&node) {
            warn!(?node, name = ?meta.name, "node already has a physical body");
            return Err(RegistryError::NodeHasBody(node));
        }
        if self.by_handle.contains_key(&handle) {
            warn!(?handle, "engine handle registered twice");
            return Err(RegistryError::HandleInUse(handle));
        }
        self.next_id += 1;
        let id = BodyId::from_raw(self.next_id);
        self.bodies.insert(id, RigidBody::new(id, handle, node, meta));
        self.by_handle.insert(handle, id);
        self.by_node.insert(node, id);
        Ok(id)
    }

    /// Resolves an engine handle; `None` for handles not currently registered.
    pub fn lookup(&self, handle: BodyHandle) -> Option<&RigidBody> {
        let id = self.by_handle.get(&handle)?;
        self.bodies.get(id)
    }

    /// Resolves an engine handle to its body id.
    pub fn id_for_handle(&self, handle: BodyHandle) -> Option<BodyId> {
        self.by_handle.get(&handle).copied()
    }

    /// Returns the body with `id`, if live.
    pub fn get(&self, id: BodyId) -> Option<&RigidBody> {
        self.bodies.get(&id)
    }

    /// Mutable access to the body with `id`, if live.
    pub fn get_mut(&mut self, id: BodyId) -> Option<&mut RigidBody> {
        self.bodies.get_mut(&id)
    }

    /// Returns the body owned by `node`, if any.
    pub fn body_for_node(&self, node: SceneNodeId) -> Option<BodyId> {
        self.by_node.get(&node).copied()
    }

    /// Returns `true` when `node` owns a body.
    pub fn has_body(&self, node: SceneNodeId) -> bool {
        self.by_node.contains_key(&node)
    }

    /// Detaches a body: drops the handle mapping and marks its node bodyless.
    ///
    /// Requires `&mut self`, so it cannot run while any iteration over
    /// [`Self::all`] is alive.
    pub fn remove(&mut self, id: BodyId) -> Option<RigidBody> {
        let body = self.bodies.remove(&id)?;
        self.by_handle.remove(&body.handle());
        self.by_node.remove(&body.node());
        Some(body)
    }

    /// Live bodies in registration order.
    pub fn all(&self) -> impl Iterator<Item = &RigidBody> + '_ {
        self.bodies.values()
    }

    /// Snapshot of live ids in registration order.
    pub fn ids(&self) -> Vec<BodyId> {
        self.bodies.keys().copied().collect()
    }

    /// Clears `collided_this_step` on every body.
    pub(crate) fn reset_step_flags(&mut self) {
        for body in self.bodies.values_mut() {
            body.collided_this_step = false;
        }
    }

    /// Number of live bodies.
    pub fn len(&self) -> usize {
        self.bodies.len()
    }

    /// Returns `true` when no body is registered.
    pub fn is_empty(&self) -> bool {
        self.bodies.is_empty()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn named(name: &str) -> BodyMeta {
        BodyMeta {
            name: Some(name.to_owned()),
            ..BodyMeta::default()
        }
    }

    #[test]
    fn register_then_lookup_by_handle() {
        let mut reg = BodyRegistry::new();
        let id = reg
            .register(SceneNodeId(1), BodyHandle(100), named("box"))
            .unwrap();
        let body = reg.lookup(BodyHandle(100)).unwrap();
        assert_eq!(body.id(), id);
        assert_eq!(body.name.as_deref(), Some("box"));
        assert!(reg.lookup(BodyHandle(101)).is_none());
    }

    #[test]
    fn second_body_on_same_node_is_rejected() {
        let mut reg = BodyRegistry::new();
        reg.register(SceneNodeId(1), BodyHandle(1), named("a"))
            .unwrap();
        let err = reg
            .register(SceneNodeId(1), BodyHandle(2), named("a"))
            .unwrap_err();
        assert_eq!(err, RegistryError::NodeHasBody(SceneNodeId(1)));
        assert_eq!(reg.len(), 1);
        assert!(reg.lookup(BodyHandle(2)).is_none());
    }

    #[test]
    fn live_handle_cannot_be_registered_twice() {
        let mut reg = BodyRegistry::new();
        reg.register(SceneNodeId(1), BodyHandle(7), named("a"))
            .unwrap();
        let err = reg
            .register(SceneNodeId(2), BodyHandle(7), named("b"))
            .unwrap_err();
        assert_eq!(err, RegistryError::HandleInUse(BodyHandle(7)));
    }

    #[test]
    fn remove_frees_node_and_handle() {
        let mut reg = BodyRegistry::new();
        let id = reg
            .register(SceneNodeId(1), BodyHandle(7), named("a"))
            .unwrap();
        let removed = reg.remove(id).unwrap();
        assert_eq!(removed.handle(), BodyHandle(7));
        assert!(!reg.has_body(SceneNodeId(1)));
        assert!(reg.lookup(BodyHandle(7)).is_none());
        // Handle may now be reused by the engine for a new body.
        let again = reg
            .register(SceneNodeId(1), BodyHandle(7), named("a"))
            .unwrap();
        assert_ne!(again, id);
    }

    #[test]
    fn iteration_follows_registration_order() {
        let mut reg = BodyRegistry::new();
        let a = reg.register(SceneNodeId(9), BodyHandle(3), named("a")).unwrap();
        let b = reg.register(SceneNodeId(2), BodyHandle(1), named("b")).unwrap();
        let c = reg.register(SceneNodeId(5), BodyHandle(2), named("c")).unwrap();
        assert_eq!(reg.ids(), vec![a, b, c]);
        let names: Vec<_> = reg.all().filter_map(|b| b.name.clone()).collect();
        assert_eq!(names, vec!["a", "b", "c"]);
    }
}
