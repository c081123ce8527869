// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Per-body physics metadata tracked alongside the engine handle.

use echo_phys_geom::Vec3;

use crate::ident::{BodyHandle, BodyId, SceneNodeId, ShapeHandle};

/// Collision flags understood by the engine.
///
/// Discriminants match the engine's bit values (0 dynamic, 1 static,
/// 2 kinematic, 4 ghost / no contact response).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum CollisionFlags {
    /// Moved by the solver.
    #[default]
    Dynamic,
    /// Never moved by the solver.
    Static,
    /// Pose driven by the application; still collides.
    Kinematic,
    /// Reports contacts without a collision response.
    Ghost,
}

impl CollisionFlags {
    /// Engine bit value for these flags.
    pub const fn bits(self) -> u32 {
        match self {
            Self::Dynamic => 0,
            Self::Static => 1,
            Self::Kinematic => 2,
            Self::Ghost => 4,
        }
    }

    /// Decodes an engine bit value; unknown values yield `None`.
    pub const fn from_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => Some(Self::Dynamic),
            1 => Some(Self::Static),
            2 => Some(Self::Kinematic),
            4 => Some(Self::Ghost),
            _ => None,
        }
    }
}

/// Metadata supplied when registering a body.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyMeta {
    /// Display name; `None` for anonymous bodies such as fresh debris.
    pub name: Option<String>,
    /// Added to the physics position when writing the scene node.
    pub transform_offset: Vec3,
    /// Collision flags the body was created with.
    pub collision_flags: CollisionFlags,
    /// Mass in kilograms; `<= 0` means static.
    pub mass: f32,
    /// Whether a strong enough impact fractures this body.
    pub breakable: bool,
    /// Generation within a fracture lineage (0 for original objects).
    pub fragment_depth: u32,
    /// Whether pairs involving this body emit collision events.
    pub check_collisions: bool,
    /// Engine shape backing the body, released together with it.
    pub shape: Option<ShapeHandle>,
}

impl Default for BodyMeta {
    fn default() -> Self {
        Self {
            name: None,
            transform_offset: Vec3::ZERO,
            collision_flags: CollisionFlags::Dynamic,
            mass: 1.0,
            breakable: false,
            fragment_depth: 0,
            check_collisions: false,
            shape: None,
        }
    }
}

/// A registered rigid body.
#[derive(Debug, Clone, PartialEq)]
pub struct RigidBody {
    id: BodyId,
    handle: BodyHandle,
    node: SceneNodeId,
    shape: Option<ShapeHandle>,
    /// Display name; not unique.
    pub name: Option<String>,
    /// Constant offset applied physics → scene (visual pivot vs. center of mass).
    pub transform_offset: Vec3,
    /// Current collision flags.
    pub collision_flags: CollisionFlags,
    /// Mass in kilograms.
    pub mass: f32,
    /// Whether the body may fracture.
    pub breakable: bool,
    /// Set once the body fractured (or was otherwise consumed) this step.
    pub collided_this_step: bool,
    /// Generation within a fracture lineage.
    pub fragment_depth: u32,
    /// Whether pairs involving this body emit collision events.
    pub check_collisions: bool,
    /// Set by the application after moving a kinematic node; cleared once
    /// the pose has been pushed into the engine.
    pub needs_kinematic_push: bool,
    /// Set when a kinematic push completes; the next sync reports it to
    /// update listeners and clears it.
    pub did_update: bool,
}

impl RigidBody {
    pub(crate) fn new(id: BodyId, handle: BodyHandle, node: SceneNodeId, meta: BodyMeta) -> Self {
        Self {
            id,
            handle,
            node,
            shape: meta.shape,
            name: meta.name,
            transform_offset: meta.transform_offset,
            collision_flags: meta.collision_flags,
            mass: meta.mass,
            breakable: meta.breakable,
            collided_this_step: false,
            fragment_depth: meta.fragment_depth,
            check_collisions: meta.check_collisions,
            needs_kinematic_push: false,
            did_update: false,
        }
    }

    /// Registry identity.
    pub fn id(&self) -> BodyId {
        self.id
    }

    /// Engine handle.
    pub fn handle(&self) -> BodyHandle {
        self.handle
    }

    /// Owning scene node.
    pub fn node(&self) -> SceneNodeId {
        self.node
    }

    /// Engine shape, if one was recorded at registration.
    pub fn shape(&self) -> Option<ShapeHandle> {
        self.shape
    }

    /// Returns `true` for kinematic bodies.
    pub fn is_kinematic(&self) -> bool {
        self.collision_flags == CollisionFlags::Kinematic
    }

    /// Returns `true` for bodies that never receive inertia (mass ≤ 0).
    pub fn is_static(&self) -> bool {
        self.mass <= 0.0
    }
}
