// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Ports to the external collaborators: physics engine, scene graph and the
//! geometry subdivision service.
//!
//! Adapters implement these traits; the sync core only calls them. None of
//! them integrate motion, detect contacts or decompose meshes here.

use echo_phys_geom::{Pose, Vec3};

use crate::body::CollisionFlags;
use crate::ident::{BodyHandle, SceneNodeId, ShapeHandle};
use crate::shape::ShapeKind;

/// One contact point inside a manifold, in the engine's conventions.
///
/// `distance` is positive while separated, zero when exactly touching and
/// negative while penetrating.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ContactPoint {
    /// Contact position on body B, world space.
    pub position_world_on_b: Vec3,
    /// Contact normal on body B, world space (unit).
    pub normal_world_on_b: Vec3,
    /// Signed separation distance.
    pub distance: f32,
    /// Impulse the solver applied at this point during the last step.
    pub applied_impulse: f32,
}

/// The engine's record of contact between two bodies.
#[derive(Debug, Clone, PartialEq)]
pub struct ContactManifold {
    /// First participant as reported by the engine.
    pub body0: BodyHandle,
    /// Second participant as reported by the engine.
    pub body1: BodyHandle,
    /// Contact points; may be empty for pairs that merely overlap in the
    /// broad phase.
    pub points: Vec<ContactPoint>,
}

/// Parameters for creating an engine rigid body.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct BodyCreateInfo {
    /// Shape built by [`PhysicsWorld::create_shape`].
    pub shape: ShapeHandle,
    /// Initial world pose.
    pub pose: Pose,
    /// Mass in kilograms.
    pub mass: f32,
    /// Whether the engine should compute local inertia. Only for `mass > 0`.
    pub compute_inertia: bool,
    /// Whether sleeping is disabled for this body. Only for `mass > 0`.
    pub disable_deactivation: bool,
}

impl BodyCreateInfo {
    /// Builds creation parameters, deriving the inertia and deactivation
    /// switches from `mass`.
    pub fn new(shape: ShapeHandle, pose: Pose, mass: f32) -> Self {
        let dynamic = mass > 0.0;
        Self {
            shape,
            pose,
            mass,
            compute_inertia: dynamic,
            disable_deactivation: dynamic,
        }
    }
}

/// External rigid-body engine.
pub trait PhysicsWorld {
    /// Geometry type the engine consumes for mesh-derived shapes.
    type Geometry;

    /// Advances the engine clock by `dt` seconds.
    ///
    /// `dt` should stay below `max_sub_steps * fixed_time_step`, otherwise the
    /// engine drops simulation time.
    fn step_simulation(&mut self, dt: f32, max_sub_steps: u32, fixed_time_step: f32);

    /// Sets world gravity.
    fn set_gravity(&mut self, gravity: Vec3);

    /// Builds a collision shape; `None` when the shape is malformed (e.g. a
    /// hull over empty geometry).
    fn create_shape(
        &mut self,
        shape: &ShapeKind,
        geometry: Option<&Self::Geometry>,
    ) -> Option<ShapeHandle>;

    /// Releases a shape once no body uses it.
    fn remove_shape(&mut self, shape: ShapeHandle);

    /// Creates a body and adds it to the world.
    fn create_body(&mut self, info: &BodyCreateInfo) -> BodyHandle;

    /// Removes a body from the world and releases it. Its shape is released
    /// separately through [`Self::remove_shape`].
    fn remove_body(&mut self, handle: BodyHandle);

    /// Number of contact manifolds after the last step.
    fn num_manifolds(&self) -> usize;

    /// Manifold at `index`, if in range.
    fn manifold(&self, index: usize) -> Option<ContactManifold>;

    /// Current motion-state transform; `None` if the body has none (being
    /// removed or malformed).
    fn motion_state(&self, handle: BodyHandle) -> Option<Pose>;

    /// Overwrites the motion-state transform.
    fn set_motion_state(&mut self, handle: BodyHandle, pose: Pose);

    /// Linear velocity.
    fn linear_velocity(&self, handle: BodyHandle) -> Vec3;

    /// Angular velocity.
    fn angular_velocity(&self, handle: BodyHandle) -> Vec3;

    /// Sets linear velocity.
    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3);

    /// Sets angular velocity.
    fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3);

    /// Applies an impulse through the center of mass.
    fn apply_central_impulse(&mut self, handle: BodyHandle, impulse: Vec3);

    /// Sets restitution (bounciness), 0..=1.
    fn set_restitution(&mut self, handle: BodyHandle, restitution: f32);

    /// Sets friction, 0..=1.
    fn set_friction(&mut self, handle: BodyHandle, friction: f32);

    /// Sets collision flags.
    fn set_collision_flags(&mut self, handle: BodyHandle, flags: CollisionFlags);

    /// Per-axis multiplier on linear motion (0 locks an axis).
    fn set_linear_factor(&mut self, handle: BodyHandle, factor: Vec3);

    /// Per-axis multiplier on angular motion (0 locks an axis).
    fn set_angular_factor(&mut self, handle: BodyHandle, factor: Vec3);

    /// Speed above which continuous collision detection kicks in.
    fn set_ccd_motion_threshold(&mut self, handle: BodyHandle, threshold: f32);

    /// Radius of the sphere swept for continuous collision detection.
    fn set_ccd_swept_sphere_radius(&mut self, handle: BodyHandle, radius: f32);
}

/// Scene graph that owns the renderable nodes.
pub trait SceneGraph {
    /// Geometry attached to renderable nodes.
    type Geometry: Clone;

    /// World pose of `node`; `None` if the node is gone.
    fn world_pose(&self, node: SceneNodeId) -> Option<Pose>;

    /// Writes the world pose of `node`.
    fn set_pose(&mut self, node: SceneNodeId, pose: Pose);

    /// Display name of `node`, if any.
    fn name(&self, node: SceneNodeId) -> Option<String>;

    /// Geometry of `node`, if it is renderable.
    fn geometry(&self, node: SceneNodeId) -> Option<Self::Geometry>;

    /// Shape implied by the node's geometry type, if recognizable.
    fn shape_hint(&self, node: SceneNodeId) -> Option<ShapeKind>;

    /// Adds an anonymous node carrying `geometry` at `pose`.
    fn add_node(&mut self, geometry: Self::Geometry, pose: Pose) -> SceneNodeId;

    /// Detaches `node` from the scene.
    fn remove_node(&mut self, node: SceneNodeId);
}

/// A piece produced by subdividing a breakable object.
#[derive(Debug, Clone, PartialEq)]
pub struct Fragment<G> {
    /// Fragment geometry, local to `pose`.
    pub geometry: G,
    /// World pose of the fragment.
    pub pose: Pose,
}

/// Mesh subdivision service used by fracture.
pub trait GeometrySubdivider {
    /// Geometry type it splits.
    type Geometry;

    /// Splits `geometry` (placed at `pose`) around the impact. May return an
    /// empty list for degenerate meshes.
    fn subdivide(
        &mut self,
        geometry: &Self::Geometry,
        pose: Pose,
        impact_point: Vec3,
        impact_normal: Vec3,
        piece_count_hint: u32,
    ) -> Vec<Fragment<Self::Geometry>>;
}
