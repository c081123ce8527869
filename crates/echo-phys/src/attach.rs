// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Building engine bodies for scene nodes and tearing them down again.

use echo_phys_geom::Vec3;
use thiserror::Error;
use tracing::{debug, warn};

use crate::body::{BodyMeta, CollisionFlags, RigidBody};
use crate::ident::{BodyId, SceneNodeId};
use crate::ports::{BodyCreateInfo, PhysicsWorld, SceneGraph};
use crate::registry::{BodyRegistry, RegistryError};
use crate::shape::{resolve_shape, MeshMode, ShapeKind};

/// Errors returned when a body cannot be attached to a node.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttachError {
    /// The physics engine has not finished loading.
    #[error("physics engine is not ready")]
    NotReady,
    /// The node is not part of the scene.
    #[error("scene node {0:?} not found")]
    UnknownNode(SceneNodeId),
    /// The engine could not build the shape; the node stays bodyless.
    #[error("could not build a collision shape for node {0:?}")]
    MalformedShape(SceneNodeId),
    /// Registry rejected the body.
    #[error(transparent)]
    Registry(#[from] RegistryError),
}

/// Options for attaching a body to an existing scene node.
#[derive(Debug, Clone, PartialEq)]
pub struct BodyConfig {
    /// Explicit shape; when `None` the scene's hint or a unit box is used.
    pub shape: Option<ShapeKind>,
    /// Mass in kilograms; `<= 0` makes the body static.
    pub mass: f32,
    /// Collision flags applied after creation.
    pub collision_flags: CollisionFlags,
    /// Offset added physics → scene.
    pub offset: Option<Vec3>,
    /// Whether impacts may fracture the body.
    pub breakable: bool,
    /// Generation within a fracture lineage.
    pub fragment_depth: u32,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            shape: None,
            mass: 1.0,
            collision_flags: CollisionFlags::Dynamic,
            offset: None,
            breakable: false,
            fragment_depth: 0,
        }
    }
}

impl BodyConfig {
    /// Static ground-style body: zero mass, static flags.
    pub fn ground(shape: ShapeKind) -> Self {
        Self {
            shape: Some(shape),
            mass: 0.0,
            collision_flags: CollisionFlags::Static,
            ..Self::default()
        }
    }

    /// Hull-shaped debris one generation below `parent_depth`, not breakable
    /// until its cool-down elapses.
    pub fn debris(parent_depth: u32) -> Self {
        Self {
            shape: Some(ShapeKind::Mesh(MeshMode::Hull)),
            fragment_depth: parent_depth + 1,
            ..Self::default()
        }
    }
}

/// Creates an engine body for `node` and registers it.
///
/// Shape construction failures are logged and reported as
/// [`AttachError::MalformedShape`]; nothing is added to the engine or the
/// registry in that case.
pub(crate) fn attach_body<W, S>(
    world: &mut W,
    scene: &S,
    registry: &mut BodyRegistry,
    node: SceneNodeId,
    config: &BodyConfig,
) -> Result<BodyId, AttachError>
where
    S: SceneGraph,
    W: PhysicsWorld<Geometry = S::Geometry>,
{
    let name = scene.name(node);
    if registry.has_body(node) {
        warn!(?node, ?name, "node already has a physical body");
        return Err(RegistryError::NodeHasBody(node).into());
    }
    let pose = scene
        .world_pose(node)
        .ok_or(AttachError::UnknownNode(node))?;

    let shape = resolve_shape(config.shape.as_ref(), scene.shape_hint(node), name.as_deref());
    let geometry = if shape.needs_geometry() {
        scene.geometry(node)
    } else {
        None
    };
    let Some(shape_handle) = world.create_shape(&shape, geometry.as_ref()) else {
        warn!(?node, ?name, ?shape, "collision shape construction failed");
        return Err(AttachError::MalformedShape(node));
    };

    let handle = world.create_body(&BodyCreateInfo::new(shape_handle, pose, config.mass));
    world.set_collision_flags(handle, config.collision_flags);

    let meta = BodyMeta {
        name,
        transform_offset: config.offset.unwrap_or(Vec3::ZERO),
        collision_flags: config.collision_flags,
        mass: config.mass,
        breakable: config.breakable,
        fragment_depth: config.fragment_depth,
        check_collisions: false,
        shape: Some(shape_handle),
    };
    match registry.register(node, handle, meta) {
        Ok(id) => {
            debug!(%id, ?node, ?handle, "body attached");
            Ok(id)
        }
        Err(err) => {
            world.remove_body(handle);
            world.remove_shape(shape_handle);
            Err(err.into())
        }
    }
}

/// Removes a body and its shape from the engine and the registry; the node
/// stays in the scene, bodyless.
pub(crate) fn detach_body<W>(
    world: &mut W,
    registry: &mut BodyRegistry,
    id: BodyId,
) -> Option<RigidBody>
where
    W: PhysicsWorld,
{
    let body = registry.remove(id)?;
    world.remove_body(body.handle());
    if let Some(shape) = body.shape() {
        world.remove_shape(shape);
    }
    Some(body)
}
