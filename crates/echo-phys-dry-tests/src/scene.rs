// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! In-memory scene graph and vertex-list geometry.

use std::collections::BTreeMap;

use echo_phys::{Pose, SceneGraph, SceneNodeId, ShapeKind, Vec3};

/// Geometry as a bare vertex list in node-local space.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeGeometry {
    /// Local-space vertices.
    pub vertices: Vec<Vec3>,
}

impl FakeGeometry {
    /// The eight corners of a cuboid centered on the origin.
    pub fn cuboid(width: f32, height: f32, depth: f32) -> Self {
        let (hx, hy, hz) = (width * 0.5, height * 0.5, depth * 0.5);
        let mut vertices = Vec::with_capacity(8);
        for x in [-hx, hx] {
            for y in [-hy, hy] {
                for z in [-hz, hz] {
                    vertices.push(Vec3::new(x, y, z));
                }
            }
        }
        Self { vertices }
    }

    /// Geometry without vertices; hull construction over it fails.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Local axis-aligned bounds, `None` when empty.
    pub fn bounds(&self) -> Option<(Vec3, Vec3)> {
        let first = *self.vertices.first()?;
        let (mut lo, mut hi) = (first.to_array(), first.to_array());
        for v in &self.vertices {
            for (axis, value) in v.to_array().into_iter().enumerate() {
                lo[axis] = lo[axis].min(value);
                hi[axis] = hi[axis].max(value);
            }
        }
        Some((Vec3::from(lo), Vec3::from(hi)))
    }

    /// Full extents of the bounds (zero when empty).
    pub fn extents(&self) -> Vec3 {
        self.bounds().map_or(Vec3::ZERO, |(lo, hi)| hi.sub(&lo))
    }
}

/// A scene node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FakeNode {
    /// Display name.
    pub name: Option<String>,
    /// World pose.
    pub pose: Pose,
    /// Renderable geometry.
    pub geometry: Option<FakeGeometry>,
    /// Shape implied by the geometry type.
    pub shape_hint: Option<ShapeKind>,
}

impl FakeNode {
    /// Named node at the origin.
    pub fn named(name: &str) -> Self {
        Self {
            name: Some(name.to_owned()),
            ..Self::default()
        }
    }

    /// Named cuboid node with matching geometry and a `Box` hint.
    pub fn cuboid(name: &str, position: Vec3, size: Vec3) -> Self {
        Self {
            name: Some(name.to_owned()),
            pose: Pose::from_position(position),
            geometry: Some(FakeGeometry::cuboid(size.x(), size.y(), size.z())),
            shape_hint: Some(ShapeKind::Box {
                width: size.x(),
                height: size.y(),
                depth: size.z(),
            }),
        }
    }

    /// Places the node at `position`.
    pub fn at(mut self, position: Vec3) -> Self {
        self.pose = Pose::from_position(position);
        self
    }

    /// Attaches geometry.
    pub fn with_geometry(mut self, geometry: FakeGeometry) -> Self {
        self.geometry = Some(geometry);
        self
    }

    /// Sets the shape hint.
    pub fn with_hint(mut self, hint: ShapeKind) -> Self {
        self.shape_hint = Some(hint);
        self
    }
}

/// In-memory [`SceneGraph`].
#[derive(Debug, Default)]
pub struct FakeScene {
    nodes: BTreeMap<SceneNodeId, FakeNode>,
    next_id: u64,
    pose_writes: usize,
}

impl FakeScene {
    /// Empty scene.
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `node` and returns its id.
    pub fn insert(&mut self, node: FakeNode) -> SceneNodeId {
        self.next_id += 1;
        let id = SceneNodeId(self.next_id);
        self.nodes.insert(id, node);
        id
    }

    /// Node by id.
    pub fn node(&self, id: SceneNodeId) -> Option<&FakeNode> {
        self.nodes.get(&id)
    }

    /// Mutable node by id (move kinematic nodes through this).
    pub fn node_mut(&mut self, id: SceneNodeId) -> Option<&mut FakeNode> {
        self.nodes.get_mut(&id)
    }

    /// World position of a node.
    pub fn position(&self, id: SceneNodeId) -> Option<Vec3> {
        self.nodes.get(&id).map(|n| n.pose.position)
    }

    /// First node carrying `name`.
    pub fn find(&self, name: &str) -> Option<SceneNodeId> {
        self.nodes
            .iter()
            .find(|(_, n)| n.name.as_deref() == Some(name))
            .map(|(id, _)| *id)
    }

    /// Returns `true` while `id` is in the scene.
    pub fn contains(&self, id: SceneNodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Returns `true` for an empty scene.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// How many times the sync core wrote a pose.
    pub fn pose_writes(&self) -> usize {
        self.pose_writes
    }
}

impl SceneGraph for FakeScene {
    type Geometry = FakeGeometry;

    fn world_pose(&self, node: SceneNodeId) -> Option<Pose> {
        self.nodes.get(&node).map(|n| n.pose)
    }

    fn set_pose(&mut self, node: SceneNodeId, pose: Pose) {
        if let Some(n) = self.nodes.get_mut(&node) {
            n.pose = pose;
            self.pose_writes += 1;
        }
    }

    fn name(&self, node: SceneNodeId) -> Option<String> {
        self.nodes.get(&node).and_then(|n| n.name.clone())
    }

    fn geometry(&self, node: SceneNodeId) -> Option<FakeGeometry> {
        self.nodes.get(&node).and_then(|n| n.geometry.clone())
    }

    fn shape_hint(&self, node: SceneNodeId) -> Option<ShapeKind> {
        self.nodes.get(&node).and_then(|n| n.shape_hint.clone())
    }

    fn add_node(&mut self, geometry: FakeGeometry, pose: Pose) -> SceneNodeId {
        self.insert(FakeNode {
            name: None,
            pose,
            geometry: Some(geometry),
            shape_hint: None,
        })
    }

    fn remove_node(&mut self, node: SceneNodeId) {
        self.nodes.remove(&node);
    }
}
