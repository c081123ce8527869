// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Builder wiring fakes into a ready [`Simulation`].

use std::collections::BTreeMap;

use echo_phys::{
    AttachError, BodyConfig, BodyId, PhysicsConfig, SceneNodeId, ShapeKind, Simulation, Vec3,
};

use crate::scene::{FakeNode, FakeScene};
use crate::subdivide::FakeSubdivider;
use crate::world::FakeWorld;

/// Simulation over the fakes.
pub type FakeSimulation = Simulation<FakeWorld, FakeScene, FakeSubdivider>;

/// Name given to the ground by [`SimulationBuilder::with_ground`].
pub const GROUND_NAME: &str = "ground";

/// Builder for simulations populated with a ground and boxes.
///
/// # Example
///
/// ```
/// use echo_phys::{BodyConfig, Vec3};
/// use echo_phys_dry_tests::SimulationBuilder;
///
/// let mut built = SimulationBuilder::new()
///     .with_ground()
///     .with_box("crate", Vec3::new(0.0, 3.0, 0.0), BodyConfig::default())
///     .build()
///     .unwrap();
/// let report = built.sim.frame(1000.0 / 60.0);
/// assert!(report.removed.is_empty());
/// ```
pub struct SimulationBuilder {
    config: PhysicsConfig,
    world: FakeWorld,
    subdivider: FakeSubdivider,
    scene: FakeScene,
    pending: Vec<(String, SceneNodeId, BodyConfig)>,
}

impl Default for SimulationBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulationBuilder {
    /// Default config, generated contacts, hint-honoring subdivider.
    pub fn new() -> Self {
        Self {
            config: PhysicsConfig::default(),
            world: FakeWorld::new(),
            subdivider: FakeSubdivider::new(),
            scene: FakeScene::new(),
            pending: Vec::new(),
        }
    }

    /// Replaces the physics configuration.
    pub fn with_config(mut self, config: PhysicsConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the engine fake.
    pub fn with_world(mut self, world: FakeWorld) -> Self {
        self.world = world;
        self
    }

    /// Replaces the subdivider fake.
    pub fn with_subdivider(mut self, subdivider: FakeSubdivider) -> Self {
        self.subdivider = subdivider;
        self
    }

    /// Adds a static 20×1×20 ground whose top face sits at `y = 0`.
    pub fn with_ground(self) -> Self {
        let size = Vec3::new(20.0, 1.0, 20.0);
        self.with_node(
            FakeNode::cuboid(GROUND_NAME, Vec3::new(0.0, -0.5, 0.0), size),
            BodyConfig::ground(ShapeKind::Box {
                width: size.x(),
                height: size.y(),
                depth: size.z(),
            }),
        )
    }

    /// Adds a named unit cube at `position`.
    pub fn with_box(self, name: &str, position: Vec3, body: BodyConfig) -> Self {
        self.with_node(
            FakeNode::cuboid(name, position, Vec3::new(1.0, 1.0, 1.0)),
            body,
        )
    }

    /// Adds an arbitrary node and the body config to attach to it.
    pub fn with_node(mut self, node: FakeNode, body: BodyConfig) -> Self {
        let label = node
            .name
            .clone()
            .unwrap_or_else(|| format!("node-{}", self.pending.len()));
        let id = self.scene.insert(node);
        self.pending.push((label, id, body));
        self
    }

    /// Installs the engine and attaches every queued body in insertion order.
    ///
    /// # Errors
    /// The first [`AttachError`] encountered.
    pub fn build(self) -> Result<BuiltSimulation, AttachError> {
        let mut sim =
            Simulation::with_world(self.world, self.scene, self.subdivider, self.config);
        let mut bodies = BTreeMap::new();
        for (label, node, body) in self.pending {
            let id = sim.add_existing(node, &body)?;
            bodies.insert(label, (id, node));
        }
        Ok(BuiltSimulation { sim, bodies })
    }
}

/// Output of [`SimulationBuilder::build`].
pub struct BuiltSimulation {
    /// The ready simulation.
    pub sim: FakeSimulation,
    bodies: BTreeMap<String, (BodyId, SceneNodeId)>,
}

impl BuiltSimulation {
    /// Body id of a node added under `name`.
    pub fn id(&self, name: &str) -> Option<BodyId> {
        self.bodies.get(name).map(|(id, _)| *id)
    }

    /// Scene node added under `name`.
    pub fn node(&self, name: &str) -> Option<SceneNodeId> {
        self.bodies.get(name).map(|(_, node)| *node)
    }
}
