// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![allow(dead_code, clippy::unwrap_used)]

use std::cell::RefCell;
use std::rc::Rc;

use echo_phys::{
    BodyHandle, BodyId, CollisionEvent, ContactManifold, ContactPoint, Gravity, PhysicsConfig,
    Vec3,
};
use echo_phys_dry_tests::{FakeSimulation, FakeWorld, SimulationBuilder};

/// One 60 Hz frame in milliseconds.
pub const FRAME_MS: f64 = 1000.0 / 60.0;

/// Config with gravity switched off, so scripted scenes stay put.
pub fn weightless() -> PhysicsConfig {
    PhysicsConfig {
        gravity: Gravity {
            x: 0.0,
            y: 0.0,
            z: 0.0,
        },
        ..PhysicsConfig::default()
    }
}

/// Builder over an engine that only reports scripted manifolds.
pub fn scripted() -> SimulationBuilder {
    SimulationBuilder::new()
        .with_world(FakeWorld::new().without_auto_contacts())
        .with_config(weightless())
}

/// Engine handle of a live body.
pub fn handle(sim: &FakeSimulation, id: BodyId) -> BodyHandle {
    sim.body(id).map(echo_phys::RigidBody::handle).unwrap()
}

/// Single-point manifold.
pub fn manifold(
    body0: BodyHandle,
    body1: BodyHandle,
    distance: f32,
    impulse: f32,
    at: Vec3,
) -> ContactManifold {
    ContactManifold {
        body0,
        body1,
        points: vec![ContactPoint {
            position_world_on_b: at,
            normal_world_on_b: Vec3::UNIT_Y,
            distance,
            applied_impulse: impulse,
        }],
    }
}

/// Resting contact: touching, no impulse.
pub fn touching(body0: BodyHandle, body1: BodyHandle) -> ContactManifold {
    manifold(body0, body1, 0.0, 0.0, Vec3::ZERO)
}

/// Penetrating contact carrying `impulse`.
pub fn impact(body0: BodyHandle, body1: BodyHandle, impulse: f32) -> ContactManifold {
    manifold(body0, body1, -0.01, impulse, Vec3::ZERO)
}

/// Scripts a manifold on the running engine.
pub fn script(sim: &mut FakeSimulation, m: ContactManifold) {
    sim.world_mut().unwrap().script_manifold(m);
}

/// Clears scripted manifolds on the running engine.
pub fn clear(sim: &mut FakeSimulation) {
    sim.world_mut().unwrap().clear_scripted();
}

/// Records every event seen by an `on_collision` listener.
pub fn record_all(sim: &mut FakeSimulation) -> Rc<RefCell<Vec<CollisionEvent>>> {
    let seen = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&seen);
    sim.on_collision(move |e| sink.borrow_mut().push(e.clone()));
    seen
}
