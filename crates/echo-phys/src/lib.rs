// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Physics synchronization core for Echo scenes.
#![forbid(unsafe_code)]
//!
//! Keeps a scene graph and an external rigid-body engine in lockstep, one
//! [`Simulation::step`] per frame, and layers three behaviors on top of raw
//! stepping: collision pair lifecycle events, impulse-driven fracture of
//! breakable bodies, and transform reconciliation (kinematic push plus a
//! constant positional offset).
//!
//! # Modules
//!
//! - [`registry`] - Live bodies keyed by [`BodyId`], engine handle and node
//! - [`sync`] - Motion state ↔ scene pose reconciliation
//! - [`events`] - Pair tracking (`Start` / `Colliding` / `End`) and listeners
//! - [`fracture`] - Impact harvesting and the fracture decision
//! - [`sim`] - The stepper that runs all of the above in order
//! - [`ports`] - Traits implemented by engine, scene and subdivision adapters
//! - [`config`] - [`PhysicsConfig`] and its storage service

pub mod attach;
pub mod body;
pub mod config;
pub mod events;
pub mod fracture;
pub mod ident;
pub mod ports;
pub mod registry;
pub mod removal;
pub mod shape;
pub mod sim;
pub mod sync;
pub mod wake;

pub use attach::{AttachError, BodyConfig};
pub use body::{BodyMeta, CollisionFlags, RigidBody};
pub use config::{
    ConfigError, ConfigService, ConfigStore, Gravity, PhysicsConfig, PHYSICS_CONFIG_KEY,
};
pub use echo_phys_geom::{Pose, Quat, Vec3};
pub use events::{BodyRef, CollisionEvent, CollisionKind, PairKey};
pub use ident::{BodyHandle, BodyId, SceneNodeId, ShapeHandle, SubscriptionId};
pub use ports::{
    BodyCreateInfo, ContactManifold, ContactPoint, Fragment, GeometrySubdivider, PhysicsWorld,
    SceneGraph,
};
pub use registry::{BodyRegistry, RegistryError};
pub use shape::{CompoundChild, MeshMode, ShapeKind};
pub use sim::{ControlError, Simulation, StepReport};
pub use sync::SyncOutcome;
