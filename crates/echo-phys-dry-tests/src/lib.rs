// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Shared test doubles for the Echo physics sync core.
//!
//! # Modules
//!
//! - [`config`] - In-memory config store with fault injection
//! - [`scene`] - In-memory scene graph and vertex-list geometry
//! - [`world`] - Minimal rigid-body engine with generated and scripted contacts
//! - [`subdivide`] - Slab subdivider for fracture tests
//! - [`scenario`] - Builder for ground-and-boxes simulations
#![forbid(unsafe_code)]

pub mod config;
pub mod scenario;
pub mod scene;
pub mod subdivide;
pub mod world;

// Re-export commonly used items at crate root for convenience
pub use config::{Fault, InMemoryConfigStore};
pub use scenario::{BuiltSimulation, FakeSimulation, SimulationBuilder, GROUND_NAME};
pub use scene::{FakeGeometry, FakeNode, FakeScene};
pub use subdivide::{FakeSubdivider, SubdivideCall};
pub use world::{FakeBody, FakeWorld, CONTACT_SLOP};
