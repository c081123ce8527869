// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
#![forbid(unsafe_code)]
#![doc = r"Math primitives for Echo physics synchronization.

This crate provides:
- `Vec3` for positions, offsets, velocities and contact normals.
- `Quat` for orientations exchanged with the physics engine.
- `Pose`, the rigid transform (translation + rotation) carried by motion states
  and scene nodes.

Design notes:
- Float32 throughout, matching the precision of the engine boundary.
- No scale: physics poses are rigid, scale stays a scene-graph concern.
"]

mod pose;
mod quat;
mod vec3;

pub use pose::Pose;
pub use quat::Quat;
pub use vec3::Vec3;

/// Degeneracy threshold used when normalising vectors and quaternions.
pub const EPSILON: f32 = 1e-6;
