// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
use crate::{Quat, Vec3};

/// Rigid world transform exchanged between scene nodes and motion states.
///
/// Conventions:
/// - `position` in metres (world space).
/// - `rotation` as a unit quaternion.
#[derive(Debug, Copy, Clone, PartialEq, Default)]
pub struct Pose {
    /// World-space position.
    pub position: Vec3,
    /// World-space orientation.
    pub rotation: Quat,
}

impl Pose {
    /// Identity pose at the origin.
    pub const IDENTITY: Self = Self {
        position: Vec3::ZERO,
        rotation: Quat::identity(),
    };

    /// Creates a pose from components.
    pub const fn new(position: Vec3, rotation: Quat) -> Self {
        Self { position, rotation }
    }

    /// Pose at `position` with identity rotation.
    pub const fn from_position(position: Vec3) -> Self {
        Self::new(position, Quat::identity())
    }

    /// Returns this pose translated by `offset` (rotation unchanged).
    ///
    /// Used to shift a physics center-of-mass pose onto a visual pivot.
    pub fn offset_by(&self, offset: Vec3) -> Self {
        Self::new(self.position.add(&offset), self.rotation)
    }

    /// Maps a point from this pose's local frame into world space.
    pub fn transform_point(&self, local: Vec3) -> Vec3 {
        self.rotation.rotate(local).add(&self.position)
    }
}
