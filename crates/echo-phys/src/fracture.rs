// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Impact harvesting and the fracture decision.
//!
//! Samples are taken during the same manifold walk that drives collision
//! events; the decision runs after every event for the step was delivered.

use echo_phys_geom::Vec3;

use crate::body::RigidBody;
use crate::config::PhysicsConfig;
use crate::ident::BodyId;
use crate::ports::ContactPoint;

/// Strongest penetrating contact of one manifold.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ImpactSample {
    /// Largest applied impulse among penetrating points.
    pub max_impulse: f32,
    /// World position of that point (on body B).
    pub point: Vec3,
    /// World normal of that point (on body B).
    pub normal: Vec3,
}

impl ImpactSample {
    /// Picks the penetrating point (`distance < 0`) with the largest applied
    /// impulse. Ties keep the later point. `None` when nothing penetrates.
    pub fn harvest(points: &[ContactPoint]) -> Option<Self> {
        let mut best: Option<Self> = None;
        for p in points.iter().filter(|p| p.distance < 0.0) {
            let stronger = best.is_none_or(|b| p.applied_impulse >= b.max_impulse);
            if stronger {
                best = Some(Self {
                    max_impulse: p.applied_impulse,
                    point: p.position_world_on_b,
                    normal: p.normal_world_on_b,
                });
            }
        }
        best
    }
}

/// A manifold's impact attributed to both of its registered participants.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ImpactRecord {
    /// First participant.
    pub body0: BodyId,
    /// Second participant.
    pub body1: BodyId,
    /// Impact data shared by both.
    pub sample: ImpactSample,
}

/// Why a body did not fracture; `None` from [`fracture_veto`] means it should.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FractureVeto {
    /// Body is not breakable (or still cooling down).
    NotBreakable,
    /// Body already fractured this step.
    AlreadyFractured,
    /// Lineage reached the configured depth cap.
    DepthCap,
    /// Impulse did not exceed the threshold.
    TooWeak,
}

/// Decides whether `body` fractures from `sample`.
pub fn fracture_veto(
    body: &RigidBody,
    sample: &ImpactSample,
    config: &PhysicsConfig,
) -> Option<FractureVeto> {
    if !body.breakable {
        return Some(FractureVeto::NotBreakable);
    }
    if body.collided_this_step {
        return Some(FractureVeto::AlreadyFractured);
    }
    if body.fragment_depth >= config.max_fragment_depth {
        return Some(FractureVeto::DepthCap);
    }
    if sample.max_impulse <= config.fracture_impulse_threshold {
        return Some(FractureVeto::TooWeak);
    }
    None
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::body::BodyMeta;
    use crate::ident::{BodyHandle, SceneNodeId};

    fn point(distance: f32, impulse: f32, x: f32) -> ContactPoint {
        ContactPoint {
            position_world_on_b: Vec3::new(x, 0.0, 0.0),
            normal_world_on_b: Vec3::UNIT_Y,
            distance,
            applied_impulse: impulse,
        }
    }

    fn breakable(depth: u32) -> RigidBody {
        RigidBody::new(
            BodyId::from_raw(1),
            BodyHandle(1),
            SceneNodeId(1),
            BodyMeta {
                breakable: true,
                fragment_depth: depth,
                ..BodyMeta::default()
            },
        )
    }

    fn sample(max_impulse: f32) -> ImpactSample {
        ImpactSample {
            max_impulse,
            point: Vec3::ZERO,
            normal: Vec3::UNIT_Y,
        }
    }

    #[test]
    fn harvest_ignores_separated_points() {
        let s = ImpactSample::harvest(&[
            point(0.1, 50.0, 1.0),
            point(-0.01, 3.0, 2.0),
            point(-0.02, 7.0, 3.0),
            point(0.0, 90.0, 4.0),
        ])
        .unwrap();
        assert!((s.max_impulse - 7.0).abs() < f32::EPSILON);
        assert_eq!(s.point, Vec3::new(3.0, 0.0, 0.0));
        assert!(ImpactSample::harvest(&[point(0.0, 10.0, 0.0)]).is_none());
        assert!(ImpactSample::harvest(&[]).is_none());
    }

    #[test]
    fn threshold_is_exclusive() {
        let c = PhysicsConfig::default();
        assert_eq!(
            fracture_veto(&breakable(0), &sample(5.0), &c),
            Some(FractureVeto::TooWeak)
        );
        assert_eq!(fracture_veto(&breakable(0), &sample(5.01), &c), None);
    }

    #[test]
    fn depth_cap_and_step_flag_veto() {
        let c = PhysicsConfig::default();
        assert_eq!(
            fracture_veto(&breakable(2), &sample(100.0), &c),
            Some(FractureVeto::DepthCap)
        );
        let mut b = breakable(1);
        assert_eq!(fracture_veto(&b, &sample(100.0), &c), None);
        b.collided_this_step = true;
        assert_eq!(
            fracture_veto(&b, &sample(100.0), &c),
            Some(FractureVeto::AlreadyFractured)
        );
        b.breakable = false;
        assert_eq!(
            fracture_veto(&b, &sample(100.0), &c),
            Some(FractureVeto::NotBreakable)
        );
    }
}
