// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! Two-way transform reconciliation between motion states and scene nodes.

use crate::ident::BodyId;
use crate::ports::{PhysicsWorld, SceneGraph};
use crate::registry::BodyRegistry;

/// What happened to each body during one sync pass.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SyncOutcome {
    /// Bodies whose physics pose was written to the scene.
    pub pulled: Vec<BodyId>,
    /// Kinematic bodies whose scene pose was pushed into the engine.
    pub pushed: Vec<BodyId>,
    /// Bodies skipped because the engine had no motion state for them.
    pub skipped: Vec<BodyId>,
    /// Kinematic bodies whose previous push is now reported to update
    /// listeners.
    pub updated: Vec<BodyId>,
}

/// Syncs every id in `ids` (a snapshot of the registry).
///
/// * A body whose push completed on an earlier step is listed in
///   `updated` once.
/// * Kinematic bodies with a pending push: scene pose → motion state, flag
///   cleared.
/// * Everything else (static bodies included): motion state +
///   `transform_offset` → scene pose.
///
/// Bodies without a motion state, or whose scene node has no pose to push,
/// are skipped for this step and left untouched.
pub fn sync_transforms<W, S>(
    world: &mut W,
    scene: &mut S,
    registry: &mut BodyRegistry,
    ids: &[BodyId],
) -> SyncOutcome
where
    W: PhysicsWorld,
    S: SceneGraph,
{
    let mut out = SyncOutcome::default();
    for &id in ids {
        let Some(body) = registry.get_mut(id) else {
            continue;
        };
        let Some(physics_pose) = world.motion_state(body.handle()) else {
            out.skipped.push(id);
            continue;
        };
        if body.did_update {
            body.did_update = false;
            out.updated.push(id);
        }

        if body.is_kinematic() && body.needs_kinematic_push {
            let Some(scene_pose) = scene.world_pose(body.node()) else {
                out.skipped.push(id);
                continue;
            };
            world.set_motion_state(body.handle(), scene_pose);
            body.needs_kinematic_push = false;
            body.did_update = true;
            out.pushed.push(id);
        } else {
            scene.set_pose(body.node(), physics_pose.offset_by(body.transform_offset));
            out.pulled.push(id);
        }
    }
    out
}
