// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs, clippy::unwrap_used)]
mod common;

use common::{clear, handle, impact, manifold, record_all, script, scripted, weightless, FRAME_MS};
use echo_phys::{BodyConfig, CollisionKind, PhysicsConfig, Vec3};
use echo_phys_dry_tests::{FakeNode, FakeSubdivider, SimulationBuilder, GROUND_NAME};
use proptest::prelude::*;

fn breakable() -> BodyConfig {
    BodyConfig {
        breakable: true,
        ..BodyConfig::default()
    }
}

#[test]
fn two_boxes_hit_the_ground_and_each_fracture_once() {
    let log = FakeSubdivider::new();
    let mut built = scripted()
        .with_subdivider(log.clone())
        .with_ground()
        .with_box("boxA", Vec3::new(-2.0, 0.5, 0.0), breakable())
        .with_box("boxB", Vec3::new(2.0, 0.5, 0.0), breakable())
        .build()
        .unwrap();
    let ground = built.id(GROUND_NAME).unwrap();
    let (a, b) = (built.id("boxA").unwrap(), built.id("boxB").unwrap());
    let (node_a, node_b) = (built.node("boxA").unwrap(), built.node("boxB").unwrap());
    built.sim.on_body_collision(a, |_, _| {}).unwrap();
    built.sim.on_body_collision(b, |_, _| {}).unwrap();
    let seen = record_all(&mut built.sim);

    let hg = handle(&built.sim, ground);
    let (ha, hb) = (handle(&built.sim, a), handle(&built.sim, b));
    let hit_a = Vec3::new(-2.0, 0.0, 0.0);
    script(&mut built.sim, manifold(hg, ha, -0.02, 8.0, hit_a));
    script(&mut built.sim, impact(hb, hg, 8.0));

    let report = built.sim.frame(FRAME_MS);

    let starts: Vec<_> = report
        .events_of(CollisionKind::Start)
        .map(echo_phys::CollisionEvent::key)
        .collect();
    assert_eq!(
        starts,
        vec![
            echo_phys::PairKey::new(ground, a),
            echo_phys::PairKey::new(ground, b)
        ]
    );
    assert_eq!(report.fractured, vec![a, b]);
    assert_eq!(report.removed, vec![a, b]);
    assert_eq!(report.spawned.len(), 2 * 4);
    for id in &report.spawned {
        let piece = built.sim.body(*id).unwrap();
        assert_eq!(piece.fragment_depth, 1);
        assert!(!piece.breakable);
        assert!(piece.name.is_none());
    }
    assert!(built.sim.body(a).is_none());
    assert!(built.sim.body(b).is_none());
    assert!(!built.sim.scene().contains(node_a));
    assert!(!built.sim.scene().contains(node_b));
    let world = built.sim.world().unwrap();
    assert_eq!(world.removed_handles(), &[ha, hb]);

    let calls = log.calls();
    assert_eq!(calls.len(), 2);
    assert_eq!(calls[0].impact_point, hit_a);
    assert_eq!(calls[0].impact_normal, Vec3::UNIT_Y);
    assert_eq!(calls[0].piece_count_hint, 4);

    // Parents are gone, so the ground pairs end silently.
    clear(&mut built.sim);
    let after = built.sim.frame(FRAME_MS);
    assert!(after.events.is_empty());
    assert_eq!(seen.borrow().len(), 2);
}

#[test]
fn body_at_depth_cap_never_fractures() {
    let mut built = scripted()
        .with_ground()
        .with_box(
            "shard",
            Vec3::new(0.0, 0.5, 0.0),
            BodyConfig {
                fragment_depth: 2,
                ..breakable()
            },
        )
        .build()
        .unwrap();
    let ground = built.id(GROUND_NAME).unwrap();
    let shard = built.id("shard").unwrap();
    let (hg, hs) = (handle(&built.sim, ground), handle(&built.sim, shard));
    script(&mut built.sim, impact(hg, hs, 1.0e6));

    for _ in 0..3 {
        let report = built.sim.frame(FRAME_MS);
        assert!(report.fractured.is_empty());
    }
    assert!(built.sim.body(shard).is_some());
}

#[test]
fn two_qualifying_manifolds_fracture_once() {
    let log = FakeSubdivider::new();
    let mut built = scripted()
        .with_subdivider(log.clone())
        .with_ground()
        .with_box("glass", Vec3::new(0.0, 0.5, 0.0), breakable())
        .with_box("rock", Vec3::new(1.0, 0.5, 0.0), BodyConfig::default())
        .build()
        .unwrap();
    let ground = built.id(GROUND_NAME).unwrap();
    let glass = built.id("glass").unwrap();
    let rock = built.id("rock").unwrap();
    let hg = handle(&built.sim, ground);
    let hglass = handle(&built.sim, glass);
    let hrock = handle(&built.sim, rock);
    script(&mut built.sim, impact(hg, hglass, 10.0));
    script(&mut built.sim, impact(hglass, hrock, 10.0));

    let report = built.sim.frame(FRAME_MS);
    assert_eq!(report.fractured, vec![glass]);
    assert_eq!(report.removed, vec![glass]);
    assert_eq!(log.call_count(), 1);
    assert!(built.sim.body(rock).is_some());
}

#[test]
fn impulse_at_threshold_does_not_fracture() {
    let mut built = scripted()
        .with_ground()
        .with_box("pane", Vec3::new(0.0, 0.5, 0.0), breakable())
        .build()
        .unwrap();
    let ground = built.id(GROUND_NAME).unwrap();
    let pane = built.id("pane").unwrap();
    let (hg, hp) = (handle(&built.sim, ground), handle(&built.sim, pane));
    script(&mut built.sim, impact(hg, hp, 5.0));
    assert!(built.sim.frame(FRAME_MS).fractured.is_empty());

    // Hard hit but only touching, not penetrating.
    clear(&mut built.sim);
    script(&mut built.sim, manifold(hg, hp, 0.0, 50.0, Vec3::ZERO));
    assert!(built.sim.frame(FRAME_MS).fractured.is_empty());
    assert!(built.sim.body(pane).is_some());
}

#[test]
fn zero_fragments_still_remove_the_parent() {
    let mut built = scripted()
        .with_subdivider(FakeSubdivider::degenerate())
        .with_ground()
        .with_box("dust", Vec3::new(0.0, 0.5, 0.0), breakable())
        .build()
        .unwrap();
    let ground = built.id(GROUND_NAME).unwrap();
    let dust = built.id("dust").unwrap();
    let node = built.node("dust").unwrap();
    let (hg, hd) = (handle(&built.sim, ground), handle(&built.sim, dust));
    script(&mut built.sim, impact(hg, hd, 20.0));

    let report = built.sim.frame(FRAME_MS);
    assert_eq!(report.fractured, vec![dust]);
    assert!(report.spawned.is_empty());
    assert_eq!(report.removed, vec![dust]);
    assert!(!built.sim.scene().contains(node));
    assert_eq!(built.sim.registry().len(), 1);
}

#[test]
fn debris_inherits_velocity_and_becomes_breakable_after_cooldown() {
    let config = PhysicsConfig {
        fragment_cooldown_ms: 100,
        ..weightless()
    };
    let mut built = scripted()
        .with_config(config)
        .with_ground()
        .with_box("vase", Vec3::new(0.0, 0.5, 0.0), breakable())
        .build()
        .unwrap();
    let ground = built.id(GROUND_NAME).unwrap();
    let vase = built.id("vase").unwrap();
    let spin = Vec3::new(0.0, 2.0, 0.0);
    built
        .sim
        .set_linear_velocity(vase, Vec3::new(1.0, 0.0, 0.0))
        .unwrap();
    built.sim.set_angular_velocity(vase, spin).unwrap();
    let (hg, hv) = (handle(&built.sim, ground), handle(&built.sim, vase));
    script(&mut built.sim, impact(hg, hv, 9.0));

    let report = built.sim.frame(FRAME_MS);
    clear(&mut built.sim);
    let pieces = report.spawned;
    assert_eq!(pieces.len(), 4);
    assert_eq!(built.sim.pending_wakes(), 4);
    for id in &pieces {
        assert_eq!(
            built.sim.linear_velocity(*id).unwrap(),
            Vec3::new(1.0, 0.0, 0.0)
        );
        assert_eq!(built.sim.angular_velocity(*id).unwrap(), spin);
    }

    // Fractured at clock 16 ms; due at 116 ms.
    while built.sim.clock_ms() + FRAME_MS < 116.0 {
        built.sim.frame(FRAME_MS);
        assert!(pieces.iter().all(|id| !built.sim.body(*id).unwrap().breakable));
    }
    built.sim.frame(FRAME_MS);
    assert!(pieces.iter().all(|id| built.sim.body(*id).unwrap().breakable));
    assert_eq!(built.sim.pending_wakes(), 0);
}

#[test]
fn cooldown_expires_when_driving_step_directly() {
    let config = PhysicsConfig {
        fragment_cooldown_ms: 20,
        ..weightless()
    };
    let mut built = scripted()
        .with_config(config)
        .with_subdivider(FakeSubdivider::with_piece_count(2))
        .with_ground()
        .with_box("brick", Vec3::new(0.0, 0.5, 0.0), breakable())
        .build()
        .unwrap();
    let ground = built.id(GROUND_NAME).unwrap();
    let brick = built.id("brick").unwrap();
    let (hg, hb) = (handle(&built.sim, ground), handle(&built.sim, brick));
    script(&mut built.sim, impact(hg, hb, 50.0));

    // Fractured at 16 ms; due at 36 ms.
    let debris = built.sim.step(16.0).spawned;
    clear(&mut built.sim);
    assert_eq!(debris.len(), 2);
    built.sim.step(16.0);
    assert!(debris.iter().all(|id| !built.sim.body(*id).unwrap().breakable));
    assert_eq!(built.sim.pending_wakes(), 2);

    built.sim.step(16.0);
    assert!(debris.iter().all(|id| built.sim.body(*id).unwrap().breakable));
    assert_eq!(built.sim.pending_wakes(), 0);
}

#[test]
fn breakable_body_without_geometry_is_consumed_for_the_step() {
    let log = FakeSubdivider::new();
    let mut built = scripted()
        .with_subdivider(log.clone())
        .with_ground()
        .with_node(
            FakeNode::named("plank").at(Vec3::new(0.0, 0.5, 0.0)),
            breakable(),
        )
        .build()
        .unwrap();
    let ground = built.id(GROUND_NAME).unwrap();
    let plank = built.id("plank").unwrap();
    let (hg, hp) = (handle(&built.sim, ground), handle(&built.sim, plank));
    script(&mut built.sim, impact(hg, hp, 30.0));
    script(&mut built.sim, impact(hp, hg, 40.0));

    let report = built.sim.frame(FRAME_MS);
    assert!(report.fractured.is_empty());
    assert!(report.removed.is_empty());
    assert_eq!(log.call_count(), 0);
    let body = built.sim.body(plank).unwrap();
    assert!(body.collided_this_step);
    assert!(body.breakable);

    // The flag only lasts for one step.
    clear(&mut built.sim);
    built.sim.frame(FRAME_MS);
    assert!(!built.sim.body(plank).unwrap().collided_this_step);
}

#[test]
fn debris_fractures_again_down_to_the_cap() {
    let config = PhysicsConfig {
        fragment_cooldown_ms: 0,
        ..weightless()
    };
    let mut built = scripted()
        .with_config(config)
        .with_subdivider(FakeSubdivider::with_piece_count(2))
        .with_ground()
        .with_box("brick", Vec3::new(0.0, 0.5, 0.0), breakable())
        .build()
        .unwrap();
    let ground = built.id(GROUND_NAME).unwrap();
    let brick = built.id("brick").unwrap();
    let hg = handle(&built.sim, ground);
    let hit = impact(hg, handle(&built.sim, brick), 50.0);
    script(&mut built.sim, hit);
    let first = built.sim.frame(FRAME_MS).spawned;
    assert_eq!(first.len(), 2);

    clear(&mut built.sim);
    for id in &first {
        let hit = impact(hg, handle(&built.sim, *id), 50.0);
        script(&mut built.sim, hit);
    }
    let second = built.sim.frame(FRAME_MS).spawned;
    assert_eq!(second.len(), 4);
    assert!(second
        .iter()
        .all(|id| built.sim.body(*id).unwrap().fragment_depth == 2));

    clear(&mut built.sim);
    built.sim.frame(FRAME_MS);
    for id in &second {
        let hit = impact(hg, handle(&built.sim, *id), 50.0);
        script(&mut built.sim, hit);
    }
    let third = built.sim.frame(FRAME_MS);
    assert!(third.fractured.is_empty());
    assert_eq!(built.sim.registry().len(), 1 + 4);
}

#[test]
fn dropped_boxes_fracture_on_landing() {
    let mut built = SimulationBuilder::new()
        .with_ground()
        .with_box("boxA", Vec3::new(-2.0, 4.0, 0.0), breakable())
        .with_box("boxB", Vec3::new(2.0, 4.0, 0.0), breakable())
        .build()
        .unwrap();
    let ground = built.id(GROUND_NAME).unwrap();
    let (a, b) = (built.id("boxA").unwrap(), built.id("boxB").unwrap());
    built.sim.on_body_collision(ground, |_, _| {}).unwrap();

    let mut landing = None;
    for _ in 0..240 {
        let report = built.sim.frame(FRAME_MS);
        if !report.fractured.is_empty() {
            landing = Some(report);
            break;
        }
        assert!(report.events.is_empty());
    }
    let landing = landing.unwrap();
    assert_eq!(landing.events_of(CollisionKind::Start).count(), 2);
    assert_eq!(landing.fractured, vec![a, b]);
    assert!(landing
        .spawned
        .iter()
        .all(|id| built.sim.body(*id).unwrap().fragment_depth == 1));

    // Debris is anonymous: nothing more to report, and no `End` for the
    // vanished boxes.
    for _ in 0..30 {
        let report = built.sim.frame(FRAME_MS);
        assert!(report.events.is_empty());
        assert!(report.fractured.is_empty());
    }
}

proptest! {
    #[test]
    fn capped_depth_blocks_any_impulse(extra in 0_u32..3, impulse in 0.0_f32..1.0e6) {
        let config = weightless();
        let depth = config.max_fragment_depth + extra;
        let mut built = scripted()
            .with_ground()
            .with_box("b", Vec3::new(0.0, 0.5, 0.0), BodyConfig { fragment_depth: depth, ..breakable() })
            .build()
            .unwrap();
        let ground = built.id(GROUND_NAME).unwrap();
        let id = built.id("b").unwrap();
        let (hg, hb) = (handle(&built.sim, ground), handle(&built.sim, id));
        script(&mut built.sim, impact(hg, hb, impulse));
        let report = built.sim.frame(FRAME_MS);
        prop_assert!(report.fractured.is_empty());
        prop_assert!(report.spawned.is_empty());
    }
}
