// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>

#![allow(missing_docs)]
use core::f32::consts::FRAC_PI_2;

use echo_phys_geom::{Pose, Quat, Vec3};
use proptest::prelude::*;

#[test]
fn offset_only_moves_position() {
    let rot = Quat::from_axis_angle(Vec3::UNIT_Y, FRAC_PI_2);
    let pose = Pose::new(Vec3::new(1.0, 2.0, 3.0), rot);
    let shifted = pose.offset_by(Vec3::new(0.0, 0.5, 0.0));
    assert_eq!(shifted.position.to_array(), [1.0, 2.5, 3.0]);
    assert_eq!(shifted.rotation, rot);
}

#[test]
fn transform_point_applies_rotation_then_translation() {
    let pose = Pose::new(
        Vec3::new(10.0, 0.0, 0.0),
        Quat::from_axis_angle(Vec3::UNIT_Y, FRAC_PI_2),
    );
    let p = pose.transform_point(Vec3::new(1.0, 0.0, 0.0));
    assert!((p.x() - 10.0).abs() < 1e-5);
    assert!((p.z() + 1.0).abs() < 1e-5);
}

proptest! {
    #[test]
    fn offset_round_trips(
        pos in prop::array::uniform3(-1.0e3f32..1.0e3),
        off in prop::array::uniform3(-10.0f32..10.0),
    ) {
        let pose = Pose::from_position(Vec3::from(pos));
        let offset = Vec3::from(off);
        let back = pose.offset_by(offset).offset_by(offset.scale(-1.0));
        for (a, b) in back.position.to_array().iter().zip(pos.iter()) {
            prop_assert!((a - b).abs() < 1e-3);
        }
    }

    #[test]
    fn rotation_preserves_length(
        axis in prop::array::uniform3(-1.0f32..1.0),
        angle in -6.0f32..6.0,
        v in prop::array::uniform3(-100.0f32..100.0),
    ) {
        let q = Quat::from_axis_angle(Vec3::from(axis), angle);
        let v = Vec3::from(v);
        let r = q.rotate(v);
        prop_assert!((r.length() - v.length()).abs() < 1e-2);
    }
}
