// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! A deliberately small rigid-body engine for tests.
//!
//! Dynamics:
//! - Fixed-step accumulator like the usual `stepSimulation` contract: time is
//!   banked, whole `fixed_time_step` sub-steps run, and sub-steps beyond
//!   `max_sub_steps` are dropped.
//! - Semi-implicit Euler under gravity for dynamic bodies with positive mass.
//! - Axis-aligned box contacts (rotation ignored), resolved along the axis of
//!   least overlap with a perfectly inelastic impulse once they penetrate.
//!
//! Scripted manifolds are reported after the generated ones and persist until
//! cleared.

use std::collections::BTreeMap;

use echo_phys::{
    BodyCreateInfo, BodyHandle, CollisionFlags, ContactManifold, ContactPoint, PhysicsWorld, Pose,
    ShapeHandle, ShapeKind, Vec3,
};

use crate::scene::FakeGeometry;

/// Contact tolerance: boxes closer than this count as touching.
pub const CONTACT_SLOP: f32 = 1e-4;

/// Engine-side state of one body.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeBody {
    /// Creation parameters.
    pub info: BodyCreateInfo,
    /// Axis-aligned half extents used for contacts.
    pub half_extents: Vec3,
    /// Motion-state transform.
    pub pose: Pose,
    /// Linear velocity.
    pub linear_velocity: Vec3,
    /// Angular velocity (stored, not integrated).
    pub angular_velocity: Vec3,
    /// Current collision flags.
    pub flags: CollisionFlags,
    /// Restitution as last set.
    pub restitution: f32,
    /// Friction as last set.
    pub friction: f32,
    /// `false` simulates a body whose motion state went away.
    pub has_motion_state: bool,
    /// Per-axis multiplier on gravity and impulses.
    pub linear_factor: Vec3,
    /// Per-axis angular multiplier (stored only).
    pub angular_factor: Vec3,
    /// CCD motion threshold as last set.
    pub ccd_motion_threshold: f32,
    /// CCD swept-sphere radius as last set.
    pub ccd_swept_sphere_radius: f32,
}

impl FakeBody {
    fn moves(&self) -> bool {
        self.flags == CollisionFlags::Dynamic && self.info.mass > 0.0 && self.has_motion_state
    }

    fn accelerate(&mut self, delta_v: Vec3) {
        let (dv, f) = (delta_v.to_array(), self.linear_factor.to_array());
        let scaled: [f32; 3] = std::array::from_fn(|k| dv[k] * f[k]);
        self.linear_velocity = self.linear_velocity.add(&Vec3::from(scaled));
    }

    fn inverse_mass(&self) -> f32 {
        if self.moves() {
            1.0 / self.info.mass
        } else {
            0.0
        }
    }
}

/// In-memory [`PhysicsWorld`].
#[derive(Debug)]
pub struct FakeWorld {
    gravity: Vec3,
    shapes: BTreeMap<ShapeHandle, Vec3>,
    bodies: BTreeMap<BodyHandle, FakeBody>,
    next_shape: u64,
    next_body: u64,
    local_time: f32,
    auto_contacts: bool,
    contacts: Vec<ContactManifold>,
    scripted: Vec<ContactManifold>,
    steps: usize,
    last_sub_steps: u32,
    removed: Vec<BodyHandle>,
}

impl Default for FakeWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl FakeWorld {
    /// Empty world, zero gravity until the simulation sets it, generated
    /// contacts enabled.
    pub fn new() -> Self {
        Self {
            gravity: Vec3::ZERO,
            shapes: BTreeMap::new(),
            bodies: BTreeMap::new(),
            next_shape: 0,
            next_body: 0,
            local_time: 0.0,
            auto_contacts: true,
            contacts: Vec::new(),
            scripted: Vec::new(),
            steps: 0,
            last_sub_steps: 0,
            removed: Vec::new(),
        }
    }

    /// Disables generated contacts; only scripted manifolds are reported.
    pub fn without_auto_contacts(mut self) -> Self {
        self.auto_contacts = false;
        self
    }

    /// Adds a manifold reported on every step until [`Self::clear_scripted`].
    pub fn script_manifold(&mut self, manifold: ContactManifold) {
        self.scripted.push(manifold);
    }

    /// Drops all scripted manifolds.
    pub fn clear_scripted(&mut self) {
        self.scripted.clear();
    }

    /// Makes `motion_state` return `None` for `handle` and freezes the body.
    pub fn drop_motion_state(&mut self, handle: BodyHandle) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.has_motion_state = false;
        }
    }

    /// Engine state of a body.
    pub fn body(&self, handle: BodyHandle) -> Option<&FakeBody> {
        self.bodies.get(&handle)
    }

    /// Mutable engine state of a body.
    pub fn body_mut(&mut self, handle: BodyHandle) -> Option<&mut FakeBody> {
        self.bodies.get_mut(&handle)
    }

    /// Number of shapes not yet released.
    pub fn shape_count(&self) -> usize {
        self.shapes.len()
    }

    /// Number of bodies in the world.
    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Current gravity.
    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    /// Handles removed so far, in removal order.
    pub fn removed_handles(&self) -> &[BodyHandle] {
        &self.removed
    }

    /// Number of `step_simulation` calls.
    pub fn step_count(&self) -> usize {
        self.steps
    }

    /// Sub-steps run by the last `step_simulation` call.
    pub fn last_sub_steps(&self) -> u32 {
        self.last_sub_steps
    }

    fn shape_half_extents(shape: &ShapeKind, geometry: Option<&FakeGeometry>) -> Option<Vec3> {
        let from_geometry = || {
            geometry
                .and_then(FakeGeometry::bounds)
                .map(|(lo, hi)| hi.sub(&lo).scale(0.5))
        };
        match shape {
            ShapeKind::Box { .. } => shape.box_half_extents(),
            ShapeKind::Sphere { radius } => Some(Vec3::new(*radius, *radius, *radius)),
            ShapeKind::Cylinder { radius_top, height } => {
                Some(Vec3::new(*radius_top, height * 0.5, *radius_top))
            }
            ShapeKind::Cone { radius, height } => Some(Vec3::new(*radius, height * 0.5, *radius)),
            ShapeKind::Capsule { radius, height } => {
                Some(Vec3::new(*radius, height * 0.5 + radius, *radius))
            }
            ShapeKind::Torus { radius, tube, .. } => {
                let r = radius + tube;
                Some(Vec3::new(r, *tube, r))
            }
            ShapeKind::Plane => from_geometry().map(|h| Vec3::new(h.x(), 0.0, h.z())),
            ShapeKind::Mesh(_) => from_geometry().filter(|h| h.length() > 0.0),
            ShapeKind::Compound(children) => {
                let mut hi = [0.0_f32; 3];
                for child in children {
                    let half = Self::shape_half_extents(&child.shape, geometry)?;
                    let reach = child.offset.to_array();
                    for (axis, h) in half.to_array().into_iter().enumerate() {
                        hi[axis] = hi[axis].max(reach[axis].abs() + h);
                    }
                }
                Some(Vec3::from(hi))
            }
        }
    }

    fn sub_step(&mut self, h: f32) {
        let gravity = self.gravity;
        for body in self.bodies.values_mut().filter(|b| b.moves()) {
            body.accelerate(gravity.scale(h));
            body.pose.position = body.pose.position.add(&body.linear_velocity.scale(h));
        }
    }

    /// Detects and resolves contacts; returns one manifold per touching pair.
    fn collide(&mut self) -> Vec<ContactManifold> {
        let handles: Vec<BodyHandle> = self.bodies.keys().copied().collect();
        let mut manifolds = Vec::new();
        for (i, &ha) in handles.iter().enumerate() {
            for &hb in &handles[i + 1..] {
                if let Some(manifold) = self.collide_pair(ha, hb) {
                    manifolds.push(manifold);
                }
            }
        }
        manifolds
    }

    fn collide_pair(&mut self, ha: BodyHandle, hb: BodyHandle) -> Option<ContactManifold> {
        let a = self.bodies.get(&ha)?.clone();
        let b = self.bodies.get(&hb)?.clone();
        if !(a.moves() || b.moves()) {
            return None;
        }

        let (pa, pb) = (a.pose.position.to_array(), b.pose.position.to_array());
        let (ea, eb) = (a.half_extents.to_array(), b.half_extents.to_array());
        let overlap: [f32; 3] =
            std::array::from_fn(|k| ea[k] + eb[k] - (pa[k] - pb[k]).abs());
        if overlap.iter().any(|&o| o < -CONTACT_SLOP) {
            return None;
        }
        let axis = (0..3)
            .min_by(|&l, &r| overlap[l].total_cmp(&overlap[r]))
            .unwrap_or(1);
        let sign = if pa[axis] >= pb[axis] { 1.0 } else { -1.0 };
        let depth = overlap[axis];

        let mut normal = [0.0_f32; 3];
        normal[axis] = sign;
        let point: [f32; 3] = std::array::from_fn(|k| {
            if k == axis {
                pb[k] + sign * eb[k]
            } else {
                let lo = (pa[k] - ea[k]).max(pb[k] - eb[k]);
                let hi = (pa[k] + ea[k]).min(pb[k] + eb[k]);
                (lo + hi) * 0.5
            }
        });

        let (ia, ib) = (a.inverse_mass(), b.inverse_mass());
        let ghost = a.flags == CollisionFlags::Ghost || b.flags == CollisionFlags::Ghost;
        let mut impulse = 0.0;
        if !ghost && ia + ib > 0.0 {
            let approach = (a.linear_velocity.to_array()[axis] - b.linear_velocity.to_array()[axis])
                * sign;
            if approach < 0.0 && depth > 0.0 {
                impulse = -approach / (ia + ib);
            }
            let push = depth.max(0.0) / (ia + ib);
            if let Some(body) = self.bodies.get_mut(&ha) {
                nudge(body, axis, sign * impulse * ia, sign * push * ia);
            }
            if let Some(body) = self.bodies.get_mut(&hb) {
                nudge(body, axis, -sign * impulse * ib, -sign * push * ib);
            }
        }

        Some(ContactManifold {
            body0: ha,
            body1: hb,
            points: vec![ContactPoint {
                position_world_on_b: Vec3::from(point),
                normal_world_on_b: Vec3::from(normal),
                distance: -depth,
                applied_impulse: impulse,
            }],
        })
    }
}

fn nudge(body: &mut FakeBody, axis: usize, delta_v: f32, delta_p: f32) {
    let mut v = body.linear_velocity.to_array();
    v[axis] += delta_v;
    body.linear_velocity = Vec3::from(v);
    let mut p = body.pose.position.to_array();
    p[axis] += delta_p;
    body.pose.position = Vec3::from(p);
}

/// Keeps, per pair, the manifold of the sub-step with the strongest impulse.
fn merge_strongest(
    into: &mut BTreeMap<(BodyHandle, BodyHandle), ContactManifold>,
    step: Vec<ContactManifold>,
) {
    let strength = |m: &ContactManifold| {
        m.points
            .iter()
            .map(|p| p.applied_impulse)
            .fold(0.0_f32, f32::max)
    };
    for m in step {
        let key = (m.body0, m.body1);
        let replace = into.get(&key).is_none_or(|old| strength(&m) >= strength(old));
        if replace {
            into.insert(key, m);
        }
    }
}

impl PhysicsWorld for FakeWorld {
    type Geometry = FakeGeometry;

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn step_simulation(&mut self, dt: f32, max_sub_steps: u32, fixed_time_step: f32) {
        self.steps += 1;
        self.local_time += dt;
        let mut sub_steps = 0;
        if self.local_time >= fixed_time_step {
            sub_steps = (self.local_time / fixed_time_step) as u32;
            self.local_time -= sub_steps as f32 * fixed_time_step;
        }
        let sub_steps = sub_steps.min(max_sub_steps);
        self.last_sub_steps = sub_steps;
        if sub_steps == 0 {
            return;
        }

        let mut merged = BTreeMap::new();
        for _ in 0..sub_steps {
            self.sub_step(fixed_time_step);
            if self.auto_contacts {
                let step = self.collide();
                merge_strongest(&mut merged, step);
            }
        }
        self.contacts = merged.into_values().collect();
    }

    fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    fn create_shape(
        &mut self,
        shape: &ShapeKind,
        geometry: Option<&FakeGeometry>,
    ) -> Option<ShapeHandle> {
        let half = Self::shape_half_extents(shape, geometry)?;
        self.next_shape += 1;
        let handle = ShapeHandle(self.next_shape);
        self.shapes.insert(handle, half);
        Some(handle)
    }

    fn remove_shape(&mut self, shape: ShapeHandle) {
        self.shapes.remove(&shape);
    }

    fn create_body(&mut self, info: &BodyCreateInfo) -> BodyHandle {
        self.next_body += 1;
        let handle = BodyHandle(self.next_body);
        let half_extents = self.shapes.get(&info.shape).copied().unwrap_or(Vec3::ZERO);
        self.bodies.insert(
            handle,
            FakeBody {
                info: *info,
                half_extents,
                pose: info.pose,
                linear_velocity: Vec3::ZERO,
                angular_velocity: Vec3::ZERO,
                flags: CollisionFlags::Dynamic,
                restitution: 0.0,
                friction: 0.5,
                has_motion_state: true,
                linear_factor: Vec3::new(1.0, 1.0, 1.0),
                angular_factor: Vec3::new(1.0, 1.0, 1.0),
                ccd_motion_threshold: 0.0,
                ccd_swept_sphere_radius: 0.0,
            },
        );
        handle
    }

    fn remove_body(&mut self, handle: BodyHandle) {
        if self.bodies.remove(&handle).is_some() {
            self.removed.push(handle);
            self.contacts
                .retain(|m| m.body0 != handle && m.body1 != handle);
        }
    }

    fn num_manifolds(&self) -> usize {
        self.contacts.len() + self.scripted.len()
    }

    fn manifold(&self, index: usize) -> Option<ContactManifold> {
        self.contacts
            .get(index)
            .or_else(|| self.scripted.get(index.checked_sub(self.contacts.len())?))
            .cloned()
    }

    fn motion_state(&self, handle: BodyHandle) -> Option<Pose> {
        self.bodies
            .get(&handle)
            .filter(|b| b.has_motion_state)
            .map(|b| b.pose)
    }

    fn set_motion_state(&mut self, handle: BodyHandle, pose: Pose) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.pose = pose;
        }
    }

    fn linear_velocity(&self, handle: BodyHandle) -> Vec3 {
        self.bodies
            .get(&handle)
            .map_or(Vec3::ZERO, |b| b.linear_velocity)
    }

    fn angular_velocity(&self, handle: BodyHandle) -> Vec3 {
        self.bodies
            .get(&handle)
            .map_or(Vec3::ZERO, |b| b.angular_velocity)
    }

    fn set_linear_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.linear_velocity = velocity;
        }
    }

    fn set_angular_velocity(&mut self, handle: BodyHandle, velocity: Vec3) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.angular_velocity = velocity;
        }
    }

    fn apply_central_impulse(&mut self, handle: BodyHandle, impulse: Vec3) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            if body.info.mass > 0.0 {
                let delta_v = impulse.scale(1.0 / body.info.mass);
                body.accelerate(delta_v);
            }
        }
    }

    fn set_restitution(&mut self, handle: BodyHandle, restitution: f32) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.restitution = restitution;
        }
    }

    fn set_friction(&mut self, handle: BodyHandle, friction: f32) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.friction = friction;
        }
    }

    fn set_collision_flags(&mut self, handle: BodyHandle, flags: CollisionFlags) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.flags = flags;
        }
    }

    fn set_linear_factor(&mut self, handle: BodyHandle, factor: Vec3) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.linear_factor = factor;
        }
    }

    fn set_angular_factor(&mut self, handle: BodyHandle, factor: Vec3) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.angular_factor = factor;
        }
    }

    fn set_ccd_motion_threshold(&mut self, handle: BodyHandle, threshold: f32) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.ccd_motion_threshold = threshold;
        }
    }

    fn set_ccd_swept_sphere_radius(&mut self, handle: BodyHandle, radius: f32) {
        if let Some(body) = self.bodies.get_mut(&handle) {
            body.ccd_swept_sphere_radius = radius;
        }
    }
}
