// SPDX-License-Identifier: Apache-2.0
// © James Ross Ω FLYING•ROBOTS <https://github.com/flyingrobots>
//! The per-frame stepper.
//!
//! [`Simulation::step`] runs integrate → transform sync (and update
//! notifications) → collision events → fracture → deferred removal →
//! due cool-down timers. Listeners are plain callbacks without access
//! to the simulation, so nothing can add or remove bodies while a step is
//! walking the registry or the manifolds.

use echo_phys_geom::Vec3;
use thiserror::Error;
use tracing::{debug, trace, warn};

use crate::attach::{attach_body, detach_body, AttachError, BodyConfig};
use crate::body::{CollisionFlags, RigidBody};
use crate::config::PhysicsConfig;
use crate::events::{
    BodyRef, CollisionBus, CollisionEvent, CollisionKind, CollisionTracker, PairKey,
};
use crate::fracture::{fracture_veto, ImpactRecord, ImpactSample};
use crate::ident::{BodyHandle, BodyId, SceneNodeId, SubscriptionId};
use crate::ports::{GeometrySubdivider, PhysicsWorld, SceneGraph};
use crate::registry::BodyRegistry;
use crate::removal::DeferredRemoval;
use crate::sync::{sync_transforms, SyncOutcome};
use crate::wake::{WakeAction, WakeQueue};

/// Errors from per-body controls.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControlError {
    /// The physics engine has not finished loading.
    #[error("physics engine is not ready")]
    NotReady,
    /// No live body with this id.
    #[error("unknown body: {0}")]
    UnknownBody(BodyId),
}

/// Everything one step did, in the order it happened.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct StepReport {
    /// Transform sync results.
    pub sync: SyncOutcome,
    /// Collision events delivered to listeners.
    pub events: Vec<CollisionEvent>,
    /// Bodies that fractured.
    pub fractured: Vec<BodyId>,
    /// Debris bodies created by fracture.
    pub spawned: Vec<BodyId>,
    /// Bodies removed by the end-of-step drain.
    pub removed: Vec<BodyId>,
    /// Manifolds skipped because a handle was not registered.
    pub unresolved_manifolds: usize,
}

impl StepReport {
    /// Events of `kind`, in emission order.
    pub fn events_of(&self, kind: CollisionKind) -> impl Iterator<Item = &CollisionEvent> + '_ {
        self.events.iter().filter(move |e| e.kind == kind)
    }
}

enum Phase<W> {
    Idle { warned: bool },
    Running(W),
}

/// State that lives next to the engine and is mutated by each step.
struct Core<S, D> {
    scene: S,
    subdivider: D,
    config: PhysicsConfig,
    registry: BodyRegistry,
    tracker: CollisionTracker,
    bus: CollisionBus,
    removals: DeferredRemoval,
    wakes: WakeQueue,
    clock_ms: f64,
}

/// Physics sync core bound to an engine, a scene graph and a subdivider.
///
/// Starts idle; [`Simulation::engine_ready`] hands over the engine once it has
/// loaded.
pub struct Simulation<W, S, D> {
    phase: Phase<W>,
    core: Core<S, D>,
}

#[allow(clippy::cast_possible_truncation)]
fn ms_to_seconds(delta_ms: f64) -> f32 {
    (delta_ms / 1000.0) as f32
}

impl<W, S, D> Simulation<W, S, D>
where
    S: SceneGraph,
    W: PhysicsWorld<Geometry = S::Geometry>,
    D: GeometrySubdivider<Geometry = S::Geometry>,
{
    /// Creates an idle simulation; steps are skipped until the engine is ready.
    pub fn new(scene: S, subdivider: D, config: PhysicsConfig) -> Self {
        Self {
            phase: Phase::Idle { warned: false },
            core: Core {
                scene,
                subdivider,
                config,
                registry: BodyRegistry::new(),
                tracker: CollisionTracker::new(),
                bus: CollisionBus::new(),
                removals: DeferredRemoval::new(),
                wakes: WakeQueue::new(),
                clock_ms: 0.0,
            },
        }
    }

    /// Creates a simulation whose engine is already loaded.
    pub fn with_world(world: W, scene: S, subdivider: D, config: PhysicsConfig) -> Self {
        let mut sim = Self::new(scene, subdivider, config);
        sim.engine_ready(world);
        sim
    }

    /// Installs the loaded engine and applies the configured gravity.
    pub fn engine_ready(&mut self, mut world: W) {
        world.set_gravity(self.core.config.gravity.into());
        debug!(gravity = ?self.core.config.gravity, "physics engine ready");
        self.phase = Phase::Running(world);
    }

    /// Returns `true` once the engine is installed.
    pub fn is_running(&self) -> bool {
        matches!(self.phase, Phase::Running(_))
    }

    /// The engine, if loaded.
    pub fn world(&self) -> Option<&W> {
        match &self.phase {
            Phase::Running(world) => Some(world),
            Phase::Idle { .. } => None,
        }
    }

    /// Mutable engine access, if loaded.
    pub fn world_mut(&mut self) -> Option<&mut W> {
        match &mut self.phase {
            Phase::Running(world) => Some(world),
            Phase::Idle { .. } => None,
        }
    }

    /// The scene graph.
    pub fn scene(&self) -> &S {
        &self.core.scene
    }

    /// Mutable scene access (move kinematic nodes, then call
    /// [`Self::mark_kinematic_moved`]).
    pub fn scene_mut(&mut self) -> &mut S {
        &mut self.core.scene
    }

    /// Live bodies.
    pub fn registry(&self) -> &BodyRegistry {
        &self.core.registry
    }

    /// Body with `id`, if live.
    pub fn body(&self, id: BodyId) -> Option<&RigidBody> {
        self.core.registry.get(id)
    }

    /// Active configuration.
    pub fn config(&self) -> &PhysicsConfig {
        &self.core.config
    }

    /// Simulation clock: sum of stepped deltas in milliseconds.
    pub fn clock_ms(&self) -> f64 {
        self.core.clock_ms
    }

    /// Number of cool-down timers still pending.
    pub fn pending_wakes(&self) -> usize {
        self.core.wakes.len()
    }

    /// Pairs in contact during the last step.
    pub fn active_pairs(&self) -> usize {
        self.core.tracker.active_len()
    }

    /// Attaches a rigid body to an existing scene node.
    ///
    /// # Errors
    /// [`AttachError::NotReady`] before the engine loads, plus anything
    /// body construction reports.
    pub fn add_existing(
        &mut self,
        node: SceneNodeId,
        config: &BodyConfig,
    ) -> Result<BodyId, AttachError> {
        let Phase::Running(world) = &mut self.phase else {
            warn!(?node, "cannot add a body before the physics engine is ready");
            return Err(AttachError::NotReady);
        };
        attach_body(world, &self.core.scene, &mut self.core.registry, node, config)
    }

    /// Removes a body from the engine and the registry right away. The scene
    /// node stays, bodyless. Returns `false` if the body was not live.
    pub fn destroy(&mut self, id: BodyId) -> bool {
        let Phase::Running(world) = &mut self.phase else {
            return false;
        };
        detach_body(world, &mut self.core.registry, id).is_some()
    }

    /// Subscribes to every collision event.
    pub fn on_collision<F>(&mut self, callback: F) -> SubscriptionId
    where
        F: FnMut(&CollisionEvent) + 'static,
    {
        self.core.bus.subscribe(callback)
    }

    /// Subscribes to collisions of `body` and enables collision checks on it.
    ///
    /// # Errors
    /// [`ControlError::UnknownBody`] if `body` is not live.
    pub fn on_body_collision<F>(
        &mut self,
        body: BodyId,
        callback: F,
    ) -> Result<SubscriptionId, ControlError>
    where
        F: FnMut(&BodyRef, CollisionKind) + 'static,
    {
        self.enable_checks(body)?;
        Ok(self.core.bus.subscribe_body(body, callback))
    }

    /// Subscribes to collisions between `a` and `b` and enables collision
    /// checks on both.
    ///
    /// # Errors
    /// [`ControlError::UnknownBody`] if either body is not live; nothing is
    /// changed in that case.
    pub fn add_collider<F>(
        &mut self,
        a: BodyId,
        b: BodyId,
        callback: F,
    ) -> Result<SubscriptionId, ControlError>
    where
        F: FnMut(CollisionKind) + 'static,
    {
        for id in [a, b] {
            if self.core.registry.get(id).is_none() {
                return Err(ControlError::UnknownBody(id));
            }
        }
        self.enable_checks(a)?;
        self.enable_checks(b)?;
        Ok(self.core.bus.subscribe_pair(a, b, callback))
    }

    /// Calls `callback` on every step that follows a completed kinematic push
    /// of `body`.
    ///
    /// # Errors
    /// [`ControlError::UnknownBody`] if `body` is not live.
    pub fn on_body_update<F>(
        &mut self,
        body: BodyId,
        callback: F,
    ) -> Result<SubscriptionId, ControlError>
    where
        F: FnMut() + 'static,
    {
        self.subscribe_update(body, false, callback)
    }

    /// Like [`Self::on_body_update`], but only for the next update.
    ///
    /// # Errors
    /// [`ControlError::UnknownBody`] if `body` is not live.
    pub fn once_body_update<F>(
        &mut self,
        body: BodyId,
        callback: F,
    ) -> Result<SubscriptionId, ControlError>
    where
        F: FnMut() + 'static,
    {
        self.subscribe_update(body, true, callback)
    }

    fn subscribe_update<F>(
        &mut self,
        body: BodyId,
        once: bool,
        callback: F,
    ) -> Result<SubscriptionId, ControlError>
    where
        F: FnMut() + 'static,
    {
        if self.core.registry.get(body).is_none() {
            return Err(ControlError::UnknownBody(body));
        }
        Ok(self.core.bus.subscribe_update(body, once, callback))
    }

    /// Drops a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, subscription: SubscriptionId) -> bool {
        self.core.bus.unsubscribe(subscription)
    }

    fn enable_checks(&mut self, id: BodyId) -> Result<(), ControlError> {
        let body = self
            .core
            .registry
            .get_mut(id)
            .ok_or(ControlError::UnknownBody(id))?;
        body.check_collisions = true;
        Ok(())
    }

    /// Flags a kinematic body whose node was moved; its scene pose is pushed
    /// into the engine on the next step.
    ///
    /// # Errors
    /// [`ControlError::UnknownBody`] if `id` is not live.
    pub fn mark_kinematic_moved(&mut self, id: BodyId) -> Result<(), ControlError> {
        let body = self
            .core
            .registry
            .get_mut(id)
            .ok_or(ControlError::UnknownBody(id))?;
        body.needs_kinematic_push = true;
        Ok(())
    }

    fn engine_and_handle(&mut self, id: BodyId) -> Result<(&mut W, BodyHandle), ControlError> {
        let Phase::Running(world) = &mut self.phase else {
            return Err(ControlError::NotReady);
        };
        let handle = self
            .core
            .registry
            .get(id)
            .map(RigidBody::handle)
            .ok_or(ControlError::UnknownBody(id))?;
        Ok((world, handle))
    }

    /// Sets world gravity.
    ///
    /// # Errors
    /// [`ControlError::NotReady`] before the engine loads.
    pub fn set_gravity(&mut self, gravity: Vec3) -> Result<(), ControlError> {
        let Phase::Running(world) = &mut self.phase else {
            return Err(ControlError::NotReady);
        };
        world.set_gravity(gravity);
        Ok(())
    }

    /// Linear velocity of `id`.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn linear_velocity(&mut self, id: BodyId) -> Result<Vec3, ControlError> {
        let (world, handle) = self.engine_and_handle(id)?;
        Ok(world.linear_velocity(handle))
    }

    /// Angular velocity of `id`.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn angular_velocity(&mut self, id: BodyId) -> Result<Vec3, ControlError> {
        let (world, handle) = self.engine_and_handle(id)?;
        Ok(world.angular_velocity(handle))
    }

    /// Sets the linear velocity of `id`.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn set_linear_velocity(&mut self, id: BodyId, velocity: Vec3) -> Result<(), ControlError> {
        let (world, handle) = self.engine_and_handle(id)?;
        world.set_linear_velocity(handle, velocity);
        Ok(())
    }

    /// Sets the angular velocity of `id`.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn set_angular_velocity(
        &mut self,
        id: BodyId,
        velocity: Vec3,
    ) -> Result<(), ControlError> {
        let (world, handle) = self.engine_and_handle(id)?;
        world.set_angular_velocity(handle, velocity);
        Ok(())
    }

    /// Applies an impulse through the center of mass of `id`.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn apply_central_impulse(&mut self, id: BodyId, impulse: Vec3) -> Result<(), ControlError> {
        let (world, handle) = self.engine_and_handle(id)?;
        world.apply_central_impulse(handle, impulse);
        Ok(())
    }

    /// Pushes `id` with `force`. The engine applies it as a central impulse,
    /// so the velocity change is immediate rather than spread over a step.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn apply_force(&mut self, id: BodyId, force: Vec3) -> Result<(), ControlError> {
        self.apply_central_impulse(id, force)
    }

    /// Scales linear motion of `id` per axis; `0` locks that axis.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn set_linear_factor(&mut self, id: BodyId, factor: Vec3) -> Result<(), ControlError> {
        let (world, handle) = self.engine_and_handle(id)?;
        world.set_linear_factor(handle, factor);
        Ok(())
    }

    /// Scales angular motion of `id` per axis; `0` locks that axis.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn set_angular_factor(&mut self, id: BodyId, factor: Vec3) -> Result<(), ControlError> {
        let (world, handle) = self.engine_and_handle(id)?;
        world.set_angular_factor(handle, factor);
        Ok(())
    }

    /// Sets the speed above which `id` uses continuous collision detection.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn set_ccd_motion_threshold(
        &mut self,
        id: BodyId,
        threshold: f32,
    ) -> Result<(), ControlError> {
        let (world, handle) = self.engine_and_handle(id)?;
        world.set_ccd_motion_threshold(handle, threshold);
        Ok(())
    }

    /// Sets the swept-sphere radius used for continuous collision detection.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn set_ccd_swept_sphere_radius(
        &mut self,
        id: BodyId,
        radius: f32,
    ) -> Result<(), ControlError> {
        let (world, handle) = self.engine_and_handle(id)?;
        world.set_ccd_swept_sphere_radius(handle, radius);
        Ok(())
    }

    /// Sets restitution of `id`.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn set_restitution(&mut self, id: BodyId, restitution: f32) -> Result<(), ControlError> {
        let (world, handle) = self.engine_and_handle(id)?;
        world.set_restitution(handle, restitution);
        Ok(())
    }

    /// Sets friction of `id`.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn set_friction(&mut self, id: BodyId, friction: f32) -> Result<(), ControlError> {
        let (world, handle) = self.engine_and_handle(id)?;
        world.set_friction(handle, friction);
        Ok(())
    }

    /// Changes the collision flags of `id` in the engine and the registry.
    ///
    /// # Errors
    /// Not ready or unknown body.
    pub fn set_collision_flags(
        &mut self,
        id: BodyId,
        flags: CollisionFlags,
    ) -> Result<(), ControlError> {
        let (world, handle) = self.engine_and_handle(id)?;
        world.set_collision_flags(handle, flags);
        if let Some(body) = self.core.registry.get_mut(id) {
            body.collision_flags = flags;
        }
        Ok(())
    }

    /// Advances the simulation by `delta_ms` milliseconds and fires every
    /// cool-down timer that is due on the simulation clock.
    ///
    /// While the engine is not ready this does nothing and warns once.
    pub fn step(&mut self, delta_ms: f64) -> StepReport {
        let world = match &mut self.phase {
            Phase::Running(world) => world,
            Phase::Idle { warned } => {
                if !*warned {
                    warn!("physics engine not ready; skipping simulation steps");
                    *warned = true;
                }
                return StepReport::default();
            }
        };
        self.core.step(world, delta_ms)
    }

    /// Frame driver; same as [`Self::step`].
    pub fn frame(&mut self, delta_ms: f64) -> StepReport {
        self.step(delta_ms)
    }
}

impl<S, D> Core<S, D>
where
    S: SceneGraph,
    D: GeometrySubdivider<Geometry = S::Geometry>,
{
    fn step<W>(&mut self, world: &mut W, delta_ms: f64) -> StepReport
    where
        W: PhysicsWorld<Geometry = S::Geometry>,
    {
        let delta_ms = if delta_ms.is_finite() && delta_ms >= 0.0 {
            delta_ms
        } else {
            warn!(delta_ms, "ignoring invalid frame delta");
            0.0
        };
        let mut report = StepReport::default();
        self.registry.reset_step_flags();

        let dt = ms_to_seconds(delta_ms);
        if dt > self.config.max_frame_seconds() {
            debug!(
                dt,
                max = self.config.max_frame_seconds(),
                "frame delta exceeds sub-step budget; engine will drop time"
            );
        }
        world.step_simulation(dt, self.config.max_sub_steps, self.config.fixed_time_step);
        self.clock_ms += delta_ms;

        let ids = self.registry.ids();
        report.sync = sync_transforms(world, &mut self.scene, &mut self.registry, &ids);
        for &id in &report.sync.updated {
            self.bus.emit_update(id);
        }

        let impacts = self.walk_manifolds(world, &mut report);
        self.emit_ended(&mut report);
        for record in impacts {
            for id in [record.body0, record.body1] {
                self.try_fracture(world, id, &record.sample, &mut report);
            }
        }
        self.drain_removals(world, &mut report);
        self.fire_due_wakes();

        debug!(
            pulled = report.sync.pulled.len(),
            pushed = report.sync.pushed.len(),
            skipped = report.sync.skipped.len(),
            unresolved = report.unresolved_manifolds,
            events = report.events.len(),
            fractured = report.fractured.len(),
            spawned = report.spawned.len(),
            removed = report.removed.len(),
            "physics step"
        );
        report
    }

    /// Emits start/colliding events and collects impact samples.
    fn walk_manifolds<W>(&mut self, world: &W, report: &mut StepReport) -> Vec<ImpactRecord>
    where
        W: PhysicsWorld,
    {
        let mut impacts = Vec::new();
        self.tracker.begin_step();
        for index in 0..world.num_manifolds() {
            let Some(manifold) = world.manifold(index) else {
                continue;
            };
            let (Some(b0), Some(b1)) = (
                self.registry.lookup(manifold.body0),
                self.registry.lookup(manifold.body1),
            ) else {
                report.unresolved_manifolds += 1;
                continue;
            };
            if manifold.points.is_empty() {
                continue;
            }

            let named = b0.name.is_some() && b1.name.is_some();
            if named && (b0.check_collisions || b1.check_collisions) {
                let key = PairKey::new(b0.id(), b1.id());
                if let Some(kind) = self.tracker.observe(key) {
                    let (first, second) = if b0.id() == key.first() {
                        (b0, b1)
                    } else {
                        (b1, b0)
                    };
                    let event = CollisionEvent {
                        a: body_ref(first),
                        b: body_ref(second),
                        kind,
                    };
                    self.bus.emit(&event);
                    report.events.push(event);
                }
            }

            if let Some(sample) = ImpactSample::harvest(&manifold.points) {
                impacts.push(ImpactRecord {
                    body0: b0.id(),
                    body1: b1.id(),
                    sample,
                });
            }
        }
        impacts
    }

    /// Emits `End` for pairs that stopped touching. Pairs whose participants
    /// are gone are dropped without an event.
    fn emit_ended(&mut self, report: &mut StepReport) {
        for key in self.tracker.finish_step() {
            let (Some(a), Some(b)) = (
                self.registry.get(key.first()),
                self.registry.get(key.second()),
            ) else {
                trace!(?key, "pair ended after a participant was removed");
                continue;
            };
            let event = CollisionEvent {
                a: body_ref(a),
                b: body_ref(b),
                kind: CollisionKind::End,
            };
            self.bus.emit(&event);
            report.events.push(event);
        }
    }

    fn try_fracture<W>(
        &mut self,
        world: &mut W,
        id: BodyId,
        sample: &ImpactSample,
        report: &mut StepReport,
    ) where
        W: PhysicsWorld<Geometry = S::Geometry>,
    {
        let Some(body) = self.registry.get(id) else {
            return;
        };
        if let Some(veto) = fracture_veto(body, sample, &self.config) {
            trace!(%id, ?veto, impulse = sample.max_impulse, "no fracture");
            return;
        }
        let (node, handle, depth) = (body.node(), body.handle(), body.fragment_depth);
        let (Some(geometry), Some(pose)) = (self.scene.geometry(node), self.scene.world_pose(node))
        else {
            warn!(%id, ?node, "breakable body has no geometry to subdivide");
            if let Some(body) = self.registry.get_mut(id) {
                body.collided_this_step = true;
            }
            return;
        };

        let linear = world.linear_velocity(handle);
        let angular = world.angular_velocity(handle);
        let fragments = self.subdivider.subdivide(
            &geometry,
            pose,
            sample.point,
            sample.normal,
            self.config.fragment_count_hint,
        );
        if fragments.is_empty() {
            warn!(%id, "subdivision produced no fragments; removing body without debris");
        }

        let due_ms = self.now_ms().saturating_add(self.config.fragment_cooldown_ms);
        let debris = BodyConfig::debris(depth);
        for fragment in fragments {
            let piece = self.scene.add_node(fragment.geometry, fragment.pose);
            match attach_body(world, &self.scene, &mut self.registry, piece, &debris) {
                Ok(child) => {
                    if let Some(child_handle) = self.registry.get(child).map(RigidBody::handle) {
                        world.set_linear_velocity(child_handle, linear);
                        world.set_angular_velocity(child_handle, angular);
                    }
                    self.wakes.schedule(due_ms, WakeAction::RestoreBreakable(child));
                    report.spawned.push(child);
                }
                Err(err) => {
                    warn!(%id, ?piece, %err, "dropping fragment without a body");
                    self.scene.remove_node(piece);
                }
            }
        }

        if let Some(body) = self.registry.get_mut(id) {
            body.collided_this_step = true;
        }
        self.removals.enqueue(id);
        report.fractured.push(id);
        debug!(%id, depth, impulse = sample.max_impulse, "body fractured");
    }

    fn drain_removals<W>(&mut self, world: &mut W, report: &mut StepReport)
    where
        W: PhysicsWorld,
    {
        for id in self.removals.drain() {
            if let Some(body) = detach_body(world, &mut self.registry, id) {
                self.scene.remove_node(body.node());
                report.removed.push(id);
            }
        }
    }

    fn fire_due_wakes(&mut self) {
        for action in self.wakes.pop_due(self.now_ms()) {
            match action {
                WakeAction::RestoreBreakable(id) => {
                    if let Some(body) = self.registry.get_mut(id) {
                        body.breakable = true;
                        trace!(%id, "debris breakable again");
                    }
                }
            }
        }
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn now_ms(&self) -> u64 {
        self.clock_ms as u64
    }
}

fn body_ref(body: &RigidBody) -> BodyRef {
    BodyRef {
        id: body.id(),
        name: body.name.clone(),
    }
}

impl<W, S, D> core::fmt::Debug for Simulation<W, S, D> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Simulation")
            .field("running", &matches!(self.phase, Phase::Running(_)))
            .field("bodies", &self.core.registry.len())
            .field("clock_ms", &self.core.clock_ms)
            .field("bus", &self.core.bus)
            .finish_non_exhaustive()
    }
}
