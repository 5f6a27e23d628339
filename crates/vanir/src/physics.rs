//! # Physics — Integration, Naive Collision, Placeholder Raycast
//!
//! The [`PhysicsWorld`] owns rigid-body records keyed by entity id; it does
//! not own entities. Bodies live in a dense vector (insertion order, so a
//! fixed op sequence replays bit-for-bit) with an id→index map for O(1)
//! lookup. [`step`](PhysicsWorld::step) is pure with respect to wall-clock
//! time: the caller hands in the delta, nothing inside reads a clock.
//!
//! Behavioral notes, all intentional:
//! - Gravity integrates the **y axis only**.
//! - Collision detection is an O(n²) pairwise scan treating every shape as
//!   a sphere of its [`Shape::extent`]; each overlapping pair is reported
//!   exactly once.
//! - [`raycast`](PhysicsWorld::raycast) is a distance-to-center placeholder,
//!   not a real ray-shape intersection. It ignores ray direction entirely;
//!   callers relying on its results get the original system's answers, not
//!   geometrically correct ones.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::component::ComponentKind;
use crate::entity::EntityId;
use crate::math::Vec3;
use crate::store::SceneStore;

/// Uniform velocity damping applied after each integration pass.
const VELOCITY_DAMPING: f32 = 0.99;

// ── Body records ─────────────────────────────────────────────────────────

/// Collision shape. Only the scalar [`extent`](Shape::extent) participates
/// in detection; the variants exist so snapshots and inspectors keep the
/// authored shape.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Shape {
    Sphere { radius: f32 },
    Cuboid { size: Vec3 },
    Capsule { radius: f32, height: f32 },
}

impl Shape {
    /// Characteristic diameter used by the pairwise sphere test: two bodies
    /// overlap when their center distance drops below the mean of their
    /// extents.
    pub fn extent(&self) -> f32 {
        match *self {
            Shape::Sphere { radius } => radius * 2.0,
            Shape::Cuboid { size } => size.max_element(),
            Shape::Capsule { radius, height } => height + radius * 2.0,
        }
    }
}

impl Default for Shape {
    fn default() -> Self {
        Shape::Sphere { radius: 0.5 }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PhysicsMaterial {
    pub friction: f32,
    pub restitution: f32,
    pub density: f32,
}

impl Default for PhysicsMaterial {
    fn default() -> Self {
        Self {
            friction: 0.5,
            restitution: 0.0,
            density: 1.0,
        }
    }
}

/// A rigid body, referenced by entity id only. Owned exclusively by the
/// [`PhysicsWorld`]; destroying the entity does not cascade here — the
/// world prunes orphaned bodies itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RigidBody {
    pub entity: EntityId,
    pub position: Vec3,
    /// Euler radians, integrated from `angular_velocity`.
    pub rotation: Vec3,
    pub velocity: Vec3,
    pub angular_velocity: Vec3,
    /// Must be positive for dynamic bodies.
    pub mass: f32,
    pub is_static: bool,
    pub shape: Shape,
    pub material: PhysicsMaterial,
    pub collision_group: u32,
    pub collision_mask: u32,
    /// Queued `(force, application_point)` pairs, consumed once per step.
    #[serde(skip)]
    forces: Vec<(Vec3, Vec3)>,
}

impl RigidBody {
    /// A dynamic unit-mass body at the origin.
    pub fn dynamic(entity: EntityId) -> Self {
        Self {
            entity,
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            velocity: Vec3::ZERO,
            angular_velocity: Vec3::ZERO,
            mass: 1.0,
            is_static: false,
            shape: Shape::default(),
            material: PhysicsMaterial::default(),
            collision_group: 1,
            collision_mask: u32::MAX,
            forces: Vec::new(),
        }
    }

    /// A static body that never integrates.
    pub fn fixed(entity: EntityId) -> Self {
        Self {
            is_static: true,
            ..Self::dynamic(entity)
        }
    }

    pub fn with_position(mut self, position: Vec3) -> Self {
        self.position = position;
        self
    }

    pub fn with_velocity(mut self, velocity: Vec3) -> Self {
        self.velocity = velocity;
        self
    }

    pub fn with_mass(mut self, mass: f32) -> Self {
        self.mass = mass;
        self
    }

    pub fn with_shape(mut self, shape: Shape) -> Self {
        self.shape = shape;
        self
    }

    pub fn with_material(mut self, material: PhysicsMaterial) -> Self {
        self.material = material;
        self
    }

    pub fn with_restitution(mut self, restitution: f32) -> Self {
        self.material.restitution = restitution;
        self
    }

    pub fn with_collision_groups(mut self, group: u32, mask: u32) -> Self {
        self.collision_group = group;
        self.collision_mask = mask;
        self
    }
}

/// One overlapping pair from the last step, reported once per pair.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Collision {
    pub a: EntityId,
    pub b: EntityId,
    pub distance: f32,
    /// Unit vector from `a` toward `b` (`+Y` for coincident centers).
    pub normal: Vec3,
    pub penetration: f32,
}

/// One body from a [`raycast`](PhysicsWorld::raycast), nearest first.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RaycastHit {
    pub entity: EntityId,
    pub distance: f32,
    pub point: Vec3,
}

type CollisionFn = Box<dyn FnMut(&Collision)>;

// ── The world ────────────────────────────────────────────────────────────

/// Per-frame rigid-body simulation. See the module docs.
pub struct PhysicsWorld {
    gravity: Vec3,
    /// Target length of one integration pass, in seconds.
    time_step: f32,
    max_sub_steps: u32,
    enabled: bool,
    paused: bool,
    bodies: Vec<RigidBody>,
    index: HashMap<EntityId, usize>,
    contacts: Vec<Collision>,
    callbacks: HashMap<EntityId, Vec<CollisionFn>>,
}

impl PhysicsWorld {
    /// A world with earth gravity, 60 Hz time step, and at most 4 sub-steps
    /// per frame.
    pub fn new() -> Self {
        Self {
            gravity: Vec3::new(0.0, -9.81, 0.0),
            time_step: 1.0 / 60.0,
            max_sub_steps: 4,
            enabled: true,
            paused: false,
            bodies: Vec::new(),
            index: HashMap::new(),
            contacts: Vec::new(),
            callbacks: HashMap::new(),
        }
    }

    pub fn with_gravity(mut self, gravity: Vec3) -> Self {
        self.gravity = gravity;
        self
    }

    // ── Configuration ────────────────────────────────────────────────

    pub fn gravity(&self) -> Vec3 {
        self.gravity
    }

    pub fn set_gravity(&mut self, gravity: Vec3) {
        self.gravity = gravity;
    }

    pub fn time_step(&self) -> f32 {
        self.time_step
    }

    pub fn set_time_step(&mut self, time_step: f32) {
        self.time_step = time_step;
    }

    pub fn max_sub_steps(&self) -> u32 {
        self.max_sub_steps
    }

    pub fn set_max_sub_steps(&mut self, max_sub_steps: u32) {
        self.max_sub_steps = max_sub_steps.max(1);
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        if self.enabled != enabled {
            log::debug!("physics {}", if enabled { "enabled" } else { "disabled" });
        }
        self.enabled = enabled;
    }

    pub fn is_paused(&self) -> bool {
        self.paused
    }

    pub fn set_paused(&mut self, paused: bool) {
        self.paused = paused;
    }

    // ── Bodies ───────────────────────────────────────────────────────

    /// Register a body, replacing any existing body for the same entity.
    pub fn add_body(&mut self, body: RigidBody) {
        match self.index.get(&body.entity) {
            Some(&idx) => self.bodies[idx] = body,
            None => {
                self.index.insert(body.entity, self.bodies.len());
                self.bodies.push(body);
            }
        }
    }

    pub fn remove_body(&mut self, entity: EntityId) -> Option<RigidBody> {
        let idx = self.index.remove(&entity)?;
        let body = self.bodies.swap_remove(idx);
        if idx < self.bodies.len() {
            self.index.insert(self.bodies[idx].entity, idx);
        }
        self.callbacks.remove(&entity);
        Some(body)
    }

    pub fn body(&self, entity: EntityId) -> Option<&RigidBody> {
        self.index.get(&entity).map(|&idx| &self.bodies[idx])
    }

    pub fn body_mut(&mut self, entity: EntityId) -> Option<&mut RigidBody> {
        self.index.get(&entity).map(|&idx| &mut self.bodies[idx])
    }

    pub fn bodies(&self) -> impl Iterator<Item = &RigidBody> {
        self.bodies.iter()
    }

    pub fn body_count(&self) -> usize {
        self.bodies.len()
    }

    /// Drop bodies whose entity no longer exists in the store.
    pub fn prune(&mut self, store: &SceneStore) {
        let dead: Vec<EntityId> = self
            .bodies
            .iter()
            .map(|b| b.entity)
            .filter(|&e| !store.contains(e))
            .collect();
        for entity in dead {
            self.remove_body(entity);
            log::debug!("pruned rigid body for destroyed entity {entity}");
        }
    }

    // ── Forces ───────────────────────────────────────────────────────

    /// Queue a force at an application point; consumed by the next step.
    /// Unknown entities are a no-op.
    pub fn apply_force(&mut self, entity: EntityId, force: Vec3, point: Vec3) -> bool {
        match self.body_mut(entity) {
            Some(body) => {
                body.forces.push((force, point));
                true
            }
            None => false,
        }
    }

    /// Change velocity immediately, bypassing the force queue. No-op for
    /// unknown or static bodies.
    pub fn apply_impulse(&mut self, entity: EntityId, impulse: Vec3) -> bool {
        match self.body_mut(entity) {
            Some(body) if !body.is_static => {
                body.velocity += impulse / body.mass;
                true
            }
            _ => false,
        }
    }

    // ── Stepping ─────────────────────────────────────────────────────

    /// Advance the simulation by `delta` seconds. Silently skips when
    /// disabled or paused. The frame is split into
    /// `ceil(delta / time_step)` equal passes, capped at `max_sub_steps`.
    pub fn step(&mut self, delta: f32) {
        if !self.enabled || self.paused || delta <= 0.0 {
            return;
        }

        self.consume_force_queues();

        let sub_steps = ((delta / self.time_step).ceil() as u32).clamp(1, self.max_sub_steps);
        let dt = delta / sub_steps as f32;
        for _ in 0..sub_steps {
            self.integrate(dt);
        }

        self.detect_collisions();
    }

    /// The queue is drained once per frame, not per sub-step, at the fixed
    /// time step.
    fn consume_force_queues(&mut self) {
        let dt = self.time_step;
        for body in &mut self.bodies {
            if body.forces.is_empty() {
                continue;
            }
            let queued = std::mem::take(&mut body.forces);
            if body.is_static {
                continue;
            }
            for (force, _point) in queued {
                body.velocity += force / body.mass * dt;
            }
        }
    }

    fn integrate(&mut self, dt: f32) {
        for body in &mut self.bodies {
            if body.is_static {
                continue;
            }
            body.velocity.y += self.gravity.y * dt;
            body.position += body.velocity * dt;
            body.rotation += body.angular_velocity * dt;

            // Ground plane at y = 0: reflect downward crossings.
            if body.position.y < 0.0 && body.velocity.y < 0.0 {
                body.position.y = 0.0;
                body.velocity.y = -body.velocity.y * body.material.restitution;
            }

            body.velocity *= VELOCITY_DAMPING;
        }
    }

    fn detect_collisions(&mut self) {
        self.contacts.clear();
        for i in 0..self.bodies.len() {
            for j in (i + 1)..self.bodies.len() {
                let a = &self.bodies[i];
                let b = &self.bodies[j];
                if a.collision_group & b.collision_mask == 0
                    || b.collision_group & a.collision_mask == 0
                {
                    continue;
                }
                let combined = (a.shape.extent() + b.shape.extent()) / 2.0;
                let offset = b.position - a.position;
                let distance = offset.length();
                if distance < combined {
                    let normal = if distance > 0.0 { offset / distance } else { Vec3::Y };
                    self.contacts.push(Collision {
                        a: a.entity,
                        b: b.entity,
                        distance,
                        normal,
                        penetration: combined - distance,
                    });
                }
            }
        }

        if self.callbacks.is_empty() {
            return;
        }
        let contacts = self.contacts.clone();
        for contact in &contacts {
            for entity in [contact.a, contact.b] {
                if let Some(callbacks) = self.callbacks.get_mut(&entity) {
                    for callback in callbacks.iter_mut() {
                        callback(contact);
                    }
                }
            }
        }
    }

    /// The overlapping pairs found by the last step.
    pub fn collisions(&self) -> &[Collision] {
        &self.contacts
    }

    /// Invoke `callback` whenever `entity` participates in a collision.
    pub fn on_collision(&mut self, entity: EntityId, callback: impl FnMut(&Collision) + 'static) {
        self.callbacks
            .entry(entity)
            .or_default()
            .push(Box::new(callback));
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Bodies whose center lies within the segment length of `from`,
    /// nearest first. Placeholder semantics: ray direction and shape
    /// geometry are ignored.
    pub fn raycast(&self, from: Vec3, to: Vec3) -> Vec<RaycastHit> {
        let reach = (to - from).length();
        let mut hits: Vec<RaycastHit> = self
            .bodies
            .iter()
            .filter_map(|body| {
                let distance = (body.position - from).length();
                (distance <= reach).then_some(RaycastHit {
                    entity: body.entity,
                    distance,
                    point: body.position,
                })
            })
            .collect();
        hits.sort_by(|a, b| a.distance.total_cmp(&b.distance));
        hits
    }

    /// Write body poses back into `Transform` components. Data-only
    /// mutation — query membership is untouched. Bodies whose entity has no
    /// `Transform` are skipped.
    pub fn sync_transforms(&self, store: &mut SceneStore) {
        for body in &self.bodies {
            store
                .update_component(body.entity, ComponentKind::Transform, |data| {
                    if let Some(transform) = data.as_transform_mut() {
                        transform.position = body.position;
                        transform.rotation = body.rotation;
                    }
                })
                .ok();
        }
    }
}

impl Default for PhysicsWorld {
    fn default() -> Self {
        Self::new()
    }
}
