//! # Simulation — Wiring the Store, Physics, and Loop Together
//!
//! [`Simulation`] owns the three cooperating pieces and drives one frame
//! per [`tick`](Simulation::tick): the [`TimeLoop`] advances the clock and
//! fires timers, then runs systems in priority order — including the
//! built-in physics system registered at [`PHYSICS_PRIORITY`], which prunes
//! orphaned bodies, steps the world by the frame's delta, and writes body
//! poses back into `Transform` components.
//!
//! The host supplies the tick cadence (a render-loop callback or any
//! repeating timer) and the timestamps; nothing here spawns a thread or
//! reads a clock.
//!
//! # Example
//!
//! ```
//! use vanir::prelude::*;
//!
//! let mut sim = Simulation::new();
//! let ball = sim.store.create_entity("ball");
//! sim.store.add_component(ball, Transform::default()).unwrap();
//! sim.physics.add_body(
//!     RigidBody::dynamic(ball).with_position(Vec3::new(0.0, 10.0, 0.0)),
//! );
//!
//! sim.time.start(0.0);
//! for frame in 1..=60 {
//!     sim.tick(frame as f64 * 1000.0 / 60.0);
//! }
//! assert!(sim.physics.body(ball).unwrap().position.y < 10.0);
//! ```

use crate::physics::PhysicsWorld;
use crate::store::SceneStore;
use crate::time::TimeLoop;

/// Priority of the built-in physics system. Register user systems below
/// this to run before physics, above it to observe the stepped state.
pub const PHYSICS_PRIORITY: i32 = 0;

/// The assembled simulation core. Fields are public — the store, physics
/// world, and loop are the API; this type only owns and connects them.
pub struct Simulation {
    pub store: SceneStore,
    pub physics: PhysicsWorld,
    pub time: TimeLoop,
}

impl Simulation {
    pub fn new() -> Self {
        let mut time = TimeLoop::new();
        time.add_system(PHYSICS_PRIORITY, |store, physics, frame| {
            physics.prune(store);
            physics.step(frame.delta_secs());
            physics.sync_transforms(store);
        });
        Self {
            store: SceneStore::new(),
            physics: PhysicsWorld::new(),
            time,
        }
    }

    /// Run one frame at host timestamp `now_ms`.
    pub fn tick(&mut self, now_ms: f64) {
        self.time
            .tick(&mut self.store, &mut self.physics, now_ms);
    }
}

impl Default for Simulation {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{ComponentKind, Transform};
    use crate::math::Vec3;
    use crate::physics::RigidBody;

    #[test]
    fn physics_advances_and_syncs_transforms() {
        let mut sim = Simulation::new();
        let ball = sim.store.create_entity("ball");
        sim.store.add_component(ball, Transform::default()).unwrap();
        sim.physics
            .add_body(RigidBody::dynamic(ball).with_position(Vec3::new(0.0, 100.0, 0.0)));

        sim.time.start(0.0);
        for frame in 1..=30 {
            sim.tick(frame as f64 * 1000.0 / 60.0);
        }

        let body_y = sim.physics.body(ball).unwrap().position.y;
        assert!(body_y < 100.0);

        let transform = sim
            .store
            .get_component(ball, ComponentKind::Transform)
            .unwrap();
        assert_eq!(transform.as_transform().unwrap().position.y, body_y);
    }

    #[test]
    fn destroyed_entity_body_is_pruned_next_tick() {
        let mut sim = Simulation::new();
        let ball = sim.store.create_entity("ball");
        sim.physics.add_body(RigidBody::dynamic(ball));

        sim.time.start(0.0);
        sim.tick(16.0);
        assert_eq!(sim.physics.body_count(), 1);

        sim.store.destroy_entity(ball);
        sim.tick(32.0);
        assert_eq!(sim.physics.body_count(), 0);
    }

    #[test]
    fn pausing_the_loop_freezes_physics() {
        let mut sim = Simulation::new();
        let ball = sim.store.create_entity("ball");
        sim.physics
            .add_body(RigidBody::dynamic(ball).with_position(Vec3::new(0.0, 50.0, 0.0)));

        sim.time.start(0.0);
        sim.time.pause();
        for frame in 1..=10 {
            sim.tick(frame as f64 * 16.0);
        }
        // Delta stays zero while paused, so step() never runs a pass.
        assert_eq!(sim.physics.body(ball).unwrap().position.y, 50.0);
    }

    #[test]
    fn user_systems_order_around_physics() {
        let mut sim = Simulation::new();
        let ball = sim.store.create_entity("ball");
        sim.physics
            .add_body(RigidBody::dynamic(ball).with_position(Vec3::new(0.0, 10.0, 0.0)));

        // Runs after physics: sees this frame's integrated position.
        let observed = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let observed_cb = std::rc::Rc::clone(&observed);
        sim.time.add_system(PHYSICS_PRIORITY + 1, move |_, physics, _| {
            let body = physics.bodies().next().unwrap();
            observed_cb.borrow_mut().push(body.position.y);
        });

        sim.time.start(0.0);
        sim.tick(16.0);

        let after_tick = sim.physics.body(ball).unwrap().position.y;
        assert_eq!(*observed.borrow(), vec![after_tick]);
        assert!(after_tick < 10.0);
    }
}
