//! A ball bouncing on the ground plane, driven by a synthetic 60 Hz tick.
//!
//! Run with `RUST_LOG=debug cargo run --example bouncing` to see the
//! store's internal logging.

use vanir::prelude::*;

fn main() {
    env_logger::init();

    let mut sim = Simulation::new();

    let ball = sim.store.create_entity("ball");
    sim.store
        .add_component(ball, Transform::from_xyz(0.0, 5.0, 0.0))
        .unwrap();
    sim.physics.add_body(
        RigidBody::dynamic(ball)
            .with_position(Vec3::new(0.0, 5.0, 0.0))
            .with_shape(Shape::Sphere { radius: 0.5 })
            .with_restitution(0.8),
    );

    // Report once a second of game time.
    sim.time.every(1000.0, |_, physics, frame| {
        let body = physics.bodies().next().unwrap();
        println!(
            "t = {:.1}s  y = {:+.3}  vy = {:+.3}",
            frame.elapsed_ms / 1000.0,
            body.position.y,
            body.velocity.y,
        );
    });

    sim.time.start(0.0);
    for frame in 1..=600 {
        sim.tick(frame as f64 * 1000.0 / 60.0);
    }

    let body = sim.physics.body(ball).unwrap();
    println!(
        "after {} frames at {:.0} fps: y = {:+.3}",
        sim.time.frame_count(),
        sim.time.fps(),
        body.position.y,
    );
}
