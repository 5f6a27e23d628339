//! Build a small scene, persist it to JSON, and restore it into a fresh
//! simulation.

use vanir::prelude::*;

fn main() -> Result<(), SceneError> {
    env_logger::init();

    let mut sim = Simulation::new();

    let root = sim.store.create_entity("level");
    let crate_box = sim.store.create_entity("crate");
    let lamp = sim.store.create_entity("lamp");
    sim.store.add_child(root, crate_box)?;
    sim.store.add_component(root, Transform::default())?;
    sim.store
        .add_component(crate_box, Transform::from_xyz(2.0, 1.0, 0.0))?;
    sim.store.add_component(
        crate_box,
        Mesh {
            asset: "meshes/crate.glb".into(),
            visible: true,
        },
    )?;
    sim.store.add_component(lamp, Light::default())?;
    sim.physics.add_body(
        RigidBody::dynamic(crate_box)
            .with_position(Vec3::new(2.0, 1.0, 0.0))
            .with_shape(Shape::Cuboid { size: Vec3::ONE }),
    );

    let snapshot = SceneSnapshot::capture(&sim.store, &sim.physics);
    let path = std::env::temp_dir().join("vanir_scene.json");
    snapshot.save_to_file(&path)?;
    println!("saved {} entities to {}", snapshot.entities.len(), path.display());

    let loaded = SceneSnapshot::load_from_file(&path)?;
    let mut restored = Simulation::new();
    loaded.apply(&mut restored.store, &mut restored.physics)?;

    for record in restored.store.entities() {
        println!(
            "{} {:?} (parent: {:?}, components: {:?})",
            record.id, record.name, record.parent, record.mask,
        );
    }
    println!("{} rigid bodies restored", restored.physics.body_count());

    std::fs::remove_file(&path).ok();
    Ok(())
}
