//! # Snapshots — Export and Import of the Whole Scene
//!
//! A [`SceneSnapshot`] captures everything the store and physics world
//! hold: entities with their hierarchy, every component table, and every
//! rigid body. All collections are explicit `(key, value)` pair lists in
//! ascending id order — nothing in the wire format depends on hash-map
//! iteration order, so the same scene always serializes to the same JSON.
//!
//! Component masks are deliberately *not* stored: import reconstructs each
//! entity's mask from the table rows, so the mask ⟺ record invariant holds
//! by construction. Hierarchy is stored as per-entity `children` arrays and
//! parent links are derived at load.
//!
//! Import validates before touching anything: duplicate ids, rows whose
//! data kind disagrees with their table, references to entities the
//! snapshot doesn't list, and child cycles are all errors — data is never
//! silently dropped. A snapshot carrying a component kind this build no
//! longer knows already fails at deserialization.

use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::component::{ComponentData, ComponentKind, ComponentMask};
use crate::entity::{EntityId, EntityRecord};
use crate::error::SceneError;
use crate::physics::{PhysicsWorld, RigidBody};
use crate::store::SceneStore;

/// One entity in a snapshot. The component mask is reconstructed from the
/// tables at import, never stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntitySnapshot {
    pub id: EntityId,
    pub name: String,
    pub active: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<EntityId>,
}

/// One component table: a kind plus its `(entity, data)` rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentTableSnapshot {
    pub kind: ComponentKind,
    pub rows: Vec<(EntityId, ComponentData)>,
}

/// The full persisted state of a scene.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SceneSnapshot {
    pub entities: Vec<EntitySnapshot>,
    pub components: Vec<ComponentTableSnapshot>,
    pub bodies: Vec<RigidBody>,
}

impl SceneSnapshot {
    /// Capture the current store and physics state. Entities, rows, and
    /// bodies all come out in ascending id order.
    pub fn capture(store: &SceneStore, physics: &PhysicsWorld) -> Self {
        let entities = store
            .entities()
            .map(|record| EntitySnapshot {
                id: record.id,
                name: record.name.clone(),
                active: record.active,
                children: record.children.clone(),
            })
            .collect();

        let components = ComponentKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let rows = store.table_rows(kind);
                (!rows.is_empty()).then_some(ComponentTableSnapshot { kind, rows })
            })
            .collect();

        let mut bodies: Vec<RigidBody> = physics.bodies().cloned().collect();
        bodies.sort_by_key(|body| body.entity);

        Self {
            entities,
            components,
            bodies,
        }
    }

    /// Replace the store and physics contents with this snapshot.
    ///
    /// Validates everything up front; on error neither the store nor the
    /// physics world is modified.
    pub fn apply(
        &self,
        store: &mut SceneStore,
        physics: &mut PhysicsWorld,
    ) -> Result<(), SceneError> {
        let mut known = BTreeSet::new();
        for entity in &self.entities {
            if !known.insert(entity.id) {
                return Err(SceneError::DuplicateEntity(entity.id));
            }
        }

        let mut rows = Vec::new();
        for table in &self.components {
            for (entity, data) in &table.rows {
                if data.kind() != table.kind {
                    return Err(SceneError::KindMismatch {
                        table: table.kind,
                        found: data.kind(),
                        entity: *entity,
                    });
                }
                if !known.contains(entity) {
                    return Err(SceneError::UnknownEntity(*entity));
                }
                rows.push((*entity, data.clone()));
            }
        }
        for body in &self.bodies {
            if !known.contains(&body.entity) {
                return Err(SceneError::UnknownEntity(body.entity));
            }
        }

        let records = self.build_records(&known)?;
        store.load_parts(records, rows)?;

        let bodies = self.bodies.clone();
        *physics = rebuild_physics(physics, bodies);

        log::debug!(
            "applied snapshot: {} entities, {} component tables, {} bodies",
            self.entities.len(),
            self.components.len(),
            self.bodies.len()
        );
        Ok(())
    }

    /// Build registry records with parent links derived from the stored
    /// children arrays, rejecting dangling references and cycles.
    fn build_records(&self, known: &BTreeSet<EntityId>) -> Result<Vec<EntityRecord>, SceneError> {
        let mut records: BTreeMap<EntityId, EntityRecord> = self
            .entities
            .iter()
            .map(|entity| {
                (
                    entity.id,
                    EntityRecord {
                        id: entity.id,
                        name: entity.name.clone(),
                        active: entity.active,
                        parent: None,
                        children: entity.children.clone(),
                        mask: ComponentMask::EMPTY,
                    },
                )
            })
            .collect();

        for entity in &self.entities {
            for child in &entity.children {
                if !known.contains(child) {
                    return Err(SceneError::UnknownEntity(*child));
                }
                let record = records.get_mut(child).expect("child id validated above");
                if record.parent.is_some() {
                    // Listed under two parents — the arrays can't describe
                    // a tree.
                    return Err(SceneError::CyclicHierarchy {
                        parent: entity.id,
                        child: *child,
                    });
                }
                record.parent = Some(entity.id);
            }
        }

        // Every record must be reachable from a root, or the children
        // arrays encode a cycle that recursive destruction would never
        // escape.
        let mut queue: VecDeque<EntityId> = records
            .values()
            .filter(|record| record.parent.is_none())
            .map(|record| record.id)
            .collect();
        let mut reached = BTreeSet::new();
        while let Some(id) = queue.pop_front() {
            if reached.insert(id) {
                queue.extend(records[&id].children.iter().copied());
            }
        }
        if let Some(record) = records.values().find(|record| !reached.contains(&record.id)) {
            return Err(SceneError::CyclicHierarchy {
                parent: record.parent.expect("unreached records have parents"),
                child: record.id,
            });
        }

        Ok(records.into_values().collect())
    }

    /// Serialize to pretty-printed JSON on disk.
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), SceneError> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    /// Read a snapshot back from disk. Unknown component kinds surface as
    /// deserialization errors here.
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Self, SceneError> {
        let json = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&json)?)
    }
}

/// A fresh world carrying the old one's configuration but the snapshot's
/// bodies. Collision callbacks are host wiring and do not survive a reload.
fn rebuild_physics(old: &PhysicsWorld, bodies: Vec<RigidBody>) -> PhysicsWorld {
    let mut world = PhysicsWorld::new().with_gravity(old.gravity());
    world.set_time_step(old.time_step());
    world.set_max_sub_steps(old.max_sub_steps());
    world.set_enabled(old.is_enabled());
    world.set_paused(old.is_paused());
    for body in bodies {
        world.add_body(body);
    }
    world
}
