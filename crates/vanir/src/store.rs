//! # SceneStore — The Reactive Scene Container
//!
//! The [`SceneStore`] owns entity identity and hierarchy (the
//! [`EntityRegistry`]), one component table per
//! [`ComponentKind`], the global version counter, the query cache, and the
//! change notifier. It is the single mutation surface: every structural
//! change flows through a method here so that version bumps, mask updates,
//! and [`SceneEvent`]s stay consistent with each other.
//!
//! ## Versioning
//!
//! `global_version` increments on entity creation/destruction, activation
//! changes, and component add/remove — the changes that can alter query
//! *membership*. In-place data mutation via [`update_component`]
//! deliberately does not bump it: cached query results stay valid, and
//! collaborators holding snapshot copies re-fetch on their next read.
//!
//! ## Error doctrine
//!
//! Operations on unknown entities are non-fatal no-ops, so editor actions
//! like a double-delete stay idempotent. The exceptions:
//! [`add_component`] errors (distinguishing "entity vanished mid-edit" from
//! "component removed twice"), and reparenting into a cycle is rejected
//! with [`SceneError::CyclicHierarchy`].
//!
//! [`add_component`]: SceneStore::add_component
//! [`update_component`]: SceneStore::update_component

use std::collections::HashMap;
use std::sync::mpsc::Receiver;

use crate::component::{ComponentData, ComponentKind, ComponentMask};
use crate::entity::{EntityId, EntityRecord, EntityRegistry};
use crate::error::SceneError;
use crate::notify::{ReactiveNotifier, SceneEvent};
use crate::query::{AnyMatch, QueryCache, entities_with_any};

/// One homogeneous table per component kind, keyed by entity id.
#[derive(Default)]
struct ComponentTables {
    tables: [HashMap<EntityId, ComponentData>; ComponentKind::COUNT],
}

impl ComponentTables {
    fn row(&self, entity: EntityId, kind: ComponentKind) -> Option<&ComponentData> {
        self.tables[kind.table_index()].get(&entity)
    }

    fn row_mut(&mut self, entity: EntityId, kind: ComponentKind) -> Option<&mut ComponentData> {
        self.tables[kind.table_index()].get_mut(&entity)
    }

    fn insert(&mut self, entity: EntityId, data: ComponentData) -> Option<ComponentData> {
        self.tables[data.kind().table_index()].insert(entity, data)
    }

    fn remove(&mut self, entity: EntityId, kind: ComponentKind) -> Option<ComponentData> {
        self.tables[kind.table_index()].remove(&entity)
    }

    fn clear_entity(&mut self, entity: EntityId) {
        for table in &mut self.tables {
            table.remove(&entity);
        }
    }

    /// All rows of one kind, cloned, ascending id order.
    fn rows_sorted(&self, kind: ComponentKind) -> Vec<(EntityId, ComponentData)> {
        let mut rows: Vec<_> = self.tables[kind.table_index()]
            .iter()
            .map(|(id, data)| (*id, data.clone()))
            .collect();
        rows.sort_by_key(|(id, _)| *id);
        rows
    }
}

/// The reactive entity-component scene container. See the module docs.
#[derive(Default)]
pub struct SceneStore {
    registry: EntityRegistry,
    tables: ComponentTables,
    version: u64,
    cache: QueryCache,
    notifier: ReactiveNotifier,
}

impl SceneStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Entities ─────────────────────────────────────────────────────

    /// Allocate the next id and insert a fresh active entity.
    pub fn create_entity(&mut self, name: impl Into<String>) -> EntityId {
        let id = self.registry.allocate(name.into());
        self.version += 1;
        self.notifier.emit(SceneEvent::EntityCreated(id));
        id
    }

    /// Destroy an entity and every descendant, clearing all their component
    /// records. Unknown ids are a no-op. The version is bumped once per
    /// entity actually removed.
    ///
    /// Returns `true` if the entity existed.
    pub fn destroy_entity(&mut self, id: EntityId) -> bool {
        let victims = self.registry.collect_subtree(id);
        if victims.is_empty() {
            return false;
        }

        // Detach the subtree root from its parent's child list; everything
        // below it goes away wholesale.
        if let Some(parent) = self.registry.get(id).and_then(|r| r.parent)
            && let Some(parent_record) = self.registry.get_mut(parent)
        {
            parent_record.children.retain(|&c| c != id);
        }

        for victim in &victims {
            self.registry.remove(*victim);
            self.tables.clear_entity(*victim);
            self.version += 1;
            self.notifier.emit(SceneEvent::EntityDestroyed(*victim));
        }
        if victims.len() > 1 {
            log::debug!("destroyed {id} and {} descendants", victims.len() - 1);
        }
        true
    }

    /// Toggle visibility-to-queries. Unknown ids are a no-op.
    pub fn set_active(&mut self, id: EntityId, active: bool) -> bool {
        let Some(record) = self.registry.get_mut(id) else {
            return false;
        };
        record.active = active;
        self.version += 1;
        self.notifier
            .emit(SceneEvent::ActiveChanged { entity: id, active });
        true
    }

    /// Rename an entity. Non-structural: no version bump. Unknown ids are a
    /// no-op.
    pub fn rename(&mut self, id: EntityId, name: impl Into<String>) -> bool {
        let Some(record) = self.registry.get_mut(id) else {
            return false;
        };
        record.name = name.into();
        self.notifier.emit(SceneEvent::Renamed { entity: id });
        true
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityRecord> {
        self.registry.get(id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.registry.contains(id)
    }

    /// All records, ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = &EntityRecord> {
        self.registry.iter()
    }

    pub fn entity_count(&self) -> usize {
        self.registry.len()
    }

    // ── Hierarchy ────────────────────────────────────────────────────

    /// Attach `child` under `parent`, detaching it from any prior parent
    /// first. Unknown ids are a no-op. Rejects attachments that would make
    /// an entity its own ancestor.
    pub fn add_child(&mut self, parent: EntityId, child: EntityId) -> Result<(), SceneError> {
        if parent == child {
            return Err(SceneError::CyclicHierarchy { parent, child });
        }
        if !self.registry.contains(parent) || !self.registry.contains(child) {
            return Ok(());
        }
        if self.registry.is_ancestor(child, parent) {
            return Err(SceneError::CyclicHierarchy { parent, child });
        }
        if self.registry.get(child).and_then(|r| r.parent) == Some(parent) {
            return Ok(());
        }

        self.detach(child);
        self.registry.get_mut(child).unwrap().parent = Some(parent);
        self.registry.get_mut(parent).unwrap().children.push(child);
        self.notifier.emit(SceneEvent::Reparented {
            child,
            parent: Some(parent),
        });
        Ok(())
    }

    /// Detach `child` from `parent`. A no-op unless `child` is currently a
    /// child of `parent`.
    pub fn remove_child(&mut self, parent: EntityId, child: EntityId) {
        if self.registry.get(child).and_then(|r| r.parent) != Some(parent) {
            return;
        }
        self.detach(child);
        self.notifier.emit(SceneEvent::Reparented {
            child,
            parent: None,
        });
    }

    fn detach(&mut self, child: EntityId) {
        let Some(prior) = self.registry.get(child).and_then(|r| r.parent) else {
            return;
        };
        if let Some(parent_record) = self.registry.get_mut(prior) {
            parent_record.children.retain(|&c| c != child);
        }
        self.registry.get_mut(child).unwrap().parent = None;
    }

    // ── Components ───────────────────────────────────────────────────

    /// Insert (or overwrite) a component record. Errors if the entity is
    /// unknown — the one registry operation that must tell the caller the
    /// entity vanished.
    pub fn add_component(
        &mut self,
        id: EntityId,
        data: impl Into<ComponentData>,
    ) -> Result<(), SceneError> {
        let data = data.into();
        let kind = data.kind();
        let Some(record) = self.registry.get_mut(id) else {
            return Err(SceneError::UnknownEntity(id));
        };
        record.mask.insert(kind);
        self.tables.insert(id, data);
        self.version += 1;
        self.notifier
            .emit(SceneEvent::ComponentAdded { entity: id, kind });
        Ok(())
    }

    /// Clear a component record and its mask bit. A true no-op (no version
    /// bump) if the record is absent or the entity unknown.
    ///
    /// Returns `true` if a record was removed.
    pub fn remove_component(&mut self, id: EntityId, kind: ComponentKind) -> bool {
        if self.tables.remove(id, kind).is_none() {
            return false;
        }
        if let Some(record) = self.registry.get_mut(id) {
            record.mask.remove(kind);
        }
        self.version += 1;
        self.notifier
            .emit(SceneEvent::ComponentRemoved { entity: id, kind });
        true
    }

    /// Read a component record. Never touches the version.
    pub fn get_component(&self, id: EntityId, kind: ComponentKind) -> Option<&ComponentData> {
        self.tables.row(id, kind)
    }

    /// Mutate an existing record in place. The structural shape is
    /// unchanged, so the version is *not* bumped — cached query membership
    /// stays valid — but a [`SceneEvent::ComponentUpdated`] is emitted so
    /// collaborators know to re-fetch.
    pub fn update_component(
        &mut self,
        id: EntityId,
        kind: ComponentKind,
        mutate: impl FnOnce(&mut ComponentData),
    ) -> Result<(), SceneError> {
        if !self.registry.contains(id) {
            return Err(SceneError::UnknownEntity(id));
        }
        let Some(row) = self.tables.row_mut(id, kind) else {
            return Err(SceneError::MissingComponent { entity: id, kind });
        };
        mutate(row);
        debug_assert_eq!(row.kind(), kind, "mutator changed the component kind");
        self.notifier
            .emit(SceneEvent::ComponentUpdated { entity: id, kind });
        Ok(())
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Active entities holding *all* of `kinds`, ascending id order.
    /// Cached per kind set; served without recomputation while the version
    /// matches.
    pub fn entities_with(&mut self, kinds: &[ComponentKind]) -> &[EntityId] {
        let mask = ComponentMask::from_kinds(kinds);
        self.cache.entities_with(&self.registry, mask, self.version)
    }

    /// Active entities holding *any* of `kinds`, each with the subset
    /// actually present. Uncached.
    pub fn entities_with_any(&self, kinds: &[ComponentKind]) -> Vec<AnyMatch> {
        entities_with_any(&self.registry, kinds)
    }

    /// The global structural version.
    pub fn version(&self) -> u64 {
        self.version
    }

    pub(crate) fn query_recomputes(&self) -> u64 {
        self.cache.recomputes()
    }

    // ── Observation ──────────────────────────────────────────────────

    /// Subscribe to change events. Drop the receiver to unsubscribe.
    pub fn subscribe(&mut self) -> Receiver<SceneEvent> {
        self.notifier.subscribe()
    }

    // ── Snapshot support ─────────────────────────────────────────────

    pub(crate) fn table_rows(&self, kind: ComponentKind) -> Vec<(EntityId, ComponentData)> {
        self.tables.rows_sorted(kind)
    }

    /// Replace the whole store from snapshot parts. Masks are reconstructed
    /// from `rows`, never trusted from the outside. All-or-nothing: the
    /// store is untouched on error.
    pub(crate) fn load_parts(
        &mut self,
        records: Vec<EntityRecord>,
        rows: Vec<(EntityId, ComponentData)>,
    ) -> Result<(), SceneError> {
        let mut registry = EntityRegistry::from_records(records);
        let mut tables = ComponentTables::default();
        for (entity, data) in rows {
            let Some(record) = registry.get_mut(entity) else {
                return Err(SceneError::UnknownEntity(entity));
            };
            record.mask.insert(data.kind());
            tables.insert(entity, data);
        }
        self.registry = registry;
        self.tables = tables;
        self.version += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::{Camera, Light, Mesh, Transform};

    #[test]
    fn create_bumps_version_and_emits() {
        let mut store = SceneStore::new();
        let events = store.subscribe();
        let v0 = store.version();

        let id = store.create_entity("player");
        assert_eq!(store.version(), v0 + 1);
        assert_eq!(events.try_recv().unwrap(), SceneEvent::EntityCreated(id));
        assert!(store.entity(id).unwrap().active);
    }

    #[test]
    fn mask_mirrors_component_records() {
        let mut store = SceneStore::new();
        let id = store.create_entity("e");

        store.add_component(id, Transform::default()).unwrap();
        store.add_component(id, Mesh::default()).unwrap();
        for kind in ComponentKind::ALL {
            assert_eq!(
                store.entity(id).unwrap().mask.contains(kind),
                store.get_component(id, kind).is_some(),
            );
        }

        store.remove_component(id, ComponentKind::Mesh);
        for kind in ComponentKind::ALL {
            assert_eq!(
                store.entity(id).unwrap().mask.contains(kind),
                store.get_component(id, kind).is_some(),
            );
        }
    }

    #[test]
    fn add_component_on_unknown_entity_errors() {
        let mut store = SceneStore::new();
        let id = store.create_entity("e");
        store.destroy_entity(id);

        let result = store.add_component(id, Transform::default());
        assert!(matches!(result, Err(SceneError::UnknownEntity(e)) if e == id));
    }

    #[test]
    fn add_component_overwrites_existing_record() {
        let mut store = SceneStore::new();
        let id = store.create_entity("e");
        store.add_component(id, Transform::from_xyz(1.0, 0.0, 0.0)).unwrap();
        store.add_component(id, Transform::from_xyz(2.0, 0.0, 0.0)).unwrap();

        let data = store.get_component(id, ComponentKind::Transform).unwrap();
        assert_eq!(data.as_transform().unwrap().position.x, 2.0);
    }

    #[test]
    fn remove_absent_component_is_a_true_noop() {
        let mut store = SceneStore::new();
        let id = store.create_entity("e");
        let v = store.version();

        assert!(!store.remove_component(id, ComponentKind::Mesh));
        assert_eq!(store.version(), v);
    }

    #[test]
    fn update_component_skips_version_but_emits() {
        let mut store = SceneStore::new();
        let id = store.create_entity("e");
        store.add_component(id, Transform::default()).unwrap();
        let events = store.subscribe();
        let v = store.version();

        store
            .update_component(id, ComponentKind::Transform, |data| {
                data.as_transform_mut().unwrap().position.y = 5.0;
            })
            .unwrap();

        assert_eq!(store.version(), v);
        assert_eq!(
            events.try_recv().unwrap(),
            SceneEvent::ComponentUpdated {
                entity: id,
                kind: ComponentKind::Transform
            }
        );
        let t = store.get_component(id, ComponentKind::Transform).unwrap();
        assert_eq!(t.as_transform().unwrap().position.y, 5.0);

        let missing = store.update_component(id, ComponentKind::Mesh, |_| {});
        assert!(matches!(missing, Err(SceneError::MissingComponent { .. })));
    }

    #[test]
    fn destroy_removes_subtree_from_queries() {
        let mut store = SceneStore::new();
        let root = store.create_entity("root");
        let child = store.create_entity("child");
        let grandchild = store.create_entity("grandchild");
        let bystander = store.create_entity("bystander");
        store.add_child(root, child).unwrap();
        store.add_child(child, grandchild).unwrap();
        for id in [root, child, grandchild, bystander] {
            store.add_component(id, Mesh::default()).unwrap();
        }

        let v = store.version();
        assert!(store.destroy_entity(root));
        assert_eq!(store.version(), v + 3);

        let remaining = store.entities_with(&[ComponentKind::Mesh]).to_vec();
        assert_eq!(remaining, vec![bystander]);
        assert!(store.get_component(child, ComponentKind::Mesh).is_none());

        // Double-delete stays idempotent.
        let v = store.version();
        assert!(!store.destroy_entity(root));
        assert_eq!(store.version(), v);
    }

    #[test]
    fn destroying_a_child_updates_parent_children() {
        let mut store = SceneStore::new();
        let parent = store.create_entity("parent");
        let child = store.create_entity("child");
        store.add_child(parent, child).unwrap();

        store.destroy_entity(child);
        assert!(store.entity(parent).unwrap().children.is_empty());
    }

    #[test]
    fn inactive_entities_leave_queries_but_keep_components() {
        let mut store = SceneStore::new();
        let id = store.create_entity("e");
        store.add_component(id, Mesh::default()).unwrap();

        store.set_active(id, false);
        assert!(store.entities_with(&[ComponentKind::Mesh]).is_empty());
        assert!(store.get_component(id, ComponentKind::Mesh).is_some());

        store.set_active(id, true);
        assert_eq!(store.entities_with(&[ComponentKind::Mesh]), &[id]);
    }

    #[test]
    fn reparent_detaches_from_prior_parent() {
        let mut store = SceneStore::new();
        let a = store.create_entity("a");
        let b = store.create_entity("b");
        let child = store.create_entity("child");

        store.add_child(a, child).unwrap();
        store.add_child(b, child).unwrap();

        assert!(store.entity(a).unwrap().children.is_empty());
        assert_eq!(store.entity(b).unwrap().children, vec![child]);
        assert_eq!(store.entity(child).unwrap().parent, Some(b));
    }

    #[test]
    fn cyclic_reparent_is_rejected() {
        let mut store = SceneStore::new();
        let a = store.create_entity("a");
        let b = store.create_entity("b");
        let c = store.create_entity("c");
        store.add_child(a, b).unwrap();
        store.add_child(b, c).unwrap();

        assert!(matches!(
            store.add_child(c, a),
            Err(SceneError::CyclicHierarchy { .. })
        ));
        assert!(matches!(
            store.add_child(a, a),
            Err(SceneError::CyclicHierarchy { .. })
        ));
        // Hierarchy unchanged by the rejected attempts.
        assert_eq!(store.entity(a).unwrap().parent, None);
        assert_eq!(store.entity(c).unwrap().parent, Some(b));
    }

    #[test]
    fn unknown_ids_in_hierarchy_ops_are_noops() {
        let mut store = SceneStore::new();
        let a = store.create_entity("a");
        let ghost = EntityId::from_raw(999);

        assert!(store.add_child(a, ghost).is_ok());
        assert!(store.add_child(ghost, a).is_ok());
        store.remove_child(ghost, a);
        assert!(store.entity(a).unwrap().children.is_empty());
    }

    #[test]
    fn mesh_query_returns_exactly_the_matching_entities() {
        let mut store = SceneStore::new();
        let e1 = store.create_entity("e1");
        let e2 = store.create_entity("e2");
        let e3 = store.create_entity("e3");
        store.add_component(e1, Mesh::default()).unwrap();
        store.add_component(e3, Mesh::default()).unwrap();
        store.add_component(e2, Light::default()).unwrap();

        let first = store.entities_with(&[ComponentKind::Mesh]).to_vec();
        assert_eq!(first, vec![e1, e3]);

        // Order-stable and served from cache absent mutation.
        let recomputes = store.query_recomputes();
        let second = store.entities_with(&[ComponentKind::Mesh]).to_vec();
        assert_eq!(second, first);
        assert_eq!(store.query_recomputes(), recomputes);
    }

    #[test]
    fn query_cache_invalidates_on_structural_change() {
        let mut store = SceneStore::new();
        let e1 = store.create_entity("e1");
        store.add_component(e1, Mesh::default()).unwrap();

        assert_eq!(store.entities_with(&[ComponentKind::Mesh]), &[e1]);
        let recomputes = store.query_recomputes();

        let e2 = store.create_entity("e2");
        store.add_component(e2, Mesh::default()).unwrap();

        assert_eq!(store.entities_with(&[ComponentKind::Mesh]), &[e1, e2]);
        assert_eq!(store.query_recomputes(), recomputes + 1);
    }

    #[test]
    fn any_query_projects_present_kinds() {
        let mut store = SceneStore::new();
        let e = store.create_entity("e");
        store.add_component(e, Mesh::default()).unwrap();
        store.add_component(e, Camera::default()).unwrap();

        let matches = store.entities_with_any(&[ComponentKind::Mesh, ComponentKind::Light]);
        assert_eq!(matches.len(), 1);
        assert_eq!(
            matches[0].present,
            ComponentMask::from_kinds(&[ComponentKind::Mesh])
        );
    }
}
