//! # Entity — Identity, Hierarchy, and the Registry
//!
//! An [`EntityId`] is just a number — it doesn't "contain" anything. The
//! [`EntityRegistry`] maps ids to [`EntityRecord`]s holding the name, the
//! active flag, the parent/children links, and the component mask. Component
//! *data* lives in per-kind tables owned by the
//! [`SceneStore`](crate::store::SceneStore); the record only tracks which
//! kinds are present.
//!
//! ## Design: Monotonic Ids, Never Recycled
//!
//! Ids are allocated from a monotonically increasing `u64` counter and a
//! destroyed id is never handed out again. This makes stale handles
//! self-evident (lookups simply fail) without carrying a generation counter,
//! and gives every scan of the registry — queries, snapshots — a stable
//! ascending order, since records are kept in a [`BTreeMap`].
//!
//! Parent/child links are stored as ids, never as owning references, so the
//! hierarchy cannot form ownership cycles; *id* cycles are rejected at
//! reparent time by the ancestor check in
//! [`SceneStore::add_child`](crate::store::SceneStore::add_child).

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::component::ComponentMask;

/// A lightweight handle to an entity in the scene.
///
/// Unique per store, monotonic, never recycled. Only valid for the store
/// that created it.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub struct EntityId(u64);

impl EntityId {
    pub(crate) const fn from_raw(raw: u64) -> Self {
        Self(raw)
    }

    /// The raw id value. Useful for diagnostics, not for general use.
    pub fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Everything the registry knows about one entity.
///
/// Handed out as a shared reference from
/// [`SceneStore::entity`](crate::store::SceneStore::entity); all mutation
/// goes through the store API so version bumps and change events stay
/// consistent.
#[derive(Debug, Clone)]
pub struct EntityRecord {
    pub id: EntityId,
    pub name: String,
    /// Inactive entities are skipped by queries but keep their components.
    pub active: bool,
    pub parent: Option<EntityId>,
    /// Insertion-ordered child list.
    pub children: Vec<EntityId>,
    /// Which component kinds have a record for this entity.
    pub mask: ComponentMask,
}

/// Owns entity identity and hierarchy. Component data lives elsewhere.
#[derive(Debug, Default)]
pub struct EntityRegistry {
    entities: BTreeMap<EntityId, EntityRecord>,
    next_id: u64,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate the next id and insert a fresh record: active, no parent,
    /// no children, empty mask.
    pub(crate) fn allocate(&mut self, name: String) -> EntityId {
        let id = EntityId::from_raw(self.next_id);
        self.next_id += 1;
        self.entities.insert(
            id,
            EntityRecord {
                id,
                name,
                active: true,
                parent: None,
                children: Vec::new(),
                mask: ComponentMask::EMPTY,
            },
        );
        id
    }

    pub(crate) fn remove(&mut self, id: EntityId) -> Option<EntityRecord> {
        self.entities.remove(&id)
    }

    pub fn get(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(&id)
    }

    pub(crate) fn get_mut(&mut self, id: EntityId) -> Option<&mut EntityRecord> {
        self.entities.get_mut(&id)
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    /// All records in ascending id order.
    pub fn iter(&self) -> impl Iterator<Item = &EntityRecord> {
        self.entities.values()
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Is `ancestor` somewhere on the parent chain of `of`?
    ///
    /// An entity is not its own ancestor.
    pub(crate) fn is_ancestor(&self, ancestor: EntityId, of: EntityId) -> bool {
        let mut current = self.get(of).and_then(|r| r.parent);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.get(id).and_then(|r| r.parent);
        }
        false
    }

    /// `root` plus every descendant, depth-first.
    ///
    /// Returns an empty list if `root` is unknown.
    pub(crate) fn collect_subtree(&self, root: EntityId) -> Vec<EntityId> {
        if !self.contains(root) {
            return Vec::new();
        }
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            out.push(id);
            if let Some(record) = self.get(id) {
                stack.extend(record.children.iter().copied());
            }
        }
        out
    }

    /// Replace the whole registry from pre-built records (snapshot import).
    /// The id counter resumes past the highest id seen.
    pub(crate) fn from_records(records: Vec<EntityRecord>) -> Self {
        let next_id = records.iter().map(|r| r.id.raw() + 1).max().unwrap_or(0);
        Self {
            entities: records.into_iter().map(|r| (r.id, r)).collect(),
            next_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_monotonic_and_never_recycled() {
        let mut reg = EntityRegistry::new();
        let a = reg.allocate("a".into());
        let b = reg.allocate("b".into());
        assert!(b > a);

        reg.remove(a);
        let c = reg.allocate("c".into());
        assert!(c > b);
        assert_ne!(c, a);
    }

    #[test]
    fn fresh_record_shape() {
        let mut reg = EntityRegistry::new();
        let id = reg.allocate("player".into());
        let record = reg.get(id).unwrap();
        assert_eq!(record.name, "player");
        assert!(record.active);
        assert!(record.parent.is_none());
        assert!(record.children.is_empty());
        assert!(record.mask.is_empty());
    }

    #[test]
    fn subtree_collects_all_descendants() {
        let mut reg = EntityRegistry::new();
        let root = reg.allocate("root".into());
        let child = reg.allocate("child".into());
        let grandchild = reg.allocate("grandchild".into());
        let other = reg.allocate("other".into());

        reg.get_mut(root).unwrap().children.push(child);
        reg.get_mut(child).unwrap().parent = Some(root);
        reg.get_mut(child).unwrap().children.push(grandchild);
        reg.get_mut(grandchild).unwrap().parent = Some(child);

        let subtree = reg.collect_subtree(root);
        assert_eq!(subtree.len(), 3);
        assert!(subtree.contains(&root));
        assert!(subtree.contains(&child));
        assert!(subtree.contains(&grandchild));
        assert!(!subtree.contains(&other));

        assert!(reg.collect_subtree(EntityId::from_raw(999)).is_empty());
    }

    #[test]
    fn ancestor_chain_walk() {
        let mut reg = EntityRegistry::new();
        let a = reg.allocate("a".into());
        let b = reg.allocate("b".into());
        let c = reg.allocate("c".into());
        reg.get_mut(b).unwrap().parent = Some(a);
        reg.get_mut(c).unwrap().parent = Some(b);

        assert!(reg.is_ancestor(a, c));
        assert!(reg.is_ancestor(b, c));
        assert!(!reg.is_ancestor(c, a));
        assert!(!reg.is_ancestor(a, a));
    }

    #[test]
    fn from_records_resumes_id_counter() {
        let mut reg = EntityRegistry::new();
        let a = reg.allocate("a".into());
        let b = reg.allocate("b".into());
        let records: Vec<_> = reg.iter().cloned().collect();

        let mut restored = EntityRegistry::from_records(records);
        assert!(restored.contains(a));
        assert!(restored.contains(b));
        let next = restored.allocate("next".into());
        assert!(next > b);
    }
}
