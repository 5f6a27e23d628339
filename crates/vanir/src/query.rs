//! # Queries — Component-Set Matching With Version-Checked Caching
//!
//! "All of" queries are the hot path for systems and renderers, so their
//! results are cached per kind set. A cache entry is stamped with the
//! store's global version at the time it was computed; any structural
//! change (entity created/destroyed, activation toggled, component
//! added/removed) bumps the version, so a stale entry is detected by a
//! single integer compare and lazily recomputed on the next lookup.
//!
//! There is no eviction: the key space is bounded by the subsets of
//! [`ComponentKind`](crate::component::ComponentKind) actually queried, and
//! superseded results are overwritten in place.
//!
//! "Any of" queries are uncached — they are an editor/inspector
//! convenience, not a per-frame path — and return a projection of which
//! requested kinds each matching entity actually has.

use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::component::{ComponentKind, ComponentMask};
use crate::entity::{EntityId, EntityRegistry};

/// One matching entity from an "any of" query, with the subset of the
/// requested kinds it actually carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AnyMatch {
    pub entity: EntityId,
    pub present: ComponentMask,
}

struct CacheEntry {
    ids: Vec<EntityId>,
    version: u64,
}

/// Version-checked cache for "all of" queries.
#[derive(Default)]
pub(crate) struct QueryCache {
    entries: HashMap<u32, CacheEntry>,
    recomputes: u64,
}

impl QueryCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Entities whose mask is a superset of `mask`, active only, ascending
    /// id order. Served from cache when the entry's version matches
    /// `version`; recomputed otherwise.
    pub fn entities_with<'a>(
        &'a mut self,
        registry: &EntityRegistry,
        mask: ComponentMask,
        version: u64,
    ) -> &'a [EntityId] {
        match self.entries.entry(mask.bits()) {
            Entry::Occupied(entry) => {
                let entry = entry.into_mut();
                if entry.version != version {
                    entry.ids = scan_all(registry, mask);
                    entry.version = version;
                    self.recomputes += 1;
                }
                &entry.ids
            }
            Entry::Vacant(slot) => {
                self.recomputes += 1;
                let entry = slot.insert(CacheEntry {
                    ids: scan_all(registry, mask),
                    version,
                });
                &entry.ids
            }
        }
    }

    /// How many times a result has been computed (cache misses + stale
    /// refreshes). Cache hits leave this untouched.
    pub fn recomputes(&self) -> u64 {
        self.recomputes
    }
}

fn scan_all(registry: &EntityRegistry, mask: ComponentMask) -> Vec<EntityId> {
    registry
        .iter()
        .filter(|record| record.active && record.mask.contains_all(mask))
        .map(|record| record.id)
        .collect()
}

/// Active entities whose mask intersects `kinds`, each with the overlap.
pub(crate) fn entities_with_any(registry: &EntityRegistry, kinds: &[ComponentKind]) -> Vec<AnyMatch> {
    let want = ComponentMask::from_kinds(kinds);
    registry
        .iter()
        .filter(|record| record.active && record.mask.intersects(want))
        .map(|record| AnyMatch {
            entity: record.id,
            present: record.mask.intersection(want),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry_with(masks: &[&[ComponentKind]]) -> (EntityRegistry, Vec<EntityId>) {
        let mut registry = EntityRegistry::new();
        let mut ids = Vec::new();
        for (i, kinds) in masks.iter().enumerate() {
            let id = registry.allocate(format!("e{i}"));
            registry.get_mut(id).unwrap().mask = ComponentMask::from_kinds(kinds);
            ids.push(id);
        }
        (registry, ids)
    }

    #[test]
    fn cache_hit_skips_recompute() {
        let (registry, ids) = registry_with(&[
            &[ComponentKind::Transform, ComponentKind::Mesh],
            &[ComponentKind::Transform],
        ]);
        let mut cache = QueryCache::new();
        let mask = ComponentMask::from_kinds(&[ComponentKind::Transform]);

        let first: Vec<_> = cache.entities_with(&registry, mask, 5).to_vec();
        assert_eq!(first, ids);
        assert_eq!(cache.recomputes(), 1);

        let second: Vec<_> = cache.entities_with(&registry, mask, 5).to_vec();
        assert_eq!(second, first);
        assert_eq!(cache.recomputes(), 1);
    }

    #[test]
    fn version_change_forces_recompute() {
        let (registry, _) = registry_with(&[&[ComponentKind::Mesh]]);
        let mut cache = QueryCache::new();
        let mask = ComponentMask::from_kinds(&[ComponentKind::Mesh]);

        cache.entities_with(&registry, mask, 1);
        cache.entities_with(&registry, mask, 2);
        assert_eq!(cache.recomputes(), 2);
    }

    #[test]
    fn inactive_entities_are_skipped() {
        let (mut registry, ids) = registry_with(&[&[ComponentKind::Mesh], &[ComponentKind::Mesh]]);
        registry.get_mut(ids[0]).unwrap().active = false;

        let mut cache = QueryCache::new();
        let mask = ComponentMask::from_kinds(&[ComponentKind::Mesh]);
        assert_eq!(cache.entities_with(&registry, mask, 0), &ids[1..]);
    }

    #[test]
    fn any_query_reports_present_subset() {
        let (registry, ids) = registry_with(&[
            &[ComponentKind::Transform, ComponentKind::Mesh],
            &[ComponentKind::Light],
            &[ComponentKind::Camera],
        ]);

        let matches = entities_with_any(&registry, &[ComponentKind::Mesh, ComponentKind::Light]);
        assert_eq!(matches.len(), 2);
        assert_eq!(matches[0].entity, ids[0]);
        assert_eq!(
            matches[0].present,
            ComponentMask::from_kinds(&[ComponentKind::Mesh])
        );
        assert_eq!(matches[1].entity, ids[1]);
        assert_eq!(
            matches[1].present,
            ComponentMask::from_kinds(&[ComponentKind::Light])
        );
    }

    #[test]
    fn empty_kind_set_matches_every_active_entity() {
        let (registry, ids) = registry_with(&[&[], &[ComponentKind::Mesh]]);
        let mut cache = QueryCache::new();
        assert_eq!(
            cache.entities_with(&registry, ComponentMask::EMPTY, 0),
            &ids[..]
        );
    }
}
