//! Error types for scene-store and snapshot operations.
//!
//! Most registry operations are deliberately permissive (unknown ids are
//! no-ops so editor actions stay idempotent); the cases that *do* need to
//! reach the caller — a component added to a vanished entity, a reparent
//! that would close a cycle, a snapshot that no longer matches the known
//! component kinds — surface through [`SceneError`].

use thiserror::Error;

use crate::component::ComponentKind;
use crate::entity::EntityId;

/// The error type for all fallible scene-store operations.
#[derive(Debug, Error)]
pub enum SceneError {
    /// The entity does not exist (or no longer exists) in the registry.
    #[error("unknown entity {0}")]
    UnknownEntity(EntityId),

    /// The entity exists but has no record for the requested component kind.
    #[error("entity {entity} has no {kind} component")]
    MissingComponent {
        entity: EntityId,
        kind: ComponentKind,
    },

    /// Attaching `child` under `parent` would make an entity its own
    /// ancestor, which recursive destruction cannot survive.
    #[error("attaching {child} under {parent} would create a hierarchy cycle")]
    CyclicHierarchy { parent: EntityId, child: EntityId },

    /// A snapshot table row holds data of a different kind than the table
    /// it was stored under.
    #[error("snapshot table {table} holds {found} data for entity {entity}")]
    KindMismatch {
        table: ComponentKind,
        found: ComponentKind,
        entity: EntityId,
    },

    /// A snapshot lists the same entity id twice.
    #[error("snapshot lists entity {0} more than once")]
    DuplicateEntity(EntityId),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("snapshot (de)serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}
