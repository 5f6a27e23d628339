//! Convenience re-exports — `use vanir::prelude::*` for the common items.

pub use crate::component::{
    Audio, Camera, ComponentData, ComponentKind, ComponentMask, Light, LightKind, Mesh, Script,
    Transform,
};
pub use crate::entity::{EntityId, EntityRecord};
pub use crate::error::SceneError;
pub use crate::math::{Quat, Vec2, Vec3, Vec4};
pub use crate::notify::SceneEvent;
pub use crate::physics::{
    Collision, PhysicsMaterial, PhysicsWorld, RaycastHit, RigidBody, Shape,
};
pub use crate::query::AnyMatch;
pub use crate::sim::{PHYSICS_PRIORITY, Simulation};
pub use crate::snapshot::{ComponentTableSnapshot, EntitySnapshot, SceneSnapshot};
pub use crate::store::SceneStore;
pub use crate::time::{CallbackId, EventId, Frame, SystemId, TimeLoop, TimerId};
