//! Math types and glam re-exports.
//!
//! We re-export [glam](https://docs.rs/glam) types so users don't need to
//! depend on it directly. Positions, velocities, and gravity throughout the
//! crate are plain [`Vec3`]s.

pub use glam::{Quat, Vec2, Vec3, Vec4};
