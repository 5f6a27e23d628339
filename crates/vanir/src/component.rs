//! # Components — Closed Kind Set, Typed Data, Bit Masks
//!
//! Components are plain data attached to entities. Rather than a map of
//! maps keyed by arbitrary strings, the kind set is a closed enum
//! ([`ComponentKind`]) with one strongly-typed payload struct per variant,
//! all carried by the [`ComponentData`] enum. The store keeps one table per
//! kind; each entity's [`ComponentMask`] records which tables hold a row
//! for it.
//!
//! The mask is the unit queries filter on: "all of" is a superset check,
//! "any of" an intersection check — both single integer ops.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::math::Vec3;

// ── Kinds and masks ──────────────────────────────────────────────────────

/// The closed set of component kinds the store knows about.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum ComponentKind {
    Transform,
    Mesh,
    Light,
    Camera,
    Script,
    Audio,
}

impl ComponentKind {
    /// Every kind, in table order.
    pub const ALL: [ComponentKind; 6] = [
        ComponentKind::Transform,
        ComponentKind::Mesh,
        ComponentKind::Light,
        ComponentKind::Camera,
        ComponentKind::Script,
        ComponentKind::Audio,
    ];

    /// Number of kinds (and of per-kind tables).
    pub const COUNT: usize = Self::ALL.len();

    pub(crate) fn table_index(self) -> usize {
        self as usize
    }

    /// The single mask bit for this kind.
    pub fn bit(self) -> u32 {
        1 << self as u32
    }

    pub fn name(self) -> &'static str {
        match self {
            ComponentKind::Transform => "transform",
            ComponentKind::Mesh => "mesh",
            ComponentKind::Light => "light",
            ComponentKind::Camera => "camera",
            ComponentKind::Script => "script",
            ComponentKind::Audio => "audio",
        }
    }
}

impl fmt::Display for ComponentKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A set of [`ComponentKind`]s packed into a `u32`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ComponentMask(u32);

impl ComponentMask {
    pub const EMPTY: Self = Self(0);

    pub fn from_kinds(kinds: &[ComponentKind]) -> Self {
        let mut mask = Self::EMPTY;
        for &kind in kinds {
            mask.insert(kind);
        }
        mask
    }

    pub fn insert(&mut self, kind: ComponentKind) {
        self.0 |= kind.bit();
    }

    pub fn remove(&mut self, kind: ComponentKind) {
        self.0 &= !kind.bit();
    }

    pub fn contains(self, kind: ComponentKind) -> bool {
        self.0 & kind.bit() != 0
    }

    /// Does this mask hold every kind in `other`? (ALL-query test.)
    pub fn contains_all(self, other: ComponentMask) -> bool {
        self.0 & other.0 == other.0
    }

    /// Does this mask share any kind with `other`? (ANY-query test.)
    pub fn intersects(self, other: ComponentMask) -> bool {
        self.0 & other.0 != 0
    }

    pub fn intersection(self, other: ComponentMask) -> ComponentMask {
        ComponentMask(self.0 & other.0)
    }

    pub fn is_empty(self) -> bool {
        self.0 == 0
    }

    /// The kinds present, in table order.
    pub fn kinds(self) -> impl Iterator<Item = ComponentKind> {
        ComponentKind::ALL
            .into_iter()
            .filter(move |kind| self.contains(*kind))
    }

    pub(crate) fn bits(self) -> u32 {
        self.0
    }
}

impl fmt::Debug for ComponentMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.kinds()).finish()
    }
}

// ── Per-kind payloads ────────────────────────────────────────────────────

/// Position, rotation (euler radians), and scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transform {
    pub position: Vec3,
    pub rotation: Vec3,
    pub scale: Vec3,
}

impl Transform {
    pub fn from_xyz(x: f32, y: f32, z: f32) -> Self {
        Self {
            position: Vec3::new(x, y, z),
            ..Self::default()
        }
    }
}

impl Default for Transform {
    fn default() -> Self {
        Self {
            position: Vec3::ZERO,
            rotation: Vec3::ZERO,
            scale: Vec3::ONE,
        }
    }
}

/// A renderable mesh reference. The asset itself is external.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mesh {
    pub asset: String,
    pub visible: bool,
}

impl Default for Mesh {
    fn default() -> Self {
        Self {
            asset: String::new(),
            visible: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LightKind {
    Directional,
    Point,
    Spot,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Light {
    pub kind: LightKind,
    pub color: [f32; 3],
    pub intensity: f32,
    pub range: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            kind: LightKind::Point,
            color: [1.0, 1.0, 1.0],
            intensity: 1.0,
            range: 10.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Camera {
    /// Vertical field of view in degrees.
    pub fov: f32,
    pub near: f32,
    pub far: f32,
    pub primary: bool,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            fov: 60.0,
            near: 0.1,
            far: 1000.0,
            primary: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Script {
    pub source: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Audio {
    pub asset: String,
    pub volume: f32,
    pub looped: bool,
    pub autoplay: bool,
}

impl Default for Audio {
    fn default() -> Self {
        Self {
            asset: String::new(),
            volume: 1.0,
            looped: false,
            autoplay: false,
        }
    }
}

// ── The payload enum ─────────────────────────────────────────────────────

/// One component's data, tagged by kind.
///
/// Serialized externally tagged, so a snapshot containing a kind this build
/// no longer knows fails deserialization instead of silently dropping data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComponentData {
    Transform(Transform),
    Mesh(Mesh),
    Light(Light),
    Camera(Camera),
    Script(Script),
    Audio(Audio),
}

impl ComponentData {
    pub fn kind(&self) -> ComponentKind {
        match self {
            ComponentData::Transform(_) => ComponentKind::Transform,
            ComponentData::Mesh(_) => ComponentKind::Mesh,
            ComponentData::Light(_) => ComponentKind::Light,
            ComponentData::Camera(_) => ComponentKind::Camera,
            ComponentData::Script(_) => ComponentKind::Script,
            ComponentData::Audio(_) => ComponentKind::Audio,
        }
    }
}

macro_rules! impl_variant_access {
    ($(($variant:ident, $ty:ty, $as_fn:ident, $as_mut_fn:ident)),+ $(,)?) => {
        impl ComponentData {
            $(
                pub fn $as_fn(&self) -> Option<&$ty> {
                    match self {
                        ComponentData::$variant(v) => Some(v),
                        _ => None,
                    }
                }

                pub fn $as_mut_fn(&mut self) -> Option<&mut $ty> {
                    match self {
                        ComponentData::$variant(v) => Some(v),
                        _ => None,
                    }
                }
            )+
        }

        $(
            impl From<$ty> for ComponentData {
                fn from(value: $ty) -> Self {
                    ComponentData::$variant(value)
                }
            }
        )+
    };
}

impl_variant_access!(
    (Transform, Transform, as_transform, as_transform_mut),
    (Mesh, Mesh, as_mesh, as_mesh_mut),
    (Light, Light, as_light, as_light_mut),
    (Camera, Camera, as_camera, as_camera_mut),
    (Script, Script, as_script, as_script_mut),
    (Audio, Audio, as_audio, as_audio_mut),
);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn mask_insert_remove_contains() {
        let mut mask = ComponentMask::EMPTY;
        assert!(mask.is_empty());

        mask.insert(ComponentKind::Transform);
        mask.insert(ComponentKind::Mesh);
        assert!(mask.contains(ComponentKind::Transform));
        assert!(mask.contains(ComponentKind::Mesh));
        assert!(!mask.contains(ComponentKind::Light));

        mask.remove(ComponentKind::Transform);
        assert!(!mask.contains(ComponentKind::Transform));
        assert!(mask.contains(ComponentKind::Mesh));
    }

    #[test]
    fn superset_and_intersection_tests() {
        let have = ComponentMask::from_kinds(&[
            ComponentKind::Transform,
            ComponentKind::Mesh,
            ComponentKind::Light,
        ]);
        let want_all = ComponentMask::from_kinds(&[ComponentKind::Transform, ComponentKind::Mesh]);
        let want_other = ComponentMask::from_kinds(&[ComponentKind::Camera]);

        assert!(have.contains_all(want_all));
        assert!(!have.contains_all(ComponentMask::from_kinds(&[
            ComponentKind::Mesh,
            ComponentKind::Camera,
        ])));
        assert!(have.intersects(want_all));
        assert!(!have.intersects(want_other));

        let overlap = have.intersection(ComponentMask::from_kinds(&[
            ComponentKind::Mesh,
            ComponentKind::Camera,
        ]));
        assert_eq!(overlap, ComponentMask::from_kinds(&[ComponentKind::Mesh]));
    }

    #[test]
    fn mask_kinds_iterates_in_table_order() {
        let mask = ComponentMask::from_kinds(&[ComponentKind::Audio, ComponentKind::Transform]);
        let kinds: Vec<_> = mask.kinds().collect();
        assert_eq!(kinds, vec![ComponentKind::Transform, ComponentKind::Audio]);
    }

    #[test]
    fn data_reports_its_kind() {
        let data: ComponentData = Transform::default().into();
        assert_eq!(data.kind(), ComponentKind::Transform);
        assert!(data.as_transform().is_some());
        assert!(data.as_mesh().is_none());
    }

    #[test]
    fn unknown_kind_fails_deserialization() {
        let json = r#"{"Particles":{"count":64}}"#;
        let result: Result<ComponentData, _> = serde_json::from_str(json);
        assert!(result.is_err());
    }

    #[test]
    fn data_round_trips_through_json() {
        let data: ComponentData = Light {
            kind: LightKind::Spot,
            color: [0.5, 0.25, 1.0],
            intensity: 3.0,
            range: 25.0,
        }
        .into();
        let json = serde_json::to_string(&data).unwrap();
        let back: ComponentData = serde_json::from_str(&json).unwrap();
        assert_eq!(back, data);
    }
}
