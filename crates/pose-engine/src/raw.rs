//! Loader-facing input model
//!
//! These types are the contract between an asset importer and this crate.
//! Importers flatten their scene into a joint list, per-mesh skin data and
//! per-clip keyframe lists; nothing here depends on a particular file format.
//!
//! Matrices are 16 floats in column-major order, matching [`glam::Mat4`].

use glam::{Quat, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Column-major 4x4 identity
pub const IDENTITY_MATRIX: [f32; 16] = [
    1.0, 0.0, 0.0, 0.0, // Column 0
    0.0, 1.0, 0.0, 0.0, // Column 1
    0.0, 0.0, 1.0, 0.0, // Column 2
    0.0, 0.0, 0.0, 1.0, // Column 3
];

/// One node of the imported scene hierarchy
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawJoint {
    /// Importer-side id, unique within the list
    pub id: u32,
    /// Node name, used to match mesh bones and animation channels
    pub name: String,
    /// Importer-side id of the parent, `None` for the root
    #[cfg_attr(feature = "serde", serde(default))]
    pub parent: Option<u32>,
    /// Node-relative bind transform
    pub local_bind_transform: [f32; 16],
    /// Offset matrix, present only when the importer already knows this node is a bone
    #[cfg_attr(feature = "serde", serde(default))]
    pub bone_offset: Option<[f32; 16]>,
}

impl RawJoint {
    /// Joint with an identity bind transform and no bone offset
    pub fn new(id: u32, name: impl Into<String>, parent: Option<u32>) -> Self {
        Self {
            id,
            name: name.into(),
            parent,
            local_bind_transform: IDENTITY_MATRIX,
            bone_offset: None,
        }
    }

    pub fn with_bind_transform(mut self, transform: [f32; 16]) -> Self {
        self.local_bind_transform = transform;
        self
    }

    pub fn with_bone_offset(mut self, offset: [f32; 16]) -> Self {
        self.bone_offset = Some(offset);
        self
    }
}

/// A single vertex influence
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawVertexWeight {
    pub vertex: u32,
    pub weight: f32,
}

/// A bone as referenced by one mesh's skin data
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawMeshBone {
    /// Must match a [`RawJoint::name`]
    pub name: String,
    /// Mesh bind space to bone space
    pub offset: [f32; 16],
    #[cfg_attr(feature = "serde", serde(default))]
    pub weights: Vec<RawVertexWeight>,
}

/// Skin data for one mesh
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawMeshSkin {
    pub name: String,
    pub vertex_count: u32,
    pub bones: Vec<RawMeshBone>,
}

/// Translation or scale keyframe
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawVec3Key {
    /// Time in ticks
    pub time: f64,
    pub value: Vec3,
}

/// Rotation keyframe, not necessarily normalized
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawQuatKey {
    /// Time in ticks
    pub time: f64,
    pub value: Quat,
}

/// Keyframes for one joint within one clip
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawChannel {
    /// Name of the animated joint
    pub joint: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub translation_keys: Vec<RawVec3Key>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub rotation_keys: Vec<RawQuatKey>,
    #[cfg_attr(feature = "serde", serde(default))]
    pub scale_keys: Vec<RawVec3Key>,
}

/// One animation clip as delivered by the importer
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct RawClip {
    pub name: String,
    pub duration_ticks: f64,
    /// Zero means unspecified
    #[cfg_attr(feature = "serde", serde(default))]
    pub ticks_per_second: f64,
    pub channels: Vec<RawChannel>,
}
