//! Skeleton hierarchy
//!
//! Joints are stored in an arena indexed by [`JointId`]. Ids are dense and
//! follow a pre-order depth-first walk from the root, visiting children in
//! the order the loader declared them, so `joints()[0]` is always the root
//! and a parent always has a smaller id than its children.
//!
//! Bone indices are a separate numbering used by skinned vertices and by the
//! output of the pose evaluator. See [`BoneMap`] for how they are assigned.

mod bone_map;
mod builder;
mod joint;
mod skin;

use std::collections::HashMap;

use glam::Mat4;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::raw::{RawJoint, RawMeshSkin};

pub use bone_map::{BoneMap, MAX_BONES};
pub use joint::{Joint, JointId};
pub use skin::{MAX_BONES_PER_VERTEX, SkinWeights, VertexBoneData};

/// Options for skeleton construction
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkeletonOptions {
    /// Maximum number of bones, never more than [`MAX_BONES`]
    pub max_bones: usize,
    /// Rescale each vertex's weights to sum to 1.0
    pub normalize_weights: bool,
}

impl Default for SkeletonOptions {
    fn default() -> Self {
        Self {
            max_bones: MAX_BONES,
            normalize_weights: true,
        }
    }
}

/// An immutable joint hierarchy with its bone table
#[derive(Debug, Clone)]
pub struct Skeleton {
    joints: Vec<Joint>,
    names: HashMap<String, JointId>,
    bone_names: Vec<String>,
    bone_offsets: Vec<Mat4>,
    bone_joints: Vec<Option<JointId>>,
    skins: Vec<SkinWeights>,
}

impl Skeleton {
    /// Build a skeleton with default options
    pub fn build(joints: &[RawJoint], meshes: &[RawMeshSkin]) -> Result<Self> {
        Self::build_with_options(joints, meshes, &SkeletonOptions::default())
    }

    /// Build a skeleton from the loader's joint list and mesh skin data
    pub fn build_with_options(
        joints: &[RawJoint],
        meshes: &[RawMeshSkin],
        options: &SkeletonOptions,
    ) -> Result<Self> {
        builder::build(joints, meshes, options)
    }

    /// The root joint
    pub fn root(&self) -> &Joint {
        &self.joints[0]
    }

    /// Get a joint by id
    pub fn joint(&self, id: JointId) -> Option<&Joint> {
        self.joints.get(id)
    }

    /// All joints, indexed by id
    pub fn joints(&self) -> &[Joint] {
        &self.joints
    }

    /// Look up a joint id by name
    pub fn joint_id(&self, name: &str) -> Option<JointId> {
        self.names.get(name).copied()
    }

    /// Look up a joint by name
    pub fn joint_by_name(&self, name: &str) -> Option<&Joint> {
        self.joint_id(name).map(|id| &self.joints[id])
    }

    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn bone_count(&self) -> usize {
        self.bone_offsets.len()
    }

    /// Offset matrix of a bone
    pub fn bone_offset(&self, bone_index: usize) -> Option<Mat4> {
        self.bone_offsets.get(bone_index).copied()
    }

    /// Offset matrices, indexed by bone index
    pub fn bone_offsets(&self) -> &[Mat4] {
        &self.bone_offsets
    }

    /// Bone name, indexed by bone index
    pub fn bone_name(&self, bone_index: usize) -> Option<&str> {
        self.bone_names.get(bone_index).map(String::as_str)
    }

    /// Joint that drives a bone, if any
    pub fn bone_joint(&self, bone_index: usize) -> Option<JointId> {
        self.bone_joints.get(bone_index).copied().flatten()
    }

    /// Look up a bone index by name
    pub fn bone_index(&self, name: &str) -> Option<usize> {
        self.joint_by_name(name).and_then(|joint| joint.bone_index)
    }

    /// Per-mesh vertex weights collected during construction
    pub fn skins(&self) -> &[SkinWeights] {
        &self.skins
    }

    /// Walk joint ids in pre-order, children in declaration order
    ///
    /// This is the order used by the bind-pose resolver and the pose
    /// evaluator; it also equals ascending id order.
    pub fn depth_first(&self) -> DepthFirst<'_> {
        DepthFirst {
            joints: &self.joints,
            stack: vec![0],
        }
    }
}

/// Pre-order joint iterator backed by an explicit stack
#[derive(Debug, Clone)]
pub struct DepthFirst<'a> {
    joints: &'a [Joint],
    stack: Vec<JointId>,
}

impl Iterator for DepthFirst<'_> {
    type Item = JointId;

    fn next(&mut self) -> Option<Self::Item> {
        let id = self.stack.pop()?;
        self.stack
            .extend(self.joints[id].children.iter().rev().copied());
        Some(id)
    }
}
