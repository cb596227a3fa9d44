//! CPU vertex skinning
//!
//! Applies evaluated bone transforms to bind-pose vertices using the
//! per-vertex influences collected while building the skeleton. This is the
//! same linear blend a vertex shader would do with the matrices from
//! [`PoseEvaluator`](crate::PoseEvaluator), useful for tools, picking and
//! tests.
//!
//! # Example
//!
//! ```rust,ignore
//! use pose_engine::skinning::{Skinner, SkinningOptions};
//!
//! let bones = evaluator.evaluate(&clip, time)?;
//! let skinner = Skinner::new(&bones, SkinningOptions::default());
//!
//! let skin = &skeleton.skins()[0];
//! let positions = skinner.skin_positions(&bind_positions, skin);
//! ```

use glam::{Mat4, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::skeleton::{SkinWeights, VertexBoneData};

/// Options for controlling the skinning behavior
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkinningOptions {
    /// Whether to divide by the sum of the used weights
    pub normalize_weights: bool,
    /// Minimum weight threshold - weights below this are ignored
    pub weight_threshold: f32,
}

impl Default for SkinningOptions {
    fn default() -> Self {
        Self {
            normalize_weights: true,
            weight_threshold: 0.001,
        }
    }
}

/// Linear blend skinning against one set of bone transforms
#[derive(Debug, Clone)]
pub struct Skinner<'a> {
    bone_transforms: &'a [Mat4],
    options: SkinningOptions,
}

impl<'a> Skinner<'a> {
    pub fn new(bone_transforms: &'a [Mat4], options: SkinningOptions) -> Self {
        Self {
            bone_transforms,
            options,
        }
    }

    /// Transform a bind-pose position by the vertex's influences
    ///
    /// Influences naming a bone outside the transform buffer are skipped. A
    /// vertex without usable weight keeps its bind position.
    pub fn skin_vertex(&self, position: Vec3, influences: &VertexBoneData) -> Vec3 {
        self.blend(influences, position, |matrix, p| matrix.transform_point3(p))
    }

    /// Transform a bind-pose normal by the vertex's influences
    ///
    /// Translation is ignored and the result is renormalized.
    pub fn skin_normal(&self, normal: Vec3, influences: &VertexBoneData) -> Vec3 {
        self.blend(influences, normal, |matrix, n| matrix.transform_vector3(n))
            .normalize_or(normal)
    }

    /// Skin every position of a mesh
    ///
    /// `positions` and `skin.vertices` are matched by index; surplus entries
    /// on either side are ignored.
    pub fn skin_positions(&self, positions: &[Vec3], skin: &SkinWeights) -> Vec<Vec3> {
        if positions.len() != skin.vertices.len() {
            log::warn!(
                "Mesh '{}': {} positions for {} weighted vertices",
                skin.mesh,
                positions.len(),
                skin.vertices.len()
            );
        }

        positions
            .iter()
            .zip(&skin.vertices)
            .map(|(&position, influences)| self.skin_vertex(position, influences))
            .collect()
    }

    /// Skin every normal of a mesh
    pub fn skin_normals(&self, normals: &[Vec3], skin: &SkinWeights) -> Vec<Vec3> {
        normals
            .iter()
            .zip(&skin.vertices)
            .map(|(&normal, influences)| self.skin_normal(normal, influences))
            .collect()
    }

    pub fn bone_count(&self) -> usize {
        self.bone_transforms.len()
    }

    /// Update skinning options
    pub fn set_options(&mut self, options: SkinningOptions) {
        self.options = options;
    }

    /// Get current skinning options
    pub fn options(&self) -> &SkinningOptions {
        &self.options
    }

    fn blend(
        &self,
        influences: &VertexBoneData,
        value: Vec3,
        transform: impl Fn(&Mat4, Vec3) -> Vec3,
    ) -> Vec3 {
        let mut blended = Vec3::ZERO;
        let mut total_weight = 0.0f32;

        for (bone_id, weight) in influences.influences() {
            if weight < self.options.weight_threshold {
                continue;
            }
            let Some(matrix) = self.bone_transforms.get(bone_id as usize) else {
                log::trace!("Bone id {bone_id} outside {} transforms", self.bone_count());
                continue;
            };

            blended += transform(matrix, value) * weight;
            total_weight += weight;
        }

        // If no valid bones influenced this vertex, return original value
        if total_weight < self.options.weight_threshold {
            return value;
        }

        if self.options.normalize_weights {
            blended /= total_weight;
        }
        blended
    }
}
