//! Bone name to bone index mapping

use std::collections::HashMap;

use glam::Mat4;

use crate::error::{AnimationError, Result};

/// Number of bones addressable by an 8-bit vertex attribute
pub const MAX_BONES: usize = 256;

/// Tolerance used when comparing offsets of a bone shared by several meshes
const OFFSET_EPSILON: f32 = 1e-4;

/// Bone indices in first-seen order plus their offset matrices
#[derive(Debug, Clone, Default)]
pub struct BoneMap {
    names: Vec<String>,
    offsets: Vec<Mat4>,
    lookup: HashMap<String, usize>,
    limit: usize,
}

impl BoneMap {
    /// Create an empty map that rejects more than `limit` bones
    ///
    /// The limit is capped at [`MAX_BONES`].
    pub fn new(limit: usize) -> Self {
        Self {
            names: Vec::new(),
            offsets: Vec::new(),
            lookup: HashMap::new(),
            limit: limit.min(MAX_BONES),
        }
    }

    /// Return the index for `name`, assigning the next free one if the name is new
    ///
    /// A name seen before keeps its index and its first offset. Fails when a
    /// new bone would exceed the limit.
    pub fn get_or_insert(&mut self, name: &str, offset: Mat4) -> Result<usize> {
        if let Some(&index) = self.lookup.get(name) {
            if !self.offsets[index].abs_diff_eq(offset, OFFSET_EPSILON) {
                log::warn!(
                    "Bone '{name}' has conflicting offsets across meshes or inline joint data, keeping the first"
                );
            }
            return Ok(index);
        }

        let index = self.names.len();
        if index >= self.limit {
            log::error!(
                "Bone '{name}' would be bone #{} but the limit is {}",
                index + 1,
                self.limit
            );
            return Err(AnimationError::TooManyBones {
                count: index + 1,
                limit: self.limit,
            });
        }

        log::trace!("Assigned bone index {index} to '{name}'");
        self.names.push(name.to_string());
        self.offsets.push(offset);
        self.lookup.insert(name.to_string(), index);
        Ok(index)
    }

    /// Look up the index of a bone by name
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.lookup.get(name).copied()
    }

    /// Number of bones
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Bone names ordered by bone index
    pub fn names(&self) -> &[String] {
        &self.names
    }

    /// Offset matrices ordered by bone index
    pub fn offsets(&self) -> &[Mat4] {
        &self.offsets
    }

    pub(crate) fn into_parts(self) -> (Vec<String>, Vec<Mat4>) {
        (self.names, self.offsets)
    }
}
