//! Skeleton joint nodes

use glam::Mat4;

/// Dense joint id, assigned in depth-first traversal order starting at 0
pub type JointId = usize;

/// A node in the skeleton hierarchy
///
/// Joints live in the [`Skeleton`](super::Skeleton) arena. Parent and child
/// links are arena indices, so a joint never owns or outlives another joint.
#[derive(Debug, Clone, PartialEq)]
pub struct Joint {
    /// Position of this joint in the arena
    pub id: JointId,
    /// Node name, unique within a well-formed skeleton
    pub name: String,
    /// Node-relative bind transform
    pub local_bind_transform: Mat4,
    /// Parent joint (`None` for the root)
    pub parent: Option<JointId>,
    /// Children in declaration order
    pub children: Vec<JointId>,
    /// Bone index if this joint influences the skin
    pub bone_index: Option<usize>,
}

impl Joint {
    pub(crate) fn new(
        id: JointId,
        name: String,
        local_bind_transform: Mat4,
        parent: Option<JointId>,
    ) -> Self {
        Self {
            id,
            name,
            local_bind_transform,
            parent,
            children: Vec::new(),
            bone_index: None,
        }
    }

    /// Check if this joint is the hierarchy root
    pub fn is_root(&self) -> bool {
        self.parent.is_none()
    }

    /// Check if this joint carries a bone index
    pub fn is_bone(&self) -> bool {
        self.bone_index.is_some()
    }
}
