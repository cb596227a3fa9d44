//! Global inverse bind matrix
//!
//! Exported animation data is expressed relative to the space of the first
//! bone, not the skeleton root. The global inverse moves the composed world
//! transforms back into that space:
//!
//! ```text
//! global_inverse = inverse(accumulated(first bone) * offset(first bone))
//! ```
//!
//! "First" means first in the skeleton's depth-first order, which makes the
//! result depend on how the asset was exported. [`ReferenceBone::Named`]
//! pins the reference bone explicitly for assets where that matters.

use glam::Mat4;

use crate::error::{AnimationError, Result};
use crate::skeleton::{JointId, Skeleton};

/// Selects the bone that defines animation space
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ReferenceBone {
    /// First joint with a bone index in depth-first order
    #[default]
    FirstFound,
    /// The bone driven by the joint with this name
    Named(String),
}

/// Per-skeleton bind data computed once after loading
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BindPose {
    global_inverse: Mat4,
    reference_joint: Option<JointId>,
}

impl BindPose {
    /// Resolve using the first bone found in depth-first order
    ///
    /// A skeleton without bones yields the identity.
    pub fn resolve(skeleton: &Skeleton) -> Self {
        let mut accumulated = vec![Mat4::IDENTITY; skeleton.joint_count()];

        for id in skeleton.depth_first() {
            let joint = &skeleton.joints()[id];
            let parent = joint.parent.map_or(Mat4::IDENTITY, |p| accumulated[p]);
            accumulated[id] = parent * joint.local_bind_transform;

            if let Some(bone) = joint.bone_index {
                log::debug!(
                    "Global inverse derived from joint '{}' (bone {bone})",
                    joint.name
                );
                return Self::from_reference(skeleton, id, accumulated[id], bone);
            }
        }

        log::warn!("Skeleton has no bones, global inverse is identity");
        Self::identity()
    }

    /// Resolve against an explicitly chosen reference bone
    pub fn resolve_with(skeleton: &Skeleton, reference: &ReferenceBone) -> Result<Self> {
        match reference {
            ReferenceBone::FirstFound => Ok(Self::resolve(skeleton)),
            ReferenceBone::Named(name) => {
                let joint = skeleton
                    .joint_by_name(name)
                    .ok_or_else(|| AnimationError::UnknownReferenceBone(name.clone()))?;
                let bone = joint.bone_index.ok_or_else(|| {
                    AnimationError::UnknownReferenceBone(format!("'{name}' is not a bone"))
                })?;
                let accumulated = accumulated_bind_transform(skeleton, joint.id);
                Ok(Self::from_reference(skeleton, joint.id, accumulated, bone))
            }
        }
    }

    /// Bind data with an identity global inverse
    pub fn identity() -> Self {
        Self {
            global_inverse: Mat4::IDENTITY,
            reference_joint: None,
        }
    }

    pub fn global_inverse(&self) -> Mat4 {
        self.global_inverse
    }

    /// Joint whose bone defined the global inverse
    pub fn reference_joint(&self) -> Option<JointId> {
        self.reference_joint
    }

    fn from_reference(
        skeleton: &Skeleton,
        joint: JointId,
        accumulated: Mat4,
        bone: usize,
    ) -> Self {
        let offset = skeleton.bone_offset(bone).unwrap_or(Mat4::IDENTITY);
        let reference = accumulated * offset;
        let determinant = reference.determinant();
        if determinant == 0.0 || !determinant.is_finite() {
            log::warn!(
                "Reference bone of joint {joint} has a singular bind transform, global inverse is identity"
            );
            return Self {
                global_inverse: Mat4::IDENTITY,
                reference_joint: Some(joint),
            };
        }

        Self {
            global_inverse: reference.inverse(),
            reference_joint: Some(joint),
        }
    }
}

impl Default for BindPose {
    fn default() -> Self {
        Self::identity()
    }
}

/// Product of the local bind transforms from the root down to `joint`
pub fn accumulated_bind_transform(skeleton: &Skeleton, joint: JointId) -> Mat4 {
    let mut transform = Mat4::IDENTITY;
    let mut current = skeleton.joint(joint);
    while let Some(node) = current {
        transform = node.local_bind_transform * transform;
        current = node.parent.and_then(|parent| skeleton.joint(parent));
    }
    transform
}
