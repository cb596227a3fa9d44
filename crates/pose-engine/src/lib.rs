//! Skeletal animation and pose evaluation for skinned meshes
//!
//! The crate takes an already imported skeleton (a flat joint list plus
//! per-mesh bone weights) and keyframed clips, and produces one 4x4 matrix
//! per bone, ready to upload for GPU skinning:
//!
//! 1. [`Skeleton::build`] turns the joint list into an arena with dense
//!    depth-first ids and assigns bone indices from the mesh skin data.
//! 2. [`BindPose::resolve`] derives the global inverse matrix once.
//! 3. [`PoseEvaluator::animate`] samples a clip and composes the hierarchy
//!    into the output buffer, every frame.
//! 4. Optionally, [`DynamicBoneCorrector::apply`] lets selected bones trail
//!    their animated pose on damped springs.
//!
//! # Example
//!
//! ```rust,ignore
//! use pose_engine::{AnimationClip, BindPose, PoseEvaluator, Skeleton};
//!
//! let skeleton = Skeleton::build(&raw_joints, &raw_meshes)?;
//! let bind_pose = BindPose::resolve(&skeleton);
//! let clip = AnimationClip::from_raw(&raw_clip, &skeleton)?;
//!
//! let evaluator = PoseEvaluator::new(&skeleton, &bind_pose);
//! let mut bones = vec![glam::Mat4::IDENTITY; skeleton.bone_count()];
//! evaluator.animate(&clip, elapsed_seconds, &mut bones)?;
//! ```

pub mod animation;
pub mod bind_pose;
pub mod dynamics;
pub mod error;
pub mod pose;
pub mod raw;
pub mod skeleton;
pub mod skinning;

// Re-export common types
pub use animation::{AnimationClip, Animator, Channel, ClipOptions, Keyframe, Track, WrapMode};
pub use bind_pose::{BindPose, ReferenceBone};
pub use dynamics::{DynamicBoneCorrector, SpringCoefficients, SpringConfig, SpringParams};
pub use error::{AnimationError, Result};
pub use pose::PoseEvaluator;
pub use skeleton::{Joint, JointId, Skeleton, SkeletonOptions, SkinWeights};
pub use skinning::{Skinner, SkinningOptions};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
