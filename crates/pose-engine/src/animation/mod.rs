//! Keyframed animation
//!
//! This module provides:
//! - Keyframe tracks with linear and spherical interpolation
//! - Animation clips bound to a skeleton's joint ids
//! - An animator that owns a clip library and a playback clock
//!
//! # Example
//!
//! ```rust,ignore
//! use pose_engine::{AnimationClip, Animator, BindPose, PoseEvaluator, Skeleton};
//!
//! let skeleton = Skeleton::build(&raw_joints, &raw_meshes)?;
//! let clip = AnimationClip::from_raw(&raw_clip, &skeleton)?;
//!
//! let evaluator = PoseEvaluator::new(&skeleton, &BindPose::resolve(&skeleton));
//! let mut animator = Animator::new(vec![clip]);
//!
//! let mut bones = vec![glam::Mat4::IDENTITY; skeleton.bone_count()];
//! animator.update(delta_seconds);
//! animator.evaluate(&evaluator, &mut bones)?;
//! ```

mod animator;
mod clip;
mod lerp;
mod track;

pub use animator::{Animator, WrapMode};
pub use clip::{AnimationClip, Channel, ClipOptions, DEFAULT_TICKS_PER_SECOND};
pub use lerp::{Lerp, normalize_or_identity};
pub use track::{Keyframe, Track, find_key_index, sample_keys};
