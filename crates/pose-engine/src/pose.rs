//! Pose evaluation
//!
//! Turns a clip sampled at a point in time into one skinning matrix per bone:
//!
//! ```text
//! world[joint]      = world[parent] * local[joint]
//! local[joint]      = T * R * S sampled from the joint's channel, or the bind transform
//! skinning[bone]    = global_inverse * world[joint] * offset[bone]
//! ```
//!
//! The hierarchy is walked with an explicit stack so stack usage does not
//! depend on skeleton depth.

use glam::Mat4;

use crate::animation::AnimationClip;
use crate::bind_pose::BindPose;
use crate::error::{AnimationError, Result};
use crate::skeleton::{Joint, JointId, Skeleton};

/// Evaluates poses for one skeleton
///
/// Holds only shared references and a copy of the bind data, so several
/// evaluators can run against the same skeleton concurrently.
#[derive(Debug, Clone, Copy)]
pub struct PoseEvaluator<'a> {
    skeleton: &'a Skeleton,
    bind_pose: BindPose,
}

impl<'a> PoseEvaluator<'a> {
    pub fn new(skeleton: &'a Skeleton, bind_pose: &BindPose) -> Self {
        Self {
            skeleton,
            bind_pose: *bind_pose,
        }
    }

    /// Resolve the bind pose with the default reference bone and bind it
    pub fn for_skeleton(skeleton: &'a Skeleton) -> Self {
        Self::new(skeleton, &BindPose::resolve(skeleton))
    }

    pub fn skeleton(&self) -> &'a Skeleton {
        self.skeleton
    }

    pub fn bind_pose(&self) -> &BindPose {
        &self.bind_pose
    }

    /// Number of matrices `animate` writes
    pub fn bone_count(&self) -> usize {
        self.skeleton.bone_count()
    }

    /// Pose `clip` at `time` seconds since playback start, looping the clip
    ///
    /// `bone_transforms` must hold exactly one matrix per bone. Only entries of
    /// bones that are driven by a joint are written; nothing is written when
    /// an error is returned.
    pub fn animate(
        &self,
        clip: &AnimationClip,
        time_seconds: f64,
        bone_transforms: &mut [Mat4],
    ) -> Result<()> {
        self.animate_ticks(clip, clip.animation_time(time_seconds), bone_transforms)
    }

    /// Pose `clip` at an already wrapped clip time in ticks
    pub fn animate_ticks(
        &self,
        clip: &AnimationClip,
        ticks: f64,
        bone_transforms: &mut [Mat4],
    ) -> Result<()> {
        self.check_buffer(bone_transforms)?;
        self.check_clip(clip)?;

        let global_inverse = self.bind_pose.global_inverse();
        let offsets = self.skeleton.bone_offsets();
        self.walk(Some((clip, ticks)), |joint, world| {
            if let Some(bone) = joint.bone_index {
                bone_transforms[bone] = global_inverse * world * offsets[bone];
            }
        });
        Ok(())
    }

    /// Pose `clip` into a newly allocated buffer
    ///
    /// Bones without a driving joint are left as identity.
    pub fn evaluate(&self, clip: &AnimationClip, time_seconds: f64) -> Result<Vec<Mat4>> {
        let mut transforms = vec![Mat4::IDENTITY; self.bone_count()];
        self.animate(clip, time_seconds, &mut transforms)?;
        Ok(transforms)
    }

    /// Skinning matrices for the unanimated bind pose
    pub fn bind_pose_transforms(&self, bone_transforms: &mut [Mat4]) -> Result<()> {
        self.check_buffer(bone_transforms)?;

        let global_inverse = self.bind_pose.global_inverse();
        let offsets = self.skeleton.bone_offsets();
        self.walk(None, |joint, world| {
            if let Some(bone) = joint.bone_index {
                bone_transforms[bone] = global_inverse * world * offsets[bone];
            }
        });
        Ok(())
    }

    /// Accumulated transform of every joint, indexed by joint id
    ///
    /// With `clip` set to `None` this is the bind pose hierarchy. The global
    /// inverse is not applied.
    pub fn world_transforms(
        &self,
        clip: Option<&AnimationClip>,
        time_seconds: f64,
    ) -> Result<Vec<Mat4>> {
        let sample = match clip {
            Some(clip) => {
                self.check_clip(clip)?;
                Some((clip, clip.animation_time(time_seconds)))
            }
            None => None,
        };

        let mut world = vec![Mat4::IDENTITY; self.skeleton.joint_count()];
        self.walk(sample, |joint, transform| world[joint.id] = transform);
        Ok(world)
    }

    /// Depth-first walk calling `visit` with each joint's accumulated transform
    fn walk(&self, sample: Option<(&AnimationClip, f64)>, mut visit: impl FnMut(&Joint, Mat4)) {
        let joints = self.skeleton.joints();
        let mut stack: Vec<(JointId, Mat4)> = vec![(0, Mat4::IDENTITY)];

        while let Some((id, parent_world)) = stack.pop() {
            let joint = &joints[id];
            let local = sample
                .and_then(|(clip, ticks)| {
                    clip.channel(id)
                        .and_then(|channel| channel.local_transform(ticks))
                })
                .unwrap_or(joint.local_bind_transform);
            let world = parent_world * local;

            visit(joint, world);

            for &child in joint.children.iter().rev() {
                stack.push((child, world));
            }
        }
    }

    fn check_buffer(&self, bone_transforms: &[Mat4]) -> Result<()> {
        let expected = self.skeleton.bone_count();
        if bone_transforms.len() != expected {
            log::error!(
                "Bone transform buffer holds {} matrices, skeleton has {expected} bones",
                bone_transforms.len()
            );
            return Err(AnimationError::BufferSizeMismatch {
                expected,
                actual: bone_transforms.len(),
            });
        }
        Ok(())
    }

    fn check_clip(&self, clip: &AnimationClip) -> Result<()> {
        let expected = self.skeleton.joint_count();
        if clip.channel_count() != expected {
            log::error!(
                "Clip '{}' has {} channels, skeleton has {expected} joints",
                clip.name(),
                clip.channel_count()
            );
            return Err(AnimationError::ChannelCountMismatch {
                clip: clip.name().to_string(),
                expected,
                actual: clip.channel_count(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::animation::{Channel, Keyframe, Track};
    use crate::raw::{IDENTITY_MATRIX, RawJoint, RawMeshBone, RawMeshSkin};
    use glam::{Quat, Vec3};

    fn bone(name: &str) -> RawMeshBone {
        RawMeshBone {
            name: name.to_string(),
            offset: IDENTITY_MATRIX,
            weights: Vec::new(),
        }
    }

    /// root -> child, both bones, child offset by one unit along X
    fn two_bone_skeleton() -> Skeleton {
        let joints = vec![
            RawJoint::new(0, "root", None),
            RawJoint::new(1, "child", Some(0))
                .with_bind_transform(Mat4::from_translation(Vec3::X).to_cols_array()),
        ];
        let meshes = vec![RawMeshSkin {
            name: "body".to_string(),
            vertex_count: 0,
            bones: vec![bone("root"), bone("child")],
        }];
        Skeleton::build(&joints, &meshes).unwrap()
    }

    fn empty_clip(skeleton: &Skeleton) -> AnimationClip {
        AnimationClip::new(
            "empty",
            10.0,
            10.0,
            vec![Channel::default(); skeleton.joint_count()],
        )
        .unwrap()
    }

    #[test]
    fn test_empty_channels_use_bind_pose() {
        let skeleton = two_bone_skeleton();
        let evaluator = PoseEvaluator::for_skeleton(&skeleton);

        let animated = evaluator.evaluate(&empty_clip(&skeleton), 0.3).unwrap();
        let mut bind = vec![Mat4::ZERO; 2];
        evaluator.bind_pose_transforms(&mut bind).unwrap();

        assert_eq!(animated, bind);
        assert!(bind[1].abs_diff_eq(Mat4::from_translation(Vec3::X), 1e-6));
    }

    #[test]
    fn test_parent_motion_propagates() {
        let skeleton = two_bone_skeleton();
        let evaluator = PoseEvaluator::for_skeleton(&skeleton);

        let mut channels = vec![Channel::default(); 2];
        channels[0].translation = Track::new(vec![
            Keyframe::new(0.0, Vec3::ZERO),
            Keyframe::new(10.0, Vec3::new(0.0, 10.0, 0.0)),
        ]);
        let clip = AnimationClip::new("lift", 10.0, 10.0, channels).unwrap();

        // 0.5 s at 10 ticks/s = tick 5
        let transforms = evaluator.evaluate(&clip, 0.5).unwrap();
        let child_origin = transforms[1].transform_point3(Vec3::ZERO);
        assert!(child_origin.abs_diff_eq(Vec3::new(1.0, 5.0, 0.0), 1e-5));
    }

    #[test]
    fn test_buffer_size_mismatch_writes_nothing() {
        let skeleton = two_bone_skeleton();
        let evaluator = PoseEvaluator::for_skeleton(&skeleton);
        let clip = empty_clip(&skeleton);

        let mut short = vec![Mat4::ZERO; 1];
        assert_eq!(
            evaluator.animate(&clip, 0.0, &mut short),
            Err(AnimationError::BufferSizeMismatch {
                expected: 2,
                actual: 1
            })
        );
        assert_eq!(short, vec![Mat4::ZERO]);
    }

    #[test]
    fn test_channel_count_mismatch() {
        let skeleton = two_bone_skeleton();
        let evaluator = PoseEvaluator::for_skeleton(&skeleton);
        let clip = AnimationClip::new("other", 1.0, 1.0, vec![Channel::default(); 5]).unwrap();

        let mut out = vec![Mat4::ZERO; 2];
        assert!(matches!(
            evaluator.animate(&clip, 0.0, &mut out),
            Err(AnimationError::ChannelCountMismatch { expected: 2, actual: 5, .. })
        ));
        assert_eq!(out, vec![Mat4::ZERO; 2]);
    }

    #[test]
    fn test_non_bone_joints_do_not_write() {
        // Only "child" is a bone; the root contributes its transform but owns no slot
        let joints = vec![
            RawJoint::new(0, "root", None)
                .with_bind_transform(Mat4::from_translation(Vec3::Z).to_cols_array()),
            RawJoint::new(1, "child", Some(0)),
        ];
        let meshes = vec![RawMeshSkin {
            name: "body".to_string(),
            vertex_count: 0,
            bones: vec![bone("child")],
        }];
        let skeleton = Skeleton::build(&joints, &meshes).unwrap();
        let evaluator = PoseEvaluator::for_skeleton(&skeleton);

        let world = evaluator.world_transforms(None, 0.0).unwrap();
        assert!(world[1].abs_diff_eq(Mat4::from_translation(Vec3::Z), 1e-6));

        // The global inverse cancels the root translation for the reference bone
        let mut out = vec![Mat4::ZERO; 1];
        evaluator.bind_pose_transforms(&mut out).unwrap();
        assert!(out[0].abs_diff_eq(Mat4::IDENTITY, 1e-6));
    }

    #[test]
    fn test_world_transforms_follow_clip() {
        let skeleton = two_bone_skeleton();
        let evaluator = PoseEvaluator::for_skeleton(&skeleton);

        let mut channels = vec![Channel::default(); 2];
        channels[0].rotation = Track::new(vec![Keyframe::new(
            0.0,
            Quat::from_rotation_z(std::f32::consts::PI),
        )]);
        let clip = AnimationClip::new("flip", 4.0, 1.0, channels).unwrap();

        let world = evaluator.world_transforms(Some(&clip), 1.0).unwrap();
        let child = world[1].transform_point3(Vec3::ZERO);
        assert!(child.abs_diff_eq(Vec3::new(-1.0, 0.0, 0.0), 1e-5));
    }
}
