//! Spring-driven secondary motion for individual bones
//!
//! Runs after pose evaluation. For each controlled bone the skinning matrix
//! `M = global_inverse * world * offset` is turned back into the bone's frame
//! `F = M * offset^-1`, whose translation and rotation are the spring targets.
//! The simulated frame replaces `F` and is written back as `F' * offset`.

use std::collections::BTreeMap;

use glam::{Mat4, Quat, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::spring::SpringCoefficients;
use crate::animation::normalize_or_identity;
use crate::error::{AnimationError, Result};
use crate::skeleton::Skeleton;

/// Default simulation rate
pub const DEFAULT_TIME_STEP: f32 = 1.0 / 60.0;

/// Stiffness and damping of one spring
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpringParams {
    /// Radians per second
    pub angular_frequency: f32,
    /// 1.0 is critically damped
    pub damping_ratio: f32,
}

impl SpringParams {
    pub const fn new(angular_frequency: f32, damping_ratio: f32) -> Self {
        Self {
            angular_frequency,
            damping_ratio,
        }
    }

    fn coefficients(&self, time_step: f32) -> SpringCoefficients {
        SpringCoefficients::compute(time_step, self.angular_frequency, self.damping_ratio)
    }
}

impl Default for SpringParams {
    fn default() -> Self {
        Self::new(10.0, 0.5)
    }
}

/// Spring setup for a dynamic bone
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SpringConfig {
    /// Seconds advanced by each call to [`DynamicBoneCorrector::apply`]
    pub time_step: f32,
    /// Spring on the bone's position
    pub linear: SpringParams,
    /// Spring on the bone's orientation, `None` to reuse `linear`
    #[cfg_attr(feature = "serde", serde(default))]
    pub angular: Option<SpringParams>,
}

impl SpringConfig {
    fn validate(&self) -> Result<()> {
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(AnimationError::InvalidSpringConfig(format!(
                "time step {} must be positive",
                self.time_step
            )));
        }

        let params = [Some(self.linear), self.angular];
        for spring in params.iter().flatten() {
            if !spring.angular_frequency.is_finite() || !spring.damping_ratio.is_finite() {
                return Err(AnimationError::InvalidSpringConfig(format!(
                    "non-finite spring parameters {spring:?}"
                )));
            }
        }
        Ok(())
    }

    fn angular_params(&self) -> SpringParams {
        self.angular.unwrap_or(self.linear)
    }
}

impl Default for SpringConfig {
    fn default() -> Self {
        Self {
            time_step: DEFAULT_TIME_STEP,
            linear: SpringParams::default(),
            angular: None,
        }
    }
}

/// Simulated state of one bone
#[derive(Debug, Clone, PartialEq)]
pub struct DynamicBoneState {
    offset: Mat4,
    inverse_offset: Mat4,
    linear: SpringCoefficients,
    angular: SpringCoefficients,
    /// Simulated translation of the bone frame
    pub position: Vec3,
    pub velocity: Vec3,
    /// Simulated rotation of the bone frame
    pub orientation: Quat,
    /// Scaled-axis rate in the animated frame
    pub angular_velocity: Vec3,
    initialized: bool,
}

impl DynamicBoneState {
    fn new(offset: Mat4, config: &SpringConfig) -> Self {
        let (offset, inverse_offset) = if offset.determinant().abs() > f32::EPSILON {
            (offset, offset.inverse())
        } else {
            log::warn!("Dynamic bone offset is singular, treating it as identity");
            (Mat4::IDENTITY, Mat4::IDENTITY)
        };

        Self {
            offset,
            inverse_offset,
            linear: config.linear.coefficients(config.time_step),
            angular: config.angular_params().coefficients(config.time_step),
            position: Vec3::ZERO,
            velocity: Vec3::ZERO,
            orientation: Quat::IDENTITY,
            angular_velocity: Vec3::ZERO,
            initialized: false,
        }
    }

    /// Check if the state has been seeded from an animated pose
    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    fn reset(&mut self) {
        self.velocity = Vec3::ZERO;
        self.angular_velocity = Vec3::ZERO;
        self.initialized = false;
    }

    /// Advance one step toward `bone_transform` and return the corrected matrix
    fn step(&mut self, bone_transform: Mat4) -> Mat4 {
        let frame = bone_transform * self.inverse_offset;
        let (scale, target_rotation, target_position) = frame.to_scale_rotation_translation();
        if !target_position.is_finite() || !target_rotation.is_finite() {
            log::trace!("Skipping dynamic bone with non-finite frame");
            return bone_transform;
        }
        let target_rotation = normalize_or_identity(target_rotation);

        if !self.initialized {
            self.position = target_position;
            self.orientation = target_rotation;
            self.velocity = Vec3::ZERO;
            self.angular_velocity = Vec3::ZERO;
            self.initialized = true;
            return bone_transform;
        }

        (self.position, self.velocity) =
            self.linear.step(self.position, self.velocity, target_position);

        // Orientation error relative to the animated frame, shortest arc
        let mut error = target_rotation.inverse() * self.orientation;
        if error.w < 0.0 {
            error = -error;
        }
        let (angular_offset, angular_velocity) =
            self.angular.step(error.to_scaled_axis(), self.angular_velocity, Vec3::ZERO);
        self.angular_velocity = angular_velocity;
        self.orientation =
            normalize_or_identity(target_rotation * Quat::from_scaled_axis(angular_offset));

        Mat4::from_scale_rotation_translation(scale, self.orientation, self.position) * self.offset
    }
}

/// Applies damped-spring lag to selected bones after pose evaluation
///
/// Stateful: every [`apply`](Self::apply) advances the simulation by one
/// time step, so calling it twice with the same pose does not give the same
/// result.
#[derive(Debug, Clone, Default)]
pub struct DynamicBoneCorrector {
    bones: BTreeMap<usize, DynamicBoneState>,
}

impl DynamicBoneCorrector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Put `bone` under spring control
    ///
    /// Replaces any existing state for the bone. The next `apply` snaps the
    /// bone to its animated pose.
    pub fn add_bone(
        &mut self,
        skeleton: &Skeleton,
        bone: usize,
        config: &SpringConfig,
    ) -> Result<()> {
        config.validate()?;
        let offset = skeleton
            .bone_offset(bone)
            .ok_or(AnimationError::BoneIndexOutOfRange {
                index: bone,
                count: skeleton.bone_count(),
            })?;

        log::debug!(
            "Dynamic bone {bone} ('{}') added, omega {} zeta {}",
            skeleton.bone_name(bone).unwrap_or("?"),
            config.linear.angular_frequency,
            config.linear.damping_ratio
        );
        self.bones.insert(bone, DynamicBoneState::new(offset, config));
        Ok(())
    }

    /// Release `bone` from spring control
    pub fn remove_bone(&mut self, bone: usize) -> Option<DynamicBoneState> {
        self.bones.remove(&bone)
    }

    /// Forget all motion; the next `apply` snaps every bone to its animated pose
    pub fn reset(&mut self) {
        for state in self.bones.values_mut() {
            state.reset();
        }
    }

    pub fn state(&self, bone: usize) -> Option<&DynamicBoneState> {
        self.bones.get(&bone)
    }

    /// Controlled bone indices in ascending order
    pub fn bones(&self) -> impl Iterator<Item = usize> + '_ {
        self.bones.keys().copied()
    }

    pub fn len(&self) -> usize {
        self.bones.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bones.is_empty()
    }

    /// Move a bone away from its simulated position
    ///
    /// Returns `false` if the bone is not controlled or not yet initialized.
    pub fn displace(&mut self, bone: usize, translation: Vec3) -> bool {
        match self.bones.get_mut(&bone) {
            Some(state) if state.initialized => {
                state.position += translation;
                true
            }
            _ => false,
        }
    }

    /// Add linear and angular velocity to a bone
    ///
    /// `angular` is a scaled axis in radians per second. Returns `false` if
    /// the bone is not controlled or not yet initialized, since the first
    /// `apply` snaps the bone at rest.
    pub fn apply_impulse(&mut self, bone: usize, linear: Vec3, angular: Vec3) -> bool {
        match self.bones.get_mut(&bone) {
            Some(state) if state.initialized => {
                state.velocity += linear;
                state.angular_velocity += angular;
                true
            }
            _ => false,
        }
    }

    /// Advance every controlled bone one time step
    ///
    /// Overwrites only the entries of controlled bones. Fails without writing
    /// if any controlled bone lies outside `bone_transforms`.
    pub fn apply(&mut self, bone_transforms: &mut [Mat4]) -> Result<()> {
        if let Some((&index, _)) = self.bones.last_key_value()
            && index >= bone_transforms.len()
        {
            return Err(AnimationError::BoneIndexOutOfRange {
                index,
                count: bone_transforms.len(),
            });
        }

        for (&bone, state) in &mut self.bones {
            bone_transforms[bone] = state.step(bone_transforms[bone]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{IDENTITY_MATRIX, RawJoint, RawMeshBone, RawMeshSkin};
    use std::f32::consts::FRAC_PI_2;

    const HEAD_OFFSET: Vec3 = Vec3::new(0.0, -1.5, 0.0);

    /// "body" with identity offset, "head" offset down by 1.5
    fn skeleton() -> Skeleton {
        let joints = vec![
            RawJoint::new(0, "body", None),
            RawJoint::new(1, "head", Some(0)),
        ];
        let meshes = vec![RawMeshSkin {
            name: "mesh".to_string(),
            vertex_count: 0,
            bones: vec![
                RawMeshBone {
                    name: "body".to_string(),
                    offset: IDENTITY_MATRIX,
                    weights: Vec::new(),
                },
                RawMeshBone {
                    name: "head".to_string(),
                    offset: Mat4::from_translation(HEAD_OFFSET).to_cols_array(),
                    weights: Vec::new(),
                },
            ],
        }];
        Skeleton::build(&joints, &meshes).unwrap()
    }

    fn head_matrix(position: Vec3, rotation: Quat) -> Mat4 {
        Mat4::from_rotation_translation(rotation, position) * Mat4::from_translation(HEAD_OFFSET)
    }

    fn critical() -> SpringConfig {
        SpringConfig {
            linear: SpringParams::new(8.0, 1.0),
            ..SpringConfig::default()
        }
    }

    #[test]
    fn test_first_apply_snaps() {
        let skeleton = skeleton();
        let mut corrector = DynamicBoneCorrector::new();
        corrector.add_bone(&skeleton, 1, &critical()).unwrap();

        let animated = head_matrix(Vec3::new(0.0, 1.5, 0.0), Quat::IDENTITY);
        let mut transforms = vec![Mat4::IDENTITY, animated];
        corrector.apply(&mut transforms).unwrap();

        assert_eq!(transforms[1], animated);
        let state = corrector.state(1).unwrap();
        assert!(state.is_initialized());
        assert!(state.position.abs_diff_eq(Vec3::new(0.0, 1.5, 0.0), 1e-5));
    }

    #[test]
    fn test_position_lags_then_converges() {
        let skeleton = skeleton();
        let mut corrector = DynamicBoneCorrector::new();
        corrector.add_bone(&skeleton, 1, &critical()).unwrap();

        let mut transforms = vec![Mat4::IDENTITY, head_matrix(Vec3::ZERO, Quat::IDENTITY)];
        corrector.apply(&mut transforms).unwrap();

        let target = Vec3::new(1.0, 0.0, 0.0);
        transforms[1] = head_matrix(target, Quat::IDENTITY);
        corrector.apply(&mut transforms).unwrap();

        let lagging = corrector.state(1).unwrap().position;
        assert!(lagging.x > 0.0 && lagging.x < 1.0, "x = {}", lagging.x);

        for _ in 0..300 {
            transforms[1] = head_matrix(target, Quat::IDENTITY);
            corrector.apply(&mut transforms).unwrap();
        }
        assert!(transforms[1].abs_diff_eq(head_matrix(target, Quat::IDENTITY), 1e-3));
        // Unmanaged bones are untouched
        assert_eq!(transforms[0], Mat4::IDENTITY);
    }

    #[test]
    fn test_orientation_lags_then_converges() {
        let skeleton = skeleton();
        let mut corrector = DynamicBoneCorrector::new();
        corrector.add_bone(&skeleton, 1, &critical()).unwrap();

        let mut transforms = vec![Mat4::IDENTITY, head_matrix(Vec3::ZERO, Quat::IDENTITY)];
        corrector.apply(&mut transforms).unwrap();

        let turned = Quat::from_rotation_z(FRAC_PI_2);
        transforms[1] = head_matrix(Vec3::ZERO, turned);
        corrector.apply(&mut transforms).unwrap();

        let angle = corrector.state(1).unwrap().orientation.angle_between(Quat::IDENTITY);
        assert!(angle > 0.0 && angle < FRAC_PI_2, "angle = {angle}");

        for _ in 0..300 {
            transforms[1] = head_matrix(Vec3::ZERO, turned);
            corrector.apply(&mut transforms).unwrap();
        }
        let orientation = corrector.state(1).unwrap().orientation;
        assert!(orientation.angle_between(turned) < 1e-3);
    }

    #[test]
    fn test_displace_springs_back() {
        let skeleton = skeleton();
        let mut corrector = DynamicBoneCorrector::new();
        corrector.add_bone(&skeleton, 0, &critical()).unwrap();
        assert!(!corrector.displace(0, Vec3::X));

        let mut transforms = vec![Mat4::IDENTITY, Mat4::IDENTITY];
        corrector.apply(&mut transforms).unwrap();
        assert!(corrector.displace(0, Vec3::X));

        corrector.apply(&mut transforms).unwrap();
        let x = transforms[0].w_axis.x;
        assert!(x > 0.0 && x < 1.0, "x = {x}");
        assert!(!corrector.displace(5, Vec3::X));
    }

    #[test]
    fn test_impulse_moves_bone() {
        let skeleton = skeleton();
        let mut corrector = DynamicBoneCorrector::new();
        corrector.add_bone(&skeleton, 0, &critical()).unwrap();

        // Not seeded yet, so the impulse is refused rather than lost in the snap
        assert!(!corrector.apply_impulse(0, Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO));
        let mut transforms = vec![Mat4::IDENTITY, Mat4::IDENTITY];
        corrector.apply(&mut transforms).unwrap();
        assert_eq!(corrector.state(0).unwrap().velocity, Vec3::ZERO);

        assert!(corrector.apply_impulse(0, Vec3::new(0.0, 3.0, 0.0), Vec3::ZERO));
        corrector.apply(&mut transforms).unwrap();
        assert!(transforms[0].w_axis.y > 0.0);
        assert!(!corrector.apply_impulse(7, Vec3::Y, Vec3::ZERO));
    }

    #[test]
    fn test_reset_snaps_again() {
        let skeleton = skeleton();
        let mut corrector = DynamicBoneCorrector::new();
        corrector.add_bone(&skeleton, 0, &critical()).unwrap();

        let mut transforms = vec![Mat4::IDENTITY, Mat4::IDENTITY];
        corrector.apply(&mut transforms).unwrap();

        corrector.reset();
        let moved = Mat4::from_translation(Vec3::new(4.0, 0.0, 0.0));
        transforms[0] = moved;
        corrector.apply(&mut transforms).unwrap();
        assert_eq!(transforms[0], moved);
    }

    #[test]
    fn test_out_of_range_bones() {
        let skeleton = skeleton();
        let mut corrector = DynamicBoneCorrector::new();
        assert_eq!(
            corrector.add_bone(&skeleton, 2, &critical()),
            Err(AnimationError::BoneIndexOutOfRange { index: 2, count: 2 })
        );

        corrector.add_bone(&skeleton, 0, &critical()).unwrap();
        corrector.add_bone(&skeleton, 1, &critical()).unwrap();
        assert_eq!(corrector.bones().collect::<Vec<_>>(), vec![0, 1]);

        let mut short = vec![Mat4::ZERO];
        assert!(matches!(
            corrector.apply(&mut short),
            Err(AnimationError::BoneIndexOutOfRange { index: 1, count: 1 })
        ));
        assert_eq!(short, vec![Mat4::ZERO]);
        assert!(!corrector.state(0).unwrap().is_initialized());

        assert!(corrector.remove_bone(1).is_some());
        assert_eq!(corrector.len(), 1);
    }

    #[test]
    fn test_invalid_config_rejected() {
        let skeleton = skeleton();
        let mut corrector = DynamicBoneCorrector::new();
        let config = SpringConfig {
            time_step: 0.0,
            ..SpringConfig::default()
        };
        assert!(matches!(
            corrector.add_bone(&skeleton, 0, &config),
            Err(AnimationError::InvalidSpringConfig(_))
        ));
        assert!(corrector.is_empty());
    }
}
