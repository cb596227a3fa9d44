//! Interpolation between keyframe values

use glam::{Quat, Vec3};

/// Trait for values that can be interpolated between two keyframes
///
/// glam types have inherent `lerp` methods with a different signature, so
/// call this as `Lerp::lerp(&a, &b, t)` on concrete glam values.
pub trait Lerp: Clone {
    /// Interpolate from `self` (t = 0) to `other` (t = 1)
    fn lerp(&self, other: &Self, t: f32) -> Self;

    /// A key value returned as-is, without blending
    fn unblended(&self) -> Self {
        self.clone()
    }
}

impl Lerp for f32 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        self + (other - self) * t
    }
}

impl Lerp for Vec3 {
    fn lerp(&self, other: &Self, t: f32) -> Self {
        Self::new(
            self.x.lerp(&other.x, t),
            self.y.lerp(&other.y, t),
            self.z.lerp(&other.z, t),
        )
    }
}

impl Lerp for Quat {
    /// Spherical interpolation along the shorter arc
    ///
    /// Inputs do not need to be unit length; the result always is.
    fn lerp(&self, other: &Self, t: f32) -> Self {
        let from = normalize_or_identity(*self);
        let to = normalize_or_identity(*other);
        normalize_or_identity(from.slerp(to, t))
    }

    fn unblended(&self) -> Self {
        normalize_or_identity(*self)
    }
}

/// Normalize a quaternion, falling back to identity for zero or non-finite input
pub fn normalize_or_identity(q: Quat) -> Quat {
    let length = q.length();
    if length > f32::EPSILON && length.is_finite() {
        q / length
    } else {
        Quat::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn test_vec3_lerp() {
        let a = Vec3::new(0.0, 0.0, 0.0);
        let b = Vec3::new(10.0, 20.0, 30.0);

        let mid = Lerp::lerp(&a, &b, 0.5);
        assert!((mid.x - 5.0).abs() < 0.001);
        assert!((mid.y - 10.0).abs() < 0.001);
        assert!((mid.z - 15.0).abs() < 0.001);
        assert_eq!(Lerp::lerp(&a, &b, 0.0), a);
    }

    #[test]
    fn test_unblended_quat_is_unit() {
        let stored = Quat::from_rotation_z(FRAC_PI_2) * 2.0;
        let value = stored.unblended();
        assert!((value.length() - 1.0).abs() < 1e-6);
        assert!(value.abs_diff_eq(Quat::from_rotation_z(FRAC_PI_2), 1e-6));
        assert_eq!(Vec3::splat(2.0).unblended(), Vec3::splat(2.0));
    }

    #[test]
    fn test_quat_slerp_halfway() {
        let a = Quat::IDENTITY;
        let b = Quat::from_rotation_z(FRAC_PI_2);
        let mid = Lerp::lerp(&a, &b, 0.5);
        assert!(mid.abs_diff_eq(Quat::from_rotation_z(FRAC_PI_2 / 2.0), 1e-5));
    }

    #[test]
    fn test_quat_slerp_unnormalized_inputs() {
        let a = Quat::from_xyzw(0.0, 0.0, 0.0, 3.0);
        let b = Quat::from_xyzw(0.0, 0.0, 0.5, 0.5);
        for step in 0..=10 {
            let q = Lerp::lerp(&a, &b, step as f32 / 10.0);
            assert!((q.length() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_quat_slerp_takes_shorter_arc() {
        let a = Quat::from_rotation_y(0.1);
        let b = -Quat::from_rotation_y(0.3);
        let mid = Lerp::lerp(&a, &b, 0.5);
        // Same rotation as +-from_rotation_y(0.2)
        assert!(mid.dot(Quat::from_rotation_y(0.2)).abs() > 0.9999);
    }

    #[test]
    fn test_normalize_zero_quat() {
        let q = normalize_or_identity(Quat::from_xyzw(0.0, 0.0, 0.0, 0.0));
        assert_eq!(q, Quat::IDENTITY);
    }
}
