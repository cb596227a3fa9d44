//! Animation clips and per-joint channels

use std::collections::HashSet;

use glam::{Mat4, Quat, Vec3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::track::{Keyframe, Track};
use crate::error::{AnimationError, Result};
use crate::raw::{RawChannel, RawClip};
use crate::skeleton::{JointId, Skeleton};

/// Ticks per second used when the source leaves it unspecified
pub const DEFAULT_TICKS_PER_SECOND: f64 = 20.0;

/// Options for building clips from raw data
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ClipOptions {
    /// Substituted when a clip declares zero ticks per second
    pub default_ticks_per_second: f64,
}

impl Default for ClipOptions {
    fn default() -> Self {
        Self {
            default_ticks_per_second: DEFAULT_TICKS_PER_SECOND,
        }
    }
}

/// Translation, rotation and scale tracks for one joint
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Channel {
    pub translation: Track<Vec3>,
    pub rotation: Track<Quat>,
    pub scale: Track<Vec3>,
}

impl Channel {
    pub fn new(translation: Track<Vec3>, rotation: Track<Quat>, scale: Track<Vec3>) -> Self {
        Self {
            translation,
            rotation,
            scale,
        }
    }

    /// Check if no track has any key
    pub fn is_empty(&self) -> bool {
        self.translation.is_empty() && self.rotation.is_empty() && self.scale.is_empty()
    }

    /// Total number of keys across all three tracks
    pub fn key_count(&self) -> usize {
        self.translation.len() + self.rotation.len() + self.scale.len()
    }

    /// Check if some but not all tracks have keys
    pub fn is_partial(&self) -> bool {
        !self.is_empty()
            && (self.translation.is_empty() || self.rotation.is_empty() || self.scale.is_empty())
    }

    /// Local transform at `time` (ticks): `translate * rotate * scale`
    ///
    /// Missing tracks contribute the identity component, not the joint's bind
    /// component: a rotation-only channel on a joint bound away from its parent
    /// places that joint at the parent's origin. Returns `None` for an empty
    /// channel, in which case the joint keeps its bind transform.
    pub fn local_transform(&self, time: f64) -> Option<Mat4> {
        if self.is_empty() {
            return None;
        }

        let translation = self.translation.sample(time).unwrap_or(Vec3::ZERO);
        let rotation = self.rotation.sample(time).unwrap_or(Quat::IDENTITY);
        let scale = self.scale.sample(time).unwrap_or(Vec3::ONE);

        Some(
            Mat4::from_translation(translation)
                * Mat4::from_quat(rotation)
                * Mat4::from_scale(scale),
        )
    }
}

/// A keyframed animation bound to one skeleton's joint ids
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationClip {
    name: String,
    duration: f64,
    ticks_per_second: f64,
    channels: Vec<Channel>,
}

impl AnimationClip {
    /// Create a clip from channels indexed by joint id
    ///
    /// A `ticks_per_second` of zero selects [`DEFAULT_TICKS_PER_SECOND`].
    pub fn new(
        name: impl Into<String>,
        duration: f64,
        ticks_per_second: f64,
        channels: Vec<Channel>,
    ) -> Result<Self> {
        Self::with_fallback_rate(
            name.into(),
            duration,
            ticks_per_second,
            DEFAULT_TICKS_PER_SECOND,
            channels,
        )
    }

    fn with_fallback_rate(
        name: String,
        duration: f64,
        ticks_per_second: f64,
        fallback_rate: f64,
        channels: Vec<Channel>,
    ) -> Result<Self> {
        if !(duration.is_finite() && duration > 0.0) {
            log::error!("Clip '{name}' has invalid duration {duration}");
            return Err(AnimationError::InvalidDuration {
                clip: name,
                duration,
            });
        }

        let ticks_per_second = resolve_ticks_per_second(&name, ticks_per_second, fallback_rate);
        Ok(Self {
            name,
            duration,
            ticks_per_second,
            channels,
        })
    }

    /// Build a clip from loader data, binding channels to joints by name
    pub fn from_raw(raw: &RawClip, skeleton: &Skeleton) -> Result<Self> {
        Self::from_raw_with_options(raw, skeleton, &ClipOptions::default())
    }

    pub fn from_raw_with_options(
        raw: &RawClip,
        skeleton: &Skeleton,
        options: &ClipOptions,
    ) -> Result<Self> {
        let mut channels = vec![Channel::default(); skeleton.joint_count()];
        let mut seen: HashSet<JointId> = HashSet::new();

        for raw_channel in &raw.channels {
            let Some(joint) = skeleton.joint_id(&raw_channel.joint) else {
                log::warn!(
                    "Clip '{}': channel for unknown joint '{}' ignored",
                    raw.name,
                    raw_channel.joint
                );
                continue;
            };

            if !seen.insert(joint) {
                log::warn!(
                    "Clip '{}': duplicate channel for joint '{}', keeping the first",
                    raw.name,
                    raw_channel.joint
                );
                continue;
            }

            let channel = channel_from_raw(raw_channel);
            if channel.key_count() > 1 && channel.is_partial() {
                log::warn!(
                    "Clip '{}': channel '{}' is missing {}, using identity for the missing tracks",
                    raw.name,
                    raw_channel.joint,
                    missing_tracks(&channel)
                );
            }
            channels[joint] = channel;
        }

        let clip = Self::with_fallback_rate(
            raw.name.clone(),
            raw.duration_ticks,
            raw.ticks_per_second,
            options.default_ticks_per_second,
            channels,
        )?;

        log::debug!(
            "Loaded clip '{}': {} ticks at {} ticks/s, {} animated joints",
            clip.name,
            clip.duration,
            clip.ticks_per_second,
            seen.len()
        );
        Ok(clip)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Duration in ticks
    pub fn duration(&self) -> f64 {
        self.duration
    }

    pub fn ticks_per_second(&self) -> f64 {
        self.ticks_per_second
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f64 {
        self.duration / self.ticks_per_second
    }

    /// Channels indexed by joint id
    pub fn channels(&self) -> &[Channel] {
        &self.channels
    }

    pub fn channel(&self, joint: JointId) -> Option<&Channel> {
        self.channels.get(joint)
    }

    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    /// Convert seconds since playback start into looped clip time in `[0, duration)`
    pub fn animation_time(&self, time_seconds: f64) -> f64 {
        let ticks = (time_seconds * self.ticks_per_second).rem_euclid(self.duration);
        // rem_euclid can round up to the divisor for tiny negative inputs
        if ticks >= self.duration { 0.0 } else { ticks }
    }
}

fn resolve_ticks_per_second(clip: &str, declared: f64, fallback: f64) -> f64 {
    if declared > 0.0 && declared.is_finite() {
        return declared;
    }
    if declared != 0.0 {
        log::warn!("Clip '{clip}' declares invalid ticks per second {declared}, using {fallback}");
    }
    fallback
}

fn channel_from_raw(raw: &RawChannel) -> Channel {
    Channel::new(
        Track::new(
            raw.translation_keys
                .iter()
                .map(|key| Keyframe::new(key.time, key.value))
                .collect(),
        ),
        Track::new(
            raw.rotation_keys
                .iter()
                .map(|key| Keyframe::new(key.time, key.value))
                .collect(),
        ),
        Track::new(
            raw.scale_keys
                .iter()
                .map(|key| Keyframe::new(key.time, key.value))
                .collect(),
        ),
    )
}

fn missing_tracks(channel: &Channel) -> String {
    let mut missing = Vec::new();
    if channel.translation.is_empty() {
        missing.push("translation");
    }
    if channel.rotation.is_empty() {
        missing.push("rotation");
    }
    if channel.scale.is_empty() {
        missing.push("scale");
    }
    missing.join(" and ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::raw::{RawJoint, RawQuatKey, RawVec3Key};

    fn skeleton() -> Skeleton {
        let joints = vec![
            RawJoint::new(0, "root", None),
            RawJoint::new(1, "arm", Some(0)),
        ];
        Skeleton::build(&joints, &[]).unwrap()
    }

    fn translation_channel(joint: &str, x: f32) -> RawChannel {
        RawChannel {
            joint: joint.to_string(),
            translation_keys: vec![RawVec3Key {
                time: 0.0,
                value: Vec3::new(x, 0.0, 0.0),
            }],
            ..RawChannel::default()
        }
    }

    #[test]
    fn test_default_ticks_per_second() {
        let raw = RawClip {
            name: "idle".to_string(),
            duration_ticks: 40.0,
            ticks_per_second: 0.0,
            channels: vec![],
        };
        let clip = AnimationClip::from_raw(&raw, &skeleton()).unwrap();
        assert_eq!(clip.ticks_per_second(), DEFAULT_TICKS_PER_SECOND);
        assert_eq!(clip.duration_seconds(), 2.0);
        assert_eq!(clip.channel_count(), 2);
        assert!(clip.channels().iter().all(Channel::is_empty));
    }

    #[test]
    fn test_invalid_duration_rejected() {
        for duration in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            let raw = RawClip {
                name: "broken".to_string(),
                duration_ticks: duration,
                ticks_per_second: 30.0,
                channels: vec![],
            };
            assert!(matches!(
                AnimationClip::from_raw(&raw, &skeleton()),
                Err(AnimationError::InvalidDuration { .. })
            ));
        }
    }

    #[test]
    fn test_channels_bound_by_name() {
        let raw = RawClip {
            name: "wave".to_string(),
            duration_ticks: 10.0,
            ticks_per_second: 25.0,
            channels: vec![
                translation_channel("arm", 1.0),
                translation_channel("ghost", 5.0),
                translation_channel("arm", 9.0),
            ],
        };
        let clip = AnimationClip::from_raw(&raw, &skeleton()).unwrap();

        assert!(clip.channel(0).unwrap().is_empty());
        // First occurrence wins
        assert_eq!(
            clip.channel(1).unwrap().translation.sample(0.0),
            Some(Vec3::new(1.0, 0.0, 0.0))
        );
    }

    #[test]
    fn test_partial_channel_uses_identity_components() {
        let channel = Channel::new(
            Track::new(vec![
                Keyframe::new(0.0, Vec3::ZERO),
                Keyframe::new(1.0, Vec3::new(2.0, 0.0, 0.0)),
            ]),
            Track::empty(),
            Track::empty(),
        );
        assert!(channel.is_partial());

        let transform = channel.local_transform(0.5).unwrap();
        assert!(transform.abs_diff_eq(Mat4::from_translation(Vec3::X), 1e-6));
    }

    #[test]
    fn test_local_transform_order_is_trs() {
        let rotation = Quat::from_rotation_z(std::f32::consts::FRAC_PI_2);
        let channel = Channel::new(
            Track::new(vec![Keyframe::new(0.0, Vec3::new(5.0, 0.0, 0.0))]),
            Track::new(vec![Keyframe::new(0.0, rotation)]),
            Track::new(vec![Keyframe::new(0.0, Vec3::splat(2.0))]),
        );

        let transform = channel.local_transform(0.0).unwrap();
        let expected = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            rotation,
            Vec3::new(5.0, 0.0, 0.0),
        );
        assert!(transform.abs_diff_eq(expected, 1e-5));
        assert_eq!(Channel::default().local_transform(0.0), None);
    }

    #[test]
    fn test_non_unit_rotation_key_stays_rigid() {
        let channel = Channel::new(
            Track::empty(),
            Track::new(vec![Keyframe::new(
                0.0,
                Quat::from_rotation_z(std::f32::consts::FRAC_PI_2) * 2.0,
            )]),
            Track::empty(),
        );

        let transform = channel.local_transform(0.0).unwrap();
        assert!(transform.transform_point3(Vec3::X).abs_diff_eq(Vec3::Y, 1e-5));
    }

    #[test]
    fn test_animation_time_wraps() {
        let clip = AnimationClip::new("loop", 10.0, 5.0, vec![]).unwrap();

        assert_eq!(clip.animation_time(0.0), 0.0);
        assert!((clip.animation_time(1.0) - 5.0).abs() < 1e-9);
        assert!((clip.animation_time(2.5) - 2.5).abs() < 1e-9);
        assert!((clip.animation_time(-0.2) - 9.0).abs() < 1e-9);
        let wrapped = clip.animation_time(-1e-18);
        assert!((0.0..10.0).contains(&wrapped));
    }

    #[test]
    fn test_rotation_keys_from_raw() {
        let raw = RawClip {
            name: "turn".to_string(),
            duration_ticks: 1.0,
            ticks_per_second: 1.0,
            channels: vec![RawChannel {
                joint: "root".to_string(),
                rotation_keys: vec![RawQuatKey {
                    time: 0.0,
                    value: Quat::from_rotation_y(1.0),
                }],
                ..RawChannel::default()
            }],
        };
        let clip = AnimationClip::from_raw(&raw, &skeleton()).unwrap();
        let channel = clip.channel(0).unwrap();
        assert_eq!(channel.key_count(), 1);
        assert!(
            channel
                .rotation
                .sample(0.0)
                .unwrap()
                .abs_diff_eq(Quat::from_rotation_y(1.0), 1e-6)
        );
    }
}
