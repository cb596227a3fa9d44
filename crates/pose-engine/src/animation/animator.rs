//! Clip playback state
//!
//! The [`Animator`] keeps a clip library and a playback clock. It does not
//! own a skeleton; posing goes through a [`PoseEvaluator`] so one set of clips
//! can drive several evaluators.

use glam::Mat4;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use super::clip::AnimationClip;
use crate::error::{AnimationError, Result};
use crate::pose::PoseEvaluator;

/// What happens when playback passes the end of a clip
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum WrapMode {
    /// Restart from the beginning
    #[default]
    Loop,
    /// Hold the final pose
    Clamp,
}

/// Plays back clips over time
#[derive(Debug, Clone)]
pub struct Animator {
    /// Clip library
    clips: Vec<AnimationClip>,
    /// Index of the playing clip
    current: Option<usize>,
    /// Seconds since the current clip started
    elapsed: f64,
    /// Playback rate multiplier
    speed: f64,
    wrap_mode: WrapMode,
}

impl Animator {
    /// Create an animator playing the first clip, if any
    pub fn new(clips: Vec<AnimationClip>) -> Self {
        let current = if clips.is_empty() { None } else { Some(0) };
        Self {
            clips,
            current,
            elapsed: 0.0,
            speed: 1.0,
            wrap_mode: WrapMode::default(),
        }
    }

    /// Create an animator with no clips
    pub fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Add a clip to the library and return its index
    ///
    /// The first clip added to an empty animator starts playing.
    pub fn add_clip(&mut self, clip: AnimationClip) -> usize {
        if self.clip_index(clip.name()).is_some() {
            log::warn!(
                "Animator already has a clip named '{}', lookups by name keep the first",
                clip.name()
            );
        }
        self.clips.push(clip);
        let index = self.clips.len() - 1;
        if self.current.is_none() {
            self.current = Some(index);
        }
        index
    }

    /// Switch to the clip with this name and restart playback
    pub fn set_clip(&mut self, name: &str) -> Result<()> {
        let index = self
            .clip_index(name)
            .ok_or_else(|| AnimationError::ClipNotFound(name.to_string()))?;
        self.play(index);
        Ok(())
    }

    /// Switch to the clip at `index` and restart playback
    pub fn set_clip_index(&mut self, index: usize) -> Result<()> {
        if index >= self.clips.len() {
            return Err(AnimationError::ClipNotFound(format!("index {index}")));
        }
        self.play(index);
        Ok(())
    }

    /// Stop playing any clip; evaluation then yields the bind pose
    pub fn clear_clip(&mut self) {
        self.current = None;
        self.elapsed = 0.0;
    }

    fn play(&mut self, index: usize) {
        log::debug!("Playing clip '{}'", self.clips[index].name());
        self.current = Some(index);
        self.elapsed = 0.0;
    }

    /// Advance the playback clock
    pub fn update(&mut self, delta_seconds: f64) {
        if self.current.is_none() || !delta_seconds.is_finite() {
            return;
        }
        self.elapsed += delta_seconds * self.speed;

        if self.wrap_mode == WrapMode::Clamp
            && let Some(clip) = self.current_clip()
        {
            self.elapsed = self.elapsed.clamp(0.0, clip.duration_seconds());
        }
    }

    /// Restart the current clip
    pub fn reset(&mut self) {
        self.elapsed = 0.0;
    }

    pub fn set_speed(&mut self, speed: f64) {
        self.speed = speed;
    }

    pub fn speed(&self) -> f64 {
        self.speed
    }

    pub fn set_wrap_mode(&mut self, wrap_mode: WrapMode) {
        self.wrap_mode = wrap_mode;
    }

    pub fn wrap_mode(&self) -> WrapMode {
        self.wrap_mode
    }

    pub fn current_clip(&self) -> Option<&AnimationClip> {
        self.current.and_then(|index| self.clips.get(index))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    /// Seconds since the current clip started
    pub fn current_time(&self) -> f64 {
        self.elapsed
    }

    /// Check if a clamped clip has reached its end
    ///
    /// Looping playback never finishes.
    pub fn is_finished(&self) -> bool {
        match (self.wrap_mode, self.current_clip()) {
            (WrapMode::Clamp, Some(clip)) => self.elapsed >= clip.duration_seconds(),
            _ => false,
        }
    }

    pub fn clip(&self, index: usize) -> Option<&AnimationClip> {
        self.clips.get(index)
    }

    pub fn clip_index(&self, name: &str) -> Option<usize> {
        self.clips.iter().position(|clip| clip.name() == name)
    }

    pub fn clip_names(&self) -> Vec<&str> {
        self.clips.iter().map(AnimationClip::name).collect()
    }

    pub fn clip_count(&self) -> usize {
        self.clips.len()
    }

    /// Pose the current clip at the current time
    ///
    /// Writes the bind pose when no clip is playing.
    pub fn evaluate(
        &self,
        evaluator: &PoseEvaluator<'_>,
        bone_transforms: &mut [Mat4],
    ) -> Result<()> {
        let Some(clip) = self.current_clip() else {
            return evaluator.bind_pose_transforms(bone_transforms);
        };

        match self.wrap_mode {
            WrapMode::Loop => evaluator.animate(clip, self.elapsed, bone_transforms),
            WrapMode::Clamp => {
                let ticks = (self.elapsed * clip.ticks_per_second()).clamp(0.0, clip.duration());
                evaluator.animate_ticks(clip, ticks, bone_transforms)
            }
        }
    }
}

impl Default for Animator {
    fn default() -> Self {
        Self::empty()
    }
}
