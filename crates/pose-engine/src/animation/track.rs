//! Keyframe tracks and sampling

use super::lerp::Lerp;

/// A value at a point in clip time (ticks)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keyframe<T> {
    pub time: f64,
    pub value: T,
}

impl<T> Keyframe<T> {
    pub const fn new(time: f64, value: T) -> Self {
        Self { time, value }
    }
}

/// Time-ordered keyframes for one channel component
#[derive(Debug, Clone, PartialEq)]
pub struct Track<T> {
    keys: Vec<Keyframe<T>>,
}

impl<T> Default for Track<T> {
    fn default() -> Self {
        Self { keys: Vec::new() }
    }
}

impl<T: Lerp> Track<T> {
    /// Create a track, sorting keys by time if the source delivered them out of order
    pub fn new(mut keys: Vec<Keyframe<T>>) -> Self {
        if keys.windows(2).any(|pair| pair[1].time < pair[0].time) {
            log::warn!(
                "Track with {} keys is not time-ordered, sorting by time",
                keys.len()
            );
            keys.sort_by(|a, b| a.time.total_cmp(&b.time));
        }
        Self { keys }
    }

    /// Create an empty track
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> &[Keyframe<T>] {
        &self.keys
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Check if track has animation data
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Sample the track at `time` (ticks)
    ///
    /// Returns `None` for an empty track.
    pub fn sample(&self, time: f64) -> Option<T> {
        sample_keys(&self.keys, time)
    }
}

/// Find the key that starts the segment containing `time`
///
/// Scans from the front for the smallest `i` with `time < keys[i + 1].time`.
/// Returns `None` when the track has fewer than two keys or `time` lies at
/// or past the last key.
pub fn find_key_index<T>(keys: &[Keyframe<T>], time: f64) -> Option<usize> {
    if keys.len() < 2 {
        return None;
    }

    (0..keys.len() - 1).find(|&i| time < keys[i + 1].time)
}

/// Sample a key slice at `time` (ticks)
///
/// - no keys: `None`
/// - one key: that key's value for every `time`
/// - otherwise interpolate the bracketing pair; times before the first key
///   or at/after the last key clamp to the end values
///
/// Rotations come back unit length on every path.
pub fn sample_keys<T: Lerp>(keys: &[Keyframe<T>], time: f64) -> Option<T> {
    match keys {
        [] => None,
        [only] => Some(only.value.unblended()),
        [.., last] => {
            let Some(index) = find_key_index(keys, time) else {
                log::trace!(
                    "Sample time {time} is past the last key at {}, clamping",
                    last.time
                );
                return Some(last.value.unblended());
            };

            let from = &keys[index];
            let to = &keys[index + 1];
            let span = to.time - from.time;
            let factor = if span > 0.0 {
                ((time - from.time) / span).clamp(0.0, 1.0) as f32
            } else {
                0.0
            };
            Some(from.value.lerp(&to.value, factor))
        }
    }
}
