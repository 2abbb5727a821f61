//! Clip data model: named channels of named components, each a keyframed curve.
//!
//! Clips are immutable during evaluation. The raw sample layout of a clip is the
//! concatenation of every channel's components in storage order; formats built
//! by [`crate::format`] refer to positions in that layout.

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

/// Interpolation applied over the segment that starts at a keyframe.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Interpolation {
    Constant,
    #[default]
    Linear,
    Bezier,
}

/// A single key on a curve. Handles are absolute (time, value) control points.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Keyframe {
    pub time: f32,
    pub value: f32,
    #[serde(default)]
    pub interpolation: Interpolation,
    #[serde(default, rename = "leftHandle")]
    pub left_handle: Option<[f32; 2]>,
    #[serde(default, rename = "rightHandle")]
    pub right_handle: Option<[f32; 2]>,
}

impl Keyframe {
    pub fn linear(time: f32, value: f32) -> Self {
        Self {
            time,
            value,
            interpolation: Interpolation::Linear,
            left_handle: None,
            right_handle: None,
        }
    }

    pub fn constant(time: f32, value: f32) -> Self {
        Self {
            interpolation: Interpolation::Constant,
            ..Self::linear(time, value)
        }
    }
}

/// Keyframed curve. Keyframes are kept sorted by time.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(from = "Vec<Keyframe>", into = "Vec<Keyframe>")]
pub struct FCurve {
    keyframes: Vec<Keyframe>,
}

impl FCurve {
    pub fn new(mut keyframes: Vec<Keyframe>) -> Self {
        keyframes.sort_by(|a, b| a.time.total_cmp(&b.time));
        Self { keyframes }
    }

    #[inline]
    pub fn keyframes(&self) -> &[Keyframe] {
        &self.keyframes
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.keyframes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.keyframes.is_empty()
    }

    pub fn start_time(&self) -> f32 {
        self.keyframes.first().map_or(0.0, |k| k.time)
    }

    pub fn end_time(&self) -> f32 {
        self.keyframes.last().map_or(0.0, |k| k.time)
    }

    /// Index `i` such that `keys[i].time <= t < keys[i + 1].time`, for t inside the curve.
    pub(crate) fn segment_index(&self, t: f32) -> usize {
        let upper = self.keyframes.partition_point(|k| k.time <= t);
        upper.saturating_sub(1).min(self.keyframes.len().saturating_sub(2))
    }
}

impl From<Vec<Keyframe>> for FCurve {
    fn from(keyframes: Vec<Keyframe>) -> Self {
        FCurve::new(keyframes)
    }
}

impl From<FCurve> for Vec<Keyframe> {
    fn from(curve: FCurve) -> Self {
        curve.keyframes
    }
}

/// One scalar sub-element of a channel, e.g. "Location X".
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelComponent {
    /// Component name; its last character selects the canonical slot. May be empty.
    #[serde(default)]
    pub name: String,
    pub curve: FCurve,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub name: String,
    /// Set for skeletal channels; matches the joint index of the target skeleton.
    #[serde(default)]
    pub joint_index: Option<usize>,
    pub components: Vec<ChannelComponent>,
}

impl Channel {
    pub fn new(name: impl Into<String>, components: Vec<ChannelComponent>) -> Self {
        Self {
            name: name.into(),
            joint_index: None,
            components,
        }
    }

    pub fn for_joint(mut self, joint_index: usize) -> Self {
        self.joint_index = Some(joint_index);
        self
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Clip {
    pub name: String,
    /// Duration in seconds.
    pub duration: f64,
    pub channels: Vec<Channel>,
}

impl Clip {
    /// Build a clip whose duration is the latest keyframe time over all curves.
    pub fn new(name: impl Into<String>, channels: Vec<Channel>) -> Self {
        let duration = channels
            .iter()
            .flat_map(|ch| ch.components.iter())
            .map(|c| c.curve.end_time() as f64)
            .fold(0.0f64, f64::max);
        Self {
            name: name.into(),
            duration,
            channels,
        }
    }

    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Find a channel by name and joint. Plain targets (`None`) only match channels
    /// that are not bound to a joint.
    pub fn channel_index(&self, name: &str, joint_index: Option<usize>) -> Option<usize> {
        self.channels
            .iter()
            .position(|ch| ch.name == name && ch.joint_index == joint_index)
    }

    /// Offset of a channel's first component in the raw sample layout.
    pub fn channel_component_base_index(&self, channel_index: usize) -> usize {
        self.channels[..channel_index.min(self.channels.len())]
            .iter()
            .map(|ch| ch.components.len())
            .sum()
    }

    /// Length of the raw sample buffer produced by evaluating this clip.
    pub fn raw_component_count(&self) -> usize {
        self.channels.iter().map(|ch| ch.components.len()).sum()
    }

    /// Validate basic invariants (finite non-negative duration, finite keys).
    pub fn validate(&self) -> Result<()> {
        if !self.duration.is_finite() || self.duration < 0.0 {
            return Err(EvalError::InvalidClip(format!(
                "clip '{}' has invalid duration {}",
                self.name, self.duration
            )));
        }
        for ch in &self.channels {
            for comp in &ch.components {
                if comp
                    .curve
                    .keyframes()
                    .iter()
                    .any(|k| !k.time.is_finite() || !k.value.is_finite())
                {
                    return Err(EvalError::InvalidClip(format!(
                        "non-finite keyframe in '{}' component '{}'",
                        ch.name, comp.name
                    )));
                }
            }
        }
        Ok(())
    }
}
