//! Animator: playback state of one clip or blend tree driving one channel mapper.

use serde::{Deserialize, Serialize};

use crate::ids::{BlendNodeId, ClipId, MapperId};

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "id", rename_all = "snake_case")]
pub enum AnimatorSource {
    Clip(ClipId),
    /// Root node of a blend tree; evaluated in the phase domain.
    BlendTree(BlendNodeId),
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Animator {
    pub source: AnimatorSource,
    pub mapper: MapperId,
    /// Loops to play; 0 = infinite.
    #[serde(default = "default_loops")]
    pub loops: u32,
    #[serde(default = "default_playback_rate")]
    pub playback_rate: f64,
    #[serde(default = "default_running")]
    pub running: bool,
    #[serde(default)]
    pub current_loop: u32,
    /// Local time reached on the last evaluated frame, in seconds.
    #[serde(default)]
    pub last_local_time: f64,
    #[serde(default)]
    pub last_normalized_time: f64,
}

fn default_loops() -> u32 {
    1
}

fn default_playback_rate() -> f64 {
    1.0
}

fn default_running() -> bool {
    true
}

impl Animator {
    pub fn new(source: AnimatorSource, mapper: MapperId) -> Self {
        Self {
            source,
            mapper,
            loops: default_loops(),
            playback_rate: default_playback_rate(),
            running: default_running(),
            current_loop: 0,
            last_local_time: 0.0,
            last_normalized_time: 0.0,
        }
    }

    pub fn for_clip(clip: ClipId, mapper: MapperId) -> Self {
        Self::new(AnimatorSource::Clip(clip), mapper)
    }

    pub fn for_blend_tree(root: BlendNodeId, mapper: MapperId) -> Self {
        Self::new(AnimatorSource::BlendTree(root), mapper)
    }

    pub fn with_loops(mut self, loops: u32) -> Self {
        self.loops = loops;
        self
    }

    pub fn with_playback_rate(mut self, rate: f64) -> Self {
        self.playback_rate = rate;
        self
    }

    /// True while the animator sits where `new` leaves it: loop 0, local time 0.
    pub fn is_at_origin(&self) -> bool {
        self.current_loop == 0 && self.last_local_time == 0.0
    }

    /// Rewind to the start of playback. Reverse playback starts from the end of the last loop.
    pub fn rewind(&mut self, duration: f64) {
        if self.playback_rate < 0.0 && self.loops != 0 {
            self.current_loop = self.loops - 1;
            self.last_local_time = duration.max(0.0);
            self.last_normalized_time = 1.0;
        } else {
            self.current_loop = 0;
            self.last_local_time = 0.0;
            self.last_normalized_time = 0.0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rewind_respects_direction() {
        let mut a = Animator::for_clip(ClipId(0), MapperId(0)).with_loops(3);
        a.current_loop = 2;
        a.last_local_time = 0.4;
        a.rewind(2.0);
        assert_eq!((a.current_loop, a.last_local_time), (0, 0.0));

        let mut r = Animator::for_clip(ClipId(0), MapperId(0))
            .with_loops(3)
            .with_playback_rate(-1.0);
        r.rewind(2.0);
        assert_eq!((r.current_loop, r.last_local_time), (2, 2.0));
    }

    #[test]
    fn deserializes_with_defaults() {
        let a: Animator =
            serde_json::from_str(r#"{"source":{"kind":"clip","id":4},"mapper":1}"#).expect("parse");
        assert_eq!(a.source, AnimatorSource::Clip(ClipId(4)));
        assert_eq!(a, Animator::for_clip(ClipId(4), MapperId(1)));
        assert_eq!(a.playback_rate, 1.0);
        assert_eq!(a.loops, 1);
        assert!(a.running);
    }
}
