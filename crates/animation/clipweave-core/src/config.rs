//! Core configuration for clipweave-core.

use serde::{Deserialize, Serialize};

/// Engine evaluation settings.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Evaluate independent animators on the rayon pool. Ignored without the
    /// `parallel` feature.
    pub parallel: bool,
    /// Below this many running animators evaluation stays on the calling thread.
    pub min_parallel_animators: usize,
    /// Emit each animator's `normalizedTime` every frame.
    pub emit_normalized_time: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parallel: true,
            min_parallel_animators: 4,
            emit_normalized_time: true,
        }
    }
}

impl Config {
    /// Sequential evaluation, no progress changes. Handy for deterministic tests.
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            emit_normalized_time: false,
            ..Self::default()
        }
    }
}
