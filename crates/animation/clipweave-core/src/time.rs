//! Time mapping: elapsed global time to clip-local time or phase.
//!
//! Local time stays in `[0, duration)` while looping. On the last loop of a
//! finite loop count, running past the end clamps to exactly `duration` and the
//! loop index stops advancing ("done, sitting on the last frame"). Reverse
//! playback mirrors this: it wraps backwards while earlier loops remain and
//! clamps to `0` on loop 0.
//!
//! A loop count of `0` means loop forever.

use serde::{Deserialize, Serialize};

use crate::data::Clip;

const NANOS_PER_SECOND: f64 = 1.0e9;

/// Per-frame inputs for one animator. Built fresh every frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct AnimatorEvaluationData {
    /// Global seconds elapsed since the previous frame.
    pub elapsed_time: f64,
    /// Local time reached on the previous frame.
    pub current_time: f64,
    /// Number of loops to play; 0 = infinite.
    pub loop_count: u32,
    pub current_loop: u32,
    pub playback_rate: f64,
}

/// Result of mapping one frame onto one clip's timeline.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct ClipEvaluationData {
    pub current_loop: u32,
    pub local_time: f64,
    pub is_final_frame: bool,
}

/// Snapshot the animator's playback state for this frame.
pub fn evaluation_data_for_animator(
    loop_count: u32,
    current_loop: u32,
    last_local_time: f64,
    playback_rate: f64,
    nanos_since_previous_frame: i64,
) -> AnimatorEvaluationData {
    AnimatorEvaluationData {
        elapsed_time: nanos_since_previous_frame as f64 / NANOS_PER_SECOND,
        current_time: last_local_time,
        loop_count,
        current_loop,
        playback_rate,
    }
}

/// Apply the time mapper to one clip for this frame.
pub fn evaluation_data_for_clip(
    clip: &Clip,
    animator_data: &AnimatorEvaluationData,
) -> ClipEvaluationData {
    let mut current_loop = animator_data.current_loop;
    let local_time = local_time_from_elapsed_time(
        animator_data.current_time,
        animator_data.elapsed_time,
        animator_data.playback_rate,
        clip.duration,
        animator_data.loop_count,
        &mut current_loop,
    );
    let is_final_frame = final_frame_for_rate(
        animator_data.playback_rate,
        local_time,
        clip.duration,
        current_loop,
        animator_data.loop_count,
    );
    ClipEvaluationData {
        current_loop,
        local_time,
        is_final_frame,
    }
}

/// Advance local time by `elapsed_global * playback_rate`, wrapping and counting
/// loops. `current_loop` is updated in place.
pub fn local_time_from_elapsed_time(
    current_local: f64,
    elapsed_global: f64,
    playback_rate: f64,
    duration: f64,
    loop_count: u32,
    current_loop: &mut u32,
) -> f64 {
    if duration <= 0.0 {
        log::trace!("degenerate clip duration {duration}; holding local time at 0");
        return 0.0;
    }

    let t = current_local + elapsed_global * playback_rate;
    let finite = loop_count != 0;
    let last_loop = loop_count.saturating_sub(1);

    if t >= duration {
        let wraps = (t / duration).floor();
        if finite {
            let remaining = last_loop.saturating_sub(*current_loop) as f64;
            if wraps > remaining {
                *current_loop = last_loop;
                return duration;
            }
        }
        let mut wrapped = t - wraps * duration;
        let mut wraps = wraps;
        // Rounding can leave the remainder a hair outside the interval.
        if wrapped >= duration {
            wrapped -= duration;
            wraps += 1.0;
        }
        if wrapped < 0.0 {
            wrapped = 0.0;
        }
        if finite && wraps > last_loop.saturating_sub(*current_loop) as f64 {
            *current_loop = last_loop;
            return duration;
        }
        *current_loop = current_loop.saturating_add(wraps as u32);
        log::trace!("local time {t} wrapped {wraps} time(s) to {wrapped}");
        wrapped
    } else if t < 0.0 {
        let wraps = (-t / duration).ceil();
        if finite && wraps > *current_loop as f64 {
            *current_loop = 0;
            return 0.0;
        }
        let mut wrapped = t + wraps * duration;
        if wrapped >= duration {
            // -epsilon rounded up onto the boundary; stay at the start of the later loop.
            wrapped = 0.0;
            let wraps = wraps - 1.0;
            *current_loop = current_loop.saturating_sub(wraps as u32);
            return wrapped;
        }
        *current_loop = current_loop.saturating_sub(wraps as u32);
        wrapped
    } else {
        t
    }
}

/// Phase-domain sibling of [`local_time_from_elapsed_time`], returning
/// `local / duration`. Degenerate durations force phase 0.
pub fn phase_from_elapsed_time(
    current_local: f64,
    elapsed_global: f64,
    playback_rate: f64,
    duration: f64,
    loop_count: u32,
    current_loop: &mut u32,
) -> f64 {
    if duration <= 0.0 {
        return 0.0;
    }
    let local = local_time_from_elapsed_time(
        current_local,
        elapsed_global,
        playback_rate,
        duration,
        loop_count,
        current_loop,
    );
    local / duration
}

/// True on the terminal sample of a finite forward playback.
#[inline]
pub fn is_final_frame(local_time: f64, duration: f64, current_loop: u32, loop_count: u32) -> bool {
    local_time >= duration && loop_count != 0 && current_loop >= loop_count - 1
}

/// True on the terminal sample of a finite reverse playback: back at the start of loop 0.
#[inline]
pub fn is_final_frame_reversed(local_time: f64, current_loop: u32, loop_count: u32) -> bool {
    local_time <= 0.0 && loop_count != 0 && current_loop == 0
}

/// Pick the terminal condition matching the playback direction.
pub fn final_frame_for_rate(
    playback_rate: f64,
    local_time: f64,
    duration: f64,
    current_loop: u32,
    loop_count: u32,
) -> bool {
    if playback_rate < 0.0 {
        is_final_frame_reversed(local_time, current_loop, loop_count)
    } else {
        is_final_frame(local_time, duration, current_loop, loop_count)
    }
}
