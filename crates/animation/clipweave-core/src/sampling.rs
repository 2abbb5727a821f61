//! Clip sampling into the clip's native (raw) layout.
//!
//! Model:
//! - Each component curve is sampled independently: hold the first value before the
//!   first key, hold the last value after the last key, otherwise interpolate the
//!   segment containing `t` with the left key's interpolation mode.
//! - Rotation channels with four components whose curves share key times and are
//!   linearly keyed are slerped as a unit instead, so in-between rotations stay on
//!   the unit sphere.
//!
//! The raw layout is every channel's components concatenated in storage order.

use crate::data::{Channel, Clip, FCurve, Interpolation};
use crate::format::ClipResults;
use crate::interp::{bezier_segment_value, lerp_f32, slerp_quat};

const ROTATION_CHANNEL: &str = "rotation";

/// Sample a curve at local time `t` (seconds). Empty curves yield 0.
pub fn evaluate_curve(curve: &FCurve, t: f32) -> f32 {
    let keys = curve.keyframes();
    let (first, last) = match (keys.first(), keys.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return 0.0,
    };
    if t <= first.time {
        return first.value;
    }
    if t >= last.time {
        return last.value;
    }

    let i = curve.segment_index(t);
    let k0 = &keys[i];
    let k1 = &keys[i + 1];
    let span = k1.time - k0.time;
    if span <= 0.0 {
        return k1.value;
    }

    match k0.interpolation {
        Interpolation::Constant => k0.value,
        Interpolation::Linear => lerp_f32(k0.value, k1.value, (t - k0.time) / span),
        Interpolation::Bezier => {
            // Missing handles fall back to the one-third points, which is linear.
            let c0 = k0
                .right_handle
                .unwrap_or([k0.time + span / 3.0, lerp_f32(k0.value, k1.value, 1.0 / 3.0)]);
            let c1 = k1
                .left_handle
                .unwrap_or([k1.time - span / 3.0, lerp_f32(k0.value, k1.value, 2.0 / 3.0)]);
            bezier_segment_value((k0.time, k0.value), c0, c1, (k1.time, k1.value), t)
        }
    }
}

fn is_slerpable_rotation(channel: &Channel) -> bool {
    if channel.components.len() != 4 || !channel.name.eq_ignore_ascii_case(ROTATION_CHANNEL) {
        return false;
    }
    let reference = channel.components[0].curve.keyframes();
    if reference.len() < 2 {
        return false;
    }
    channel.components.iter().all(|c| {
        let keys = c.curve.keyframes();
        keys.len() == reference.len()
            && keys.iter().zip(reference).all(|(a, b)| {
                a.time == b.time && a.interpolation == Interpolation::Linear
            })
    })
}

fn sample_rotation(channel: &Channel, t: f32, out: &mut ClipResults) {
    let reference = &channel.components[0].curve;
    let keys = reference.keyframes();
    let (first, last) = match (keys.first(), keys.last()) {
        (Some(first), Some(last)) => (first.time, last.time),
        _ => return,
    };
    let key_quat = |i: usize| -> [f32; 4] {
        let mut q = [0.0; 4];
        for (slot, comp) in q.iter_mut().zip(&channel.components) {
            *slot = comp.curve.keyframes()[i].value;
        }
        q
    };

    let q = if t <= first {
        key_quat(0)
    } else if t >= last {
        key_quat(keys.len() - 1)
    } else {
        let i = reference.segment_index(t);
        let span = keys[i + 1].time - keys[i].time;
        if span <= 0.0 {
            key_quat(i + 1)
        } else {
            slerp_quat(key_quat(i), key_quat(i + 1), (t - keys[i].time) / span)
        }
    };
    out.extend_from_slice(&q);
}

fn sample_channel_into(channel: &Channel, t: f32, out: &mut ClipResults) {
    if is_slerpable_rotation(channel) {
        sample_rotation(channel, t, out);
    } else {
        out.extend(channel.components.iter().map(|c| evaluate_curve(&c.curve, t)));
    }
}

/// Sample every channel of `clip` at local time `local_time`, in raw layout order.
pub fn evaluate_clip_at_local_time(clip: &Clip, local_time: f64) -> ClipResults {
    let mut out = ClipResults::with_capacity(clip.raw_component_count());
    let t = local_time as f32;
    for channel in &clip.channels {
        sample_channel_into(channel, t, &mut out);
    }
    out
}

/// Sample at `phase` in `[0, 1]`, scaled by the clip's duration.
pub fn evaluate_clip_at_phase(clip: &Clip, phase: f64) -> ClipResults {
    let local_time = phase.clamp(0.0, 1.0) * clip.duration.max(0.0);
    evaluate_clip_at_local_time(clip, local_time)
}
