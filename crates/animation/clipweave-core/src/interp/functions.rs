//! Interpolation helpers:
//! - lerp_f32 (two-sided form, exact at both ends)
//! - bezier_segment_value (cubic bezier curve segment evaluated at a time)
//! - slerp_quat (shortest-arc spherical interpolation)

use crate::value::normalize_quat;

const BEZIER_ITERATIONS: usize = 32;
const BEZIER_EPSILON: f32 = 1e-6;

/// Linear interpolation written as `(1 - t) * a + t * b` so that `t == 0`
/// yields `a` and `t == 1` yields `b` bit-for-bit.
#[inline]
pub fn lerp_f32(a: f32, b: f32, t: f32) -> f32 {
    (1.0 - t) * a + t * b
}

/// Cubic Bezier basis function
#[inline]
fn cubic_bezier(p0: f32, p1: f32, p2: f32, p3: f32, u: f32) -> f32 {
    let v = 1.0 - u;
    v * v * v * p0 + 3.0 * v * v * u * p1 + 3.0 * v * u * u * p2 + u * u * u * p3
}

/// Evaluate the bezier segment from `(t0, v0)` to `(t1, v1)` with absolute control
/// points `c0` (right handle of the first key) and `c1` (left handle of the second)
/// at time `t`. The time polynomial is inverted by bisection; control point times are
/// clamped into the segment so it stays monotonic.
pub fn bezier_segment_value(
    (t0, v0): (f32, f32),
    c0: [f32; 2],
    c1: [f32; 2],
    (t1, v1): (f32, f32),
    t: f32,
) -> f32 {
    if t1 <= t0 {
        return v0;
    }
    let c0t = c0[0].clamp(t0, t1);
    let c1t = c1[0].clamp(t0, t1);
    let t = t.clamp(t0, t1);

    let mut lo = 0.0f32;
    let mut hi = 1.0f32;
    let mut u = (t - t0) / (t1 - t0);
    for _ in 0..BEZIER_ITERATIONS {
        let x = cubic_bezier(t0, c0t, c1t, t1, u);
        if (x - t).abs() < BEZIER_EPSILON {
            break;
        }
        if x < t {
            lo = u;
        } else {
            hi = u;
        }
        u = 0.5 * (lo + hi);
    }
    cubic_bezier(v0, c0[1], c1[1], v1, u)
}

#[inline]
fn dot4(a: [f32; 4], b: [f32; 4]) -> f32 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2] + a[3] * b[3]
}

/// Slerp between two quaternions along the shortest arc. Inputs need not be unit
/// length. Component order does not matter as long as both inputs share it.
pub fn slerp_quat(q1: [f32; 4], q2: [f32; 4], t: f32) -> [f32; 4] {
    let qa = normalize_quat(q1);
    let mut qb = normalize_quat(q2);

    let mut dot = dot4(qa, qb);
    if dot < 0.0 {
        qb = [-qb[0], -qb[1], -qb[2], -qb[3]];
        dot = -dot;
    }

    // Nearly parallel: normalized lerp avoids dividing by a tiny sine.
    const DOT_THRESHOLD: f32 = 0.9995;
    if dot > DOT_THRESHOLD {
        return normalize_quat([
            lerp_f32(qa[0], qb[0], t),
            lerp_f32(qa[1], qb[1], t),
            lerp_f32(qa[2], qb[2], t),
            lerp_f32(qa[3], qb[3], t),
        ]);
    }

    let theta_0 = dot.clamp(-1.0, 1.0).acos();
    let theta = theta_0 * t;
    let sin_theta_0 = theta_0.sin();
    let s0 = (theta_0 - theta).sin() / sin_theta_0;
    let s1 = theta.sin() / sin_theta_0;

    [
        s0 * qa[0] + s1 * qb[0],
        s0 * qa[1] + s1 * qb[1],
        s0 * qa[2] + s1 * qb[2],
        s0 * qa[3] + s1 * qb[3],
    ]
}
