//! Interpolation helpers used by curve sampling and blend operators.

pub mod functions;

pub use functions::{bezier_segment_value, lerp_f32, slerp_quat};
