//! Value types carried by animated channels and the values delivered to targets.
//!
//! `ValueType` is the closed set of shapes a target property can have. It fixes
//! how many flat components a channel occupies and in which canonical order
//! those components are laid out.

use serde::{Deserialize, Serialize};

use crate::error::{EvalError, Result};

const VECTOR_SUFFIXES: [char; 4] = ['X', 'Y', 'Z', 'W'];
const QUATERNION_SUFFIXES: [char; 4] = ['X', 'Y', 'Z', 'W'];
const COLOR_SUFFIXES: [char; 4] = ['R', 'G', 'B', 'A'];

const IDENTITY_QUAT: [f32; 4] = [0.0, 0.0, 0.0, 1.0];

#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    Float,
    Vec2,
    Vec3,
    Vec4,
    /// Quaternion laid out (x, y, z, w).
    Quat,
    /// RGBA color.
    Color,
}

impl ValueType {
    /// Parse a type tag as found in channel mapping configuration.
    pub fn from_tag(tag: &str) -> Result<Self> {
        match tag.to_ascii_lowercase().as_str() {
            "float" | "double" | "scalar" => Ok(ValueType::Float),
            "vec2" | "vector2" | "vector2d" => Ok(ValueType::Vec2),
            "vec3" | "vector3" | "vector3d" => Ok(ValueType::Vec3),
            "vec4" | "vector4" | "vector4d" => Ok(ValueType::Vec4),
            "quat" | "quaternion" => Ok(ValueType::Quat),
            "color" | "colorrgba" | "rgba" => Ok(ValueType::Color),
            _ => Err(EvalError::UnsupportedType {
                tag: tag.to_string(),
            }),
        }
    }

    pub fn tag(self) -> &'static str {
        match self {
            ValueType::Float => "float",
            ValueType::Vec2 => "vec2",
            ValueType::Vec3 => "vec3",
            ValueType::Vec4 => "vec4",
            ValueType::Quat => "quat",
            ValueType::Color => "color",
        }
    }

    #[inline]
    pub fn component_count(self) -> usize {
        match self {
            ValueType::Float => 1,
            ValueType::Vec2 => 2,
            ValueType::Vec3 => 3,
            ValueType::Vec4 | ValueType::Quat | ValueType::Color => 4,
        }
    }

    /// Canonical component order, as the trailing character of a component name.
    pub fn component_suffixes(self) -> &'static [char] {
        let n = self.component_count();
        match self {
            ValueType::Quat => &QUATERNION_SUFFIXES[..n],
            ValueType::Color => &COLOR_SUFFIXES[..n],
            _ => &VECTOR_SUFFIXES[..n],
        }
    }

    /// Neutral value used when a channel has no data and nothing better is known.
    pub fn identity_components(self) -> Vec<f32> {
        match self {
            ValueType::Quat => IDENTITY_QUAT.to_vec(),
            _ => vec![0.0; self.component_count()],
        }
    }
}

/// Component count for a raw type tag. Unsupported tags are logged and yield 0,
/// which callers treat as "skip this channel".
pub fn components_for_type(tag: &str) -> usize {
    match ValueType::from_tag(tag) {
        Ok(ty) => ty.component_count(),
        Err(err) => {
            log::warn!("{err}; treating channel as zero-width");
            0
        }
    }
}

/// Value delivered to a property or callback. Opaque to the evaluator.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "data")]
pub enum Value {
    Float(f32),
    Vec2([f32; 2]),
    Vec3([f32; 3]),
    Vec4([f32; 4]),
    /// Quaternion (x, y, z, w), normalized.
    Quat([f32; 4]),
    ColorRgba([f32; 4]),
    /// Step value used for animator status properties.
    Bool(bool),
}

impl Value {
    /// Build a value from components laid out in `ty`'s canonical order.
    /// Returns `None` if fewer components than the type needs are supplied.
    pub fn from_components(ty: ValueType, c: &[f32]) -> Option<Value> {
        if c.len() < ty.component_count() {
            return None;
        }
        let v = match ty {
            ValueType::Float => Value::Float(c[0]),
            ValueType::Vec2 => Value::Vec2([c[0], c[1]]),
            ValueType::Vec3 => Value::Vec3([c[0], c[1], c[2]]),
            ValueType::Vec4 => Value::Vec4([c[0], c[1], c[2], c[3]]),
            ValueType::Quat => Value::Quat(normalize_quat([c[0], c[1], c[2], c[3]])),
            ValueType::Color => Value::ColorRgba([c[0], c[1], c[2], c[3]]),
        };
        Some(v)
    }

    pub fn value_type(&self) -> Option<ValueType> {
        match self {
            Value::Float(_) => Some(ValueType::Float),
            Value::Vec2(_) => Some(ValueType::Vec2),
            Value::Vec3(_) => Some(ValueType::Vec3),
            Value::Vec4(_) => Some(ValueType::Vec4),
            Value::Quat(_) => Some(ValueType::Quat),
            Value::ColorRgba(_) => Some(ValueType::Color),
            Value::Bool(_) => None,
        }
    }
}

/// Normalize a quaternion (x, y, z, w); a zero quaternion becomes identity.
pub(crate) fn normalize_quat(q: [f32; 4]) -> [f32; 4] {
    let mag = (q[0] * q[0] + q[1] * q[1] + q[2] * q[2] + q[3] * q[3]).sqrt();
    if mag == 0.0 {
        IDENTITY_QUAT
    } else {
        [q[0] / mag, q[1] / mag, q[2] / mag, q[3] / mag]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn component_counts_cover_the_closed_set() {
        assert_eq!(components_for_type("float"), 1);
        assert_eq!(components_for_type("vec2"), 2);
        assert_eq!(components_for_type("Vector3D"), 3);
        assert_eq!(components_for_type("vec4"), 4);
        assert_eq!(components_for_type("quaternion"), 4);
        assert_eq!(components_for_type("color"), 4);
    }

    #[test]
    fn unsupported_tag_is_zero_width() {
        assert_eq!(components_for_type("matrix4x4"), 0);
        assert_eq!(
            ValueType::from_tag("matrix4x4"),
            Err(EvalError::UnsupportedType {
                tag: "matrix4x4".into()
            })
        );
    }

    #[test]
    fn suffix_tables_match_component_counts() {
        for ty in [
            ValueType::Float,
            ValueType::Vec2,
            ValueType::Vec3,
            ValueType::Vec4,
            ValueType::Quat,
            ValueType::Color,
        ] {
            assert_eq!(ty.component_suffixes().len(), ty.component_count());
            assert_eq!(ty.identity_components().len(), ty.component_count());
        }
        assert_eq!(ValueType::Color.component_suffixes(), &['R', 'G', 'B', 'A']);
    }

    #[test]
    fn quat_values_are_normalized() {
        let v = Value::from_components(ValueType::Quat, &[0.0, 0.0, 0.0, 2.0]).unwrap();
        assert_eq!(v, Value::Quat([0.0, 0.0, 0.0, 1.0]));
        assert!(Value::from_components(ValueType::Vec3, &[1.0, 2.0]).is_none());
    }
}
