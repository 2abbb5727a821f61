//! Read-only skeleton description: joint list with rest poses.
//!
//! Topology (parenting, bind matrices) belongs to the host; evaluation only needs
//! the joint count and the rest pose used as the default for un-animated joints.

use serde::{Deserialize, Serialize};

use crate::value::ValueType;

/// Which part of a joint transform a channel drives.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JointTransformComponent {
    #[default]
    None,
    Scale,
    Rotation,
    Translation,
}

/// Channels a skeleton mapping requires for every joint, in layout order.
pub const JOINT_CHANNELS: [(&str, ValueType, JointTransformComponent); 3] = [
    ("Location", ValueType::Vec3, JointTransformComponent::Translation),
    ("Rotation", ValueType::Quat, JointTransformComponent::Rotation),
    ("Scale", ValueType::Vec3, JointTransformComponent::Scale),
];

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct JointPose {
    pub scale: [f32; 3],
    /// Quaternion (x, y, z, w).
    pub rotation: [f32; 4],
    pub translation: [f32; 3],
}

impl Default for JointPose {
    fn default() -> Self {
        Self {
            scale: [1.0, 1.0, 1.0],
            rotation: [0.0, 0.0, 0.0, 1.0],
            translation: [0.0, 0.0, 0.0],
        }
    }
}

impl JointPose {
    /// Components of one part of the pose, in that part's canonical order.
    pub fn component(&self, part: JointTransformComponent) -> Option<Vec<f32>> {
        match part {
            JointTransformComponent::Scale => Some(self.scale.to_vec()),
            JointTransformComponent::Rotation => Some(self.rotation.to_vec()),
            JointTransformComponent::Translation => Some(self.translation.to_vec()),
            JointTransformComponent::None => None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Joint {
    pub name: String,
    #[serde(default)]
    pub rest: JointPose,
}

impl Joint {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rest: JointPose::default(),
        }
    }

    pub fn with_rest(mut self, rest: JointPose) -> Self {
        self.rest = rest;
        self
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Skeleton {
    pub name: String,
    pub joints: Vec<Joint>,
}

impl Skeleton {
    pub fn new(name: impl Into<String>, joints: Vec<Joint>) -> Self {
        Self {
            name: name.into(),
            joints,
        }
    }

    #[inline]
    pub fn joint_count(&self) -> usize {
        self.joints.len()
    }

    pub fn rest_component(&self, joint_index: usize, part: JointTransformComponent) -> Option<Vec<f32>> {
        self.joints.get(joint_index)?.rest.component(part)
    }
}
