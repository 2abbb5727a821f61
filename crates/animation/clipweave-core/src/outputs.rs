//! Output contracts: property writes and callback invocations for one frame.
//!
//! The core never writes to scene state. It returns ordered change records and
//! callback records; the host applies them on its own thread after evaluation.

use serde::{Deserialize, Serialize};

use crate::error::EvalError;
use crate::format::ComponentIndices;
use crate::ids::{AnimatorId, CallbackId, SkeletonId, TargetId};
use crate::mapping::{CallbackFlags, MappingData, MappingTarget};
use crate::skeleton::JointTransformComponent;
use crate::value::{Value, ValueType};

/// Animator status property cleared on the final frame.
pub const RUNNING_PROPERTY: &str = "running";
/// Animator progress property, local time over duration.
pub const NORMALIZED_TIME_PROPERTY: &str = "normalizedTime";

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChangeTarget {
    Property {
        target: TargetId,
        property: String,
    },
    /// Joint-pose update on a skeleton.
    Joint {
        skeleton: SkeletonId,
        joint_index: usize,
        component: JointTransformComponent,
    },
    /// Status property of the animator itself.
    Animator {
        animator: AnimatorId,
        property: String,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PropertyChange {
    pub target: ChangeTarget,
    pub value: Value,
    pub final_frame: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CallbackInvocation {
    pub target: TargetId,
    pub callback: CallbackId,
    pub flags: CallbackFlags,
    pub value: Value,
}

impl CallbackInvocation {
    #[inline]
    pub fn should_invoke(&self, final_frame: bool) -> bool {
        self.flags.should_invoke(final_frame)
    }
}

/// Discrete signals emitted alongside the frame's changes.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum CoreEvent {
    /// The animator's frame was skipped; nothing was emitted for it.
    EvaluationFailed {
        animator: AnimatorId,
        error: EvalError,
    },
    /// The animator reached its final frame and stopped.
    AnimatorFinished { animator: AnimatorId },
}

/// Outputs returned by `Engine::update()`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Outputs {
    #[serde(default)]
    pub changes: Vec<PropertyChange>,
    #[serde(default)]
    pub callbacks: Vec<CallbackInvocation>,
    #[serde(default)]
    pub events: Vec<CoreEvent>,
}

impl Outputs {
    #[inline]
    pub fn clear(&mut self) {
        self.changes.clear();
        self.callbacks.clear();
        self.events.clear();
    }

    #[inline]
    pub fn push_event(&mut self, event: CoreEvent) {
        self.events.push(event);
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty() && self.callbacks.is_empty() && self.events.is_empty()
    }
}

/// Gather a target's components out of the formatted buffer into a value.
pub fn build_property_value(
    value_type: ValueType,
    indices: &ComponentIndices,
    results: &[f32],
) -> Option<Value> {
    let mut components = [0.0f32; 4];
    for (slot, &index) in components.iter_mut().zip(indices) {
        *slot = *results.get(index)?;
    }
    Value::from_components(value_type, &components[..indices.len().min(4)])
}

/// Property and joint writes for one animator's frame, in mapping order. On the
/// final frame the animator's `running` property is cleared after all writes.
pub fn prepare_property_changes(
    animator: AnimatorId,
    mapping_data: &[MappingData],
    results: &[f32],
    final_frame: bool,
) -> Vec<PropertyChange> {
    let mut changes = Vec::with_capacity(mapping_data.len() + 1);
    for mapping in mapping_data {
        let target = match &mapping.target {
            MappingTarget::Property { target, property } => ChangeTarget::Property {
                target: *target,
                property: property.clone(),
            },
            MappingTarget::Joint {
                skeleton,
                joint_index,
                component,
            } => ChangeTarget::Joint {
                skeleton: *skeleton,
                joint_index: *joint_index,
                component: *component,
            },
            MappingTarget::Callback { .. } => continue,
        };
        let Some(value) = build_property_value(mapping.value_type, &mapping.channel_indices, results)
        else {
            log::warn!("animator {animator}: result buffer too short for {target:?}");
            continue;
        };
        changes.push(PropertyChange {
            target,
            value,
            final_frame,
        });
    }

    if final_frame {
        changes.push(animator_change(animator, RUNNING_PROPERTY, Value::Bool(false), true));
    }
    changes
}

/// Callback invocations for one animator's frame, in mapping order.
pub fn prepare_callbacks(mapping_data: &[MappingData], results: &[f32]) -> Vec<CallbackInvocation> {
    mapping_data
        .iter()
        .filter_map(|mapping| match mapping.target {
            MappingTarget::Callback {
                target,
                callback,
                flags,
            } => build_property_value(mapping.value_type, &mapping.channel_indices, results).map(
                |value| CallbackInvocation {
                    target,
                    callback,
                    flags,
                    value,
                },
            ),
            _ => None,
        })
        .collect()
}

pub fn animator_change(
    animator: AnimatorId,
    property: &str,
    value: Value,
    final_frame: bool,
) -> PropertyChange {
    PropertyChange {
        target: ChangeTarget::Animator {
            animator,
            property: property.to_string(),
        },
        value,
        final_frame,
    }
}
