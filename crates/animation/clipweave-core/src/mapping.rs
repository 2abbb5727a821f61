//! Channel mappings: which animated channels drive which target properties,
//! joints, or callbacks, and the per-animator `MappingData` built from them.

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::format::{ChannelNameAndType, ComponentIndices, ComponentMask};
use crate::handler::Handler;
use crate::ids::{CallbackId, MapperId, MappingId, SkeletonId, TargetId};
use crate::skeleton::{JointTransformComponent, JOINT_CHANNELS};
use crate::value::ValueType;

/// When a callback binding fires.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackDelivery {
    #[default]
    EveryFrame,
    FinalFrameOnly,
}

/// Where the delivery layer should run the callback.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CallbackThread {
    #[default]
    OwningThread,
    ThreadPool,
}

#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CallbackFlags {
    #[serde(default)]
    pub delivery: CallbackDelivery,
    #[serde(default)]
    pub thread: CallbackThread,
}

impl CallbackFlags {
    pub fn final_frame_only() -> Self {
        Self {
            delivery: CallbackDelivery::FinalFrameOnly,
            ..Self::default()
        }
    }

    #[inline]
    pub fn should_invoke(self, final_frame: bool) -> bool {
        match self.delivery {
            CallbackDelivery::EveryFrame => true,
            CallbackDelivery::FinalFrameOnly => final_frame,
        }
    }
}

/// One binding from a channel name to a delivery target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ChannelMapping {
    Channel {
        target: TargetId,
        property: String,
        channel: String,
        #[serde(rename = "type")]
        type_tag: String,
        /// Value used while no clip animates the channel.
        #[serde(default)]
        default: Option<Vec<f32>>,
    },
    Callback {
        target: TargetId,
        channel: String,
        #[serde(rename = "type")]
        type_tag: String,
        callback: CallbackId,
        #[serde(default)]
        flags: CallbackFlags,
    },
    /// Drives Location, Rotation and Scale of every joint of the skeleton.
    Skeleton { skeleton: SkeletonId },
}

impl ChannelMapping {
    pub fn property(
        target: TargetId,
        property: impl Into<String>,
        channel: impl Into<String>,
        type_tag: impl Into<String>,
    ) -> Self {
        ChannelMapping::Channel {
            target,
            property: property.into(),
            channel: channel.into(),
            type_tag: type_tag.into(),
            default: None,
        }
    }

    pub fn callback(
        target: TargetId,
        channel: impl Into<String>,
        type_tag: impl Into<String>,
        callback: CallbackId,
        flags: CallbackFlags,
    ) -> Self {
        ChannelMapping::Callback {
            target,
            channel: channel.into(),
            type_tag: type_tag.into(),
            callback,
            flags,
        }
    }
}

/// Ordered set of mappings an animator writes through.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ChannelMapper {
    pub mappings: Vec<MappingId>,
}

impl ChannelMapper {
    pub fn new(mappings: Vec<MappingId>) -> Self {
        Self { mappings }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingTarget {
    Property {
        target: TargetId,
        property: String,
    },
    Joint {
        skeleton: SkeletonId,
        joint_index: usize,
        component: JointTransformComponent,
    },
    Callback {
        target: TargetId,
        callback: CallbackId,
        flags: CallbackFlags,
    },
}

/// Binding of one formatted-buffer region to one delivery target.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MappingData {
    pub target: MappingTarget,
    pub value_type: ValueType,
    /// Positions in the formatted buffer, in the value type's canonical order.
    pub channel_indices: ComponentIndices,
}

fn resolve_type(id: MappingId, type_tag: &str) -> Option<ValueType> {
    match ValueType::from_tag(type_tag) {
        Ok(ty) => Some(ty),
        Err(err) => {
            log::warn!("mapping {id}: {err}; skipping channel");
            None
        }
    }
}

/// Expand one mapping into the channels it requires, each paired with its target.
/// Unsupported type tags make the mapping zero-width: it is logged and expands to nothing.
pub(crate) fn expand_mapping(
    handler: &Handler,
    id: MappingId,
    mapping: &ChannelMapping,
) -> Result<Vec<(ChannelNameAndType, MappingTarget)>> {
    let expanded: Vec<(ChannelNameAndType, MappingTarget)> = match mapping {
        ChannelMapping::Channel {
            target,
            property,
            channel,
            type_tag,
            ..
        } => resolve_type(id, type_tag)
            .map(|ty| {
                (
                    ChannelNameAndType::new(channel.clone(), ty).with_mapping(id),
                    MappingTarget::Property {
                        target: *target,
                        property: property.clone(),
                    },
                )
            })
            .into_iter()
            .collect(),
        ChannelMapping::Callback {
            target,
            channel,
            type_tag,
            callback,
            flags,
        } => resolve_type(id, type_tag)
            .map(|ty| {
                (
                    ChannelNameAndType::new(channel.clone(), ty).with_mapping(id),
                    MappingTarget::Callback {
                        target: *target,
                        callback: *callback,
                        flags: *flags,
                    },
                )
            })
            .into_iter()
            .collect(),
        ChannelMapping::Skeleton { skeleton } => {
            let joints = handler.skeleton(*skeleton)?.joint_count();
            let mut out = Vec::with_capacity(joints * JOINT_CHANNELS.len());
            for joint_index in 0..joints {
                for (name, ty, component) in JOINT_CHANNELS {
                    out.push((
                        ChannelNameAndType::new(name, ty)
                            .for_joint(joint_index, component)
                            .with_mapping(id),
                        MappingTarget::Joint {
                            skeleton: *skeleton,
                            joint_index,
                            component,
                        },
                    ));
                }
            }
            out
        }
    };
    Ok(expanded)
}

/// Build the per-animator mapping table: for each bound target, the slice of the
/// formatted buffer it reads. Channels no source animates (mask all false) are skipped
/// so an animator never overwrites properties it does not drive.
pub fn build_property_mappings(
    handler: &Handler,
    mapper: MapperId,
    names_and_types: &[ChannelNameAndType],
    channel_component_indices: &[ComponentIndices],
    source_clip_mask: &[ComponentMask],
) -> Result<Vec<MappingData>> {
    let mapper = handler.mapper(mapper)?;
    let mut out = Vec::new();
    for &id in &mapper.mappings {
        let mapping = handler.mapping(id)?;
        for (required, target) in expand_mapping(handler, id, mapping)? {
            let Some(index) = names_and_types.iter().position(|c| c.same_channel(&required)) else {
                log::debug!("mapping {id}: channel '{}' not in layout", required.name);
                continue;
            };
            if !source_clip_mask.get(index).is_some_and(|m| m.any()) {
                continue;
            }
            let Some(indices) = channel_component_indices.get(index) else {
                continue;
            };
            out.push(MappingData {
                target,
                value_type: required.value_type,
                channel_indices: indices.clone(),
            });
        }
    }
    Ok(out)
}
