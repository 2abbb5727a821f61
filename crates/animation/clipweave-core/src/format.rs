//! Format negotiation between what a clip provides and what targets require.
//!
//! The required channel list of an animator fixes a dense output layout. A
//! [`ClipFormat`] compiles, for one clip, where each output slot is read from in
//! the clip's raw samples and which slots fall back to defaults. Formatting never
//! fails on missing data: the output is always fully populated.

use serde::{Deserialize, Serialize};

use crate::channel::channel_components_to_indices;
use crate::data::Clip;
use crate::error::Result;
use crate::handler::Handler;
use crate::ids::{MapperId, MappingId};
use crate::mapping::{expand_mapping, ChannelMapping};
use crate::skeleton::JointTransformComponent;
use crate::value::ValueType;

/// Ordered offsets into a flat float buffer, in component order.
pub type ComponentIndices = Vec<usize>;

/// Flat sample buffer. Meaning comes from the format or mapping that reads it.
pub type ClipResults = Vec<f32>;

/// One channel a bound target requires.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChannelNameAndType {
    pub name: String,
    pub value_type: ValueType,
    #[serde(default)]
    pub joint_index: Option<usize>,
    #[serde(default)]
    pub joint_transform_component: JointTransformComponent,
    /// Mapping that first required this channel; not part of its identity.
    #[serde(default)]
    pub mapping: Option<MappingId>,
}

impl ChannelNameAndType {
    pub fn new(name: impl Into<String>, value_type: ValueType) -> Self {
        Self {
            name: name.into(),
            value_type,
            joint_index: None,
            joint_transform_component: JointTransformComponent::None,
            mapping: None,
        }
    }

    pub fn for_joint(mut self, joint_index: usize, component: JointTransformComponent) -> Self {
        self.joint_index = Some(joint_index);
        self.joint_transform_component = component;
        self
    }

    pub fn with_mapping(mut self, mapping: MappingId) -> Self {
        self.mapping = Some(mapping);
        self
    }

    #[inline]
    pub fn component_count(&self) -> usize {
        self.value_type.component_count()
    }

    /// Same channel identity: name, type, joint index and joint transform part.
    pub fn same_channel(&self, other: &ChannelNameAndType) -> bool {
        self.name == other.name
            && self.value_type == other.value_type
            && self.joint_index == other.joint_index
            && self.joint_transform_component == other.joint_transform_component
    }
}

/// Per-channel presence bits, one per expected component.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ComponentMask {
    bits: u8,
    len: u8,
}

impl ComponentMask {
    /// Mask of `len` components, all absent. Value types never exceed four components.
    pub fn new(len: usize) -> Self {
        Self {
            bits: 0,
            len: len.min(8) as u8,
        }
    }

    pub fn full(len: usize) -> Self {
        let mut mask = Self::new(len);
        mask.bits = ((1u16 << mask.len) - 1) as u8;
        mask
    }

    #[inline]
    pub fn len(self) -> usize {
        self.len as usize
    }

    #[inline]
    pub fn is_empty(self) -> bool {
        self.len == 0
    }

    #[inline]
    pub fn get(self, i: usize) -> bool {
        i < self.len() && self.bits & (1 << i) != 0
    }

    #[inline]
    pub fn set(&mut self, i: usize, present: bool) {
        if i >= self.len() {
            return;
        }
        if present {
            self.bits |= 1 << i;
        } else {
            self.bits &= !(1 << i);
        }
    }

    #[inline]
    pub fn any(self) -> bool {
        self.bits != 0
    }

    #[inline]
    pub fn all(self) -> bool {
        self.bits.count_ones() as usize == self.len()
    }

    pub fn union(self, other: ComponentMask) -> ComponentMask {
        ComponentMask {
            bits: self.bits | other.bits,
            len: self.len.max(other.len),
        }
    }
}

/// Default written to one formatted slot when the clip lacks that component.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ComponentValue {
    pub component_index: usize,
    pub value: f32,
}

/// Compiled plan turning one clip's raw samples into the animator's layout.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct ClipFormat {
    /// Raw offsets to copy from, one per expected component in destination visit order.
    pub source_clip_indices: Vec<Option<usize>>,
    pub source_clip_mask: Vec<ComponentMask>,
    pub formatted_component_indices: Vec<ComponentIndices>,
    pub names_and_types: Vec<ChannelNameAndType>,
    pub default_component_values: Vec<ComponentValue>,
}

impl ClipFormat {
    /// Length of the formatted buffer.
    pub fn formatted_len(&self) -> usize {
        self.formatted_component_indices
            .iter()
            .flat_map(|indices| indices.iter())
            .map(|&i| i + 1)
            .max()
            .unwrap_or(0)
    }
}

/// Supplies per-channel defaults for components a clip does not animate.
pub trait DefaultValueSource {
    fn default_value_for_channel(&self, channel: &ChannelNameAndType) -> Vec<f32>;
}

/// Zero for everything except quaternions, which default to identity.
#[derive(Copy, Clone, Debug, Default)]
pub struct IdentityDefaults;

impl DefaultValueSource for IdentityDefaults {
    fn default_value_for_channel(&self, channel: &ChannelNameAndType) -> Vec<f32> {
        channel.value_type.identity_components()
    }
}

impl DefaultValueSource for Handler {
    fn default_value_for_channel(&self, channel: &ChannelNameAndType) -> Vec<f32> {
        default_value_for_channel(self, channel)
    }
}

/// Default for a required channel: a joint's rest pose for skeletal channels, the
/// mapping's declared default for plain channels, identity otherwise.
pub fn default_value_for_channel(handler: &Handler, channel: &ChannelNameAndType) -> Vec<f32> {
    let expected = channel.component_count();
    let declared = channel
        .mapping
        .and_then(|id| handler.mapping(id).ok())
        .and_then(|mapping| match mapping {
            ChannelMapping::Skeleton { skeleton } => {
                let joint = channel.joint_index?;
                handler
                    .skeleton(*skeleton)
                    .ok()?
                    .rest_component(joint, channel.joint_transform_component)
            }
            ChannelMapping::Channel { default, .. } => default.clone(),
            ChannelMapping::Callback { .. } => None,
        });

    match declared {
        Some(values) if values.len() == expected => values,
        Some(values) => {
            log::warn!(
                "default for channel '{}' has {} components, expected {}",
                channel.name,
                values.len(),
                expected
            );
            channel.value_type.identity_components()
        }
        None => channel.value_type.identity_components(),
    }
}

/// Resolve, in mapper order, every channel the mapper's targets require.
/// Channels with the same identity are listed once.
pub fn build_required_channels_and_types(
    handler: &Handler,
    mapper: MapperId,
) -> Result<Vec<ChannelNameAndType>> {
    let mapper = handler.mapper(mapper)?;
    let mut required: Vec<ChannelNameAndType> = Vec::new();
    for &id in &mapper.mappings {
        let mapping = handler.mapping(id)?;
        for (channel, _) in expand_mapping(handler, id, mapping)? {
            if !required.iter().any(|c| c.same_channel(&channel)) {
                required.push(channel);
            }
        }
    }
    Ok(required)
}

/// Give each required channel a contiguous destination range, in list order.
pub fn assign_channel_component_indices(names_and_types: &[ChannelNameAndType]) -> Vec<ComponentIndices> {
    let mut next = 0;
    names_and_types
        .iter()
        .map(|channel| {
            let count = channel.component_count();
            let indices = (next..next + count).collect();
            next += count;
            indices
        })
        .collect()
}

/// Build the format for `clip` using identity defaults.
pub fn generate_clip_format_indices(
    target_channels: &[ChannelNameAndType],
    target_indices: &[ComponentIndices],
    clip: &Clip,
) -> ClipFormat {
    generate_clip_format_indices_with_defaults(target_channels, target_indices, clip, &IdentityDefaults)
}

pub fn generate_clip_format_indices_with_defaults(
    target_channels: &[ChannelNameAndType],
    target_indices: &[ComponentIndices],
    clip: &Clip,
    defaults: &dyn DefaultValueSource,
) -> ClipFormat {
    let mut format = ClipFormat {
        names_and_types: target_channels.to_vec(),
        formatted_component_indices: target_indices.to_vec(),
        ..ClipFormat::default()
    };

    for (channel, destination) in target_channels.iter().zip(target_indices) {
        let count = channel.component_count();
        let source = match clip.channel_index(&channel.name, channel.joint_index) {
            Some(ci) => {
                let base = clip.channel_component_base_index(ci);
                channel_components_to_indices(&clip.channels[ci], channel.value_type, base)
            }
            None => {
                log::debug!(
                    "clip '{}' has no channel '{}'; using defaults",
                    clip.name,
                    channel.name
                );
                vec![None; count]
            }
        };

        let mut mask = ComponentMask::new(count);
        for (k, src) in source.iter().enumerate() {
            mask.set(k, src.is_some());
        }

        if !mask.all() {
            let mut values = defaults.default_value_for_channel(channel);
            if values.len() != count {
                values = channel.value_type.identity_components();
            }
            for (k, &dst) in destination.iter().enumerate() {
                if !mask.get(k) {
                    format.default_component_values.push(ComponentValue {
                        component_index: dst,
                        value: values.get(k).copied().unwrap_or(0.0),
                    });
                }
            }
        }

        format.source_clip_indices.extend(source);
        format.source_clip_mask.push(mask);
    }
    format
}

/// Convert raw clip samples into the formatted layout described by `format`.
/// The output length depends only on the required channels.
pub fn format_clip_results(raw: &[f32], format: &ClipFormat) -> ClipResults {
    let mut out = vec![0.0; format.formatted_len()];
    let mut cursor = 0;
    for (mask, destination) in format
        .source_clip_mask
        .iter()
        .zip(&format.formatted_component_indices)
    {
        for (k, &dst) in destination.iter().enumerate() {
            let source = format.source_clip_indices.get(cursor).copied().flatten();
            cursor += 1;
            if !mask.get(k) {
                continue;
            }
            if let (Some(slot), Some(&value)) = (out.get_mut(dst), source.and_then(|s| raw.get(s))) {
                *slot = value;
            }
        }
    }
    for default in &format.default_component_values {
        if let Some(slot) = out.get_mut(default.component_index) {
            *slot = default.value;
        }
    }
    out
}

/// Union of per-channel masks over several formats of the same layout.
pub fn combine_source_clip_masks<'a>(formats: impl IntoIterator<Item = &'a ClipFormat>) -> Vec<ComponentMask> {
    let mut combined: Vec<ComponentMask> = Vec::new();
    for format in formats {
        if combined.len() < format.source_clip_mask.len() {
            combined.resize(format.source_clip_mask.len(), ComponentMask::default());
        }
        for (acc, mask) in combined.iter_mut().zip(&format.source_clip_mask) {
            *acc = acc.union(*mask);
        }
    }
    combined
}
