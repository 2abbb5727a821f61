//! Channel indexer: match a clip channel's named components to a value type's
//! canonical component slots.

use crate::data::Channel;
use crate::value::ValueType;

/// Source offsets for each canonical slot of a type; `None` marks a slot the
/// channel does not provide.
pub type SourceComponentIndices = Vec<Option<usize>>;

/// Map `channel`'s components onto `ty`'s canonical order, offsetting each
/// found position by `offset` (the channel's base index in the raw layout).
///
/// For vector, quaternion and color types, named components are matched on their
/// trailing character against the type's suffix table, so "Location Z" lands in slot 2
/// of a vec3 wherever it is stored. Scalars, and channels whose components are all
/// unnamed, are mapped positionally.
pub fn channel_components_to_indices(
    channel: &Channel,
    ty: ValueType,
    offset: usize,
) -> SourceComponentIndices {
    let expected = ty.component_count();
    if channel.components.len() != expected {
        log::warn!(
            "channel '{}' has {} components but {} expects {}",
            channel.name,
            channel.components.len(),
            ty.tag(),
            expected
        );
    }

    let positional = match ty {
        ValueType::Float => true,
        ValueType::Vec2 | ValueType::Vec3 | ValueType::Vec4 | ValueType::Quat | ValueType::Color => {
            channel.components.iter().all(|c| c.name.is_empty())
        }
    };
    if positional {
        return (0..expected)
            .map(|i| (i < channel.components.len()).then_some(offset + i))
            .collect();
    }
    channel_components_to_indices_helper(channel, ty.component_suffixes(), offset)
}

/// Suffix matching against an explicit table. The first component whose name
/// ends in a suffix wins.
pub fn channel_components_to_indices_helper(
    channel: &Channel,
    suffixes: &[char],
    offset: usize,
) -> SourceComponentIndices {
    suffixes
        .iter()
        .map(|&suffix| {
            channel
                .components
                .iter()
                .position(|c| {
                    c.name
                        .chars()
                        .next_back()
                        .is_some_and(|last| last.eq_ignore_ascii_case(&suffix))
                })
                .map(|i| offset + i)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{ChannelComponent, FCurve};

    fn channel(name: &str, components: &[&str]) -> Channel {
        Channel::new(
            name,
            components
                .iter()
                .map(|n| ChannelComponent {
                    name: (*n).into(),
                    curve: FCurve::default(),
                })
                .collect(),
        )
    }

    #[test]
    fn named_components_map_in_canonical_order() {
        let ch = channel("Location", &["Location Z", "Location X", "Location Y"]);
        let idx = channel_components_to_indices(&ch, ValueType::Vec3, 10);
        assert_eq!(idx, vec![Some(11), Some(12), Some(10)]);
    }

    #[test]
    fn missing_components_use_sentinel() {
        let ch = channel("Location", &["Location X", "Location Z"]);
        let idx = channel_components_to_indices(&ch, ValueType::Vec3, 0);
        assert_eq!(idx, vec![Some(0), None, Some(1)]);
    }

    #[test]
    fn superset_channels_ignore_extra_components() {
        let ch = channel("Position", &["Position X", "Position Y", "Position Z"]);
        let idx = channel_components_to_indices(&ch, ValueType::Vec2, 4);
        assert_eq!(idx, vec![Some(4), Some(5)]);
    }

    #[test]
    fn unnamed_components_map_positionally() {
        let ch = channel("Opacity", &[""]);
        assert_eq!(
            channel_components_to_indices(&ch, ValueType::Float, 7),
            vec![Some(7)]
        );
        let ch = channel("Color", &["", ""]);
        assert_eq!(
            channel_components_to_indices(&ch, ValueType::Color, 0),
            vec![Some(0), Some(1), None, None]
        );
    }

    #[test]
    fn named_scalars_map_positionally() {
        let ch = channel("Opacity", &["Opacity"]);
        assert_eq!(
            channel_components_to_indices(&ch, ValueType::Float, 0),
            vec![Some(0)]
        );
        let ch = channel("Intensity", &["Intensity"]);
        assert_eq!(
            channel_components_to_indices(&ch, ValueType::Float, 5),
            vec![Some(5)]
        );
    }

    #[test]
    fn color_suffixes_are_rgba() {
        let ch = channel("Color", &["Color A", "Color B", "Color G", "Color R"]);
        let idx = channel_components_to_indices(&ch, ValueType::Color, 0);
        assert_eq!(idx, vec![Some(3), Some(2), Some(1), Some(0)]);
    }

    #[test]
    fn indexing_is_idempotent() {
        let ch = channel("Rotation", &["Rotation W", "Rotation X", "Rotation Y", "Rotation Z"]);
        let a = channel_components_to_indices(&ch, ValueType::Quat, 3);
        let b = channel_components_to_indices(&ch, ValueType::Quat, 3);
        assert_eq!(a, b);
        assert_eq!(a, vec![Some(4), Some(5), Some(6), Some(3)]);
    }
}
