use serde::Deserialize;

use crate::data::{Channel, ChannelComponent, Clip, FCurve, Interpolation, Keyframe};
use crate::error::{EvalError, Result};

/// Public API: parse keyframe clip JSON into [`Clip`]s (see fixtures/clips/*.json).
///
/// Notes:
/// - Times are seconds. Each key is `coords: [time, value]`.
/// - A key carrying either handle is a bezier key; the handles are absolute
///   `[time, value]` control points. Other keys are linear.
/// - `duration` is optional and defaults to the latest key time in the clip.
/// - Every parsed clip is validated before it is returned.
pub fn parse_clip_json(s: &str) -> Result<Vec<Clip>> {
    let file: StoredClipFile =
        serde_json::from_str(s).map_err(|e| EvalError::ClipParse(e.to_string()))?;

    let mut clips = Vec::with_capacity(file.animations.len());
    for stored in file.animations {
        let channels = stored.channels.into_iter().map(to_channel).collect();
        let mut clip = Clip::new(stored.animation_name, channels);
        if let Some(duration) = stored.duration {
            clip = clip.with_duration(duration);
        }
        clip.validate()?;
        clips.push(clip);
    }
    Ok(clips)
}

fn to_channel(stored: StoredChannel) -> Channel {
    let components = stored
        .channel_components
        .into_iter()
        .map(|c| ChannelComponent {
            name: c.channel_component_name,
            curve: FCurve::new(c.key_frames.into_iter().map(to_keyframe).collect()),
        })
        .collect();
    Channel {
        name: stored.channel_name,
        joint_index: stored.joint_index,
        components,
    }
}

fn to_keyframe(k: StoredKeyFrame) -> Keyframe {
    let [time, value] = k.coords;
    let interpolation = if k.left_handle.is_some() || k.right_handle.is_some() {
        Interpolation::Bezier
    } else {
        Interpolation::Linear
    };
    Keyframe {
        time,
        value,
        interpolation,
        left_handle: k.left_handle,
        right_handle: k.right_handle,
    }
}

#[derive(Debug, Deserialize)]
struct StoredClipFile {
    #[serde(default)]
    animations: Vec<StoredAnimation>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredAnimation {
    animation_name: String,
    #[serde(default)]
    duration: Option<f64>,
    #[serde(default)]
    channels: Vec<StoredChannel>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredChannel {
    channel_name: String,
    #[serde(default)]
    joint_index: Option<usize>,
    #[serde(default)]
    channel_components: Vec<StoredComponent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredComponent {
    #[serde(default)]
    channel_component_name: String,
    #[serde(default)]
    key_frames: Vec<StoredKeyFrame>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoredKeyFrame {
    coords: [f32; 2],
    #[serde(default)]
    left_handle: Option<[f32; 2]>,
    #[serde(default)]
    right_handle: Option<[f32; 2]>,
}

#[cfg(test)]
mod tests {
    use super::*;

    const CLIP: &str = r#"{
        "animations": [{
            "animationName": "fade",
            "channels": [{
                "channelName": "Opacity",
                "channelComponents": [{
                    "channelComponentName": "",
                    "keyFrames": [
                        { "coords": [0.0, 0.0], "rightHandle": [0.5, 0.0] },
                        { "coords": [1.5, 1.0], "leftHandle": [1.0, 1.0] }
                    ]
                }]
            }]
        }]
    }"#;

    #[test]
    fn parses_keys_and_infers_duration() {
        let clips = parse_clip_json(CLIP).expect("parse clip");
        assert_eq!(clips.len(), 1);
        let clip = &clips[0];
        assert_eq!(clip.name, "fade");
        assert_eq!(clip.duration, 1.5);
        let keys = clip.channels[0].components[0].curve.keyframes();
        assert_eq!(keys[0].interpolation, Interpolation::Bezier);
        assert_eq!(keys[0].right_handle, Some([0.5, 0.0]));
    }

    #[test]
    fn malformed_json_is_a_parse_error() {
        assert!(matches!(parse_clip_json("{"), Err(EvalError::ClipParse(_))));
    }

    #[test]
    fn negative_duration_is_rejected() {
        let json = r#"{"animations":[{"animationName":"x","duration":-1.0}]}"#;
        assert!(matches!(parse_clip_json(json), Err(EvalError::InvalidClip(_))));
    }
}
