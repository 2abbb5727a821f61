//! Clipweave Core (engine-agnostic)
//!
//! Per-frame animation evaluation: time mapping with loops, channel/target format
//! negotiation, clip sampling, blend trees, and property-change / callback output.
//! Scene storage and delivery of the outputs stay with the host.

pub mod animator;
pub mod blend_tree;
pub mod channel;
pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod format;
pub mod handler;
pub mod ids;
pub mod interp;
pub mod mapping;
pub mod outputs;
pub mod sampling;
pub mod skeleton;
pub mod stored_clip;
pub mod time;
pub mod value;

// Re-exports for consumers (hosts)
pub use animator::{Animator, AnimatorSource};
pub use blend_tree::{
    blend_tree_duration, combine_blend_tree, evaluate_blend_tree, gather_all_value_nodes,
    gather_value_nodes_to_evaluate, BlendNode, BlendNodeSource,
};
pub use channel::{channel_components_to_indices, SourceComponentIndices};
pub use config::Config;
pub use data::{Channel, ChannelComponent, Clip, FCurve, Interpolation, Keyframe};
pub use engine::{evaluate_animator, prepare_animator, AnimatorFrame, Engine, PreparedAnimator};
pub use error::{EvalError, Result, TreeFault};
pub use format::{
    assign_channel_component_indices, build_required_channels_and_types, default_value_for_channel,
    format_clip_results, generate_clip_format_indices, ChannelNameAndType, ClipFormat, ClipResults,
    ComponentIndices, ComponentMask, DefaultValueSource,
};
pub use handler::Handler;
pub use ids::{
    AnimatorId, BlendNodeId, CallbackId, ClipId, MapperId, MappingId, SkeletonId, TargetId,
};
pub use mapping::{
    build_property_mappings, CallbackDelivery, CallbackFlags, CallbackThread, ChannelMapper,
    ChannelMapping, MappingData, MappingTarget,
};
pub use outputs::{
    prepare_callbacks, prepare_property_changes, CallbackInvocation, ChangeTarget, CoreEvent,
    Outputs, PropertyChange,
};
pub use sampling::{evaluate_clip_at_local_time, evaluate_clip_at_phase};
pub use skeleton::{Joint, JointPose, JointTransformComponent, Skeleton};
pub use stored_clip::parse_clip_json;
pub use time::{
    evaluation_data_for_animator, evaluation_data_for_clip, is_final_frame,
    local_time_from_elapsed_time, phase_from_elapsed_time, AnimatorEvaluationData,
    ClipEvaluationData,
};
pub use value::{components_for_type, Value, ValueType};
