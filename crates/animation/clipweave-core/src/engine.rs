//! Engine: owns the handler and per-animator caches, and drives one frame.
//!
//! Methods:
//! - new, handler/handler_mut, add_animator, prepare_animator, invalidate_animator,
//!   set_blend_factor, start_animator/stop_animator, update (evaluate → apply)
//!
//! `update` evaluates every running animator against read-only data (in parallel
//! when configured), then applies playback state and collects outputs on the
//! calling thread in animator order. A failing animator only loses its own frame.

use hashbrown::HashMap;
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use crate::animator::{Animator, AnimatorSource};
use crate::blend_tree::{
    blend_tree_duration, evaluate_blend_tree, gather_all_value_nodes, BlendNode, BlendNodeSource,
};
use crate::config::Config;
use crate::error::{EvalError, Result, TreeFault};
use crate::format::{
    assign_channel_component_indices, build_required_channels_and_types, combine_source_clip_masks,
    format_clip_results, generate_clip_format_indices_with_defaults, ChannelNameAndType, ClipFormat,
    ClipResults, ComponentIndices, ComponentMask,
};
use crate::handler::Handler;
use crate::ids::{AnimatorId, BlendNodeId};
use crate::mapping::{build_property_mappings, MappingData};
use crate::outputs::{
    animator_change, prepare_callbacks, prepare_property_changes, CallbackInvocation, CoreEvent,
    Outputs, PropertyChange, NORMALIZED_TIME_PROPERTY,
};
use crate::sampling::evaluate_clip_at_local_time;
use crate::time::{
    evaluation_data_for_animator, evaluation_data_for_clip, final_frame_for_rate,
    phase_from_elapsed_time, ClipEvaluationData,
};
use crate::value::Value;

/// Formats compiled for an animator's source.
#[derive(Clone, Debug, PartialEq)]
pub enum PreparedSource {
    Clip(ClipFormat),
    /// One format per value node, covering every leaf regardless of blend factors.
    BlendTree(HashMap<BlendNodeId, ClipFormat>),
}

/// Everything an animator needs per frame that only changes with configuration.
#[derive(Clone, Debug, PartialEq)]
pub struct PreparedAnimator {
    pub names_and_types: Vec<ChannelNameAndType>,
    pub component_indices: Vec<ComponentIndices>,
    /// Per-channel union of what the source animates.
    pub source_clip_mask: Vec<ComponentMask>,
    pub source: PreparedSource,
    pub mapping_data: Vec<MappingData>,
}

/// Result of evaluating one animator for one frame. Nothing is applied yet.
#[derive(Clone, Debug, PartialEq)]
pub struct AnimatorFrame {
    pub current_loop: u32,
    pub local_time: f64,
    pub normalized_time: f64,
    pub final_frame: bool,
    pub results: ClipResults,
    pub changes: Vec<PropertyChange>,
    pub callbacks: Vec<CallbackInvocation>,
}

/// Duration of an animator's source in seconds.
pub fn source_duration(handler: &Handler, source: AnimatorSource) -> Result<f64> {
    match source {
        AnimatorSource::Clip(clip) => Ok(handler.clip(clip)?.duration),
        AnimatorSource::BlendTree(root) => blend_tree_duration(handler, root),
    }
}

/// Resolve the animator's channel layout, compile formats for its clip or every
/// leaf of its tree, and build its mapping table.
pub fn prepare_animator(handler: &Handler, animator: &Animator) -> Result<PreparedAnimator> {
    let names_and_types = build_required_channels_and_types(handler, animator.mapper)?;
    let component_indices = assign_channel_component_indices(&names_and_types);

    let (source, source_clip_mask) = match animator.source {
        AnimatorSource::Clip(clip_id) => {
            let clip = handler.clip(clip_id)?;
            let format = generate_clip_format_indices_with_defaults(
                &names_and_types,
                &component_indices,
                clip,
                handler,
            );
            let mask = format.source_clip_mask.clone();
            (PreparedSource::Clip(format), mask)
        }
        AnimatorSource::BlendTree(root) => {
            let mut formats = HashMap::new();
            for leaf in gather_all_value_nodes(handler, root)? {
                let Some(BlendNode::Value { clip }) = handler.resolve_node(leaf).copied() else {
                    continue;
                };
                let clip_data = handler.resolve_clip(clip).ok_or_else(|| {
                    EvalError::malformed(root, TreeFault::UnresolvedClip { node: leaf, clip })
                })?;
                formats.insert(
                    leaf,
                    generate_clip_format_indices_with_defaults(
                        &names_and_types,
                        &component_indices,
                        clip_data,
                        handler,
                    ),
                );
            }
            let mask = combine_source_clip_masks(formats.values());
            (PreparedSource::BlendTree(formats), mask)
        }
    };

    let mapping_data = build_property_mappings(
        handler,
        animator.mapper,
        &names_and_types,
        &component_indices,
        &source_clip_mask,
    )?;

    Ok(PreparedAnimator {
        names_and_types,
        component_indices,
        source_clip_mask,
        source,
        mapping_data,
    })
}

/// Evaluate one animator for one frame. Pure with respect to `handler` and `animator`.
pub fn evaluate_animator(
    handler: &Handler,
    id: AnimatorId,
    animator: &Animator,
    prepared: &PreparedAnimator,
    elapsed_ns: i64,
    cfg: &Config,
) -> Result<AnimatorFrame> {
    let data = evaluation_data_for_animator(
        animator.loops,
        animator.current_loop,
        animator.last_local_time,
        animator.playback_rate,
        elapsed_ns,
    );

    let (clip_data, duration, results) = match (animator.source, &prepared.source) {
        (AnimatorSource::Clip(clip_id), PreparedSource::Clip(format)) => {
            let clip = handler.clip(clip_id)?;
            let clip_data = evaluation_data_for_clip(clip, &data);
            let raw = evaluate_clip_at_local_time(clip, clip_data.local_time);
            (clip_data, clip.duration, format_clip_results(&raw, format))
        }
        (AnimatorSource::BlendTree(root), PreparedSource::BlendTree(formats)) => {
            let duration = blend_tree_duration(handler, root)?;
            let mut current_loop = data.current_loop;
            let phase = phase_from_elapsed_time(
                data.current_time,
                data.elapsed_time,
                data.playback_rate,
                duration,
                data.loop_count,
                &mut current_loop,
            );
            let local_time = phase * duration.max(0.0);
            let is_final_frame = final_frame_for_rate(
                data.playback_rate,
                local_time,
                duration,
                current_loop,
                data.loop_count,
            );
            let results = evaluate_blend_tree(handler, root, formats, phase)?;
            let clip_data = ClipEvaluationData {
                current_loop,
                local_time,
                is_final_frame,
            };
            (clip_data, duration, results)
        }
        _ => return Err(EvalError::StalePreparation(id)),
    };

    let final_frame = clip_data.is_final_frame;
    let normalized_time = if duration > 0.0 {
        clip_data.local_time / duration
    } else {
        0.0
    };

    let mut changes = prepare_property_changes(id, &prepared.mapping_data, &results, final_frame);
    if cfg.emit_normalized_time {
        changes.push(animator_change(
            id,
            NORMALIZED_TIME_PROPERTY,
            Value::Float(normalized_time as f32),
            final_frame,
        ));
    }
    let callbacks = prepare_callbacks(&prepared.mapping_data, &results);

    Ok(AnimatorFrame {
        current_loop: clip_data.current_loop,
        local_time: clip_data.local_time,
        normalized_time,
        final_frame,
        results,
        changes,
        callbacks,
    })
}

#[derive(Debug, Default)]
pub struct Engine {
    cfg: Config,
    handler: Handler,
    prepared: HashMap<AnimatorId, PreparedAnimator>,

    // Per-frame outputs
    outputs: Outputs,
}

impl Engine {
    /// Create a new engine with the given config.
    pub fn new(cfg: Config) -> Self {
        Self {
            cfg,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &Config {
        &self.cfg
    }

    pub fn handler(&self) -> &Handler {
        &self.handler
    }

    /// Mutable registry access. Any resource may change through it, so every
    /// prepared animator is dropped and rebuilt on its next frame.
    pub fn handler_mut(&mut self) -> &mut Handler {
        self.prepared.clear();
        &mut self.handler
    }

    /// Register an animator. One still at its origin is rewound first, so reverse
    /// playback starts from the end of its last loop.
    pub fn add_animator(&mut self, mut animator: Animator) -> AnimatorId {
        if animator.is_at_origin() {
            match source_duration(&self.handler, animator.source) {
                Ok(duration) => animator.rewind(duration),
                Err(error) => log::debug!("animator added before its source resolves: {error}"),
            }
        }
        self.handler.add_animator(animator)
    }

    /// Build and cache the animator's layout, formats and mapping table.
    pub fn prepare_animator(&mut self, id: AnimatorId) -> Result<()> {
        let prepared = prepare_animator(&self.handler, self.handler.animator(id)?)?;
        self.prepared.insert(id, prepared);
        Ok(())
    }

    /// Drop the cached preparation; the next frame rebuilds it.
    pub fn invalidate_animator(&mut self, id: AnimatorId) {
        self.prepared.remove(&id);
    }

    pub fn prepared(&self, id: AnimatorId) -> Option<&PreparedAnimator> {
        self.prepared.get(&id)
    }

    /// Change a lerp or additive factor in place. Formats cover every leaf, so no
    /// animator needs re-preparing.
    pub fn set_blend_factor(&mut self, node: BlendNodeId, factor: f32) -> Result<()> {
        match self.handler.blend_node_mut(node)? {
            BlendNode::Lerp { blend_factor, .. } => *blend_factor = factor,
            BlendNode::Additive {
                additive_factor, ..
            } => *additive_factor = factor,
            BlendNode::Value { .. } => {
                log::warn!("blend node {node} is a value node; factor ignored");
            }
        }
        Ok(())
    }

    /// Rewind and run the animator.
    pub fn start_animator(&mut self, id: AnimatorId) -> Result<()> {
        let duration = source_duration(&self.handler, self.handler.animator(id)?.source)?;
        let animator = self.handler.animator_mut(id)?;
        animator.rewind(duration);
        animator.running = true;
        Ok(())
    }

    pub fn stop_animator(&mut self, id: AnimatorId) -> Result<()> {
        self.handler.animator_mut(id)?.running = false;
        Ok(())
    }

    /// Advance every running animator by `elapsed_ns` and collect its outputs.
    pub fn update(&mut self, elapsed_ns: i64) -> &Outputs {
        self.outputs.clear();

        let running: Vec<AnimatorId> = self
            .handler
            .animators()
            .filter(|(_, a)| a.running)
            .map(|(id, _)| id)
            .collect();

        let mut failed = Vec::new();
        for &id in &running {
            if self.prepared.contains_key(&id) {
                continue;
            }
            match self.prepare_animator(id) {
                Ok(()) => log::debug!("prepared animator {id}"),
                Err(error) => failed.push((id, error)),
            }
        }

        let handler = &self.handler;
        let prepared = &self.prepared;
        let cfg = &self.cfg;
        let jobs: Vec<(AnimatorId, &Animator, &PreparedAnimator)> = running
            .iter()
            .filter_map(|&id| Some((id, handler.animator(id).ok()?, prepared.get(&id)?)))
            .collect();
        let eval = |job: &(AnimatorId, &Animator, &PreparedAnimator)| {
            let (id, animator, prep) = *job;
            (id, evaluate_animator(handler, id, animator, prep, elapsed_ns, cfg))
        };

        #[cfg(feature = "parallel")]
        let results: Vec<(AnimatorId, Result<AnimatorFrame>)> =
            if cfg.parallel && jobs.len() >= cfg.min_parallel_animators {
                jobs.par_iter().map(&eval).collect()
            } else {
                jobs.iter().map(&eval).collect()
            };
        #[cfg(not(feature = "parallel"))]
        let results: Vec<(AnimatorId, Result<AnimatorFrame>)> = jobs.iter().map(&eval).collect();

        for (id, error) in failed {
            self.report_failure(id, error);
        }
        for (id, result) in results {
            match result {
                Ok(frame) => self.apply_frame(id, frame),
                Err(error) => self.report_failure(id, error),
            }
        }
        &self.outputs
    }

    fn report_failure(&mut self, animator: AnimatorId, error: EvalError) {
        log::warn!("animator {animator}: frame skipped: {error}");
        self.outputs
            .push_event(CoreEvent::EvaluationFailed { animator, error });
    }

    fn apply_frame(&mut self, id: AnimatorId, frame: AnimatorFrame) {
        if let Ok(animator) = self.handler.animator_mut(id) {
            animator.current_loop = frame.current_loop;
            animator.last_local_time = frame.local_time;
            animator.last_normalized_time = frame.normalized_time;
            if frame.final_frame {
                animator.running = false;
            }
        }
        self.outputs.changes.extend(frame.changes);
        self.outputs.callbacks.extend(frame.callbacks);
        if frame.final_frame {
            self.outputs
                .push_event(CoreEvent::AnimatorFinished { animator: id });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{Channel, ChannelComponent, Clip, FCurve, Keyframe};
    use crate::ids::TargetId;
    use crate::mapping::{ChannelMapper, ChannelMapping};
    use crate::outputs::ChangeTarget;

    fn ramp_clip() -> Clip {
        Clip::new(
            "ramp",
            vec![Channel::new(
                "Opacity",
                vec![ChannelComponent {
                    name: String::new(),
                    curve: FCurve::new(vec![Keyframe::linear(0.0, 0.0), Keyframe::linear(2.0, 1.0)]),
                }],
            )],
        )
    }

    fn engine_with_ramp(loops: u32) -> (Engine, AnimatorId) {
        let mut engine = Engine::new(Config::sequential());
        let handler = engine.handler_mut();
        let clip = handler.add_clip(ramp_clip()).expect("clip");
        let mapping = handler.add_mapping(ChannelMapping::property(TargetId(1), "opacity", "Opacity", "float"));
        let mapper = handler.add_mapper(ChannelMapper::new(vec![mapping]));
        let id = engine.add_animator(Animator::for_clip(clip, mapper).with_loops(loops));
        (engine, id)
    }

    #[test]
    fn prepare_builds_layout_and_mappings() {
        let (mut engine, id) = engine_with_ramp(1);
        engine.prepare_animator(id).expect("prepare");
        let prepared = engine.prepared(id).expect("cached");
        assert_eq!(prepared.component_indices, vec![vec![0]]);
        assert_eq!(prepared.mapping_data.len(), 1);
        engine.invalidate_animator(id);
        assert!(engine.prepared(id).is_none());
    }

    #[test]
    fn update_writes_and_finishes() {
        let (mut engine, id) = engine_with_ramp(1);
        let out = engine.update(1_000_000_000);
        assert_eq!(out.changes.len(), 1);
        assert_eq!(out.changes[0].value, Value::Float(0.5));
        assert!(out.events.is_empty());

        let out = engine.update(5_000_000_000);
        assert_eq!(out.changes[0].value, Value::Float(1.0));
        assert!(out.changes[0].final_frame);
        assert!(matches!(
            &out.changes[1].target,
            ChangeTarget::Animator { property, .. } if property == "running"
        ));
        assert_eq!(out.events, vec![CoreEvent::AnimatorFinished { animator: id }]);
        assert!(!engine.handler().animator(id).expect("animator").running);

        assert!(engine.update(1_000_000_000).is_empty());
        engine.start_animator(id).expect("restart");
        assert_eq!(engine.update(0).changes[0].value, Value::Float(0.0));
    }

    #[test]
    fn reverse_animators_start_from_the_end_when_added() {
        let mut engine = Engine::new(Config::sequential());
        let handler = engine.handler_mut();
        let clip = handler.add_clip(ramp_clip()).expect("clip");
        let mapping = handler.add_mapping(ChannelMapping::property(TargetId(1), "opacity", "Opacity", "float"));
        let mapper = handler.add_mapper(ChannelMapper::new(vec![mapping]));
        let id = engine.add_animator(Animator::for_clip(clip, mapper).with_playback_rate(-1.0));
        assert_eq!(engine.handler().animator(id).expect("animator").last_local_time, 2.0);

        let out = engine.update(500_000_000);
        assert_eq!(out.changes[0].value, Value::Float(0.75));
        assert!(!out.changes[0].final_frame);
        assert!(out.events.is_empty());
        assert!(engine.handler().animator(id).expect("animator").running);
    }

    #[test]
    fn handler_mut_drops_preparations() {
        let (mut engine, id) = engine_with_ramp(0);
        engine.prepare_animator(id).expect("prepare");
        let _ = engine.handler_mut();
        assert!(engine.prepared(id).is_none());
    }
}
