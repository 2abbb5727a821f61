//! Handler: id-indexed registry of every resource evaluation reads.
//!
//! Blend nodes refer to each other and to clips by id, never by ownership, so a
//! tree can be re-wired at runtime. Lookups that fail report `Unknown*` errors.

use hashbrown::HashMap;
use indexmap::IndexMap;

use crate::animator::Animator;
use crate::blend_tree::{BlendNode, BlendNodeSource};
use crate::data::Clip;
use crate::error::{EvalError, Result};
use crate::ids::{AnimatorId, BlendNodeId, ClipId, IdAllocator, MapperId, MappingId, SkeletonId};
use crate::mapping::{ChannelMapper, ChannelMapping};
use crate::skeleton::Skeleton;

#[derive(Debug, Default)]
pub struct Handler {
    ids: IdAllocator,
    clips: HashMap<ClipId, Clip>,
    blend_nodes: HashMap<BlendNodeId, BlendNode>,
    mappings: HashMap<MappingId, ChannelMapping>,
    mappers: HashMap<MapperId, ChannelMapper>,
    skeletons: HashMap<SkeletonId, Skeleton>,
    // Insertion order is evaluation and output order.
    animators: IndexMap<AnimatorId, Animator>,
}

impl Handler {
    pub fn new() -> Self {
        Self::default()
    }

    // Clips

    /// Register a clip after validating it.
    pub fn add_clip(&mut self, clip: Clip) -> Result<ClipId> {
        clip.validate()?;
        let id = self.ids.alloc_clip();
        self.clips.insert(id, clip);
        Ok(id)
    }

    pub fn clip(&self, id: ClipId) -> Result<&Clip> {
        self.clips.get(&id).ok_or(EvalError::UnknownClip(id))
    }

    /// Replace a registered clip. Formats built against the old clip are stale afterwards.
    pub fn replace_clip(&mut self, id: ClipId, clip: Clip) -> Result<()> {
        clip.validate()?;
        let slot = self.clips.get_mut(&id).ok_or(EvalError::UnknownClip(id))?;
        *slot = clip;
        Ok(())
    }

    pub fn remove_clip(&mut self, id: ClipId) -> Option<Clip> {
        self.clips.remove(&id)
    }

    // Blend nodes

    pub fn add_blend_node(&mut self, node: BlendNode) -> BlendNodeId {
        let id = self.ids.alloc_blend_node();
        self.blend_nodes.insert(id, node);
        id
    }

    /// Insert or overwrite the node stored under `id`.
    pub fn set_blend_node(&mut self, id: BlendNodeId, node: BlendNode) {
        self.blend_nodes.insert(id, node);
    }

    pub fn blend_node(&self, id: BlendNodeId) -> Result<&BlendNode> {
        self.blend_nodes.get(&id).ok_or(EvalError::UnknownBlendNode(id))
    }

    pub fn blend_node_mut(&mut self, id: BlendNodeId) -> Result<&mut BlendNode> {
        self.blend_nodes
            .get_mut(&id)
            .ok_or(EvalError::UnknownBlendNode(id))
    }

    pub fn remove_blend_node(&mut self, id: BlendNodeId) -> Option<BlendNode> {
        self.blend_nodes.remove(&id)
    }

    // Mappings

    pub fn add_mapping(&mut self, mapping: ChannelMapping) -> MappingId {
        let id = self.ids.alloc_mapping();
        self.mappings.insert(id, mapping);
        id
    }

    pub fn mapping(&self, id: MappingId) -> Result<&ChannelMapping> {
        self.mappings.get(&id).ok_or(EvalError::UnknownMapping(id))
    }

    pub fn add_mapper(&mut self, mapper: ChannelMapper) -> MapperId {
        let id = self.ids.alloc_mapper();
        self.mappers.insert(id, mapper);
        id
    }

    pub fn mapper(&self, id: MapperId) -> Result<&ChannelMapper> {
        self.mappers.get(&id).ok_or(EvalError::UnknownMapper(id))
    }

    pub fn add_skeleton(&mut self, skeleton: Skeleton) -> SkeletonId {
        let id = self.ids.alloc_skeleton();
        self.skeletons.insert(id, skeleton);
        id
    }

    pub fn skeleton(&self, id: SkeletonId) -> Result<&Skeleton> {
        self.skeletons.get(&id).ok_or(EvalError::UnknownSkeleton(id))
    }

    // Animators

    pub fn add_animator(&mut self, animator: Animator) -> AnimatorId {
        let id = self.ids.alloc_animator();
        self.animators.insert(id, animator);
        id
    }

    pub fn animator(&self, id: AnimatorId) -> Result<&Animator> {
        self.animators.get(&id).ok_or(EvalError::UnknownAnimator(id))
    }

    pub fn animator_mut(&mut self, id: AnimatorId) -> Result<&mut Animator> {
        self.animators
            .get_mut(&id)
            .ok_or(EvalError::UnknownAnimator(id))
    }

    pub fn remove_animator(&mut self, id: AnimatorId) -> Option<Animator> {
        self.animators.shift_remove(&id)
    }

    pub fn animators(&self) -> impl Iterator<Item = (AnimatorId, &Animator)> {
        self.animators.iter().map(|(id, a)| (*id, a))
    }
}

impl BlendNodeSource for Handler {
    fn resolve_node(&self, id: BlendNodeId) -> Option<&BlendNode> {
        self.blend_nodes.get(&id)
    }

    fn resolve_clip(&self, id: ClipId) -> Option<&Clip> {
        self.clips.get(&id)
    }
}
