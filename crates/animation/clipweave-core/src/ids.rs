//! Identifiers and a simple allocator for handler-owned resources.
//!
//! Resources are looked up by id through the [`Handler`](crate::handler::Handler)
//! rather than owned by each other, so blend trees can be edited at runtime
//! without ownership cycles.

use serde::{Deserialize, Serialize};

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct ClipId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct BlendNodeId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct AnimatorId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct MappingId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct MapperId(pub u32);

#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct SkeletonId(pub u32);

/// Scene node receiving property writes. Allocated by the host scene, not by this crate.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct TargetId(pub u64);

/// Host-side callback handle. The delivery layer owns the actual callable.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize)]
pub struct CallbackId(pub u64);

macro_rules! display_as_inner {
    ($($id:ty),* $(,)?) => {
        $(
            impl std::fmt::Display for $id {
                fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                    write!(f, "{}", self.0)
                }
            }
        )*
    };
}

display_as_inner!(
    ClipId,
    BlendNodeId,
    AnimatorId,
    MappingId,
    MapperId,
    SkeletonId,
    TargetId,
    CallbackId,
);

/// Monotonic allocator for handler-owned ids.
#[derive(Default, Debug)]
pub struct IdAllocator {
    next_clip: u32,
    next_blend_node: u32,
    next_animator: u32,
    next_mapping: u32,
    next_mapper: u32,
    next_skeleton: u32,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn alloc_clip(&mut self) -> ClipId {
        let id = ClipId(self.next_clip);
        self.next_clip = self.next_clip.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_blend_node(&mut self) -> BlendNodeId {
        let id = BlendNodeId(self.next_blend_node);
        self.next_blend_node = self.next_blend_node.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_animator(&mut self) -> AnimatorId {
        let id = AnimatorId(self.next_animator);
        self.next_animator = self.next_animator.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_mapping(&mut self) -> MappingId {
        let id = MappingId(self.next_mapping);
        self.next_mapping = self.next_mapping.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_mapper(&mut self) -> MapperId {
        let id = MapperId(self.next_mapper);
        self.next_mapper = self.next_mapper.wrapping_add(1);
        id
    }

    #[inline]
    pub fn alloc_skeleton(&mut self) -> SkeletonId {
        let id = SkeletonId(self.next_skeleton);
        self.next_skeleton = self.next_skeleton.wrapping_add(1);
        id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn alloc_monotonic_per_kind() {
        let mut alloc = IdAllocator::new();
        assert_eq!(alloc.alloc_clip(), ClipId(0));
        assert_eq!(alloc.alloc_clip(), ClipId(1));
        assert_eq!(alloc.alloc_blend_node(), BlendNodeId(0));
        assert_eq!(alloc.alloc_animator(), AnimatorId(0));
        assert_eq!(alloc.alloc_animator(), AnimatorId(1));
        assert_eq!(alloc.alloc_mapping(), MappingId(0));
        assert_eq!(alloc.alloc_mapper(), MapperId(0));
        assert_eq!(alloc.alloc_skeleton(), SkeletonId(0));
        assert_eq!(alloc.alloc_skeleton(), SkeletonId(1));
    }
}
