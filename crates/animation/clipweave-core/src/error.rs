//! Error types for animation evaluation.
//!
//! Missing channels and degenerate (zero-length) clips are not errors: they are
//! defaulted and only logged. Everything here aborts, at most, one animator's frame.

use serde::{Deserialize, Serialize};

use crate::ids::{AnimatorId, BlendNodeId, ClipId, MapperId, MappingId, SkeletonId};

/// Why a blend tree could not be evaluated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TreeFault {
    /// A node id referenced by the tree is not registered.
    UnresolvedNode(BlendNodeId),
    /// The node was reached again while still on the active traversal path.
    Cycle(BlendNodeId),
    /// A value node references a clip that is not registered.
    UnresolvedClip { node: BlendNodeId, clip: ClipId },
    /// A value node has no format prepared for this animator.
    MissingFormat(BlendNodeId),
    /// Children of a blend node produced buffers of different lengths.
    LayoutMismatch {
        node: BlendNodeId,
        expected: usize,
        found: usize,
    },
}

impl std::fmt::Display for TreeFault {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TreeFault::UnresolvedNode(id) => write!(f, "node {id} is not registered"),
            TreeFault::Cycle(id) => write!(f, "cycle through node {id}"),
            TreeFault::UnresolvedClip { node, clip } => {
                write!(f, "value node {node} references unknown clip {clip}")
            }
            TreeFault::MissingFormat(id) => write!(f, "no clip format prepared for node {id}"),
            TreeFault::LayoutMismatch {
                node,
                expected,
                found,
            } => write!(
                f,
                "children of node {node} disagree on layout: expected {expected} values, found {found}"
            ),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[non_exhaustive]
pub enum EvalError {
    /// Value-type tag outside the supported set.
    #[error("unsupported value type tag '{tag}'")]
    UnsupportedType { tag: String },

    /// Unresolvable node or cycle in a blend tree.
    #[error("malformed blend tree rooted at node {root}: {reason}")]
    MalformedTree { root: BlendNodeId, reason: TreeFault },

    #[error("clip {0} is not registered")]
    UnknownClip(ClipId),

    #[error("blend node {0} is not registered")]
    UnknownBlendNode(BlendNodeId),

    #[error("animator {0} is not registered")]
    UnknownAnimator(AnimatorId),

    #[error("channel mapper {0} is not registered")]
    UnknownMapper(MapperId),

    #[error("channel mapping {0} is not registered")]
    UnknownMapping(MappingId),

    #[error("skeleton {0} is not registered")]
    UnknownSkeleton(SkeletonId),

    /// The animator's source changed after its formats were compiled.
    #[error("animator {0} changed since it was prepared")]
    StalePreparation(AnimatorId),

    #[error("clip json parse error: {0}")]
    ClipParse(String),

    #[error("invalid clip: {0}")]
    InvalidClip(String),
}

impl EvalError {
    pub(crate) fn malformed(root: BlendNodeId, reason: TreeFault) -> Self {
        EvalError::MalformedTree { root, reason }
    }
}

pub type Result<T> = std::result::Result<T, EvalError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_tree_message_names_root_and_reason() {
        let err = EvalError::malformed(BlendNodeId(3), TreeFault::UnresolvedNode(BlendNodeId(9)));
        assert_eq!(
            err.to_string(),
            "malformed blend tree rooted at node 3: node 9 is not registered"
        );
    }
}
