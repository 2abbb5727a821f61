//! Blend tree evaluation.
//!
//! A blend tree is a DAG of nodes addressed by [`BlendNodeId`] and resolved through a
//! [`BlendNodeSource`]. Leaves (`Value` nodes) sample a clip and format it into the
//! animator's layout; internal nodes combine their children's formatted buffers
//! component-wise. Every traversal tracks the active path and reports a revisit as a
//! cycle, since ids are looked up dynamically and nothing guarantees acyclicity.

use hashbrown::{HashMap, HashSet};
use serde::{Deserialize, Serialize};

use crate::data::Clip;
use crate::error::{EvalError, Result, TreeFault};
use crate::format::{format_clip_results, ClipFormat, ClipResults};
use crate::ids::{BlendNodeId, ClipId};
use crate::interp::lerp_f32;
use crate::sampling::evaluate_clip_at_phase;

/// Node and clip lookup used by tree traversal.
pub trait BlendNodeSource {
    fn resolve_node(&self, id: BlendNodeId) -> Option<&BlendNode>;
    fn resolve_clip(&self, id: ClipId) -> Option<&Clip>;
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum BlendNode {
    /// Leaf: evaluates one clip.
    Value { clip: ClipId },
    /// `(1 - blend_factor) * start + blend_factor * end`.
    Lerp {
        start: BlendNodeId,
        end: BlendNodeId,
        blend_factor: f32,
    },
    /// `base + additive_factor * additive`.
    Additive {
        base: BlendNodeId,
        additive: BlendNodeId,
        additive_factor: f32,
    },
}

impl BlendNode {
    pub fn value(clip: ClipId) -> Self {
        BlendNode::Value { clip }
    }

    pub fn lerp(start: BlendNodeId, end: BlendNodeId, blend_factor: f32) -> Self {
        BlendNode::Lerp {
            start,
            end,
            blend_factor,
        }
    }

    pub fn additive(base: BlendNodeId, additive: BlendNodeId, additive_factor: f32) -> Self {
        BlendNode::Additive {
            base,
            additive,
            additive_factor,
        }
    }

    /// Children whose results the current factor actually needs, in evaluation order.
    pub fn current_dependencies(&self) -> Vec<BlendNodeId> {
        match *self {
            BlendNode::Value { .. } => Vec::new(),
            BlendNode::Lerp {
                start,
                end,
                blend_factor,
            } => {
                if blend_factor == 0.0 {
                    vec![start]
                } else if blend_factor == 1.0 {
                    vec![end]
                } else {
                    vec![start, end]
                }
            }
            BlendNode::Additive {
                base,
                additive,
                additive_factor,
            } => {
                if additive_factor == 0.0 {
                    vec![base]
                } else {
                    vec![base, additive]
                }
            }
        }
    }

    /// Every child regardless of factors.
    pub fn all_dependencies(&self) -> Vec<BlendNodeId> {
        match *self {
            BlendNode::Value { .. } => Vec::new(),
            BlendNode::Lerp { start, end, .. } => vec![start, end],
            BlendNode::Additive { base, additive, .. } => vec![base, additive],
        }
    }

    #[inline]
    pub fn is_value(&self) -> bool {
        matches!(self, BlendNode::Value { .. })
    }
}

#[derive(Copy, Clone)]
enum Edges {
    Current,
    All,
}

fn visit<S: BlendNodeSource + ?Sized>(
    source: &S,
    root: BlendNodeId,
    id: BlendNodeId,
    edges: Edges,
    path: &mut Vec<BlendNodeId>,
    visited: &mut HashSet<BlendNodeId>,
    order: &mut Vec<BlendNodeId>,
) -> Result<()> {
    if path.contains(&id) {
        return Err(EvalError::malformed(root, TreeFault::Cycle(id)));
    }
    if !visited.insert(id) {
        return Ok(());
    }
    let node = source
        .resolve_node(id)
        .ok_or_else(|| EvalError::malformed(root, TreeFault::UnresolvedNode(id)))?;
    order.push(id);

    let deps = match edges {
        Edges::Current => node.current_dependencies(),
        Edges::All => node.all_dependencies(),
    };
    path.push(id);
    for dep in deps {
        visit(source, root, dep, edges, path, visited, order)?;
    }
    path.pop();
    Ok(())
}

fn gather_value_nodes<S: BlendNodeSource + ?Sized>(
    source: &S,
    root: BlendNodeId,
    edges: Edges,
) -> Result<Vec<BlendNodeId>> {
    let mut order = Vec::new();
    visit(
        source,
        root,
        root,
        edges,
        &mut Vec::new(),
        &mut HashSet::new(),
        &mut order,
    )?;
    let mut leaves: Vec<BlendNodeId> = order
        .into_iter()
        .filter(|id| source.resolve_node(*id).is_some_and(BlendNode::is_value))
        .collect();
    leaves.sort_unstable();
    leaves.dedup();
    Ok(leaves)
}

/// Value nodes reachable through the dependencies the current blend factors need.
/// These are the leaves that must be sampled this frame.
pub fn gather_value_nodes_to_evaluate<S: BlendNodeSource + ?Sized>(
    source: &S,
    root: BlendNodeId,
) -> Result<Vec<BlendNodeId>> {
    gather_value_nodes(source, root, Edges::Current)
}

/// Every value node in the tree. Formats are prepared for all of them so factors can
/// change without re-preparing the animator.
pub fn gather_all_value_nodes<S: BlendNodeSource + ?Sized>(
    source: &S,
    root: BlendNodeId,
) -> Result<Vec<BlendNodeId>> {
    gather_value_nodes(source, root, Edges::All)
}

fn duration_of<S: BlendNodeSource + ?Sized>(
    source: &S,
    root: BlendNodeId,
    id: BlendNodeId,
    path: &mut Vec<BlendNodeId>,
) -> Result<f64> {
    if path.contains(&id) {
        return Err(EvalError::malformed(root, TreeFault::Cycle(id)));
    }
    let node = source
        .resolve_node(id)
        .ok_or_else(|| EvalError::malformed(root, TreeFault::UnresolvedNode(id)))?;

    path.push(id);
    let duration = match *node {
        BlendNode::Value { clip } => source
            .resolve_clip(clip)
            .map(|c| c.duration)
            .ok_or_else(|| EvalError::malformed(root, TreeFault::UnresolvedClip { node: id, clip }))?,
        BlendNode::Lerp {
            start,
            end,
            blend_factor,
        } => {
            let t = blend_factor as f64;
            if blend_factor == 0.0 {
                duration_of(source, root, start, path)?
            } else if blend_factor == 1.0 {
                duration_of(source, root, end, path)?
            } else {
                let a = duration_of(source, root, start, path)?;
                let b = duration_of(source, root, end, path)?;
                (1.0 - t) * a + t * b
            }
        }
        BlendNode::Additive { base, .. } => duration_of(source, root, base, path)?,
    };
    path.pop();
    Ok(duration)
}

/// Duration of the tree in seconds: clip duration at leaves, the factor-weighted
/// duration for lerps, the base duration for additive nodes.
pub fn blend_tree_duration<S: BlendNodeSource + ?Sized>(source: &S, root: BlendNodeId) -> Result<f64> {
    duration_of(source, root, root, &mut Vec::new())
}

/// Sample and format every leaf at `phase`.
pub fn evaluate_value_nodes<S: BlendNodeSource + ?Sized>(
    source: &S,
    root: BlendNodeId,
    leaves: &[BlendNodeId],
    formats: &HashMap<BlendNodeId, ClipFormat>,
    phase: f64,
) -> Result<HashMap<BlendNodeId, ClipResults>> {
    let mut results = HashMap::with_capacity(leaves.len());
    for &leaf in leaves {
        let node = source
            .resolve_node(leaf)
            .ok_or_else(|| EvalError::malformed(root, TreeFault::UnresolvedNode(leaf)))?;
        let BlendNode::Value { clip } = *node else {
            continue;
        };
        let clip_data = source
            .resolve_clip(clip)
            .ok_or_else(|| EvalError::malformed(root, TreeFault::UnresolvedClip { node: leaf, clip }))?;
        let format = formats
            .get(&leaf)
            .ok_or_else(|| EvalError::malformed(root, TreeFault::MissingFormat(leaf)))?;
        let raw = evaluate_clip_at_phase(clip_data, phase);
        results.insert(leaf, format_clip_results(&raw, format));
    }
    Ok(results)
}

fn check_layout(root: BlendNodeId, node: BlendNodeId, a: &[f32], b: &[f32]) -> Result<()> {
    if a.len() != b.len() {
        return Err(EvalError::malformed(
            root,
            TreeFault::LayoutMismatch {
                node,
                expected: a.len(),
                found: b.len(),
            },
        ));
    }
    Ok(())
}

struct Combiner<'a, S: ?Sized> {
    source: &'a S,
    root: BlendNodeId,
    leaf_results: &'a HashMap<BlendNodeId, ClipResults>,
    memo: HashMap<BlendNodeId, ClipResults>,
    path: Vec<BlendNodeId>,
}

impl<S: BlendNodeSource + ?Sized> Combiner<'_, S> {
    fn malformed(&self, reason: TreeFault) -> EvalError {
        EvalError::malformed(self.root, reason)
    }

    fn eval(&mut self, id: BlendNodeId) -> Result<ClipResults> {
        if let Some(done) = self.memo.get(&id) {
            return Ok(done.clone());
        }
        if self.path.contains(&id) {
            return Err(self.malformed(TreeFault::Cycle(id)));
        }
        let node = *self
            .source
            .resolve_node(id)
            .ok_or_else(|| self.malformed(TreeFault::UnresolvedNode(id)))?;

        self.path.push(id);
        let result = match node {
            BlendNode::Value { .. } => self
                .leaf_results
                .get(&id)
                .cloned()
                .ok_or_else(|| self.malformed(TreeFault::MissingFormat(id)))?,
            BlendNode::Lerp {
                start,
                end,
                blend_factor,
            } => {
                if blend_factor == 0.0 {
                    self.eval(start)?
                } else if blend_factor == 1.0 {
                    self.eval(end)?
                } else {
                    let a = self.eval(start)?;
                    let b = self.eval(end)?;
                    check_layout(self.root, id, &a, &b)?;
                    a.iter()
                        .zip(&b)
                        .map(|(&x, &y)| lerp_f32(x, y, blend_factor))
                        .collect()
                }
            }
            BlendNode::Additive {
                base,
                additive,
                additive_factor,
            } => {
                if additive_factor == 0.0 {
                    self.eval(base)?
                } else {
                    let a = self.eval(base)?;
                    let b = self.eval(additive)?;
                    check_layout(self.root, id, &a, &b)?;
                    a.iter()
                        .zip(&b)
                        .map(|(&x, &y)| x + additive_factor * y)
                        .collect()
                }
            }
        };
        self.path.pop();
        self.memo.insert(id, result.clone());
        Ok(result)
    }
}

/// Combine already-formatted leaf results up to `root`. Shared subtrees are combined once.
pub fn combine_blend_tree<S: BlendNodeSource + ?Sized>(
    source: &S,
    root: BlendNodeId,
    leaf_results: &HashMap<BlendNodeId, ClipResults>,
) -> Result<ClipResults> {
    Combiner {
        source,
        root,
        leaf_results,
        memo: HashMap::new(),
        path: Vec::new(),
    }
    .eval(root)
}

/// Evaluate a blend tree at `phase`: gather the needed leaves, sample them, combine.
pub fn evaluate_blend_tree<S: BlendNodeSource + ?Sized>(
    source: &S,
    root: BlendNodeId,
    formats: &HashMap<BlendNodeId, ClipFormat>,
    phase: f64,
) -> Result<ClipResults> {
    let leaves = gather_value_nodes_to_evaluate(source, root)?;
    let leaf_results = evaluate_value_nodes(source, root, &leaves, formats, phase)?;
    combine_blend_tree(source, root, &leaf_results)
}
