//! Error taxonomy: compilation errors, submission errors, and computation
//! failures. Computation failures are data that travel downstream as failed
//! work items; they never abort the pipeline.

use crate::graph::{Edge, EdgeKind};
use crate::node::NodeKey;
use thiserror::Error;

/// Errors surfaced by graph construction, compilation, input submission, and
/// node computation. `Clone` because a single failure fans out to every
/// downstream dependent and to every reader of a failed awaitable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FlowError {
  /// The graph has no topological order under the chosen edge kind.
  #[error("graph has a cycle under edge kind {0}")]
  Cycle(EdgeKind),

  /// A different node instance already occupies this key.
  #[error("node {0} is already in the graph with a different instance")]
  DuplicateNode(NodeKey),

  /// The named node is not a member of the graph.
  #[error("node {0} is not in the graph")]
  UnknownNode(NodeKey),

  /// The node's attribute capability produced data that does not parse.
  #[error("malformed attributes on node {node}: {reason}")]
  Attributes { node: NodeKey, reason: String },

  /// A node with more than one input must expose an operator.
  #[error("node {node} has {inputs} inputs but no operator")]
  MissingOperator { node: NodeKey, inputs: usize },

  /// No channel was allocated for an edge the node is wired to.
  #[error("no channel allocated for edge {0}")]
  Wiring(Edge),

  /// Values may only be submitted for graph input nodes.
  #[error("node {0} is not an input of the graph")]
  NotAnInput(NodeKey),

  /// The named input node already received its value.
  #[error("input for node {0} was already submitted")]
  DuplicateInput(NodeKey),

  /// A node's operator returned a failure. Propagates downstream unchanged.
  #[error("operator on node {node} failed: {reason}")]
  Operator { node: NodeKey, reason: String },

  /// The executor was closed; no further submissions are accepted.
  #[error("executor is closed")]
  Closed,
}
