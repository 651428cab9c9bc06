//! Graph collaborator interface consumed by the engine, plus [MemGraph], a
//! small in-memory implementation used for tests and stand-alone pipelines.
//! The engine itself only queries adjacency and topological order; it never
//! stores graph structure.

use crate::error::FlowError;
use crate::node::{FlowNode, NodeKey};
use std::collections::{HashMap, VecDeque};
use std::fmt;
use std::sync::Arc;

/// Edge classification tag. Independent relation types may coexist between
/// the same nodes; the flow engine operates over exactly one chosen kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EdgeKind(pub u32);

impl fmt::Display for EdgeKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{}", self.0)
  }
}

/// A directed relation between two nodes under one kind. Also the key of the
/// edge → channel map built at compilation.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Edge {
  pub from: NodeKey,
  pub to: NodeKey,
}

impl fmt::Display for Edge {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{} -> {}", self.from, self.to)
  }
}

/// The query interface the engine consumes from the graph collaborator.
pub trait GraphQuery<V>: Send + Sync {
  /// Looks up a node by key.
  fn node(&self, key: &NodeKey) -> Option<Arc<dyn FlowNode<V>>>;

  /// Edges arriving at `key` under `kind`, in recorded association order.
  /// This order fixes the input order seen by the node's operator.
  fn incoming(&self, key: &NodeKey, kind: EdgeKind) -> Vec<Edge>;

  /// Edges leaving `key` under `kind`, in recorded association order.
  fn outgoing(&self, key: &NodeKey, kind: EdgeKind) -> Vec<Edge>;

  /// Nodes in topological order under `kind`, or [FlowError::Cycle] if no
  /// such order exists.
  fn directed_sort(&self, kind: EdgeKind) -> Result<Vec<Arc<dyn FlowNode<V>>>, FlowError>;
}

/// In-memory graph: nodes keyed by [NodeKey], kinded edges in association
/// order. Adding the same node instance twice is idempotent; reusing a key
/// for a different instance is an error.
pub struct MemGraph<V> {
  nodes: HashMap<NodeKey, Arc<dyn FlowNode<V>>>,
  order: Vec<NodeKey>,
  edges: HashMap<EdgeKind, Vec<Edge>>,
}

impl<V> Default for MemGraph<V> {
  fn default() -> Self {
    Self::new()
  }
}

impl<V> MemGraph<V> {
  pub fn new() -> Self {
    Self {
      nodes: HashMap::new(),
      order: Vec::new(),
      edges: HashMap::new(),
    }
  }

  /// Adds a node to the graph.
  pub fn add(&mut self, node: Arc<dyn FlowNode<V>>) -> Result<(), FlowError> {
    let key = node.key();
    match self.nodes.get(&key) {
      Some(existing) if Arc::ptr_eq(existing, &node) => Ok(()),
      Some(_) => Err(FlowError::DuplicateNode(key)),
      None => {
        self.order.push(key.clone());
        self.nodes.insert(key, node);
        Ok(())
      }
    }
  }

  /// Records a directed edge from `from` to `to` under `kind`. Both endpoints
  /// must already be members of the graph. Idempotent per `(from, kind, to)`.
  pub fn associate(&mut self, from: &NodeKey, kind: EdgeKind, to: &NodeKey) -> Result<Edge, FlowError> {
    if !self.nodes.contains_key(from) {
      return Err(FlowError::UnknownNode(from.clone()));
    }
    if !self.nodes.contains_key(to) {
      return Err(FlowError::UnknownNode(to.clone()));
    }
    let edge = Edge {
      from: from.clone(),
      to: to.clone(),
    };
    let list = self.edges.entry(kind).or_default();
    if !list.contains(&edge) {
      list.push(edge.clone());
    }
    Ok(edge)
  }

  fn kind_edges(&self, kind: EdgeKind) -> &[Edge] {
    self.edges.get(&kind).map(Vec::as_slice).unwrap_or(&[])
  }
}

impl<V> GraphQuery<V> for MemGraph<V> {
  fn node(&self, key: &NodeKey) -> Option<Arc<dyn FlowNode<V>>> {
    self.nodes.get(key).cloned()
  }

  fn incoming(&self, key: &NodeKey, kind: EdgeKind) -> Vec<Edge> {
    self
      .kind_edges(kind)
      .iter()
      .filter(|e| &e.to == key)
      .cloned()
      .collect()
  }

  fn outgoing(&self, key: &NodeKey, kind: EdgeKind) -> Vec<Edge> {
    self
      .kind_edges(kind)
      .iter()
      .filter(|e| &e.from == key)
      .cloned()
      .collect()
  }

  /// Stable Kahn ordering: zero in-degree nodes are taken in insertion order,
  /// successors in association order.
  fn directed_sort(&self, kind: EdgeKind) -> Result<Vec<Arc<dyn FlowNode<V>>>, FlowError> {
    let edges = self.kind_edges(kind);
    let mut indegree: HashMap<&NodeKey, usize> = self.order.iter().map(|k| (k, 0)).collect();
    for edge in edges {
      if let Some(count) = indegree.get_mut(&edge.to) {
        *count += 1;
      }
    }

    let mut ready: VecDeque<&NodeKey> = self
      .order
      .iter()
      .filter(|k| indegree[k] == 0)
      .collect();
    let mut ordered = Vec::with_capacity(self.order.len());
    while let Some(key) = ready.pop_front() {
      ordered.push(self.nodes[key].clone());
      for edge in edges.iter().filter(|e| &e.from == key) {
        let count = indegree
          .get_mut(&edge.to)
          .expect("edge endpoints are graph members");
        *count -= 1;
        if *count == 0 {
          ready.push_back(&edge.to);
        }
      }
    }

    if ordered.len() != self.order.len() {
      return Err(FlowError::Cycle(kind));
    }
    Ok(ordered)
  }
}
