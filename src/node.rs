//! Node identity and the duck-typed capability interface the engine consumes.
//! A node may expose an operator capability, an attribute capability, both,
//! or neither; the engine never branches on concrete node types.

use std::fmt;
use std::sync::Arc;

/// Opaque node identity, stable for the lifetime of one compiled instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeKey(String);

impl NodeKey {
  pub fn new(key: impl Into<String>) -> Self {
    Self(key.into())
  }

  pub fn as_str(&self) -> &str {
    &self.0
  }
}

impl fmt::Display for NodeKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for NodeKey {
  fn from(key: &str) -> Self {
    Self(key.to_string())
  }
}

impl From<String> for NodeKey {
  fn from(key: String) -> Self {
    Self(key)
  }
}

impl<V> fmt::Debug for dyn FlowNode<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("FlowNode").field("key", &self.key()).finish_non_exhaustive()
  }
}

/// Operator capability: a transformation from input values, ordered by the
/// node's recorded predecessor order, to a value-or-failure.
pub type OperatorFn<V> = Arc<dyn Fn(Vec<V>) -> Result<V, String> + Send + Sync>;

/// A computation node as seen by the flow engine. Both capabilities are
/// optional; a node exposing neither behaves as identity/pass-through.
pub trait FlowNode<V>: Send + Sync {
  fn key(&self) -> NodeKey;

  /// Operator capability, if the node has one.
  fn operator(&self) -> Option<OperatorFn<V>> {
    None
  }

  /// Attribute capability: unordered key/value configuration, consumed during
  /// compilation only.
  fn attributes(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
    None
  }
}
