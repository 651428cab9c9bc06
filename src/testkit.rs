//! Test nodes and graphs shared across unit tests.

use crate::graph::{EdgeKind, MemGraph};
use crate::node::{FlowNode, NodeKey, OperatorFn};
use std::sync::Arc;

/// A configurable node over string values: plain, operator-bearing,
/// attribute-bearing, or both.
pub(crate) struct TestNode {
  key: NodeKey,
  operator: Option<OperatorFn<String>>,
  attributes: Option<serde_json::Map<String, serde_json::Value>>,
}

impl TestNode {
  pub(crate) fn plain(key: &str) -> Arc<Self> {
    Arc::new(Self {
      key: NodeKey::from(key),
      operator: None,
      attributes: None,
    })
  }

  pub(crate) fn with_operator(key: &str, operator: OperatorFn<String>) -> Arc<Self> {
    Arc::new(Self {
      key: NodeKey::from(key),
      operator: Some(operator),
      attributes: None,
    })
  }

  pub(crate) fn with_attributes(key: &str, attributes: serde_json::Value) -> Arc<Self> {
    let serde_json::Value::Object(map) = attributes else {
      panic!("test attributes must be a JSON object");
    };
    Arc::new(Self {
      key: NodeKey::from(key),
      operator: None,
      attributes: Some(map),
    })
  }
}

impl FlowNode<String> for TestNode {
  fn key(&self) -> NodeKey {
    self.key.clone()
  }

  fn operator(&self) -> Option<OperatorFn<String>> {
    self.operator.clone()
  }

  fn attributes(&self) -> Option<serde_json::Map<String, serde_json::Value>> {
    self.attributes.clone()
  }
}

/// Operator formatting `name([a b c])` over its ordered inputs.
pub(crate) fn format_op(name: &'static str) -> OperatorFn<String> {
  Arc::new(move |inputs: Vec<String>| Ok(format!("{}([{}])", name, inputs.join(" "))))
}

/// Operator that always fails with `reason`.
pub(crate) fn failing_op(reason: &'static str) -> OperatorFn<String> {
  Arc::new(move |_inputs: Vec<String>| Err(reason.to_string()))
}

/// The reference graph: five inputs feeding `sumX` and `sumY`, both feeding
/// `ratio`. Association order fixes the operator input order, so `ratio`
/// resolves to `ratio([sumX([X1 X2 X3]) sumY([X3 Y2 Y1])])` for the inputs
/// `{x1:"X1", x2:"X2", x3:"X3", y1:"Y1", y2:"Y2"}`.
pub(crate) fn ratio_graph(kind: EdgeKind) -> MemGraph<String> {
  let mut g = MemGraph::new();
  for key in ["x1", "x2", "x3", "y1", "y2"] {
    g.add(TestNode::plain(key)).unwrap();
  }
  g.add(TestNode::with_operator("sumX", format_op("sumX"))).unwrap();
  g.add(TestNode::with_operator("sumY", format_op("sumY"))).unwrap();
  g.add(TestNode::with_operator("ratio", format_op("ratio"))).unwrap();

  for (from, to) in [
    ("x1", "sumX"),
    ("x2", "sumX"),
    ("x3", "sumX"),
    ("x3", "sumY"),
    ("y2", "sumY"),
    ("y1", "sumY"),
    ("sumX", "ratio"),
    ("sumY", "ratio"),
  ] {
    g.associate(&NodeKey::from(from), kind, &NodeKey::from(to)).unwrap();
  }
  g
}
