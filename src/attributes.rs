//! Parsed node configuration from the attribute capability. Consumed during
//! compilation only; malformed data aborts compilation.

use crate::error::FlowError;
use crate::node::NodeKey;
use serde::Deserialize;

/// Node configuration recognized by the engine. Unknown keys are ignored;
/// wrongly typed values fail the parse.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct NodeAttributes {
  /// Display label for diagnostics; defaults to the node key.
  #[serde(default)]
  pub label: Option<String>,
  /// Free-form tags, surfaced in logs.
  #[serde(default)]
  pub tags: Vec<String>,
}

impl NodeAttributes {
  pub(crate) fn unmarshal(
    node: &NodeKey,
    raw: serde_json::Map<String, serde_json::Value>,
  ) -> Result<Self, FlowError> {
    serde_json::from_value(serde_json::Value::Object(raw)).map_err(|e| FlowError::Attributes {
      node: node.clone(),
      reason: e.to_string(),
    })
  }
}
