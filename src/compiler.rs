//! Graph analysis: allocate one channel per edge of the chosen kind, then
//! build one worker per node in topological order. Any failure aborts
//! compilation before a single worker starts.

use crate::attributes::NodeAttributes;
use crate::awaitable::Awaitable;
use crate::error::FlowError;
use crate::graph::{Edge, EdgeKind, GraphQuery};
use crate::node::{FlowNode, NodeKey};
use crate::worker::{NodeWorker, WorkItem};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::trace;

/// The wired pipeline for one executor instance: workers in topological
/// order, direct-submission slots for graph inputs, and the full node →
/// awaitable result map. Immutable after compilation.
pub(crate) struct Compiled<V> {
  pub(crate) workers: Vec<NodeWorker<V>>,
  pub(crate) inputs: Vec<NodeKey>,
  pub(crate) outputs: Vec<NodeKey>,
  pub(crate) submissions: HashMap<NodeKey, oneshot::Sender<WorkItem<V>>>,
  pub(crate) results: HashMap<NodeKey, Awaitable<V>>,
  pub(crate) links: usize,
}

impl<V> std::fmt::Debug for Compiled<V> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Compiled")
      .field("inputs", &self.inputs)
      .field("outputs", &self.outputs)
      .field("links", &self.links)
      .finish_non_exhaustive()
  }
}

pub(crate) fn analyze<V, G>(
  graph: &G,
  kind: EdgeKind,
  ordered: &[Arc<dyn FlowNode<V>>],
) -> Result<Compiled<V>, FlowError>
where
  V: Clone + Send + Sync + 'static,
  G: GraphQuery<V> + ?Sized,
{
  // First pass - one single-shot channel per edge, keyed by the edge.
  let mut senders: HashMap<Edge, oneshot::Sender<WorkItem<V>>> = HashMap::new();
  let mut receivers: HashMap<Edge, oneshot::Receiver<WorkItem<V>>> = HashMap::new();
  for node in ordered {
    for edge in graph.outgoing(&node.key(), kind) {
      let (tx, rx) = oneshot::channel();
      senders.insert(edge.clone(), tx);
      receivers.insert(edge, rx);
    }
  }
  let links = senders.len();

  // Second pass - build workers and connect input/output.
  let mut workers = Vec::with_capacity(ordered.len());
  let mut inputs = Vec::new();
  let mut outputs = Vec::new();
  let mut submissions = HashMap::new();
  let mut results = HashMap::new();

  for node in ordered {
    let key = node.key();

    // Edges TO the node fix its receive set and operator input order;
    // edges FROM the node fix its send set.
    let to = graph.incoming(&key, kind);
    let from = graph.outgoing(&key, kind);

    let operator = node.operator();
    if to.len() > 1 && operator.is_none() {
      return Err(FlowError::MissingOperator {
        node: key,
        inputs: to.len(),
      });
    }

    let attributes = match node.attributes() {
      Some(raw) => NodeAttributes::unmarshal(&key, raw)?,
      None => NodeAttributes::default(),
    };

    let mut inbound = Vec::with_capacity(to.len().max(1));
    if to.is_empty() {
      // No edges come TO this node, so it's an input node for the graph;
      // its single input arrives by direct submission.
      let (tx, rx) = oneshot::channel();
      submissions.insert(key.clone(), tx);
      inbound.push((key.clone(), rx));
      inputs.push(key.clone());
    } else {
      for edge in &to {
        let rx = receivers
          .remove(edge)
          .ok_or_else(|| FlowError::Wiring(edge.clone()))?;
        inbound.push((edge.from.clone(), rx));
      }
    }

    let mut outbound = Vec::with_capacity(from.len());
    for edge in &from {
      let tx = senders
        .remove(edge)
        .ok_or_else(|| FlowError::Wiring(edge.clone()))?;
      outbound.push((edge.to.clone(), tx));
    }
    if from.is_empty() {
      // No edges come FROM this node, so it's an output node for the graph.
      outputs.push(key.clone());
    }

    let (resolver, awaitable) = Awaitable::cell();
    results.insert(key.clone(), awaitable);
    let (stop_tx, stop_rx) = watch::channel(false);

    trace!(node = %key, inbound = inbound.len(), outbound = outbound.len(), "wired node");
    workers.push(NodeWorker {
      key,
      attributes,
      operator,
      inbound,
      outbound,
      result: resolver,
      stop_tx,
      stop_rx,
    });
  }

  Ok(Compiled {
    workers,
    inputs,
    outputs,
    submissions,
    results,
    links,
  })
}
