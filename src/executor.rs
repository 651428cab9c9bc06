//! Executor: compiles the graph into workers, starts them, accepts input
//! submissions, and hands out the pipeline future. One executor instance
//! computes exactly one pass; inputs may arrive split across multiple calls.

use crate::awaitable::Awaitable;
use crate::compiler::{self, Compiled};
use crate::error::FlowError;
use crate::graph::{EdgeKind, GraphQuery};
use crate::node::NodeKey;
use crate::stopper::Stopper;
use crate::worker::WorkItem;
use futures::future::join_all;
use std::collections::HashMap;
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::oneshot;
use tracing::{Instrument, debug, info, info_span};

/// Caller-supplied name for one pipeline instance, used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GraphRef(String);

impl GraphRef {
  pub fn new(name: impl Into<String>) -> Self {
    Self(name.into())
  }
}

impl fmt::Display for GraphRef {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

impl From<&str> for GraphRef {
  fn from(name: &str) -> Self {
    Self(name.to_string())
  }
}

/// Executor configuration.
#[derive(Debug, Default)]
pub struct Options {
  /// Parent span for node activity. Defaults to a fresh span named after the
  /// graph ref.
  pub span: Option<tracing::Span>,
}

/// Resolves, once, to the complete node → awaitable map for one pipeline
/// pass. Every future handed out by the same executor is this same handle.
pub type FlowFuture<V> = Awaitable<HashMap<NodeKey, Awaitable<V>>>;

/// A compiled, running pipeline instance.
pub struct Executor<V> {
  graph_ref: GraphRef,
  inputs: Vec<NodeKey>,
  outputs: Vec<NodeKey>,
  submissions: Mutex<HashMap<NodeKey, oneshot::Sender<WorkItem<V>>>>,
  results: HashMap<NodeKey, Awaitable<V>>,
  future: FlowFuture<V>,
  stopper: Arc<Stopper<NodeKey>>,
  closed: AtomicBool,
  span: tracing::Span,
}

impl<V> fmt::Debug for Executor<V> {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.debug_struct("Executor")
      .field("graph_ref", &self.graph_ref)
      .field("inputs", &self.inputs)
      .field("outputs", &self.outputs)
      .finish_non_exhaustive()
  }
}

impl<V: Clone + Send + Sync + 'static> Executor<V> {
  /// Compiles the graph under `kind` and starts every node worker; returns
  /// once all workers are running. A cyclic graph or any compilation error is
  /// returned before a single worker starts.
  pub async fn new<G>(
    graph_ref: GraphRef,
    graph: &G,
    kind: EdgeKind,
    options: Options,
  ) -> Result<Self, FlowError>
  where
    G: GraphQuery<V> + ?Sized,
  {
    let ordered = graph.directed_sort(kind)?;
    let Compiled {
      workers,
      inputs,
      outputs,
      submissions,
      results,
      links,
    } = compiler::analyze(graph, kind, &ordered)?;

    let span = options
      .span
      .unwrap_or_else(|| info_span!("flow", graph = %graph_ref));
    let stopper = Arc::new(Stopper::new());
    let keys: Vec<NodeKey> = workers.iter().map(|w| w.key.clone()).collect();
    for worker in workers {
      let node_span = info_span!(parent: &span, "node", node = %worker.key, label = %worker.label());
      tokio::spawn(worker.run(stopper.clone()).instrument(node_span));
    }
    stopper.wait_until(&keys).await;
    info!(parent: &span, nodes = keys.len(), links, "pipeline started");

    // The pipeline future resolves once every worker has deregistered.
    let (resolver, future) = Awaitable::cell();
    {
      let stopper = stopper.clone();
      let map = results.clone();
      tokio::spawn(
        async move {
          stopper.wait_until_done(&keys).await;
          debug!("pipeline pass complete");
          resolver.resolve(Ok(map));
        }
        .instrument(span.clone()),
      );
    }

    Ok(Self {
      graph_ref,
      inputs,
      outputs,
      submissions: Mutex::new(submissions),
      results,
      future,
      stopper,
      closed: AtomicBool::new(false),
      span,
    })
  }

  /// Submits raw values for graph input nodes and returns the shared pipeline
  /// future immediately. The whole batch is validated before any value is
  /// delivered: an unknown node, a non-input node, or a duplicate submission
  /// rejects the call without changing worker state.
  pub fn exec(&self, values: HashMap<NodeKey, V>) -> Result<FlowFuture<V>, FlowError> {
    if self.closed.load(Ordering::SeqCst) {
      return Err(FlowError::Closed);
    }
    let mut slots = self.submissions.lock().expect("submission lock");
    self.check_batch(&slots, values.keys())?;
    for (key, value) in values {
      let tx = slots.remove(&key).expect("validated above");
      debug!(parent: &self.span, node = %key, "input submitted");
      let _ = tx.send(WorkItem {
        from: key,
        result: Ok(value),
      });
    }
    Ok(self.future.clone())
  }

  /// Like [Executor::exec], but each input node receives its awaitable's
  /// eventual result (value or failure) when it resolves. All submissions of
  /// one call progress concurrently.
  pub fn exec_awaitables(
    &self,
    values: HashMap<NodeKey, Awaitable<V>>,
  ) -> Result<FlowFuture<V>, FlowError> {
    if self.closed.load(Ordering::SeqCst) {
      return Err(FlowError::Closed);
    }
    let mut pending = Vec::with_capacity(values.len());
    {
      let mut slots = self.submissions.lock().expect("submission lock");
      self.check_batch(&slots, values.keys())?;
      for (key, awaitable) in values {
        let tx = slots.remove(&key).expect("validated above");
        pending.push((key, tx, awaitable));
      }
    }
    tokio::spawn(
      async move {
        join_all(pending.into_iter().map(|(key, tx, awaitable)| async move {
          let result = awaitable.value().await;
          debug!(node = %key, "awaited input submitted");
          let _ = tx.send(WorkItem { from: key, result });
        }))
        .await;
      }
      .instrument(self.span.clone()),
    );
    Ok(self.future.clone())
  }

  fn check_batch<'a>(
    &self,
    slots: &HashMap<NodeKey, oneshot::Sender<WorkItem<V>>>,
    keys: impl Iterator<Item = &'a NodeKey>,
  ) -> Result<(), FlowError> {
    for key in keys {
      if slots.contains_key(key) {
        continue;
      }
      if !self.results.contains_key(key) {
        return Err(FlowError::UnknownNode(key.clone()));
      }
      if self.inputs.contains(key) {
        return Err(FlowError::DuplicateInput(key.clone()));
      }
      return Err(FlowError::NotAnInput(key.clone()));
    }
    Ok(())
  }

  /// The instance name given at construction.
  pub fn graph_ref(&self) -> &GraphRef {
    &self.graph_ref
  }

  /// Graph input nodes: no inbound edges under the compiled kind.
  pub fn input_nodes(&self) -> &[NodeKey] {
    &self.inputs
  }

  /// Graph output nodes: no outbound edges under the compiled kind.
  pub fn output_nodes(&self) -> &[NodeKey] {
    &self.outputs
  }

  /// Signals every worker to stop and rejects further submissions. Idempotent
  /// and safe to call after natural completion. Workers abort silently;
  /// their unresolved result cells stay unresolved.
  pub fn close(&self) {
    if !self.closed.swap(true, Ordering::SeqCst) {
      info!(parent: &self.span, graph = %self.graph_ref, "closing pipeline");
      self.stopper.stop_all();
    }
  }
}

impl<V> Drop for Executor<V> {
  fn drop(&mut self) {
    if !self.closed.swap(true, Ordering::SeqCst) {
      self.stopper.stop_all();
    }
  }
}
