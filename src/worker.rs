//! Node worker: the unit of execution. Once started, a worker performs
//! exactly one gather → compute → publish cycle, then terminates. It is not
//! reusable after it completes or is stopped.

use crate::attributes::NodeAttributes;
use crate::awaitable::Resolver;
use crate::error::FlowError;
use crate::node::{NodeKey, OperatorFn};
use crate::stopper::Stopper;
use std::sync::Arc;
use tokio::sync::{oneshot, watch};
use tracing::{debug, trace};

/// One value-or-failure payload traveling along one wired edge, tagged with
/// its originating node.
#[derive(Debug, Clone)]
pub(crate) struct WorkItem<V> {
  pub(crate) from: NodeKey,
  pub(crate) result: Result<V, FlowError>,
}

/// One worker per compiled graph node. Inbound receivers are ordered by the
/// node's recorded predecessor order; graph inputs hold a single
/// direct-submission slot instead. The neighbor keys carried alongside each
/// channel are diagnostic, not load-bearing.
pub(crate) struct NodeWorker<V> {
  pub(crate) key: NodeKey,
  pub(crate) attributes: NodeAttributes,
  pub(crate) operator: Option<OperatorFn<V>>,
  pub(crate) inbound: Vec<(NodeKey, oneshot::Receiver<WorkItem<V>>)>,
  pub(crate) outbound: Vec<(NodeKey, oneshot::Sender<WorkItem<V>>)>,
  pub(crate) result: Resolver<V>,
  pub(crate) stop_tx: watch::Sender<bool>,
  pub(crate) stop_rx: watch::Receiver<bool>,
}

/// Deregisters the worker on every exit path, including stop aborts.
struct DoneGuard {
  stopper: Arc<Stopper<NodeKey>>,
  key: NodeKey,
}

impl Drop for DoneGuard {
  fn drop(&mut self) {
    self.stopper.done(&self.key);
  }
}

impl<V: Clone + Send + Sync + 'static> NodeWorker<V> {
  /// Display label for diagnostics: the attribute label when present,
  /// otherwise the node key.
  pub(crate) fn label(&self) -> &str {
    self.attributes.label.as_deref().unwrap_or(self.key.as_str())
  }

  /// Runs the single gather → compute → publish cycle. Registers with the
  /// stopper on entry and deregisters on exit. A stop signal observed while
  /// gathering aborts silently: nothing is published and the result cell is
  /// left unresolved.
  pub(crate) async fn run(self, stopper: Arc<Stopper<NodeKey>>) {
    let NodeWorker {
      key,
      attributes: _,
      operator,
      inbound,
      outbound,
      result,
      stop_tx,
      mut stop_rx,
    } = self;

    stopper.add(key.clone(), stop_tx);
    let _done = DoneGuard {
      stopper,
      key: key.clone(),
    };

    // Gather one item from every inbound slot, watching the stop signal at
    // each suspension point.
    let mut gathered: Vec<WorkItem<V>> = Vec::with_capacity(inbound.len());
    for (from, rx) in inbound {
      tokio::select! {
        signal = stop_rx.wait_for(|stopped| *stopped) => {
          let _ = signal;
          trace!(node = %key, "stopped while gathering");
          return;
        }
        item = rx => match item {
          Ok(item) => {
            trace!(node = %key, from = %from, "gathered input");
            gathered.push(item);
          }
          Err(_) => {
            // Upstream exited without publishing: executor shutdown.
            trace!(node = %key, from = %from, "input channel closed");
            return;
          }
        }
      }
    }

    // A failed predecessor short-circuits this node: skip the operator and
    // propagate the failure unchanged.
    let mut inputs = Vec::with_capacity(gathered.len());
    let mut upstream_failure: Option<(NodeKey, FlowError)> = None;
    for item in gathered {
      match item.result {
        Ok(value) => inputs.push(value),
        Err(e) => {
          upstream_failure = Some((item.from, e));
          break;
        }
      }
    }
    if let Some((from, failure)) = upstream_failure {
      debug!(node = %key, from = %from, error = %failure, "propagating upstream failure");
      publish(&key, outbound, Err(failure.clone()));
      result.resolve(Err(failure));
      return;
    }

    let arity = inputs.len();
    let outcome = match &operator {
      Some(op) => op(inputs).map_err(|reason| FlowError::Operator {
        node: key.clone(),
        reason,
      }),
      None => {
        // Identity/pass-through. More than one input without an operator is
        // rejected during graph analysis.
        let mut values = inputs.into_iter();
        match (values.next(), values.next()) {
          (Some(value), None) => Ok(value),
          _ => Err(FlowError::MissingOperator {
            node: key.clone(),
            inputs: arity,
          }),
        }
      }
    };

    match &outcome {
      Ok(_) => debug!(node = %key, "computed"),
      Err(e) => debug!(node = %key, error = %e, "operator failed"),
    }
    publish(&key, outbound, outcome.clone());
    result.resolve(outcome);
  }
}

fn publish<V: Clone>(
  key: &NodeKey,
  outbound: Vec<(NodeKey, oneshot::Sender<WorkItem<V>>)>,
  outcome: Result<V, FlowError>,
) {
  for (to, tx) in outbound {
    let item = WorkItem {
      from: key.clone(),
      result: outcome.clone(),
    };
    if tx.send(item).is_err() {
      trace!(node = %key, to = %to, "downstream receiver gone");
    }
  }
}
