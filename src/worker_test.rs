//! Tests for the node worker's gather → compute → publish cycle.

use crate::attributes::NodeAttributes;
use crate::awaitable::Awaitable;
use crate::error::FlowError;
use crate::node::{NodeKey, OperatorFn};
use crate::stopper::Stopper;
use crate::testkit::{failing_op, format_op};
use crate::worker::{NodeWorker, WorkItem};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::time::timeout;

type Inbound = (NodeKey, oneshot::Receiver<WorkItem<String>>);
type Outbound = (NodeKey, oneshot::Sender<WorkItem<String>>);

fn build_worker(
  key: &str,
  operator: Option<OperatorFn<String>>,
  inbound: Vec<Inbound>,
  outbound: Vec<Outbound>,
) -> (NodeWorker<String>, Awaitable<String>) {
  let (resolver, awaitable) = Awaitable::cell();
  let (stop_tx, stop_rx) = watch::channel(false);
  let worker = NodeWorker {
    key: NodeKey::from(key),
    attributes: NodeAttributes::default(),
    operator,
    inbound,
    outbound,
    result: resolver,
    stop_tx,
    stop_rx,
  };
  (worker, awaitable)
}

fn item(from: &str, result: Result<&str, FlowError>) -> WorkItem<String> {
  WorkItem {
    from: NodeKey::from(from),
    result: result.map(str::to_string),
  }
}

#[tokio::test]
async fn passthrough_forwards_its_single_input() {
  let (in_tx, in_rx) = oneshot::channel();
  let (out_tx, out_rx) = oneshot::channel();
  let (worker, awaitable) = build_worker(
    "id",
    None,
    vec![(NodeKey::from("up"), in_rx)],
    vec![(NodeKey::from("down"), out_tx)],
  );
  let stopper = Arc::new(Stopper::new());
  tokio::spawn(worker.run(stopper.clone()));

  in_tx.send(item("up", Ok("hello"))).unwrap();
  let forwarded = out_rx.await.unwrap();
  assert_eq!(forwarded.from, NodeKey::from("id"));
  assert_eq!(forwarded.result.unwrap(), "hello");
  assert_eq!(awaitable.value().await.unwrap(), "hello");
  stopper.wait_until_done(&[NodeKey::from("id")]).await;
}

#[tokio::test]
async fn operator_receives_inputs_in_predecessor_order() {
  let (tx_a, rx_a) = oneshot::channel();
  let (tx_b, rx_b) = oneshot::channel();
  let (worker, awaitable) = build_worker(
    "sum",
    Some(format_op("sum")),
    vec![(NodeKey::from("a"), rx_a), (NodeKey::from("b"), rx_b)],
    vec![],
  );
  tokio::spawn(worker.run(Arc::new(Stopper::new())));

  // deliver out of order; gather order follows the inbound wiring
  tx_b.send(item("b", Ok("B"))).unwrap();
  tx_a.send(item("a", Ok("A"))).unwrap();
  assert_eq!(awaitable.value().await.unwrap(), "sum([A B])");
}

#[tokio::test]
async fn upstream_failure_short_circuits_the_operator() {
  let ran = Arc::new(AtomicBool::new(false));
  let observed = ran.clone();
  let operator: OperatorFn<String> = Arc::new(move |_| {
    observed.store(true, Ordering::SeqCst);
    Ok("unreachable".to_string())
  });

  let failure = FlowError::Operator {
    node: NodeKey::from("up"),
    reason: "boom".to_string(),
  };
  let (tx_a, rx_a) = oneshot::channel();
  let (tx_b, rx_b) = oneshot::channel();
  let (out_tx, out_rx) = oneshot::channel();
  let (worker, awaitable) = build_worker(
    "n",
    Some(operator),
    vec![(NodeKey::from("a"), rx_a), (NodeKey::from("up"), rx_b)],
    vec![(NodeKey::from("down"), out_tx)],
  );
  tokio::spawn(worker.run(Arc::new(Stopper::new())));

  tx_a.send(item("a", Ok("A"))).unwrap();
  tx_b.send(item("up", Err(failure.clone()))).unwrap();

  let forwarded = out_rx.await.unwrap();
  assert_eq!(forwarded.result.unwrap_err(), failure);
  assert_eq!(awaitable.value().await.unwrap_err(), failure);
  assert!(!ran.load(Ordering::SeqCst), "operator must not run on failed input");
}

#[tokio::test]
async fn operator_failure_becomes_a_failed_item() {
  let (in_tx, in_rx) = oneshot::channel();
  let (out_tx, out_rx) = oneshot::channel();
  let (worker, awaitable) = build_worker(
    "n",
    Some(failing_op("arithmetic underflow")),
    vec![(NodeKey::from("up"), in_rx)],
    vec![(NodeKey::from("down"), out_tx)],
  );
  tokio::spawn(worker.run(Arc::new(Stopper::new())));

  in_tx.send(item("up", Ok("v"))).unwrap();
  let expected = FlowError::Operator {
    node: NodeKey::from("n"),
    reason: "arithmetic underflow".to_string(),
  };
  assert_eq!(out_rx.await.unwrap().result.unwrap_err(), expected);
  assert_eq!(awaitable.value().await.unwrap_err(), expected);
}

#[tokio::test]
async fn stop_aborts_without_publishing() {
  let (_in_tx, in_rx) = oneshot::channel();
  let (out_tx, out_rx) = oneshot::channel();
  let (worker, awaitable) = build_worker(
    "n",
    None,
    vec![(NodeKey::from("up"), in_rx)],
    vec![(NodeKey::from("down"), out_tx)],
  );
  let key = NodeKey::from("n");
  let stopper = Arc::new(Stopper::new());
  tokio::spawn(worker.run(stopper.clone()));
  stopper.wait_until(std::slice::from_ref(&key)).await;

  stopper.stop(&key);
  timeout(Duration::from_millis(500), stopper.wait_until_done(std::slice::from_ref(&key)))
    .await
    .expect("stopped worker must deregister");
  assert!(out_rx.await.is_err(), "aborted worker must not publish");
  assert!(awaitable.try_value().is_none(), "aborted worker leaves its slot unresolved");
}

#[tokio::test]
async fn closed_input_channel_aborts_silently() {
  let (in_tx, in_rx) = oneshot::channel::<WorkItem<String>>();
  let (worker, awaitable) = build_worker("n", None, vec![(NodeKey::from("up"), in_rx)], vec![]);
  let stopper = Arc::new(Stopper::new());
  tokio::spawn(worker.run(stopper.clone()));

  drop(in_tx);
  timeout(
    Duration::from_millis(500),
    stopper.wait_until_done(&[NodeKey::from("n")]),
  )
  .await
  .expect("worker must exit when its input closes");
  assert!(awaitable.try_value().is_none());
}
