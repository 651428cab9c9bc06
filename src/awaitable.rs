//! Single-assignment, concurrently-readable result cells. [Awaitable::spawn]
//! launches a computation as an independent task and returns the awaitable
//! bound to it immediately.

use crate::error::FlowError;
use std::future::Future;
use tokio::sync::watch;

/// A single-assignment result cell. Cheap to clone; once resolved, every
/// reader observes the identical value and failure state.
pub struct Awaitable<T> {
  rx: watch::Receiver<Option<Result<T, FlowError>>>,
}

impl<T> std::fmt::Debug for Awaitable<T> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("Awaitable").finish_non_exhaustive()
  }
}

impl<T> Clone for Awaitable<T> {
  fn clone(&self) -> Self {
    Self { rx: self.rx.clone() }
  }
}

impl<T: Clone + Send + Sync + 'static> Awaitable<T> {
  /// Creates an unresolved cell and the resolver that fills it.
  pub(crate) fn cell() -> (Resolver<T>, Awaitable<T>) {
    let (tx, rx) = watch::channel(None);
    (Resolver { tx }, Awaitable { rx })
  }

  /// Starts `computation` immediately as an independent task and returns the
  /// awaitable bound to it. The computation executes at most once no matter
  /// how many readers await the result.
  pub fn spawn<F>(computation: F) -> Awaitable<T>
  where
    F: Future<Output = Result<T, FlowError>> + Send + 'static,
  {
    let (resolver, awaitable) = Awaitable::cell();
    tokio::spawn(async move {
      resolver.resolve(computation.await);
    });
    awaitable
  }

  /// Suspends until the cell resolves, then returns the result. Calls after
  /// resolution return immediately without re-executing anything; concurrent
  /// readers are safe and all observe the same result.
  ///
  /// A cell abandoned by a worker aborted at shutdown never resolves; this
  /// call then suspends indefinitely, and the caller is expected to apply its
  /// own cancellation.
  pub async fn value(&self) -> Result<T, FlowError> {
    let mut rx = self.rx.clone();
    let resolved = rx.wait_for(|slot| slot.is_some()).await.map(|slot| slot.clone());
    match resolved {
      Ok(slot) => slot.expect("wait_for guarantees resolution"),
      Err(_) => std::future::pending().await,
    }
  }

  /// Non-blocking peek: `None` until the cell resolves.
  pub fn try_value(&self) -> Option<Result<T, FlowError>> {
    self.rx.borrow().clone()
  }
}

/// Write side of a cell. Resolution consumes the resolver, so a cell is
/// assigned at most once.
pub(crate) struct Resolver<T> {
  tx: watch::Sender<Option<Result<T, FlowError>>>,
}

impl<T> Resolver<T> {
  pub(crate) fn resolve(self, result: Result<T, FlowError>) {
    let _ = self.tx.send(Some(result));
  }
}
