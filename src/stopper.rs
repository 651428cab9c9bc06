//! Shared registry of worker stop signals. A key present in the registry
//! denotes a registered, running worker; removal denotes completion. Waits
//! block on a [Notify] wakeup instead of spinning.

use std::collections::HashMap;
use std::hash::Hash;
use std::pin::pin;
use std::sync::Mutex;
use tokio::sync::{Notify, watch};

pub(crate) struct Stopper<K> {
  registry: Mutex<HashMap<K, watch::Sender<bool>>>,
  changed: Notify,
}

impl<K: Eq + Hash + Clone> Stopper<K> {
  pub(crate) fn new() -> Self {
    Self {
      registry: Mutex::new(HashMap::new()),
      changed: Notify::new(),
    }
  }

  /// Registers a worker's stop-signal handle under `key`.
  pub(crate) fn add(&self, key: K, signal: watch::Sender<bool>) {
    self.registry.lock().expect("stopper lock").insert(key, signal);
    self.changed.notify_waiters();
  }

  /// Deregisters `key`, marking the associated worker finished.
  pub(crate) fn done(&self, key: &K) {
    self.registry.lock().expect("stopper lock").remove(key);
    self.changed.notify_waiters();
  }

  /// Signals and deregisters one worker.
  pub(crate) fn stop(&self, key: &K) {
    if let Some(signal) = self.registry.lock().expect("stopper lock").remove(key) {
      let _ = signal.send(true);
    }
    self.changed.notify_waiters();
  }

  /// Signals every registered worker. Workers deregister themselves as they
  /// observe the signal and exit.
  pub(crate) fn stop_all(&self) {
    for signal in self.registry.lock().expect("stopper lock").values() {
      let _ = signal.send(true);
    }
  }

  /// Suspends the caller until every given key is present in the registry.
  pub(crate) async fn wait_until(&self, keys: &[K]) {
    loop {
      let mut notified = pin!(self.changed.notified());
      notified.as_mut().enable();
      {
        let registry = self.registry.lock().expect("stopper lock");
        if keys.iter().all(|k| registry.contains_key(k)) {
          return;
        }
      }
      notified.await;
    }
  }

  /// Suspends the caller until every given key is absent from the registry.
  pub(crate) async fn wait_until_done(&self, keys: &[K]) {
    loop {
      let mut notified = pin!(self.changed.notified());
      notified.as_mut().enable();
      {
        let registry = self.registry.lock().expect("stopper lock");
        if keys.iter().all(|k| !registry.contains_key(k)) {
          return;
        }
      }
      notified.await;
    }
  }
}
