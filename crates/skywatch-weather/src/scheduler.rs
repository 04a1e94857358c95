//! Keyed, cancelable delayed tasks.
//!
//! Scheduling a task under a key aborts whatever was pending under that key,
//! so only the latest request per key ever runs to completion.

use std::collections::HashMap;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;

#[derive(Debug)]
pub struct Scheduler<K> {
    tasks: Mutex<HashMap<K, JoinHandle<()>>>,
}

impl<K> Default for Scheduler<K> {
    fn default() -> Self {
        Self {
            tasks: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash> Scheduler<K> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `task` after `delay`, replacing any task pending under `key`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: K, delay: Duration, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let deadline = Instant::now() + delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep_until(deadline).await;
            task.await;
        });

        if let Some(previous) = self.tasks.lock().insert(key, handle) {
            previous.abort();
        }
    }

    /// Abort the task under `key`. Returns true if one was still pending.
    pub fn cancel(&self, key: &K) -> bool {
        match self.tasks.lock().remove(key) {
            Some(handle) => {
                let pending = !handle.is_finished();
                handle.abort();
                pending
            }
            None => false,
        }
    }

    pub fn cancel_all(&self) {
        for (_, handle) in self.tasks.lock().drain() {
            handle.abort();
        }
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.tasks
            .lock()
            .get(key)
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl<K> Drop for Scheduler<K> {
    fn drop(&mut self) {
        for (_, handle) in self.tasks.get_mut().drain() {
            handle.abort();
        }
    }
}
