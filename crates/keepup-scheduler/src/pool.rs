//! In-flight attempts, keyed by the generation they were started for.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use keepup_core::SchedulerId;
use tokio::task::JoinHandle;
use tokio_util::sync::{CancellationToken, WaitForCancellationFuture};
use tracing::{debug, info};

/// Cooperative interruption handed to one attempt.
#[derive(Debug, Clone, Default)]
pub struct WorkToken {
    token: CancellationToken,
    torn_down: Arc<AtomicBool>,
}

impl WorkToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Cancels and marks the attempt as discarded with the whole pool.
    pub fn tear_down(&self) {
        self.torn_down.store(true, Ordering::SeqCst);
        self.token.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::SeqCst)
    }

    pub fn cancelled(&self) -> WaitForCancellationFuture<'_> {
        self.token.cancelled()
    }

    pub fn token(&self) -> &CancellationToken {
        &self.token
    }
}

#[derive(Debug)]
pub struct PooledHandle {
    token: WorkToken,
    task: JoinHandle<()>,
}

impl PooledHandle {
    pub fn new(token: WorkToken, task: JoinHandle<()>) -> Self {
        Self { token, task }
    }

    pub fn is_done(&self) -> bool {
        self.task.is_finished()
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    fn is_active(&self) -> bool {
        !self.is_done() && !self.is_cancelled()
    }

    fn is_completed(&self) -> bool {
        self.is_done() || self.is_cancelled()
    }
}

#[derive(Debug, Default)]
pub struct ProcessPool {
    handles: Mutex<HashMap<SchedulerId, Vec<PooledHandle>>>,
}

impl ProcessPool {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<SchedulerId, Vec<PooledHandle>>> {
        self.handles
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Adds an attempt under its generation, dropping the generation's
    /// completed attempts on the way.
    pub fn pool(&self, scheduler_id: SchedulerId, handle: PooledHandle) {
        debug!(%scheduler_id, "attempt pooled");
        let mut handles = self.lock();
        let pooled = handles.entry(scheduler_id).or_default();
        pooled.retain(|handle| !handle.is_completed());
        pooled.push(handle);
    }

    /// Interrupts every running attempt of `scheduler_id` and prunes the
    /// completed ones. Does not wait for the attempts to stop.
    pub fn cancel(&self, scheduler_id: SchedulerId) {
        let mut handles = self.lock();
        if let Some(pooled) = handles.get_mut(&scheduler_id) {
            cancel_pooled(pooled, WorkToken::cancel);
            if pooled.is_empty() {
                handles.remove(&scheduler_id);
            }
        }
    }

    /// Tears down every pooled attempt and clears the pool.
    pub fn cancel_all(&self) {
        let mut handles = self.lock();
        info!(generations = handles.len(), "cancelling all pooled attempts");
        for pooled in handles.values_mut() {
            cancel_pooled(pooled, WorkToken::tear_down);
        }
        handles.clear();
    }

    pub fn has_active(&self) -> bool {
        self.lock().values().flatten().any(PooledHandle::is_active)
    }

    pub fn len(&self) -> usize {
        self.lock().values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn cancel_pooled(pooled: &mut Vec<PooledHandle>, interrupt: fn(&WorkToken)) {
    for handle in pooled.iter().filter(|handle| !handle.is_done()) {
        interrupt(&handle.token);
    }
    pooled.retain(|handle| !handle.is_completed());
}
