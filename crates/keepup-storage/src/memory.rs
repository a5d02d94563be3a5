use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use keepup_core::{Interval, LogEntry, LogId, NetworkTask, SchedulerId, SchedulerState, TaskId};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::{
    Admission, IntervalStore, LogStore, SchedulerStateStore, StoreError, StoreResult, TaskStore,
};

#[derive(Debug, Default, Clone, Serialize, Deserialize)]
struct StoreData {
    tasks: BTreeMap<i64, NetworkTask>,
    logs: Vec<LogEntry>,
    intervals: Vec<Interval>,
    state: Option<SchedulerState>,
    next_task_id: i64,
    next_log_id: i64,
    next_interval_id: i64,
    next_scheduler_id: i64,
}

impl StoreData {
    fn task_mut(&mut self, id: TaskId) -> StoreResult<&mut NetworkTask> {
        self.tasks.get_mut(&id.0).ok_or(StoreError::TaskNotFound(id))
    }

    fn next_scheduler_id(&mut self) -> SchedulerId {
        self.next_scheduler_id += 1;
        SchedulerId(self.next_scheduler_id)
    }
}

/// All store ports backed by one mutex-guarded dataset.
///
/// When opened with [`MemoryStore::open`] every mutation is followed by a
/// JSON snapshot of the whole dataset, so task state, intervals and the
/// scheduler state survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    data: Mutex<StoreData>,
    snapshot: Option<PathBuf>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        let data = match std::fs::read(&path) {
            Ok(raw) => {
                let data: StoreData = serde_json::from_slice(&raw)?;
                info!(path = %path.display(), tasks = data.tasks.len(), "store loaded");
                data
            }
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                info!(path = %path.display(), "store file missing, starting empty");
                StoreData::default()
            }
            Err(source) => return Err(StoreError::Io { path, source }),
        };

        Ok(Self {
            data: Mutex::new(data),
            snapshot: Some(path),
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, StoreData>> {
        self.data
            .lock()
            .map_err(|_| StoreError::Unavailable("store lock poisoned".into()))
    }

    fn read<T>(&self, f: impl FnOnce(&StoreData) -> T) -> StoreResult<T> {
        let data = self.lock()?;
        Ok(f(&data))
    }

    /// Applies `f` to a staged copy and commits it only once the mutation
    /// and, for file-backed stores, the snapshot succeeded.
    fn write<T>(&self, f: impl FnOnce(&mut StoreData) -> StoreResult<T>) -> StoreResult<T> {
        let mut data = self.lock()?;
        let Some(path) = &self.snapshot else {
            return f(&mut data);
        };
        let mut staged = data.clone();
        let out = f(&mut staged)?;
        save(path, &staged)?;
        *data = staged;
        Ok(out)
    }
}

fn save(path: &Path, data: &StoreData) -> StoreResult<()> {
    let raw = serde_json::to_vec_pretty(data)?;
    let tmp = path.with_extension("tmp");
    std::fs::write(&tmp, raw).map_err(|source| StoreError::Io {
        path: tmp.clone(),
        source,
    })?;
    std::fs::rename(&tmp, path).map_err(|source| StoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}

impl TaskStore for MemoryStore {
    fn insert_task(&self, mut task: NetworkTask) -> StoreResult<NetworkTask> {
        self.write(|data| {
            data.next_task_id += 1;
            task.id = TaskId(data.next_task_id);
            task.scheduler_id = data.next_scheduler_id();
            data.tasks.insert(task.id.0, task.clone());
            debug!(task_id = %task.id, "task inserted");
            Ok(task)
        })
    }

    fn read_task(&self, id: TaskId) -> StoreResult<Option<NetworkTask>> {
        self.read(|data| data.tasks.get(&id.0).cloned())
    }

    fn read_tasks(&self) -> StoreResult<Vec<NetworkTask>> {
        self.read(|data| data.tasks.values().cloned().collect())
    }

    fn update_task(&self, task: &NetworkTask) -> StoreResult<()> {
        self.write(|data| {
            let stored = data.task_mut(task.id)?;
            stored.address = task.address.clone();
            stored.port = task.port;
            stored.access_type = task.access_type;
            stored.interval_minutes = task.interval_minutes;
            stored.only_wifi = task.only_wifi;
            stored.notification = task.notification;
            Ok(())
        })
    }

    fn delete_task(&self, id: TaskId) -> StoreResult<()> {
        self.write(|data| {
            data.tasks.remove(&id.0);
            data.logs.retain(|entry| entry.network_task_id != id);
            Ok(())
        })
    }

    fn update_running(&self, id: TaskId, running: bool) -> StoreResult<()> {
        self.write(|data| {
            data.task_mut(id)?.running = running;
            Ok(())
        })
    }

    fn stamp_scheduler_id(&self, id: TaskId) -> StoreResult<SchedulerId> {
        self.write(|data| {
            data.task_mut(id)?;
            let scheduler_id = data.next_scheduler_id();
            data.task_mut(id)?.scheduler_id = scheduler_id;
            Ok(scheduler_id)
        })
    }

    fn admit_instance(&self, id: TaskId, max: u32) -> StoreResult<Admission> {
        self.write(|data| {
            let task = data.task_mut(id)?;
            if task.instances >= max {
                return Ok(Admission::Rejected {
                    active: task.instances,
                });
            }
            task.instances += 1;
            Ok(Admission::Admitted {
                instances: task.instances,
            })
        })
    }

    fn decrease_instances(&self, id: TaskId) -> StoreResult<u32> {
        self.write(|data| {
            let task = data.task_mut(id)?;
            task.instances = task.instances.saturating_sub(1);
            Ok(task.instances)
        })
    }

    fn reset_instances(&self, id: TaskId) -> StoreResult<()> {
        self.write(|data| {
            data.task_mut(id)?.instances = 0;
            Ok(())
        })
    }

    fn update_last_scheduled(&self, id: TaskId, last_scheduled: i64) -> StoreResult<()> {
        self.write(|data| {
            data.task_mut(id)?.last_scheduled = last_scheduled;
            Ok(())
        })
    }

    fn increase_failure_count(&self, id: TaskId) -> StoreResult<u32> {
        self.write(|data| {
            let task = data.task_mut(id)?;
            task.failure_count = task.failure_count.saturating_add(1);
            Ok(task.failure_count)
        })
    }

    fn reset_failure_count(&self, id: TaskId) -> StoreResult<()> {
        self.write(|data| {
            data.task_mut(id)?.failure_count = 0;
            Ok(())
        })
    }
}

impl LogStore for MemoryStore {
    fn insert_log(&self, mut entry: LogEntry) -> StoreResult<LogEntry> {
        self.write(|data| {
            data.next_log_id += 1;
            entry.id = Some(LogId(data.next_log_id));
            data.logs.push(entry.clone());
            Ok(entry)
        })
    }

    fn read_logs(&self, task_id: TaskId) -> StoreResult<Vec<LogEntry>> {
        self.read(|data| {
            data.logs
                .iter()
                .filter(|entry| entry.network_task_id == task_id)
                .cloned()
                .collect()
        })
    }

    fn read_latest_log(&self, task_id: TaskId) -> StoreResult<Option<LogEntry>> {
        self.read(|data| {
            data.logs
                .iter()
                .rev()
                .find(|entry| entry.network_task_id == task_id)
                .cloned()
        })
    }

    fn delete_logs(&self, task_id: TaskId) -> StoreResult<()> {
        self.write(|data| {
            data.logs.retain(|entry| entry.network_task_id != task_id);
            Ok(())
        })
    }

    fn trim_logs(&self, task_id: TaskId, keep: usize) -> StoreResult<usize> {
        self.write(|data| {
            let total = data
                .logs
                .iter()
                .filter(|entry| entry.network_task_id == task_id)
                .count();
            let mut excess = total.saturating_sub(keep);
            let removed = excess;
            data.logs.retain(|entry| {
                if excess > 0 && entry.network_task_id == task_id {
                    excess -= 1;
                    false
                } else {
                    true
                }
            });
            Ok(removed)
        })
    }
}

impl IntervalStore for MemoryStore {
    fn read_intervals(&self) -> StoreResult<Vec<Interval>> {
        self.read(|data| data.intervals.clone())
    }

    fn insert_interval(&self, mut interval: Interval) -> StoreResult<Interval> {
        self.write(|data| {
            data.next_interval_id += 1;
            interval.id = data.next_interval_id;
            data.intervals.push(interval.clone());
            Ok(interval)
        })
    }

    fn delete_interval(&self, id: i64) -> StoreResult<()> {
        self.write(|data| {
            data.intervals.retain(|interval| interval.id != id);
            Ok(())
        })
    }

    fn delete_intervals(&self) -> StoreResult<()> {
        self.write(|data| {
            data.intervals.clear();
            Ok(())
        })
    }
}

impl SchedulerStateStore for MemoryStore {
    fn read_scheduler_state(&self) -> StoreResult<SchedulerState> {
        self.read(|data| data.state.unwrap_or_default())
    }

    fn update_scheduler_state(&self, state: SchedulerState) -> StoreResult<()> {
        self.write(|data| {
            data.state = Some(state);
            Ok(())
        })
    }
}
