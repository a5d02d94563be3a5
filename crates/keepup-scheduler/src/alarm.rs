use std::collections::HashMap;
use std::fmt::Debug;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::StreamExt;
use keepup_core::Clock;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::time::{DelayQueue, delay_queue::Key};
use tracing::{debug, info, warn};

use crate::messages::{AlarmCommand, AlarmEvent, AlarmId, AlarmTrigger};

/// The timer service the schedulers arm and disarm.
///
/// Calls never block. Delivery may be late; nothing relies on precision.
pub trait AlarmService: Debug + Send + Sync {
    fn set_alarm(&self, trigger: AlarmTrigger, event: AlarmEvent);

    fn cancel_alarm(&self, id: AlarmId);
}

/// Timers driven by a single tokio task owning a [`DelayQueue`].
///
/// Fired alarms are delivered on the receiver returned by
/// [`DelayQueueAlarms::spawn`].
#[derive(Debug)]
pub struct DelayQueueAlarms {
    cmd_tx: mpsc::UnboundedSender<AlarmCommand>,
    handle: Mutex<Option<JoinHandle<()>>>,
    clock: Arc<dyn Clock>,
}

impl DelayQueueAlarms {
    pub fn spawn(clock: Arc<dyn Clock>) -> (Self, mpsc::UnboundedReceiver<AlarmEvent>) {
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (fired_tx, fired_rx) = mpsc::unbounded_channel();

        let handle = tokio::spawn(alarm_loop(fired_tx, cmd_rx));

        let alarms = Self {
            cmd_tx,
            handle: Mutex::new(Some(handle)),
            clock,
        };
        (alarms, fired_rx)
    }

    pub async fn shutdown(&self) {
        info!("alarm service shutdown initiated");

        let _ = self.cmd_tx.send(AlarmCommand::Shutdown);
        let handle = self.handle.lock().ok().and_then(|mut handle| handle.take());
        if let Some(handle) = handle {
            let _ = handle.await;
        }

        info!("alarm service shutdown complete");
    }

    fn delay_for(&self, trigger: AlarmTrigger) -> Duration {
        match trigger {
            AlarmTrigger::After(delay) => delay,
            AlarmTrigger::At(at) => (at - self.clock.now()).to_std().unwrap_or(Duration::ZERO),
        }
    }
}

impl AlarmService for DelayQueueAlarms {
    fn set_alarm(&self, trigger: AlarmTrigger, event: AlarmEvent) {
        let delay = self.delay_for(trigger);
        if self.cmd_tx.send(AlarmCommand::Set { event, delay }).is_err() {
            warn!(?event, "alarm service stopped, alarm dropped");
        }
    }

    fn cancel_alarm(&self, id: AlarmId) {
        let _ = self.cmd_tx.send(AlarmCommand::Cancel(id));
    }
}

async fn alarm_loop(
    fired_tx: mpsc::UnboundedSender<AlarmEvent>,
    mut cmd_rx: mpsc::UnboundedReceiver<AlarmCommand>,
) {
    let mut delay_queue = DelayQueue::<AlarmEvent>::new();
    let mut keys: HashMap<AlarmId, Key> = HashMap::new();

    info!("alarm loop started");

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(AlarmCommand::Set { event, delay }) => {
                        let id = event.id();
                        if let Some(key) = keys.remove(&id) {
                            let _ = delay_queue.try_remove(&key);
                        }
                        debug!(?id, delay_ms = delay.as_millis(), "alarm armed");
                        keys.insert(id, delay_queue.insert(event, delay));
                    }

                    Some(AlarmCommand::Cancel(id)) => {
                        if let Some(key) = keys.remove(&id) {
                            let _ = delay_queue.try_remove(&key);
                            debug!(?id, "alarm cancelled");
                        }
                    }

                    Some(AlarmCommand::Shutdown) | None => break,
                }
            }

            Some(expired) = delay_queue.next() => {
                let key = expired.key();
                let event = expired.into_inner();
                let id = event.id();
                if keys.get(&id) == Some(&key) {
                    keys.remove(&id);
                }
                if fired_tx.send(event).is_err() {
                    warn!(?id, "alarm receiver dropped");
                    break;
                }
            }
        }
    }

    info!("alarm loop exited");
}

/// Records armed alarms instead of firing them.
///
/// Tests and embedders that drive time themselves fire alarms explicitly
/// with [`ManualAlarms::fire`].
#[derive(Debug, Default)]
pub struct ManualAlarms {
    armed: Mutex<HashMap<AlarmId, (AlarmTrigger, AlarmEvent)>>,
}

impl ManualAlarms {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn armed(&self, id: AlarmId) -> Option<(AlarmTrigger, AlarmEvent)> {
        self.armed.lock().ok()?.get(&id).copied()
    }

    pub fn is_armed(&self, id: AlarmId) -> bool {
        self.armed(id).is_some()
    }

    pub fn armed_count(&self) -> usize {
        self.armed.lock().map(|armed| armed.len()).unwrap_or_default()
    }

    /// Removes the alarm and hands back the event it would deliver.
    pub fn fire(&self, id: AlarmId) -> Option<AlarmEvent> {
        self.armed.lock().ok()?.remove(&id).map(|(_, event)| event)
    }
}

impl AlarmService for ManualAlarms {
    fn set_alarm(&self, trigger: AlarmTrigger, event: AlarmEvent) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.insert(event.id(), (trigger, event));
        }
    }

    fn cancel_alarm(&self, id: AlarmId) {
        if let Ok(mut armed) = self.armed.lock() {
            armed.remove(&id);
        }
    }
}
