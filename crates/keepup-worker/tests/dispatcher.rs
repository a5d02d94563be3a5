mod common;

use common::Harness;
use keepup_core::{Interval, TimeOfDay};
use keepup_scheduler::{AlarmEvent, AlarmId, SuspensionAlarm};
use keepup_storage::{IntervalStore, LogStore};
use keepup_worker::Dispatcher;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

async fn settle(h: &Harness) {
    while h.pool.has_active() {
        tokio::task::yield_now().await;
    }
}

#[tokio::test]
async fn task_alarm_spawns_a_pooled_attempt() {
    let h = Harness::new();
    let task = h.start_ping();
    let dispatcher = Dispatcher::new(h.scheduler.clone(), h.worker.clone());

    let event = h.alarms.fire(AlarmId::Task(task.id)).unwrap();
    dispatcher.dispatch(event);
    assert!(h.pool.has_active());

    settle(&h).await;
    assert_eq!(h.store.read_logs(task.id).unwrap().len(), 1);
    assert!(h.alarms.is_armed(AlarmId::Task(task.id)));
}

#[tokio::test]
async fn suspension_alarm_reconciles_quiet_hours() {
    let h = Harness::new();
    let task = h.start_ping();
    h.store
        .insert_interval(Interval::new(
            "11:00".parse::<TimeOfDay>().unwrap(),
            "13:00".parse::<TimeOfDay>().unwrap(),
        ))
        .unwrap();
    let dispatcher = Dispatcher::new(h.scheduler.clone(), h.worker.clone());

    dispatcher.dispatch(AlarmEvent::Suspension(SuspensionAlarm { restarted: false }));

    assert!(h.scheduler.suspension().is_suspended().unwrap());
    assert!(!h.alarms.is_armed(AlarmId::Task(task.id)));
    assert!(h.alarms.is_armed(AlarmId::Suspension));
}

#[tokio::test]
async fn run_drains_events_until_the_channel_closes() {
    let h = Harness::new();
    let task = h.start_ping();
    let dispatcher = Dispatcher::new(h.scheduler.clone(), h.worker.clone());
    let (tx, rx) = mpsc::unbounded_channel();

    tx.send(h.alarms.fire(AlarmId::Task(task.id)).unwrap())
        .unwrap();
    drop(tx);
    dispatcher.run(rx, CancellationToken::new()).await;

    settle(&h).await;
    assert_eq!(h.store.read_logs(task.id).unwrap().len(), 1);
}

#[tokio::test]
async fn run_stops_on_shutdown() {
    let h = Harness::new();
    let dispatcher = Dispatcher::new(h.scheduler.clone(), h.worker.clone());
    let (_tx, rx) = mpsc::unbounded_channel();
    let shutdown = CancellationToken::new();
    shutdown.cancel();

    dispatcher.run(rx, shutdown).await;

    assert!(h.pool.is_empty());
}
