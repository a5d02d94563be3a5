use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use keepup_core::{ManualClock, SchedulerId, TaskId};
use keepup_scheduler::{
    AlarmEvent, AlarmId, AlarmService, AlarmTrigger, DelayQueueAlarms, SuspensionAlarm,
};
use tokio::time::{Instant, timeout};

fn task_event(id: i64, generation: i64) -> AlarmEvent {
    AlarmEvent::Task {
        task_id: TaskId(id),
        scheduler_id: SchedulerId(generation),
    }
}

fn spawn() -> (
    DelayQueueAlarms,
    tokio::sync::mpsc::UnboundedReceiver<AlarmEvent>,
) {
    DelayQueueAlarms::spawn(Arc::new(ManualClock::new(Utc::now())))
}

#[tokio::test(start_paused = true)]
async fn delayed_alarm_fires_after_delay() {
    let (alarms, mut fired) = spawn();
    let started = Instant::now();

    alarms.set_alarm(AlarmTrigger::After(Duration::from_secs(10)), task_event(1, 1));

    let event = fired.recv().await.unwrap();
    assert_eq!(event, task_event(1, 1));
    assert!(started.elapsed() >= Duration::from_secs(10));

    alarms.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn rearming_replaces_previous_alarm() {
    let (alarms, mut fired) = spawn();

    alarms.set_alarm(AlarmTrigger::After(Duration::from_secs(5)), task_event(1, 1));
    alarms.set_alarm(AlarmTrigger::After(Duration::from_secs(20)), task_event(1, 2));

    let event = fired.recv().await.unwrap();
    assert_eq!(event, task_event(1, 2));
    assert!(
        timeout(Duration::from_secs(60), fired.recv())
            .await
            .is_err()
    );

    alarms.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn cancelled_alarm_never_fires() {
    let (alarms, mut fired) = spawn();

    alarms.set_alarm(AlarmTrigger::After(Duration::from_secs(5)), task_event(1, 1));
    alarms.set_alarm(AlarmTrigger::After(Duration::from_secs(8)), task_event(2, 1));
    alarms.cancel_alarm(AlarmId::Task(TaskId(1)));

    assert_eq!(fired.recv().await.unwrap(), task_event(2, 1));
    assert!(
        timeout(Duration::from_secs(60), fired.recv())
            .await
            .is_err()
    );

    alarms.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn wallclock_alarm_uses_clock_offset() {
    let now = Utc::now();
    let (alarms, mut fired) = DelayQueueAlarms::spawn(Arc::new(ManualClock::new(now)));
    let started = Instant::now();
    let event = AlarmEvent::Suspension(SuspensionAlarm { restarted: false });

    alarms.set_alarm(AlarmTrigger::At(now + TimeDelta::minutes(3)), event);

    assert_eq!(fired.recv().await.unwrap(), event);
    assert!(started.elapsed() >= Duration::from_secs(180));

    alarms.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn past_wallclock_alarm_fires_immediately() {
    let now = Utc::now();
    let (alarms, mut fired) = DelayQueueAlarms::spawn(Arc::new(ManualClock::new(now)));

    alarms.set_alarm(
        AlarmTrigger::At(now - TimeDelta::minutes(3)),
        task_event(3, 1),
    );

    assert_eq!(fired.recv().await.unwrap(), task_event(3, 1));
    alarms.shutdown().await;
}
