use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use keepup_core::{Clock, NetworkTask, Settings, SettingsHandle, SystemClock};
use keepup_observability::init_tracing;
use keepup_scheduler::{DelayQueueAlarms, ProcessPool, SuspensionScheduler, TaskScheduler};
use keepup_storage::{IntervalStore, MemoryStore, TaskStore};
use keepup_worker::{Dispatcher, NetworkServices, TaskWorker, TracingNotifier};
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

#[derive(Debug, Parser)]
#[command(name = "keepupd", version, about = "Runs periodic network availability checks")]
struct Args {
    /// TOML settings file. Defaults apply when it does not exist.
    #[arg(short, long, default_value = "keepup.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config_found = args.config.exists();
    let settings = if config_found {
        Settings::load(&args.config)
            .with_context(|| format!("failed to load {}", args.config.display()))?
    } else {
        Settings::default()
    };
    init_tracing(settings.log.filter.as_deref());

    info!(config = %args.config.display(), "starting keepupd");
    if !config_found {
        warn!(config = %args.config.display(), "config file not found, using defaults");
    }

    let store = Arc::new(
        MemoryStore::open(&settings.storage.path)
            .with_context(|| format!("failed to open {}", settings.storage.path.display()))?,
    );
    let autostart = seed(&store, &settings)?;

    let settings = SettingsHandle::new(settings);
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let (alarms, events) = DelayQueueAlarms::spawn(clock.clone());
    let alarms = Arc::new(alarms);
    let pool = Arc::new(ProcessPool::new());

    let suspension = SuspensionScheduler::new(
        store.clone(),
        store.clone(),
        alarms.clone(),
        settings.clone(),
        clock.clone(),
    );
    let scheduler = Arc::new(TaskScheduler::new(
        store.clone(),
        alarms.clone(),
        pool,
        suspension,
        clock.clone(),
    ));
    let worker = Arc::new(TaskWorker::new(
        store.clone(),
        store.clone(),
        scheduler.clone(),
        NetworkServices::system(settings.clone()),
        Arc::new(TracingNotifier),
        settings,
        clock,
    ));

    let shutdown = CancellationToken::new();
    let dispatcher = tokio::spawn(
        Dispatcher::new(scheduler.clone(), worker).run(events, shutdown.clone()),
    );

    scheduler.startup()?;
    for task in &autostart {
        scheduler.start(task)?;
    }
    info!(autostarted = autostart.len(), "keepupd running");

    signal::ctrl_c()
        .await
        .context("failed to listen for shutdown signal")?;

    info!("shutting down keepupd");
    scheduler.terminate_all()?;
    scheduler.pool().cancel_all();
    shutdown.cancel();
    if let Err(err) = dispatcher.await {
        warn!(error = %err, "dispatcher task failed");
    }
    alarms.shutdown().await;
    info!("keepupd stopped");
    Ok(())
}

/// Inserts the configured intervals and tasks into an empty store.
///
/// Returns the seeded tasks marked for autostart.
fn seed(store: &MemoryStore, settings: &Settings) -> Result<Vec<NetworkTask>> {
    if store.read_intervals()?.is_empty() {
        for interval in &settings.intervals {
            let interval = store.insert_interval(interval.clone())?;
            info!(%interval, "seeded suspend interval");
        }
    }

    let mut autostart = Vec::new();
    if store.read_tasks()?.is_empty() {
        for seed in &settings.tasks {
            let task = store.insert_task(seed.to_task())?;
            info!(task_id = %task.id, address = %task.address, "seeded task");
            if seed.start {
                autostart.push(task);
            }
        }
    }
    Ok(autostart)
}
