//! Fixed-rate driver for a [`World`].
//!
//! The world lives on a single task and is only ever touched there, so ticks
//! never overlap. Each tick runs on the blocking pool; a tick that fails or
//! panics is reported and the next one is scheduled as usual. Late ticks are
//! skipped rather than bunched up.

use crate::brain::DecisionPolicy;
use crate::config::SchedulerConfig;
use crate::error::{Result, SimError};
use crate::history::{EventLog, LiveEvent};
use crate::metrics::Metrics;
use crate::world::World;
use evolarium_data::WorldSnapshot;
use serde::Serialize;
use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

const RECENT_EVENTS: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerCommand {
    Start,
    Stop,
    Shutdown,
}

#[derive(Debug, Clone)]
pub enum SchedulerEvent {
    Started,
    Stopped,
    Snapshot(Arc<WorldSnapshot>),
    TickFailed { tick: u64, message: String },
    EpochReset { generation: u32 },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchedulerStatus {
    Running,
    Stopped,
    ShutDown,
}

/// Cheap, cloneable control surface for a running scheduler.
#[derive(Clone)]
pub struct SchedulerHandle {
    commands: mpsc::UnboundedSender<SchedulerCommand>,
    events: broadcast::Sender<SchedulerEvent>,
    status: watch::Receiver<SchedulerStatus>,
    snapshot: watch::Receiver<Arc<WorldSnapshot>>,
    metrics: Arc<Metrics>,
    log: Arc<Mutex<EventLog>>,
}

impl SchedulerHandle {
    fn send(&self, command: SchedulerCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SimError::invalid_state("scheduler has shut down"))
    }

    /// Begins ticking. Does nothing if already running.
    pub fn start(&self) -> Result<()> {
        self.send(SchedulerCommand::Start)
    }

    /// Pauses ticking. Does nothing if already stopped.
    pub fn stop(&self) -> Result<()> {
        self.send(SchedulerCommand::Stop)
    }

    pub fn shutdown(&self) -> Result<()> {
        self.send(SchedulerCommand::Shutdown)
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<SchedulerEvent> {
        self.events.subscribe()
    }

    #[must_use]
    pub fn latest_snapshot(&self) -> Arc<WorldSnapshot> {
        Arc::clone(&self.snapshot.borrow())
    }

    #[must_use]
    pub fn status(&self) -> SchedulerStatus {
        *self.status.borrow()
    }

    #[must_use]
    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Up to `n` newest simulation events, oldest first.
    #[must_use]
    pub fn recent_events(&self, n: usize) -> Vec<LiveEvent> {
        self.log
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .recent(n)
    }
}

/// Channel ends owned by the tick task.
struct Outlets {
    events: broadcast::Sender<SchedulerEvent>,
    status: watch::Sender<SchedulerStatus>,
    snapshot: watch::Sender<Arc<WorldSnapshot>>,
    metrics: Arc<Metrics>,
    log: Arc<Mutex<EventLog>>,
}

impl Outlets {
    fn emit(&self, event: SchedulerEvent) {
        // No subscribers is fine.
        let _ = self.events.send(event);
    }

    fn fail(&self, tick: u64, message: String) {
        tracing::error!(tick, %message, "Tick failed");
        self.metrics.increment_counter("tick_failed");
        self.emit(SchedulerEvent::TickFailed { tick, message });
    }
}

/// Moves `world` onto a new task and returns its handle.
///
/// The join handle yields the world back after shutdown, or `None` if the
/// blocking pool lost it.
pub fn spawn<P: DecisionPolicy>(
    world: World<P>,
    config: SchedulerConfig,
) -> (SchedulerHandle, JoinHandle<Option<World<P>>>) {
    let (command_tx, command_rx) = mpsc::unbounded_channel();
    let (event_tx, _) = broadcast::channel(config.event_capacity.max(1));
    let (status_tx, status_rx) = watch::channel(SchedulerStatus::Stopped);
    let (snapshot_tx, snapshot_rx) = watch::channel(Arc::new(world.snapshot()));
    let metrics = Arc::new(Metrics::new());
    let log = Arc::new(Mutex::new(EventLog::new(RECENT_EVENTS)));

    let handle = SchedulerHandle {
        commands: command_tx,
        events: event_tx.clone(),
        status: status_rx,
        snapshot: snapshot_rx,
        metrics: Arc::clone(&metrics),
        log: Arc::clone(&log),
    };
    let outlets = Outlets {
        events: event_tx,
        status: status_tx,
        snapshot: snapshot_tx,
        metrics,
        log,
    };
    if config.autostart {
        // The receiver is alive until the task below exits.
        let _ = handle.start();
    }
    let task = tokio::spawn(run(world, config, command_rx, outlets));
    (handle, task)
}

async fn run<P: DecisionPolicy>(
    mut world: World<P>,
    config: SchedulerConfig,
    mut commands: mpsc::UnboundedReceiver<SchedulerCommand>,
    outlets: Outlets,
) -> Option<World<P>> {
    let period = Duration::from_millis(config.tick_ms.max(1));
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let mut running = false;

    loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(SchedulerCommand::Start) if !running => {
                    running = true;
                    ticker.reset();
                    outlets.status.send_replace(SchedulerStatus::Running);
                    outlets.emit(SchedulerEvent::Started);
                    tracing::info!(
                        tick = world.tick,
                        tick_ms = config.tick_ms,
                        "Scheduler started"
                    );
                }
                Some(SchedulerCommand::Stop) if running => {
                    running = false;
                    outlets.status.send_replace(SchedulerStatus::Stopped);
                    outlets.emit(SchedulerEvent::Stopped);
                    tracing::info!(tick = world.tick, "Scheduler stopped");
                }
                Some(SchedulerCommand::Start | SchedulerCommand::Stop) => {}
                Some(SchedulerCommand::Shutdown) | None => break,
            },
            _ = ticker.tick(), if running => {
                world = step(world, &config, period, &outlets).await?;
            }
        }
    }

    outlets.status.send_replace(SchedulerStatus::ShutDown);
    tracing::info!(tick = world.tick, "Scheduler shut down");
    Some(world)
}

async fn step<P: DecisionPolicy>(
    world: World<P>,
    config: &SchedulerConfig,
    period: Duration,
    outlets: &Outlets,
) -> Option<World<P>> {
    let started = Instant::now();
    let joined = tokio::task::spawn_blocking(move || {
        let mut world = world;
        let result = catch_unwind(AssertUnwindSafe(|| world.update()));
        (world, result)
    })
    .await;
    let (world, result) = match joined {
        Ok(pair) => pair,
        Err(e) => {
            tracing::error!(error = %e, "Tick task was lost");
            outlets.status.send_replace(SchedulerStatus::ShutDown);
            return None;
        }
    };
    let elapsed = started.elapsed();

    match result {
        Ok(Ok(events)) => {
            for event in &events {
                if let LiveEvent::EpochReset { generation, .. } = event {
                    outlets.emit(SchedulerEvent::EpochReset {
                        generation: *generation,
                    });
                }
            }
            outlets
                .log
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .extend(events);
        }
        Ok(Err(e)) => outlets.fail(world.tick, e.to_string()),
        Err(panic) => outlets.fail(world.tick, panic_message(panic.as_ref())),
    }

    let report = &world.last_report;
    outlets.metrics.add_to_counter("births", report.births as u64);
    outlets.metrics.add_to_counter("deaths", report.deaths as u64);
    outlets.metrics.add_to_counter("kills", report.kills as u64);
    outlets
        .metrics
        .add_to_counter("feedback_busy", report.feedback.busy as u64);
    outlets
        .metrics
        .add_to_counter("decision_errors", report.decision_errors as u64);
    outlets
        .metrics
        .record_tick(elapsed, world.population(), world.food_count());
    if elapsed > period {
        tracing::warn!(
            tick = world.tick,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            budget_ms = period.as_secs_f64() * 1000.0,
            "Slow tick"
        );
    }

    if world.tick % config.broadcast_every.max(1) == 0 {
        let snapshot = Arc::new(world.snapshot());
        outlets.snapshot.send_replace(Arc::clone(&snapshot));
        outlets.emit(SchedulerEvent::Snapshot(snapshot));
    }
    Some(world)
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        format!("panic: {s}")
    } else if let Some(s) = payload.downcast_ref::<String>() {
        format!("panic: {s}")
    } else {
        "panic".to_string()
    }
}
