//! Per-job countdown timers.
//!
//! Between sparse server events the client extrapolates a job's timing once
//! per tick from the owning printer's status. Each job has at most one
//! running timer task; starting a timer for a job aborts the previous one.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};

use crate::communication::event_system::{EventBus, EventKind, PushEvent, Subscription};
use crate::config::TrackerConfig;
use crate::models::{JobId, PrinterStatus, TimeRecord};
use crate::notify::{Level, Notification, Notifier};
use crate::registry::{JobPatch, Registry, Update};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// The printer reported complete, cancelled or error.
    Terminal,
    /// No time left and the printer is no longer working on the job.
    Exhausted,
}

/// Pause threshold crossed on this tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PauseAlert {
    pub level: Level,
    pub paused_secs: u64,
}

/// What one tick did to a record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Tick {
    pub mutated: bool,
    pub alert: Option<PauseAlert>,
    pub stop: Option<StopReason>,
}

/// Advance `record` by one second given the owning printer's status.
pub fn advance(record: &mut TimeRecord, status: &PrinterStatus, rules: &TrackerConfig) -> Tick {
    let mut tick = Tick::default();
    if status.is_terminal() {
        tick.stop = Some(StopReason::Terminal);
        return tick;
    }

    match status {
        PrinterStatus::Printing => {
            record.elapsed = record.elapsed.saturating_add(1);
            if record.elapsed > record.total {
                record.extra = record.extra.saturating_add(1);
                record.remaining = 0;
                record.push_eta(1);
            } else {
                record.remaining = record.remaining.saturating_sub(1);
            }
            record.pause = 0;
            tick.mutated = true;
        }
        PrinterStatus::Paused => {
            record.elapsed = record.elapsed.saturating_add(1);
            record.total = record.total.saturating_add(1);
            record.pause = record.pause.saturating_add(1);
            record.push_eta(1);
            tick.mutated = true;
            if record.pause == rules.pause_error {
                tick.alert = Some(PauseAlert { level: Level::Error, paused_secs: record.pause });
            } else if rules.pause_warnings.contains(&record.pause) {
                tick.alert = Some(PauseAlert { level: Level::Warning, paused_secs: record.pause });
            }
        }
        _ => {
            if record.pause != 0 {
                record.pause = 0;
                tick.mutated = true;
            }
        }
    }

    let working = matches!(status, PrinterStatus::Printing | PrinterStatus::Paused);
    if record.is_exhausted() && (rules.stop_on_exhausted || !working) {
        tick.stop = Some(StopReason::Exhausted);
    }
    tick
}

/// Longest estimate the tracker accepts from a `job_time` event.
pub const MAX_ESTIMATE_SECS: u64 = 365 * 24 * 60 * 60;

/// Whole seconds for a pushed estimate, floored at 0 and capped at
/// [`MAX_ESTIMATE_SECS`].
fn estimate_secs(job_id: JobId, total_time: f64) -> u64 {
    if !total_time.is_finite() || total_time > MAX_ESTIMATE_SECS as f64 {
        tracing::warn!(
            "Job {} estimate {} out of range, capping at {}s",
            job_id,
            total_time,
            MAX_ESTIMATE_SECS
        );
        return if total_time > 0.0 { MAX_ESTIMATE_SECS } else { 0 };
    }
    total_time.max(0.0).round() as u64
}

fn describe_duration(secs: u64) -> String {
    if secs % 60 == 0 {
        format!("{} minutes", secs / 60)
    } else {
        format!("{} seconds", secs)
    }
}

fn alert_notification(job_name: &str, alert: PauseAlert) -> Notification {
    let label = if job_name.is_empty() { "Job".to_string() } else { format!("Job '{}'", job_name) };
    let paused = describe_duration(alert.paused_secs);
    match alert.level {
        Level::Error => Notification::error(format!(
            "{} has been paused for {}! It should be cancelled.",
            label, paused
        )),
        level => Notification {
            level,
            message: format!("{} has been paused for {}!", label, paused),
        },
    }
}

struct ActiveTimer {
    generation: u64,
    handle: JoinHandle<()>,
}

struct Inner {
    registry: Arc<dyn Registry>,
    notifier: Arc<dyn Notifier>,
    config: TrackerConfig,
    next_generation: AtomicU64,
    timers: Mutex<HashMap<JobId, ActiveTimer>>,
}

impl Inner {
    fn timers(&self) -> MutexGuard<'_, HashMap<JobId, ActiveTimer>> {
        self.timers.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One tick for `job_id`. Returns false once the timer should end.
    fn step(&self, job_id: JobId, generation: u64) -> bool {
        let (keep_going, notification) = {
            let timers = self.timers();
            // Superseded or stopped while waiting for the tick.
            if timers.get(&job_id).map(|t| t.generation) != Some(generation) {
                return false;
            }
            self.step_locked(job_id)
        };
        if let Some(notification) = notification {
            self.notifier.notify(notification);
        }
        keep_going
    }

    fn step_locked(&self, job_id: JobId) -> (bool, Option<Notification>) {
        let Some(location) = self.registry.lookup_job(job_id) else {
            tracing::warn!("Job {} left the registry, stopping its timer", job_id);
            return (false, None);
        };
        let Some(mut record) = location.job.time.clone() else {
            tracing::warn!("Job {} has no time record, stopping its timer", job_id);
            return (false, None);
        };

        let tick = advance(&mut record, &location.device_status, &self.config);
        tracing::debug!(
            "Job {} [{}] total={} elapsed={} remaining={} extra={} pause={} eta={}",
            job_id,
            location.device_status,
            record.total,
            record.elapsed,
            record.remaining,
            record.extra,
            record.pause,
            record.eta
        );
        if tick.mutated {
            if let Err(e) = self.registry.apply_update(Update::Job {
                id: job_id,
                patch: JobPatch::Time(record),
            }) {
                tracing::warn!("Dropping timer for job {}: {}", job_id, e);
                return (false, None);
            }
        }
        let notification = tick.alert.map(|alert| alert_notification(&location.job.name, alert));
        if let Some(reason) = tick.stop {
            tracing::info!("Timer for job {} stopped: {:?}", job_id, reason);
            return (false, notification);
        }
        (true, notification)
    }

    fn finish(&self, job_id: JobId, generation: u64) {
        let mut timers = self.timers();
        if timers.get(&job_id).map(|t| t.generation) == Some(generation) {
            timers.remove(&job_id);
        }
    }
}

/// Owns the timer task of every tracked job.
#[derive(Clone)]
pub struct JobTimer {
    inner: Arc<Inner>,
}

impl JobTimer {
    pub fn new(registry: Arc<dyn Registry>, notifier: Arc<dyn Notifier>, config: TrackerConfig) -> Self {
        Self {
            inner: Arc::new(Inner {
                registry,
                notifier,
                config,
                next_generation: AtomicU64::new(1),
                timers: Mutex::new(HashMap::new()),
            }),
        }
    }

    /// Reset the job's time record to `total_secs` and (re)start its timer.
    /// Must be called from within a tokio runtime. Returns false if the job
    /// is not in the registry.
    pub fn start(&self, job_id: JobId, total_secs: u64) -> bool {
        let inner = &self.inner;
        let mut timers = inner.timers();
        if let Some(previous) = timers.remove(&job_id) {
            tracing::debug!("Superseding timer for job {}", job_id);
            previous.handle.abort();
        }

        let record = TimeRecord::new(total_secs, Utc::now());
        if let Err(e) = inner.registry.apply_update(Update::Job {
            id: job_id,
            patch: JobPatch::Time(record),
        }) {
            tracing::error!("Cannot start timer: {}", e);
            return false;
        }

        let generation = inner.next_generation.fetch_add(1, Ordering::Relaxed);
        let period = inner.config.tick();
        let task_inner = inner.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if !task_inner.step(job_id, generation) {
                    break;
                }
            }
            task_inner.finish(job_id, generation);
        });
        timers.insert(job_id, ActiveTimer { generation, handle });
        tracing::info!("Timer started for job {} ({}s)", job_id, total_secs);
        true
    }

    /// Cancel the job's timer, keeping its last time record.
    pub fn stop(&self, job_id: JobId) -> bool {
        match self.inner.timers().remove(&job_id) {
            Some(active) => {
                active.handle.abort();
                tracing::info!("Timer for job {} cancelled", job_id);
                true
            }
            None => false,
        }
    }

    pub fn is_running(&self, job_id: JobId) -> bool {
        self.inner.timers().contains_key(&job_id)
    }

    pub fn active_count(&self) -> usize {
        self.inner.timers().len()
    }

    /// Listen for `job_time` (start) and terminal `job_status_update`
    /// (stop) events.
    pub fn attach(&self, bus: &Arc<EventBus>) -> Vec<Subscription> {
        let on_time = self.clone();
        let on_status = self.clone();
        vec![
            bus.subscribe(EventKind::JobTime, move |event| {
                if let PushEvent::JobTime(update) = event {
                    on_time.start(update.job_id, estimate_secs(update.job_id, update.total_time));
                }
            }),
            bus.subscribe(EventKind::JobStatusUpdate, move |event| {
                if let PushEvent::JobStatusUpdate(update) = event {
                    if update.status.is_terminal() {
                        on_status.stop(update.job_id);
                    }
                }
            }),
        ]
    }

    /// Abort every timer.
    pub fn shutdown(&self) {
        let mut timers = self.inner.timers();
        for (_, active) in timers.drain() {
            active.handle.abort();
        }
    }
}
