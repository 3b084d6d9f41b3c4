//! Fixed-period refresh loop
//!
//! The scheduler is either idle (no task) or running (one task ticking on a
//! `tokio::time::interval`). A tick finishes its whole player pass before
//! the next one is awaited, so ticks never overlap.

use crate::service::TagService;
use log::{debug, info, warn};
use std::sync::{Arc, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval, Duration, MissedTickBehavior};

/// Log a summary every this many ticks
const SUMMARY_EVERY_TICKS: u64 = 600;

pub struct TagScheduler {
    service: Arc<TagService>,
    period: Duration,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl TagScheduler {
    pub fn new(service: Arc<TagService>, period: Duration) -> Self {
        Self {
            service,
            period,
            task: Mutex::new(None),
        }
    }

    /// Spawns the refresh loop unless it is already running.
    /// Must be called from within a Tokio runtime.
    ///
    /// Returns true if a new loop was started.
    pub fn start(&self) -> bool {
        let mut task = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return false;
        }

        let service = Arc::clone(&self.service);
        *task = Some(tokio::spawn(run_tag_loop(service, self.period)));
        info!(
            "Tag refresh loop started ({}ms period)",
            self.period.as_millis()
        );
        true
    }

    /// Restarts the loop if it was found not running.
    pub fn ensure_running(&self) -> bool {
        if self.is_running() {
            return false;
        }
        warn!("Tag refresh loop was not running, restarting it");
        self.start()
    }

    /// Cancels the loop. Safe to call repeatedly; returns true if a running
    /// loop was cancelled.
    pub fn stop(&self) -> bool {
        let handle = self
            .task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        match handle {
            Some(handle) => {
                let was_running = !handle.is_finished();
                handle.abort();
                if was_running {
                    info!("Tag refresh loop stopped");
                }
                was_running
            }
            None => false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.task
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }
}

impl Drop for TagScheduler {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn run_tag_loop(service: Arc<TagService>, period: Duration) {
    let mut interval_timer = interval(period);
    interval_timer.set_missed_tick_behavior(MissedTickBehavior::Skip);

    // Skip the first tick since it fires immediately
    interval_timer.tick().await;

    let mut ticks: u64 = 0;
    loop {
        interval_timer.tick().await;

        let report = service.refresh_all().await;
        ticks += 1;

        if report.failed > 0 {
            warn!(
                "Tick {}: {} of {} tag updates failed",
                ticks,
                report.failed,
                report.applied + report.failed
            );
        }
        if ticks % SUMMARY_EVERY_TICKS == 0 {
            debug!("Tick {}: {} tags applied", ticks, report.applied);
        }
    }
}
