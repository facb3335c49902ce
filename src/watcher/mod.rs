//! Background version polling
//!
//! [`VersionWatcher`] compares the remote version token with the one the locator
//! holds and forces a rebuild when they differ:
//!
//! ```text
//! Idle -> Polling -> Unchanged -> Idle
//!                 -> Changed   -> Rebuilding -> Idle
//! ```
//!
//! Polling errors are logged by the locator and count as "unchanged", so the
//! interval keeps running. At most one poll runs at a time.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::lookup::{BuildOutcome, ImageLocator, IndexEvent};

/// Shortest polling period; tokio intervals reject a zero period
const MIN_POLL_PERIOD: Duration = Duration::from_millis(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatcherState {
    Idle,
    Polling,
    Rebuilding,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PollOutcome {
    Unchanged,
    Rebuilt(BuildOutcome),
    /// Another poll was already running
    Skipped,
}

pub struct VersionWatcher {
    locator: Arc<ImageLocator>,
    in_flight: AtomicBool,
    state: watch::Sender<WatcherState>,
}

/// Clears the in-flight flag even if the poll future is dropped
struct InFlightGuard<'a>(&'a AtomicBool);

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl VersionWatcher {
    pub fn new(locator: Arc<ImageLocator>) -> Arc<Self> {
        let (state, _) = watch::channel(WatcherState::Idle);
        Arc::new(Self { locator, in_flight: AtomicBool::new(false), state })
    }

    pub fn state(&self) -> WatcherState {
        *self.state.borrow()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WatcherState> {
        self.state.subscribe()
    }

    /// Move to `next` unless the watcher was stopped
    fn transition(&self, next: WatcherState) {
        self.state.send_if_modified(|current| {
            if *current == WatcherState::Stopped || *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    /// Run one version check, rebuilding if the remote version moved
    pub async fn poll_once(&self) -> PollOutcome {
        if self
            .in_flight
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            debug!("version poll already running, skipping");
            return PollOutcome::Skipped;
        }
        let _guard = InFlightGuard(&self.in_flight);

        self.transition(WatcherState::Polling);
        let check = self.locator.check_for_update().await;

        let outcome = match check.new_version {
            Some(version) if check.needs_update => {
                info!(version = %version, "remote image tree changed");
                self.locator.notify(IndexEvent::UpdateDetected { version });

                self.transition(WatcherState::Rebuilding);
                let build = self.locator.build_index(true).await;
                if !build.success {
                    warn!(error = ?build.error, "background rebuild failed");
                }
                PollOutcome::Rebuilt(build)
            }
            _ => PollOutcome::Unchanged,
        };

        self.transition(WatcherState::Idle);
        outcome
    }

    /// Poll every `period` on the tokio runtime until the handle is stopped or dropped.
    ///
    /// The first poll happens one period after start. A tick that arrives while a
    /// poll is running is delayed, not stacked. Periods below one millisecond
    /// are raised to it.
    pub fn start(self: Arc<Self>, period: Duration) -> WatcherHandle {
        let period = period.max(MIN_POLL_PERIOD);
        let (shutdown, mut shutdown_rx) = watch::channel(false);
        let watcher = Arc::clone(&self);
        self.state.send_replace(WatcherState::Idle);

        let task = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!(period_ms = period.as_millis() as u64, "version watcher started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        watcher.poll_once().await;
                    }
                    changed = shutdown_rx.changed() => {
                        if changed.is_err() || *shutdown_rx.borrow() {
                            break;
                        }
                    }
                }
            }

            watcher.state.send_replace(WatcherState::Stopped);
            info!("version watcher stopped");
        });

        WatcherHandle { watcher: self, shutdown, task }
    }
}

/// Control handle for a running [`VersionWatcher`]. Dropping it stops the watcher.
pub struct WatcherHandle {
    watcher: Arc<VersionWatcher>,
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
}

impl WatcherHandle {
    pub fn state(&self) -> WatcherState {
        self.watcher.state()
    }

    pub fn subscribe_state(&self) -> watch::Receiver<WatcherState> {
        self.watcher.subscribe_state()
    }

    pub fn watcher(&self) -> &Arc<VersionWatcher> {
        &self.watcher
    }

    pub fn is_running(&self) -> bool {
        !self.task.is_finished()
    }

    /// Signal the loop to exit after any in-flight poll completes
    pub fn stop(&self) {
        // The loop may already be gone
        let _ = self.shutdown.send(true);
    }

    /// Stop and wait for the loop to exit
    pub async fn shutdown(self) -> Result<()> {
        self.stop();
        self.task.await.context("Version watcher task failed")
    }
}
