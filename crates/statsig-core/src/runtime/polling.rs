// statsig-core/src/runtime/polling.rs
// ============================================================================
// Module: Statsig Runtime Polling Primitive
// Description: Periodic-task scheduler with overlap prevention and a
//              liveness watchdog.
// Purpose: Give the spec store's two independent sync loops (rulesets, ID
//          lists) a single, testable non-reentrant scheduling primitive.
// Dependencies: tokio::time, tokio::sync::Notify, tokio::task
// ============================================================================

//! ## Overview
//! A [`PollingLoop`] runs one async tick function on a fixed period. Each
//! tick is non-reentrant: the next tick does not begin until the previous
//! one's future resolves. A failure counter tracks consecutive
//! tick failures and is reset on success; when `failure_count * period`
//! exceeds [`FAILURE_WARNING_THRESHOLD_MILLIS`] a single warning is emitted
//! and the counter resets, avoiding log spam during a sustained outage. A
//! liveness timestamp recorded at the start of every tick backs
//! [`PollingLoop::is_alive`], the building block for the spec store's
//! `resetSyncTimerIfExited` watchdog.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicU32;
use std::sync::atomic::Ordering;
use std::time::Duration;
use std::time::Instant;

use tokio::sync::Notify;
use tokio::task::JoinHandle;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Failure-spam guard: once `failure_count * period` exceeds this, a warning
/// is emitted and the counter resets.
pub const FAILURE_WARNING_THRESHOLD_MILLIS: u64 = 120_000;

/// Minimum watchdog staleness before a timer is considered dead
/// (`max(120_000 ms, period)`).
pub const WATCHDOG_MIN_STALENESS_MILLIS: u64 = 120_000;

// ============================================================================
// SECTION: Tick Future
// ============================================================================

/// A boxed, type-erased tick function. Returning `Err` counts as a failed
/// sync for the failure-spam guard; the string is a human-readable cause
/// only, never interpreted.
pub type TickFuture = Pin<Box<dyn Future<Output = Result<(), String>> + Send>>;

/// Factory invoked once per tick to produce the tick's future.
pub type TickFn = Arc<dyn Fn() -> TickFuture + Send + Sync>;

// ============================================================================
// SECTION: Polling Loop
// ============================================================================

/// A single periodic, non-reentrant, watchdog-observable task.
pub struct PollingLoop {
    name: &'static str,
    period: Duration,
    last_active: Arc<Mutex<Option<Instant>>>,
    failure_count: Arc<AtomicU32>,
    cancelled: Arc<AtomicBool>,
    notify: Arc<Notify>,
    handle: Mutex<Option<JoinHandle<()>>>,
}

impl PollingLoop {
    /// Creates a loop with the given tick period. The loop does not run
    /// until [`PollingLoop::spawn`] is called.
    #[must_use]
    pub fn new(name: &'static str, period: Duration) -> Self {
        Self {
            name,
            period,
            last_active: Arc::new(Mutex::new(None)),
            failure_count: Arc::new(AtomicU32::new(0)),
            cancelled: Arc::new(AtomicBool::new(false)),
            notify: Arc::new(Notify::new()),
            handle: Mutex::new(None),
        }
    }

    /// Starts the periodic task, replacing any previously spawned task.
    pub fn spawn(&self, tick: TickFn) {
        self.cancelled.store(false, Ordering::SeqCst);
        let period = self.period;
        let last_active = Arc::clone(&self.last_active);
        let failure_count = Arc::clone(&self.failure_count);
        let cancelled = Arc::clone(&self.cancelled);
        let notify = Arc::clone(&self.notify);
        let name = self.name;

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = interval.tick() => {}
                    () = notify.notified() => break,
                }
                if cancelled.load(Ordering::SeqCst) {
                    break;
                }
                *last_active
                    .lock()
                    .unwrap_or_else(std::sync::PoisonError::into_inner) = Some(Instant::now());

                match tick().await {
                    Ok(()) => failure_count.store(0, Ordering::SeqCst),
                    Err(cause) => {
                        let count = failure_count.fetch_add(1, Ordering::SeqCst) + 1;
                        tracing::debug!(loop_name = name, cause = %cause, "statsig: poll tick failed");
                        if u64::from(count) * as_millis(period) > FAILURE_WARNING_THRESHOLD_MILLIS {
                            tracing::warn!(
                                loop_name = name,
                                consecutive_failures = count,
                                "statsig: sustained poll failures"
                            );
                            failure_count.store(0, Ordering::SeqCst);
                        }
                    }
                }
            }
        });

        if let Some(old) = self.handle.lock().unwrap_or_else(std::sync::PoisonError::into_inner).replace(handle) {
            old.abort();
        }
    }

    /// Returns whether the loop has ticked recently enough to be considered
    /// alive: `now - last_active < max(WATCHDOG_MIN_STALENESS, period)`.
    /// A loop that has never ticked is alive only within its first staleness
    /// window after `started_at`, to avoid flagging a freshly-spawned loop
    /// as dead before its first tick fires.
    #[must_use]
    pub fn is_alive(&self, now: Instant, started_at: Instant) -> bool {
        let staleness = self.staleness_bound();
        let reference = self
            .last_active
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
            .unwrap_or(started_at);
        now.saturating_duration_since(reference) < staleness
    }

    fn staleness_bound(&self) -> Duration {
        Duration::from_millis(WATCHDOG_MIN_STALENESS_MILLIS).max(self.period)
    }

    /// Clears the timer and schedules a fresh one with the same tick
    /// function, as the watchdog does when a loop is found dead.
    pub fn reschedule(&self, tick: TickFn) {
        self.shutdown();
        *self.last_active.lock().unwrap_or_else(std::sync::PoisonError::into_inner) = None;
        self.spawn(tick);
    }

    /// Signals the loop to stop. Does not wait for an in-flight tick to
    /// finish; its side effects are harmless.
    pub fn shutdown(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    /// Signals the loop to stop and awaits its last in-flight tick.
    pub async fn shutdown_async(&self) {
        self.shutdown();
        let handle = self.handle.lock().unwrap_or_else(std::sync::PoisonError::into_inner).take();
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

fn as_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counting_tick(counter: Arc<AtomicUsize>) -> TickFn {
        Arc::new(move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            })
        })
    }

    #[tokio::test(start_paused = true)]
    async fn spawned_loop_ticks_on_schedule() {
        let counter = Arc::new(AtomicUsize::new(0));
        let polling = PollingLoop::new("test", Duration::from_millis(10));
        polling.spawn(counting_tick(Arc::clone(&counter)));

        tokio::time::advance(Duration::from_millis(35)).await;
        tokio::task::yield_now().await;

        assert!(counter.load(Ordering::SeqCst) >= 2);
        polling.shutdown();
    }

    #[tokio::test(start_paused = true)]
    async fn is_alive_reflects_recent_tick() {
        let counter = Arc::new(AtomicUsize::new(0));
        let polling = PollingLoop::new("test", Duration::from_millis(10));
        let started_at = Instant::now();
        polling.spawn(counting_tick(counter));

        tokio::time::advance(Duration::from_millis(15)).await;
        tokio::task::yield_now().await;
        assert!(polling.is_alive(Instant::now(), started_at));
        polling.shutdown();
    }

    #[tokio::test]
    async fn shutdown_async_awaits_in_flight_tick() {
        let counter = Arc::new(AtomicUsize::new(0));
        let polling = PollingLoop::new("test", Duration::from_millis(1));
        polling.spawn(counting_tick(counter));
        polling.shutdown_async().await;
    }
}
