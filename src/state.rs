//! Shared application state for Axum handlers.
//!
//! Owns the configuration, the injected rate-limit store, and the
//! background sweep that garbage-collects expired windows.
//!
//! # Structured Concurrency
//!
//! The sweep is managed with `tokio_util::task::TaskTracker` and a
//! `CancellationToken` rather than a fire-and-forget interval, so tests
//! and process shutdown can stop it deterministically. Call `shutdown()`
//! to cancel and await it before exit.

use std::sync::Arc;
use std::time::Instant;

use tokio::time::interval;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, trace};

use crate::config::Config;
use crate::metrics;
use crate::middleware::FixedWindowLimiter;

/// Shared application state for Axum handlers.
///
/// Cloned per request handler; internals are `Arc`-wrapped.
///
/// # Lifecycle
///
/// The sweep task is spawned when the state is created. Call `shutdown()`
/// before dropping to ensure clean task termination:
///
/// ```rust,ignore
/// let state = AppState::new(config);
/// // ... serve ...
/// state.shutdown().await;
/// ```
#[derive(Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<Config>,
    /// Rate-limit window store, shared with the gate
    pub limiter: Arc<FixedWindowLimiter>,
    /// Timestamp when the application started
    pub started_at: Instant,
    /// Tracks spawned background tasks for graceful shutdown
    task_tracker: TaskTracker,
    /// Cancellation token for signaling background tasks to stop
    cancellation_token: CancellationToken,
}

impl AppState {
    /// Create application state and start the background sweep.
    ///
    /// The limiter is constructed here and shared with the gate through
    /// the returned state, so every component sees the same windows and
    /// nothing lives in a module-level global.
    pub fn new(config: Config) -> Self {
        let limiter = Arc::new(FixedWindowLimiter::new(config.security.rate_limit.window));

        let state = Self {
            config: Arc::new(config),
            limiter,
            started_at: Instant::now(),
            task_tracker: TaskTracker::new(),
            cancellation_token: CancellationToken::new(),
        };

        state.spawn_sweep_task();

        state
    }

    /// Spawn the background sweep of expired rate-limit windows.
    ///
    /// Losing a record to the sweep mid-request is safe: the limiter
    /// treats a missing record exactly like an expired one.
    fn spawn_sweep_task(&self) {
        let limiter = Arc::clone(&self.limiter);
        let sweep_interval = self.config.sweep_interval;
        let cancel = self.cancellation_token.clone();

        self.task_tracker.spawn(async move {
            let mut ticker = interval(sweep_interval);
            ticker.tick().await; // Skip the first immediate tick

            loop {
                tokio::select! {
                    biased; // Check cancellation first

                    _ = cancel.cancelled() => {
                        debug!("Sweep task received cancellation signal");
                        break;
                    }
                    _ = ticker.tick() => {
                        let removed = limiter.sweep();
                        metrics::record_sweep_removed(removed);
                        metrics::set_tracked_buckets(limiter.len());
                        if removed > 0 {
                            debug!(removed, tracked = limiter.len(), "Swept expired rate-limit windows");
                        } else {
                            trace!(tracked = limiter.len(), "Sweep found no expired windows");
                        }
                    }
                }
            }

            debug!("Sweep task shutting down");
        });
    }

    /// Gracefully shutdown all background tasks.
    ///
    /// Signals cancellation, closes the tracker, and waits for the sweep
    /// to finish its current iteration.
    pub async fn shutdown(&self) {
        info!("Initiating graceful shutdown of background tasks");

        self.cancellation_token.cancel();
        self.task_tracker.close();
        self.task_tracker.wait().await;

        info!("All background tasks have completed");
    }

    /// Get the application uptime in seconds.
    pub fn uptime_seconds(&self) -> u64 {
        self.started_at.elapsed().as_secs()
    }
}
