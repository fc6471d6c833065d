//! Bounds the worst-case run time of an unattended job.
//!
//! Two layers: `guard` drops pipeline work once the deadline passes, which
//! lets the caller close the render session; `arm_hard_kill` terminates the
//! process outright if even that does not finish in time.

use std::future::Future;
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tracing::error;

#[derive(Debug, Clone, Copy, Error)]
#[error("Watchdog deadline of {} ms exceeded", .0.as_millis())]
pub struct WatchdogExpired(pub Duration);

#[derive(Debug, Clone, Copy)]
pub struct Watchdog {
    started: Instant,
    deadline: Duration,
}

impl Watchdog {
    /// Start the countdown now.
    pub fn start(deadline: Duration) -> Self {
        Self {
            started: Instant::now(),
            deadline,
        }
    }

    /// Count from an earlier instant, typically process start, once the
    /// deadline has been read from config.
    pub fn since(started: Instant, deadline: Duration) -> Self {
        Self { started, deadline }
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_sub(self.started.elapsed())
    }

    /// Run `fut` until it completes or the shared deadline passes. On expiry
    /// the future is dropped at its current await point.
    pub async fn guard<F: Future>(&self, fut: F) -> Result<F::Output, WatchdogExpired> {
        tokio::time::timeout_at(self.started + self.deadline, fut)
            .await
            .map_err(|_| WatchdogExpired(self.deadline))
    }

    /// Exit the process with `exit_code` after `after` unless the returned
    /// handle is disarmed or dropped first. Runs on an OS thread so a blocked
    /// async runtime cannot delay it.
    pub fn arm_hard_kill(after: Duration, exit_code: i32) -> HardKill {
        let (tx, rx) = mpsc::channel::<()>();
        let spawned = thread::Builder::new()
            .name("skyslot-watchdog".into())
            .spawn(move || {
                if let Err(RecvTimeoutError::Timeout) = rx.recv_timeout(after) {
                    error!(
                        "Watchdog: still running after {} ms, terminating",
                        after.as_millis()
                    );
                    std::process::exit(exit_code);
                }
            });
        if let Err(e) = spawned {
            error!("Watchdog: failed to spawn hard-kill thread: {}", e);
        }
        HardKill { _disarm: tx }
    }
}

/// Keeps the hard kill armed while alive.
#[must_use = "dropping the handle disarms the hard kill"]
pub struct HardKill {
    _disarm: mpsc::Sender<()>,
}

impl HardKill {
    pub fn disarm(self) {}
}
