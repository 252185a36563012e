//! Per-connection liveness watchdog.
//!
//! A [`Watchdog`] runs a timer task that fires its expiry action once if the
//! deadline passes without a [`refresh`](Watchdog::refresh). The session
//! refreshes it on every heartbeat frame; the deadline is always
//! `now + timeout` measured from the latest refresh.
//!
//! Dropping the watchdog disarms it.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, sleep_until};
use tracing::trace;

// ============================================================================
// Watchdog
// ============================================================================

/// Timer that must be refreshed before its deadline.
#[derive(Debug)]
pub struct Watchdog {
    /// Current deadline, observed by the timer task.
    deadline: watch::Sender<Instant>,
    /// Window granted by each refresh.
    timeout: Duration,
    /// Timer task.
    task: JoinHandle<()>,
}

impl Watchdog {
    /// Arms a watchdog whose deadline is `now + timeout`.
    ///
    /// `on_expiry` runs exactly once, on the timer task, if the deadline
    /// elapses before the watchdog is refreshed or dropped.
    pub fn spawn<F>(timeout: Duration, on_expiry: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        let (deadline, mut deadline_rx) = watch::channel(Instant::now() + timeout);

        let task = tokio::spawn(async move {
            loop {
                let current = *deadline_rx.borrow_and_update();

                tokio::select! {
                    () = sleep_until(current) => {
                        if *deadline_rx.borrow() <= Instant::now() {
                            trace!("Watchdog expired");
                            on_expiry();
                            return;
                        }
                    }

                    changed = deadline_rx.changed() => {
                        if changed.is_err() {
                            trace!("Watchdog disarmed");
                            return;
                        }
                    }
                }
            }
        });

        Self {
            deadline,
            timeout,
            task,
        }
    }

    /// Pushes the deadline to `now + timeout`.
    pub fn refresh(&self) {
        self.deadline.send_replace(Instant::now() + self.timeout);
    }

    /// Returns the window granted by each refresh.
    #[inline]
    #[must_use]
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Returns `true` once the expiry action has run or the timer stopped.
    #[inline]
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}

impl Drop for Watchdog {
    fn drop(&mut self) {
        self.task.abort();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use tokio::time::{advance, sleep};

    fn counter() -> (Arc<AtomicUsize>, impl FnOnce() + Send + 'static) {
        let fired = Arc::new(AtomicUsize::new(0));
        let fired_clone = Arc::clone(&fired);
        (fired, move || {
            fired_clone.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_after_timeout() {
        let (fired, on_expiry) = counter();
        let watchdog = Watchdog::spawn(Duration::from_millis(1000), on_expiry);

        sleep(Duration::from_millis(999)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(watchdog.is_finished());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_postpones_expiry() {
        let (fired, on_expiry) = counter();
        let watchdog = Watchdog::spawn(Duration::from_millis(1000), on_expiry);

        for _ in 0..10 {
            sleep(Duration::from_millis(500)).await;
            watchdog.refresh();
        }
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(1001)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_only_once() {
        let (fired, on_expiry) = counter();
        let watchdog = Watchdog::spawn(Duration::from_millis(100), on_expiry);

        sleep(Duration::from_millis(150)).await;
        watchdog.refresh();
        sleep(Duration::from_millis(500)).await;

        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_disarms() {
        let (fired, on_expiry) = counter();
        let watchdog = Watchdog::spawn(Duration::from_millis(100), on_expiry);

        drop(watchdog);
        advance(Duration::from_millis(500)).await;
        tokio::task::yield_now().await;

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_timeout_accessor() {
        let watchdog = Watchdog::spawn(Duration::from_millis(1000), || {});
        assert_eq!(watchdog.timeout(), Duration::from_millis(1000));
    }
}
