//! Progress reporting for long walks.
//!
//! Workers never call the reporter directly: they bump a shared counter and
//! hand every n-th count to a relay thread over a bounded channel. A full
//! channel drops the update, so a slow reporter never stalls a worker.

use std::sync::atomic::{AtomicUsize, Ordering};

use crossbeam::channel::{self, Sender};
use tracing::{info, warn};

/// Receives `(current, total, description)` updates. Called from a single
/// relay thread, not necessarily for every element.
pub trait ProgressReporter: Send + Sync {
    fn set_progress(&self, current: usize, total: usize, description: &str);
}

/// Discards progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoProgress;

impl ProgressReporter for NoProgress {
    fn set_progress(&self, _current: usize, _total: usize, _description: &str) {}
}

/// Logs progress at info level.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogProgress;

impl ProgressReporter for LogProgress {
    fn set_progress(&self, current: usize, total: usize, description: &str) {
        info!(current, total, "{description}");
    }
}

impl<F> ProgressReporter for F
where
    F: Fn(usize, usize, &str) + Send + Sync,
{
    fn set_progress(&self, current: usize, total: usize, description: &str) {
        self(current, total, description);
    }
}

const CHANNEL_CAPACITY: usize = 16;

/// Worker-side handle of a running relay.
#[derive(Debug)]
pub struct ProgressTicker {
    count: AtomicUsize,
    interval: usize,
    sender: Sender<usize>,
}

impl ProgressTicker {
    /// Counts one finished element.
    pub fn tick(&self) {
        let current = self.count.fetch_add(1, Ordering::Relaxed) + 1;
        if current % self.interval == 0 {
            // Dropped when the relay is behind.
            let _ = self.sender.try_send(current);
        }
    }

    #[must_use]
    pub fn count(&self) -> usize {
        self.count.load(Ordering::Relaxed)
    }
}

/// Runs `work` with a ticker whose updates reach `reporter` on a relay
/// thread. The first update reports 0 and the last one the final count,
/// after every relayed update.
pub fn with_progress<R>(
    reporter: &dyn ProgressReporter,
    total: usize,
    interval: usize,
    description: &str,
    work: impl FnOnce(&ProgressTicker) -> R,
) -> R {
    let (sender, receiver) = channel::bounded::<usize>(CHANNEL_CAPACITY);
    let ticker = ProgressTicker {
        count: AtomicUsize::new(0),
        interval: interval.max(1),
        sender,
    };

    std::thread::scope(|scope| {
        reporter.set_progress(0, total, description);
        let relay = scope.spawn(move || {
            for current in receiver {
                reporter.set_progress(current, total, description);
            }
        });

        let result = work(&ticker);
        let done = ticker.count();
        drop(ticker);
        if relay.join().is_err() {
            warn!("Progress reporter panicked");
        }
        reporter.set_progress(done, total, description);
        result
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    #[test]
    fn relays_interval_updates_and_final_count() {
        let seen = Mutex::new(Vec::new());
        let reporter = |current: usize, total: usize, _: &str| {
            seen.lock().unwrap().push((current, total));
        };

        let out = with_progress(&reporter, 10, 4, "walk", |ticker| {
            for _ in 0..10 {
                ticker.tick();
            }
            "done"
        });

        assert_eq!(out, "done");
        assert_eq!(
            seen.into_inner().unwrap(),
            vec![(0, 10), (4, 10), (8, 10), (10, 10)]
        );
    }

    #[test]
    fn zero_interval_reports_every_tick() {
        let seen = Mutex::new(0usize);
        let reporter = |_: usize, _: usize, _: &str| {
            *seen.lock().unwrap() += 1;
        };
        with_progress(&reporter, 3, 0, "walk", |ticker| {
            for _ in 0..3 {
                ticker.tick();
            }
        });
        // initial, three relayed, final
        assert_eq!(seen.into_inner().unwrap(), 5);
    }

    #[test]
    fn no_progress_is_silent() {
        with_progress(&NoProgress, 1, 1, "walk", ProgressTicker::tick);
    }
}
