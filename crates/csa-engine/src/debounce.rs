//! # Per-Scope Debounce Timer
//!
//! Each open scope owns one [`Debouncer`]. Every mutation calls
//! [`Debouncer::schedule`], which cancels the pending run and starts a new
//! one `window` later. Only the run scheduled by the most recent call can
//! fire: cancellation aborts the previous task and bumps a generation
//! counter that a woken task re-checks before doing any work.
//!
//! Cancellation only ever aborts the wait. Once a run has started it is
//! detached from the timer and always completes.

use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Cancel-and-restart timer. Dropping it does not cancel a pending run, so
/// the last edits of a discarded session still reach the store.
pub struct Debouncer {
    window: Duration,
    generation: Arc<AtomicU64>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            generation: Arc::new(AtomicU64::new(0)),
            pending: Mutex::new(None),
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Replace any pending run with `task`, to be started after the window.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn schedule<F, Fut>(&self, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut pending = self.pending.lock();
        let ticket = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        let generation = Arc::clone(&self.generation);
        let window = self.window;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(window).await;
            if generation.load(Ordering::SeqCst) == ticket {
                tokio::spawn(task());
            }
        }));
    }

    /// Drop the pending run, if any. Returns whether one was still waiting.
    pub fn cancel(&self) -> bool {
        let mut pending = self.pending.lock();
        self.generation.fetch_add(1, Ordering::SeqCst);
        match pending.take() {
            Some(handle) => {
                let waiting = !handle.is_finished();
                handle.abort();
                waiting
            }
            None => false,
        }
    }

    /// Whether a scheduled run has not completed yet.
    pub fn is_pending(&self) -> bool {
        self.pending
            .lock()
            .as_ref()
            .map(|h| !h.is_finished())
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter_task(counter: &Arc<AtomicUsize>) -> impl FnOnce() -> std::future::Ready<()> {
        let counter = Arc::clone(counter);
        move || {
            counter.fetch_add(1, Ordering::SeqCst);
            std::future::ready(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_single_schedule_fires_after_window() {
        let runs = Arc::new(AtomicUsize::new(0));
        let d = Debouncer::new(Duration::from_millis(1000));
        d.schedule(counter_task(&runs));

        tokio::time::sleep(Duration::from_millis(999)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(d.is_pending());

        tokio::time::sleep(Duration::from_millis(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert!(!d.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_rapid_schedules_coalesce() {
        let runs = Arc::new(AtomicUsize::new(0));
        let d = Debouncer::new(Duration::from_millis(1000));
        for _ in 0..5 {
            d.schedule(counter_task(&runs));
            tokio::time::sleep(Duration::from_millis(200)).await;
        }
        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_each_schedule_resets_window() {
        let runs = Arc::new(AtomicUsize::new(0));
        let d = Debouncer::new(Duration::from_millis(1000));
        d.schedule(counter_task(&runs));
        tokio::time::sleep(Duration::from_millis(900)).await;
        d.schedule(counter_task(&runs));
        tokio::time::sleep(Duration::from_millis(900)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_run() {
        let runs = Arc::new(AtomicUsize::new(0));
        let d = Debouncer::new(Duration::from_millis(1000));
        d.schedule(counter_task(&runs));
        assert!(d.cancel());
        tokio::time::sleep(Duration::from_millis(2000)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert!(!d.cancel());
    }
}
