// Redraw scheduler - coalesces redraw requests into one per frame interval
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::task::JoinHandle;

/// Debounces redraws of one surface. Scheduling while a redraw is pending
/// cancels it, so a burst of updates paints once, one frame interval after
/// the last request.
///
/// Must be used from within a tokio runtime.
#[derive(Debug)]
pub struct RedrawScheduler {
    interval: Duration,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl RedrawScheduler {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            pending: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn schedule<F>(&self, redraw: F)
    where
        F: FnOnce() + Send + 'static,
    {
        let mut pending = self.pending();
        if let Some(previous) = pending.take() {
            previous.abort();
        }
        let interval = self.interval;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(interval).await;
            redraw();
        }));
    }

    /// Drop the pending redraw, if any. Returns whether one was cancelled.
    pub fn cancel(&self) -> bool {
        match self.pending().take() {
            Some(handle) if !handle.is_finished() => {
                handle.abort();
                true
            }
            _ => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending().as_ref().is_some_and(|handle| !handle.is_finished())
    }

    /// Wait for the pending redraw to run.
    pub async fn flush(&self) {
        let handle = self.pending().take();
        if let Some(handle) = handle {
            if let Err(e) = handle.await {
                if !e.is_cancelled() {
                    tracing::warn!("Redraw task failed: {}", e);
                }
            }
        }
    }

    fn pending(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RedrawScheduler {
    fn drop(&mut self) {
        if let Some(handle) = self.pending().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Box<dyn FnOnce() + Send>) {
        let count = Arc::new(AtomicUsize::new(0));
        let make = {
            let count = count.clone();
            move || {
                let count = count.clone();
                Box::new(move || {
                    count.fetch_add(1, Ordering::SeqCst);
                }) as Box<dyn FnOnce() + Send>
            }
        };
        (count, make)
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_redraws_once() {
        let scheduler = RedrawScheduler::new(Duration::from_millis(16));
        let (count, redraw) = counter();
        for _ in 0..5 {
            scheduler.schedule(redraw());
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
        assert!(scheduler.is_pending());
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!scheduler.is_pending());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_and_flush() {
        let scheduler = RedrawScheduler::new(Duration::from_millis(16));
        let (count, redraw) = counter();
        scheduler.schedule(redraw());
        assert!(scheduler.cancel());
        assert!(!scheduler.cancel());
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        scheduler.schedule(redraw());
        scheduler.flush().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        scheduler.flush().await;
    }
}
