//! Cancelable scheduled tasks.
//!
//! Auto-save, simulated upload progress, the OTP resend countdown and toast
//! auto-dismiss all run as tasks owned through a [`TaskHandle`]. Dropping the
//! handle aborts the task, so tearing a widget down always cancels its timers.

use super::WidgetError;
use std::future::Future;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

/// Owned handle to a spawned timer task.
///
#[derive(Debug)]
pub struct TaskHandle {
    inner: Option<JoinHandle<()>>,
}

impl TaskHandle {
    /// Spawn a future on the current runtime.
    ///
    pub fn spawn<F>(future: F) -> Result<Self, WidgetError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let handle = Handle::try_current().map_err(|e| WidgetError::NoRuntime(e.to_string()))?;
        Ok(TaskHandle {
            inner: Some(handle.spawn(future)),
        })
    }

    /// Run `callback` once after `delay`.
    ///
    pub fn after<F>(delay: Duration, callback: F) -> Result<Self, WidgetError>
    where
        F: FnOnce() + Send + 'static,
    {
        Self::spawn(async move {
            time::sleep(delay).await;
            callback();
        })
    }

    /// Run `tick` every `period`, first firing one period from now. The task
    /// ends once `tick` returns false.
    ///
    pub fn interval<F>(period: Duration, mut tick: F) -> Result<Self, WidgetError>
    where
        F: FnMut() -> bool + Send + 'static,
    {
        Self::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                if !tick() {
                    break;
                }
            }
        })
    }

    /// Like [`TaskHandle::interval`] but awaits the future returned by each
    /// tick before waiting for the next one.
    ///
    pub fn interval_async<F, Fut>(period: Duration, mut tick: F) -> Result<Self, WidgetError>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        Self::spawn(async move {
            let mut interval = time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                interval.tick().await;
                tick().await;
            }
        })
    }

    /// Abort the task if it is still running.
    ///
    pub fn cancel(&mut self) {
        if let Some(handle) = self.inner.take() {
            handle.abort();
        }
    }

    /// Release the task without aborting it.
    ///
    pub fn detach(&mut self) {
        self.inner.take();
    }

    /// Whether the task has run to completion or was cancelled.
    ///
    pub fn is_finished(&self) -> bool {
        self.inner.as_ref().map_or(true, JoinHandle::is_finished)
    }

    /// Wait for the task to finish on its own.
    ///
    pub async fn join(mut self) {
        if let Some(handle) = self.inner.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_spawn_without_runtime_fails() {
        let result = TaskHandle::spawn(async {});
        assert!(matches!(result, Err(WidgetError::NoRuntime(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_after_fires_once() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);
        let handle = TaskHandle::after(Duration::from_secs(5), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();

        time::sleep(Duration::from_secs(4)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        handle.join().await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ticks_until_dropped() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);
        let handle = TaskHandle::interval(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            true
        })
        .unwrap();

        time::sleep(Duration::from_millis(3500)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        drop(handle);
        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_interval_ends_when_tick_returns_false() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);
        let handle = TaskHandle::interval(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst) + 1 < 2
        })
        .unwrap();

        time::sleep(Duration::from_secs(5)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
        handle.join().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_prevents_callback() {
        let count = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&count);
        let mut handle = TaskHandle::after(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
        .unwrap();
        handle.cancel();
        assert!(handle.is_finished());

        time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }
}
