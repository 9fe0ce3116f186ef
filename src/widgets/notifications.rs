//! Notification center.
//!
//! A single queue of toasts shared by every page. The center is created once
//! by the host and handed around as a cheap clone; all clones see the same
//! queue. Each toast with a duration schedules its own dismissal when it is
//! added.

use super::timer::TaskHandle;
use super::generate_id;
use chrono::{DateTime, Utc};
use log::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use tokio::time::Instant;

const DEFAULT_MAX_NOTIFICATIONS: usize = 5;
const DEFAULT_DURATION: Duration = Duration::from_millis(5000);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Success,
    Error,
    Warning,
    Info,
}

/// Screen corner (or edge centre) where toasts stack.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ToastPosition {
    TopLeft,
    #[default]
    TopRight,
    BottomLeft,
    BottomRight,
    TopCenter,
    BottomCenter,
}

impl ToastPosition {
    pub fn is_top(&self) -> bool {
        matches!(
            self,
            ToastPosition::TopLeft | ToastPosition::TopRight | ToastPosition::TopCenter
        )
    }
}

/// A queued toast.
///
#[derive(Debug, Clone)]
pub struct Notification {
    pub id: String,
    pub severity: Severity,
    pub title: String,
    pub message: Option<String>,
    /// Auto-dismiss delay; `None` keeps the toast until dismissed.
    pub duration: Option<Duration>,
    pub action: Option<String>,
    pub created_at: DateTime<Utc>,
    created: Instant,
}

impl Notification {
    pub fn new(severity: Severity, title: impl Into<String>) -> Self {
        Notification {
            id: String::new(),
            severity,
            title: title.into(),
            message: None,
            duration: Some(DEFAULT_DURATION),
            action: None,
            created_at: Utc::now(),
            created: Instant::now(),
        }
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn duration(mut self, duration: Duration) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn persistent(mut self) -> Self {
        self.duration = None;
        self
    }

    pub fn action(mut self, label: impl Into<String>) -> Self {
        self.action = Some(label.into());
        self
    }

    pub fn is_persistent(&self) -> bool {
        self.duration.is_none()
    }

    /// Share of the display time still left, from 1.0 down to 0.0. `None`
    /// for persistent toasts.
    ///
    pub fn remaining_fraction(&self, now: Instant) -> Option<f64> {
        let duration = self.duration?;
        if duration.is_zero() {
            return Some(0.0);
        }
        let elapsed = now.saturating_duration_since(self.created);
        let remaining = duration.saturating_sub(elapsed);
        Some(remaining.as_secs_f64() / duration.as_secs_f64())
    }
}

#[derive(Debug, Clone)]
pub struct NotificationConfig {
    pub max: usize,
    pub position: ToastPosition,
    pub default_duration: Duration,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        NotificationConfig {
            max: DEFAULT_MAX_NOTIFICATIONS,
            position: ToastPosition::default(),
            default_duration: DEFAULT_DURATION,
        }
    }
}

#[derive(Debug)]
struct Queue {
    notifications: Vec<Notification>,
    timers: HashMap<String, TaskHandle>,
    config: NotificationConfig,
}

/// Shared toast queue.
///
#[derive(Debug, Clone)]
pub struct NotificationCenter {
    inner: Arc<Mutex<Queue>>,
}

impl NotificationCenter {
    pub fn new(config: NotificationConfig) -> Self {
        NotificationCenter {
            inner: Arc::new(Mutex::new(Queue {
                notifications: vec![],
                timers: HashMap::new(),
                config,
            })),
        }
    }

    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue a notification at the front and return its identifier. The
    /// oldest entries beyond the configured maximum are dropped.
    ///
    pub fn add(&self, mut notification: Notification) -> String {
        let id = generate_id();
        notification.id = id.clone();
        notification.created_at = Utc::now();
        notification.created = Instant::now();

        let timer = notification.duration.and_then(|duration| {
            let center = Arc::downgrade(&self.inner);
            let timer_id = id.clone();
            match TaskHandle::after(duration, move || dismiss(&center, &timer_id)) {
                Ok(handle) => Some(handle),
                Err(e) => {
                    warn!("Notification '{}' will not auto-dismiss: {}", notification.title, e);
                    None
                }
            }
        });

        // Dropped entries must release their timers only after the lock is
        // released, so collect them first.
        let dropped = {
            let mut queue = self.queue();
            debug!("Queueing {:?} notification '{}'", notification.severity, notification.title);
            queue.notifications.insert(0, notification);
            if let Some(timer) = timer {
                queue.timers.insert(id.clone(), timer);
            }
            let max = queue.config.max;
            let excess: Vec<Notification> = if queue.notifications.len() > max {
                queue.notifications.split_off(max)
            } else {
                vec![]
            };
            excess
                .iter()
                .filter_map(|n| queue.timers.remove(&n.id))
                .collect::<Vec<TaskHandle>>()
        };
        drop(dropped);
        id
    }

    /// Dismiss one notification. Other toasts keep their timers.
    ///
    pub fn remove(&self, id: &str) -> bool {
        let (removed, timer) = {
            let mut queue = self.queue();
            let before = queue.notifications.len();
            queue.notifications.retain(|n| n.id != id);
            let removed = queue.notifications.len() != before;
            (removed, queue.timers.remove(id))
        };
        drop(timer);
        removed
    }

    pub fn clear(&self) {
        let timers: Vec<TaskHandle> = {
            let mut queue = self.queue();
            queue.notifications.clear();
            queue.timers.drain().map(|(_, timer)| timer).collect()
        };
        drop(timers);
    }

    /// Snapshot of the queue, newest first.
    ///
    pub fn notifications(&self) -> Vec<Notification> {
        self.queue().notifications.clone()
    }

    pub fn len(&self) -> usize {
        self.queue().notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn position(&self) -> ToastPosition {
        self.queue().config.position
    }

    fn default_duration(&self) -> Duration {
        self.queue().config.default_duration
    }

    pub fn success(&self, title: impl Into<String>, message: Option<String>) -> String {
        self.add_with_default(Severity::Success, title, message)
    }

    pub fn info(&self, title: impl Into<String>, message: Option<String>) -> String {
        self.add_with_default(Severity::Info, title, message)
    }

    pub fn warning(&self, title: impl Into<String>, message: Option<String>) -> String {
        self.add_with_default(Severity::Warning, title, message)
    }

    /// Errors stay on screen until dismissed.
    ///
    pub fn error(&self, title: impl Into<String>, message: Option<String>) -> String {
        let mut notification = Notification::new(Severity::Error, title).persistent();
        notification.message = message;
        self.add(notification)
    }

    fn add_with_default(&self, severity: Severity, title: impl Into<String>, message: Option<String>) -> String {
        let mut notification = Notification::new(severity, title).duration(self.default_duration());
        notification.message = message;
        self.add(notification)
    }
}

impl Default for NotificationCenter {
    fn default() -> Self {
        NotificationCenter::new(NotificationConfig::default())
    }
}

fn dismiss(center: &Weak<Mutex<Queue>>, id: &str) {
    let Some(inner) = center.upgrade() else {
        return;
    };
    // The running timer is this very task, so keep its handle out of the drop
    // path until the lock is released.
    let timer = {
        let mut queue = inner.lock().unwrap_or_else(PoisonError::into_inner);
        queue.notifications.retain(|n| n.id != id);
        queue.timers.remove(id)
    };
    debug!("Auto-dismissed notification {}", id);
    if let Some(mut timer) = timer {
        timer.detach();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn manual_center(max: usize) -> NotificationCenter {
        NotificationCenter::new(NotificationConfig {
            max,
            ..NotificationConfig::default()
        })
    }

    fn titles(center: &NotificationCenter) -> Vec<String> {
        center.notifications().into_iter().map(|n| n.title).collect()
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_is_capped_newest_first() {
        let center = manual_center(3);
        for i in 0..4 {
            center.add(Notification::new(Severity::Info, format!("n{}", i)).persistent());
        }
        assert_eq!(center.len(), 3);
        assert_eq!(titles(&center), vec!["n3", "n2", "n1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_auto_dismiss_after_duration() {
        let center = manual_center(5);
        center.add(Notification::new(Severity::Success, "saved").duration(Duration::from_secs(2)));
        center.add(Notification::new(Severity::Info, "sticky").persistent());

        tokio::time::sleep(Duration::from_millis(1900)).await;
        assert_eq!(center.len(), 2);
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(titles(&center), vec!["sticky"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_removing_one_keeps_other_timers() {
        let center = manual_center(5);
        let first = center.add(Notification::new(Severity::Info, "a").duration(Duration::from_secs(3)));
        center.add(Notification::new(Severity::Info, "b").duration(Duration::from_secs(1)));
        center.add(Notification::new(Severity::Info, "c").duration(Duration::from_secs(2)));

        assert!(center.remove(&first));
        assert!(!center.remove(&first));
        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(titles(&center), vec!["c"]);
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert!(center.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_error_convenience_is_persistent() {
        let center = manual_center(5);
        center.error("Payment failed", Some("Card declined".to_string()));
        center.success("Saved", None);

        let queue = center.notifications();
        assert_eq!(queue[0].severity, Severity::Success);
        assert_eq!(queue[0].duration, Some(DEFAULT_DURATION));
        assert!(queue[1].is_persistent());
        assert_eq!(queue[1].message.as_deref(), Some("Card declined"));

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(titles(&center), vec!["Payment failed"]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_remaining_fraction_shrinks() {
        let center = manual_center(5);
        center.add(Notification::new(Severity::Warning, "w").duration(Duration::from_secs(4)));
        center.add(Notification::new(Severity::Warning, "p").persistent());
        tokio::time::sleep(Duration::from_secs(1)).await;

        let queue = center.notifications();
        let now = Instant::now();
        assert_eq!(queue[0].remaining_fraction(now), None);
        let fraction = queue[1].remaining_fraction(now).unwrap();
        assert!((fraction - 0.75).abs() < 1e-9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_and_shared_clones() {
        let center = manual_center(5);
        let page = center.clone();
        page.warning("Quota", Some("80% used".to_string()));
        assert_eq!(center.len(), 1);
        center.clear();
        assert!(page.is_empty());
    }

    #[test]
    fn test_position_parsing() {
        let position: ToastPosition = serde_yaml::from_str("bottom-left").unwrap();
        assert_eq!(position, ToastPosition::BottomLeft);
        assert!(!position.is_top());
        assert!(ToastPosition::default().is_top());
    }

    #[test]
    fn test_add_without_runtime_keeps_toast() {
        let center = manual_center(5);
        center.info("offline", None);
        assert_eq!(center.len(), 1);
    }
}
