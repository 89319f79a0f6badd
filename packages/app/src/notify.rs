//! Transient user-facing notifications ("toasts").
//!
//! Every user action reports its outcome here. Toasts leave the queue when
//! dismissed or once their time-to-live has passed; expiry is evaluated
//! against an instant supplied by the caller so headless front ends and
//! tests control the clock.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// How long a toast stays visible unless dismissed earlier.
pub const DEFAULT_TOAST_TTL: Duration = Duration::from_secs(5);

/// Visual category of a toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToastKind {
    /// An action completed.
    Success,
    /// An action failed.
    Error,
    /// Guidance, e.g. a sign-in prompt.
    Info,
}

/// Identifier of a pushed toast.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ToastId(u64);

/// One notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toast {
    /// Queue-assigned identifier.
    pub id: ToastId,
    /// Success, error or info.
    pub kind: ToastKind,
    /// Short headline.
    pub title: String,
    /// Optional detail, usually the backend's message.
    pub description: Option<String>,
    /// When the toast was pushed; expiry counts from here.
    pub created_at: Instant,
}

#[derive(Debug, Default)]
struct Queue {
    next_id: u64,
    toasts: Vec<Toast>,
}

/// Shared toast queue. Clones share the same queue.
#[derive(Debug, Clone)]
pub struct Notifications {
    queue: Arc<Mutex<Queue>>,
    ttl: Duration,
}

impl Default for Notifications {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifications {
    /// Creates a queue with [`DEFAULT_TOAST_TTL`].
    #[must_use]
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TOAST_TTL)
    }

    /// Creates a queue whose toasts expire after `ttl`.
    #[must_use]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            queue: Arc::new(Mutex::new(Queue::default())),
            ttl,
        }
    }

    fn queue(&self) -> MutexGuard<'_, Queue> {
        self.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Pushes a toast created at `now`.
    pub fn push_at(
        &self,
        kind: ToastKind,
        title: &str,
        description: Option<&str>,
        now: Instant,
    ) -> ToastId {
        let mut queue = self.queue();
        queue.next_id += 1;
        let id = ToastId(queue.next_id);
        queue.toasts.push(Toast {
            id,
            kind,
            title: title.to_string(),
            description: description.map(str::to_string),
            created_at: now,
        });
        id
    }

    /// Pushes a toast created now.
    pub fn push(&self, kind: ToastKind, title: &str, description: Option<&str>) -> ToastId {
        self.push_at(kind, title, description, Instant::now())
    }

    /// Pushes a success toast.
    pub fn success(&self, title: &str, description: Option<&str>) -> ToastId {
        self.push(ToastKind::Success, title, description)
    }

    /// Pushes an error toast.
    pub fn error(&self, title: &str, description: Option<&str>) -> ToastId {
        self.push(ToastKind::Error, title, description)
    }

    /// Pushes an info toast.
    pub fn info(&self, title: &str, description: Option<&str>) -> ToastId {
        self.push(ToastKind::Info, title, description)
    }

    /// Removes one toast. Returns `false` if it was already gone.
    pub fn dismiss(&self, id: ToastId) -> bool {
        let mut queue = self.queue();
        let before = queue.toasts.len();
        queue.toasts.retain(|t| t.id != id);
        queue.toasts.len() != before
    }

    /// Drops every toast whose time-to-live has passed at `now` and returns
    /// the remaining ones, oldest first.
    pub fn active(&self, now: Instant) -> Vec<Toast> {
        let ttl = self.ttl;
        let mut queue = self.queue();
        queue
            .toasts
            .retain(|t| now.saturating_duration_since(t.created_at) < ttl);
        queue.toasts.clone()
    }

    /// Removes and returns every queued toast, oldest first.
    pub fn drain(&self) -> Vec<Toast> {
        std::mem::take(&mut self.queue().toasts)
    }

    /// All queued toasts without expiring any.
    #[must_use]
    pub fn snapshot(&self) -> Vec<Toast> {
        self.queue().toasts.clone()
    }

    /// The most recently pushed toast still queued.
    #[must_use]
    pub fn last(&self) -> Option<Toast> {
        self.queue().toasts.last().cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn toasts_expire_after_ttl() {
        let toasts = Notifications::with_ttl(Duration::from_secs(5));
        let start = Instant::now();
        toasts.push_at(ToastKind::Success, "first", None, start);
        toasts.push_at(
            ToastKind::Error,
            "second",
            Some("detail"),
            start + Duration::from_secs(3),
        );

        assert_eq!(toasts.active(start + Duration::from_secs(4)).len(), 2);

        let remaining = toasts.active(start + Duration::from_secs(5));
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].title, "second");
        assert_eq!(remaining[0].description.as_deref(), Some("detail"));

        assert!(toasts.active(start + Duration::from_secs(8)).is_empty());
    }

    #[test]
    fn dismiss_removes_only_that_toast() {
        let toasts = Notifications::new();
        let a = toasts.info("a", None);
        let b = toasts.info("b", None);
        assert_ne!(a, b);
        assert!(toasts.dismiss(a));
        assert!(!toasts.dismiss(a));
        let left: Vec<_> = toasts.snapshot().into_iter().map(|t| t.id).collect();
        assert_eq!(left, vec![b]);
    }

    #[test]
    fn clones_share_the_queue() {
        let toasts = Notifications::new();
        let producer = toasts.clone();
        producer.error("Sign in failed", Some("Invalid login credentials"));
        let last = toasts.last().unwrap();
        assert_eq!(last.kind, ToastKind::Error);
        assert_eq!(toasts.drain().len(), 1);
        assert!(producer.snapshot().is_empty());
    }
}
