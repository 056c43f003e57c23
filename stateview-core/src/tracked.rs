use std::fmt;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::watch;

use crate::model::{FileMap, TodoList};

pub trait Clock: fmt::Debug + Send + Sync {
    /// Wall-clock time in epoch milliseconds.
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedSnapshot<T> {
    pub value: T,
    /// Epoch milliseconds of the last real change; 0 until the first one.
    pub last_updated_at: i64,
}

pub type Equality<T> = fn(&T, &T) -> bool;

/// A value plus the time it last changed.
///
/// Writes go through [`TrackedValue::update`] and [`TrackedValue::reset`],
/// both of which are no-ops when the incoming value equals the current one
/// under the store's equality. Readers get an [`Arc`] snapshot that keeps its
/// identity until the contents change, or subscribe to change notifications.
pub struct TrackedValue<T> {
    sender: Arc<watch::Sender<Arc<TrackedSnapshot<T>>>>,
    empty: fn() -> T,
    is_equal: Equality<T>,
    clock: Arc<dyn Clock>,
}

impl<T> TrackedValue<T> {
    pub fn new(empty: fn() -> T, is_equal: Equality<T>, clock: Arc<dyn Clock>) -> Self {
        let (sender, _) = watch::channel(Arc::new(TrackedSnapshot {
            value: empty(),
            last_updated_at: 0,
        }));

        Self {
            sender: Arc::new(sender),
            empty,
            is_equal,
            clock,
        }
    }

    /// Replaces the value if it differs from the current one. Returns whether
    /// anything changed.
    pub fn update(&self, next: T) -> bool {
        let is_equal = self.is_equal;
        let clock = &self.clock;

        self.sender.send_if_modified(|current| {
            if is_equal(&current.value, &next) {
                return false;
            }

            // Coarse clocks can repeat a millisecond; the timestamp must still move.
            let last_updated_at = clock
                .now_millis()
                .max(current.last_updated_at.saturating_add(1));
            *current = Arc::new(TrackedSnapshot {
                value: next,
                last_updated_at,
            });
            true
        })
    }

    pub fn reset(&self) -> bool {
        self.update((self.empty)())
    }

    pub fn snapshot(&self) -> Arc<TrackedSnapshot<T>> {
        Arc::clone(&self.sender.borrow())
    }

    pub fn last_updated_at(&self) -> i64 {
        self.sender.borrow().last_updated_at
    }

    pub fn subscribe(&self) -> watch::Receiver<Arc<TrackedSnapshot<T>>> {
        self.sender.subscribe()
    }
}

impl<T> Clone for TrackedValue<T> {
    fn clone(&self) -> Self {
        Self {
            sender: Arc::clone(&self.sender),
            empty: self.empty,
            is_equal: self.is_equal,
            clock: Arc::clone(&self.clock),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for TrackedValue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TrackedValue")
            .field("snapshot", &*self.sender.borrow())
            .finish_non_exhaustive()
    }
}

/// Same length and the same content and status at every position.
pub fn todos_equal(left: &TodoList, right: &TodoList) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .zip(right)
            .all(|(a, b)| a.content == b.content && a.status == b.status)
}

/// Same number of entries and every name maps to the same content.
pub fn files_equal(left: &FileMap, right: &FileMap) -> bool {
    left.len() == right.len()
        && left
            .iter()
            .all(|(name, content)| right.get(name) == Some(content))
}
