/// Recurring draft auto-save tasks.
///
/// Each item with a live draft may own one task. Tasks do not run on their
/// own: the host's event loop polls [`AutoSaveScheduler::take_due`] and the
/// store applies the returned ticks. Cancelling a task removes it from the
/// scheduler immediately, so a cancelled task can never tick again.
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Floor applied to task intervals so a zero interval cannot spin.
const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// A scheduled auto-save for one item's draft.
///
/// Content and author are captured when the task is scheduled and replayed
/// on every tick.
#[derive(Debug, Clone)]
struct AutoSaveTask {
    content: String,
    author: String,
    interval: Duration,
    next_due: Instant,
}

/// One due tick, handed back to the store for execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoSaveTick {
    pub item_id: String,
    pub content: String,
    pub author: String,
}

/// Owns every pending auto-save task, keyed by item id.
#[derive(Debug, Default)]
pub struct AutoSaveScheduler {
    tasks: HashMap<String, AutoSaveTask>,
}

impl AutoSaveScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Schedules a recurring task for `item_id`, first due at `now + interval`.
    ///
    /// Any existing task for the item is cancelled first. Returns true if one
    /// was replaced.
    pub fn schedule(
        &mut self,
        item_id: &str,
        content: String,
        author: String,
        interval: Duration,
        now: Instant,
    ) -> bool {
        let replaced = self.cancel(item_id);
        let interval = interval.max(MIN_INTERVAL);
        self.tasks.insert(
            item_id.to_string(),
            AutoSaveTask {
                content,
                author,
                interval,
                next_due: now + interval,
            },
        );
        replaced
    }

    /// Cancels the task for `item_id`. Returns false if none was scheduled.
    pub fn cancel(&mut self, item_id: &str) -> bool {
        self.tasks.remove(item_id).is_some()
    }

    /// Cancels every task. Returns how many were pending.
    pub fn cancel_all(&mut self) -> usize {
        let count = self.tasks.len();
        self.tasks.clear();
        count
    }

    pub fn is_scheduled(&self, item_id: &str) -> bool {
        self.tasks.contains_key(item_id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Earliest instant at which any task becomes due.
    pub fn next_due(&self) -> Option<Instant> {
        self.tasks.values().map(|t| t.next_due).min()
    }

    /// Collects every task due at `now` and advances it to its next slot.
    ///
    /// A task that missed several intervals fires once. Ticks are returned
    /// in item id order.
    pub fn take_due(&mut self, now: Instant) -> Vec<AutoSaveTick> {
        let mut due = Vec::new();
        for (item_id, task) in &mut self.tasks {
            if task.next_due > now {
                continue;
            }
            while task.next_due <= now {
                task.next_due += task.interval;
            }
            due.push(AutoSaveTick {
                item_id: item_id.clone(),
                content: task.content.clone(),
                author: task.author.clone(),
            });
        }
        due.sort_by(|a, b| a.item_id.cmp(&b.item_id));
        due
    }
}
