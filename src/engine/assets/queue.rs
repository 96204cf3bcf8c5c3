// Deferred load queue
//
// Entries wait here until the game loop drains a budgeted slice of them.

use super::{AssetEntry, LoadState};
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Default number of entries uploaded per tick
const DEFAULT_MAX_ENTRIES: usize = 8;

/// Default upload time per tick
const DEFAULT_MAX_TIME: Duration = Duration::from_millis(4);

/// How much deferred work one tick may do
///
/// At least one entry is processed per drain, whatever the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadBudget {
    pub max_entries: Option<usize>,
    pub max_time: Option<Duration>,
}

impl LoadBudget {
    /// Process at most `count` entries
    pub fn entries(count: usize) -> Self {
        Self {
            max_entries: Some(count),
            max_time: None,
        }
    }

    /// Stop starting new entries after `limit`
    pub fn time(limit: Duration) -> Self {
        Self {
            max_entries: None,
            max_time: Some(limit),
        }
    }

    /// Drain everything
    pub fn unlimited() -> Self {
        Self {
            max_entries: None,
            max_time: None,
        }
    }

    pub(crate) fn exhausted(&self, processed: usize, started: Instant) -> bool {
        if processed == 0 {
            return false;
        }
        if self.max_entries.is_some_and(|max| processed >= max) {
            return true;
        }
        self.max_time.is_some_and(|max| started.elapsed() >= max)
    }
}

impl Default for LoadBudget {
    fn default() -> Self {
        Self {
            max_entries: Some(DEFAULT_MAX_ENTRIES),
            max_time: Some(DEFAULT_MAX_TIME),
        }
    }
}

/// FIFO of entries waiting for upload
///
/// Enqueuing marks the entry [`LoadState::Loading`]; an entry that is already
/// loading is not queued again.
#[derive(Debug, Default)]
pub struct DeferredLoadQueue {
    pending: VecDeque<Arc<AssetEntry>>,
}

impl DeferredLoadQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `entry`. Returns false if it was already pending.
    pub fn enqueue(&mut self, entry: &Arc<AssetEntry>) -> bool {
        {
            let mut state = entry.write();
            if state.load_state == LoadState::Loading {
                return false;
            }
            state.load_state = LoadState::Loading;
        }
        self.pending.push_back(Arc::clone(entry));
        true
    }

    pub fn pop(&mut self) -> Option<Arc<AssetEntry>> {
        self.pending.pop_front()
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Remove every pending entry, returning them in queue order
    pub fn clear(&mut self) -> Vec<Arc<AssetEntry>> {
        self.pending.drain(..).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::assets::{ResourceId, SpriteLayout};

    fn entry(name: &str) -> Arc<AssetEntry> {
        Arc::new(AssetEntry::new(
            ResourceId::parse(name),
            &SpriteLayout::single(),
            1.0,
        ))
    }

    #[test]
    fn test_enqueue_is_idempotent() {
        let mut queue = DeferredLoadQueue::new();
        let a = entry("a.png");

        assert!(queue.enqueue(&a));
        assert!(!queue.enqueue(&a));
        assert_eq!(queue.len(), 1);
        assert_eq!(a.load_state(), LoadState::Loading);
    }

    #[test]
    fn test_fifo_order() {
        let mut queue = DeferredLoadQueue::new();
        let a = entry("a.png");
        let b = entry("b.png");
        queue.enqueue(&a);
        queue.enqueue(&b);

        assert_eq!(queue.pop().unwrap().id(), a.id());
        assert_eq!(queue.pop().unwrap().id(), b.id());
        assert!(queue.pop().is_none());
    }

    #[test]
    fn test_clear_returns_pending() {
        let mut queue = DeferredLoadQueue::new();
        queue.enqueue(&entry("a.png"));
        queue.enqueue(&entry("b.png"));

        let drained = queue.clear();
        assert_eq!(drained.len(), 2);
        assert!(queue.is_empty());
    }

    #[test]
    fn test_budget_counts_entries() {
        let budget = LoadBudget::entries(2);
        let now = Instant::now();
        assert!(!budget.exhausted(0, now));
        assert!(!budget.exhausted(1, now));
        assert!(budget.exhausted(2, now));
    }

    #[test]
    fn test_budget_always_allows_one_entry() {
        let budget = LoadBudget::time(Duration::ZERO);
        let now = Instant::now();
        assert!(!budget.exhausted(0, now));
        assert!(budget.exhausted(1, now));
        assert!(!LoadBudget::unlimited().exhausted(1000, now));
    }
}
