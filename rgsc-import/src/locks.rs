//! Per-(user, chart) exclusion
//!
//! Everything that reads or writes a pair's score set or personal best
//! (storing a score, the session pre-image read, consolidation, deletion)
//! runs while holding the pair's [`PairGuard`]. Different pairs never wait
//! on each other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::OwnedMutexGuard;

/// One (user, chart) pair
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    pub user_id: i64,
    pub chart_id: String,
}

type Slot = Arc<tokio::sync::Mutex<()>>;

/// Registry of per-pair async mutexes
///
/// Slots are created on demand and pruned once nobody holds or waits on
/// them, so the map only tracks pairs with work in flight.
#[derive(Debug, Default)]
pub struct PairLocks {
    slots: Mutex<HashMap<PairKey, Slot>>,
}

/// Exclusive access to one pair; released on drop
#[derive(Debug)]
pub struct PairGuard {
    key: PairKey,
    _guard: OwnedMutexGuard<()>,
}

impl PairGuard {
    pub fn user_id(&self) -> i64 {
        self.key.user_id
    }

    pub fn chart_id(&self) -> &str {
        &self.key.chart_id
    }

    /// True if this guard covers the given pair
    pub fn covers(&self, user_id: i64, chart_id: &str) -> bool {
        self.key.user_id == user_id && self.key.chart_id == chart_id
    }
}

impl PairLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a pair
    pub async fn acquire(&self, user_id: i64, chart_id: &str) -> PairGuard {
        let key = PairKey {
            user_id,
            chart_id: chart_id.to_string(),
        };

        let slot = {
            // Poison-tolerant: entries are plain Arc handles
            let mut slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
            slots.retain(|_, slot| Arc::strong_count(slot) > 1);
            slots.entry(key.clone()).or_default().clone()
        };

        let guard = slot.lock_owned().await;
        PairGuard { key, _guard: guard }
    }

    /// Number of pairs currently tracked
    pub fn tracked_pairs(&self) -> usize {
        let slots = self.slots.lock().unwrap_or_else(PoisonError::into_inner);
        slots
            .values()
            .filter(|slot| Arc::strong_count(slot) > 1)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_pair_is_exclusive() {
        let locks = Arc::new(PairLocks::new());
        let guard = locks.acquire(1, "chart-a").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.acquire(1, "chart-a").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!waiter.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_pairs_do_not_block() {
        let locks = PairLocks::new();
        let _a = locks.acquire(1, "chart-a").await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.acquire(1, "chart-b"))
            .await
            .unwrap();
        let _c = tokio::time::timeout(Duration::from_secs(1), locks.acquire(2, "chart-a"))
            .await
            .unwrap();
        assert_eq!(locks.tracked_pairs(), 3);
    }

    #[tokio::test]
    async fn test_released_pairs_are_pruned() {
        let locks = PairLocks::new();
        {
            let guard = locks.acquire(7, "chart-x").await;
            assert!(guard.covers(7, "chart-x"));
            assert!(!guard.covers(7, "chart-y"));
        }
        assert_eq!(locks.tracked_pairs(), 0);

        let _next = locks.acquire(8, "chart-y").await;
        assert_eq!(locks.slots.lock().unwrap().len(), 1);
    }
}
