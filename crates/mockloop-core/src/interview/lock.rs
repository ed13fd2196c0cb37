//! Per-interview mutual exclusion.
//!
//! Each interview is single-writer: a turn or an end call holds the
//! interview's lock from the first read until the cache snapshot is queued.
//! An entry lives only while someone holds or waits for it.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

type LockMap = DashMap<i64, Arc<Mutex<()>>>;

/// Registry of per-interview async mutexes.
#[derive(Debug, Clone, Default)]
pub struct InterviewLocks {
    locks: Arc<LockMap>,
}

/// Exclusive access to one interview; released on drop.
///
/// Owned, so it can move into a stream or task that outlives the caller.
pub struct InterviewGuard {
    guard: Option<OwnedMutexGuard<()>>,
    interview_id: i64,
    locks: Arc<LockMap>,
}

impl InterviewLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `interview_id`.
    pub async fn acquire(&self, interview_id: i64) -> InterviewGuard {
        let lock = self
            .locks
            .entry(interview_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        InterviewGuard {
            guard: Some(lock.lock_owned().await),
            interview_id,
            locks: self.locks.clone(),
        }
    }

    #[cfg(test)]
    fn tracked(&self) -> usize {
        self.locks.len()
    }
}

impl Drop for InterviewGuard {
    fn drop(&mut self) {
        self.guard.take();
        // Waiters hold a clone of the mutex, so a count of one means the map
        // is the last owner.
        self.locks
            .remove_if(&self.interview_id, |_, lock| Arc::strong_count(lock) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_same_interview_is_exclusive() {
        let locks = InterviewLocks::new();
        let guard = locks.acquire(1).await;

        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _g = contender.acquire(1).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!waiting.is_finished());

        drop(guard);
        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test]
    async fn test_different_interviews_do_not_block() {
        let locks = InterviewLocks::new();
        let _a = locks.acquire(1).await;
        tokio::time::timeout(Duration::from_millis(200), locks.acquire(2))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_idle_entries_are_dropped() {
        let locks = InterviewLocks::new();
        drop(locks.acquire(1).await);
        assert_eq!(locks.tracked(), 0);

        let guard = locks.acquire(2).await;
        let contender = locks.clone();
        let waiting = tokio::spawn(async move {
            let _g = contender.acquire(2).await;
        });
        tokio::time::sleep(Duration::from_millis(50)).await;

        // The waiter still needs the entry.
        drop(guard);
        assert_eq!(locks.tracked(), 1);

        tokio::time::timeout(Duration::from_secs(1), waiting)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(locks.tracked(), 0);
    }
}
