//! Post-commit cache refresh worker.
//!
//! The durable commit is authoritative and synchronous; refreshing the
//! session cache is a separate, retryable side effect. Snapshots go to a
//! single background task over an `mpsc` channel and are written in the
//! order they were committed. Ending an interview queues a discard behind
//! its last snapshot. A full or closed queue drops the command with a
//! warning. The turn never waits for the cache.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use mockloop_types::session::SessionSnapshot;

use super::recovery::{discard_session, persist_snapshot};
use crate::cache::SessionCache;

/// Buffer size for the refresh queue.
const REFRESH_BUFFER: usize = 1024;

/// Base delay between write attempts; multiplied by the attempt number.
const RETRY_BACKOFF: Duration = Duration::from_millis(50);

/// TTLs and retry budget for cache refreshes.
#[derive(Debug, Clone, Copy)]
pub struct RefreshPolicy {
    pub history_ttl: Duration,
    pub user_index_ttl: Duration,
    pub attempts: u32,
}

enum RefreshCommand {
    Snapshot(Box<SessionSnapshot>),
    Discard(i64),
    Flush(oneshot::Sender<()>),
}

/// Handle to the background refresh worker. Cheap to clone.
#[derive(Clone)]
pub struct CacheRefresher {
    tx: mpsc::Sender<RefreshCommand>,
}

impl CacheRefresher {
    /// Start the worker on the current Tokio runtime.
    ///
    /// The worker exits once every handle has been dropped.
    pub fn spawn<C: SessionCache + 'static>(cache: Arc<C>, policy: RefreshPolicy) -> Self {
        let (tx, mut rx) = mpsc::channel(REFRESH_BUFFER);
        tokio::spawn(async move {
            while let Some(command) = rx.recv().await {
                match command {
                    RefreshCommand::Snapshot(snapshot) => {
                        write_with_retry(cache.as_ref(), &snapshot, &policy).await;
                    }
                    RefreshCommand::Discard(interview_id) => {
                        match discard_session(cache.as_ref(), interview_id).await {
                            Ok(()) => debug!(interview_id, "session cache discarded"),
                            Err(e) => warn!(
                                interview_id,
                                error = %e,
                                "session cache discard failed; entries expire by TTL"
                            ),
                        }
                    }
                    RefreshCommand::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
            debug!("cache refresh worker stopped");
        });
        Self { tx }
    }

    /// Queue a snapshot without waiting.
    pub fn enqueue(&self, snapshot: SessionSnapshot) {
        let interview_id = snapshot.interview_id;
        self.send(interview_id, RefreshCommand::Snapshot(Box::new(snapshot)));
    }

    /// Queue removal of an interview's cached session.
    pub fn discard(&self, interview_id: i64) {
        self.send(interview_id, RefreshCommand::Discard(interview_id));
    }

    fn send(&self, interview_id: i64, command: RefreshCommand) {
        if let Err(e) = self.tx.try_send(command) {
            let reason = match e {
                mpsc::error::TrySendError::Full(_) => "queue full",
                mpsc::error::TrySendError::Closed(_) => "worker stopped",
            };
            warn!(interview_id, reason, "dropping session cache refresh");
        }
    }

    /// Wait until every snapshot queued before this call has been handled.
    pub async fn flush(&self) {
        let (done_tx, done_rx) = oneshot::channel();
        if self.tx.send(RefreshCommand::Flush(done_tx)).await.is_ok() {
            let _ = done_rx.await;
        }
    }
}

async fn write_with_retry<C: SessionCache>(
    cache: &C,
    snapshot: &SessionSnapshot,
    policy: &RefreshPolicy,
) {
    let attempts = policy.attempts.max(1);
    for attempt in 1..=attempts {
        match persist_snapshot(cache, snapshot, policy.history_ttl, policy.user_index_ttl).await {
            Ok(()) => {
                debug!(
                    interview_id = snapshot.interview_id,
                    messages = snapshot.messages.len(),
                    "session cache refreshed"
                );
                return;
            }
            Err(e) if attempt < attempts => {
                debug!(
                    interview_id = snapshot.interview_id,
                    attempt,
                    error = %e,
                    "session cache write failed; retrying"
                );
                tokio::time::sleep(RETRY_BACKOFF * attempt).await;
            }
            Err(e) => {
                warn!(
                    interview_id = snapshot.interview_id,
                    attempts,
                    error = %e,
                    "session cache write failed; giving up"
                );
            }
        }
    }
}
