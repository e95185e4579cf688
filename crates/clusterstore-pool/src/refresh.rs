//! Session refresh daemon.
//!
//! Drains the pending-close queue on a fixed tick, closes the expended
//! sessions, and creates cache-enabled replacements into the preparing
//! pool. Snapshotting the queue size before draining bounds one tick's
//! work even while `release()` keeps feeding the queue.

use std::sync::Arc;

use crate::pool::PoolInner;

/// Sessions eagerly created into the ready pool when a drain races a
/// concurrent consumer and finds the queue unexpectedly empty.
const RECOVERY_BATCH: usize = 100;

pub(crate) async fn run(inner: Arc<PoolInner>) {
    tracing::debug!(
        interval_ms = inner.config.refresh_interval.as_millis() as u64,
        "session refresh daemon started"
    );

    loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => break,
            _ = tokio::time::sleep(inner.config.refresh_interval) => {}
        }

        let expended = inner.pending_close.len();
        if expended == 0 {
            continue;
        }
        tracing::debug!(expended, "recycling expended sessions");

        let mut closed = 0;
        let mut raced = false;
        for _ in 0..expended {
            match inner.pending_close.pop() {
                Some(session) => {
                    if let Err(error) = inner.close_session(session).await {
                        tracing::warn!(%error, "failed to close expended session");
                    }
                    closed += 1;
                }
                None => {
                    raced = true;
                    break;
                }
            }
        }

        if raced {
            // Someone drained the queue under us (a concurrent stop,
            // most likely). Restock the ready pool eagerly instead of
            // stalling on the missing entries.
            tracing::warn!("pending-close queue emptied mid-drain, restocking ready pool");
            for _ in 0..RECOVERY_BATCH {
                match inner.create_session(true).await {
                    Ok(session) => inner.ready.push(session),
                    Err(error) => tracing::error!(%error, "failed to create recovery session"),
                }
            }
            continue;
        }

        // One unwarmed replacement per closed session; the warm-up
        // workers pick them up from preparing.
        for _ in 0..closed {
            match inner.create_session(true).await {
                Ok(session) => inner.preparing.push(session),
                Err(error) => tracing::error!(%error, "failed to create replacement session"),
            }
        }
    }

    tracing::debug!("session refresh daemon stopped");
}
