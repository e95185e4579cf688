//! Cache warm-up workers.
//!
//! Each worker blocks on the pool's wake signal instead of polling,
//! drains up to a batch of sessions from the preparing pool, fills
//! every not-full DTO type in their caches to capacity, and promotes
//! them into the ready pool. Cancellation mid-batch pushes the
//! un-promoted remainder back to preparing, so an interrupted cycle
//! never loses a session or leaves one in a corrupt state.

use std::sync::Arc;

use crate::pool::PoolInner;

pub(crate) async fn run(inner: Arc<PoolInner>, worker: usize) {
    tracing::debug!(worker, batch = inner.config.warmup_batch, "cache warm-up worker started");

    'outer: loop {
        tokio::select! {
            _ = inner.shutdown.cancelled() => break,
            _ = inner.warmup_wake.notified() => {}
        }

        // Keep draining until the preparing pool is empty, then go
        // back to waiting; coalesced wake-ups are covered by this
        // inner loop, excess ones find nothing and are harmless.
        loop {
            let mut batch = Vec::with_capacity(inner.config.warmup_batch);
            while batch.len() < inner.config.warmup_batch {
                match inner.preparing.pop() {
                    Some(session) => batch.push(session),
                    None => break,
                }
            }
            if batch.is_empty() {
                break;
            }
            tracing::trace!(worker, sessions = batch.len(), "warming session batch");

            let mut sessions = batch.into_iter();
            while let Some(mut session) = sessions.next() {
                if inner.shutdown.is_cancelled() {
                    inner.preparing.push(session);
                    for rest in sessions {
                        inner.preparing.push(rest);
                    }
                    tracing::debug!(worker, "warm-up interrupted, batch returned to preparing");
                    break 'outer;
                }

                if session.is_cache_full() {
                    inner.ready.push(session);
                    continue;
                }

                match session.warm_cache() {
                    Ok(created) => {
                        tracing::trace!(worker, created, "session cache populated");
                        inner.ready.push(session);
                    }
                    Err(error) => {
                        // Leave it partially warmed in preparing and
                        // stand down until the next wake; retrying
                        // immediately would spin against a failing
                        // store.
                        tracing::warn!(worker, %error, "cache warm-up failed, will retry later");
                        inner.preparing.push(session);
                        for rest in sessions {
                            inner.preparing.push(rest);
                        }
                        continue 'outer;
                    }
                }
            }
        }
    }

    tracing::debug!(worker, "cache warm-up worker stopped");
}
