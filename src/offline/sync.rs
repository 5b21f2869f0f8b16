//! Synchronisation of queued heartbeats into the API.
//!
//! Pops bounded windows off the queue and feeds them to the transport,
//! reusing the same per-item result rules as the live pipeline. A failed
//! send puts the in-flight window back before the error propagates.

use std::path::Path;

use anyhow::anyhow;
use tracing::{debug, warn};

use super::{push_with_retry, Queue, SEND_LIMIT};
use crate::heartbeat::{requeue_candidates, Context, Transport};

/// Drain the queue into the transport, at most `sync_max` heartbeats
/// (`0` = unbounded). Returns the number of heartbeats handed to the
/// transport.
pub fn run(
    ctx: &Context,
    queue_path: &Path,
    sync_max: usize,
    transport: &dyn Transport,
) -> anyhow::Result<usize> {
    let mut sent_total = 0usize;
    let mut run = 0usize;

    loop {
        run += 1;

        if ctx.cancel.is_cancelled() {
            return Err(anyhow!("sync cancelled"));
        }

        if sync_max > 0 && sent_total >= sync_max {
            break;
        }

        let mut chunk = SEND_LIMIT;
        if sync_max > 0 && sent_total + SEND_LIMIT > sync_max {
            chunk = sync_max - sent_total;
        }

        let batch = Queue::open(queue_path)?.pop_many(chunk)?;

        if batch.is_empty() {
            debug!("no queued heartbeats ready for sending");
            break;
        }

        debug!("send {} heartbeats on sync run {}", batch.len(), run);

        let results = match transport.send(ctx, batch.clone()) {
            Ok(results) => results,
            Err(e) => {
                if let Err(requeue_err) = push_with_retry(queue_path, &batch) {
                    warn!("failed to push heartbeats to queue after api error: {}", requeue_err);
                }

                return Err(e);
            }
        };

        let requeue = requeue_candidates(&batch, &results);
        if !requeue.is_empty() {
            debug!("pushing {} heartbeat(s) with invalid result to queue", requeue.len());

            if let Err(e) = push_with_retry(queue_path, &requeue) {
                warn!("failed to push heartbeats with invalid status to queue: {}", e);
            }
        }

        sent_total += batch.len();
    }

    Ok(sent_total)
}
