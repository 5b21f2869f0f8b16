//! Pipeline composition for heartbeat processing.
//!
//! Stages run in a fixed order, each transforming the batch in place. A
//! stage may shrink the batch (filtering) or short-circuit by returning an
//! empty batch; the empty batch still flows through the remaining stages
//! and the transport treats it as a no-op. A fatal stage error aborts the
//! run, and the composer requeues the original inbound batch so no
//! heartbeat is lost to a stage failure.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use tracing::{debug, warn};

use super::{ApiResult, Heartbeat};

/// Cooperative cancellation shared across stages and the transport.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Per-invocation state threaded through every stage.
#[derive(Debug, Clone, Default)]
pub struct Context {
    pub cancel: CancelToken,
}

/// One transformation or filter in the pipeline.
pub trait Stage {
    /// Stage name used in log lines.
    fn name(&self) -> &'static str;

    /// Transform the batch. Per-heartbeat failures are logged and the item
    /// skipped; returning an error aborts the whole run.
    fn process(&self, ctx: &Context, batch: Vec<Heartbeat>) -> anyhow::Result<Vec<Heartbeat>>;
}

/// Terminal step of the pipeline: deliver the batch.
///
/// An empty batch is a no-op returning no results and no error.
pub trait Transport {
    fn send(&self, ctx: &Context, batch: Vec<Heartbeat>) -> anyhow::Result<Vec<ApiResult>>;
}

/// Durable fallback for heartbeats that could not be delivered.
pub trait Fallback {
    fn requeue(&self, hh: Vec<Heartbeat>) -> anyhow::Result<()>;
}

/// Given aligned batch and results, the heartbeats that must go back to the
/// queue: every non-2xx except 400 (malformed, logged and discarded), plus
/// the tail the server did not answer for.
pub fn requeue_candidates(batch: &[Heartbeat], results: &[ApiResult]) -> Vec<Heartbeat> {
    let mut requeue = Vec::new();

    for (n, result) in results.iter().enumerate() {
        if n >= batch.len() {
            warn!("results from api not matching heartbeats sent");
            break;
        }

        if result.status == 400 {
            match serde_json::to_string(&result.heartbeat) {
                Ok(serialized) => debug!("heartbeat result status bad request: {}", serialized),
                Err(e) => warn!("failed to json serialize heartbeat: {}", e),
            }
            continue;
        }

        if !result.is_success() {
            requeue.push(batch[n].clone());
        }
    }

    if results.len() < batch.len() {
        let leftovers = batch.len() - results.len();
        warn!("missing {} results from api", leftovers);
        requeue.extend_from_slice(&batch[results.len()..]);
    }

    requeue
}

/// The ordered sequence of stages ending in a transport.
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
    transport: Box<dyn Transport>,
    fallback: Option<Box<dyn Fallback>>,
}

impl Pipeline {
    pub fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            stages: Vec::new(),
            transport,
            fallback: None,
        }
    }

    /// Append a stage. Stages run in insertion order.
    pub fn stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    /// Install the durable fallback used on failed sends and fatal stage
    /// errors. Without one, undeliverable heartbeats are logged and lost.
    pub fn fallback(mut self, fallback: impl Fallback + 'static) -> Self {
        self.fallback = Some(Box::new(fallback));
        self
    }

    /// Run the batch through every stage and the transport.
    ///
    /// Ordering within the batch is preserved through every stage. On a
    /// fatal stage error the *original* inbound batch is requeued; on a
    /// failed send the batch as handed to the transport is requeued. A
    /// cancelled run aborts without touching the queue.
    pub fn run(&self, ctx: &Context, batch: Vec<Heartbeat>) -> anyhow::Result<Vec<ApiResult>> {
        let original = batch.clone();
        let mut batch = batch;

        for stage in &self.stages {
            if ctx.cancel.is_cancelled() {
                return Err(anyhow!("pipeline cancelled before stage {}", stage.name()));
            }

            debug!("execute stage {}", stage.name());

            batch = match stage.process(ctx, batch) {
                Ok(batch) => batch,
                Err(e) => {
                    warn!("stage {} failed: {}", stage.name(), e);
                    self.save(original);
                    return Err(e);
                }
            };
        }

        if ctx.cancel.is_cancelled() {
            return Err(anyhow!("pipeline cancelled before send"));
        }

        let sent = batch.clone();

        let results = match self.transport.send(ctx, batch) {
            Ok(results) => results,
            Err(e) => {
                // Auth and bad-request failures are final; everything else
                // is recoverable and the batch is kept for the next sync.
                let recoverable = e
                    .downcast_ref::<crate::api::Error>()
                    .map_or(true, |api_err| api_err.should_requeue());

                if recoverable {
                    debug!("pushing {} heartbeat(s) to queue after error: {}", sent.len(), e);
                    self.save(sent);
                }

                return Err(e);
            }
        };

        let requeue = requeue_candidates(&sent, &results);
        if !requeue.is_empty() {
            debug!("pushing {} heartbeat(s) with invalid result to queue", requeue.len());
            self.save(requeue);
        }

        Ok(results)
    }

    fn save(&self, hh: Vec<Heartbeat>) {
        if hh.is_empty() {
            return;
        }

        match &self.fallback {
            Some(fallback) => {
                if let Err(e) = fallback.requeue(hh) {
                    warn!("failed to requeue heartbeats: {}", e);
                }
            }
            None => match serde_json::to_string(&hh) {
                Ok(serialized) => warn!("no offline fallback, dropping heartbeats: {}", serialized),
                Err(e) => warn!("no offline fallback and serialization failed: {}", e),
            },
        }
    }
}
