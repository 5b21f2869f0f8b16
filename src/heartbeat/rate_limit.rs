//! Rate-limit gate.
//!
//! On non-sync invocations, a send is only allowed once per configured
//! window; inside the window the inbound batch diverts to the offline
//! queue and the remaining pipeline sees an empty batch. A window of zero
//! disables the gate.

use std::path::PathBuf;

use chrono::Utc;
use tracing::debug;

use super::{Context, Heartbeat, Stage};
use crate::config::StateFile;

/// The rate-limit pipeline stage.
pub struct RateLimitStage {
    rate_limit_secs: u64,
    state: StateFile,
    queue_path: PathBuf,
}

impl RateLimitStage {
    pub fn new(rate_limit_secs: u64, state: StateFile, queue_path: PathBuf) -> Self {
        Self {
            rate_limit_secs,
            state,
            queue_path,
        }
    }

    fn rate_limited(&self) -> bool {
        if self.rate_limit_secs == 0 {
            return false;
        }

        let Some(last_sent_at) = self.state.read().last_sent_at else {
            return false;
        };

        let elapsed = Utc::now().signed_duration_since(last_sent_at.with_timezone(&Utc));
        elapsed.num_seconds() >= 0 && (elapsed.num_seconds() as u64) < self.rate_limit_secs
    }
}

impl Stage for RateLimitStage {
    fn name(&self) -> &'static str {
        "rate limiting"
    }

    fn process(&self, _ctx: &Context, batch: Vec<Heartbeat>) -> anyhow::Result<Vec<Heartbeat>> {
        if batch.is_empty() || !self.rate_limited() {
            return Ok(batch);
        }

        debug!("rate limited, enqueueing {} heartbeat(s) instead of sending", batch.len());

        crate::offline::push_with_retry(&self.queue_path, &batch)?;

        Ok(Vec::new())
    }
}
