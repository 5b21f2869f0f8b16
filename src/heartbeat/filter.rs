//! Heartbeat filtering: include/exclude lists and validity rules.
//!
//! Filtered heartbeats are dropped from the batch with a debug log line;
//! a dropped heartbeat that shadows a downloaded remote file has its
//! temporary file removed here, since no later stage will see it.

use std::path::Path;

use regex::Regex;
use tracing::{debug, warn};

use super::{Context, EntityType, Heartbeat, Stage};

/// Filtering configuration.
#[derive(Debug, Clone, Default)]
pub struct FilterConfig {
    pub exclude: Vec<Regex>,
    pub include: Vec<Regex>,
    /// Drop heartbeats whose project could not be detected.
    pub exclude_unknown_project: bool,
}

/// The filtering pipeline stage.
pub struct FilterStage {
    config: FilterConfig,
}

impl FilterStage {
    pub fn new(config: FilterConfig) -> Self {
        Self { config }
    }
}

impl Stage for FilterStage {
    fn name(&self) -> &'static str {
        "filtering"
    }

    fn process(&self, _ctx: &Context, batch: Vec<Heartbeat>) -> anyhow::Result<Vec<Heartbeat>> {
        let mut filtered = Vec::with_capacity(batch.len());

        for h in batch {
            match filter_reason(&h, &self.config) {
                None => filtered.push(h),
                Some(reason) => {
                    debug!("skipping heartbeat: {}", reason);

                    if h.local_file_needs_cleanup {
                        if let Some(local) = h.local_file.as_deref() {
                            if let Err(e) = std::fs::remove_file(local) {
                                warn!("unable to delete tmp file: {}", e);
                            }
                        }
                    }
                }
            }
        }

        Ok(filtered)
    }
}

/// Why a heartbeat should be skipped, or `None` to keep it.
fn filter_reason(h: &Heartbeat, config: &FilterConfig) -> Option<String> {
    // Exclude beats include.
    for pattern in &config.exclude {
        if pattern.is_match(&h.entity) {
            return Some(format!("filter by exclude pattern {:?}: {}", pattern.as_str(), h.entity));
        }
    }

    if !config.include.is_empty()
        && h.entity_type == EntityType::File
        && !config.include.iter().any(|p| p.is_match(&h.entity))
    {
        return Some(format!("filter by include patterns: {}", h.entity));
    }

    if config.exclude_unknown_project && h.project.as_deref().map_or(true, str::is_empty) {
        return Some("skipping because of unknown project".to_string());
    }

    // A file heartbeat must point at something on disk, unless the editor
    // marked it unsaved or it lives on a remote host.
    if h.entity_type == EntityType::File && !h.is_unsaved_entity && !h.is_remote() {
        let path = h.content_path();
        if !Path::new(path).exists() {
            return Some(format!("skipping because of non-existing file {:?}", path));
        }
    }

    None
}
