//! Path canonicalisation and user-agent assignment.
//!
//! Entities become absolute with symlinks resolved when the file exists;
//! already-canonical paths pass through unchanged, so the stage is
//! idempotent. Windows paths get forward separators normalised the way
//! the backend expects.

use std::path::Path;

use tracing::debug;

use super::{user_agent, Context, EntityType, Heartbeat, Stage};

/// The formatting pipeline stage.
pub struct FormatStage {
    user_agent: String,
}

impl FormatStage {
    /// `plugin` is the opaque caller-supplied plugin string.
    pub fn new(plugin: &str) -> Self {
        Self {
            user_agent: user_agent(plugin),
        }
    }
}

impl Stage for FormatStage {
    fn name(&self) -> &'static str {
        "formatting"
    }

    fn process(&self, _ctx: &Context, mut batch: Vec<Heartbeat>) -> anyhow::Result<Vec<Heartbeat>> {
        for h in &mut batch {
            if h.user_agent.is_empty() {
                h.user_agent = self.user_agent.clone();
            }

            if h.entity_type == EntityType::File && !h.is_remote() {
                h.entity = canonical_path(&h.entity, h.is_unsaved_entity);
            }

            if let Some(local) = h.local_file.as_deref().filter(|l| !l.is_empty()) {
                h.local_file = Some(canonical_path(local, false));
            }

            h.project_path = h.project_path.take().map(|p| with_trailing_separator(&p));
            h.project_path_override = h
                .project_path_override
                .take()
                .map(|p| with_trailing_separator(&p));
        }

        Ok(batch)
    }
}

/// Absolute form of a path, symlinks resolved when it exists on disk.
fn canonical_path(path: &str, unsaved: bool) -> String {
    let p = Path::new(path);

    if !unsaved {
        if let Ok(resolved) = p.canonicalize() {
            return normalize_separators(&resolved);
        }
    }

    if p.is_absolute() {
        return path.to_string();
    }

    match std::env::current_dir() {
        Ok(cwd) => normalize_separators(&cwd.join(p)),
        Err(e) => {
            debug!("failed to resolve current directory: {}", e);
            path.to_string()
        }
    }
}

#[cfg(windows)]
fn normalize_separators(path: &Path) -> String {
    // Strip the verbatim prefix canonicalize() adds and use forward
    // slashes, which the backend treats as canonical on all platforms.
    let s = path.to_string_lossy().to_string();
    let s = s.strip_prefix(r"\\?\").unwrap_or(&s).to_string();
    s.replace('\\', "/")
}

#[cfg(not(windows))]
fn normalize_separators(path: &Path) -> String {
    path.to_string_lossy().to_string()
}

/// Append exactly one path separator.
fn with_trailing_separator(path: &str) -> String {
    let trimmed = path.trim_end_matches(['/', '\\']);

    if path.contains('\\') && !path.contains('/') {
        format!("{}\\", trimmed)
    } else {
        format!("{}/", trimmed)
    }
}
