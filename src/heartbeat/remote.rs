//! Remote-entity materialisation.
//!
//! Remote file heartbeats (ssh/sftp schemes) need a local copy for the
//! content-inspecting stages. The actual download protocol is a
//! collaborator behind the [`RemoteClient`] trait; the stage only manages
//! the temp file, the `local_file` shadow, and dropping heartbeats whose
//! download failed. Temp files are flagged for cleanup and removed by
//! [`cleanup_local_files`] on every exit path of the invocation.

use std::path::{Path, PathBuf};

use anyhow::bail;
use tracing::{debug, warn};

use super::{Context, Heartbeat, Stage};

/// Download timeout the collaborator is expected to enforce.
pub const REMOTE_TIMEOUT_SECS: u64 = 20;

/// Maximum remote file size worth downloading (512 Kb).
pub const REMOTE_MAX_FILE_SIZE: u64 = 512_000;

/// Contract for fetching a remote entity to a local path.
pub trait RemoteClient {
    fn download(&self, entity: &str, to: &Path) -> anyhow::Result<()>;
}

/// Placeholder collaborator used when no download protocol is wired in:
/// every download fails, so remote heartbeats are dropped from the batch.
pub struct UnsupportedRemoteClient;

impl RemoteClient for UnsupportedRemoteClient {
    fn download(&self, entity: &str, _to: &Path) -> anyhow::Result<()> {
        bail!("remote file download not supported for entity {:?}", entity)
    }
}

/// The remote-materialisation pipeline stage.
pub struct RemoteStage {
    client: Box<dyn RemoteClient>,
}

impl RemoteStage {
    pub fn new(client: Box<dyn RemoteClient>) -> Self {
        Self { client }
    }
}

impl Default for RemoteStage {
    fn default() -> Self {
        Self::new(Box::new(UnsupportedRemoteClient))
    }
}

impl Stage for RemoteStage {
    fn name(&self) -> &'static str {
        "remote file detection"
    }

    fn process(&self, _ctx: &Context, batch: Vec<Heartbeat>) -> anyhow::Result<Vec<Heartbeat>> {
        let mut kept = Vec::with_capacity(batch.len());

        for mut h in batch {
            if !h.is_remote() {
                kept.push(h);
                continue;
            }

            let tmp = match temp_download_path(&h.entity) {
                Ok(tmp) => tmp,
                Err(e) => {
                    warn!("failed to create temporary file: {}", e);
                    continue;
                }
            };

            match self.client.download(&h.entity, &tmp) {
                Ok(()) => {
                    h.local_file = Some(tmp.to_string_lossy().to_string());
                    h.local_file_needs_cleanup = true;
                    kept.push(h);
                }
                Err(e) => {
                    debug!("dropping remote heartbeat: {}", e);
                    let _ = std::fs::remove_file(&tmp);
                }
            }
        }

        Ok(kept)
    }
}

fn temp_download_path(entity: &str) -> std::io::Result<PathBuf> {
    let basename = Path::new(entity)
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "remote".to_string());

    let file = tempfile::Builder::new()
        .suffix(&format!("_{}", basename))
        .tempfile()?;

    // Keep the file on disk; ownership passes to the heartbeat.
    let (_, path) = file.keep().map_err(|e| e.error)?;
    Ok(path)
}

/// Remove downloaded shadows after the pipeline finishes. Must run on
/// every exit path of a heartbeat invocation.
pub fn cleanup_local_files(batch: &[Heartbeat]) {
    for h in batch {
        if !h.local_file_needs_cleanup {
            continue;
        }

        if let Some(local) = h.local_file.as_deref().filter(|l| !l.is_empty()) {
            if let Err(e) = std::fs::remove_file(local) {
                warn!("unable to delete tmp file {:?}: {}", local, e);
            }
        }
    }
}
