//! Mercurial project detection.
//!
//! Looks for a `.hg` metadata directory up the tree. The current branch
//! comes from `.hg/branch`, defaulting to `default` when the file is
//! missing (mercurial's own behaviour for an untouched checkout).

use std::fs;
use std::path::Path;

use super::ProjectInfo;

const MAX_DEPTH: usize = 64;

pub fn detect(entity: &Path) -> Option<ProjectInfo> {
    let start = if entity.is_dir() { entity } else { entity.parent()? };

    for dir in start.ancestors().take(MAX_DEPTH) {
        let hg = dir.join(".hg");
        if !hg.is_dir() {
            continue;
        }

        let branch = fs::read_to_string(hg.join("branch"))
            .ok()
            .map(|b| b.trim().to_string())
            .filter(|b| !b.is_empty())
            .unwrap_or_else(|| "default".to_string());

        return Some(ProjectInfo {
            project: dir.file_name().map(|n| n.to_string_lossy().to_string()),
            branch: Some(branch),
            folder: Some(dir.to_path_buf()),
        });
    }

    None
}
