//! Git project detection.
//!
//! Walks ancestors of the entity looking for `.git`, which is a directory
//! in a plain checkout, or a `gitdir:` pointer file in submodules and
//! linked worktrees. The branch comes from the effective HEAD file; a
//! detached HEAD yields no branch.

use std::fs;
use std::path::{Path, PathBuf};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use super::{ProjectConfig, ProjectInfo};

const MAX_DEPTH: usize = 64;

lazy_static! {
    // git@github.com:owner/repo.git | https://github.com/owner/repo.git
    static ref REMOTE_URL_RE: Regex =
        Regex::new(r"(?:[:/])([^/:]+)/([^/:]+?)(?:\.git)?/?$").unwrap();
}

/// Detect a git checkout governing the entity.
pub fn detect(entity: &Path, config: &ProjectConfig) -> Option<ProjectInfo> {
    let start = if entity.is_dir() { entity } else { entity.parent()? };

    for dir in start.ancestors().take(MAX_DEPTH) {
        let dot_git = dir.join(".git");

        if dot_git.is_dir() {
            return Some(project_info(dir, &dot_git, config));
        }

        if dot_git.is_file() {
            let Some(git_dir) = resolve_gitdir_pointer(dir, &dot_git) else {
                continue;
            };

            if is_submodule(&git_dir) {
                if config.submodules_disabled.matches(&dir.to_string_lossy()) {
                    debug!("submodule {:?} disabled, falling back to parent repository", dir);
                    continue;
                }

                let mut info = project_info(dir, &git_dir, config);

                // A dedicated submodule map may rewrite the name.
                if let Some(name) = super::map::detect(&dir.to_string_lossy(), &config.submodule_map)
                {
                    info.project = Some(name);
                }

                return Some(info);
            }

            // Linked worktree: HEAD lives in the private worktree dir.
            return Some(project_info(dir, &git_dir, config));
        }
    }

    None
}

fn project_info(work_tree: &Path, git_dir: &Path, config: &ProjectConfig) -> ProjectInfo {
    let mut project = work_tree
        .file_name()
        .map(|n| n.to_string_lossy().to_string());

    if config.project_from_git_remote {
        if let Some(remote) = project_from_remote(git_dir) {
            project = Some(remote);
        }
    }

    ProjectInfo {
        project,
        branch: read_branch(git_dir),
        folder: Some(work_tree.to_path_buf()),
    }
}

/// Resolve a `.git` pointer file to its target directory.
fn resolve_gitdir_pointer(work_tree: &Path, dot_git_file: &Path) -> Option<PathBuf> {
    let content = fs::read_to_string(dot_git_file).ok()?;
    let target = content.strip_prefix("gitdir:")?.trim();

    let path = PathBuf::from(target);
    let resolved = if path.is_absolute() {
        path
    } else {
        work_tree.join(path)
    };

    Some(resolved)
}

fn is_submodule(git_dir: &Path) -> bool {
    let s = git_dir.to_string_lossy().replace('\\', "/");
    s.contains("/.git/modules/")
}

/// Read the current branch from the HEAD file. Detached HEAD (a bare
/// commit hash) yields `None`.
fn read_branch(git_dir: &Path) -> Option<String> {
    let head = fs::read_to_string(git_dir.join("HEAD")).ok()?;
    let head = head.trim();

    head.strip_prefix("ref: ")
        .map(|r| {
            r.trim_start_matches("refs/heads/")
                .trim_start_matches("refs/")
                .to_string()
        })
        .filter(|b| !b.is_empty())
}

/// Derive `owner/repo` from the origin remote url, for git-remote mode.
fn project_from_remote(git_dir: &Path) -> Option<String> {
    let config_path = shared_git_dir(git_dir).join("config");
    let content = fs::read_to_string(config_path).ok()?;

    let mut in_origin = false;
    for line in content.lines() {
        let trimmed = line.trim();

        if trimmed.starts_with('[') {
            in_origin = trimmed == r#"[remote "origin"]"#;
            continue;
        }

        if in_origin {
            if let Some(url) = trimmed.strip_prefix("url") {
                let url = url.trim_start_matches(['=', ' ', '\t']).trim();
                if let Some(captures) = REMOTE_URL_RE.captures(url) {
                    return Some(format!("{}/{}", &captures[1], &captures[2]));
                }
            }
        }
    }

    None
}

/// The directory holding the shared `config` file. In a linked worktree
/// the private dir carries a `commondir` pointer back to the main gitdir.
fn shared_git_dir(git_dir: &Path) -> PathBuf {
    match fs::read_to_string(git_dir.join("commondir")) {
        Ok(common) => {
            let common = common.trim();
            let path = PathBuf::from(common);
            if path.is_absolute() {
                path
            } else {
                git_dir.join(path)
            }
        }
        Err(_) => git_dir.to_path_buf(),
    }
}
