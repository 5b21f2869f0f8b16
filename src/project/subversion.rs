//! Subversion project detection.
//!
//! Looks for a `.svn` metadata directory up the tree. Subversion has no
//! current-branch file; the branch is derived from the conventional
//! `trunk` / `branches/<name>` layout when the entity path contains it.

use std::path::{Component, Path};

use super::ProjectInfo;

const MAX_DEPTH: usize = 64;

pub fn detect(entity: &Path) -> Option<ProjectInfo> {
    let start = if entity.is_dir() { entity } else { entity.parent()? };

    for dir in start.ancestors().take(MAX_DEPTH) {
        if !dir.join(".svn").is_dir() {
            continue;
        }

        return Some(ProjectInfo {
            project: dir.file_name().map(|n| n.to_string_lossy().to_string()),
            branch: branch_from_layout(entity),
            folder: Some(dir.to_path_buf()),
        });
    }

    None
}

fn branch_from_layout(entity: &Path) -> Option<String> {
    let components: Vec<&str> = entity
        .components()
        .filter_map(|c| match c {
            Component::Normal(s) => s.to_str(),
            _ => None,
        })
        .collect();

    for (i, component) in components.iter().enumerate() {
        if *component == "trunk" {
            return Some("trunk".to_string());
        }

        if *component == "branches" {
            return components.get(i + 1).map(|b| b.to_string());
        }
    }

    None
}
