//! Team Foundation Version Control project detection.
//!
//! Looks for the `$tf` (Windows) or `.tf` (unix clients) metadata
//! directory up the tree. TFVC exposes no branch file, so only project
//! and folder are reported.

use std::path::Path;

use super::ProjectInfo;

const MAX_DEPTH: usize = 64;

pub fn detect(entity: &Path) -> Option<ProjectInfo> {
    let start = if entity.is_dir() { entity } else { entity.parent()? };

    for dir in start.ancestors().take(MAX_DEPTH) {
        if !dir.join("$tf").is_dir() && !dir.join(".tf").is_dir() {
            continue;
        }

        return Some(ProjectInfo {
            project: dir.file_name().map(|n| n.to_string_lossy().to_string()),
            branch: None,
            folder: Some(dir.to_path_buf()),
        });
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_detect_tf_dir() {
        let tmp = tempfile::tempdir().unwrap();
        let repo = tmp.path().join("tfvc-project");
        fs::create_dir_all(repo.join(".tf")).unwrap();

        let entity = repo.join("Program.cs");
        fs::write(&entity, "").unwrap();

        let info = detect(&entity).unwrap();
        assert_eq!(info.project.as_deref(), Some("tfvc-project"));
        assert_eq!(info.branch, None);
        assert_eq!(info.folder.as_deref(), Some(repo.as_path()));
    }

    #[test]
    fn test_no_repository() {
        let tmp = tempfile::tempdir().unwrap();
        let entity = tmp.path().join("Program.cs");
        fs::write(&entity, "").unwrap();
        assert!(detect(&entity).is_none());
    }
}
