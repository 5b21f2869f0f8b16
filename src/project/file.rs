//! `.wakatime-project` file detection.
//!
//! The file lives at a project root. Its first line is the project name,
//! an optional second line is the branch. The same file stores generated
//! names for obfuscated projects.

use std::fs;
use std::path::{Path, PathBuf};

use super::ProjectInfo;

/// Name of the project marker file.
pub const WAKATIME_PROJECT_FILE: &str = ".wakatime-project";

/// Maximum ancestor hops when walking up the directory tree.
const MAX_DEPTH: usize = 64;

/// Walk ancestors of the entity looking for a `.wakatime-project` file.
pub fn detect(entity: &Path) -> Option<ProjectInfo> {
    let start = if entity.is_dir() { entity } else { entity.parent()? };

    for dir in start.ancestors().take(MAX_DEPTH) {
        let candidate = dir.join(WAKATIME_PROJECT_FILE);
        if !candidate.is_file() {
            continue;
        }

        let content = fs::read_to_string(&candidate).ok()?;
        let mut lines = content.lines().map(str::trim);

        let project = lines.next().filter(|l| !l.is_empty())?.to_string();
        let branch = lines.next().filter(|l| !l.is_empty()).map(str::to_string);

        return Some(ProjectInfo {
            project: Some(project),
            branch,
            folder: Some(dir.to_path_buf()),
        });
    }

    None
}

/// Read only the stored project name at an exact root, if present.
pub fn read_stored_name(root: &Path) -> Option<String> {
    let content = fs::read_to_string(root.join(WAKATIME_PROJECT_FILE)).ok()?;
    content.lines().next().map(str::trim).filter(|l| !l.is_empty()).map(str::to_string)
}

/// Persist a generated project name at a root.
pub fn write_stored_name(root: &Path, name: &str) -> std::io::Result<()> {
    fs::write(root.join(WAKATIME_PROJECT_FILE), format!("{}\n", name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_name_and_branch() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(WAKATIME_PROJECT_FILE), "billing\nstable\n").unwrap();

        let sub = dir.path().join("src").join("deep");
        fs::create_dir_all(&sub).unwrap();

        let info = detect(&sub.join("main.go")).unwrap();
        assert_eq!(info.project.as_deref(), Some("billing"));
        assert_eq!(info.branch.as_deref(), Some("stable"));
        assert_eq!(info.folder.as_deref(), Some(dir.path()));
    }

    #[test]
    fn test_detect_name_only() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(WAKATIME_PROJECT_FILE), "billing\n").unwrap();

        let info = detect(&dir.path().join("main.go")).unwrap();
        assert_eq!(info.project.as_deref(), Some("billing"));
        assert_eq!(info.branch, None);
    }

    #[test]
    fn test_detect_empty_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join(WAKATIME_PROJECT_FILE), "\n").unwrap();

        assert!(detect(&dir.path().join("main.go")).is_none());
    }

    #[test]
    fn test_nothing_found() {
        let dir = tempfile::tempdir().unwrap();
        assert!(detect(&dir.path().join("main.go")).is_none());
    }

    #[test]
    fn test_stored_name_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        write_stored_name(dir.path(), "generated-name").unwrap();
        assert_eq!(read_stored_name(dir.path()).as_deref(), Some("generated-name"));
    }
}
