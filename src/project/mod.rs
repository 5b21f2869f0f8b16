//! Project, branch, and project-root detection for file heartbeats.
//!
//! Detectors run in a fixed priority order; the first one that produces a
//! project name wins, and later detectors only fill fields the accepted
//! result left empty. Revision-control detection always runs so an
//! overridden project still gets its branch and root folder.

mod file;
mod generator;
mod git;
mod map;
mod mercurial;
mod subversion;
mod tfvc;

pub use file::WAKATIME_PROJECT_FILE;
pub use generator::generate_project_name;

use std::path::{Path, PathBuf};

use regex::Regex;
use tracing::{debug, warn};

use crate::config::{MapRule, SubmodulesDisabled};
use crate::heartbeat::{Context, EntityType, Heartbeat, Stage};

/// What a single detector learned about a path.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ProjectInfo {
    pub project: Option<String>,
    pub branch: Option<String>,
    pub folder: Option<PathBuf>,
}

/// Configuration for the project detection stage.
#[derive(Debug, Clone, Default)]
pub struct ProjectConfig {
    pub project_map: Vec<MapRule>,
    pub submodule_map: Vec<MapRule>,
    pub submodules_disabled: SubmodulesDisabled,
    pub project_from_git_remote: bool,
    pub hide_project_names: Vec<Regex>,
}

/// Pipeline stage attaching project, branch, and root-folder info.
pub struct ProjectStage {
    config: ProjectConfig,
}

impl ProjectStage {
    pub fn new(config: ProjectConfig) -> Self {
        Self { config }
    }
}

impl Stage for ProjectStage {
    fn name(&self) -> &'static str {
        "project detection"
    }

    fn process(&self, _ctx: &Context, mut batch: Vec<Heartbeat>) -> anyhow::Result<Vec<Heartbeat>> {
        for h in &mut batch {
            if h.entity_type != EntityType::File {
                continue;
            }

            detect_into(h, &self.config);
        }

        Ok(batch)
    }
}

/// Run the detector chain for one heartbeat and write the outcome into it.
fn detect_into(h: &mut Heartbeat, config: &ProjectConfig) {
    let entity_path = Path::new(h.content_path()).to_path_buf();

    let mut project: Option<String> = None;
    let mut branch: Option<String> = None;
    let mut folder: Option<PathBuf> = None;

    // 1. Explicit override beats every detector.
    if let Some(overridden) = h.project_override.as_deref().filter(|p| !p.is_empty()) {
        project = Some(overridden.to_string());
    }

    // 2. A .wakatime-project file anywhere up the tree.
    if project.is_none() {
        if let Some(info) = file::detect(&entity_path) {
            project = info.project;
            branch = info.branch;
            folder = info.folder;
        }
    }

    // 3. Project map rules against the absolute entity path.
    if project.is_none() {
        if let Some(name) = map::detect(&h.entity, &config.project_map) {
            project = Some(name);
        }
    }

    // 4. Revision control. Always consulted: the branch and folder of an
    // overridden or mapped project still come from here.
    let vcs = git::detect(&entity_path, config)
        .or_else(|| mercurial::detect(&entity_path))
        .or_else(|| subversion::detect(&entity_path))
        .or_else(|| tfvc::detect(&entity_path));

    if let Some(info) = vcs {
        if project.is_none() {
            project = info.project;
        }
        if branch.is_none() {
            branch = info.branch;
        }
        if folder.is_none() {
            folder = info.folder;
        }
    }

    // 6. Alternates as the last resort.
    if project.is_none() {
        project = h.project_alternate.clone().filter(|p| !p.is_empty());
    }
    if branch.is_none() {
        branch = h.branch_alternate.clone().filter(|b| !b.is_empty());
    }

    // Folder precedence for override/map: the path override first, then
    // whatever revision control found, then the entity's own directory.
    if let Some(path_override) = h.project_path_override.as_deref().filter(|p| !p.is_empty()) {
        folder = Some(PathBuf::from(path_override));
    }

    if folder.is_none() {
        folder = entity_path.parent().map(Path::to_path_buf);
    }

    // Obfuscation: a matching entity gets a stored generated name in place
    // of the real project and branch; the root folder is kept.
    if !config.hide_project_names.is_empty()
        && config.hide_project_names.iter().any(|p| p.is_match(&h.entity))
    {
        project = Some(obfuscated_project_name(folder.as_deref()));
        branch = None;
    }

    h.project = project;
    h.branch = branch;
    h.project_root_count = folder.as_deref().map(count_slashes);
    h.project_path = folder.map(|f| f.to_string_lossy().to_string());
}

/// Read the stored obfuscated name, generating and persisting one on first
/// use. Without a known root the name is generated but not stored.
fn obfuscated_project_name(folder: Option<&Path>) -> String {
    let Some(folder) = folder else {
        return generate_project_name();
    };

    if let Some(stored) = file::read_stored_name(folder) {
        return stored;
    }

    let name = generate_project_name();
    if let Err(e) = file::write_stored_name(folder, &name) {
        warn!("failed to store generated project name: {}", e);
    } else {
        debug!("stored generated project name in {:?}", folder);
    }

    name
}

/// Number of path separators in the POSIX-style projection of a root path.
/// Windows drive and UNC prefixes are projected onto forward slashes first
/// so the count is stable across platforms.
fn count_slashes(path: &Path) -> usize {
    let s = path.to_string_lossy().replace('\\', "/");
    let s = s.trim_end_matches('/');
    s.chars().filter(|&c| c == '/').count()
}
