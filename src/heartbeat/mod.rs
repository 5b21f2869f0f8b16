//! Heartbeat model and processing pipeline.
//!
//! A heartbeat records one moment of editing activity: the entity being
//! worked on, when, and the provenance attached along the pipeline (project,
//! branch, language, dependencies). Heartbeats are created by the CLI entry
//! point, flow through the pipeline exactly once, and end up either in an
//! outbound API request or in the offline queue.

mod filter;
mod format;
mod pipeline;
mod rate_limit;
mod remote;
mod sanitize;

pub use filter::{FilterConfig, FilterStage};
pub use format::FormatStage;
pub use pipeline::{requeue_candidates, CancelToken, Context, Fallback, Pipeline, Stage, Transport};
pub use rate_limit::RateLimitStage;
pub use remote::{cleanup_local_files, RemoteClient, RemoteStage};
pub use sanitize::{sanitize, should_sanitize, SanitizeConfig, SanitizeStage};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Maximum number of dependencies sent per heartbeat.
pub const MAX_DEPENDENCIES_COUNT: usize = 1000;

/// Maximum length of a single dependency. Longer items are discarded.
pub const MAX_DEPENDENCY_LENGTH: usize = 200;

/// The kind of entity a heartbeat describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityType {
    #[default]
    File,
    App,
    Domain,
    Url,
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EntityType::File => write!(f, "file"),
            EntityType::App => write!(f, "app"),
            EntityType::Domain => write!(f, "domain"),
            EntityType::Url => write!(f, "url"),
        }
    }
}

impl std::str::FromStr for EntityType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "file" => Ok(EntityType::File),
            "app" => Ok(EntityType::App),
            "domain" => Ok(EntityType::Domain),
            "url" => Ok(EntityType::Url),
            _ => Err(format!("invalid entity type {:?}", s)),
        }
    }
}

/// Activity category of a heartbeat.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Category {
    #[default]
    #[serde(rename = "coding")]
    Coding,
    #[serde(rename = "advising")]
    Advising,
    #[serde(rename = "browsing")]
    Browsing,
    #[serde(rename = "building")]
    Building,
    #[serde(rename = "code reviewing")]
    CodeReviewing,
    #[serde(rename = "communicating")]
    Communicating,
    #[serde(rename = "debugging")]
    Debugging,
    #[serde(rename = "designing")]
    Designing,
    #[serde(rename = "indexing")]
    Indexing,
    #[serde(rename = "learning")]
    Learning,
    #[serde(rename = "manual testing")]
    ManualTesting,
    #[serde(rename = "meeting")]
    Meeting,
    #[serde(rename = "planning")]
    Planning,
    #[serde(rename = "researching")]
    Researching,
    #[serde(rename = "running tests")]
    RunningTests,
    #[serde(rename = "translating")]
    Translating,
    #[serde(rename = "writing docs")]
    WritingDocs,
    #[serde(rename = "writing tests")]
    WritingTests,
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Category::Coding => "coding",
            Category::Advising => "advising",
            Category::Browsing => "browsing",
            Category::Building => "building",
            Category::CodeReviewing => "code reviewing",
            Category::Communicating => "communicating",
            Category::Debugging => "debugging",
            Category::Designing => "designing",
            Category::Indexing => "indexing",
            Category::Learning => "learning",
            Category::ManualTesting => "manual testing",
            Category::Meeting => "meeting",
            Category::Planning => "planning",
            Category::Researching => "researching",
            Category::RunningTests => "running tests",
            Category::Translating => "translating",
            Category::WritingDocs => "writing docs",
            Category::WritingTests => "writing tests",
        };
        write!(f, "{}", s)
    }
}

impl std::str::FromStr for Category {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(serde_json::Value::String(s.to_string()))
            .map_err(|_| format!("invalid category {:?}", s))
    }
}

/// One moment of editing activity.
///
/// Fields without a `skip` attribute round-trip through the offline queue;
/// the outbound API body is the narrower [`WireHeartbeat`] projection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Heartbeat {
    pub entity: String,
    #[serde(rename = "type", default)]
    pub entity_type: EntityType,
    #[serde(default)]
    pub category: Category,
    /// Seconds since epoch with microsecond precision.
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<String>>,
    #[serde(rename = "lineno", skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(rename = "cursorpos", skip_serializing_if = "Option::is_none")]
    pub cursor_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_additions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_deletions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_write: Option<bool>,
    #[serde(default)]
    pub user_agent: String,

    // Queue-internal fields, never part of the outbound request body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_alternate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub project_path_override: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch_alternate: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language_alternate: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub is_unsaved_entity: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub local_file: Option<String>,
    #[serde(default, skip_serializing_if = "is_false")]
    pub local_file_needs_cleanup: bool,
}

fn is_false(b: &bool) -> bool {
    !b
}

impl Heartbeat {
    /// Deterministic fingerprint used as the offline-queue key.
    ///
    /// Equal fingerprints collapse in the queue (last write wins), which
    /// makes requeueing idempotent.
    pub fn id(&self) -> String {
        format!(
            "{:.6}-{}-{}-{}-{}-{}",
            self.time,
            self.entity_type,
            self.category,
            self.project.as_deref().unwrap_or(""),
            self.entity,
            self.is_write.unwrap_or(false),
        )
    }

    /// The file to read for content inspection: the local shadow of a
    /// remote entity when present, the entity itself otherwise.
    pub fn content_path(&self) -> &str {
        match self.local_file.as_deref() {
            Some(local) if !local.is_empty() => local,
            _ => &self.entity,
        }
    }

    /// Whether the entity is a remote path (ssh/sftp scheme).
    pub fn is_remote(&self) -> bool {
        self.entity_type == EntityType::File
            && !self.is_unsaved_entity
            && (self.entity.starts_with("ssh://") || self.entity.starts_with("sftp://"))
    }

    /// Outbound API projection of this heartbeat.
    pub fn wire(&self) -> WireHeartbeat<'_> {
        WireHeartbeat {
            entity: &self.entity,
            entity_type: self.entity_type,
            category: self.category,
            time: self.time,
            project: self.project.as_deref(),
            project_root_count: self.project_root_count,
            branch: self.branch.as_deref(),
            language: self.language.as_deref(),
            dependencies: self.dependencies.as_deref(),
            line_number: self.line_number,
            cursor_position: self.cursor_position,
            lines: self.lines,
            line_additions: self.line_additions,
            line_deletions: self.line_deletions,
            is_write: self.is_write,
            user_agent: &self.user_agent,
        }
    }
}

/// The outbound request body of a single heartbeat (§6 wire format).
#[derive(Debug, Serialize)]
pub struct WireHeartbeat<'a> {
    pub entity: &'a str,
    #[serde(rename = "type")]
    pub entity_type: EntityType,
    pub category: Category,
    pub time: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project_root_count: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub branch: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub language: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<&'a [String]>,
    #[serde(rename = "lineno", skip_serializing_if = "Option::is_none")]
    pub line_number: Option<u32>,
    #[serde(rename = "cursorpos", skip_serializing_if = "Option::is_none")]
    pub cursor_position: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lines: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_additions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub line_deletions: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_write: Option<bool>,
    pub user_agent: &'a str,
}

/// Per-heartbeat outcome of an API submission.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResult {
    pub status: u16,
    pub heartbeat: Heartbeat,
    pub errors: Vec<String>,
}

impl ApiResult {
    /// Whether the API accepted the heartbeat.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The user agent sent with every request:
/// `wakatime/{cli-version} ({os}-{kernel}-{arch}) {runtime} {plugin}`.
pub fn user_agent(plugin: &str) -> String {
    let plugin = if plugin.is_empty() { "Unknown/0" } else { plugin };

    format!(
        "wakatime/{} ({}-{}-{}) {} {}",
        env!("CARGO_PKG_VERSION"),
        std::env::consts::OS,
        std::env::consts::FAMILY,
        std::env::consts::ARCH,
        env!("WAKATIME_RUSTC_VERSION"),
        plugin,
    )
}
