//! Configuration loading for `~/.wakatime.cfg` and friends.
//!
//! Precedence for every setting is flag > environment > config file; the
//! flag layer is applied by the CLI after [`Config::load`] returns the
//! merged file+environment view. An optional `settings.import_cfg` file is
//! merged on top of the main file, which plugins use to keep the api key
//! out of backed-up dotfiles.

pub mod ini;
pub mod state;

pub use ini::Ini;
pub use state::{State, StateFile};

use std::path::{Path, PathBuf};

use directories::BaseDirs;
use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;
use tracing::warn;

/// Default seconds between sends before heartbeats divert to the queue.
pub const RATE_LIMIT_DEFAULT_SECS: u64 = 120;

/// Default request timeout in seconds.
pub const TIMEOUT_DEFAULT_SECS: u64 = 120;

lazy_static! {
    static ref API_KEY_RE: Regex =
        Regex::new(r"(?i)^(waka_)?[0-9a-f]{8}-[0-9a-f]{4}-4[0-9a-f]{3}-[89ab][0-9a-f]{3}-[0-9a-f]{12}$")
            .unwrap();
}

/// Configuration errors, mapped to their own exit codes by the CLI.
#[derive(Error, Debug)]
pub enum Error {
    #[error("failed to parse config file: {0}")]
    Parse(String),
    #[error("failed to read config: {0}")]
    FileRead(String),
    #[error("failed to write config: {0}")]
    FileWrite(String),
}

/// A project-map rule: first matching regex wins, `{N}` in the template is
/// replaced with capture group N.
#[derive(Debug, Clone)]
pub struct MapRule {
    pub pattern: Regex,
    pub template: String,
}

/// A `[project_api_key]` rule attaching an api key override per entity.
#[derive(Debug, Clone)]
pub struct ApiKeyRule {
    pub pattern: Regex,
    pub api_key: String,
}

/// Which git submodules have project detection disabled.
#[derive(Debug, Clone, Default)]
pub enum SubmodulesDisabled {
    #[default]
    None,
    All,
    Matching(Vec<Regex>),
}

impl SubmodulesDisabled {
    pub fn matches(&self, path: &str) -> bool {
        match self {
            SubmodulesDisabled::None => false,
            SubmodulesDisabled::All => true,
            SubmodulesDisabled::Matching(patterns) => patterns.iter().any(|p| p.is_match(path)),
        }
    }
}

/// Typed view over the merged configuration files and environment.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_url: Option<String>,
    pub hostname: Option<String>,
    pub timeout_secs: Option<u64>,
    pub proxy: Option<String>,
    pub no_ssl_verify: bool,
    pub ssl_certs_file: Option<String>,
    pub rate_limit_secs: Option<u64>,

    pub exclude: Vec<Regex>,
    pub include: Vec<Regex>,
    pub exclude_unknown_project: bool,

    pub hide_file_names: Vec<Regex>,
    pub hide_project_names: Vec<Regex>,
    pub hide_branch_names: Vec<Regex>,
    pub hide_dependencies: Vec<Regex>,
    pub hide_project_folder: bool,

    pub project_map: Vec<MapRule>,
    pub project_api_keys: Vec<ApiKeyRule>,

    pub submodules_disabled: SubmodulesDisabled,
    pub submodule_map: Vec<MapRule>,
    pub project_from_git_remote: bool,

    pub guess_language: bool,
}

impl Config {
    /// Load and merge the user config. `path` overrides discovery.
    pub fn load(path: Option<&str>) -> Result<Self, Error> {
        let filepath = config_filepath(path).map_err(|e| Error::Parse(e.to_string()))?;

        let mut doc = Ini::load(&filepath).map_err(|e| Error::Parse(e.to_string()))?;

        // Merge the import file on top, if configured.
        if let Some(import) = doc.get("settings", "import_cfg").map(str::to_string) {
            let import_path = expand_tilde(import.trim());
            let imported =
                Ini::load(Path::new(&import_path)).map_err(|e| Error::Parse(e.to_string()))?;

            for section in ["settings", "git", "projectmap", "project_api_key", "git_submodule_projectmap"] {
                for (k, v) in imported.keys(section) {
                    doc.set(section, &k.to_string(), &v.to_string());
                }
            }
        }

        Ok(Self::from_ini(&doc))
    }

    /// Build the typed view from a parsed document plus environment.
    pub fn from_ini(doc: &Ini) -> Self {
        let get = |key: &str| doc.get("settings", key).map(str::trim).filter(|v| !v.is_empty());

        let api_key = get("api_key")
            .map(str::to_string)
            .or_else(|| std::env::var("WAKATIME_API_KEY").ok().filter(|v| !v.is_empty()));

        Self {
            api_key,
            api_url: get("api_url").map(str::to_string),
            hostname: get("hostname").map(str::to_string),
            timeout_secs: get("timeout").and_then(|v| v.parse().ok()),
            proxy: get("proxy").map(str::to_string),
            no_ssl_verify: get("no_ssl_verify").map(parse_bool).unwrap_or(false),
            ssl_certs_file: get("ssl_certs_file").map(str::to_string),
            rate_limit_secs: get("heartbeat_rate_limit_seconds").and_then(|v| v.parse().ok()),

            exclude: parse_patterns(get("exclude")),
            include: parse_patterns(get("include")),
            exclude_unknown_project: get("exclude_unknown_project").map(parse_bool).unwrap_or(false),

            hide_file_names: parse_patterns(get("hide_file_names")),
            hide_project_names: parse_patterns(get("hide_project_names")),
            hide_branch_names: parse_patterns(get("hide_branch_names")),
            hide_dependencies: parse_patterns(get("hide_dependencies")),
            hide_project_folder: get("hide_project_folder").map(parse_bool).unwrap_or(false),

            project_map: parse_map_rules(doc, "projectmap"),
            project_api_keys: parse_api_key_rules(doc),

            submodules_disabled: parse_submodules_disabled(doc.get("git", "submodules_disabled")),
            submodule_map: parse_map_rules(doc, "git_submodule_projectmap"),
            project_from_git_remote: doc
                .get("git", "project_from_git_remote")
                .map(parse_bool)
                .unwrap_or(false),

            guess_language: get("guess_language").map(parse_bool).unwrap_or(true),
        }
    }

    /// Whether the api key has the expected uuid shape.
    pub fn validate_api_key(key: &str) -> bool {
        API_KEY_RE.is_match(key)
    }

    /// Effective request timeout.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(TIMEOUT_DEFAULT_SECS)
    }

    /// Effective rate limit window.
    pub fn rate_limit_secs(&self) -> u64 {
        self.rate_limit_secs.unwrap_or(RATE_LIMIT_DEFAULT_SECS)
    }
}

/// Parse a newline-separated regex list. Patterns are case-insensitive.
/// Invalid patterns are skipped with a warning; lookaround gets a specific
/// message because the engine will never support it.
pub fn parse_patterns(value: Option<&str>) -> Vec<Regex> {
    let Some(value) = value else {
        return Vec::new();
    };

    let mut patterns = Vec::new();

    for line in value.lines() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        // "true" enables the catch-all, "false"/"none" disables the list.
        match line.to_lowercase().as_str() {
            "true" => {
                patterns.push(Regex::new("(?i).*").unwrap());
                continue;
            }
            "false" | "none" => continue,
            _ => {}
        }

        if line.contains("(?=") || line.contains("(?!") || line.contains("(?<") {
            warn!("pattern {:?} uses lookaround, which is not supported; pattern skipped", line);
            continue;
        }

        match Regex::new(&format!("(?i){}", line)) {
            Ok(re) => patterns.push(re),
            Err(e) => warn!("failed to compile pattern {:?}: {}", line, e),
        }
    }

    patterns
}

fn parse_map_rules(doc: &Ini, section: &str) -> Vec<MapRule> {
    let mut rules = Vec::new();

    for (pattern, template) in doc.keys(section) {
        match Regex::new(&format!("(?i){}", pattern)) {
            Ok(re) => rules.push(MapRule {
                pattern: re,
                template: template.to_string(),
            }),
            Err(e) => warn!("failed to compile {} pattern {:?}: {}", section, pattern, e),
        }
    }

    rules
}

fn parse_api_key_rules(doc: &Ini) -> Vec<ApiKeyRule> {
    let mut rules = Vec::new();

    for (pattern, key) in doc.keys("project_api_key") {
        if !Config::validate_api_key(key) {
            warn!("project_api_key for pattern {:?} is not a valid api key, skipped", pattern);
            continue;
        }

        match Regex::new(&format!("(?i){}", pattern)) {
            Ok(re) => rules.push(ApiKeyRule {
                pattern: re,
                api_key: key.to_string(),
            }),
            Err(e) => warn!("failed to compile project_api_key pattern {:?}: {}", pattern, e),
        }
    }

    rules
}

fn parse_submodules_disabled(value: Option<&str>) -> SubmodulesDisabled {
    let Some(value) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return SubmodulesDisabled::None;
    };

    match value.to_lowercase().as_str() {
        "true" => SubmodulesDisabled::All,
        "false" => SubmodulesDisabled::None,
        _ => {
            let patterns = parse_patterns(Some(value));
            if patterns.is_empty() {
                SubmodulesDisabled::None
            } else {
                SubmodulesDisabled::Matching(patterns)
            }
        }
    }
}

/// Loose boolean parsing; plugins write all of these.
pub fn parse_bool(value: &str) -> bool {
    matches!(value.trim().to_lowercase().as_str(), "true" | "1" | "yes" | "on")
}

/// The WakaTime home folder: `$WAKATIME_HOME` if set, else the user's home.
pub fn home_dir() -> anyhow::Result<PathBuf> {
    if let Ok(home) = std::env::var("WAKATIME_HOME") {
        let home = home.trim();
        if !home.is_empty() {
            return Ok(PathBuf::from(expand_tilde(home)));
        }
    }

    BaseDirs::new()
        .map(|dirs| dirs.home_dir().to_path_buf())
        .ok_or_else(|| anyhow::anyhow!("failed to detect user home directory"))
}

/// Folder for the queue file, log file, and internal state.
pub fn resources_dir() -> anyhow::Result<PathBuf> {
    Ok(home_dir()?.join(".wakatime"))
}

/// Path of the main config file, honoring an explicit override.
pub fn config_filepath(path: Option<&str>) -> anyhow::Result<PathBuf> {
    if let Some(p) = path.map(str::trim).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(expand_tilde(p)));
    }

    Ok(home_dir()?.join(".wakatime.cfg"))
}

/// Path of the internal state file, honoring an explicit override.
pub fn internal_config_filepath(path: Option<&str>) -> anyhow::Result<PathBuf> {
    if let Some(p) = path.map(str::trim).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(expand_tilde(p)));
    }

    Ok(resources_dir()?.join("wakatime-internal.cfg"))
}

/// Default log file path.
pub fn log_filepath(path: Option<&str>) -> anyhow::Result<PathBuf> {
    if let Some(p) = path.map(str::trim).filter(|p| !p.is_empty()) {
        return Ok(PathBuf::from(expand_tilde(p)));
    }

    Ok(resources_dir()?.join("wakatime.log"))
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> String {
    if path == "~" {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().to_string_lossy().to_string();
        }
    }

    if let Some(rest) = path.strip_prefix("~/").or_else(|| path.strip_prefix("~\\")) {
        if let Some(dirs) = BaseDirs::new() {
            return dirs.home_dir().join(rest).to_string_lossy().to_string();
        }
    }

    path.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_ini_settings() {
        let doc = Ini::parse(
            "[settings]\n\
             api_key = 00000000-0000-4000-8000-000000000000\n\
             api_url = https://custom.example.com/api/v1\n\
             timeout = 30\n\
             no_ssl_verify = true\n\
             heartbeat_rate_limit_seconds = 300\n\
             exclude =\n  ^/tmp/\n  \\.log$\n\
             hide_project_folder = 1\n",
        );
        let config = Config::from_ini(&doc);

        assert_eq!(config.api_key.as_deref(), Some("00000000-0000-4000-8000-000000000000"));
        assert_eq!(config.api_url.as_deref(), Some("https://custom.example.com/api/v1"));
        assert_eq!(config.timeout_secs(), 30);
        assert!(config.no_ssl_verify);
        assert_eq!(config.rate_limit_secs(), 300);
        assert_eq!(config.exclude.len(), 2);
        assert!(config.hide_project_folder);
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_ini(&Ini::default());
        assert_eq!(config.timeout_secs(), TIMEOUT_DEFAULT_SECS);
        assert_eq!(config.rate_limit_secs(), RATE_LIMIT_DEFAULT_SECS);
        assert!(!config.exclude_unknown_project);
        assert!(config.guess_language);
    }

    #[test]
    fn test_parse_patterns_case_insensitive() {
        let patterns = parse_patterns(Some("secret"));
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].is_match("/home/user/SECRET/file.go"));
    }

    #[test]
    fn test_parse_patterns_true_false() {
        let all = parse_patterns(Some("true"));
        assert_eq!(all.len(), 1);
        assert!(all[0].is_match("anything"));

        assert!(parse_patterns(Some("false")).is_empty());
        assert!(parse_patterns(Some("none")).is_empty());
    }

    #[test]
    fn test_parse_patterns_rejects_lookahead() {
        let patterns = parse_patterns(Some("foo(?=bar)\nplain"));
        assert_eq!(patterns.len(), 1);
        assert!(patterns[0].is_match("PLAIN"));
    }

    #[test]
    fn test_parse_patterns_skips_invalid() {
        let patterns = parse_patterns(Some("([unclosed\nvalid.*"));
        assert_eq!(patterns.len(), 1);
    }

    #[test]
    fn test_project_map_rules() {
        let doc = Ini::parse("[projectmap]\nprojects/foo = new project name\n^/home/user/projects/bar(\\d+)/ = project{0}\n");
        let config = Config::from_ini(&doc);

        assert_eq!(config.project_map.len(), 2);
        assert_eq!(config.project_map[0].template, "new project name");
    }

    #[test]
    fn test_project_api_key_rules_validate() {
        let doc = Ini::parse(
            "[project_api_key]\n\
             work/ = 00000000-0000-4000-8000-000000000000\n\
             bad/ = not-a-key\n",
        );
        let config = Config::from_ini(&doc);
        assert_eq!(config.project_api_keys.len(), 1);
    }

    #[test]
    fn test_validate_api_key() {
        assert!(Config::validate_api_key("00000000-0000-4000-8000-000000000000"));
        assert!(Config::validate_api_key("waka_00000000-0000-4000-8000-000000000000"));
        assert!(!Config::validate_api_key("not-a-key"));
        assert!(!Config::validate_api_key(""));
    }

    #[test]
    fn test_submodules_disabled_forms() {
        assert!(matches!(parse_submodules_disabled(Some("true")), SubmodulesDisabled::All));
        assert!(matches!(parse_submodules_disabled(Some("false")), SubmodulesDisabled::None));
        assert!(matches!(parse_submodules_disabled(None), SubmodulesDisabled::None));

        let matching = parse_submodules_disabled(Some("vendor/.*"));
        assert!(matching.matches("vendor/lib"));
        assert!(!matching.matches("src/lib"));
    }

    #[test]
    fn test_expand_tilde_passthrough() {
        assert_eq!(expand_tilde("/absolute/path"), "/absolute/path");
        assert_eq!(expand_tilde("relative/path"), "relative/path");
    }
}
