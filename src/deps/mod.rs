//! Dependency extraction from source files.
//!
//! Each supported language has a parser implementing a single contract:
//! scan the file contents and return the import tokens it recognises, in
//! order, tolerating syntax errors. Post-processing deduplicates, drops
//! empty and overlong tokens, and caps the list; parsers themselves stay
//! dumb scanners.

mod c;
mod cpp;
mod csharp;
mod elm;
mod golang;
mod haskell;
mod haxe;
mod html;
mod java;
mod javascript;
mod json;
mod kotlin;
mod objectivec;
mod php;
mod python;
mod rust_lang;
mod scala;
mod swift;
mod unknown;
mod vbnet;

use std::fs;
use std::path::Path;

use regex::Regex;
use tracing::debug;

use crate::heartbeat::{
    should_sanitize, Context, EntityType, Heartbeat, Stage, MAX_DEPENDENCIES_COUNT,
    MAX_DEPENDENCY_LENGTH,
};
use crate::language::Language;

/// Files larger than this are not parsed.
const MAX_FILE_SIZE: u64 = 512_000;

/// A dependency parser for one programming language.
///
/// Parsers operate on file contents without executing them, tolerate
/// syntax errors, and return whatever tokens they did recognise. The raw
/// token list may contain duplicates; filtering happens in [`detect`].
pub trait DependencyParser {
    fn parse(&self, path: &Path, content: &str) -> Vec<String>;
}

/// Parser registry keyed by language.
fn parser_for(language: Language) -> Option<Box<dyn DependencyParser>> {
    let parser: Box<dyn DependencyParser> = match language {
        Language::C => Box::new(c::Parser),
        Language::Cpp => Box::new(cpp::Parser),
        Language::CSharp => Box::new(csharp::Parser),
        Language::Elm => Box::new(elm::Parser),
        Language::Go => Box::new(golang::Parser),
        Language::Haskell => Box::new(haskell::Parser),
        Language::Haxe => Box::new(haxe::Parser),
        Language::Html => Box::new(html::Parser),
        Language::Java => Box::new(java::Parser),
        Language::JavaScript | Language::TypeScript | Language::Jsx | Language::Tsx => {
            Box::new(javascript::Parser)
        }
        Language::Json => Box::new(json::Parser),
        Language::Kotlin => Box::new(kotlin::Parser),
        Language::ObjectiveC | Language::ObjectiveCpp => Box::new(objectivec::Parser),
        Language::Php => Box::new(php::Parser),
        Language::Python => Box::new(python::Parser),
        Language::Rust => Box::new(rust_lang::Parser),
        Language::Scala => Box::new(scala::Parser),
        Language::Swift => Box::new(swift::Parser),
        Language::VbNet => Box::new(vbnet::Parser),
        _ => return None,
    };

    Some(parser)
}

/// Parse the dependencies of a file in the given language and apply the
/// common post-processing.
pub fn detect(path: &Path, language: Option<Language>) -> Vec<String> {
    let parser = match language.and_then(parser_for) {
        Some(parser) => parser,
        // Some build files are recognisable without a language.
        None => Box::new(unknown::Parser),
    };

    let Some(content) = read_source(path) else {
        return Vec::new();
    };

    filter_dependencies(parser.parse(path, &content))
}

/// Read a source file, skipping binaries and oversized files.
fn read_source(path: &Path) -> Option<String> {
    let metadata = fs::metadata(path).ok()?;
    if metadata.len() > MAX_FILE_SIZE {
        debug!("skipping dependency parsing of file over size limit: {:?}", path);
        return None;
    }

    let bytes = fs::read(path).ok()?;

    if bytes.iter().take(8192).any(|&b| b == 0) {
        debug!("skipping dependency parsing of binary file: {:?}", path);
        return None;
    }

    Some(String::from_utf8_lossy(&bytes).to_string())
}

/// Deduplicate preserving first occurrence, drop empty and overlong
/// tokens, cap the total. Tokens beyond the cap are dropped silently.
pub fn filter_dependencies(deps: Vec<String>) -> Vec<String> {
    let mut results: Vec<String> = Vec::new();
    let mut unique = std::collections::HashSet::new();

    for dep in deps {
        if results.len() >= MAX_DEPENDENCIES_COUNT {
            debug!("max size of {} dependencies reached", MAX_DEPENDENCIES_COUNT);
            break;
        }

        if dep.is_empty() || dep.len() > MAX_DEPENDENCY_LENGTH {
            continue;
        }

        if !unique.insert(dep.clone()) {
            continue;
        }

        results.push(dep);
    }

    results
}

/// Pipeline stage attaching dependencies to file heartbeats.
pub struct DepsStage {
    file_patterns: Vec<Regex>,
}

impl DepsStage {
    /// `file_patterns` is the hide-dependencies pattern list; a matching
    /// entity skips extraction entirely.
    pub fn new(file_patterns: Vec<Regex>) -> Self {
        Self { file_patterns }
    }
}

impl Stage for DepsStage {
    fn name(&self) -> &'static str {
        "dependency detection"
    }

    fn process(&self, _ctx: &Context, mut batch: Vec<Heartbeat>) -> anyhow::Result<Vec<Heartbeat>> {
        for h in &mut batch {
            if h.entity_type != EntityType::File || h.is_unsaved_entity {
                continue;
            }

            let Some(language) = h.language.as_deref() else {
                continue;
            };

            if should_sanitize(&h.entity, &self.file_patterns) {
                continue;
            }

            let language = Language::parse(language);
            let dependencies = detect(Path::new(h.content_path()), language);

            if !dependencies.is_empty() {
                h.dependencies = Some(dependencies);
            }
        }

        Ok(batch)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filter_drops_duplicates_preserving_order() {
        let filtered = filter_dependencies(vec![
            "Html".to_string(),
            "Color".to_string(),
            "Html".to_string(),
        ]);
        assert_eq!(filtered, vec!["Html", "Color"]);
    }

    #[test]
    fn test_filter_drops_empty_and_overlong() {
        let long = "x".repeat(MAX_DEPENDENCY_LENGTH + 1);
        let max = "y".repeat(MAX_DEPENDENCY_LENGTH);

        let filtered = filter_dependencies(vec!["".to_string(), long, max.clone()]);
        assert_eq!(filtered, vec![max]);
    }

    #[test]
    fn test_filter_caps_at_limit() {
        let deps: Vec<String> = (0..MAX_DEPENDENCIES_COUNT + 100).map(|i| format!("dep{}", i)).collect();
        assert_eq!(filter_dependencies(deps).len(), MAX_DEPENDENCIES_COUNT);
    }

    #[test]
    fn test_detect_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("empty.py");
        fs::write(&path, "").unwrap();

        assert!(detect(&path, Some(Language::Python)).is_empty());
    }

    #[test]
    fn test_detect_binary_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("blob.py");
        fs::write(&path, b"import os\x00\x01\x02").unwrap();

        assert!(detect(&path, Some(Language::Python)).is_empty());
    }

    #[test]
    fn test_stage_skips_unsaved_and_matching_entities() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("app.py");
        fs::write(&path, "import flask\n").unwrap();
        let entity = path.to_string_lossy().to_string();

        let base = Heartbeat {
            entity: entity.clone(),
            entity_type: EntityType::File,
            language: Some("Python".to_string()),
            ..Default::default()
        };

        let stage = DepsStage::new(Vec::new());
        let batch = stage.process(&Context::default(), vec![base.clone()]).unwrap();
        assert_eq!(batch[0].dependencies.as_deref(), Some(&["flask".to_string()][..]));

        let mut unsaved = base.clone();
        unsaved.is_unsaved_entity = true;
        let batch = stage.process(&Context::default(), vec![unsaved]).unwrap();
        assert!(batch[0].dependencies.is_none());

        let hidden = DepsStage::new(vec![Regex::new("(?i).*").unwrap()]);
        let batch = hidden.process(&Context::default(), vec![base]).unwrap();
        assert!(batch[0].dependencies.is_none());
    }
}
