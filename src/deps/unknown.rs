//! Fallback parser for files without a language-specific one.
//!
//! Recognises a handful of build files by name and reports the tool they
//! belong to.

use std::path::Path;

use super::DependencyParser;

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, path: &Path, _content: &str) -> Vec<String> {
        let Some(filename) = path.file_name().map(|n| n.to_string_lossy().to_lowercase()) else {
            return Vec::new();
        };

        let tool = if filename.starts_with("bower") {
            "bower"
        } else if filename.starts_with("gruntfile") {
            "grunt"
        } else if filename.starts_with("gulpfile") {
            "gulp"
        } else {
            return Vec::new();
        };

        vec![tool.to_string()]
    }
}
