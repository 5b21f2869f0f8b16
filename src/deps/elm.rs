//! Elm dependency parser.
//!
//! Collects the first segment of `import` module paths.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref IMPORT_RE: Regex = Regex::new(r"^import\s+([A-Z][A-Za-z0-9_]*)").unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let mut deps = Vec::new();

        for line in content.lines() {
            if let Some(captures) = IMPORT_RE.captures(line) {
                deps.push(captures[1].to_string());
            }
        }

        deps
    }
}
