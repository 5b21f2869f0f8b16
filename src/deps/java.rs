//! Java dependency parser.
//!
//! Collects `import` paths truncated to their first two segments, with a
//! leading `com.` stripped and wildcard/class tails dropped.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref IMPORT_RE: Regex =
        Regex::new(r"^\s*import\s+(?:static\s+)?([a-zA-Z_][\w.]*?)\s*;").unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let mut deps = Vec::new();

        for line in content.lines() {
            let Some(captures) = IMPORT_RE.captures(line) else {
                continue;
            };

            let mut import = captures[1].trim_end_matches(".*");
            import = import.strip_prefix("com.").unwrap_or(import);

            if import.starts_with("java.") || import.starts_with("javax.") {
                continue;
            }

            let name = import.split('.').take(2).collect::<Vec<_>>().join(".");
            if !name.is_empty() {
                deps.push(name);
            }
        }

        deps
    }
}
