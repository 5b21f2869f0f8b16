//! Scala dependency parser.
//!
//! Collects `import` paths truncated to their first three segments, with
//! selector braces and wildcards dropped.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref IMPORT_RE: Regex = Regex::new(r"^\s*import\s+([a-zA-Z_][\w.]*)").unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let mut deps = Vec::new();

        for line in content.lines() {
            let Some(captures) = IMPORT_RE.captures(line) else {
                continue;
            };

            let import = captures[1].trim_end_matches('.').trim_end_matches("._");
            let name = import.split('.').take(3).collect::<Vec<_>>().join(".");

            if !name.is_empty() {
                deps.push(name);
            }
        }

        deps
    }
}
