//! VB.Net dependency parser.
//!
//! Collects the root namespace of `Imports` statements, skipping the
//! `System` tree.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref IMPORTS_RE: Regex =
        Regex::new(r"(?i)^\s*Imports\s+([A-Za-z_][\w.]*)").unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let mut deps = Vec::new();

        for line in content.lines() {
            let Some(captures) = IMPORTS_RE.captures(line) else {
                continue;
            };

            let root = captures[1].split('.').next().unwrap_or("").to_string();

            if root.is_empty() || root.eq_ignore_ascii_case("System") {
                continue;
            }

            deps.push(root);
        }

        deps
    }
}
