//! C# dependency parser.
//!
//! Collects the root namespace of `using` directives, skipping the
//! `System` tree and alias/static forms' keywords.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref USING_RE: Regex =
        Regex::new(r"^\s*using\s+(?:static\s+)?([A-Za-z_][A-Za-z0-9_]*(?:\.[A-Za-z0-9_]+)*)\s*;").unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let mut deps = Vec::new();

        for line in content.lines() {
            let Some(captures) = USING_RE.captures(line) else {
                continue;
            };

            let root = captures[1].split('.').next().unwrap_or("").to_string();

            if root.is_empty() || root == "System" {
                continue;
            }

            deps.push(root);
        }

        deps
    }
}
