//! Rust dependency parser.
//!
//! Collects crate roots of `use` statements and `extern crate`
//! declarations, skipping the `crate`/`self`/`super`/`std` roots.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref USE_RE: Regex = Regex::new(r"^\s*(?:pub\s+)?use\s+([a-zA-Z_][a-zA-Z0-9_]*)(?:::|;|\s)").unwrap();
    static ref EXTERN_CRATE_RE: Regex =
        Regex::new(r"^\s*extern\s+crate\s+([a-zA-Z_][a-zA-Z0-9_]*)").unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let mut deps = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim_start();

            if trimmed.starts_with("//") {
                continue;
            }

            if let Some(captures) = EXTERN_CRATE_RE.captures(line) {
                deps.push(captures[1].to_string());
                continue;
            }

            if let Some(captures) = USE_RE.captures(line) {
                let root = &captures[1];
                if matches!(root, "crate" | "self" | "super" | "std") {
                    continue;
                }
                deps.push(root.to_string());
            }
        }

        deps
    }
}
