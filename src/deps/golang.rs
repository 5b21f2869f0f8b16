//! Go dependency parser.
//!
//! Collects import paths from single imports and import blocks, with the
//! quotes stripped.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref SINGLE_IMPORT_RE: Regex = Regex::new(r#"^import\s+(?:[\w.]+\s+)?"([^"]+)""#).unwrap();
    static ref BLOCK_ITEM_RE: Regex = Regex::new(r#"^\s*(?:[\w.]+\s+)?"([^"]+)""#).unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let mut deps = Vec::new();
        let mut in_block = false;

        for line in content.lines() {
            let trimmed = line.trim();

            if in_block {
                if trimmed.starts_with(')') {
                    in_block = false;
                    continue;
                }

                if let Some(captures) = BLOCK_ITEM_RE.captures(line) {
                    deps.push(captures[1].to_string());
                }

                continue;
            }

            if trimmed.starts_with("import (") {
                in_block = true;
                continue;
            }

            if let Some(captures) = SINGLE_IMPORT_RE.captures(trimmed) {
                deps.push(captures[1].to_string());
            }
        }

        deps
    }
}
