//! PHP dependency parser.
//!
//! Collects the root namespace of `use` statements and the quoted targets
//! of `include`/`require` statements (quotes kept).

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref USE_RE: Regex =
        Regex::new(r"^\s*use\s+(?:function\s+)?\\?([A-Za-z_][A-Za-z0-9_]*)").unwrap();
    static ref INCLUDE_RE: Regex =
        Regex::new(r#"(?:include|include_once|require|require_once)\s*\(?\s*('[^']+'|"[^"]+")"#)
            .unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let mut deps = Vec::new();

        for line in content.lines() {
            for captures in INCLUDE_RE.captures_iter(line) {
                deps.push(captures[1].to_string());
            }

            if let Some(captures) = USE_RE.captures(line) {
                deps.push(captures[1].to_string());
            }
        }

        deps
    }
}
