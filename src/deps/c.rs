//! C dependency parser.
//!
//! Collects `#include` targets: the first path segment of angle-bracket
//! includes, the basename of quoted includes, both without the `.h`
//! suffix.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref INCLUDE_RE: Regex = Regex::new(r#"^\s*#\s*include\s+[<"]([^>"]+)[>"]"#).unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let mut deps = Vec::new();

        for line in content.lines() {
            let Some(captures) = INCLUDE_RE.captures(line) else {
                continue;
            };

            let target = &captures[1];
            let first = target.split('/').next().unwrap_or(target);
            let name = first.trim_end_matches(".h");

            if !name.is_empty() {
                deps.push(name.to_string());
            }
        }

        deps
    }
}
