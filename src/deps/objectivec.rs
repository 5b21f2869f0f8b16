//! Objective-C dependency parser (also Objective-C++).
//!
//! Collects `#import` targets (framework name for angle-bracket imports,
//! basename without `.h` for quoted ones) and `@import` modules.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref IMPORT_RE: Regex =
        Regex::new(r#"^\s*#\s*(?:import|include)\s+[<"]([^>"]+)[>"]"#).unwrap();
    static ref AT_IMPORT_RE: Regex = Regex::new(r"^\s*@import\s+([A-Za-z_][A-Za-z0-9_]*)").unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let mut deps = Vec::new();

        for line in content.lines() {
            if let Some(captures) = IMPORT_RE.captures(line) {
                let target = &captures[1];
                let first = target.split('/').next().unwrap_or(target);
                let name = first.trim_end_matches(".h");

                if !name.is_empty() {
                    deps.push(name.to_string());
                }
                continue;
            }

            if let Some(captures) = AT_IMPORT_RE.captures(line) {
                deps.push(captures[1].to_string());
            }
        }

        deps
    }
}
