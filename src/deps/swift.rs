//! Swift dependency parser.
//!
//! Collects module names from `import` statements, including attributed
//! and submodule forms.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref IMPORT_RE: Regex =
        Regex::new(r"^\s*(?:@testable\s+)?import\s+(?:(?:class|struct|enum|func|var)\s+)?([A-Za-z_][A-Za-z0-9_]*)")
            .unwrap();
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_imports() {
        let content = "\
import UIKit
@testable import PromiseKit
import func Darwin.fputs
";
        let deps = Parser.parse(Path::new("View.swift"), content);
        assert_eq!(deps, vec!["UIKit", "PromiseKit", "Darwin"]);
    }
}
