//! Python dependency parser.
//!
//! Collects the first segment of `import` and `from ... import` module
//! paths. The standard library is not filtered; the backend decides what
//! counts. Relative imports are skipped.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref IMPORT_RE: Regex =
        Regex::new(r"^\s*import\s+([a-zA-Z_][\w.]*(?:\s*,\s*[a-zA-Z_][\w.]*)*)").unwrap();
    static ref FROM_IMPORT_RE: Regex =
        Regex::new(r"^\s*from\s+([a-zA-Z_][\w.]*)\s+import\b").unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let mut deps = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim_start();

            if trimmed.starts_with('#') {
                continue;
            }

            if let Some(captures) = FROM_IMPORT_RE.captures(line) {
                push_module(&mut deps, &captures[1]);
                continue;
            }

            if let Some(captures) = IMPORT_RE.captures(line) {
                for module in captures[1].split(',') {
                    push_module(&mut deps, module.trim());
                }
            }
        }

        deps
    }
}

fn push_module(deps: &mut Vec<String>, module: &str) {
    let root = module.split('.').next().unwrap_or(module);
    if !root.is_empty() {
        deps.push(root.to_string());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_imports() {
        let content = "\
import first
import second, simplejson
from django.db import models
from app import models
from flask import Flask
import unittest
";
        let deps = Parser.parse(Path::new("app.py"), content);
        assert_eq!(
            deps,
            vec!["first", "second", "simplejson", "django", "app", "flask", "unittest"]
        );
    }

    #[test]
    fn test_relative_imports_skipped() {
        let content = "from . import models\nfrom .helpers import x\n";
        assert!(Parser.parse(Path::new("app.py"), content).is_empty());
    }

    #[test]
    fn test_comments_skipped() {
        let content = "# import fake\nimport real\n";
        assert_eq!(Parser.parse(Path::new("app.py"), content), vec!["real"]);
    }
}
