//! JavaScript/TypeScript dependency parser (also JSX and TSX).
//!
//! Collects package names from ES module imports, dynamic imports, and
//! CommonJS requires. Relative imports are skipped; scoped packages keep
//! their `@scope/name` prefix.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    // import x from 'pkg' | import 'pkg' | export ... from 'pkg'
    static ref IMPORT_RE: Regex = Regex::new(
        r#"^\s*(?:import|export)\s+(?:[\w{}$*,\s]+\s+from\s+)?['"]([^'"]+)['"]"#
    )
    .unwrap();
    // require('pkg') | import('pkg')
    static ref REQUIRE_RE: Regex =
        Regex::new(r#"(?:require|import)\s*\(\s*['"]([^'"]+)['"]\s*\)"#).unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let mut deps = Vec::new();

        for line in content.lines() {
            let trimmed = line.trim_start();

            if trimmed.starts_with("//") || trimmed.starts_with("/*") {
                continue;
            }

            if let Some(captures) = IMPORT_RE.captures(line) {
                push_package(&mut deps, &captures[1]);
            }

            for captures in REQUIRE_RE.captures_iter(line) {
                push_package(&mut deps, &captures[1]);
            }
        }

        deps
    }
}

fn push_package(deps: &mut Vec<String>, module: &str) {
    if module.starts_with('.') || module.starts_with('/') {
        return;
    }

    let package = if module.starts_with('@') {
        module.splitn(3, '/').take(2).collect::<Vec<_>>().join("/")
    } else {
        module.split('/').next().unwrap_or(module).to_string()
    };

    if !package.is_empty() {
        deps.push(package);
    }
}
