//! Project-map rules from the `[projectmap]` config section.
//!
//! Each rule is a regex matched against the absolute entity path; the
//! first match wins. `{N}` in the template is replaced with capture group
//! N+1 of the match.

use lazy_static::lazy_static;
use regex::Regex;

use crate::config::MapRule;

lazy_static! {
    static ref PLACEHOLDER_RE: Regex = Regex::new(r"\{(\d+)\}").unwrap();
}

/// Resolve the first matching rule to a project name.
pub fn detect(entity: &str, rules: &[MapRule]) -> Option<String> {
    for rule in rules {
        let Some(captures) = rule.pattern.captures(entity) else {
            continue;
        };

        let name = PLACEHOLDER_RE
            .replace_all(&rule.template, |groups: &regex::Captures| {
                let n: usize = groups[1].parse().unwrap_or(0);
                captures
                    .get(n + 1)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default()
            })
            .to_string();

        if !name.is_empty() {
            return Some(name);
        }
    }

    None
}
