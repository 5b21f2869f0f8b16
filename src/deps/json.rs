//! JSON dependency parser.
//!
//! Handles manifest-style files: the keys of top-level `dependencies` and
//! `devDependencies` objects, in document order.

use std::path::Path;

use serde_json::Value;

use super::DependencyParser;

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        let Ok(value) = serde_json::from_str::<Value>(content) else {
            return Vec::new();
        };

        let mut deps = Vec::new();

        for section in ["dependencies", "devDependencies"] {
            if let Some(map) = value[section].as_object() {
                deps.extend(map.keys().cloned());
            }
        }

        deps
    }
}
