//! HTML dependency parser.
//!
//! Collects the `src` attribute of `<script>` tags, quotes included, the
//! way the analytics backend has always received them. Values may span
//! lines.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use super::DependencyParser;

lazy_static! {
    static ref SCRIPT_SRC_RE: Regex =
        Regex::new(r#"(?is)<script[^>]*?\ssrc\s*=\s*("[^"]*"|'[^']*')"#).unwrap();
}

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, _path: &Path, content: &str) -> Vec<String> {
        SCRIPT_SRC_RE
            .captures_iter(content)
            .map(|captures| captures[1].to_string())
            .collect()
    }
}
