//! C++ dependency parser.
//!
//! Same `#include` scanning as the C parser; standard-library headers
//! without an extension count too.

use std::path::Path;

use super::DependencyParser;

pub struct Parser;

impl DependencyParser for Parser {
    fn parse(&self, path: &Path, content: &str) -> Vec<String> {
        super::c::Parser.parse(path, content)
    }
}
