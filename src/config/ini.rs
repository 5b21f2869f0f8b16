//! Minimal INI reader/writer for the WakaTime config files.
//!
//! The format is the one the editor plugins have always written: `[section]`
//! headers, `key = value` pairs, `#`/`;` comments, and Python-style
//! multiline values where continuation lines are indented deeper than the
//! key. Section and key order is preserved on write. No crate in the
//! ecosystem we already depend on speaks this dialect, so the ~150 lines
//! live here.

use std::collections::HashMap;
use std::fs;
use std::io::Write;
use std::path::Path;

use anyhow::{anyhow, Context as _};
use tempfile::NamedTempFile;

/// An in-memory INI document.
#[derive(Debug, Clone, Default)]
pub struct Ini {
    sections: Vec<Section>,
    index: HashMap<String, usize>,
}

#[derive(Debug, Clone, Default)]
struct Section {
    name: String,
    keys: Vec<(String, String)>,
}

impl Ini {
    /// Load a document from disk. A missing file yields an empty document.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)
            .with_context(|| format!("failed reading config file {:?}", path))?;

        Ok(Self::parse(&content))
    }

    /// Parse INI text. Malformed lines are skipped rather than fatal; the
    /// config files are written by dozens of plugins and the occasional
    /// stray line must not take down the whole invocation.
    pub fn parse(content: &str) -> Self {
        let mut doc = Self::default();
        let mut current: Option<usize> = None;
        // (section, key index, indent of the key line) of the last value,
        // for Python-style multiline continuation.
        let mut last_key: Option<(usize, usize, usize)> = None;

        for line in content.lines() {
            let trimmed = line.trim_end();
            let stripped = trimmed.trim_start();
            let indent = trimmed.len() - stripped.len();

            if stripped.is_empty() {
                last_key = None;
                continue;
            }

            // Continuation: deeper indentation than the owning key line and
            // no key separator of its own at the top level.
            if indent > 0 {
                if let Some((s, k, key_indent)) = last_key {
                    if indent > key_indent {
                        let value = &mut doc.sections[s].keys[k].1;
                        value.push('\n');
                        value.push_str(stripped);
                        continue;
                    }
                }
            }

            if stripped.starts_with('#') || stripped.starts_with(';') {
                last_key = None;
                continue;
            }

            if stripped.starts_with('[') && stripped.ends_with(']') {
                let name = stripped[1..stripped.len() - 1].trim().to_string();
                current = Some(doc.section_index(&name));
                last_key = None;
                continue;
            }

            if let Some(pos) = stripped.find('=') {
                let key = stripped[..pos].trim().to_string();
                let value = stripped[pos + 1..].trim().to_string();

                if key.is_empty() {
                    last_key = None;
                    continue;
                }

                let s = match current {
                    Some(s) => s,
                    // Key before any section header: implicit empty section.
                    None => {
                        let s = doc.section_index("");
                        current = Some(s);
                        s
                    }
                };

                let section = &mut doc.sections[s];
                match section.keys.iter().position(|(k, _)| *k == key) {
                    Some(k) => {
                        section.keys[k].1 = value;
                        last_key = Some((s, k, indent));
                    }
                    None => {
                        section.keys.push((key, value));
                        last_key = Some((s, section.keys.len() - 1, indent));
                    }
                }
            }
        }

        doc
    }

    fn section_index(&mut self, name: &str) -> usize {
        if let Some(&i) = self.index.get(name) {
            return i;
        }

        self.sections.push(Section {
            name: name.to_string(),
            keys: Vec::new(),
        });
        let i = self.sections.len() - 1;
        self.index.insert(name.to_string(), i);
        i
    }

    /// Look up a value. Returns `None` for missing section or key.
    pub fn get(&self, section: &str, key: &str) -> Option<&str> {
        let &i = self.index.get(section)?;
        self.sections[i]
            .keys
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Set a value, creating the section if needed.
    pub fn set(&mut self, section: &str, key: &str, value: &str) {
        let i = self.section_index(section);
        let keys = &mut self.sections[i].keys;
        match keys.iter_mut().find(|(k, _)| k == key) {
            Some((_, v)) => *v = value.to_string(),
            None => keys.push((key.to_string(), value.to_string())),
        }
    }

    /// Remove a key. Returns whether it was present.
    pub fn remove(&mut self, section: &str, key: &str) -> bool {
        let Some(&i) = self.index.get(section) else {
            return false;
        };

        let keys = &mut self.sections[i].keys;
        match keys.iter().position(|(k, _)| k == key) {
            Some(pos) => {
                keys.remove(pos);
                true
            }
            None => false,
        }
    }

    /// All keys of a section in document order.
    pub fn keys(&self, section: &str) -> Vec<(&str, &str)> {
        match self.index.get(section) {
            Some(&i) => self.sections[i]
                .keys
                .iter()
                .map(|(k, v)| (k.as_str(), v.as_str()))
                .collect(),
            None => Vec::new(),
        }
    }

    /// Serialise back to INI text. Multiline values are re-indented.
    pub fn to_string(&self) -> String {
        let mut out = String::new();

        for section in &self.sections {
            if section.keys.is_empty() && section.name.is_empty() {
                continue;
            }

            if !out.is_empty() {
                out.push('\n');
            }

            if !section.name.is_empty() {
                out.push_str(&format!("[{}]\n", section.name));
            }

            for (key, value) in &section.keys {
                if value.contains('\n') {
                    out.push_str(&format!("{} =", key));
                    for line in value.lines().filter(|l| !l.is_empty()) {
                        out.push_str(&format!("\n  {}", line));
                    }
                    out.push('\n');
                } else {
                    out.push_str(&format!("{} = {}\n", key, value));
                }
            }
        }

        out
    }

    /// Write atomically: temp file in the same directory, then rename.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let dir = path
            .parent()
            .ok_or_else(|| anyhow!("config path {:?} has no parent directory", path))?;

        fs::create_dir_all(dir)
            .with_context(|| format!("failed creating config directory {:?}", dir))?;

        let mut tmp = NamedTempFile::new_in(dir)
            .with_context(|| format!("failed creating temp file in {:?}", dir))?;

        tmp.write_all(self.to_string().as_bytes())
            .context("failed writing config contents")?;

        tmp.persist(path)
            .with_context(|| format!("failed persisting config file {:?}", path))?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_basic() {
        let ini = Ini::parse("[settings]\napi_key = 123\ndebug = true\n");
        assert_eq!(ini.get("settings", "api_key"), Some("123"));
        assert_eq!(ini.get("settings", "debug"), Some("true"));
        assert_eq!(ini.get("settings", "missing"), None);
        assert_eq!(ini.get("missing", "api_key"), None);
    }

    #[test]
    fn test_parse_comments_and_blank_lines() {
        let ini = Ini::parse("# comment\n[settings]\n; another\n\napi_key = 123\n");
        assert_eq!(ini.get("settings", "api_key"), Some("123"));
    }

    #[test]
    fn test_parse_multiline_value() {
        let content = "[settings]\nhide_file_names =\n  secret.*\n  ^/private/\nexclude = none\n";
        let ini = Ini::parse(content);

        assert_eq!(ini.get("settings", "hide_file_names"), Some("\nsecret.*\n^/private/"));
        assert_eq!(ini.get("settings", "exclude"), Some("none"));
    }

    #[test]
    fn test_multiline_roundtrip() {
        let content = "[settings]\nhide_file_names =\n  secret.*\n  ^/private/\n";
        let ini = Ini::parse(content);
        let reparsed = Ini::parse(&ini.to_string());

        assert_eq!(
            reparsed.get("settings", "hide_file_names"),
            ini.get("settings", "hide_file_names")
        );
    }

    #[test]
    fn test_value_containing_equals() {
        let ini = Ini::parse("[projectmap]\nprojects/foo = new project name\na/b = {0}-ok\n");
        assert_eq!(ini.get("projectmap", "projects/foo"), Some("new project name"));
        assert_eq!(ini.get("projectmap", "a/b"), Some("{0}-ok"));
    }

    #[test]
    fn test_set_and_remove() {
        let mut ini = Ini::default();
        ini.set("internal", "backoff_retries", "2");
        assert_eq!(ini.get("internal", "backoff_retries"), Some("2"));

        ini.set("internal", "backoff_retries", "3");
        assert_eq!(ini.get("internal", "backoff_retries"), Some("3"));

        assert!(ini.remove("internal", "backoff_retries"));
        assert!(!ini.remove("internal", "backoff_retries"));
        assert_eq!(ini.get("internal", "backoff_retries"), None);
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sub").join("test.cfg");

        let mut ini = Ini::default();
        ini.set("settings", "api_key", "abc");
        ini.set("git", "project_from_git_remote", "true");
        ini.save(&path).unwrap();

        let loaded = Ini::load(&path).unwrap();
        assert_eq!(loaded.get("settings", "api_key"), Some("abc"));
        assert_eq!(loaded.get("git", "project_from_git_remote"), Some("true"));
    }

    #[test]
    fn test_load_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let ini = Ini::load(&dir.path().join("nope.cfg")).unwrap();
        assert_eq!(ini.get("settings", "api_key"), None);
    }
}
