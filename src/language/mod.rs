//! Language detection for file heartbeats.
//!
//! Resolution order: a small special-case table by exact filename and by
//! C-family companion files, then the catalogue (the lexer contract), then
//! content overrides (vim modelines, Forth vs F# for `.fs`), and finally
//! the caller-supplied alternate.

pub mod catalogue;

pub use catalogue::Language;

use std::fs;
use std::io::Read;
use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::heartbeat::{Context, EntityType, Heartbeat, Stage};

/// How much of the file content overrides may inspect.
const CONTENT_HEAD_BYTES: usize = 4096;

lazy_static! {
    static ref VIM_MODELINE_RE: Regex =
        Regex::new(r"vim:\s*(?:set\s+)?(?:ft|filetype)\s*=\s*([a-zA-Z0-9_+-]+)").unwrap();
    static ref FORTH_WORD_RE: Regex = Regex::new(r":[^\n\r]+;[\n\r]").unwrap();
}

/// Pipeline stage attaching the detected language.
pub struct LanguageStage {
    guess_language: bool,
}

impl LanguageStage {
    pub fn new(guess_language: bool) -> Self {
        Self { guess_language }
    }
}

impl Stage for LanguageStage {
    fn name(&self) -> &'static str {
        "language detection"
    }

    fn process(&self, _ctx: &Context, mut batch: Vec<Heartbeat>) -> anyhow::Result<Vec<Heartbeat>> {
        for h in &mut batch {
            if h.entity_type != EntityType::File || h.language.is_some() {
                continue;
            }

            match detect(Path::new(h.content_path()), self.guess_language) {
                Some(language) => h.language = Some(language.to_string()),
                None => {
                    if let Some(alternate) = h.language_alternate.clone().filter(|l| !l.is_empty())
                    {
                        h.language = Some(alternate);
                    } else {
                        debug!("failed to detect language of file entity {:?}", h.entity);
                    }
                }
            }
        }

        Ok(batch)
    }
}

/// Detect the language of a file. `guess_language` gates the catalogue
/// lookup; the special-case table always applies.
pub fn detect(path: &Path, guess_language: bool) -> Option<Language> {
    if let Some(language) = detect_special_cases(path) {
        return Some(language);
    }

    let head = read_head(path);

    let mut best: Option<(Language, f32)> = None;
    if guess_language {
        best = catalogue::detect(path, &head);
    }

    best = apply_overrides(path, &head, best);

    best.map(|(language, _)| language)
}

/// Exact-filename and C-family companion-file handling, which wins over
/// the catalogue outright.
fn detect_special_cases(path: &Path) -> Option<Language> {
    let filename = path.file_name()?.to_string_lossy();

    match filename.as_ref() {
        "go.mod" => return Some(Language::Go),
        "CMakeLists.txt" => return Some(Language::CMake),
        _ => {}
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    // Headers and C-ish sources disambiguate by their neighbours.
    if ext.starts_with('h') || ext.starts_with('c') {
        if companion_exists(path, "c") {
            return Some(Language::C);
        }
        if companion_exists(path, "m") {
            return Some(Language::ObjectiveC);
        }
        if companion_exists(path, "mm") {
            return Some(Language::ObjectiveCpp);
        }

        if let Some(dir) = path.parent() {
            let extensions = folder_extensions(dir);

            const CPP_EXTENSIONS: &[&str] = &["cpp", "hpp", "c++", "h++", "cc", "hh", "cxx", "hxx", "cp"];
            if extensions.iter().any(|e| CPP_EXTENSIONS.contains(&e.as_str())) {
                return Some(Language::Cpp);
            }

            if ext == "h" && extensions.iter().any(|e| e == "c") {
                return Some(Language::C);
            }
        }
    }

    if ext == "m" && companion_exists(path, "h") {
        return Some(Language::ObjectiveC);
    }

    if ext == "mm" && companion_exists(path, "h") {
        return Some(Language::ObjectiveCpp);
    }

    None
}

/// Whether a sibling file with the same stem and the given extension
/// exists.
fn companion_exists(path: &Path, ext: &str) -> bool {
    path.with_extension(ext).is_file()
}

/// Lowercased extensions present in a directory.
fn folder_extensions(dir: &Path) -> Vec<String> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    entries
        .flatten()
        .filter_map(|entry| {
            entry
                .path()
                .extension()
                .map(|e| e.to_string_lossy().to_lowercase())
        })
        .collect()
}

/// Content-based overrides: a vim modeline or, for `.fs`, Forth vs F#
/// heuristics. An override displaces the catalogue candidate only when
/// its weight reaches the catalogue's confidence.
fn apply_overrides(
    path: &Path,
    head: &str,
    best: Option<(Language, f32)>,
) -> Option<(Language, f32)> {
    let confidence = best.map(|(_, c)| c).unwrap_or(0.0);
    let mut best = best;

    if let Some((language, weight)) = detect_vim_modeline(head) {
        if weight > confidence {
            best = Some((language, weight));
        }
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if ext == "fs" {
        if let Some(weight) = forth_weight(head) {
            if weight >= confidence {
                best = Some((Language::Forth, weight));
            }
        }

        if let Some(weight) = fsharp_weight(head) {
            if weight >= best.map(|(_, c)| c).unwrap_or(0.0) {
                best = Some((Language::FSharp, weight));
            }
        }
    }

    best
}

fn detect_vim_modeline(head: &str) -> Option<(Language, f32)> {
    let captures = VIM_MODELINE_RE.captures(head)?;
    let language = Language::parse(&captures[1])?;
    Some((language, 1.0))
}

fn forth_weight(text: &str) -> Option<f32> {
    let mut weight: f32 = 0.0;

    if FORTH_WORD_RE.is_match(text) {
        weight = 0.9;
    }
    if text.contains("\\ ") {
        weight += 0.5;
    }
    if text.contains("( ") {
        weight += 0.2;
    }

    (weight > 0.0).then_some(weight.min(1.0))
}

fn fsharp_weight(text: &str) -> Option<f32> {
    let mut weight: f32 = 0.0;

    if text.contains("let ") && text.contains("match ") && text.contains(" ->") {
        weight = 0.9;
    }
    if text.contains("// ") || (text.contains("(* ") && text.contains(" *)")) {
        weight += 0.7;
    }

    (weight > 0.0).then_some(weight.min(1.0))
}

fn read_head(path: &Path) -> String {
    let Ok(file) = fs::File::open(path) else {
        return String::new();
    };

    let mut buf = vec![0u8; CONTENT_HEAD_BYTES];
    let mut handle = file.take(CONTENT_HEAD_BYTES as u64);
    let Ok(n) = handle.read(&mut buf) else {
        return String::new();
    };

    buf.truncate(n);
    String::from_utf8_lossy(&buf).to_string()
}
