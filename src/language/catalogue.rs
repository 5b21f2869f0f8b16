//! Language catalogue: the lexer contract.
//!
//! Maps filenames and extensions to a best candidate with a confidence in
//! `[0, 1]`. This stands in for a full lexer table; the detector only
//! requires the `(filename, content head) -> (language, confidence)`
//! shape, so ambiguous extensions simply report lower confidence and let
//! the content overrides win.

use std::fmt;
use std::path::Path;

/// Canonical language vocabulary used on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    AppleScript,
    Assembly,
    Bash,
    Basic,
    C,
    Clojure,
    CMake,
    CoffeeScript,
    Cpp,
    Crystal,
    CSharp,
    Css,
    Dart,
    Dockerfile,
    Elixir,
    Elm,
    Erlang,
    Forth,
    FSharp,
    GDScript,
    Go,
    Groovy,
    Haml,
    Haskell,
    Haxe,
    Html,
    Ini,
    Java,
    JavaScript,
    Json,
    Jsx,
    Julia,
    Kotlin,
    Latex,
    Less,
    Lisp,
    Lua,
    Makefile,
    Markdown,
    Matlab,
    Nim,
    ObjectiveC,
    ObjectiveCpp,
    OCaml,
    Pascal,
    Perl,
    Php,
    PowerShell,
    Prolog,
    Protobuf,
    Python,
    R,
    ReStructuredText,
    Ruby,
    Rust,
    Sass,
    Scala,
    Scheme,
    Scss,
    Smalltalk,
    Sql,
    Svelte,
    Swift,
    Text,
    Toml,
    Tsx,
    TypeScript,
    VbNet,
    Vue,
    Xml,
    Yaml,
    Zig,
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Language::AppleScript => "AppleScript",
            Language::Assembly => "Assembly",
            Language::Bash => "Bash",
            Language::Basic => "Basic",
            Language::C => "C",
            Language::Clojure => "Clojure",
            Language::CMake => "CMake",
            Language::CoffeeScript => "CoffeeScript",
            Language::Cpp => "C++",
            Language::Crystal => "Crystal",
            Language::CSharp => "C#",
            Language::Css => "CSS",
            Language::Dart => "Dart",
            Language::Dockerfile => "Dockerfile",
            Language::Elixir => "Elixir",
            Language::Elm => "Elm",
            Language::Erlang => "Erlang",
            Language::Forth => "Forth",
            Language::FSharp => "F#",
            Language::GDScript => "GDScript",
            Language::Go => "Go",
            Language::Groovy => "Groovy",
            Language::Haml => "Haml",
            Language::Haskell => "Haskell",
            Language::Haxe => "Haxe",
            Language::Html => "HTML",
            Language::Ini => "INI",
            Language::Java => "Java",
            Language::JavaScript => "JavaScript",
            Language::Json => "JSON",
            Language::Jsx => "JSX",
            Language::Julia => "Julia",
            Language::Kotlin => "Kotlin",
            Language::Latex => "LaTeX",
            Language::Less => "LESS",
            Language::Lisp => "Common Lisp",
            Language::Lua => "Lua",
            Language::Makefile => "Makefile",
            Language::Markdown => "Markdown",
            Language::Matlab => "Matlab",
            Language::Nim => "Nim",
            Language::ObjectiveC => "Objective-C",
            Language::ObjectiveCpp => "Objective-C++",
            Language::OCaml => "OCaml",
            Language::Pascal => "Pascal",
            Language::Perl => "Perl",
            Language::Php => "PHP",
            Language::PowerShell => "PowerShell",
            Language::Prolog => "Prolog",
            Language::Protobuf => "Protocol Buffer",
            Language::Python => "Python",
            Language::R => "R",
            Language::ReStructuredText => "reStructuredText",
            Language::Ruby => "Ruby",
            Language::Rust => "Rust",
            Language::Sass => "Sass",
            Language::Scala => "Scala",
            Language::Scheme => "Scheme",
            Language::Scss => "SCSS",
            Language::Smalltalk => "Smalltalk",
            Language::Sql => "SQL",
            Language::Svelte => "Svelte",
            Language::Swift => "Swift",
            Language::Text => "Text",
            Language::Toml => "TOML",
            Language::Tsx => "TSX",
            Language::TypeScript => "TypeScript",
            Language::VbNet => "VB.net",
            Language::Vue => "Vue.js",
            Language::Xml => "XML",
            Language::Yaml => "YAML",
            Language::Zig => "Zig",
        };
        write!(f, "{}", name)
    }
}

impl Language {
    /// Parse a canonical name or a common alias (editor filetype names,
    /// lowercase spellings). Returns `None` for unknown names.
    pub fn parse(s: &str) -> Option<Self> {
        let lowered = s.trim().to_lowercase();

        let language = match lowered.as_str() {
            "applescript" => Language::AppleScript,
            "assembly" | "asm" => Language::Assembly,
            "bash" | "sh" | "shell" | "zsh" => Language::Bash,
            "basic" => Language::Basic,
            "c" => Language::C,
            "clojure" => Language::Clojure,
            "cmake" => Language::CMake,
            "coffeescript" | "coffee" => Language::CoffeeScript,
            "c++" | "cpp" => Language::Cpp,
            "crystal" => Language::Crystal,
            "c#" | "csharp" | "cs" => Language::CSharp,
            "css" => Language::Css,
            "dart" => Language::Dart,
            "dockerfile" => Language::Dockerfile,
            "elixir" => Language::Elixir,
            "elm" => Language::Elm,
            "erlang" => Language::Erlang,
            "forth" => Language::Forth,
            "f#" | "fsharp" => Language::FSharp,
            "gdscript" => Language::GDScript,
            "go" | "golang" => Language::Go,
            "groovy" => Language::Groovy,
            "haml" => Language::Haml,
            "haskell" => Language::Haskell,
            "haxe" => Language::Haxe,
            "html" => Language::Html,
            "ini" | "dosini" => Language::Ini,
            "java" => Language::Java,
            "javascript" | "js" => Language::JavaScript,
            "json" => Language::Json,
            "jsx" | "javascriptreact" => Language::Jsx,
            "julia" => Language::Julia,
            "kotlin" => Language::Kotlin,
            "latex" | "tex" => Language::Latex,
            "less" => Language::Less,
            "common lisp" | "lisp" => Language::Lisp,
            "lua" => Language::Lua,
            "makefile" | "make" => Language::Makefile,
            "markdown" => Language::Markdown,
            "matlab" => Language::Matlab,
            "nim" => Language::Nim,
            "objective-c" | "objectivec" | "objc" => Language::ObjectiveC,
            "objective-c++" | "objectivecpp" => Language::ObjectiveCpp,
            "ocaml" => Language::OCaml,
            "pascal" => Language::Pascal,
            "perl" => Language::Perl,
            "php" => Language::Php,
            "powershell" | "ps1" => Language::PowerShell,
            "prolog" => Language::Prolog,
            "protocol buffer" | "proto" => Language::Protobuf,
            "python" | "py" => Language::Python,
            "r" => Language::R,
            "restructuredtext" | "rst" => Language::ReStructuredText,
            "ruby" | "rb" => Language::Ruby,
            "rust" | "rs" => Language::Rust,
            "sass" => Language::Sass,
            "scala" => Language::Scala,
            "scheme" => Language::Scheme,
            "scss" => Language::Scss,
            "smalltalk" => Language::Smalltalk,
            "sql" => Language::Sql,
            "svelte" => Language::Svelte,
            "swift" => Language::Swift,
            "text" | "plain text" => Language::Text,
            "toml" => Language::Toml,
            "tsx" | "typescriptreact" => Language::Tsx,
            "typescript" | "ts" => Language::TypeScript,
            "vb.net" | "vbnet" | "vb" => Language::VbNet,
            "vue.js" | "vue" => Language::Vue,
            "xml" => Language::Xml,
            "yaml" | "yml" => Language::Yaml,
            "zig" => Language::Zig,
            _ => return None,
        };

        Some(language)
    }
}

/// Full-confidence filename matches.
fn by_filename(filename: &str) -> Option<Language> {
    let language = match filename {
        "Dockerfile" => Language::Dockerfile,
        "Makefile" | "makefile" | "GNUmakefile" => Language::Makefile,
        "Rakefile" | "Gemfile" => Language::Ruby,
        "Vagrantfile" => Language::Ruby,
        "CMakeLists.txt" => Language::CMake,
        "go.mod" | "go.sum" => Language::Go,
        "Cargo.lock" => Language::Toml,
        ".babelrc" | ".eslintrc" => Language::Json,
        _ => return None,
    };

    Some(language)
}

/// Extension table. The second tuple element is the confidence; ambiguous
/// extensions score below 1 so content overrides can displace them.
fn by_extension(ext: &str) -> Option<(Language, f32)> {
    let hit = match ext {
        "applescript" | "scpt" => (Language::AppleScript, 1.0),
        "asm" | "s" => (Language::Assembly, 0.8),
        "bash" | "sh" | "zsh" | "ksh" => (Language::Bash, 1.0),
        "bas" => (Language::Basic, 0.8),
        "c" => (Language::C, 0.9),
        "clj" | "cljs" | "cljc" => (Language::Clojure, 1.0),
        "cmake" => (Language::CMake, 1.0),
        "coffee" => (Language::CoffeeScript, 1.0),
        "cpp" | "cxx" | "cc" | "c++" | "hpp" | "hxx" | "hh" | "h++" => (Language::Cpp, 1.0),
        "cr" => (Language::Crystal, 1.0),
        "cs" => (Language::CSharp, 1.0),
        "css" => (Language::Css, 1.0),
        "dart" => (Language::Dart, 1.0),
        "ex" | "exs" => (Language::Elixir, 1.0),
        "elm" => (Language::Elm, 1.0),
        "erl" | "hrl" => (Language::Erlang, 1.0),
        "4th" | "forth" | "frt" => (Language::Forth, 1.0),
        "fs" => (Language::FSharp, 0.45),
        "fsi" | "fsx" => (Language::FSharp, 1.0),
        "gd" => (Language::GDScript, 1.0),
        "go" => (Language::Go, 1.0),
        "groovy" | "gradle" => (Language::Groovy, 1.0),
        "h" => (Language::C, 0.5),
        "haml" => (Language::Haml, 1.0),
        "hs" | "lhs" => (Language::Haskell, 1.0),
        "hx" => (Language::Haxe, 1.0),
        "html" | "htm" | "xhtml" => (Language::Html, 1.0),
        "ini" | "cfg" | "conf" => (Language::Ini, 0.8),
        "java" => (Language::Java, 1.0),
        "js" | "mjs" | "cjs" => (Language::JavaScript, 1.0),
        "json" => (Language::Json, 1.0),
        "jsx" => (Language::Jsx, 1.0),
        "jl" => (Language::Julia, 1.0),
        "kt" | "kts" => (Language::Kotlin, 1.0),
        "tex" => (Language::Latex, 0.9),
        "less" => (Language::Less, 1.0),
        "lisp" | "lsp" => (Language::Lisp, 1.0),
        "lua" => (Language::Lua, 1.0),
        "md" | "markdown" => (Language::Markdown, 1.0),
        "m" => (Language::ObjectiveC, 0.5),
        "mm" => (Language::ObjectiveCpp, 0.8),
        "nim" => (Language::Nim, 1.0),
        "ml" | "mli" => (Language::OCaml, 1.0),
        "pas" | "pp" => (Language::Pascal, 1.0),
        "pl" | "pm" => (Language::Perl, 0.9),
        "php" => (Language::Php, 1.0),
        "ps1" | "psm1" => (Language::PowerShell, 1.0),
        "pro" => (Language::Prolog, 0.6),
        "proto" => (Language::Protobuf, 1.0),
        "py" | "pyw" | "pyi" => (Language::Python, 1.0),
        "r" => (Language::R, 0.9),
        "rst" => (Language::ReStructuredText, 1.0),
        "rb" | "rake" | "gemspec" => (Language::Ruby, 1.0),
        "rs" => (Language::Rust, 1.0),
        "sass" => (Language::Sass, 1.0),
        "scala" | "sc" => (Language::Scala, 1.0),
        "scm" | "ss" => (Language::Scheme, 1.0),
        "scss" => (Language::Scss, 1.0),
        "st" => (Language::Smalltalk, 0.8),
        "sql" => (Language::Sql, 1.0),
        "svelte" => (Language::Svelte, 1.0),
        "swift" => (Language::Swift, 1.0),
        "txt" => (Language::Text, 0.9),
        "toml" => (Language::Toml, 1.0),
        "tsx" => (Language::Tsx, 1.0),
        "ts" | "mts" | "cts" => (Language::TypeScript, 1.0),
        "vb" => (Language::VbNet, 1.0),
        "vue" => (Language::Vue, 1.0),
        "xml" | "xsd" | "xsl" => (Language::Xml, 1.0),
        "yaml" | "yml" => (Language::Yaml, 1.0),
        "zig" => (Language::Zig, 1.0),
        _ => return None,
    };

    Some(hit)
}

/// The lexer contract: best candidate for a path, with confidence.
///
/// `head` is the beginning of the file contents; it is consulted only for
/// shebang lines today, but the signature leaves room for content-keyed
/// catalogues.
pub fn detect(path: &Path, head: &str) -> Option<(Language, f32)> {
    let filename = path.file_name()?.to_string_lossy();

    if let Some(language) = by_filename(&filename) {
        return Some((language, 1.0));
    }

    let ext = path
        .extension()
        .map(|e| e.to_string_lossy().to_lowercase())
        .unwrap_or_default();

    if let Some(hit) = by_extension(&ext) {
        return Some(hit);
    }

    if ext.is_empty() {
        if let Some(language) = by_shebang(head) {
            return Some((language, 0.9));
        }
    }

    None
}

fn by_shebang(head: &str) -> Option<Language> {
    let first = head.lines().next()?;
    let interpreter = first.strip_prefix("#!")?;

    // Last path segment, skipping an env indirection.
    let mut parts = interpreter.split_whitespace();
    let mut program = parts.next()?.rsplit('/').next()?;
    if program == "env" {
        program = parts.next()?;
    }

    let program = program.trim_start_matches(|c: char| !c.is_alphabetic());
    let program: String = program.chars().take_while(|c| c.is_alphabetic()).collect();

    Language::parse(&program)
}
