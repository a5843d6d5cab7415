//! Comment extraction for source files.
//!
//! License headers are usually embedded in comments, so when a candidate
//! file is recognizable source code only its comment bodies are worth
//! classifying. Languages are grouped by comment syntax rather than by
//! grammar; string literals are not recognized, so a marker inside a string
//! is treated as the start of a comment.

use std::path::Path;

/// Comment syntax family of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    /// `//` and `/* */`
    CStyle,
    /// `#`
    Hash,
    /// `--`
    DoubleDash,
    /// `;`
    Semicolon,
    /// `%`
    Percent,
    /// `<!-- -->`
    Markup,
}

struct Syntax {
    line: &'static [&'static str],
    block: Option<(&'static str, &'static str)>,
}

impl Language {
    fn syntax(self) -> Syntax {
        match self {
            Language::CStyle => Syntax {
                line: &["//"],
                block: Some(("/*", "*/")),
            },
            Language::Hash => Syntax { line: &["#"], block: None },
            Language::DoubleDash => Syntax { line: &["--"], block: None },
            Language::Semicolon => Syntax { line: &[";"], block: None },
            Language::Percent => Syntax { line: &["%"], block: None },
            Language::Markup => Syntax {
                line: &[],
                block: Some(("<!--", "-->")),
            },
        }
    }
}

/// Guess the comment syntax of `path` from its file name.
///
/// Returns `None` for plain text, which is how `LICENSE`, `COPYING` and
/// `LICENSE.md` come out.
pub fn detect_language(path: &Path) -> Option<Language> {
    let name = path.file_name()?.to_str()?;
    match name {
        "Makefile" | "makefile" | "GNUmakefile" | "Dockerfile" | "CMakeLists.txt" => {
            return Some(Language::Hash);
        }
        _ => {}
    }

    let ext = path.extension()?.to_str()?.to_lowercase();
    let language = match ext.as_str() {
        "c" | "h" | "cc" | "cpp" | "cxx" | "hh" | "hpp" | "go" | "rs" | "java" | "js"
        | "jsx" | "mjs" | "ts" | "tsx" | "cs" | "swift" | "kt" | "kts" | "scala" | "dart"
        | "php" | "groovy" | "m" | "mm" | "proto" | "css" | "scss" | "less" | "zig" => {
            Language::CStyle
        }
        "py" | "rb" | "pl" | "pm" | "sh" | "bash" | "zsh" | "fish" | "r" | "yaml" | "yml"
        | "toml" | "cmake" | "ps1" | "tf" | "nix" => Language::Hash,
        "lua" | "sql" | "hs" | "ada" | "adb" | "ads" | "elm" => Language::DoubleDash,
        "lisp" | "lsp" | "clj" | "cljs" | "el" | "scm" | "asm" | "s" => Language::Semicolon,
        "erl" | "hrl" | "tex" => Language::Percent,
        "html" | "htm" | "xml" | "xhtml" | "svg" | "vue" => Language::Markup,
        _ => return None,
    };
    Some(language)
}

/// Lazily split `text` into comment bodies.
///
/// Consecutive line comments form one chunk; every block comment is its own
/// chunk. With no language the whole text is yielded once, unchanged.
pub fn chunks(text: &str, language: Option<Language>) -> Chunks<'_> {
    Chunks {
        text,
        pos: 0,
        syntax: language.map(Language::syntax),
        done: false,
    }
}

pub struct Chunks<'a> {
    text: &'a str,
    pos: usize,
    syntax: Option<Syntax>,
    done: bool,
}

impl Iterator for Chunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.syntax.is_none() {
            if self.done {
                return None;
            }
            self.done = true;
            return Some(self.text.to_string());
        }

        loop {
            let chunk = self.next_comment()?;
            if !chunk.is_empty() {
                return Some(chunk);
            }
        }
    }
}

impl Chunks<'_> {
    fn next_comment(&mut self) -> Option<String> {
        let text = self.text;
        let syntax = self.syntax.as_ref()?;
        let mut run: Vec<&str> = Vec::new();

        while self.pos < text.len() {
            let rest = &text[self.pos..];
            let line_len = rest.find('\n').map_or(rest.len(), |i| i + 1);
            let line = &rest[..line_len];
            let trimmed = line.trim_start();

            if let Some(body) = syntax
                .line
                .iter()
                .find_map(|marker| trimmed.strip_prefix(*marker))
            {
                run.push(strip_marker_noise(body));
                self.pos += line_len;
                continue;
            }

            // Emit the pending run before looking at this line again.
            if !run.is_empty() {
                break;
            }

            if let Some((open, close)) = syntax.block {
                if let Some(start) = line.find(open) {
                    let body_start = self.pos + start + open.len();
                    let after = &text[body_start..];
                    let (body, consumed) = match after.find(close) {
                        Some(end) => (&after[..end], end + close.len()),
                        None => (after, after.len()),
                    };
                    self.pos = body_start + consumed;
                    return Some(clean_block(body));
                }
            }

            self.pos += line_len;
            if let Some(body) = syntax
                .line
                .iter()
                .find_map(|marker| line.find(*marker).map(|i| &line[i + marker.len()..]))
            {
                return Some(strip_marker_noise(body).to_string());
            }
        }

        if run.is_empty() {
            None
        } else {
            Some(run.join("\n").trim().to_string())
        }
    }
}

/// Drop doc-comment sigils such as the extra `/` of `///` or the `!` of `//!`.
fn strip_marker_noise(body: &str) -> &str {
    body.trim_start_matches(['/', '#', '-', ';', '%', '!']).trim()
}

/// Strip the leading `*` gutter that block comments conventionally carry.
fn clean_block(body: &str) -> String {
    body.lines()
        .map(|line| {
            let line = line.trim();
            line.strip_prefix('*').unwrap_or(line).trim()
        })
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
