// src/normalize.rs

//! Turns raw source text into the canonical form classifiers consume.
//!
//! Two stages: `normalize_source` runs once per file and decides which lines
//! exist for windowing; `canonicalize` runs once per window on the joined
//! window text, right before a classifier sees it.

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

pub const STRING_PLACEHOLDER: &str = "<$STRING>";
pub const NUMBER_PLACEHOLDER: &str = "<$NUMBER>";
pub const BOOLEAN_PLACEHOLDER: &str = "<$BOOLEAN>";

// Group 1 keeps quoted strings intact so comment markers inside them survive.
static COMMENT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?ms)(".*?"|'.*?')|(/\*.*?\*/|//[^\r\n]*$)"#).expect("valid comment regex")
});
static IMPORT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"import .*?;").expect("valid import regex"));
static PACKAGE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"package .*?;").expect("valid package regex"));
static LITERAL_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#""{3}.*?"{3}|'{3}.*?'{3}|".*?"|'.*?'"#).expect("valid literal regex")
});
// Groups: leading non-word char, integer part, fraction, exponent.
static NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(^|[^\w])([+-]?\d+)(\.\d+)?([eE][+-]?\d+)?").expect("valid number regex")
});
static BOOLEAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(true|false)\b").expect("valid boolean regex"));
static TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[A-Za-z0-9_$]+").expect("valid token regex"));

/// Source text normalization, supplied to records and classifier adapters.
pub trait Normalizer: Send + Sync {
    /// Cleans a whole file and returns the lines that take part in windowing.
    fn normalize_source(&self, raw: &str) -> Vec<String>;

    /// Canonical text for one window, already joined with `\n`.
    fn canonicalize(&self, window_text: &str) -> String;

    fn tokenize(&self, text: &str) -> Vec<String> {
        tokenize(text)
    }
}

/// Normalizer for Java-like sources (C-style comments, `import`/`package` lines).
#[derive(Debug, Clone, Copy, Default)]
pub struct JavaNormalizer;

impl Normalizer for JavaNormalizer {
    fn normalize_source(&self, raw: &str) -> Vec<String> {
        split_code_lines(&strip_packages(&strip_imports(&strip_comments(raw))))
    }

    fn canonicalize(&self, window_text: &str) -> String {
        let text = remove_blank_lines(window_text);
        let text = replace_literals(&text);
        let text = replace_numbers(&text);
        replace_booleans(&text)
    }
}

pub fn strip_comments(content: &str) -> String {
    COMMENT_RE
        .replace_all(content, |caps: &Captures| match caps.get(1) {
            Some(quoted) => quoted.as_str().to_string(),
            None => String::new(),
        })
        .into_owned()
}

pub fn strip_imports(content: &str) -> String {
    IMPORT_RE.replace_all(content, "").into_owned()
}

pub fn strip_packages(content: &str) -> String {
    PACKAGE_RE.replace_all(content, "").into_owned()
}

/// Splits into lines, dropping blanks and lines holding only a brace.
pub fn split_code_lines(content: &str) -> Vec<String> {
    content
        .split('\n')
        .filter(|line| !matches!(line.trim(), "" | "{" | "}"))
        .map(str::to_string)
        .collect()
}

pub fn remove_blank_lines(content: &str) -> String {
    content
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn replace_literals(content: &str) -> String {
    LITERAL_RE.replace_all(content, STRING_PLACEHOLDER).into_owned()
}

/// Replaces numeric literals that stand alone, leaving identifiers like `x2` alone.
///
/// A literal glued to a suffix falls back to its longest prefix that is not,
/// so `1.5f` becomes `<$NUMBER>.5f`.
pub fn replace_numbers(content: &str) -> String {
    let mut out = String::with_capacity(content.len());
    let mut copied = 0;
    let mut from = 0;

    while let Some(caps) = NUMBER_RE.captures_at(content, from) {
        let Some(int) = caps.get(2) else { break };
        match standalone_number_end(content, &caps) {
            Some(end) => {
                out.push_str(&content[copied..int.start()]);
                out.push_str(NUMBER_PLACEHOLDER);
                copied = end;
                from = end;
            }
            // sign and digits are ASCII, so +1 stays on a char boundary
            None => from = int.start() + 1,
        }
    }

    out.push_str(&content[copied..]);
    out
}

/// Longest of `int frac exp`, `int frac`, `int exp`, `int` not followed by a
/// word character.
fn standalone_number_end(content: &str, caps: &Captures) -> Option<usize> {
    let int = caps.get(2)?;
    let frac = caps.get(3);
    let exp = caps.get(4);

    let candidates = [exp.map(|m| m.end()), frac.map(|m| m.end()), Some(int.end())];
    candidates.into_iter().flatten().find(|&end| {
        !content[end..]
            .chars()
            .next()
            .is_some_and(|c| c.is_alphanumeric() || c == '_')
    })
}

pub fn replace_booleans(content: &str) -> String {
    BOOLEAN_RE.replace_all(content, BOOLEAN_PLACEHOLDER).into_owned()
}

pub fn tokenize(content: &str) -> Vec<String> {
    TOKEN_RE
        .find_iter(content)
        .map(|m| m.as_str().to_string())
        .collect()
}
