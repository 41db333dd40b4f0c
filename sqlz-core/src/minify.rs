//! SQL minification.
//!
//! Two modes are offered. [`BlockComments::PerLine`] is the historical
//! behaviour: every line is handled on its own, so a `/* ... */` comment that
//! opens on one line and closes on another survives, and comment markers inside
//! string literals are stripped like any other. [`BlockComments::Spanning`]
//! scans the whole text once, understands quoted literals and removes comments
//! across line boundaries.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlockComments {
    #[default]
    PerLine,
    Spanning,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct Minifier {
    pub block_comments: BlockComments,
}

/// Minify with the default (per-line) rules.
pub fn minify(text: &str) -> String {
    Minifier::default().minify(text)
}

impl Minifier {
    pub fn new(block_comments: BlockComments) -> Self {
        Self { block_comments }
    }

    pub fn minify(&self, text: &str) -> String {
        match self.block_comments {
            BlockComments::PerLine => minify_per_line(text),
            BlockComments::Spanning => minify_spanning(text),
        }
    }
}

fn minify_per_line(text: &str) -> String {
    let joined = text
        .split('\n')
        .map(|line| {
            let line = strip_line_comment(line.trim());
            strip_inline_block_comments(line).trim().to_string()
        })
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(" ");
    collapse_whitespace(&joined)
}

fn strip_line_comment(line: &str) -> &str {
    match line.find("--") {
        Some(at) => &line[..at],
        None => line,
    }
}

/// Removes every `/* ... */` span that both opens and closes inside `line`.
/// An unclosed opener is left untouched.
fn strip_inline_block_comments(line: &str) -> String {
    let mut out = String::with_capacity(line.len());
    let mut rest = line;
    while let Some(open) = rest.find("/*") {
        match rest[open + 2..].find("*/") {
            Some(close) => {
                out.push_str(&rest[..open]);
                rest = &rest[open + 2 + close + 2..];
            }
            None => break,
        }
    }
    out.push_str(rest);
    out
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scan {
    Code,
    LineComment,
    BlockComment,
    Quoted(char),
}

fn minify_spanning(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut state = Scan::Code;
    // A separator is owed before the next emitted code character.
    let mut pending_space = false;
    let mut chars = text.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            Scan::Code => {
                if c == '-' && chars.peek() == Some(&'-') {
                    chars.next();
                    state = Scan::LineComment;
                    pending_space = true;
                } else if c == '/' && chars.peek() == Some(&'*') {
                    chars.next();
                    state = Scan::BlockComment;
                    pending_space = true;
                } else if c.is_whitespace() {
                    pending_space = true;
                } else {
                    if pending_space && !out.is_empty() {
                        out.push(' ');
                    }
                    pending_space = false;
                    out.push(c);
                    if c == '\'' || c == '"' {
                        state = Scan::Quoted(c);
                    }
                }
            }
            Scan::LineComment => {
                if c == '\n' {
                    state = Scan::Code;
                }
            }
            Scan::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = Scan::Code;
                }
            }
            Scan::Quoted(quote) => {
                out.push(c);
                // A doubled quote closes and immediately reopens, which keeps
                // `'it''s'` inside one literal.
                if c == quote {
                    state = Scan::Code;
                }
            }
        }
    }
    out
}
