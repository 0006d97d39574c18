//! # Text Normalization
//!
//! Turns raw PDF-extracted text into a clean, size-bounded representation:
//! a plain-text form with collapsed whitespace and de-hyphenated line wraps,
//! and a markdown-flavored form that preserves paragraph breaks and any
//! detected headings and lists.
//!
//! Normalization is pure and deterministic: the same input always yields the
//! same output, and nothing here touches the network or the database.

use thiserror::Error;

/// Ceiling on the normalized text retained per document, in characters.
/// PDFs occasionally decode to megabytes of vector-art noise; content past
/// this point adds nothing the extraction prompts can use.
const MAX_NORMALIZED_CHARS: usize = 200_000;

/// Fraction of control/replacement characters above which the input is
/// treated as binary garbage rather than text.
const MAX_GARBAGE_RATIO: f64 = 0.3;

/// Upper bound on the length of a line that can be promoted to a heading.
const MAX_HEADING_CHARS: usize = 80;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum NormalizeError {
    /// The input is empty, whitespace-only, or not text at all. Recorded by
    /// callers as a partial/failed ingestion state, never a crash.
    #[error("Input is empty or contains no extractable text")]
    Unextractable,
}

/// The two renderings produced by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedText {
    /// Collapsed plain text: paragraphs separated by blank lines, soft line
    /// wraps joined, hyphenated wraps repaired.
    pub text: String,
    /// Markdown-safe rendering with `##` headings and `-` list items.
    pub markdown: String,
}

/// Normalizes raw decoded text.
///
/// Returns [`NormalizeError::Unextractable`] for empty or binary input so
/// downstream stages can record a failed state instead of aborting the whole
/// ingestion.
pub fn normalize(raw: &str) -> Result<NormalizedText, NormalizeError> {
    let bounded: String = raw.chars().take(MAX_NORMALIZED_CHARS).collect();
    let trimmed = bounded.trim();
    if trimmed.is_empty() {
        return Err(NormalizeError::Unextractable);
    }
    if garbage_ratio(trimmed) > MAX_GARBAGE_RATIO {
        return Err(NormalizeError::Unextractable);
    }
    if !trimmed.chars().any(|c| c.is_alphabetic()) {
        return Err(NormalizeError::Unextractable);
    }

    let paragraphs = split_paragraphs(trimmed);

    let mut text_parts = Vec::with_capacity(paragraphs.len());
    let mut markdown_parts = Vec::with_capacity(paragraphs.len());
    for lines in &paragraphs {
        let joined = join_wrapped_lines(lines);
        if joined.is_empty() {
            continue;
        }
        markdown_parts.push(render_markdown_paragraph(lines, &joined));
        text_parts.push(joined);
    }

    if text_parts.is_empty() {
        return Err(NormalizeError::Unextractable);
    }

    Ok(NormalizedText {
        text: text_parts.join("\n\n"),
        markdown: markdown_parts.join("\n\n"),
    })
}

/// Share of control/replacement characters in the input.
fn garbage_ratio(text: &str) -> f64 {
    let mut total = 0usize;
    let mut garbage = 0usize;
    for c in text.chars() {
        total += 1;
        let is_control = c.is_control() && !matches!(c, '\n' | '\t' | '\r');
        if is_control || c == '\u{FFFD}' {
            garbage += 1;
        }
    }
    if total == 0 {
        return 1.0;
    }
    garbage as f64 / total as f64
}

/// Splits the input into paragraphs: runs of non-blank lines.
fn split_paragraphs(text: &str) -> Vec<Vec<String>> {
    let mut paragraphs = Vec::new();
    let mut current: Vec<String> = Vec::new();
    for raw_line in text.replace("\r\n", "\n").replace('\r', "\n").lines() {
        let line = collapse_spaces(raw_line);
        if line.is_empty() {
            if !current.is_empty() {
                paragraphs.push(std::mem::take(&mut current));
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        paragraphs.push(current);
    }
    paragraphs
}

/// Collapses runs of spaces and tabs and strips stray control characters.
fn collapse_spaces(line: &str) -> String {
    line.split_whitespace()
        .map(|word| {
            word.chars()
                .filter(|c| !c.is_control() && *c != '\u{FFFD}')
                .collect::<String>()
        })
        .filter(|word| !word.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Joins the soft-wrapped lines of one paragraph into a single line,
/// repairing hyphenated line wraps (`exam-` + `ple` becomes `example`).
fn join_wrapped_lines(lines: &[String]) -> String {
    let mut out = String::new();
    for line in lines {
        if ends_with_wrap_hyphen(&out) && starts_lowercase(line) {
            out.pop();
            out.push_str(line);
        } else {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(line);
        }
    }
    out
}

/// True when the accumulated text ends in `letter-`, the signature of a
/// hyphenated line wrap (as opposed to a dash or em-dash run).
fn ends_with_wrap_hyphen(text: &str) -> bool {
    let mut chars = text.chars().rev();
    matches!(
        (chars.next(), chars.next()),
        (Some('-'), Some(prev)) if prev.is_alphabetic()
    )
}

fn starts_lowercase(line: &str) -> bool {
    line.chars().next().is_some_and(|c| c.is_lowercase())
}

/// Renders one paragraph for the markdown form: headings get `##`, list
/// items get `-`, everything else passes through joined.
fn render_markdown_paragraph(lines: &[String], joined: &str) -> String {
    if lines.len() > 1 && lines.iter().all(|l| list_item_content(l).is_some()) {
        return lines
            .iter()
            .filter_map(|l| list_item_content(l))
            .map(|item| format!("- {item}"))
            .collect::<Vec<_>>()
            .join("\n");
    }
    if lines.len() == 1 && looks_like_heading(joined) {
        return format!("## {joined}");
    }
    joined.to_string()
}

/// Strips a leading bullet marker, returning the item text if the line is a
/// list item.
fn list_item_content(line: &str) -> Option<&str> {
    for marker in ["- ", "• ", "* "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return Some(rest.trim_start());
        }
    }
    None
}

/// A short, terminal-punctuation-free line in ALL CAPS or with a section
/// number is treated as a heading.
fn looks_like_heading(line: &str) -> bool {
    if line.chars().count() > MAX_HEADING_CHARS || line.ends_with('.') {
        return false;
    }
    let alphabetic: Vec<char> = line.chars().filter(|c| c.is_alphabetic()).collect();
    if alphabetic.is_empty() {
        return false;
    }
    let all_caps = alphabetic.iter().all(|c| c.is_uppercase());
    let numbered = starts_with_section_number(line);
    all_caps || numbered
}

/// Matches `1. Introduction` or `2.3 Results` style section openers.
fn starts_with_section_number(line: &str) -> bool {
    let mut chars = line.chars().peekable();
    let mut saw_digit = false;
    let mut saw_dot = false;
    while let Some(&c) = chars.peek() {
        if c.is_ascii_digit() {
            saw_digit = true;
            chars.next();
        } else if c == '.' && saw_digit {
            saw_dot = true;
            chars.next();
        } else {
            break;
        }
    }
    saw_digit && saw_dot && chars.peek().is_some_and(|c| *c == ' ' || c.is_alphabetic())
}
