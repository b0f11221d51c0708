//! Model reply parsing
//!
//! Splits a free-text reply into functional and non-functional requirements using the
//! heading literals requested in the prompt. This is best-effort: when the model ignores
//! the headings, each missing or empty section becomes its placeholder line instead of
//! an error.

use super::{RequirementCategory, RequirementSet, FUNCTIONAL_HEADING, NON_FUNCTIONAL_HEADING};
use once_cell::sync::Lazy;
use regex::Regex;

/// Text after the functional heading, up to the non-functional heading or end of text
static FUNCTIONAL_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(
        r"(?is){}(.*?)(?:{}|\z)",
        regex::escape(FUNCTIONAL_HEADING),
        regex::escape(NON_FUNCTIONAL_HEADING)
    ))
    .expect("functional block pattern is valid")
});

/// Text after the non-functional heading, to end of text
static NON_FUNCTIONAL_BLOCK: Lazy<Regex> = Lazy::new(|| {
    Regex::new(&format!(r"(?is){}(.*)", regex::escape(NON_FUNCTIONAL_HEADING)))
        .expect("non-functional block pattern is valid")
});

/// Leading list marker: `-`, `*`, `•`, `+`, `1.` or `1)` followed by whitespace or end of
/// line, or a `-` / `•` glued to a letter (`-Logout`). Group 1 keeps that letter, so
/// signed numbers like `-1.5s` and emphasis like `*bold*` are left alone.
static LIST_MARKER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:(?:[-*•+]|\d+[.)])(?:\s+|$)|[-•](\p{L}))")
        .expect("list marker pattern is valid")
});

/// Turns a raw model reply into a [`RequirementSet`]
pub trait ResponseParser: Send + Sync {
    fn parse(&self, raw_response: &str) -> RequirementSet;
}

/// Heading-literal parser for replies formatted as requested by the prompt
#[derive(Debug, Default, Clone, Copy)]
pub struct HeadingParser;

impl ResponseParser for HeadingParser {
    fn parse(&self, raw_response: &str) -> RequirementSet {
        parse_requirements(raw_response)
    }
}

/// Parse a raw reply into requirements, substituting placeholders for missing sections
pub fn parse_requirements(raw_response: &str) -> RequirementSet {
    let functional = section_lines(
        RequirementCategory::Functional,
        capture_block(&FUNCTIONAL_BLOCK, raw_response),
    );
    let non_functional = section_lines(
        RequirementCategory::NonFunctional,
        capture_block(&NON_FUNCTIONAL_BLOCK, raw_response),
    );

    tracing::debug!(
        "[Parser] Parsed {} functional, {} non-functional requirements from {} chars",
        functional.len(),
        non_functional.len(),
        raw_response.len()
    );

    RequirementSet::new(functional, non_functional)
}

fn capture_block<'a>(pattern: &Regex, text: &'a str) -> Option<&'a str> {
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim())
}

/// Lines of a block with list markers stripped, or the category placeholder
///
/// Lines that are empty once the marker is gone (a bare `-` or `1.`) are dropped.
fn section_lines(category: RequirementCategory, block: Option<&str>) -> Vec<String> {
    let lines: Vec<String> = block
        .unwrap_or_default()
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(|line| LIST_MARKER.replace(line, "${1}").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect();

    if lines.is_empty() {
        tracing::warn!(
            "[Parser] {} section {} - using placeholder",
            category.heading(),
            if block.is_some() { "empty" } else { "missing" }
        );
        return vec![category.placeholder().to_string()];
    }

    lines
}
