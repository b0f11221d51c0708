use crate::requirements::{FUNCTIONAL_HEADING, NON_FUNCTIONAL_HEADING};

/// Default cap on document characters embedded in a prompt
pub const DEFAULT_MAX_PROMPT_CHARS: usize = 500_000;

/// Build the requirements prompt for a document
///
/// The model is told to emit both heading literals verbatim so the reply can be
/// split by [`crate::requirements::HeadingParser`].
pub fn build_requirements_prompt(text: &str, max_chars: usize) -> String {
    let document = truncate_text(text, max_chars);

    format!(
        r#"Analyze the following document and extract its software requirements.

Categorize every requirement into exactly one of two sections, using these headings verbatim:

{functional}
- one functional requirement per line (what the system must do)

{non_functional}
- one non-functional requirement per line (performance, security, usability and other quality constraints)

RULES:
1. Put the functional section first, then the non-functional section
2. Write each requirement on its own line starting with "- "
3. Do not add any other headings, numbering schemes or commentary
4. If a section has no requirements, leave it empty under its heading

DOCUMENT:
{document}"#,
        functional = FUNCTIONAL_HEADING,
        non_functional = NON_FUNCTIONAL_HEADING,
        document = document
    )
}

/// Truncate `text` to at most `max_chars` bytes, preferring a paragraph break,
/// then a sentence end, then a word boundary, each only in the back half of the cut
pub fn truncate_text(text: &str, max_chars: usize) -> &str {
    if text.len() <= max_chars {
        return text;
    }

    let mut end = max_chars;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    let truncated = &text[..end];

    // Break points must fall in the back half of the window
    let late = |pos: &usize| *pos > end / 2;

    if let Some(pos) = truncated.rfind("\n\n").filter(late) {
        return &truncated[..pos];
    }

    if let Some(pos) = truncated.rfind(". ").filter(late) {
        return &truncated[..=pos];
    }

    if let Some(pos) = truncated.rfind(' ').filter(late) {
        return &truncated[..pos];
    }

    tracing::debug!(
        "[Prompts] No break point in first {} bytes, hard cut",
        end
    );
    truncated
}
