use std::sync::OnceLock;

use regex::Regex;

use crate::dom::{HostDom, NodeId, SelectorChain};

/// Result of locating and cleaning the in-progress draft. Explicit variants
/// rather than thrown errors: "nothing to do" is an expected, frequent state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DraftOutcome {
    Text { input: NodeId, text: String },
    Empty,
    MissingInput,
}

/// The host's composer shows a trailing "Message <target>" placeholder that
/// leaks into text extraction; strip it from the final line together with
/// anything after it.
fn placeholder_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"(?i)\s*Message\s+[^\n]*$").expect("static pattern"))
}

pub fn clean_draft(raw: &str) -> String {
    placeholder_pattern().replace(raw, "").trim().to_string()
}

/// Locate the compose box and pull its current text. A rich editor keeps one
/// paragraph element per line; those are joined with explicit newlines to
/// preserve line structure. Anything else falls back to plain text.
pub fn extract_draft(dom: &dyn HostDom, input_chain: &SelectorChain) -> DraftOutcome {
    let Some(input) = input_chain.first_match(dom) else {
        return DraftOutcome::MissingInput;
    };

    let paragraphs = dom.paragraph_texts(input);
    let raw = if paragraphs.is_empty() {
        dom.text_content(input)
    } else {
        paragraphs.join("\n")
    };

    let text = clean_draft(&raw);
    if text.is_empty() {
        DraftOutcome::Empty
    } else {
        DraftOutcome::Text { input, text }
    }
}
