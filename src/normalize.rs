//! List and text normalization
//!
//! The renderer sometimes breaks one logical list line in two: a
//! continuation introduced by a colon on the next line, or text separated
//! from its marker by a blank line. A fixed, ordered set of multiline regex
//! rewrites merges them back. Later rules rely on earlier ones having run.
//! Text inside `<pre>` blocks is never rewritten.

use log::{debug, warn};
use regex::{Captures, Regex};
use std::ops::Range;
use std::sync::OnceLock;

// ─────────────────────────────────────────────────────────────────────────────
// List Continuation Rules
// ─────────────────────────────────────────────────────────────────────────────

/// `(pattern, replacement)` in application order.
const LIST_RULES: &[(&str, &str)] = &[
    // Markdown: "- item\n  : more" -> "- item: more"
    (
        r"(?m)^([ \t]*(?:[-*+]|\d+[.)])[ \t]+[^\n]*?)[ \t]*\n[ \t]*:[ \t]*([^\n]*)$",
        "${1}: ${2}",
    ),
    // Markdown: a marker alone on its line, a blank line, then indented text
    (
        r"(?m)^([ \t]*(?:[-*+]|\d+[.)]))[ \t]*\n[ \t]*\n[ \t]+(\S[^\n]*)$",
        "${1} ${2}",
    ),
    // HTML: line break right after an opening <li> (or its paragraph)
    (r"(<li(?:\s[^>]*)?>(?:<p(?:\s[^>]*)?>)?)[ \t]*\n[ \t]*", "${1}"),
    // HTML: colon continuation inside a list item
    (
        r"(?m)(<li(?:\s[^>]*)?>(?:<p(?:\s[^>]*)?>)?[^\n<]*?)[ \t]*\n[ \t]*:[ \t]*",
        "${1}: ",
    ),
    // HTML: line break right before a closing </li>
    (r"[ \t]*\n[ \t]*((?:</p>)?</li>)", "${1}"),
];

static COMPILED_RULES: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();

fn compiled_rules() -> &'static [(Regex, &'static str)] {
    COMPILED_RULES.get_or_init(|| {
        LIST_RULES
            .iter()
            .filter_map(|(pattern, replacement)| match Regex::new(pattern) {
                Ok(re) => Some((re, *replacement)),
                Err(e) => {
                    warn!("Invalid list rule '{}': {}", pattern, e);
                    None
                }
            })
            .collect()
    })
}

static PREFORMATTED: OnceLock<Option<Regex>> = OnceLock::new();

/// Byte ranges of `<pre>...</pre>` blocks. An unclosed block runs to the end.
fn preformatted_ranges(text: &str) -> Vec<Range<usize>> {
    let re = PREFORMATTED.get_or_init(|| {
        match Regex::new(r"(?is)<pre(?:\s[^>]*)?>.*?(?:</pre\s*>|\z)") {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Invalid preformatted pattern: {}", e);
                None
            }
        }
    });
    re.as_ref()
        .map(|re| re.find_iter(text).map(|block| block.range()).collect())
        .unwrap_or_default()
}

/// Apply one rule everywhere except where a match touches a `<pre>` block.
fn apply_rule(text: &str, re: &Regex, replacement: &str) -> String {
    let preformatted = preformatted_ranges(text);
    re.replace_all(text, |caps: &Captures<'_>| {
        let span = caps.get(0).map(|m| m.range()).unwrap_or_default();
        if preformatted
            .iter()
            .any(|block| span.start < block.end && block.start < span.end)
        {
            return text[span].to_string();
        }
        let mut out = String::new();
        caps.expand(replacement, &mut out);
        out
    })
    .into_owned()
}

/// Apply every list rule, in order, to the whole text.
pub fn normalize_lists(text: &str) -> String {
    let mut out = text.to_string();
    for (re, replacement) in compiled_rules() {
        out = apply_rule(&out, re, replacement);
    }
    if out.len() != text.len() {
        debug!(
            "List normalization changed length {} -> {}",
            text.len(),
            out.len()
        );
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Inline Metadata
// ─────────────────────────────────────────────────────────────────────────────

static METADATA_LINE: OnceLock<Option<Regex>> = OnceLock::new();

fn metadata_line() -> Option<&'static Regex> {
    METADATA_LINE
        .get_or_init(|| match Regex::new(r"^[ \t]*[\w][\w \-]*::([ \t]|$)") {
            Ok(re) => Some(re),
            Err(e) => {
                warn!("Invalid metadata pattern: {}", e);
                None
            }
        })
        .as_ref()
}

/// Drop `key:: value` metadata lines outside fenced code blocks.
pub fn strip_inline_metadata(markdown: &str) -> String {
    let Some(re) = metadata_line() else {
        return markdown.to_string();
    };
    let mut out = String::with_capacity(markdown.len());
    let mut fence: Option<&str> = None;
    for line in markdown.split_inclusive('\n') {
        let trimmed = line.trim_start();
        match fence {
            Some(marker) => {
                if trimmed.starts_with(marker) {
                    fence = None;
                }
            }
            None => {
                if trimmed.starts_with("```") {
                    fence = Some("```");
                } else if trimmed.starts_with("~~~") {
                    fence = Some("~~~");
                } else if re.is_match(line.trim_end_matches(['\r', '\n'])) {
                    continue;
                }
            }
        }
        out.push_str(line);
    }
    out
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_rules_compile() {
        assert_eq!(compiled_rules().len(), LIST_RULES.len());
        assert!(metadata_line().is_some());
    }

    #[test]
    fn test_colon_continuation_markdown() {
        assert_eq!(
            normalize_lists("- item one\n  : continuation text"),
            "- item one: continuation text"
        );
    }

    #[test]
    fn test_colon_continuation_applies_to_every_item() {
        let input = "1. first\n   : one\n2. second\n   : two\n";
        assert_eq!(normalize_lists(input), "1. first: one\n2. second: two\n");
    }

    #[test]
    fn test_blank_line_continuation() {
        assert_eq!(normalize_lists("-\n\n    floating text"), "- floating text");
    }

    #[test]
    fn test_html_list_items() {
        let input = "<ul>\n<li>\nitem one\n: continuation text\n</li>\n</ul>";
        assert_eq!(
            normalize_lists(input),
            "<ul>\n<li>item one: continuation text</li>\n</ul>"
        );
    }

    #[test]
    fn test_unrelated_text_untouched() {
        let input = "<p>Note\n: not a list</p>\nplain line\n";
        assert_eq!(normalize_lists(input), input);
    }

    #[test]
    fn test_preformatted_text_untouched() {
        let input = "<pre><code class=\"language-haskell\">xs =\n- a\n  : b\n-\n\n    c\n</code></pre>\n";
        assert_eq!(normalize_lists(input), input);
    }

    #[test]
    fn test_rules_still_apply_around_preformatted() {
        let input = "- one\n  : two\n<PRE>- a\n  : b</PRE>\n- three\n  : four";
        assert_eq!(
            normalize_lists(input),
            "- one: two\n<PRE>- a\n  : b</PRE>\n- three: four"
        );
    }

    #[test]
    fn test_strip_inline_metadata() {
        let input = "# Title\nstatus:: draft\nBody text\nrating::\n```\nkey:: kept\n```\n";
        assert_eq!(
            strip_inline_metadata(input),
            "# Title\nBody text\n```\nkey:: kept\n```\n"
        );
    }

    #[test]
    fn test_inline_double_colon_kept() {
        let input = "Use std::fmt here\n";
        assert_eq!(strip_inline_metadata(input), input);
    }
}
