//! Code block simplification.
//!
//! Highlighted code renders as a forest of spans with theme classes that no
//! paste target understands. Each block is reduced to plain text inside a
//! `pre` with a fixed inline presentation.

use crate::dom::{DocumentTree, Element, NodeId};

/// Presentation of simplified code blocks.
pub const CODE_BLOCK_STYLE: &str = "background-color: #f6f8fa; border: 1px solid #d0d7de; \
border-radius: 6px; padding: 12px 16px; margin: 0 0 16px 0; \
font-family: 'JetBrains Mono', Consolas, Monaco, monospace; font-size: 0.875em; \
line-height: 1.45; white-space: pre-wrap; overflow-x: auto;";

/// Presentation of inline code spans.
pub const INLINE_CODE_STYLE: &str = "background-color: #f6f8fa; border-radius: 4px; \
padding: 0.2em 0.4em; font-family: 'JetBrains Mono', Consolas, Monaco, monospace; \
font-size: 0.9em;";

const CODE_TABLE_CLASS: &str = "code-block-table";

const CODE_TABLE_STYLE: &str = "border-collapse: collapse; width: 100%; margin: 0 0 16px 0;";

/// Rebuild every `pre` as `<pre style><code>text</code></pre>`, optionally
/// inside a single-cell table. Returns the number of blocks rebuilt.
pub fn simplify_code_blocks(tree: &mut DocumentTree, as_tables: bool) -> usize {
    let mut simplified = 0;
    for pre in tree.find_by_tag("pre") {
        if !tree.is_attached(pre) {
            continue;
        }
        let text = tree.text_content(pre);
        let text = text.trim_end_matches('\n').to_string();

        let block = tree.create_element(Element::new("pre").with_attr("style", CODE_BLOCK_STYLE));
        let code = tree.create_element(Element::new("code"));
        let content = tree.create_text(text);
        tree.append_child(code, content);
        tree.append_child(block, code);

        let already_tabled = tree
            .closest_ancestor(pre, |el| el.is("table") && el.has_class(CODE_TABLE_CLASS))
            .is_some();
        if as_tables && !already_tabled {
            let table = wrap_in_table(tree, block);
            tree.replace(pre, table);
        } else {
            tree.replace(pre, block);
        }
        simplified += 1;
    }
    simplified
}

fn wrap_in_table(tree: &mut DocumentTree, block: NodeId) -> NodeId {
    let table = tree.create_element(
        Element::new("table")
            .with_attr("class", CODE_TABLE_CLASS)
            .with_attr("style", CODE_TABLE_STYLE),
    );
    let mut parent = table;
    for tag in ["tbody", "tr", "td"] {
        let child = tree.create_element(Element::new(tag));
        tree.append_child(parent, child);
        parent = child;
    }
    tree.append_child(parent, block);
    table
}

/// Give inline `code` (outside any `pre`) its fixed presentation.
pub fn style_inline_code(tree: &mut DocumentTree) -> usize {
    let spans: Vec<_> = tree
        .find_by_tag("code")
        .into_iter()
        .filter(|&code| tree.closest_ancestor(code, |el| el.is("pre")).is_none())
        .collect();
    for &code in &spans {
        if let Some(el) = tree.element_mut(code) {
            if !el.attr("style").is_some_and(|s| s.contains(INLINE_CODE_STYLE)) {
                el.append_style(INLINE_CODE_STYLE);
            }
        }
    }
    spans.len()
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
