//! Cleanup passes that strip live-view affordances.
//!
//! Every pass returns how many nodes it touched and is a no-op when its
//! targets are absent.

use crate::config::InternalLinkHandling;
use crate::dom::{DocumentTree, NodeId};
use crate::render::INTERNAL_LINK_CLASS;

/// Classes wrapping front matter.
const FRONT_MATTER_CLASSES: &[&str] = &["frontmatter-container", "frontmatter"];

/// Fold/unfold markers.
const COLLAPSE_CLASSES: &[&str] = &[
    "collapse-indicator",
    "heading-collapse-indicator",
    "list-collapse-indicator",
];

/// Backlink counters injected by reference-tracking extensions.
const ANNOTATION_CLASS: &str = "snw-reference";

fn detach_all(tree: &mut DocumentTree, nodes: Vec<NodeId>) -> usize {
    let mut removed = 0;
    for node in nodes {
        // A previous removal may already have taken this node's ancestor.
        if tree.is_attached(node) {
            tree.detach(node);
            removed += 1;
        }
    }
    removed
}

/// Drop the layout-forcing style the render container carries.
pub fn strip_root_style(tree: &mut DocumentTree) -> bool {
    let root = tree.root();
    tree.element_mut(root)
        .and_then(|el| el.remove_attr("style"))
        .is_some()
}

pub fn remove_front_matter(tree: &mut DocumentTree) -> usize {
    let blocks = tree.find_all(|el| FRONT_MATTER_CLASSES.iter().any(|c| el.has_class(c)));
    detach_all(tree, blocks)
}

/// Mark every checkbox disabled. Returns the number of checkboxes seen.
pub fn disable_checkboxes(tree: &mut DocumentTree) -> usize {
    let boxes = tree.find_all(|el| {
        el.is("input")
            && el
                .attr("type")
                .is_some_and(|t| t.eq_ignore_ascii_case("checkbox"))
    });
    for &node in &boxes {
        if let Some(el) = tree.element_mut(node) {
            if !el.has_attr("disabled") {
                el.set_attr("disabled", "");
            }
        }
    }
    boxes.len()
}

pub fn remove_collapse_indicators(tree: &mut DocumentTree) -> usize {
    let markers = tree.find_all(|el| COLLAPSE_CLASSES.iter().any(|c| el.has_class(c)));
    detach_all(tree, markers)
}

pub fn remove_buttons(tree: &mut DocumentTree) -> usize {
    let buttons = tree.find_by_tag("button");
    detach_all(tree, buttons)
}

pub fn remove_annotations(tree: &mut DocumentTree) -> usize {
    let annotations = tree.find_by_class(ANNOTATION_CLASS);
    detach_all(tree, annotations)
}

/// Rewrite links into the document store according to `mode`.
pub fn handle_internal_links(tree: &mut DocumentTree, mode: InternalLinkHandling) -> usize {
    if mode == InternalLinkHandling::Keep {
        return 0;
    }
    let links = tree.find_all(|el| el.is("a") && el.has_class(INTERNAL_LINK_CLASS));
    match mode {
        InternalLinkHandling::Keep => 0,
        InternalLinkHandling::Remove => detach_all(tree, links),
        InternalLinkHandling::Text => {
            let mut converted = 0;
            for link in links {
                if !tree.is_attached(link) {
                    continue;
                }
                let text = tree.create_text(tree.text_content(link));
                tree.replace(link, text);
                converted += 1;
            }
            converted
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{inner_html, parse_fragment, parse_html, Element};

    fn html(tree: &DocumentTree) -> String {
        inner_html(tree, tree.root())
    }

    #[test]
    fn test_strip_root_style() {
        let root = Element::new("div").with_attr("style", "position: absolute;");
        let mut tree = parse_fragment("<p>x</p>", root);
        assert!(strip_root_style(&mut tree));
        assert!(!strip_root_style(&mut tree));
        assert!(!tree.element(tree.root()).unwrap().has_attr("style"));
    }

    #[test]
    fn test_remove_front_matter() {
        let mut tree = parse_html(
            r#"<div class="frontmatter-container"><pre class="frontmatter"><code>a: 1</code></pre></div><p>body</p>"#,
        );
        assert_eq!(remove_front_matter(&mut tree), 1);
        assert_eq!(html(&tree), "<p>body</p>");
        assert_eq!(remove_front_matter(&mut tree), 0);
    }

    #[test]
    fn test_disable_checkboxes_idempotent() {
        let mut tree = parse_html(
            r#"<ul><li><input type="checkbox" checked=""> done</li><li><input type="CHECKBOX"> todo</li></ul><input type="text">"#,
        );
        assert_eq!(disable_checkboxes(&mut tree), 2);
        let once = html(&tree);
        disable_checkboxes(&mut tree);
        assert_eq!(html(&tree), once);
        assert!(once.contains(r#"<input type="checkbox" checked="" disabled="">"#));
        assert!(once.contains(r#"<input type="text">"#));
    }

    #[test]
    fn test_remove_affordances() {
        let mut tree = parse_html(
            r#"<h2><span class="heading-collapse-indicator"></span>Title</h2><pre><code>x</code><button class="copy-code-button">Copy</button></pre><p>see<span class="snw-reference">3</span></p>"#,
        );
        assert_eq!(remove_collapse_indicators(&mut tree), 1);
        assert_eq!(remove_buttons(&mut tree), 1);
        assert_eq!(remove_annotations(&mut tree), 1);
        assert_eq!(html(&tree), "<h2>Title</h2><pre><code>x</code></pre><p>see</p>");
    }

    #[test]
    fn test_passes_tolerate_missing_targets() {
        let mut tree = parse_html("<p>plain</p>");
        assert_eq!(remove_front_matter(&mut tree), 0);
        assert_eq!(disable_checkboxes(&mut tree), 0);
        assert_eq!(remove_collapse_indicators(&mut tree), 0);
        assert_eq!(remove_buttons(&mut tree), 0);
        assert_eq!(remove_annotations(&mut tree), 0);
        assert_eq!(html(&tree), "<p>plain</p>");
    }

    #[test]
    fn test_internal_links_to_text() {
        let source = r#"<p>See <a href="notes.md" class="internal-link">my <em>notes</em></a> and <a href="https://x.org">x</a></p>"#;
        let mut tree = parse_html(source);
        assert_eq!(handle_internal_links(&mut tree, InternalLinkHandling::Text), 1);
        assert_eq!(html(&tree), r#"<p>See my notes and <a href="https://x.org">x</a></p>"#);
    }

    #[test]
    fn test_internal_links_removed_or_kept() {
        let source = r#"<p>See <a href="notes.md" class="internal-link">notes</a>.</p>"#;

        let mut kept = parse_html(source);
        assert_eq!(handle_internal_links(&mut kept, InternalLinkHandling::Keep), 0);
        assert_eq!(html(&kept), source);

        let mut removed = parse_html(source);
        assert_eq!(handle_internal_links(&mut removed, InternalLinkHandling::Remove), 1);
        assert_eq!(html(&removed), "<p>See .</p>");
    }
}
