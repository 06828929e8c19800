//! HTML serialization for [`DocumentTree`].

use super::tree::{DocumentTree, NodeId, NodeKind};

/// Elements that never have content or a closing tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source",
    "track", "wbr",
];

/// Elements whose text content is emitted verbatim.
const RAW_TEXT_ELEMENTS: &[&str] = &["script", "style"];

/// Serialize a node including its own tag.
pub fn outer_html(tree: &DocumentTree, id: NodeId) -> String {
    let mut out = String::new();
    write_node(tree, id, &mut out, false);
    out
}

/// Serialize the children of a node.
pub fn inner_html(tree: &DocumentTree, id: NodeId) -> String {
    let mut out = String::new();
    let raw = is_raw_text(tree, id);
    for &child in tree.children(id) {
        write_node(tree, child, &mut out, raw);
    }
    out
}

fn is_raw_text(tree: &DocumentTree, id: NodeId) -> bool {
    tree.element(id)
        .is_some_and(|el| RAW_TEXT_ELEMENTS.iter().any(|tag| el.is(tag)))
}

fn write_node(tree: &DocumentTree, id: NodeId, out: &mut String, raw_parent: bool) {
    match tree.kind(id) {
        NodeKind::Text(text) => {
            if raw_parent {
                out.push_str(text);
            } else {
                out.push_str(&escape_text(text));
            }
        }
        NodeKind::Comment(text) => {
            out.push_str("<!--");
            out.push_str(text);
            out.push_str("-->");
        }
        NodeKind::Element(el) => {
            out.push('<');
            out.push_str(&el.name);
            for (key, value) in &el.attrs {
                out.push(' ');
                out.push_str(key);
                out.push_str("=\"");
                out.push_str(&escape_attr(value));
                out.push('"');
            }
            out.push('>');
            if VOID_ELEMENTS.iter().any(|tag| el.is(tag)) {
                return;
            }
            let raw = is_raw_text(tree, id);
            for &child in tree.children(id) {
                write_node(tree, child, out, raw);
            }
            out.push_str("</");
            out.push_str(&el.name);
            out.push('>');
        }
    }
}

/// Escape text content.
pub fn escape_text(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// Escape an attribute value for a double-quoted attribute.
pub fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

/// HTML-escape a string for use in both text and attributes.
pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::{parse_html, Element};

    #[test]
    fn test_inner_html_round_trips_markup() {
        let html = r#"<p class="a">Hello <em>there</em></p><hr><img src="x.png" alt="x">"#;
        let tree = parse_html(html);
        assert_eq!(inner_html(&tree, tree.root()), html);
    }

    #[test]
    fn test_outer_html_includes_root() {
        let mut tree = DocumentTree::new(Element::new("div").with_attr("style", "color:red"));
        let text = tree.create_text("a < b");
        tree.append_child(tree.root(), text);
        assert_eq!(
            outer_html(&tree, tree.root()),
            r#"<div style="color:red">a &lt; b</div>"#
        );
    }

    #[test]
    fn test_attribute_escaping() {
        let mut tree = DocumentTree::new(Element::new("div"));
        let a = tree.create_element(Element::new("a").with_attr("title", r#"say "hi" & go"#));
        tree.append_child(tree.root(), a);
        assert_eq!(
            inner_html(&tree, tree.root()),
            r#"<a title="say &quot;hi&quot; &amp; go"></a>"#
        );
    }

    #[test]
    fn test_style_content_is_raw() {
        let tree = parse_html("<p>x</p><style>p > a { color: red; }</style>");
        assert_eq!(
            inner_html(&tree, tree.root()),
            "<p>x</p><style>p > a { color: red; }</style>"
        );
    }

    #[test]
    fn test_html_escape() {
        assert_eq!(html_escape("Hello"), "Hello");
        assert_eq!(html_escape("<script>"), "&lt;script&gt;");
        assert_eq!(html_escape("a & b"), "a &amp; b");
        assert_eq!(html_escape("\"quoted\""), "&quot;quoted&quot;");
    }
}
