//! HTML parsing into a [`DocumentTree`] via html5ever.

use super::tree::{DocumentTree, Element, NodeId};
use html5ever::tendril::TendrilSink;
use html5ever::{LocalName, Namespace, ParseOpts, QualName};
use markup5ever_rcdom::{Handle, NodeData, RcDom};

const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// Parse an HTML fragment as the content of a `body` element. The
/// fragment's top-level nodes become children of a fresh `root` element;
/// `style`, `meta` and other head-only tags stay where they were written.
pub fn parse_fragment(html: &str, root: Element) -> DocumentTree {
    let context = QualName::new(None, Namespace::from(HTML_NAMESPACE), LocalName::from("body"));
    let dom: RcDom =
        html5ever::parse_fragment(RcDom::default(), ParseOpts::default(), context, Vec::new(), false)
            .one(html);
    let mut tree = DocumentTree::new(root);
    // The parser puts the fragment under a synthetic `html` element.
    if let Some(container) = find_element(&dom.document, "html") {
        let parent = tree.root();
        for child in container.children.borrow().iter() {
            convert_node(&mut tree, child, parent);
        }
    }
    tree
}

/// Parse an HTML fragment into a tree rooted at a plain `div`.
pub fn parse_html(html: &str) -> DocumentTree {
    parse_fragment(html, Element::new("div"))
}

fn find_element(handle: &Handle, tag: &str) -> Option<Handle> {
    if let NodeData::Element { name, .. } = &handle.data {
        if name.local.as_ref() == tag {
            return Some(handle.clone());
        }
    }
    handle
        .children
        .borrow()
        .iter()
        .find_map(|child| find_element(child, tag))
}

fn convert_node(tree: &mut DocumentTree, handle: &Handle, parent: NodeId) {
    match &handle.data {
        NodeData::Text { contents } => {
            let node = tree.create_text(contents.borrow().to_string());
            tree.append_child(parent, node);
        }
        NodeData::Comment { contents } => {
            let node = tree.create_comment(contents.to_string());
            tree.append_child(parent, node);
        }
        NodeData::Element { name, attrs, .. } => {
            let mut element = Element::new(name.local.to_string());
            for attr in attrs.borrow().iter() {
                let key = match &attr.name.prefix {
                    Some(prefix) => format!("{}:{}", prefix, attr.name.local),
                    None => attr.name.local.to_string(),
                };
                element.attrs.push((key, attr.value.to_string()));
            }
            let node = tree.create_element(element);
            tree.append_child(parent, node);
            for child in handle.children.borrow().iter() {
                convert_node(tree, child, node);
            }
        }
        // Doctypes and processing instructions have no place in a fragment
        NodeData::Document | NodeData::Doctype { .. } | NodeData::ProcessingInstruction { .. } => {}
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::NodeKind;

    #[test]
    fn test_parse_simple_fragment() {
        let tree = parse_html("<p>Hello <strong>there</strong></p><p>Second</p>");
        let root = tree.root();
        assert_eq!(tree.children(root).len(), 2);
        assert_eq!(tree.find_by_tag("strong").len(), 1);
        assert_eq!(tree.text_content(root), "Hello thereSecond");
    }

    #[test]
    fn test_parse_keeps_attributes_in_order() {
        let tree = parse_html(r#"<img src="a.png" alt="An image" width="10">"#);
        let img = tree.find_by_tag("img")[0];
        let el = tree.element(img).unwrap();
        let keys: Vec<&str> = el.attrs.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, vec!["src", "alt", "width"]);
    }

    #[test]
    fn test_parse_comments() {
        let tree = parse_html("<p>x</p><!-- note -->");
        let second = tree.children(tree.root())[1];
        assert_eq!(tree.kind(second), &NodeKind::Comment(" note ".to_string()));
    }

    #[test]
    fn test_parse_inline_svg_preserves_case() {
        let tree = parse_html(r#"<svg viewBox="0 0 10 10"><foreignObject></foreignObject></svg>"#);
        let svg = tree.find_by_tag("svg")[0];
        assert_eq!(tree.element(svg).unwrap().attr("viewBox"), Some("0 0 10 10"));
        assert_eq!(tree.find_by_tag("foreignObject").len(), 1);
    }

    #[test]
    fn test_leading_head_tags_kept() {
        let tree = parse_html(
            r#"<style>p { color: red; }</style><meta charset="utf-8"><p>body text</p>"#,
        );
        let tags: Vec<&str> = tree
            .children(tree.root())
            .iter()
            .filter_map(|&child| tree.element(child))
            .map(|el| el.name.as_str())
            .collect();
        assert_eq!(tags, vec!["style", "meta", "p"]);
        let style = tree.find_by_tag("style")[0];
        assert_eq!(tree.text_content(style), "p { color: red; }");
    }

    #[test]
    fn test_fragment_is_not_wrapped_in_document_elements() {
        let tree = parse_html("<title>T</title>text<div>d</div>");
        assert!(tree.find_by_tag("html").is_empty());
        assert!(tree.find_by_tag("head").is_empty());
        assert!(tree.find_by_tag("body").is_empty());
        assert_eq!(tree.find_by_tag("title").len(), 1);
        assert_eq!(tree.text_content(tree.root()), "Ttextd");
    }

    #[test]
    fn test_parse_uses_given_root() {
        let tree = parse_fragment("<p>x</p>", Element::new("section").with_attr("id", "out"));
        let root = tree.element(tree.root()).unwrap();
        assert!(root.is("section"));
        assert_eq!(root.attr("id"), Some("out"));
    }
}
