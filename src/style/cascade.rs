//! Inline style cascade.
//!
//! Declarations are appended to each matching element's `style` attribute
//! in rule order, so the result for identical input is always identical.

use super::catalog::StyleCatalog;
use super::rules::StyleRuleSet;
use crate::dom::{outer_html, parse_html, DocumentTree, Element, NodeId, NodeKind};
use log::{debug, warn};

/// Selectors left alone: code blocks already carry their own presentation.
const SKIPPED_SELECTORS: &[&str] = &["pre", "code", "pre code"];

/// Images inside this container are styled by the grid.
pub const IMAGE_GRID_CLASS: &str = "image-grid";

fn is_skipped(selector: &str) -> bool {
    SKIPPED_SELECTORS
        .iter()
        .any(|skipped| selector.eq_ignore_ascii_case(skipped))
}

/// Wrap an `li`'s children in one `p`, unless that is already its shape.
fn wrap_list_item(tree: &mut DocumentTree, li: NodeId) {
    let children = tree.children(li);
    if children.is_empty() {
        return;
    }
    let mut paragraphs = 0;
    let mut other = false;
    for &child in children {
        match tree.kind(child) {
            NodeKind::Element(el) if el.is("p") => paragraphs += 1,
            NodeKind::Text(text) if text.trim().is_empty() => {}
            NodeKind::Comment(_) => {}
            _ => other = true,
        }
    }
    if paragraphs == 1 && !other {
        return;
    }
    tree.wrap_children(li, Element::new("p"));
}

/// Apply `rules` to the tree in place. Returns the number of declarations
/// appended.
pub fn apply_style_rules(tree: &mut DocumentTree, rules: &StyleRuleSet) -> usize {
    let mut applied = 0;
    for rule in rules.rules() {
        if is_skipped(rule.selector()) {
            continue;
        }
        let Some(selectors) = rule.selectors() else {
            debug!("Skipping unsupported selector '{}'", rule.selector());
            continue;
        };
        for node in tree.select(selectors) {
            let Some(el) = tree.element(node) else {
                continue;
            };
            if el.is("img")
                && tree
                    .closest_ancestor(node, |a| a.has_class(IMAGE_GRID_CLASS))
                    .is_some()
            {
                continue;
            }
            if el.is("li") {
                wrap_list_item(tree, node);
            }
            if let Some(el) = tree.element_mut(node) {
                el.append_style(rule.declarations());
                applied += 1;
            }
        }
    }
    applied
}

/// Inline `rules` into `html` and wrap the result in a container element
/// carrying the container declaration.
pub fn apply_styles(html: &str, rules: &StyleRuleSet) -> String {
    let mut tree = parse_html(html);
    let applied = apply_style_rules(&mut tree, rules);
    debug!("Appended {} inline declarations", applied);

    let mut container = Element::new("div");
    if !rules.container().is_empty() {
        container.set_attr("style", rules.container());
    }
    let mut wrapped = DocumentTree::new(container);
    let root = wrapped.root();
    wrapped.import_children(&tree, root);
    outer_html(&wrapped, root)
}

/// Look up `style_name` and inline it. An unknown name is a configuration
/// error: it is logged and the HTML is returned unstyled.
pub fn apply_named_style(html: &str, catalog: &dyn StyleCatalog, style_name: &str) -> String {
    match catalog.lookup(style_name) {
        Some(rules) => apply_styles(html, &rules),
        None => {
            warn!(
                "Style '{}' not found (available: {}); skipping inline styles",
                style_name,
                catalog.names().join(", ")
            );
            html.to_string()
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::BuiltinCatalog;

    fn style_of<'a>(tree: &'a DocumentTree, tag: &str) -> Option<&'a str> {
        let node = tree.find_by_tag(tag).into_iter().next()?;
        tree.element(node)?.attr("style")
    }

    #[test]
    fn test_append_keeps_existing_declarations_first() {
        let rules = StyleRuleSet::new("", [("span", "font-size:14px")]);
        let out = apply_styles(r#"<p><span style="color:red">x</span></p>"#, &rules);
        let tree = parse_html(&out);
        let style = style_of(&tree, "span").unwrap();

        let red = style.find("color:red").unwrap();
        let size = style.find("font-size:14px").unwrap();
        assert!(red < size);
    }

    #[test]
    fn test_rule_order_is_append_order() {
        let rules = StyleRuleSet::from_css("p { margin: 0; } .lead { color: gray; } p { color: black; }");
        let out = apply_styles(r#"<p class="lead">x</p>"#, &rules);
        assert_eq!(
            out,
            r#"<div><p class="lead" style="margin: 0; color: gray; color: black">x</p></div>"#
        );
        assert_eq!(apply_styles(r#"<p class="lead">x</p>"#, &rules), out);
    }

    #[test]
    fn test_container_wraps_body_content() {
        let rules = StyleRuleSet::from_css("body { font-size: 16px; }");
        let out = apply_styles("<h1>T</h1><p>x</p>", &rules);
        assert_eq!(out, r#"<div style="font-size: 16px"><h1>T</h1><p>x</p></div>"#);
    }

    #[test]
    fn test_code_selectors_skipped() {
        let rules = StyleRuleSet::from_css(
            "pre { padding: 16px; } code { color: red; } pre code { margin: 0; } p { margin: 0; }",
        );
        let html = r#"<pre style="fixed"><code>x</code></pre><p>y <code>z</code></p>"#;
        let tree = parse_html(&apply_styles(html, &rules));
        assert_eq!(style_of(&tree, "pre"), Some("fixed"));
        assert_eq!(style_of(&tree, "code"), None);
        assert_eq!(style_of(&tree, "p"), Some("margin: 0"));
    }

    #[test]
    fn test_images_in_grid_skipped() {
        let rules = StyleRuleSet::from_css("img { max-width: 100%; }");
        let html = r#"<div class="image-grid"><img src="a.png"></div><p><img src="b.png"></p>"#;
        let tree = parse_html(&apply_styles(html, &rules));
        let imgs = tree.find_by_tag("img");
        assert_eq!(tree.element(imgs[0]).unwrap().attr("style"), None);
        assert_eq!(tree.element(imgs[1]).unwrap().attr("style"), Some("max-width: 100%"));
    }

    #[test]
    fn test_list_item_children_wrapped_in_paragraph() {
        let rules = StyleRuleSet::from_css("li { margin-bottom: 4px; }");
        let out = apply_styles("<ul><li>plain <em>emphasis</em> tail</li></ul>", &rules);
        let tree = parse_html(&out);

        let li = tree.find_by_tag("li")[0];
        assert_eq!(tree.element(li).unwrap().attr("style"), Some("margin-bottom: 4px"));
        let children = tree.children(li);
        assert_eq!(children.len(), 1);
        assert!(tree.is_element(children[0], "p"));
        assert_eq!(tree.text_content(children[0]), "plain emphasis tail");
        assert_eq!(tree.element(children[0]).unwrap().attr("style"), None);
    }

    #[test]
    fn test_list_item_wrapped_once_across_rules() {
        let rules = StyleRuleSet::from_css("li { margin: 0; } ul li { color: black; }");
        let out = apply_styles("<ul><li>a <strong>b</strong></li></ul>", &rules);
        assert_eq!(
            out,
            r#"<div><ul><li style="margin: 0; color: black"><p>a <strong>b</strong></p></li></ul></div>"#
        );
    }

    #[test]
    fn test_unknown_style_returns_input() {
        let catalog = BuiltinCatalog::new();
        let html = "<p>x</p>";
        assert_eq!(apply_named_style(html, &catalog, "does-not-exist"), html);
    }

    #[test]
    fn test_named_style_applied() {
        let catalog = BuiltinCatalog::new();
        let out = apply_named_style("<h3>t</h3>", &catalog, "default");
        assert!(out.starts_with("<div style=\"font-family:"));
        assert!(out.contains("font-size: 1.25em"));
    }
}
