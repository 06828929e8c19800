//! Arena-backed document tree.
//!
//! Nodes live in a flat `Vec` and refer to each other by [`NodeId`]. Removing
//! a node only detaches it from its parent; the slot stays in the arena so
//! handles held by callers never dangle. Traversals only visit attached nodes.

use super::selector::SelectorList;

/// Handle to a node inside a [`DocumentTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

/// An element's tag name and attributes, in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attrs: Vec<(String, String)>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attrs: Vec::new(),
        }
    }

    /// Builder-style attribute setter.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Set an attribute, replacing an existing value in place.
    pub fn set_attr(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self
            .attrs
            .iter_mut()
            .find(|(key, _)| key.eq_ignore_ascii_case(&name))
        {
            Some(slot) => slot.1 = value,
            None => self.attrs.push((name, value)),
        }
    }

    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self
            .attrs
            .iter()
            .position(|(key, _)| key.eq_ignore_ascii_case(name))?;
        Some(self.attrs.remove(index).1)
    }

    pub fn classes(&self) -> impl Iterator<Item = &str> {
        self.attr("class").unwrap_or("").split_ascii_whitespace()
    }

    pub fn has_class(&self, class: &str) -> bool {
        self.classes().any(|c| c == class)
    }

    pub fn add_class(&mut self, class: &str) {
        if self.has_class(class) {
            return;
        }
        let value = match self.attr("class").map(str::trim) {
            Some(existing) if !existing.is_empty() => format!("{} {}", existing, class),
            _ => class.to_string(),
        };
        self.set_attr("class", value);
    }

    /// Append declarations to the inline `style`, after whatever is there.
    pub fn append_style(&mut self, declarations: &str) {
        let declarations = declarations.trim();
        if declarations.is_empty() {
            return;
        }
        let value = match self.attr("style").map(|s| s.trim().trim_end_matches(';').trim_end()) {
            Some(existing) if !existing.is_empty() => format!("{}; {}", existing, declarations),
            _ => declarations.to_string(),
        };
        self.set_attr("style", value);
    }

    pub fn is(&self, tag: &str) -> bool {
        self.name.eq_ignore_ascii_case(tag)
    }
}

/// Typed node payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeKind {
    Element(Element),
    Text(String),
    Comment(String),
}

#[derive(Debug, Clone)]
struct Node {
    kind: NodeKind,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// A detached, mutable tree of HTML nodes with a single root element.
#[derive(Debug, Clone)]
pub struct DocumentTree {
    nodes: Vec<Node>,
    root: NodeId,
}

impl DocumentTree {
    /// Create a tree whose root is the given element.
    pub fn new(root: Element) -> Self {
        Self {
            nodes: vec![Node {
                kind: NodeKind::Element(root),
                parent: None,
                children: Vec::new(),
            }],
            root: NodeId(0),
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Node creation and access
    // ─────────────────────────────────────────────────────────────────────────

    fn push(&mut self, kind: NodeKind) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            kind,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn create_element(&mut self, element: Element) -> NodeId {
        self.push(NodeKind::Element(element))
    }

    pub fn create_text(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Text(text.into()))
    }

    pub fn create_comment(&mut self, text: impl Into<String>) -> NodeId {
        self.push(NodeKind::Comment(text.into()))
    }

    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.0].kind
    }

    pub fn element(&self, id: NodeId) -> Option<&Element> {
        match &self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn element_mut(&mut self, id: NodeId) -> Option<&mut Element> {
        match &mut self.nodes[id.0].kind {
            NodeKind::Element(element) => Some(element),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId, tag: &str) -> bool {
        self.element(id).is_some_and(|el| el.is(tag))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes[id.0].parent
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    /// Whether `id` is still reachable from the root.
    pub fn is_attached(&self, id: NodeId) -> bool {
        let mut current = Some(id);
        while let Some(node) = current {
            if node == self.root {
                return true;
            }
            current = self.parent(node);
        }
        false
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Structural mutation
    // ─────────────────────────────────────────────────────────────────────────

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Remove `id` from its parent. The root cannot be detached.
    pub fn detach(&mut self, id: NodeId) {
        if let Some(parent) = self.nodes[id.0].parent.take() {
            self.nodes[parent.0].children.retain(|&child| child != id);
        }
    }

    /// Put `replacement` where `old` was; `old` ends up detached.
    pub fn replace(&mut self, old: NodeId, replacement: NodeId) {
        let Some(parent) = self.parent(old) else {
            return;
        };
        self.detach(replacement);
        if let Some(slot) = self.nodes[parent.0]
            .children
            .iter_mut()
            .find(|child| **child == old)
        {
            *slot = replacement;
        }
        self.nodes[old.0].parent = None;
        self.nodes[replacement.0].parent = Some(parent);
    }

    /// Move all children of `id` into a new `wrapper` element that becomes
    /// the only child of `id`. Returns the wrapper.
    pub fn wrap_children(&mut self, id: NodeId, wrapper: Element) -> NodeId {
        let wrapper = self.create_element(wrapper);
        let children = std::mem::take(&mut self.nodes[id.0].children);
        for child in children {
            self.nodes[child.0].parent = Some(wrapper);
            self.nodes[wrapper.0].children.push(child);
        }
        self.nodes[wrapper.0].parent = Some(id);
        self.nodes[id.0].children.push(wrapper);
        wrapper
    }

    /// Copy the subtree rooted at `node` in `other` into this tree and append
    /// it under `parent`.
    pub fn import(&mut self, other: &DocumentTree, node: NodeId, parent: NodeId) -> NodeId {
        let copy = self.push(other.kind(node).clone());
        self.append_child(parent, copy);
        for &child in other.children(node) {
            self.import(other, child, copy);
        }
        copy
    }

    /// Copy every child of `other`'s root under `parent`.
    pub fn import_children(&mut self, other: &DocumentTree, parent: NodeId) {
        for &child in other.children(other.root()) {
            self.import(other, child, parent);
        }
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Queries
    // ─────────────────────────────────────────────────────────────────────────

    /// Attached descendants of `id` in document order, excluding `id` itself.
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.children(node).iter().rev().copied());
        }
        out
    }

    /// Attached elements under the root for which `predicate` holds.
    pub fn find_all<F>(&self, mut predicate: F) -> Vec<NodeId>
    where
        F: FnMut(&Element) -> bool,
    {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.element(id).is_some_and(&mut predicate))
            .collect()
    }

    pub fn find_by_tag(&self, tag: &str) -> Vec<NodeId> {
        self.find_all(|el| el.is(tag))
    }

    pub fn find_by_class(&self, class: &str) -> Vec<NodeId> {
        self.find_all(|el| el.has_class(class))
    }

    /// Attached elements under the root matching a parsed selector list.
    pub fn select(&self, selectors: &SelectorList) -> Vec<NodeId> {
        self.descendants(self.root)
            .into_iter()
            .filter(|&id| self.element(id).is_some() && selectors.matches(self, id))
            .collect()
    }

    /// Nearest ancestor (excluding `id`) that satisfies `predicate`.
    pub fn closest_ancestor<F>(&self, id: NodeId, mut predicate: F) -> Option<NodeId>
    where
        F: FnMut(&Element) -> bool,
    {
        let mut current = self.parent(id);
        while let Some(node) = current {
            if self.element(node).is_some_and(&mut predicate) {
                return Some(node);
            }
            current = self.parent(node);
        }
        None
    }

    /// Concatenated text of all text descendants.
    pub fn text_content(&self, id: NodeId) -> String {
        let mut out = String::new();
        if let NodeKind::Text(text) = self.kind(id) {
            out.push_str(text);
        }
        for node in self.descendants(id) {
            if let NodeKind::Text(text) = self.kind(node) {
                out.push_str(text);
            }
        }
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
