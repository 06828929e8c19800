//! A small CSS selector engine for inline styling and DOM queries.
//!
//! Supports type, universal, class, id and attribute (`[name]`,
//! `[name=value]`) simple selectors, compound selectors, the descendant and
//! child combinators, and comma-separated groups. Anything else (pseudo
//! classes, sibling combinators) is rejected at parse time because it cannot
//! be expressed as an inline style.

use super::tree::{DocumentTree, Element, NodeId};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Selector Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SimpleSelector {
    Universal,
    Type(String),
    Class(String),
    Id(String),
    Attr { name: String, value: Option<String> },
}

impl SimpleSelector {
    fn matches(&self, el: &Element) -> bool {
        match self {
            SimpleSelector::Universal => true,
            SimpleSelector::Type(name) => el.is(name),
            SimpleSelector::Class(class) => el.has_class(class),
            SimpleSelector::Id(id) => el.attr("id") == Some(id.as_str()),
            SimpleSelector::Attr { name, value } => match (el.attr(name), value) {
                (Some(_), None) => true,
                (Some(actual), Some(expected)) => actual == expected,
                (None, _) => false,
            },
        }
    }
}

/// A sequence of simple selectors that all apply to one element.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CompoundSelector {
    pub simples: Vec<SimpleSelector>,
}

impl CompoundSelector {
    fn matches(&self, el: &Element) -> bool {
        self.simples.iter().all(|simple| simple.matches(el))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Combinator {
    Descendant,
    Child,
}

/// Compounds joined by combinators, stored left to right.
/// `combinators[i]` joins `compounds[i]` and `compounds[i + 1]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComplexSelector {
    compounds: Vec<CompoundSelector>,
    combinators: Vec<Combinator>,
}

impl ComplexSelector {
    /// Right-to-left match with backtracking over descendant combinators.
    fn matches(&self, tree: &DocumentTree, id: NodeId) -> bool {
        let last = self.compounds.len() - 1;
        self.matches_at(tree, id, last)
    }

    fn matches_at(&self, tree: &DocumentTree, id: NodeId, index: usize) -> bool {
        let Some(el) = tree.element(id) else {
            return false;
        };
        if !self.compounds[index].matches(el) {
            return false;
        }
        if index == 0 {
            return true;
        }
        match self.combinators[index - 1] {
            Combinator::Child => tree
                .parent(id)
                .is_some_and(|parent| self.matches_at(tree, parent, index - 1)),
            Combinator::Descendant => {
                let mut current = tree.parent(id);
                while let Some(ancestor) = current {
                    if self.matches_at(tree, ancestor, index - 1) {
                        return true;
                    }
                    current = tree.parent(ancestor);
                }
                false
            }
        }
    }
}

/// A comma-separated group of selectors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SelectorList {
    selectors: Vec<ComplexSelector>,
}

impl SelectorList {
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let selectors = input
            .split(',')
            .map(parse_complex)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { selectors })
    }

    pub fn matches(&self, tree: &DocumentTree, id: NodeId) -> bool {
        self.selectors.iter().any(|sel| sel.matches(tree, id))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Parsing
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectorError {
    #[error("empty selector")]
    Empty,

    #[error("unsupported selector syntax '{0}'")]
    Unsupported(char),

    #[error("malformed selector '{0}'")]
    Malformed(String),
}

fn is_ident_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '-' || c == '_'
}

fn parse_complex(input: &str) -> Result<ComplexSelector, SelectorError> {
    let chars: Vec<char> = input.trim().chars().collect();
    if chars.is_empty() {
        return Err(SelectorError::Empty);
    }

    let mut compounds = Vec::new();
    let mut combinators = Vec::new();
    let mut current = CompoundSelector::default();
    let mut pending: Option<Combinator> = None;
    let mut i = 0;

    let ident = |chars: &[char], start: usize| -> (String, usize) {
        let mut end = start;
        while end < chars.len() && is_ident_char(chars[end]) {
            end += 1;
        }
        (chars[start..end].iter().collect(), end)
    };

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() || c == '>' {
            if c == '>' {
                pending = Some(Combinator::Child);
            } else if pending.is_none() {
                pending = Some(Combinator::Descendant);
            }
            i += 1;
            continue;
        }

        if let Some(combinator) = pending.take() {
            if current.simples.is_empty() {
                return Err(SelectorError::Malformed(input.to_string()));
            }
            compounds.push(std::mem::take(&mut current));
            combinators.push(combinator);
        }

        match c {
            '*' => {
                current.simples.push(SimpleSelector::Universal);
                i += 1;
            }
            '.' | '#' => {
                let (name, end) = ident(&chars, i + 1);
                if name.is_empty() {
                    return Err(SelectorError::Malformed(input.to_string()));
                }
                current.simples.push(if c == '.' {
                    SimpleSelector::Class(name)
                } else {
                    SimpleSelector::Id(name)
                });
                i = end;
            }
            '[' => {
                let close = chars[i..]
                    .iter()
                    .position(|&ch| ch == ']')
                    .map(|offset| i + offset)
                    .ok_or_else(|| SelectorError::Malformed(input.to_string()))?;
                let body: String = chars[i + 1..close].iter().collect();
                let (name, value) = match body.split_once('=') {
                    Some((name, value)) => {
                        let value = value.trim().trim_matches(|q| q == '"' || q == '\'');
                        (name.trim().to_string(), Some(value.to_string()))
                    }
                    None => (body.trim().to_string(), None),
                };
                if name.is_empty() || !name.chars().all(is_ident_char) {
                    return Err(SelectorError::Malformed(input.to_string()));
                }
                current.simples.push(SimpleSelector::Attr { name, value });
                i = close + 1;
            }
            c if is_ident_char(c) => {
                let (name, end) = ident(&chars, i);
                current
                    .simples
                    .push(SimpleSelector::Type(name.to_ascii_lowercase()));
                i = end;
            }
            other => return Err(SelectorError::Unsupported(other)),
        }
    }

    if current.simples.is_empty() || pending == Some(Combinator::Child) {
        return Err(SelectorError::Malformed(input.to_string()));
    }
    compounds.push(current);
    Ok(ComplexSelector {
        compounds,
        combinators,
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::parse_html;

    fn count(html: &str, selector: &str) -> usize {
        let tree = parse_html(html);
        let list = SelectorList::parse(selector).unwrap();
        tree.select(&list).len()
    }

    #[test]
    fn test_type_and_class() {
        let html = r#"<p class="note">a</p><p>b</p><div class="note">c</div>"#;
        assert_eq!(count(html, "p"), 2);
        assert_eq!(count(html, ".note"), 2);
        assert_eq!(count(html, "p.note"), 1);
    }

    #[test]
    fn test_descendant_and_child() {
        let html = "<ul><li><p>a</p><ol><li>b</li></ol></li></ul>";
        assert_eq!(count(html, "ul li"), 2);
        assert_eq!(count(html, "ul > li"), 1);
        assert_eq!(count(html, "ul>li"), 1);
        assert_eq!(count(html, "li p"), 1);
    }

    #[test]
    fn test_descendant_backtracking() {
        // The nearest `div` ancestor is not `.outer`; matching must keep walking.
        let html = r#"<div class="outer"><div><span>x</span></div></div>"#;
        assert_eq!(count(html, ".outer span"), 1);
        assert_eq!(count(html, ".outer > span"), 0);
    }

    #[test]
    fn test_attribute_selectors() {
        let html = r#"<input type="checkbox"><input type="text"><a href="x">l</a>"#;
        assert_eq!(count(html, "input[type=checkbox]"), 1);
        assert_eq!(count(html, r#"input[type="text"]"#), 1);
        assert_eq!(count(html, "[href]"), 1);
    }

    #[test]
    fn test_groups_and_universal() {
        let html = "<h1>a</h1><h2>b</h2><p>c</p>";
        assert_eq!(count(html, "h1, h2"), 2);
        assert_eq!(count(html, "*"), 3);
    }

    #[test]
    fn test_unsupported_syntax() {
        assert_eq!(
            SelectorList::parse("a:hover"),
            Err(SelectorError::Unsupported(':'))
        );
        assert!(SelectorList::parse("h1 + p").is_err());
        assert!(SelectorList::parse("").is_err());
        assert!(SelectorList::parse("ul >").is_err());
    }

    #[test]
    fn test_error_messages() {
        let err: Box<dyn std::error::Error> = Box::new(SelectorList::parse("li ~ li").unwrap_err());
        assert_eq!(err.to_string(), "unsupported selector syntax '~'");
        assert_eq!(SelectorError::Empty.to_string(), "empty selector");
        assert_eq!(
            SelectorList::parse("p[").unwrap_err().to_string(),
            "malformed selector 'p['"
        );
    }
}
