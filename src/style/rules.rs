//! Selector to declaration rule sets.

use crate::dom::SelectorList;
use cssparser::{ParseError, Parser, ParserInput, Token};
use log::debug;

/// Selector whose declarations style the output container itself.
pub const CONTAINER_SELECTOR: &str = "body";

/// One selector and the declarations it appends.
#[derive(Debug, Clone)]
pub struct StyleRule {
    selector: String,
    declarations: String,
    parsed: Option<SelectorList>,
}

impl StyleRule {
    pub fn new(selector: &str, declarations: &str) -> Self {
        let selector = normalize_selector(selector);
        let parsed = match SelectorList::parse(&selector) {
            Ok(list) => Some(list),
            Err(e) => {
                debug!("Rule '{}' will never match: {}", selector, e);
                None
            }
        };
        Self {
            selector,
            declarations: normalize_declarations(declarations),
            parsed,
        }
    }

    /// Selector text with whitespace collapsed.
    pub fn selector(&self) -> &str {
        &self.selector
    }

    pub fn declarations(&self) -> &str {
        &self.declarations
    }

    /// Parsed selector, `None` for syntax the engine does not support.
    pub fn selectors(&self) -> Option<&SelectorList> {
        self.parsed.as_ref()
    }
}

/// An ordered, read-only stylesheet plus the container declaration.
#[derive(Debug, Clone, Default)]
pub struct StyleRuleSet {
    container: String,
    rules: Vec<StyleRule>,
}

impl StyleRuleSet {
    /// Build from `(selector, declarations)` pairs, in application order.
    pub fn new<'a, I>(container: &str, rules: I) -> Self
    where
        I: IntoIterator<Item = (&'a str, &'a str)>,
    {
        Self {
            container: normalize_declarations(container),
            rules: rules
                .into_iter()
                .map(|(selector, declarations)| StyleRule::new(selector, declarations))
                .collect(),
        }
    }

    /// Parse plain CSS. Comma groups become one rule per selector, `body`
    /// rules feed the container declaration, at-rules are ignored.
    pub fn from_css(css: &str) -> Self {
        let mut input = ParserInput::new(css);
        let mut parser = Parser::new(&mut input);
        let mut set = StyleRuleSet::default();

        loop {
            let selectors = match read_prelude(&mut parser) {
                Prelude::Rule(selectors) => selectors,
                Prelude::AtRule => {
                    debug!("Skipping at-rule");
                    continue;
                }
                Prelude::Statement => continue,
                Prelude::End => break,
            };
            let Some(declarations) = read_block(&mut parser) else {
                debug!("Skipping nested block after '{}'", selectors.join(", "));
                continue;
            };
            let declarations = declarations.join("; ");
            if declarations.is_empty() {
                continue;
            }
            for selector in selectors {
                if selector.eq_ignore_ascii_case(CONTAINER_SELECTOR) {
                    set.container = join_declarations(&set.container, &declarations);
                } else {
                    set.rules.push(StyleRule::new(&selector, &declarations));
                }
            }
        }
        set
    }

    /// Render back to CSS text.
    pub fn to_css(&self) -> String {
        let mut css = String::new();
        if !self.container.is_empty() {
            css.push_str(&format!("{} {{ {}; }}\n", CONTAINER_SELECTOR, self.container));
        }
        for rule in &self.rules {
            css.push_str(&format!("{} {{ {}; }}\n", rule.selector, rule.declarations));
        }
        css
    }

    pub fn container(&self) -> &str {
        &self.container
    }

    pub fn rules(&self) -> &[StyleRule] {
        &self.rules
    }
}

#[cfg(test)]
impl StyleRuleSet {
    /// Declarations of the first rule for `selector`.
    pub(crate) fn get(&self, selector: &str) -> Option<&str> {
        let selector = normalize_selector(selector);
        self.rules
            .iter()
            .find(|rule| rule.selector == selector)
            .map(StyleRule::declarations)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

pub(crate) fn normalize_selector(selector: &str) -> String {
    selector
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// `a: b; c: d` with no trailing semicolon.
fn normalize_declarations(body: &str) -> String {
    let mut input = ParserInput::new(body);
    let mut parser = Parser::new(&mut input);
    read_declarations(&mut parser)
        .unwrap_or_default()
        .join("; ")
}

fn join_declarations(first: &str, second: &str) -> String {
    match (first.is_empty(), second.is_empty()) {
        (true, _) => second.to_string(),
        (_, true) => first.to_string(),
        _ => format!("{}; {}", first, second),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tokenizing
// ─────────────────────────────────────────────────────────────────────────────

/// What precedes the next top-level block or semicolon.
enum Prelude {
    /// Selectors of a qualified rule; its block is next.
    Rule(Vec<String>),
    /// An `@` rule, block included, already skipped.
    AtRule,
    /// Anything terminated by a top-level `;`.
    Statement,
    End,
}

fn read_prelude<'i>(parser: &mut Parser<'i, '_>) -> Prelude {
    let mut selectors = Vec::new();
    let mut current = String::new();
    let mut at_rule = false;

    loop {
        let before = parser.position();
        match parser.next_including_whitespace_and_comments() {
            Ok(Token::CurlyBracketBlock) => break,
            Ok(Token::Semicolon) => return Prelude::Statement,
            Ok(Token::AtKeyword(_)) if selectors.is_empty() && current.trim().is_empty() => {
                at_rule = true;
            }
            Ok(Token::Comma) => selectors.push(std::mem::take(&mut current)),
            Ok(Token::Comment(_)) => {}
            Ok(Token::WhiteSpace(_)) => push_space(&mut current),
            Ok(Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock) => {
                skip_nested(parser);
                current.push_str(parser.slice_from(before));
            }
            Ok(_) => current.push_str(parser.slice_from(before)),
            Err(_) => return Prelude::End,
        }
    }

    if at_rule {
        // The block is skipped by the next read.
        return Prelude::AtRule;
    }
    selectors.push(current);
    Prelude::Rule(
        selectors
            .iter()
            .map(|selector| normalize_selector(selector))
            .filter(|selector| !selector.is_empty())
            .collect(),
    )
}

/// Declarations of the `{}` block just read, or `None` if it holds nested
/// blocks.
fn read_block<'i>(parser: &mut Parser<'i, '_>) -> Option<Vec<String>> {
    parser
        .parse_nested_block(|block| Ok::<_, ParseError<'i, ()>>(read_declarations(block)))
        .ok()
        .flatten()
}

/// Split at top-level semicolons. Strings, `url()` and other functions are
/// kept verbatim, comments are dropped.
fn read_declarations<'i>(parser: &mut Parser<'i, '_>) -> Option<Vec<String>> {
    let mut declarations = Vec::new();
    let mut current = String::new();

    loop {
        let before = parser.position();
        match parser.next_including_whitespace_and_comments() {
            Ok(Token::Semicolon) => declarations.push(std::mem::take(&mut current)),
            Ok(Token::CurlyBracketBlock) => return None,
            Ok(Token::Comment(_)) => {}
            Ok(Token::WhiteSpace(_)) => push_space(&mut current),
            Ok(Token::Function(_) | Token::ParenthesisBlock | Token::SquareBracketBlock) => {
                skip_nested(parser);
                current.push_str(parser.slice_from(before));
            }
            Ok(_) => current.push_str(parser.slice_from(before)),
            Err(_) => break,
        }
    }
    declarations.push(current);

    Some(
        declarations
            .iter()
            .map(|declaration| declaration.trim())
            .filter(|declaration| !declaration.is_empty())
            .map(str::to_string)
            .collect(),
    )
}

/// Consume the contents of the block or function just read.
fn skip_nested<'i>(parser: &mut Parser<'i, '_>) {
    let _ = parser.parse_nested_block(|nested| {
        while nested.next_including_whitespace_and_comments().is_ok() {}
        Ok::<_, ParseError<'i, ()>>(())
    });
}

fn push_space(text: &mut String) {
    if !text.is_empty() && !text.ends_with(' ') {
        text.push(' ');
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
