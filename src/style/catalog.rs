//! Named style presets.

use super::rules::StyleRuleSet;

/// Name under which a user stylesheet is registered.
pub const CUSTOM_STYLE_NAME: &str = "custom";

/// Looks up style rule sets by name.
pub trait StyleCatalog: Send + Sync {
    fn lookup(&self, name: &str) -> Option<StyleRuleSet>;

    /// Registered names, in registration order.
    fn names(&self) -> Vec<String>;
}

/// GitHub-like preset. `pre` and `code` rules are kept for the full
/// document's `<style>` block; the inline cascade skips them.
pub const DEFAULT_CSS: &str = r#"
body {
    font-family: -apple-system, BlinkMacSystemFont, 'Segoe UI', 'Noto Sans', Helvetica, Arial, sans-serif;
    font-size: 16px;
    line-height: 1.6;
    color: #24292f;
}

h1, h2, h3, h4, h5, h6 {
    margin-top: 24px;
    margin-bottom: 16px;
    font-weight: 600;
    line-height: 1.25;
}

h1 { font-size: 2em; padding-bottom: 0.3em; border-bottom: 1px solid #d0d7de; }
h2 { font-size: 1.5em; padding-bottom: 0.3em; border-bottom: 1px solid #d0d7de; }
h3 { font-size: 1.25em; }
h4 { font-size: 1em; }
h5 { font-size: 0.875em; }
h6 { font-size: 0.85em; color: #57606a; }

p { margin-top: 0; margin-bottom: 16px; }

a { color: #0969da; text-decoration: none; }

ul, ol { margin-top: 0; margin-bottom: 16px; padding-left: 2em; }
li { margin-bottom: 4px; }
li p { margin: 0; }

blockquote {
    margin: 0 0 16px 0;
    padding: 0 1em;
    color: #57606a;
    border-left: 4px solid #d0d7de;
}

code {
    font-family: 'JetBrains Mono', Consolas, Monaco, monospace;
    font-size: 0.9em;
}

pre { padding: 16px; border-radius: 6px; }
pre code { font-size: 0.875em; }

table { border-collapse: collapse; margin-bottom: 16px; }
th, td { padding: 8px 12px; border: 1px solid #d0d7de; }
th { font-weight: 600; text-align: left; background-color: #f6f8fa; }

hr { height: 2px; margin: 24px 0; border: none; background-color: #d0d7de; }

img { max-width: 100%; height: auto; border-radius: 4px; }

.image-grid { display: flex; flex-wrap: wrap; gap: 8px; }

strong { font-weight: 600; }
em { font-style: italic; }
del { text-decoration: line-through; }
"#;

/// Plain preset that leaves most presentation to the paste target.
pub const MINIMAL_CSS: &str = r#"
body { font-family: Georgia, 'Times New Roman', serif; font-size: 15px; line-height: 1.5; }
h1, h2, h3 { margin: 20px 0 10px 0; }
p { margin: 0 0 12px 0; }
li p { margin: 0; }
blockquote { margin: 0 0 12px 0; padding-left: 12px; border-left: 3px solid #ccc; }
table { border-collapse: collapse; }
th, td { padding: 4px 8px; border: 1px solid #ccc; }
img { max-width: 100%; }
"#;

/// Built-in presets plus an optional user stylesheet.
#[derive(Debug, Clone)]
pub struct BuiltinCatalog {
    styles: Vec<(String, StyleRuleSet)>,
}

impl Default for BuiltinCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl BuiltinCatalog {
    pub fn new() -> Self {
        Self {
            styles: vec![
                ("default".to_string(), StyleRuleSet::from_css(DEFAULT_CSS)),
                ("minimal".to_string(), StyleRuleSet::from_css(MINIMAL_CSS)),
            ],
        }
    }

    /// Presets plus `custom_css` registered as [`CUSTOM_STYLE_NAME`].
    pub fn with_custom(custom_css: Option<&str>) -> Self {
        let mut catalog = Self::new();
        if let Some(css) = custom_css.filter(|css| !css.trim().is_empty()) {
            catalog.register(CUSTOM_STYLE_NAME, StyleRuleSet::from_css(css));
        }
        catalog
    }

    /// Add or replace a named style.
    pub fn register(&mut self, name: &str, rules: StyleRuleSet) {
        match self.styles.iter_mut().find(|(existing, _)| existing == name) {
            Some(slot) => slot.1 = rules,
            None => self.styles.push((name.to_string(), rules)),
        }
    }
}

impl StyleCatalog for BuiltinCatalog {
    fn lookup(&self, name: &str) -> Option<StyleRuleSet> {
        self.styles
            .iter()
            .find(|(existing, _)| existing.eq_ignore_ascii_case(name.trim()))
            .map(|(_, rules)| rules.clone())
    }

    fn names(&self) -> Vec<String> {
        self.styles.iter().map(|(name, _)| name.clone()).collect()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
