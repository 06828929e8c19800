//! Inline style cascade
//!
//! Paste targets drop `<style>` blocks, so presentation is written onto each
//! element's `style` attribute instead.
//!
//! - `rules.rs` - Ordered selector to declaration rule sets
//! - `catalog.rs` - Named presets and the custom stylesheet
//! - `cascade.rs` - Applying a rule set to serialized HTML

mod cascade;
mod catalog;
mod rules;

pub use cascade::{apply_named_style, apply_style_rules, apply_styles, IMAGE_GRID_CLASS};
pub use catalog::{BuiltinCatalog, StyleCatalog, CUSTOM_STYLE_NAME, DEFAULT_CSS, MINIMAL_CSS};
pub use rules::{StyleRule, StyleRuleSet, CONTAINER_SELECTOR};
