//! Document tree for the transformation pipeline
//!
//! The rendered output is held as an explicit tree of typed nodes rather than
//! a live DOM. Passes query and rewrite it structurally.
//!
//! - `tree.rs` - Arena tree with element/text/comment nodes
//! - `parse.rs` - HTML to tree, via html5ever
//! - `serialize.rs` - Tree to HTML
//! - `selector.rs` - CSS selector matching

mod parse;
mod selector;
mod serialize;
mod tree;

pub use parse::{parse_fragment, parse_html};
pub use selector::{SelectorError, SelectorList};
pub use serialize::{escape_attr, escape_text, html_escape, inner_html, outer_html};
pub use tree::{DocumentTree, Element, NodeId, NodeKind};
