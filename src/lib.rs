//! pastemark - copy rendered Markdown as self-contained, inline-styled HTML
//!
//! Email clients and word processors drop `<style>` blocks and cannot reach
//! local files, so a plain render does not survive a paste. A copy renders
//! the document, waits for the renderer to settle, rewrites the tree so it
//! stands alone (images embedded as data URIs, interactive controls
//! removed), then inlines the chosen style onto every element.
//!
//! - `render` - Renderer seam and completion detection
//! - `dom` - The document tree the passes operate on
//! - `images` - Image embedding and rasterization
//! - `transform` - The ordered transformation passes
//! - `normalize` - List continuation repair on serialized HTML
//! - `style` - Style presets and the inline cascade
//! - `export` - The copy orchestrator and artifact sinks
//! - `config` - Persisted settings

pub mod config;
pub mod dom;
pub mod error;
pub mod export;
pub mod images;
pub mod normalize;
pub mod render;
pub mod style;
pub mod transform;

pub use error::{Error, Result};
