//! DOM transformation pipeline
//!
//! Turns the renderer's live tree into an independent tree that is safe to
//! serialize and paste elsewhere. The input is cloned on entry and never
//! touched.
//!
//! - `cleanup.rs` - Removal of live-view affordances and interactive controls
//! - `code.rs` - Code block simplification

mod cleanup;
mod code;

pub use cleanup::{
    disable_checkboxes, handle_internal_links, remove_annotations, remove_buttons,
    remove_collapse_indicators, remove_front_matter, strip_root_style,
};
pub use code::{simplify_code_blocks, style_inline_code, CODE_BLOCK_STYLE, INLINE_CODE_STYLE};

use crate::config::{InternalLinkHandling, Settings};
use crate::dom::DocumentTree;
use crate::images::{ImageResolver, ProgressCallback, ResolutionReport};
use log::debug;

/// Switches for the optional passes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransformOptions {
    pub remove_front_matter: bool,
    pub embed_images: bool,
    pub rasterize_vectors: bool,
    pub internal_links: InternalLinkHandling,
    pub code_blocks_as_tables: bool,
}

impl Default for TransformOptions {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for TransformOptions {
    fn from(settings: &Settings) -> Self {
        Self {
            remove_front_matter: settings.remove_front_matter,
            embed_images: settings.embed_images,
            rasterize_vectors: settings.rasterize_vectors,
            internal_links: settings.internal_links,
            code_blocks_as_tables: settings.code_blocks_as_tables,
        }
    }
}

/// What each pass did.
#[derive(Debug, Default)]
pub struct TransformReport {
    pub front_matter_removed: usize,
    pub checkboxes_disabled: usize,
    pub collapse_indicators_removed: usize,
    pub buttons_removed: usize,
    pub annotations_removed: usize,
    pub internal_links_rewritten: usize,
    pub code_blocks_simplified: usize,
    pub images: Option<ResolutionReport>,
    pub vectors_rasterized: usize,
}

/// The ordered pass sequence.
pub struct TransformPipeline {
    options: TransformOptions,
    resolver: ImageResolver,
}

impl TransformPipeline {
    pub fn new(options: TransformOptions, resolver: ImageResolver) -> Self {
        Self { options, resolver }
    }

    /// Run every pass over a clone of `source`.
    pub async fn run(
        &self,
        source: &DocumentTree,
        progress: Option<ProgressCallback>,
    ) -> (DocumentTree, TransformReport) {
        let mut tree = source.clone();
        let mut report = TransformReport::default();
        strip_root_style(&mut tree);

        if self.options.remove_front_matter {
            report.front_matter_removed = remove_front_matter(&mut tree);
        }
        report.checkboxes_disabled = disable_checkboxes(&mut tree);
        report.collapse_indicators_removed = remove_collapse_indicators(&mut tree);
        report.buttons_removed = remove_buttons(&mut tree);
        report.annotations_removed = remove_annotations(&mut tree);
        report.internal_links_rewritten =
            handle_internal_links(&mut tree, self.options.internal_links);
        report.code_blocks_simplified =
            simplify_code_blocks(&mut tree, self.options.code_blocks_as_tables);
        style_inline_code(&mut tree);

        if self.options.embed_images {
            report.images = Some(self.resolver.resolve_images(&mut tree, progress).await);
            if self.options.rasterize_vectors {
                report.vectors_rasterized = self.resolver.rasterize_inline_vectors(&mut tree).await;
            }
        }

        debug!("Transform passes done: {:?}", report);
        (tree, report)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
