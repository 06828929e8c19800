//! Image resolution engine
//!
//! Rewrites every image in a [`DocumentTree`] to a self-contained data URI:
//!
//! - `mime.rs` - Mime inference and data URI helpers
//! - `store.rs` - Local content store access
//! - `rasterize.rs` - PNG rasterization of network and vector images
//! - `progress.rs` - Batch progress accounting
//!
//! All resolutions of one batch run concurrently and are joined before any
//! source is rewritten. A failed or overdue resolution leaves the original
//! source in place and never aborts its siblings.

mod mime;
mod progress;
mod rasterize;
mod store;

pub use mime::{data_uri_mime, decode_data_uri, is_data_uri, mime_from_path, to_data_uri};
pub use mime::{PNG_MIME, SVG_MIME};
pub use progress::{ProgressCallback, ProgressTracker};
pub use rasterize::{BitmapRasterizer, RasterError, RasterSource, Rasterizer};
pub use rasterize::{FETCH_CONNECT_TIMEOUT, FETCH_TIMEOUT, MAX_IMAGE_PIXELS};
pub use store::{ContentStore, StoreError, VaultStore, DEFAULT_RESOURCE_PREFIX};

use crate::dom::{outer_html, DocumentTree, Element, NodeId};
use futures::future::join_all;
use log::{debug, warn};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::timeout;

const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

// ─────────────────────────────────────────────────────────────────────────────
// Image References
// ─────────────────────────────────────────────────────────────────────────────

/// Where an image reference stands in the resolution pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionState {
    Unresolved,
    Resolving,
    /// Source rewritten to a data URI.
    Resolved,
    /// Resolution failed; the original source is untouched.
    FailedFallback,
}

/// How a source locator will be resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceClass {
    /// Already a data URI. `rasterize` is set for vector data that should
    /// still be converted to a bitmap.
    SelfContained { rasterize: bool },
    /// Asset in the content store, as a percent-decoded relative path.
    LocalStore(String),
    /// Anything else, usually a network URL.
    External,
}

/// An `img` element with a resolvable source.
#[derive(Debug, Clone)]
pub struct ImageReference {
    pub node: NodeId,
    pub source_locator: String,
    pub mime_hint: String,
    pub class: SourceClass,
    pub state: ResolutionState,
}

impl ImageReference {
    fn needs_work(&self) -> bool {
        !matches!(self.class, SourceClass::SelfContained { rasterize: false })
    }
}

/// Errors from resolving a single image. Contained in the engine.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Raster(#[from] RasterError),

    #[error("gave up after {0:?}")]
    TimedOut(Duration),
}

/// Outcome of one resolution batch.
#[derive(Debug, Default)]
pub struct ResolutionReport {
    pub references: Vec<ImageReference>,
}

impl ResolutionReport {
    pub fn count(&self, state: ResolutionState) -> usize {
        self.references.iter().filter(|r| r.state == state).count()
    }

    pub fn resolved(&self) -> usize {
        self.count(ResolutionState::Resolved)
    }

    pub fn fallbacks(&self) -> usize {
        self.count(ResolutionState::FailedFallback)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Resolver
// ─────────────────────────────────────────────────────────────────────────────

pub struct ImageResolver {
    store: Arc<dyn ContentStore>,
    rasterizer: Arc<dyn Rasterizer>,
    rasterize_vectors: bool,
    deadline: Duration,
}

impl ImageResolver {
    /// `deadline` bounds each resolution; an image still pending after it
    /// falls back to its original source.
    pub fn new(
        store: Arc<dyn ContentStore>,
        rasterizer: Arc<dyn Rasterizer>,
        rasterize_vectors: bool,
        deadline: Duration,
    ) -> Self {
        Self {
            store,
            rasterizer,
            rasterize_vectors,
            deadline,
        }
    }

    /// Classify a source locator.
    pub fn classify(&self, source: &str) -> SourceClass {
        if is_data_uri(source) {
            let is_vector = data_uri_mime(source).is_some_and(|mime| mime == SVG_MIME);
            return SourceClass::SelfContained {
                rasterize: is_vector && self.rasterize_vectors,
            };
        }
        match source.strip_prefix(self.store.resource_prefix()) {
            Some(rest) => {
                let path = rest.split(['?', '#']).next().unwrap_or(rest);
                let decoded = urlencoding::decode(path)
                    .map(|p| p.into_owned())
                    .unwrap_or_else(|_| path.to_string());
                SourceClass::LocalStore(decoded)
            }
            None => SourceClass::External,
        }
    }

    /// Collect every `img` with a non-empty `src`, classified.
    pub fn collect(&self, tree: &DocumentTree) -> Vec<ImageReference> {
        tree.find_by_tag("img")
            .into_iter()
            .filter_map(|node| {
                let src = tree.element(node)?.attr("src")?.trim().to_string();
                if src.is_empty() {
                    return None;
                }
                let class = self.classify(&src);
                let mime_hint = match &class {
                    SourceClass::SelfContained { .. } => {
                        data_uri_mime(&src).unwrap_or_else(|| PNG_MIME.to_string())
                    }
                    SourceClass::LocalStore(path) => mime_from_path(path),
                    SourceClass::External => {
                        mime_from_path(src.split(['?', '#']).next().unwrap_or(&src))
                    }
                };
                Some(ImageReference {
                    node,
                    source_locator: src,
                    mime_hint,
                    class,
                    state: ResolutionState::Unresolved,
                })
            })
            .collect()
    }

    /// Resolve every image in `tree`.
    ///
    /// Data URIs that need no rasterization are left alone, so running this
    /// twice is the same as running it once.
    pub async fn resolve_images(
        &self,
        tree: &mut DocumentTree,
        progress: Option<ProgressCallback>,
    ) -> ResolutionReport {
        let mut references = self.collect(tree);
        let pending: Vec<usize> = references
            .iter()
            .enumerate()
            .filter(|(_, r)| r.needs_work())
            .map(|(index, _)| index)
            .collect();
        for reference in &mut references {
            reference.state = if reference.needs_work() {
                ResolutionState::Resolving
            } else {
                ResolutionState::Resolved
            };
        }
        debug!(
            "Resolving {} of {} images",
            pending.len(),
            references.len()
        );

        let tracker = ProgressTracker::new(pending.len(), progress);
        let outcomes = join_all(pending.iter().map(|&index| {
            let reference = &references[index];
            let tracker = &tracker;
            async move {
                let outcome = match timeout(self.deadline, self.resolve_one(reference)).await {
                    Ok(outcome) => outcome,
                    Err(_) => Err(ResolveError::TimedOut(self.deadline)),
                };
                tracker.settle_one();
                outcome
            }
        }))
        .await;

        for (index, outcome) in pending.into_iter().zip(outcomes) {
            let reference = &mut references[index];
            match outcome {
                Ok(uri) => {
                    if let Some(el) = tree.element_mut(reference.node) {
                        el.set_attr("src", uri);
                    }
                    reference.state = ResolutionState::Resolved;
                }
                Err(e) => {
                    warn!(
                        "image fallback: keeping original source '{}': {}",
                        reference.source_locator, e
                    );
                    reference.state = ResolutionState::FailedFallback;
                }
            }
        }

        ResolutionReport { references }
    }

    async fn resolve_one(&self, reference: &ImageReference) -> Result<String, ResolveError> {
        match &reference.class {
            SourceClass::SelfContained { .. } | SourceClass::External => Ok(self
                .rasterizer
                .rasterize(RasterSource::Url(reference.source_locator.clone()))
                .await?),
            SourceClass::LocalStore(path) => {
                let bytes = self.store.read_binary(path).await?;
                if reference.mime_hint == SVG_MIME && self.rasterize_vectors {
                    let source = RasterSource::Bytes {
                        mime: reference.mime_hint.clone(),
                        bytes,
                    };
                    Ok(self.rasterizer.rasterize(source).await?)
                } else {
                    Ok(to_data_uri(&reference.mime_hint, &bytes))
                }
            }
        }
    }

    async fn rasterize_markup(&self, markup: String) -> Result<String, ResolveError> {
        Ok(self.rasterizer.rasterize(RasterSource::SvgMarkup(markup)).await?)
    }

    /// Replace each outermost inline `<svg>` with an `<img>` carrying a PNG
    /// data URI. An svg that fails to rasterize stays as it is. Returns the
    /// number of replaced elements.
    pub async fn rasterize_inline_vectors(&self, tree: &mut DocumentTree) -> usize {
        let vectors: Vec<NodeId> = tree
            .find_by_tag("svg")
            .into_iter()
            .filter(|&node| tree.closest_ancestor(node, |el| el.is("svg")).is_none())
            .collect();
        if vectors.is_empty() {
            return 0;
        }

        let markups: Vec<String> = vectors
            .iter()
            .map(|&node| {
                if let Some(el) = tree.element_mut(node) {
                    if !el.has_attr("xmlns") {
                        el.set_attr("xmlns", SVG_NAMESPACE);
                    }
                }
                outer_html(tree, node)
            })
            .collect();

        let outcomes = join_all(markups.into_iter().map(|markup| async move {
            match timeout(self.deadline, self.rasterize_markup(markup)).await {
                Ok(outcome) => outcome,
                Err(_) => Err(ResolveError::TimedOut(self.deadline)),
            }
        }))
        .await;

        let mut replaced = 0;
        for (node, outcome) in vectors.into_iter().zip(outcomes) {
            match outcome {
                Ok(uri) => {
                    let mut img = Element::new("img").with_attr("src", uri);
                    if let Some(label) = tree.element(node).and_then(|el| el.attr("aria-label")) {
                        img.set_attr("alt", label);
                    }
                    let img = tree.create_element(img);
                    tree.replace(node, img);
                    replaced += 1;
                }
                Err(e) => warn!("image fallback: keeping inline svg: {}", e),
            }
        }
        debug!("Rasterized {} inline vector images", replaced);
        replaced
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
