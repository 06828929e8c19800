//! Rendering seam
//!
//! The Markdown renderer is an external collaborator: it writes into a
//! [`RenderTarget`] and reports per-block progress through a
//! [`BlockObserver`]. It gives no reliable "done" signal, which is why the
//! [`SettleDetector`] exists.
//!
//! - `settle.rs` - Completion detection by polling block activity
//! - `markdown.rs` - Built-in renderer backed by comrak

mod markdown;
mod settle;

pub use markdown::{ComrakRenderer, INTERNAL_LINK_CLASS};
pub use settle::{SettleConfig, SettleDetector};

use crate::dom::{parse_html, DocumentTree, Element};
use crate::error::Result;
use async_trait::async_trait;
use std::sync::{Arc, Mutex, MutexGuard};

/// Layout style forced onto the off-screen container while rendering.
pub const OFFSCREEN_STYLE: &str = "position: absolute; left: -10000px; width: 900px;";

/// Class carried by the render container.
pub const CONTAINER_CLASS: &str = "markdown-rendered";

// ─────────────────────────────────────────────────────────────────────────────
// Traits
// ─────────────────────────────────────────────────────────────────────────────

/// Receives block-processing notifications from a renderer.
///
/// Calls may arrive at any time, including after `render` has returned, and
/// any number of times (zero included).
pub trait BlockObserver: Send + Sync {
    fn block_started(&self);
    fn block_finished(&self);
}

/// Renders Markdown into a target container.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn render(
        &self,
        source: &str,
        target: Arc<RenderTarget>,
        observer: Arc<dyn BlockObserver>,
    ) -> Result<()>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Render Target
// ─────────────────────────────────────────────────────────────────────────────

/// The live, renderer-owned container. Readers only ever get a detached
/// [`snapshot`](RenderTarget::snapshot).
#[derive(Debug)]
pub struct RenderTarget {
    tree: Mutex<DocumentTree>,
}

impl RenderTarget {
    pub fn new() -> Self {
        let root = Element::new("div")
            .with_attr("class", CONTAINER_CLASS)
            .with_attr("style", OFFSCREEN_STYLE);
        Self {
            tree: Mutex::new(DocumentTree::new(root)),
        }
    }

    fn lock(&self) -> MutexGuard<'_, DocumentTree> {
        // A panic while holding the lock cannot leave the tree half-linked:
        // every mutation is a single append.
        self.tree.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Parse `html` and append its top-level nodes to the container.
    pub fn append_html(&self, html: &str) {
        let fragment = parse_html(html);
        self.append_tree(&fragment);
    }

    /// Append the root children of an already-built fragment.
    pub fn append_tree(&self, fragment: &DocumentTree) {
        let mut tree = self.lock();
        let root = tree.root();
        tree.import_children(fragment, root);
    }

    /// Detached copy of the current contents.
    pub fn snapshot(&self) -> DocumentTree {
        self.lock().clone()
    }
}

impl Default for RenderTarget {
    fn default() -> Self {
        Self::new()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
