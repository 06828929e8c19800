//! Markdown renderer backed by comrak.
//!
//! Each top-level block is rendered and appended on its own, bracketed by
//! block notifications, with a scheduler yield in between. Observers see
//! the same incremental activity a live preview would produce.

use super::{BlockObserver, RenderTarget, Renderer};
use crate::dom::{escape_text, parse_html, DocumentTree};
use crate::error::{Error, Result};
use async_trait::async_trait;
use comrak::nodes::NodeValue;
use comrak::{format_html, parse_document, Arena, Options};
use log::debug;
use std::sync::Arc;

/// Class marking links that point inside the document store.
pub const INTERNAL_LINK_CLASS: &str = "internal-link";

/// Renders Markdown with GitHub-flavoured extensions.
#[derive(Debug, Clone)]
pub struct ComrakRenderer {
    /// Prefix prepended to relative image paths so the image engine can
    /// recognise them as store assets.
    resource_prefix: String,
}

impl ComrakRenderer {
    pub fn new(resource_prefix: impl Into<String>) -> Self {
        Self {
            resource_prefix: resource_prefix.into(),
        }
    }

    fn options() -> Options {
        let mut options = Options::default();

        // Enable common extensions
        options.extension.strikethrough = true;
        options.extension.table = true;
        options.extension.autolink = true;
        options.extension.tasklist = true;
        options.extension.footnotes = true;
        options.extension.front_matter_delimiter = Some("---".to_string());

        // Allow raw HTML (inline SVG diagrams, image grids)
        options.render.unsafe_ = true;

        options
    }

    /// Render every top-level block to its own HTML fragment.
    fn render_blocks(&self, source: &str) -> Result<Vec<DocumentTree>> {
        let arena = Arena::new();
        let options = Self::options();
        let root = parse_document(&arena, source, &options);

        let mut blocks = Vec::new();
        for node in root.children() {
            let html = match &node.data.borrow().value {
                NodeValue::FrontMatter(raw) => Some(front_matter_html(raw)),
                _ => None,
            };
            let html = match html {
                Some(html) => html,
                None => {
                    let mut out = Vec::new();
                    format_html(node, &options, &mut out)
                        .map_err(|e| Error::Render(e.to_string()))?;
                    String::from_utf8(out).map_err(|e| Error::Render(e.to_string()))?
                }
            };
            let mut fragment = parse_html(&html);
            self.rewrite_local_references(&mut fragment);
            blocks.push(fragment);
        }
        Ok(blocks)
    }

    fn rewrite_local_references(&self, fragment: &mut DocumentTree) {
        for img in fragment.find_by_tag("img") {
            let Some(el) = fragment.element_mut(img) else {
                continue;
            };
            if let Some(src) = el.attr("src").filter(|src| is_relative(src)).map(str::to_string) {
                let rewritten = format!("{}{}", self.resource_prefix, encode_path(&src));
                el.set_attr("src", rewritten);
            }
        }
        for link in fragment.find_by_tag("a") {
            let Some(el) = fragment.element_mut(link) else {
                continue;
            };
            if el
                .attr("href")
                .is_some_and(|href| is_relative(href) && !href.starts_with('#'))
            {
                el.add_class(INTERNAL_LINK_CLASS);
            }
        }
    }
}

#[async_trait]
impl Renderer for ComrakRenderer {
    async fn render(
        &self,
        source: &str,
        target: Arc<RenderTarget>,
        observer: Arc<dyn BlockObserver>,
    ) -> Result<()> {
        let blocks = self.render_blocks(source)?;
        debug!("Rendering {} blocks", blocks.len());

        for block in &blocks {
            observer.block_started();
            target.append_tree(block);
            tokio::task::yield_now().await;
            observer.block_finished();
        }
        Ok(())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

fn front_matter_html(raw: &str) -> String {
    let body: Vec<&str> = raw
        .trim()
        .lines()
        .filter(|line| line.trim() != "---")
        .collect();
    format!(
        r#"<div class="frontmatter-container"><pre class="frontmatter language-yaml"><code>{}</code></pre></div>"#,
        escape_text(&body.join("\n"))
    )
}

fn is_relative(reference: &str) -> bool {
    let reference = reference.trim();
    if reference.is_empty() || reference.starts_with("//") || reference.starts_with('/') {
        return false;
    }
    // A scheme is letters/digits/+/-/. followed by ':' before any '/'
    match reference.find(':') {
        Some(colon) => reference[..colon].contains('/'),
        None => true,
    }
}

/// Percent-encode each path segment, decoding first so already-encoded
/// paths are not encoded twice.
fn encode_path(path: &str) -> String {
    let path = path.trim().trim_start_matches("./");
    path.split('/')
        .map(|segment| {
            let decoded = urlencoding::decode(segment)
                .map(|s| s.into_owned())
                .unwrap_or_else(|_| segment.to_string());
            urlencoding::encode(&decoded).into_owned()
        })
        .collect::<Vec<_>>()
        .join("/")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
