//! User settings for pastemark
//!
//! Every copy option a user can change, serialized as JSON.

use crate::render::SettleConfig;
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ─────────────────────────────────────────────────────────────────────────────
// Internal Link Handling
// ─────────────────────────────────────────────────────────────────────────────

/// What to do with links that point inside the document store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum InternalLinkHandling {
    /// Leave the link as rendered
    Keep,
    /// Replace the link with its text
    #[default]
    Text,
    /// Drop the link and its text
    Remove,
}

// ─────────────────────────────────────────────────────────────────────────────
// Settings
// ─────────────────────────────────────────────────────────────────────────────

/// Copy settings.
///
/// Missing fields take their defaults, so older settings files keep loading.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Styling
    // ─────────────────────────────────────────────────────────────────────────
    /// Name of the style preset to inline
    pub style_name: String,

    /// Extra CSS registered as the `custom` style
    pub custom_stylesheet: Option<String>,

    // ─────────────────────────────────────────────────────────────────────────
    // Content
    // ─────────────────────────────────────────────────────────────────────────
    /// Whether to drop front matter blocks
    pub remove_front_matter: bool,

    /// Whether to embed images as data URIs
    pub embed_images: bool,

    /// Whether to convert SVG to PNG
    pub rasterize_vectors: bool,

    /// How internal links are copied
    pub internal_links: InternalLinkHandling,

    /// Whether to wrap code blocks in a single-cell table
    pub code_blocks_as_tables: bool,

    /// Whether to strip `key:: value` metadata lines before rendering
    pub remove_dataview_metadata: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // Output
    // ─────────────────────────────────────────────────────────────────────────
    /// Copy a bare fragment instead of a full HTML document
    pub bare_html_fragment: bool,

    /// Open a written file with the system viewer
    pub open_after_export: bool,

    // ─────────────────────────────────────────────────────────────────────────
    // Render Completion
    // ─────────────────────────────────────────────────────────────────────────
    /// Idle time after the last rendered block before rendering counts as done
    pub settle_window_ms: u64,

    /// How often the completion check runs
    pub poll_interval_ms: u64,

    /// Longest wait for a single image before it keeps its original source
    pub image_timeout_ms: u64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            // Styling
            style_name: String::from("default"),
            custom_stylesheet: None,

            // Content
            remove_front_matter: true,
            embed_images: true,
            rasterize_vectors: true,
            internal_links: InternalLinkHandling::default(),
            code_blocks_as_tables: false,
            remove_dataview_metadata: false,

            // Output
            bare_html_fragment: true,
            open_after_export: false,

            // Render Completion
            settle_window_ms: 100,
            poll_interval_ms: 20,
            image_timeout_ms: 30_000,
        }
    }
}

impl Settings {
    // ─────────────────────────────────────────────────────────────────────────
    // Validation Constants and Sanitization
    // ─────────────────────────────────────────────────────────────────────────

    /// Minimum settle window.
    pub const MIN_SETTLE_WINDOW_MS: u64 = 20;
    /// Maximum settle window.
    pub const MAX_SETTLE_WINDOW_MS: u64 = 5000;
    /// Minimum poll interval.
    pub const MIN_POLL_INTERVAL_MS: u64 = 5;
    /// Maximum poll interval.
    pub const MAX_POLL_INTERVAL_MS: u64 = 1000;
    /// Minimum per-image timeout.
    pub const MIN_IMAGE_TIMEOUT_MS: u64 = 1000;
    /// Maximum per-image timeout.
    pub const MAX_IMAGE_TIMEOUT_MS: u64 = 300_000;

    /// Clamp timings into range and normalize the style fields. Hand-edited
    /// files can hold anything.
    pub fn sanitize(&mut self) {
        self.settle_window_ms = self
            .settle_window_ms
            .clamp(Self::MIN_SETTLE_WINDOW_MS, Self::MAX_SETTLE_WINDOW_MS);
        self.poll_interval_ms = self
            .poll_interval_ms
            .clamp(Self::MIN_POLL_INTERVAL_MS, Self::MAX_POLL_INTERVAL_MS);
        self.image_timeout_ms = self
            .image_timeout_ms
            .clamp(Self::MIN_IMAGE_TIMEOUT_MS, Self::MAX_IMAGE_TIMEOUT_MS);

        let trimmed = self.style_name.trim();
        if trimmed.is_empty() {
            self.style_name = Settings::default().style_name;
        } else if trimmed.len() != self.style_name.len() {
            self.style_name = trimmed.to_string();
        }

        if self
            .custom_stylesheet
            .as_deref()
            .is_some_and(|css| css.trim().is_empty())
        {
            self.custom_stylesheet = None;
        }
    }

    /// Parse and [`sanitize`](Self::sanitize).
    pub fn from_json_sanitized(json: &str) -> Result<Self, serde_json::Error> {
        let mut settings: Self = serde_json::from_str(json)?;
        settings.sanitize();
        Ok(settings)
    }

    /// Completion detection timings.
    pub fn settle_config(&self) -> SettleConfig {
        SettleConfig {
            settle_window: Duration::from_millis(self.settle_window_ms),
            poll_interval: Duration::from_millis(self.poll_interval_ms),
        }
    }

    pub fn image_timeout(&self) -> Duration {
        Duration::from_millis(self.image_timeout_ms)
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
