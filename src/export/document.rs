//! Artifact assembly and file export.

use super::ArtifactSink;
use crate::dom::html_escape;
use crate::error::{Error, Result};
use async_trait::async_trait;
use log::{info, warn};
use std::path::{Path, PathBuf};

/// Title used when the document has none.
pub const DEFAULT_TITLE: &str = "Exported Document";

// ─────────────────────────────────────────────────────────────────────────────
// Artifact
// ─────────────────────────────────────────────────────────────────────────────

/// Output shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// The styled container alone, for pasting.
    Fragment,
    /// A standalone `<html>` document around the fragment.
    Document,
}

/// The finished copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// Final HTML in the requested format.
    pub html: String,
    /// The styled fragment, also when `html` is a full document.
    pub fragment: String,
    pub title: String,
    /// Markdown source, offered as the plain-text alternative.
    pub plain_text: String,
    pub format: OutputFormat,
}

impl Artifact {
    /// Build the artifact for `fragment`. `css` fills the document's
    /// `<style>` block and is ignored for fragments.
    pub fn new(
        fragment: String,
        title: &str,
        plain_text: String,
        format: OutputFormat,
        css: &str,
    ) -> Self {
        let html = match format {
            OutputFormat::Fragment => fragment.clone(),
            OutputFormat::Document => wrap_document(&fragment, title, css),
        };
        Self {
            html,
            fragment,
            title: title.to_string(),
            plain_text,
            format,
        }
    }

    /// The standalone document, whatever the requested format was.
    pub fn to_document(&self, css: &str) -> String {
        match self.format {
            OutputFormat::Document => self.html.clone(),
            OutputFormat::Fragment => wrap_document(&self.fragment, &self.title, css),
        }
    }
}

/// Wrap `body` in a complete HTML document.
pub fn wrap_document(body: &str, title: &str, css: &str) -> String {
    let title = if title.trim().is_empty() {
        DEFAULT_TITLE
    } else {
        title.trim()
    };
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="UTF-8">
    <meta name="viewport" content="width=device-width, initial-scale=1.0">
    <meta name="generator" content="pastemark">
    <title>{title}</title>
    <style>
{css}
    </style>
</head>
<body>
{body}
</body>
</html>"#,
        title = html_escape(title),
        css = css,
        body = body,
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// File Export
// ─────────────────────────────────────────────────────────────────────────────

/// Writes the standalone document to a file.
#[derive(Debug, Clone)]
pub struct FileSink {
    path: PathBuf,
    css: String,
    open_after_export: bool,
}

impl FileSink {
    pub fn new(path: impl Into<PathBuf>, css: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            css: css.into(),
            open_after_export: false,
        }
    }

    /// Open the written file with the system viewer.
    pub fn open_after_export(mut self, open: bool) -> Self {
        self.open_after_export = open;
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl ArtifactSink for FileSink {
    async fn deliver(&self, artifact: &Artifact) -> Result<()> {
        let html = artifact.to_document(&self.css);
        tokio::fs::write(&self.path, html)
            .await
            .map_err(|e| Error::FileWrite {
                path: self.path.clone(),
                source: e,
            })?;
        info!("Exported '{}' to {}", artifact.title, self.path.display());

        if self.open_after_export {
            if let Err(e) = open::that(&self.path) {
                warn!("Failed to open {}: {}", self.path.display(), e);
            }
        }
        Ok(())
    }

    fn describe(&self) -> String {
        format!("Saved to {}", self.path.display())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const CSS: &str = "body { color: #333; }";

    #[test]
    fn test_fragment_is_bare() {
        let artifact = Artifact::new(
            "<div><p>x</p></div>".to_string(),
            "Notes",
            "x".to_string(),
            OutputFormat::Fragment,
            CSS,
        );
        assert_eq!(artifact.html, "<div><p>x</p></div>");
        assert!(!artifact.html.contains("<!DOCTYPE"));
    }

    #[test]
    fn test_document_wraps_fragment() {
        let artifact = Artifact::new(
            "<div><p>x</p></div>".to_string(),
            "Q&A <draft>",
            String::new(),
            OutputFormat::Document,
            CSS,
        );
        assert!(artifact.html.starts_with("<!DOCTYPE html>"));
        assert!(artifact.html.contains("<title>Q&amp;A &lt;draft&gt;</title>"));
        assert!(artifact.html.contains("<style>\nbody { color: #333; }\n    </style>"));
        assert!(artifact.html.contains("<body>\n<div><p>x</p></div>\n</body>"));
    }

    #[test]
    fn test_blank_title_uses_default() {
        let html = wrap_document("<p>x</p>", "  ", "");
        assert!(html.contains(&format!("<title>{}</title>", DEFAULT_TITLE)));
    }

    #[tokio::test]
    async fn test_file_sink_writes_document() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.html");
        let artifact = Artifact::new(
            "<div><p>x</p></div>".to_string(),
            "Notes",
            String::new(),
            OutputFormat::Fragment,
            CSS,
        );

        let sink = FileSink::new(&path, CSS);
        sink.deliver(&artifact).await.unwrap();

        let written = std::fs::read_to_string(&path).unwrap();
        assert!(written.contains("<title>Notes</title>"));
        assert!(written.contains("<div><p>x</p></div>"));
        assert_eq!(sink.describe(), format!("Saved to {}", path.display()));
    }

    #[tokio::test]
    async fn test_file_sink_reports_write_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("missing").join("out.html");
        let artifact = Artifact::new(String::new(), "", String::new(), OutputFormat::Fragment, "");

        let err = FileSink::new(&path, "").deliver(&artifact).await.unwrap_err();
        assert!(matches!(err, Error::FileWrite { .. }));
    }
}
