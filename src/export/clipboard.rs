//! Clipboard sink
//!
//! Writes the artifact as HTML with the Markdown source as the plain-text
//! alternative, so paste targets without HTML support still get something
//! readable.

use super::{Artifact, ArtifactSink};
use crate::error::Result;
use arboard::Clipboard;
use async_trait::async_trait;
use log::{debug, info};

/// Delivers artifacts to the system clipboard.
#[derive(Debug, Default, Clone, Copy)]
pub struct ClipboardSink;

impl ClipboardSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArtifactSink for ClipboardSink {
    async fn deliver(&self, artifact: &Artifact) -> Result<()> {
        let mut clipboard = Clipboard::new()?;
        debug!(
            "Writing {} bytes of HTML ({} bytes alt text) to clipboard",
            artifact.html.len(),
            artifact.plain_text.len()
        );
        clipboard.set_html(&artifact.html, Some(&artifact.plain_text))?;
        info!("Copied '{}' to clipboard", artifact.title);
        Ok(())
    }

    fn describe(&self) -> String {
        "Copied to clipboard".to_string()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    // Note: clipboard access needs a display server, so only the error
    // surface is tested here.

    #[test]
    fn test_clipboard_error_display() {
        let err = Error::from(arboard::Error::ContentNotAvailable);
        assert!(matches!(err, Error::Clipboard(_)));
        assert!(err.to_string().starts_with("Clipboard error:"));
    }

    #[test]
    fn test_describe() {
        assert_eq!(ClipboardSink::new().describe(), "Copied to clipboard");
    }
}
