//! Copy requests.

use crate::error::{Error, Result};
use log::debug;
use std::path::{Path, PathBuf};

/// Extensions accepted as Markdown documents.
pub const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

/// One document to copy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CopyRequest {
    /// Markdown source text.
    pub source: String,
    pub title: String,
    /// Directory the document's relative assets resolve against.
    pub base_dir: Option<PathBuf>,
}

impl CopyRequest {
    pub fn new(source: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            source: source.into(),
            title: title.into(),
            base_dir: None,
        }
    }

    /// Load a request from a Markdown file.
    ///
    /// Fails with [`Error::NoDocument`] when there is no readable file and
    /// [`Error::UnsupportedFile`] for anything that is not Markdown. Both
    /// checks run before any copy state is touched.
    pub fn from_path(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NoDocument);
        }
        let is_markdown = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                MARKDOWN_EXTENSIONS
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if !is_markdown {
            return Err(Error::UnsupportedFile(path.to_path_buf()));
        }

        let source = std::fs::read_to_string(path)?;
        let title = front_matter_title(&source).unwrap_or_else(|| {
            path.file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        debug!("Loaded '{}' ({} bytes)", path.display(), source.len());

        Ok(Self {
            source,
            title,
            base_dir: path.parent().map(Path::to_path_buf),
        })
    }
}

/// `title` from a leading YAML front matter block, if any.
fn front_matter_title(source: &str) -> Option<String> {
    let rest = source
        .strip_prefix("---\n")
        .or_else(|| source.strip_prefix("---\r\n"))?;
    let end = rest
        .split_inclusive('\n')
        .scan(0usize, |offset, line| {
            let start = *offset;
            *offset += line.len();
            Some((start, line))
        })
        .find(|(_, line)| line.trim_end() == "---")
        .map(|(start, _)| start)?;
    let yaml: serde_yaml::Value = serde_yaml::from_str(&rest[..end]).ok()?;
    let title = yaml.get("title")?.as_str()?.trim();
    (!title.is_empty()).then(|| title.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
