//! Crate-wide error type
//!
//! Covers everything that can abort a copy: file access, settings, render
//! failures and clipboard access. Per-image failures have their own error
//! types in [`crate::images`] and are contained there.

use log::warn;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// `Result` with [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;

type BoxedSource = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, Error)]
pub enum Error {
    // ─────────────────────────────────────────────────────────────────────────
    // Files
    // ─────────────────────────────────────────────────────────────────────────
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// An export target could not be written
    #[error("Failed to write '{}': {source}", path.display())]
    FileWrite { path: PathBuf, source: io::Error },

    // ─────────────────────────────────────────────────────────────────────────
    // Settings
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Failed to load configuration from '{}': {source}", path.display())]
    ConfigLoad { path: PathBuf, source: BoxedSource },

    #[error("Failed to save configuration to '{}': {source}", path.display())]
    ConfigSave { path: PathBuf, source: BoxedSource },

    /// The settings file exists but is not valid settings JSON
    #[error("Invalid configuration format: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<BoxedSource>,
    },

    /// The platform has no config directory
    #[error("Configuration directory not found")]
    ConfigDirNotFound,

    // ─────────────────────────────────────────────────────────────────────────
    // Copy Preconditions
    // ─────────────────────────────────────────────────────────────────────────
    #[error("No document to copy")]
    NoDocument,

    #[error("Unsupported file type: '{}'", .0.display())]
    UnsupportedFile(PathBuf),

    // ─────────────────────────────────────────────────────────────────────────
    // Pipeline
    // ─────────────────────────────────────────────────────────────────────────
    #[error("Rendering failed: {0}")]
    Render(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    #[error("{0}")]
    Application(String),
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        Error::ConfigParse {
            message: err.to_string(),
            source: Some(Box::new(err)),
        }
    }
}

impl From<arboard::Error> for Error {
    fn from(err: arboard::Error) -> Self {
        Error::Clipboard(err.to_string())
    }
}

/// Falling back to a default instead of failing.
pub trait ResultExt<T> {
    /// The value, or `default` after logging the error at warn level.
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T;
}

impl<T> ResultExt<T> for Result<T> {
    fn unwrap_or_warn_default(self, default: T, context: &str) -> T {
        self.unwrap_or_else(|err| {
            warn!("{}: {}. Falling back to defaults.", context, err);
            default
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error as _;

    #[test]
    fn test_io_converts() {
        let err: Error = io::Error::new(io::ErrorKind::PermissionDenied, "locked").into();
        assert!(matches!(err, Error::Io(_)));
        assert!(err.source().is_some());
    }

    #[test]
    fn test_file_write_names_path_and_cause() {
        let err = Error::FileWrite {
            path: PathBuf::from("/out/note.html"),
            source: io::Error::new(io::ErrorKind::Other, "disk full"),
        };
        assert_eq!(err.to_string(), "Failed to write '/out/note.html': disk full");
    }

    #[test]
    fn test_json_error_is_config_parse() {
        let bad = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        let err = Error::from(bad);
        assert!(matches!(err, Error::ConfigParse { source: Some(_), .. }));
    }

    #[test]
    fn test_precondition_messages() {
        assert_eq!(Error::NoDocument.to_string(), "No document to copy");
        assert_eq!(
            Error::UnsupportedFile(PathBuf::from("image.png")).to_string(),
            "Unsupported file type: 'image.png'"
        );
        assert!(Error::Render("boom".to_string()).source().is_none());
    }

    #[test]
    fn test_unwrap_or_warn_default() {
        let ok: Result<u8> = Ok(7);
        assert_eq!(ok.unwrap_or_warn_default(0, "ctx"), 7);

        let failed: Result<u8> = Err(Error::ConfigDirNotFound);
        assert_eq!(failed.unwrap_or_warn_default(3, "ctx"), 3);
    }
}
