//! Copy orchestration and artifact delivery
//!
//! # Architecture
//!
//! - `request.rs` - Copy requests and their preconditions
//! - `document.rs` - Fragment/document assembly and the file sink
//! - `clipboard.rs` - System clipboard sink
//! - `orchestrator.rs` - The copy state machine and its mutual exclusion

mod clipboard;
mod document;
mod orchestrator;
mod request;

pub use clipboard::ClipboardSink;
pub use document::{wrap_document, Artifact, FileSink, OutputFormat, DEFAULT_TITLE};
pub use orchestrator::{CopyOutcome, CopyPhase, Copier};
pub use request::{CopyRequest, MARKDOWN_EXTENSIONS};

use crate::error::Result;
use async_trait::async_trait;
use log::{error, info};

/// Destination for a finished artifact.
#[async_trait]
pub trait ArtifactSink: Send + Sync {
    async fn deliver(&self, artifact: &Artifact) -> Result<()>;

    /// Short success message, e.g. "Copied to clipboard".
    fn describe(&self) -> String;
}

/// Surfaces the outcome of a copy to the user.
pub trait Notifier: Send + Sync {
    fn success(&self, message: &str);
    fn failure(&self, message: &str);
}

/// Notifier that only writes to the log.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn success(&self, message: &str) {
        info!("{}", message);
    }

    fn failure(&self, message: &str) {
        error!("{}", message);
    }
}
