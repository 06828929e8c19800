//! Copy orchestrator
//!
//! Drives one copy through the phase sequence
//!
//! `Idle -> Rendering -> AwaitingSettle -> Transforming -> Stringifying ->
//! Normalizing -> Styling -> Done`
//!
//! with `Failed` reachable from every non-idle phase. Only one copy may be
//! in flight per [`Copier`]; a request that arrives while another is in
//! flight is rejected at once, not queued. The in-flight flag is released
//! by a guard on every exit path.

use super::{Artifact, ArtifactSink, Notifier, OutputFormat};
use crate::config::Settings;
use crate::dom::inner_html;
use crate::error::Result;
use crate::export::CopyRequest;
use crate::images::{ContentStore, ImageResolver, ProgressCallback, Rasterizer};
use crate::normalize::{normalize_lists, strip_inline_metadata};
use crate::render::{RenderTarget, Renderer, SettleDetector};
use crate::style::{apply_named_style, StyleCatalog};
use crate::transform::{TransformOptions, TransformPipeline};
use log::{debug, error, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

// ─────────────────────────────────────────────────────────────────────────────
// Phases and Outcomes
// ─────────────────────────────────────────────────────────────────────────────

/// Where the current (or last) copy stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CopyPhase {
    #[default]
    Idle,
    Rendering,
    AwaitingSettle,
    Transforming,
    Stringifying,
    Normalizing,
    Styling,
    Done,
    Failed,
}

/// Result of a copy request that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CopyOutcome {
    Copied(Artifact),
    /// Another copy was in flight; nothing was touched.
    Busy,
}

// ─────────────────────────────────────────────────────────────────────────────
// In-flight Guard
// ─────────────────────────────────────────────────────────────────────────────

/// Holds the in-flight flag for the lifetime of one copy.
struct CopyGuard<'a> {
    copier: &'a Copier,
}

impl<'a> CopyGuard<'a> {
    fn acquire(copier: &'a Copier) -> Option<Self> {
        copier
            .active
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .ok()
            .map(|_| Self { copier })
    }
}

impl Drop for CopyGuard<'_> {
    fn drop(&mut self) {
        if self.copier.phase() != CopyPhase::Done {
            self.copier.set_phase(CopyPhase::Failed);
        }
        self.copier.active.store(false, Ordering::Release);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Copier
// ─────────────────────────────────────────────────────────────────────────────

/// Runs copy operations with their collaborators.
pub struct Copier {
    renderer: Arc<dyn Renderer>,
    store: Arc<dyn ContentStore>,
    rasterizer: Arc<dyn Rasterizer>,
    catalog: Arc<dyn StyleCatalog>,
    settings: Settings,
    progress: Option<ProgressCallback>,
    active: AtomicBool,
    phase: Mutex<CopyPhase>,
}

impl Copier {
    pub fn new(
        renderer: Arc<dyn Renderer>,
        store: Arc<dyn ContentStore>,
        rasterizer: Arc<dyn Rasterizer>,
        catalog: Arc<dyn StyleCatalog>,
        mut settings: Settings,
    ) -> Self {
        settings.sanitize();
        Self {
            renderer,
            store,
            rasterizer,
            catalog,
            settings,
            progress: None,
            active: AtomicBool::new(false),
            phase: Mutex::new(CopyPhase::Idle),
        }
    }

    /// Receive image resolution progress as a percentage.
    pub fn with_progress(mut self, callback: ProgressCallback) -> Self {
        self.progress = Some(callback);
        self
    }

    pub fn phase(&self) -> CopyPhase {
        *self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn set_phase(&self, phase: CopyPhase) {
        let mut current = self.phase.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        debug!("Copy phase {:?} -> {:?}", *current, phase);
        *current = phase;
    }

    /// Produce the artifact for `request` without delivering it.
    pub async fn copy(&self, request: &CopyRequest) -> Result<CopyOutcome> {
        self.copy_into(request, None).await
    }

    /// Copy and deliver, reporting the outcome through `notifier`.
    ///
    /// Returns false when the request was rejected or failed. Failures are
    /// surfaced as a single notification carrying the underlying message.
    pub async fn run(
        &self,
        request: &CopyRequest,
        sink: &dyn ArtifactSink,
        notifier: &dyn Notifier,
    ) -> bool {
        match self.copy_into(request, Some(sink)).await {
            Ok(CopyOutcome::Copied(_)) => {
                notifier.success(&sink.describe());
                true
            }
            Ok(CopyOutcome::Busy) => {
                warn!("Copy already in progress; ignoring request for '{}'", request.title);
                false
            }
            Err(e) => {
                error!("Copy of '{}' failed: {}", request.title, e);
                notifier.failure(&format!("Copy failed: {}", e));
                false
            }
        }
    }

    async fn copy_into(
        &self,
        request: &CopyRequest,
        sink: Option<&dyn ArtifactSink>,
    ) -> Result<CopyOutcome> {
        let Some(_guard) = CopyGuard::acquire(self) else {
            return Ok(CopyOutcome::Busy);
        };
        let artifact = self.execute(request).await?;
        if let Some(sink) = sink {
            sink.deliver(&artifact).await?;
        }
        self.set_phase(CopyPhase::Done);
        Ok(CopyOutcome::Copied(artifact))
    }

    async fn execute(&self, request: &CopyRequest) -> Result<Artifact> {
        let settings = &self.settings;
        let source = if settings.remove_dataview_metadata {
            strip_inline_metadata(&request.source)
        } else {
            request.source.clone()
        };

        self.set_phase(CopyPhase::Rendering);
        let target = Arc::new(RenderTarget::new());
        let detector = Arc::new(SettleDetector::new(settings.settle_config()));
        self.renderer
            .render(&source, Arc::clone(&target), detector.clone())
            .await?;

        self.set_phase(CopyPhase::AwaitingSettle);
        detector.wait_until_settled().await;

        self.set_phase(CopyPhase::Transforming);
        let resolver = ImageResolver::new(
            Arc::clone(&self.store),
            Arc::clone(&self.rasterizer),
            settings.rasterize_vectors,
            settings.image_timeout(),
        );
        let pipeline = TransformPipeline::new(TransformOptions::from(settings), resolver);
        let (tree, report) = pipeline.run(&target.snapshot(), self.progress.clone()).await;
        if let Some(images) = report.images.as_ref().filter(|images| images.fallbacks() > 0) {
            warn!(
                "image fallback: {} of {} images kept their original source",
                images.fallbacks(),
                images.references.len()
            );
        }

        self.set_phase(CopyPhase::Stringifying);
        let html = inner_html(&tree, tree.root());

        self.set_phase(CopyPhase::Normalizing);
        let html = normalize_lists(&html);

        self.set_phase(CopyPhase::Styling);
        let fragment = apply_named_style(&html, self.catalog.as_ref(), &settings.style_name);
        let css = self
            .catalog
            .lookup(&settings.style_name)
            .map(|rules| rules.to_css())
            .unwrap_or_default();
        let format = if settings.bare_html_fragment {
            OutputFormat::Fragment
        } else {
            OutputFormat::Document
        };

        info!(
            "Copied '{}': {} bytes of HTML",
            request.title,
            fragment.len()
        );
        Ok(Artifact::new(
            fragment,
            &request.title,
            request.source.clone(),
            format,
            &css,
        ))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use crate::images::{RasterError, RasterSource, StoreError, VaultStore, DEFAULT_RESOURCE_PREFIX};
    use crate::render::{BlockObserver, ComrakRenderer};
    use crate::style::BuiltinCatalog;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use tokio::sync::Notify;

    struct EmptyStore;

    #[async_trait]
    impl ContentStore for EmptyStore {
        fn resource_prefix(&self) -> &str {
            DEFAULT_RESOURCE_PREFIX
        }

        async fn read_binary(&self, relative_path: &str) -> std::result::Result<Vec<u8>, StoreError> {
            Err(StoreError::NotFound(relative_path.to_string()))
        }
    }

    struct FailingRasterizer;

    #[async_trait]
    impl Rasterizer for FailingRasterizer {
        async fn rasterize(&self, _source: RasterSource) -> std::result::Result<String, RasterError> {
            Err(RasterError::Unsupported("offline".to_string()))
        }
    }

    /// Opens a block and holds it until the gate is released.
    struct GatedRenderer {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl Renderer for GatedRenderer {
        async fn render(
            &self,
            source: &str,
            target: Arc<RenderTarget>,
            observer: Arc<dyn BlockObserver>,
        ) -> Result<()> {
            observer.block_started();
            target.append_html(&format!("<p>{}</p>", source));
            self.gate.notified().await;
            observer.block_finished();
            Ok(())
        }
    }

    struct BrokenRenderer;

    #[async_trait]
    impl Renderer for BrokenRenderer {
        async fn render(
            &self,
            _source: &str,
            _target: Arc<RenderTarget>,
            _observer: Arc<dyn BlockObserver>,
        ) -> Result<()> {
            Err(Error::Render("renderer crashed".to_string()))
        }
    }

    #[derive(Default)]
    struct RecordingNotifier {
        messages: Mutex<Vec<String>>,
    }

    impl Notifier for RecordingNotifier {
        fn success(&self, message: &str) {
            self.messages.lock().unwrap().push(format!("ok: {}", message));
        }

        fn failure(&self, message: &str) {
            self.messages.lock().unwrap().push(format!("err: {}", message));
        }
    }

    #[derive(Default)]
    struct MemorySink {
        delivered: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl ArtifactSink for MemorySink {
        async fn deliver(&self, artifact: &Artifact) -> Result<()> {
            self.delivered.lock().unwrap().push(artifact.html.clone());
            Ok(())
        }

        fn describe(&self) -> String {
            "Stored".to_string()
        }
    }

    fn copier(renderer: Arc<dyn Renderer>, settings: Settings) -> Copier {
        Copier::new(
            renderer,
            Arc::new(EmptyStore),
            Arc::new(FailingRasterizer),
            Arc::new(BuiltinCatalog::new()),
            settings,
        )
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Mutual exclusion
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test(start_paused = true)]
    async fn test_second_request_rejected_while_in_flight() {
        let gate = Arc::new(Notify::new());
        let copier = copier(
            Arc::new(GatedRenderer { gate: Arc::clone(&gate) }),
            Settings::default(),
        );
        let first_request = CopyRequest::new("first", "First");
        let second_request = CopyRequest::new("second", "Second");

        let (first, (phase_during, second, phase_after)) = tokio::join!(
            copier.copy(&first_request),
            async {
                let phase_during = copier.phase();
                let second = copier.copy(&second_request).await;
                let phase_after = copier.phase();
                gate.notify_one();
                (phase_during, second, phase_after)
            }
        );

        assert_eq!(phase_during, CopyPhase::Rendering);
        assert!(matches!(second, Ok(CopyOutcome::Busy)));
        assert_eq!(phase_after, CopyPhase::Rendering);

        let CopyOutcome::Copied(artifact) = first.unwrap() else {
            panic!("first copy should complete");
        };
        assert!(artifact.html.contains("first"));
        assert!(!artifact.html.contains("second"));
        assert_eq!(copier.phase(), CopyPhase::Done);
        assert!(!copier.active.load(Ordering::Acquire));
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_reports_busy_as_false() {
        let gate = Arc::new(Notify::new());
        let copier = copier(
            Arc::new(GatedRenderer { gate: Arc::clone(&gate) }),
            Settings::default(),
        );
        let sink = MemorySink::default();
        let notifier = RecordingNotifier::default();
        let request = CopyRequest::new("doc", "Doc");

        let (first, second) = tokio::join!(copier.run(&request, &sink, &notifier), async {
            let second = copier.run(&request, &sink, &notifier).await;
            gate.notify_one();
            second
        });

        assert!(first);
        assert!(!second);
        assert_eq!(sink.delivered.lock().unwrap().len(), 1);
        assert_eq!(*notifier.messages.lock().unwrap(), vec!["ok: Stored"]);
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Failure handling
    // ─────────────────────────────────────────────────────────────────────────

    #[tokio::test]
    async fn test_failure_releases_guard_and_notifies() {
        let copier = copier(Arc::new(BrokenRenderer), Settings::default());
        let sink = MemorySink::default();
        let notifier = RecordingNotifier::default();
        let request = CopyRequest::new("doc", "Doc");

        assert!(!copier.run(&request, &sink, &notifier).await);
        assert_eq!(copier.phase(), CopyPhase::Failed);
        assert!(!copier.active.load(Ordering::Acquire));
        assert!(sink.delivered.lock().unwrap().is_empty());

        let messages = notifier.messages.lock().unwrap().clone();
        assert_eq!(messages.len(), 1);
        assert!(messages[0].starts_with("err: Copy failed:"));
        assert!(messages[0].contains("renderer crashed"));

        // The next request runs (and fails) instead of being rejected.
        assert!(matches!(copier.copy(&request).await, Err(Error::Render(_))));
    }

    // ─────────────────────────────────────────────────────────────────────────
    // End to end
    // ─────────────────────────────────────────────────────────────────────────

    const NOTE: &str = "---\ntitle: Weekly\n---\n# Weekly\n\n- item one\n  : continuation text\n- [ ] open task\n\n![chart](chart.png)\n\n```rust\nfn main() {}\n```\n";

    fn vault_copier(dir: &TempDir, settings: Settings) -> Copier {
        std::fs::write(dir.path().join("chart.png"), b"not-really-a-png").unwrap();
        Copier::new(
            Arc::new(ComrakRenderer::new(DEFAULT_RESOURCE_PREFIX)),
            Arc::new(VaultStore::new(dir.path())),
            Arc::new(FailingRasterizer),
            Arc::new(BuiltinCatalog::new()),
            settings,
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_fragment() {
        let dir = TempDir::new().unwrap();
        let copier = vault_copier(&dir, Settings::default());
        let request = CopyRequest::new(NOTE, "Weekly");

        let CopyOutcome::Copied(artifact) = copier.copy(&request).await.unwrap() else {
            panic!("copy should not be rejected");
        };
        let html = &artifact.html;

        assert_eq!(artifact.format, OutputFormat::Fragment);
        assert!(html.starts_with("<div style=\"font-family:"));
        assert!(!html.contains("frontmatter"));
        assert!(!html.contains("position: absolute"));
        assert!(html.contains("item one: continuation text"));
        assert!(html.contains(r#"disabled="""#));
        assert!(html.contains("data:image/png;base64,"));
        assert!(!html.contains("app://local/"));
        assert!(html.contains("fn main() {}"));
        assert!(!html.contains("language-rust"));
        assert_eq!(artifact.plain_text, NOTE);
        assert_eq!(copier.phase(), CopyPhase::Done);
    }

    #[tokio::test(start_paused = true)]
    async fn test_end_to_end_document() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            bare_html_fragment: false,
            ..Settings::default()
        };
        let copier = vault_copier(&dir, settings);

        let CopyOutcome::Copied(artifact) =
            copier.copy(&CopyRequest::new(NOTE, "Weekly")).await.unwrap()
        else {
            panic!("copy should not be rejected");
        };
        assert!(artifact.html.starts_with("<!DOCTYPE html>"));
        assert!(artifact.html.contains("<title>Weekly</title>"));
        assert!(artifact.html.contains("body { font-family:"));
        assert!(artifact.html.contains(&artifact.fragment));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dataview_metadata_stripped_when_enabled() {
        let dir = TempDir::new().unwrap();
        let source = "status:: draft\nBody text\n";

        let keep = vault_copier(&dir, Settings::default());
        let CopyOutcome::Copied(kept) = keep.copy(&CopyRequest::new(source, "t")).await.unwrap()
        else {
            panic!("copy should not be rejected");
        };
        assert!(kept.html.contains("status:: draft"));

        let settings = Settings {
            remove_dataview_metadata: true,
            ..Settings::default()
        };
        let strip = vault_copier(&dir, settings);
        let CopyOutcome::Copied(stripped) =
            strip.copy(&CopyRequest::new(source, "t")).await.unwrap()
        else {
            panic!("copy should not be rejected");
        };
        assert!(!stripped.html.contains("status::"));
        assert!(stripped.html.contains("Body text"));
        assert_eq!(stripped.plain_text, source);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fenced_code_keeps_list_like_lines() {
        let dir = TempDir::new().unwrap();
        let copier = vault_copier(&dir, Settings::default());
        let source = "- real item\n  : merged\n\n```haskell\nxs =\n- a\n  : b\n```\n";

        let CopyOutcome::Copied(artifact) =
            copier.copy(&CopyRequest::new(source, "t")).await.unwrap()
        else {
            panic!("copy should not be rejected");
        };
        assert!(artifact.html.contains("real item: merged"));
        assert!(artifact.html.contains("xs =\n- a\n  : b"));
        assert!(!artifact.html.contains("- a: b"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_unknown_style_still_copies() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            style_name: "neon".to_string(),
            ..Settings::default()
        };
        let copier = vault_copier(&dir, settings);
        let CopyOutcome::Copied(artifact) =
            copier.copy(&CopyRequest::new("plain", "t")).await.unwrap()
        else {
            panic!("copy should not be rejected");
        };
        assert_eq!(artifact.html.trim_end(), "<p>plain</p>");
    }
}
