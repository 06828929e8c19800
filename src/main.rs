//! pastemark - Main Entry Point
//!
//! Copies a Markdown file to the clipboard as inline-styled HTML, or writes
//! it to a file.

use async_trait::async_trait;
use clap::{Parser, ValueEnum};
use log::{debug, error, info};
use pastemark::config::{load_config, save_config_silent, InternalLinkHandling, Settings};
use pastemark::export::{
    Artifact, ArtifactSink, ClipboardSink, Copier, CopyRequest, FileSink, Notifier,
};
use pastemark::images::{BitmapRasterizer, ContentStore, VaultStore};
use pastemark::render::ComrakRenderer;
use pastemark::style::{BuiltinCatalog, StyleCatalog};
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

/// Application name constant.
const APP_NAME: &str = "pastemark";

/// Copy rendered Markdown as self-contained, inline-styled HTML.
#[derive(Debug, Parser)]
#[command(name = APP_NAME, version, about)]
struct Args {
    /// Markdown file to copy
    path: PathBuf,

    /// Style preset to inline (default, minimal, custom)
    #[arg(short, long)]
    style: Option<String>,

    /// Write a standalone HTML document here instead of the clipboard
    #[arg(short, long, conflicts_with = "print")]
    output: Option<PathBuf>,

    /// Print the HTML to stdout instead of the clipboard
    #[arg(long)]
    print: bool,

    /// Produce a full HTML document instead of a bare fragment
    #[arg(long)]
    document: bool,

    /// Open the written file afterwards
    #[arg(long, requires = "output")]
    open: bool,

    /// Leave image sources as they are
    #[arg(long)]
    no_images: bool,

    /// What to do with links to other notes
    #[arg(long, value_enum, value_name = "MODE")]
    links: Option<LinkModeArg>,

    /// Remember these options as the new defaults
    #[arg(long)]
    save_settings: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LinkModeArg {
    /// Leave links as rendered
    Keep,
    /// Replace links with their text
    Text,
    /// Drop links and their text
    Remove,
}

impl From<LinkModeArg> for InternalLinkHandling {
    fn from(arg: LinkModeArg) -> Self {
        match arg {
            LinkModeArg::Keep => InternalLinkHandling::Keep,
            LinkModeArg::Text => InternalLinkHandling::Text,
            LinkModeArg::Remove => InternalLinkHandling::Remove,
        }
    }
}

impl Args {
    /// Apply command-line overrides on top of the saved settings.
    fn apply(&self, settings: &mut Settings) {
        if let Some(style) = &self.style {
            settings.style_name = style.clone();
        }
        if self.document {
            settings.bare_html_fragment = false;
        }
        if self.open {
            settings.open_after_export = true;
        }
        if self.no_images {
            settings.embed_images = false;
        }
        if let Some(links) = self.links {
            settings.internal_links = links.into();
        }
        settings.sanitize();
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Terminal Sinks
// ─────────────────────────────────────────────────────────────────────────────

struct StdoutSink;

#[async_trait]
impl ArtifactSink for StdoutSink {
    async fn deliver(&self, artifact: &Artifact) -> pastemark::Result<()> {
        let mut stdout = std::io::stdout().lock();
        writeln!(stdout, "{}", artifact.html)?;
        stdout.flush()?;
        Ok(())
    }

    fn describe(&self) -> String {
        "Written to stdout".to_string()
    }
}

struct StderrNotifier;

impl Notifier for StderrNotifier {
    fn success(&self, message: &str) {
        info!("{}", message);
    }

    fn failure(&self, message: &str) {
        eprintln!("{}: {}", APP_NAME, message);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Entry Point
// ─────────────────────────────────────────────────────────────────────────────

async fn copy(args: &Args, request: CopyRequest, settings: Settings) -> bool {
    let rasterizer = match BitmapRasterizer::new() {
        Ok(rasterizer) => rasterizer,
        Err(e) => {
            error!("Failed to set up image fetching: {}", e);
            return false;
        }
    };
    let base_dir = request
        .base_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from("."));
    let store = Arc::new(VaultStore::new(base_dir));
    let renderer = Arc::new(ComrakRenderer::new(store.resource_prefix()));
    let catalog = BuiltinCatalog::with_custom(settings.custom_stylesheet.as_deref());
    let css = catalog
        .lookup(&settings.style_name)
        .map(|rules| rules.to_css())
        .unwrap_or_default();

    let sink: Box<dyn ArtifactSink> = if args.print {
        Box::new(StdoutSink)
    } else if let Some(path) = &args.output {
        Box::new(FileSink::new(path, css).open_after_export(settings.open_after_export))
    } else {
        Box::new(ClipboardSink::new())
    };

    let copier = Copier::new(
        renderer,
        store,
        Arc::new(rasterizer),
        Arc::new(catalog),
        settings,
    )
    .with_progress(Arc::new(|percent| debug!("Images settled: {:.0}%", percent)));
    copier.run(&request, sink.as_ref(), &StderrNotifier).await
}

fn main() -> ExitCode {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    let request = match CopyRequest::from_path(&args.path) {
        Ok(request) => request,
        Err(e) => {
            error!("{}: {}", args.path.display(), e);
            return ExitCode::FAILURE;
        }
    };

    let mut settings = load_config();
    args.apply(&mut settings);
    if args.save_settings {
        save_config_silent(&settings);
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    if runtime.block_on(copy(&args, request, settings)) {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
