//! Rasterization of images into PNG data URIs.
//!
//! Network images are fetched and re-encoded, vector images are rendered to
//! a bitmap at their natural size. Callers treat every error as "keep the
//! original source".

use super::mime::{decode_data_uri, is_data_uri, to_data_uri, PNG_MIME, SVG_MIME};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, RgbaImage};
use std::io::Cursor;
use std::time::Duration;
use thiserror::Error;

/// Upper bound on decoded pixels for a single image.
pub const MAX_IMAGE_PIXELS: u64 = 40_000_000;

/// Time allowed to establish a connection to an image host.
pub const FETCH_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Time allowed for a whole image download, connection included.
pub const FETCH_TIMEOUT: Duration = Duration::from_secs(30);

/// What to rasterize.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RasterSource {
    /// A network URL or a data URI.
    Url(String),
    /// Serialized inline `<svg>` markup.
    SvgMarkup(String),
    /// Raw file content with its inferred mime type.
    Bytes { mime: String, bytes: Vec<u8> },
}

#[derive(Debug, Error)]
pub enum RasterError {
    #[error("fetch failed: {0}")]
    Fetch(String),

    #[error("decode failed: {0}")]
    Decode(String),

    #[error("encode failed: {0}")]
    Encode(String),

    #[error("unsupported source: {0}")]
    Unsupported(String),
}

impl From<reqwest::Error> for RasterError {
    fn from(err: reqwest::Error) -> Self {
        RasterError::Fetch(err.to_string())
    }
}

/// Converts an image source into a PNG data URI.
#[async_trait]
pub trait Rasterizer: Send + Sync {
    async fn rasterize(&self, source: RasterSource) -> Result<String, RasterError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// Bitmap Rasterizer
// ─────────────────────────────────────────────────────────────────────────────

/// Default rasterizer: `reqwest` for fetching, `resvg` for SVG, `image` for
/// bitmaps.
#[derive(Debug, Clone)]
pub struct BitmapRasterizer {
    client: reqwest::Client,
}

impl BitmapRasterizer {
    /// Rasterizer with the default fetch timeouts.
    pub fn new() -> Result<Self, RasterError> {
        Self::with_timeouts(FETCH_CONNECT_TIMEOUT, FETCH_TIMEOUT)
    }

    /// A stalled host fails the fetch once `total` has elapsed.
    pub fn with_timeouts(connect: Duration, total: Duration) -> Result<Self, RasterError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(connect)
            .timeout(total)
            .build()?;
        Ok(Self { client })
    }

    async fn load(&self, source: RasterSource) -> Result<(String, Vec<u8>), RasterError> {
        match source {
            RasterSource::SvgMarkup(markup) => Ok((SVG_MIME.to_string(), markup.into_bytes())),
            RasterSource::Bytes { mime, bytes } => Ok((mime, bytes)),
            RasterSource::Url(url) if is_data_uri(&url) => decode_data_uri(&url)
                .ok_or_else(|| RasterError::Decode("malformed data URI".to_string())),
            RasterSource::Url(url) if url.starts_with("http://") || url.starts_with("https://") => {
                let response = self.client.get(&url).send().await?.error_for_status()?;
                let mime = response
                    .headers()
                    .get(reqwest::header::CONTENT_TYPE)
                    .and_then(|value| value.to_str().ok())
                    .map(|value| value.split(';').next().unwrap_or("").trim().to_string())
                    .unwrap_or_default();
                let bytes = response.bytes().await?;
                Ok((mime, bytes.to_vec()))
            }
            RasterSource::Url(url) => Err(RasterError::Unsupported(url)),
        }
    }
}

#[async_trait]
impl Rasterizer for BitmapRasterizer {
    async fn rasterize(&self, source: RasterSource) -> Result<String, RasterError> {
        let (mime, bytes) = self.load(source).await?;
        let png = if mime == SVG_MIME || looks_like_svg(&bytes) {
            render_svg(&bytes)?
        } else {
            reencode_bitmap(&bytes)?
        };
        Ok(to_data_uri(PNG_MIME, &png))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Decoding
// ─────────────────────────────────────────────────────────────────────────────

fn looks_like_svg(bytes: &[u8]) -> bool {
    let mut rest = bytes.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(bytes);
    while let Some(first) = rest.first() {
        if !first.is_ascii_whitespace() {
            break;
        }
        rest = &rest[1..];
    }
    if rest.starts_with(b"<svg") {
        return true;
    }
    rest.starts_with(b"<?xml") && rest.windows(4).any(|window| window == b"<svg")
}

fn check_size(width: u32, height: u32) -> Result<(), RasterError> {
    let pixels = u64::from(width) * u64::from(height);
    if pixels == 0 || pixels > MAX_IMAGE_PIXELS {
        return Err(RasterError::Decode(format!(
            "unsupported image size {}x{}",
            width, height
        )));
    }
    Ok(())
}

fn encode_png(image: DynamicImage) -> Result<Vec<u8>, RasterError> {
    let mut out = Cursor::new(Vec::new());
    image
        .write_to(&mut out, ImageFormat::Png)
        .map_err(|e| RasterError::Encode(e.to_string()))?;
    Ok(out.into_inner())
}

fn reencode_bitmap(bytes: &[u8]) -> Result<Vec<u8>, RasterError> {
    let image = image::load_from_memory(bytes).map_err(|e| RasterError::Decode(e.to_string()))?;
    check_size(image.width(), image.height())?;
    encode_png(image)
}

/// Render SVG at its natural size.
fn render_svg(bytes: &[u8]) -> Result<Vec<u8>, RasterError> {
    let options = resvg::usvg::Options::default();
    let tree = resvg::usvg::Tree::from_data(bytes, &options)
        .map_err(|e| RasterError::Decode(e.to_string()))?;
    let size = tree.size().to_int_size();
    let (width, height) = (size.width(), size.height());
    check_size(width, height)?;

    let mut pixmap = resvg::tiny_skia::Pixmap::new(width, height)
        .ok_or_else(|| RasterError::Decode("cannot allocate pixmap".to_string()))?;
    resvg::render(
        &tree,
        resvg::tiny_skia::Transform::identity(),
        &mut pixmap.as_mut(),
    );

    let rgba: Vec<u8> = pixmap
        .pixels()
        .iter()
        .flat_map(|pixel| {
            let color = pixel.demultiply();
            [color.red(), color.green(), color.blue(), color.alpha()]
        })
        .collect();
    let image = RgbaImage::from_raw(width, height, rgba)
        .ok_or_else(|| RasterError::Encode("pixel buffer size mismatch".to_string()))?;
    encode_png(DynamicImage::ImageRgba8(image))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
