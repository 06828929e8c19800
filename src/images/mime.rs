//! Mime inference and data URI helpers.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;

pub const SVG_MIME: &str = "image/svg+xml";
pub const PNG_MIME: &str = "image/png";

/// Infer an image mime type from the extension of the last path segment.
///
/// `svg` and `jpg` are special-cased; anything else maps to
/// `image/<extension>`, and a missing extension means PNG.
pub fn mime_from_path(path: &str) -> String {
    let segment = path.rsplit('/').next().unwrap_or(path);
    let extension = segment
        .rsplit_once('.')
        .map(|(_, ext)| ext.to_ascii_lowercase())
        .filter(|ext| !ext.is_empty())
        .unwrap_or_else(|| "png".to_string());
    match extension.as_str() {
        "svg" => SVG_MIME.to_string(),
        "jpg" => "image/jpeg".to_string(),
        ext => format!("image/{}", ext),
    }
}

pub fn is_data_uri(source: &str) -> bool {
    source.trim_start().get(..5).is_some_and(|prefix| prefix.eq_ignore_ascii_case("data:"))
}

/// Build a base64 data URI.
pub fn to_data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{};base64,{}", mime, STANDARD.encode(bytes))
}

/// Mime type declared by a data URI, if any.
pub fn data_uri_mime(source: &str) -> Option<String> {
    let rest = source.trim_start().get(5..)?;
    let header = rest.split(',').next()?;
    let mime = header.split(';').next()?.trim();
    (!mime.is_empty()).then(|| mime.to_ascii_lowercase())
}

/// Decode the payload of a data URI (base64 or percent-encoded).
pub fn decode_data_uri(source: &str) -> Option<(String, Vec<u8>)> {
    if !is_data_uri(source) {
        return None;
    }
    let rest = &source.trim_start()[5..];
    let (header, payload) = rest.split_once(',')?;
    let mime = data_uri_mime(source).unwrap_or_else(|| "text/plain".to_string());
    let bytes = if header.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        STANDARD.decode(payload.trim()).ok()?
    } else {
        urlencoding::decode_binary(payload.as_bytes()).into_owned()
    };
    Some((mime, bytes))
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
