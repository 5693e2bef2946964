//! MIME type detection for artifact names.
//!
//! Artifact names are logical paths (`/game.js`, `/shader/sky.glsl`), so the
//! type is guessed from the extension alone.

use std::path::Path;

/// Common MIME type constants.
pub mod types {
    // Text
    pub const HTML: &str = "text/html; charset=utf-8";
    pub const PLAIN: &str = "text/plain; charset=utf-8";
    pub const CSS: &str = "text/css; charset=utf-8";
    pub const JAVASCRIPT: &str = "text/javascript; charset=utf-8";
    pub const JSON: &str = "application/json";

    // Binary
    pub const OCTET_STREAM: &str = "application/octet-stream";
    pub const WASM: &str = "application/wasm";

    // Images
    pub const PNG: &str = "image/png";
    pub const JPEG: &str = "image/jpeg";
    pub const WEBP: &str = "image/webp";
    pub const SVG: &str = "image/svg+xml";

    // Audio
    pub const MP3: &str = "audio/mpeg";
    pub const WAV: &str = "audio/wav";
    pub const OGG_AUDIO: &str = "audio/ogg";
    pub const OPUS: &str = "audio/opus";

    // Fonts
    pub const WOFF2: &str = "font/woff2";
}

/// Guess MIME type from a path or artifact name.
pub fn from_path(path: &Path) -> &'static str {
    from_extension(path.extension().and_then(|e| e.to_str()))
}

/// Guess MIME type from file extension string.
pub fn from_extension(ext: Option<&str>) -> &'static str {
    match ext {
        Some("html" | "htm") => types::HTML,
        Some("css") => types::CSS,
        Some("js" | "mjs") => types::JAVASCRIPT,
        Some("json" | "map") => types::JSON,
        Some("txt" | "glsl" | "vert" | "frag") => types::PLAIN,

        Some("svg") => types::SVG,
        Some("png") => types::PNG,
        Some("jpg" | "jpeg") => types::JPEG,
        Some("webp") => types::WEBP,

        Some("mp3") => types::MP3,
        Some("wav") => types::WAV,
        Some("ogg" | "oga") => types::OGG_AUDIO,
        Some("opus") => types::OPUS,

        Some("woff2") => types::WOFF2,
        Some("wasm") => types::WASM,

        _ => types::OCTET_STREAM,
    }
}
