//! Avatar helpers.
//!
//! The core stores avatar references only; placeholder generation is a pure
//! function the renderer calls when a role has no uploaded image.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;

/// Generated placeholder: a dark circle with the first character of `name`,
/// as an inline SVG `data:` URI.
#[must_use]
pub fn placeholder_avatar(name: &str) -> String {
    let initial: String = name.trim().chars().take(1).collect();
    let initial = if initial.is_empty() {
        "?".to_string()
    } else {
        initial
    };

    let svg = format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="30" height="30"><rect width="30" height="30" rx="6" fill="#111"/><text x="15" y="20" font-family="sans-serif" font-size="14" fill="#fff" text-anchor="middle">{}</text></svg>"##,
        escape_xml(&initial)
    );
    format!("data:image/svg+xml;base64,{}", STANDARD.encode(svg))
}

/// Embed uploaded image bytes as a `data:` URI, the way the original UI
/// embedded `FileReader.readAsDataURL` results.
#[must_use]
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    format!("data:{mime};base64,{}", STANDARD.encode(bytes))
}

fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}
