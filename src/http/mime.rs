//! MIME type detection module
//!
//! Content types come from the configured extension table; anything not in
//! the table is served as HTML.

use std::collections::HashMap;
use std::path::Path;

/// Content type for extensions missing from the table
pub const FALLBACK_CONTENT_TYPE: &str = "text/html";

/// Built-in extension table. Keys carry the leading dot.
pub fn default_content_types() -> HashMap<String, String> {
    [
        // Text
        (".css", "text/css"),
        (".js", "text/javascript"),
        (".txt", "text/plain"),
        (".html", "text/html"),
        (".htm", "text/html"),
        (".xml", "application/xml"),
        (".json", "application/json"),
        (".wasm", "application/wasm"),
        // Images
        (".png", "image/png"),
        (".jpg", "image/jpeg"),
        (".jpeg", "image/jpeg"),
        (".gif", "image/gif"),
        (".svg", "image/svg+xml"),
        (".ico", "image/x-icon"),
        (".webp", "image/webp"),
        // Fonts
        (".woff", "font/woff"),
        (".woff2", "font/woff2"),
        (".ttf", "font/ttf"),
        (".otf", "font/otf"),
        // Documents
        (".pdf", "application/pdf"),
        (".zip", "application/zip"),
    ]
    .into_iter()
    .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
    .collect()
}

/// Look up the content type for `filename` by its extension
///
/// # Examples
/// ```
/// use zy::http::mime::{content_type_for, default_content_types};
/// let table = default_content_types();
/// assert_eq!(content_type_for("/css/site.css", &table), "text/css");
/// assert_eq!(content_type_for("/notes.unknown", &table), "text/html");
/// ```
pub fn content_type_for<'a>(filename: &str, table: &'a HashMap<String, String>) -> &'a str {
    Path::new(filename)
        .extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| table.get(&format!(".{ext}")))
        .map_or(FALLBACK_CONTENT_TYPE, String::as_str)
}
