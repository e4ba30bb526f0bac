use std::path::Path;

static MIME_TYPES: &[(&str, &str)] = &[
    ("html", "text/html"),
    ("htm", "text/html"),
    ("css", "text/css"),
    ("js", "application/javascript"),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("ico", "image/x-icon"),
    ("json", "application/json"),
    ("txt", "text/plain"),
];

pub const DEFAULT_CONTENT_TYPE: &str = "application/octet-stream";

/// Content type for `file_path` derived from its extension, case-insensitively.
pub fn content_type(file_path: &Path) -> &'static str {
    let ext = file_path
        .extension()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_lowercase();

    MIME_TYPES
        .iter()
        .find(|(e, _)| *e == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(DEFAULT_CONTENT_TYPE)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_extensions() {
        assert_eq!(content_type(Path::new("a/index.html")), "text/html");
        assert_eq!(content_type(Path::new("old.HTM")), "text/html");
        assert_eq!(content_type(Path::new("style.css")), "text/css");
        assert_eq!(content_type(Path::new("app.js")), "application/javascript");
    }

    #[test]
    fn unknown_or_missing_extension() {
        assert_eq!(content_type(Path::new("archive.tar.zst")), DEFAULT_CONTENT_TYPE);
        assert_eq!(content_type(Path::new("README")), DEFAULT_CONTENT_TYPE);
    }
}
