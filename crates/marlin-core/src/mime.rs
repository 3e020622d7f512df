//! MIME classification.
//!
//! Two data tables drive every type decision in the build: extension to MIME
//! type, and MIME type to [`FileRole`]. Engine dispatch keys off the MIME
//! string, route classification keys off the role.

use std::{collections::HashMap, path::Path};

/// Markdown content.
pub const MARKDOWN: &str = "text/markdown";
/// JSON content.
pub const JSON: &str = "application/json";
/// Plain text content.
pub const PLAIN_TEXT: &str = "text/plain";
/// Stylesheets.
pub const CSS: &str = "text/css";
/// SCSS stylesheet sources.
pub const SCSS: &str = "text/x-scss";
/// Scripts.
pub const JAVASCRIPT: &str = "application/javascript";
/// HTML templates.
pub const HTML: &str = "text/html";
/// Mustache templates.
pub const MUSTACHE: &str = "text/x-mustache";

const BUILTIN_TYPES: &[(&str, &str)] = &[
    ("md", MARKDOWN),
    ("markdown", MARKDOWN),
    ("json", JSON),
    ("txt", PLAIN_TEXT),
    ("css", CSS),
    ("scss", SCSS),
    ("js", JAVASCRIPT),
    ("mjs", JAVASCRIPT),
    ("html", HTML),
    ("htm", HTML),
    ("mustache", MUSTACHE),
    ("png", "image/png"),
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("gif", "image/gif"),
    ("svg", "image/svg+xml"),
    ("webp", "image/webp"),
    ("ico", "image/x-icon"),
    ("avif", "image/avif"),
];

const ROLES: &[(&str, FileRole)] = &[
    (MARKDOWN, FileRole::Content),
    (JSON, FileRole::Content),
    (PLAIN_TEXT, FileRole::Content),
    (CSS, FileRole::Stylesheet),
    (SCSS, FileRole::Stylesheet),
    (JAVASCRIPT, FileRole::Script),
];

/// The role a file plays inside a route node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileRole {
    /// Textual page content (markdown, JSON, plain text).
    Content,
    /// Stylesheet asset.
    Stylesheet,
    /// Image asset.
    Image,
    /// Script asset.
    Script,
    /// Recognized MIME type with no route role.
    Unknown,
}

impl FileRole {
    /// Classify a MIME type.
    pub fn of(mime: &str) -> Self {
        if let Some((_, role)) = ROLES.iter().find(|(m, _)| *m == mime) {
            return *role;
        }
        if mime.starts_with("image/") {
            return Self::Image;
        }
        Self::Unknown
    }
}

/// Extension to MIME type lookup table.
#[derive(Debug, Clone)]
pub struct MimeTable {
    by_extension: HashMap<String, String>,
}

impl Default for MimeTable {
    fn default() -> Self {
        Self::new()
    }
}

impl MimeTable {
    /// Create a table with the built-in types.
    pub fn new() -> Self {
        let by_extension = BUILTIN_TYPES
            .iter()
            .map(|(ext, mime)| ((*ext).to_string(), (*mime).to_string()))
            .collect();
        Self { by_extension }
    }

    /// Add or replace the MIME type for an extension.
    pub fn insert(&mut self, extension: impl AsRef<str>, mime: impl Into<String>) {
        let ext = extension.as_ref().trim_start_matches('.').to_lowercase();
        self.by_extension.insert(ext, mime.into());
    }

    /// Builder form of [`MimeTable::insert`].
    #[must_use]
    pub fn with(mut self, extension: impl AsRef<str>, mime: impl Into<String>) -> Self {
        self.insert(extension, mime);
        self
    }

    /// MIME type for a bare extension (with or without the leading dot).
    pub fn for_extension(&self, extension: &str) -> Option<&str> {
        let ext = extension.trim_start_matches('.').to_lowercase();
        self.by_extension.get(&ext).map(String::as_str)
    }

    /// MIME type for a file name or path, from its final extension.
    pub fn lookup(&self, filename: impl AsRef<Path>) -> Option<&str> {
        let ext = filename.as_ref().extension()?.to_str()?;
        self.for_extension(ext)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_filename() {
        let table = MimeTable::new();
        assert_eq!(table.lookup("about.en.md"), Some(MARKDOWN));
        assert_eq!(table.lookup("home/nav.json"), Some(JSON));
        assert_eq!(table.lookup("LOGO.PNG"), Some("image/png"));
        assert_eq!(table.lookup("archive.zip"), None);
        assert_eq!(table.lookup("README"), None);
    }

    #[test]
    fn test_override_extension() {
        let table = MimeTable::new().with(".jade", "text/jade").with("md", "text/x-md");
        assert_eq!(table.lookup("main.jade"), Some("text/jade"));
        assert_eq!(table.for_extension("md"), Some("text/x-md"));
    }

    #[test]
    fn test_roles() {
        assert_eq!(FileRole::of(MARKDOWN), FileRole::Content);
        assert_eq!(FileRole::of(JSON), FileRole::Content);
        assert_eq!(FileRole::of(PLAIN_TEXT), FileRole::Content);
        assert_eq!(FileRole::of(CSS), FileRole::Stylesheet);
        assert_eq!(FileRole::of(JAVASCRIPT), FileRole::Script);
        assert_eq!(FileRole::of("image/svg+xml"), FileRole::Image);
        assert_eq!(FileRole::of(HTML), FileRole::Unknown);
    }
}
