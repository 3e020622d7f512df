//! File references and the language naming convention.

use std::path::{Path, PathBuf};

use crate::mime::{FileRole, MimeTable};

/// A file inside a content, template, partial, or commons directory.
///
/// All metadata is derived from the file name, which follows
/// `basename[.lang].ext`:
/// - `about.md` → base "about", lang = default language
/// - `about.se.md` → base "about", lang "se"
/// - `about.v2.se.md` → base "about", lang "se" (second-to-last segment)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileRef {
    /// Original file path.
    pub path: PathBuf,

    /// File name including all extensions.
    pub file_name: String,

    /// First dot-separated segment of the file name.
    pub base_name: String,

    /// Language tag (always set, defaults to the configured default).
    pub lang: String,

    /// MIME type, if the extension is known.
    pub mime: Option<String>,
}

impl FileRef {
    /// Derive a file reference from a path.
    ///
    /// Returns `None` when the path has no UTF-8 file name.
    pub fn from_path(path: &Path, default_lang: &str, mime: &MimeTable) -> Option<Self> {
        let file_name = path.file_name()?.to_str()?.to_string();
        let segments: Vec<&str> = file_name.split('.').collect();

        let base_name = segments.first().copied().unwrap_or_default().to_string();
        let tagged = if segments.len() >= 3 {
            segments
                .get(segments.len() - 2)
                .filter(|lang| !lang.is_empty())
                .map(|lang| (*lang).to_string())
        } else {
            None
        };

        let lang = tagged.unwrap_or_else(|| default_lang.to_string());
        let mime = mime.lookup(&file_name).map(str::to_string);

        Some(Self {
            path: path.to_path_buf(),
            file_name,
            base_name,
            lang,
            mime,
        })
    }

    /// Route role of this file; unknown when the MIME type is not recognized.
    pub fn role(&self) -> FileRole {
        self.mime.as_deref().map_or(FileRole::Unknown, FileRole::of)
    }

    /// MIME type or an empty string, for log fields.
    pub fn mime_str(&self) -> &str {
        self.mime.as_deref().unwrap_or_default()
    }
}
