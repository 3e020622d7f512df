//! Structured build results.
//!
//! Every recoverable problem found during a build becomes a [`Diagnostic`].
//! Diagnostics are logged when recorded and kept in the [`BuildReport`] so
//! callers can assert on them instead of scraping log output.

use std::{fmt, path::PathBuf};

use tracing::warn;

/// Category of a recoverable build problem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DiagnosticKind {
    /// File extension has no known MIME type.
    UnknownMime,
    /// Directory below a source root could not be listed.
    UnreadableDirectory,
    /// No render engine registered for a template MIME type.
    MissingEngine,
    /// JSON content or commons data could not be used.
    InvalidJson,
    /// A render engine failed on one template segment.
    RenderFailed,
    /// A route has no content file for the requested language.
    MissingContent,
    /// Two files map to the same logical name and MIME type.
    DuplicateEntry,
    /// A source file could not be read or is not valid UTF-8.
    UnreadableFile,
    /// An asset shares its output name with a rendered artifact.
    ShadowedAsset,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::UnknownMime => "unknown mime type",
            Self::UnreadableDirectory => "unreadable directory",
            Self::MissingEngine => "missing engine",
            Self::InvalidJson => "invalid json",
            Self::RenderFailed => "render failed",
            Self::MissingContent => "missing content",
            Self::DuplicateEntry => "duplicate entry",
            Self::UnreadableFile => "unreadable file",
            Self::ShadowedAsset => "shadowed asset",
        };
        f.write_str(name)
    }
}

/// A recoverable problem with enough context to locate the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub path: Option<PathBuf>,
    pub route: Option<String>,
    pub mime: Option<String>,
    pub message: String,
}

impl Diagnostic {
    /// Create a diagnostic without location context.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            path: None,
            route: None,
            mime: None,
            message: message.into(),
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    #[must_use]
    pub fn with_route(mut self, route: impl Into<String>) -> Self {
        self.route = Some(route.into());
        self
    }

    #[must_use]
    pub fn with_mime(mut self, mime: impl Into<String>) -> Self {
        self.mime = Some(mime.into());
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.kind, self.message)?;
        if let Some(path) = &self.path {
            write!(f, " ({})", path.display())?;
        }
        if let Some(route) = &self.route {
            write!(f, " [route {route}]")?;
        }
        if let Some(mime) = &self.mime {
            write!(f, " [{mime}]")?;
        }
        Ok(())
    }
}

/// Counters and diagnostics for one build, or one part of it.
#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    /// `index.html` files written.
    pub pages: usize,

    /// `<name>.css` files written.
    pub stylesheets: usize,

    /// Artifacts with any other extension.
    pub other_artifacts: usize,

    /// Assets copied because the destination was missing or stale.
    pub assets_copied: usize,

    /// Assets skipped because the timestamps matched.
    pub assets_up_to_date: usize,

    /// Recoverable problems, in the order they were found.
    pub diagnostics: Vec<Diagnostic>,
}

impl BuildReport {
    /// Create an empty report.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Log a diagnostic and record it.
    pub fn warn(&mut self, diagnostic: Diagnostic) {
        warn!(
            kind = %diagnostic.kind,
            path = ?diagnostic.path,
            route = diagnostic.route.as_deref().unwrap_or_default(),
            mime = diagnostic.mime.as_deref().unwrap_or_default(),
            "{}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }

    /// Fold a sub-report into this one.
    pub fn merge(&mut self, other: BuildReport) {
        self.pages += other.pages;
        self.stylesheets += other.stylesheets;
        self.other_artifacts += other.other_artifacts;
        self.assets_copied += other.assets_copied;
        self.assets_up_to_date += other.assets_up_to_date;
        self.diagnostics.extend(other.diagnostics);
    }

    /// Number of diagnostics of one kind.
    pub fn count(&self, kind: DiagnosticKind) -> usize {
        self.diagnostics.iter().filter(|d| d.kind == kind).count()
    }

    /// Diagnostics of one kind.
    pub fn of_kind(&self, kind: DiagnosticKind) -> impl Iterator<Item = &Diagnostic> {
        self.diagnostics.iter().filter(move |d| d.kind == kind)
    }

    pub fn has_warnings(&self) -> bool {
        !self.diagnostics.is_empty()
    }
}
