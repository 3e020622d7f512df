//! Page rendering.
//!
//! Rendering one route node for one language:
//!
//! 1. pick the content file for the language, falling back per
//!    [`LanguageFallback`]
//! 2. parse it into a [`Document`]
//! 3. merge the document, the shared commons data and `$page`
//! 4. render every MIME variant of the template named after the content
//!    file's base name
//!
//! Every content file of a node needs a template named after its base name,
//! whether or not it is selected; a missing one is fatal. Everything else
//! that goes wrong is scoped to the smallest unit (one file, one template
//! variant) and reported.

use std::collections::{BTreeMap, HashMap};

use marlin_core::{FileRef, LanguageFallback};
use marlin_parser::{Document, ParserError, ParserRegistry};
use serde_json::Value;
use tracing::debug;

use crate::{
    build::{BuildError, Result},
    dirs::read_text,
    engine::{EngineRegistry, Partials},
    fileset::FileSet,
    report::{BuildReport, Diagnostic, DiagnosticKind},
    route::RouteNode,
};

/// View key holding the route node's name.
pub const PAGE_KEY: &str = "$page";

/// Output extension to rendered text.
pub type Artifacts = BTreeMap<String, String>;

static NO_PARTIALS: Partials = Partials::new();

/// Pick the content file to render for `lang`.
pub fn select_content<'n>(
    node: &'n RouteNode,
    parsers: &ParserRegistry,
    lang: &str,
    default_lang: &str,
    fallback: LanguageFallback,
) -> Option<&'n FileRef> {
    let candidates: Vec<&FileRef> = node
        .content
        .iter()
        .filter(|f| f.mime.as_deref().is_some_and(|m| parsers.supports(m)))
        .collect();

    if let Some(exact) = candidates.iter().copied().find(|f| f.lang == lang) {
        return Some(exact);
    }

    match fallback {
        LanguageFallback::FirstAvailable => candidates.first().copied(),
        LanguageFallback::DefaultLanguage => {
            candidates.into_iter().find(|f| f.lang == default_lang)
        }
    }
}

/// Parse raw content, turning parse failures into diagnostics.
///
/// A file that fails to parse contributes no properties.
pub fn parse_or_report(
    parsers: &ParserRegistry,
    mime: &str,
    raw: &str,
    diagnostic: impl FnOnce(DiagnosticKind, String) -> Diagnostic,
    report: &mut BuildReport,
) -> Document {
    match parsers.parse(mime, raw) {
        Ok(document) => document,
        Err(e @ (ParserError::Json(_) | ParserError::NotAnObject(_))) => {
            report.warn(diagnostic(DiagnosticKind::InvalidJson, e.to_string()));
            Document::new()
        }
        Err(e @ ParserError::UnsupportedType(_)) => {
            report.warn(diagnostic(DiagnosticKind::UnknownMime, e.to_string()));
            Document::new()
        }
    }
}

/// Parse every commons entry into the shared data merged into each view.
///
/// Variants of one name are merged in MIME order.
pub fn shared_data(
    parsers: &ParserRegistry,
    commons: &FileSet,
    report: &mut BuildReport,
) -> Document {
    let mut shared = Document::new();

    for (name, variants) in commons {
        let mut merged = Document::new();
        for (mime, raw) in variants {
            let document = parse_or_report(
                parsers,
                mime,
                raw,
                |kind, message| {
                    Diagnostic::new(kind, format!("commons {name}: {message}")).with_mime(mime.as_str())
                },
                report,
            );
            merged.extend(document);
        }
        shared.insert(name.clone(), Value::Object(merged));
    }

    debug!(entries = shared.len(), "shared data ready");
    shared
}

/// Merge the page document, shared data and page name into one view.
pub fn build_view(document: Document, shared: &Document, page: &str) -> Value {
    let mut view = document;
    for (key, value) in shared {
        view.insert(key.clone(), value.clone());
    }
    view.insert(PAGE_KEY.to_string(), Value::String(page.to_string()));
    Value::Object(view)
}

/// Everything a page render reads. Built once per build.
#[derive(Debug, Clone, Copy)]
pub struct PageRenderer<'a> {
    pub engines: &'a EngineRegistry,
    pub parsers: &'a ParserRegistry,
    pub templates: &'a FileSet,
    /// Partials grouped by MIME type.
    pub partials: &'a HashMap<String, Partials>,
    pub shared: &'a Document,
    pub default_lang: &'a str,
    pub fallback: LanguageFallback,
}

impl<'a> PageRenderer<'a> {
    /// Render `node` for `lang`.
    ///
    /// `name` is the node's directory name, `route` its path from the
    /// content root (for diagnostics).
    pub async fn render(
        &self,
        node: &RouteNode,
        name: &str,
        route: &str,
        lang: &str,
    ) -> Result<(Artifacts, BuildReport)> {
        let mut report = BuildReport::new();

        for file in &node.content {
            self.template_for(file)?;
        }

        let Some(file) =
            select_content(node, self.parsers, lang, self.default_lang, self.fallback)
        else {
            report.warn(
                Diagnostic::new(
                    DiagnosticKind::MissingContent,
                    format!("no content for language {lang}"),
                )
                .with_route(route),
            );
            return Ok((Artifacts::new(), report));
        };

        // Selected files always have a parser, so a MIME type.
        let mime = file.mime_str();
        debug!(route, lang, file = %file.file_name, "rendering page");

        let locate = |diagnostic: Diagnostic| {
            diagnostic
                .with_path(&file.path)
                .with_route(route)
                .with_mime(mime)
        };
        let document = match read_text(&file.path).await {
            Ok(raw) => parse_or_report(
                self.parsers,
                mime,
                &raw,
                |kind, message| locate(Diagnostic::new(kind, message)),
                &mut report,
            ),
            Err(e) => {
                report.warn(locate(Diagnostic::new(
                    DiagnosticKind::UnreadableFile,
                    e.to_string(),
                )));
                Document::new()
            }
        };

        let template = self.template_for(file)?;
        let view = build_view(document, self.shared, name);
        let artifacts = self.render_template(&file.base_name, template, &view, route, &mut report);
        Ok((artifacts, report))
    }

    /// The template bound to a content file's base name.
    fn template_for(&self, file: &FileRef) -> Result<&'a BTreeMap<String, String>> {
        self.templates
            .get(&file.base_name)
            .ok_or_else(|| BuildError::MissingTemplate {
                name: file.base_name.clone(),
                path: file.path.clone(),
            })
    }

    /// Render every MIME variant of a template.
    pub fn render_template(
        &self,
        template_name: &str,
        template: &BTreeMap<String, String>,
        view: &Value,
        route: &str,
        report: &mut BuildReport,
    ) -> Artifacts {
        let mut artifacts = Artifacts::new();

        for (mime, source) in template {
            let Some(registration) = self.engines.get(mime) else {
                report.warn(
                    Diagnostic::new(
                        DiagnosticKind::MissingEngine,
                        format!("no engine for template {template_name}"),
                    )
                    .with_route(route)
                    .with_mime(mime.as_str()),
                );
                continue;
            };

            let partials = self.partials.get(mime).unwrap_or(&NO_PARTIALS);
            match registration.engine.render(source, view, partials) {
                Ok(rendered) => {
                    let ext = registration.output_extension.clone();
                    if artifacts.insert(ext, rendered).is_some() {
                        debug!(
                            route,
                            output = %registration.output_extension,
                            "artifact replaced by a later template variant"
                        );
                    }
                }
                Err(e) => report.warn(
                    Diagnostic::new(
                        DiagnosticKind::RenderFailed,
                        format!("{} failed on template {template_name}: {e}", registration.engine.name()),
                    )
                    .with_route(route)
                    .with_mime(mime.as_str()),
                ),
            }
        }

        artifacts
    }
}
