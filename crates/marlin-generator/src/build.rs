//! Build orchestration.
//!
//! Loads templates, partials and commons, scans the content tree, then
//! renders every route once per configured language into a mirrored output
//! tree.

use std::{
    collections::{HashMap, HashSet},
    io,
    path::{Path, PathBuf},
    time::Instant,
};

use futures_util::{
    FutureExt,
    future::{BoxFuture, try_join_all},
};
use marlin_core::{Config, FileRef, MimeTable};
use marlin_parser::ParserRegistry;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info};

use crate::{
    assets::{AssetError, sync_assets},
    engine::{EngineRegistry, Partials},
    fileset::{FileSet, load_file_set},
    page::{PageRenderer, shared_data},
    report::{BuildReport, Diagnostic, DiagnosticKind},
    route::{RouteNode, RouteTreeBuilder},
};

/// Fatal build errors.
#[derive(Debug, Error)]
pub enum BuildError {
    /// A required source directory does not exist.
    #[error("required directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),

    /// Content file whose base name has no template.
    #[error("no template named {name:?} (required by {})", .path.display())]
    MissingTemplate { name: String, path: PathBuf },

    /// Reading a source file or directory failed.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing an output file or directory failed.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Asset error.
    #[error("asset error: {0}")]
    Asset(#[from] AssetError),
}

/// Result type for build operations.
pub type Result<T> = std::result::Result<T, BuildError>;

/// Everything read from the source root before rendering starts.
#[derive(Debug)]
pub struct Site {
    pub templates: FileSet,
    pub partials: FileSet,
    pub commons: FileSet,

    /// Content tree rooted at the home directory.
    pub tree: RouteNode,

    /// Name of the home directory, used as the root route's name.
    pub root_name: String,

    /// Diagnostics from loading.
    pub report: BuildReport,
}

/// Site builder that orchestrates the build process.
#[derive(Debug)]
pub struct Builder {
    config: Config,
    mime: MimeTable,
    engines: EngineRegistry,
    parsers: ParserRegistry,
    source_dir: PathBuf,
    output_dir: PathBuf,
}

impl Builder {
    /// Create a new builder.
    #[must_use]
    pub fn new(
        config: Config,
        engines: EngineRegistry,
        source_dir: impl Into<PathBuf>,
        output_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            mime: config.mime_table(),
            config,
            engines,
            parsers: ParserRegistry::new(),
            source_dir: source_dir.into(),
            output_dir: output_dir.into(),
        }
    }

    pub fn engines(&self) -> &EngineRegistry {
        &self.engines
    }

    pub fn parsers(&self) -> &ParserRegistry {
        &self.parsers
    }

    /// Load templates, partials, commons and the content tree.
    pub async fn load(&self) -> Result<Site> {
        let dirs = &self.config.build;
        let lang = self.config.site.default_language.as_str();
        let home = self.source_dir.join(&dirs.home_dir);
        let templates_dir = self.source_dir.join(&dirs.templates_dir);
        let partials_dir = self.source_dir.join(&dirs.partials_dir);
        let commons_dir = self.source_dir.join(&dirs.commons_dir);

        let tree_builder = RouteTreeBuilder::new(lang, &self.mime);
        let (
            (templates, templates_report),
            (partials, partials_report),
            (commons, commons_report),
            (tree, tree_report),
        ) = tokio::try_join!(
            load_file_set(&templates_dir, lang, &self.mime),
            load_file_set(&partials_dir, lang, &self.mime),
            load_file_set(&commons_dir, lang, &self.mime),
            tree_builder.build(&home),
        )?;

        let mut report = BuildReport::new();
        for part in [templates_report, partials_report, commons_report, tree_report] {
            report.merge(part);
        }

        let root_name = home
            .file_name()
            .map_or_else(|| dirs.home_dir.clone(), |n| n.to_string_lossy().into_owned());

        info!(
            templates = templates.len(),
            partials = partials.len(),
            commons = commons.len(),
            routes = tree.len(),
            "sources loaded"
        );

        Ok(Site {
            templates,
            partials,
            commons,
            tree,
            root_name,
            report,
        })
    }

    /// Execute the full build process.
    pub async fn build(&self) -> Result<BuildReport> {
        let start = Instant::now();
        info!(
            source = %self.source_dir.display(),
            output = %self.output_dir.display(),
            engines = self.engines.len(),
            "starting build"
        );

        let Site {
            templates,
            partials,
            commons,
            tree,
            root_name,
            mut report,
        } = self.load().await?;

        // Engines and shared data are complete before the first page renders.
        register_partials(&self.engines, &partials, &mut report);
        let shared = shared_data(&self.parsers, &commons, &mut report);
        let partials = partials_by_mime(&partials);

        let renderer = PageRenderer {
            engines: &self.engines,
            parsers: &self.parsers,
            templates: &templates,
            partials: &partials,
            shared: &shared,
            default_lang: &self.config.site.default_language,
            fallback: self.config.site.fallback,
        };

        for lang in self.config.render_languages() {
            let out_dir = self
                .config
                .output_root(&self.output_dir, &lang)
                .join(&root_name);
            info!(lang = %lang, output = %out_dir.display(), "rendering language");

            let emitted = emit_node(
                renderer,
                &tree,
                &root_name,
                root_name.clone(),
                out_dir,
                &lang,
            )
            .await?;
            report.merge(emitted);
        }

        info!(
            pages = report.pages,
            stylesheets = report.stylesheets,
            other_artifacts = report.other_artifacts,
            assets_copied = report.assets_copied,
            assets_up_to_date = report.assets_up_to_date,
            warnings = report.diagnostics.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "build complete"
        );

        Ok(report)
    }
}

/// Hand every partial to the engine for its MIME type, if that engine
/// accepts partials.
pub fn register_partials(engines: &EngineRegistry, partials: &FileSet, report: &mut BuildReport) {
    for (name, variants) in partials {
        for (mime, content) in variants {
            let Some(registration) = engines.get(mime) else {
                debug!(partial = %name, %mime, "no engine for partial");
                continue;
            };
            if !registration.engine.supports_partials() {
                continue;
            }
            if let Err(e) = registration.engine.register_partial(name, content) {
                report.warn(
                    Diagnostic::new(DiagnosticKind::RenderFailed, format!("partial {name}: {e}"))
                        .with_mime(mime.as_str()),
                );
            }
        }
    }
}

/// Regroup partials as MIME type to partial name to source.
pub fn partials_by_mime(partials: &FileSet) -> HashMap<String, Partials> {
    let mut grouped: HashMap<String, Partials> = HashMap::new();
    for (name, variants) in partials {
        for (mime, content) in variants {
            grouped
                .entry(mime.clone())
                .or_default()
                .insert(name.clone(), content.clone());
        }
    }
    grouped
}

/// Output file name for an artifact: `index.html` for HTML, `<name>.<ext>`
/// otherwise.
pub fn artifact_file_name(name: &str, ext: &str) -> String {
    if ext == "html" {
        "index.html".to_string()
    } else {
        format!("{name}.{ext}")
    }
}

pub fn artifact_path(dir: &Path, name: &str, ext: &str) -> PathBuf {
    dir.join(artifact_file_name(name, ext))
}

fn emit_node<'a>(
    renderer: PageRenderer<'a>,
    node: &'a RouteNode,
    name: &'a str,
    route: String,
    out_dir: PathBuf,
    lang: &'a str,
) -> BoxFuture<'a, Result<BuildReport>> {
    async move {
        fs::create_dir_all(&out_dir)
            .await
            .map_err(|source| BuildError::Write {
                path: out_dir.clone(),
                source,
            })?;

        let (artifacts, mut report) = renderer.render(node, name, &route, lang).await?;

        for (ext, text) in &artifacts {
            let path = artifact_path(&out_dir, name, ext);
            fs::write(&path, text)
                .await
                .map_err(|source| BuildError::Write {
                    path: path.clone(),
                    source,
                })?;
            debug!(path = %path.display(), "wrote artifact");

            match ext.as_str() {
                "html" => report.pages += 1,
                "css" => report.stylesheets += 1,
                _ => report.other_artifacts += 1,
            }
        }

        // A rendered artifact owns its output name; a same-named asset is skipped.
        let written: HashSet<String> = artifacts
            .keys()
            .map(|ext| artifact_file_name(name, ext))
            .collect();
        let (shadowed, assets): (Vec<&FileRef>, Vec<&FileRef>) = node
            .assets()
            .partition(|asset| written.contains(&asset.file_name));
        for asset in shadowed {
            report.warn(
                Diagnostic::new(
                    DiagnosticKind::ShadowedAsset,
                    format!("{} is replaced by the rendered artifact", asset.file_name),
                )
                .with_path(&asset.path)
                .with_route(route.as_str()),
            );
        }
        report.merge(sync_assets(assets, &out_dir).await?);

        // Children start only after this node's own output is on disk.
        let children = node.children.iter().map(|(child_name, child)| {
            emit_node(
                renderer,
                child,
                child_name,
                format!("{route}/{child_name}"),
                out_dir.join(child_name),
                lang,
            )
        });
        for child_report in try_join_all(children).await? {
            report.merge(child_report);
        }

        Ok(report)
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use marlin_core::mime;
    use tempfile::TempDir;

    use super::*;
    use crate::stache::Stache;

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn site(root: &Path) {
        for dir in ["home", "templates", "partials", "commons"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        write(root, "home/home.md", "Title:\nWelcome\n");
        write(root, "home/blog/blog.txt", "Title:\nPosts\n");
        write(root, "templates/home.html", "{{{Title}}}|{{$page}}");
        write(root, "templates/home.css", "body { color: {{site.color}}; }");
        write(root, "templates/blog.html", "{{Title}}");
        write(root, "commons/site.json", r#"{"color": "blue"}"#);
    }

    fn builder(source: &Path, output: &Path) -> Builder {
        let config = Config::default();
        let mut engines = EngineRegistry::new(config.mime_table());
        let stache = Arc::new(Stache::new());
        engines.register(stache.clone(), ["html"], "html");
        engines.register(stache, ["css"], "css");
        Builder::new(config, engines, source, output)
    }

    #[test]
    fn test_artifact_path() {
        let dir = Path::new("out/home/about");
        assert_eq!(artifact_path(dir, "about", "html"), dir.join("index.html"));
        assert_eq!(artifact_path(dir, "about", "css"), dir.join("about.css"));
        assert_eq!(artifact_path(dir, "about", "json"), dir.join("about.json"));
    }

    #[test]
    fn test_partials_by_mime() {
        let mut partials = FileSet::new();
        let header = partials.entry("header".to_string()).or_default();
        header.insert(mime::HTML.to_string(), "<h1>".to_string());
        header.insert(mime::CSS.to_string(), "h1 {}".to_string());

        let grouped = partials_by_mime(&partials);
        assert_eq!(grouped[mime::HTML]["header"], "<h1>");
        assert_eq!(grouped[mime::CSS]["header"], "h1 {}");
    }

    #[tokio::test]
    async fn test_load_collects_sources() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        site(src.path());

        let site = builder(src.path(), out.path()).load().await.unwrap();

        assert_eq!(site.root_name, "home");
        assert_eq!(site.templates.len(), 2);
        assert!(site.commons.contains_key("site"));
        assert!(site.tree.children.contains_key("blog"));
    }

    #[tokio::test]
    async fn test_build_writes_pages_and_stylesheets() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        site(src.path());

        let report = builder(src.path(), out.path()).build().await.unwrap();

        let home = out.path().join("home");
        assert_eq!(
            std::fs::read_to_string(home.join("index.html")).unwrap(),
            "<p>Welcome</p>\n|home"
        );
        assert_eq!(
            std::fs::read_to_string(home.join("home.css")).unwrap(),
            "body { color: blue; }"
        );
        assert_eq!(
            std::fs::read_to_string(home.join("blog/index.html")).unwrap(),
            "Posts"
        );
        assert_eq!(report.pages, 2);
        assert_eq!(report.stylesheets, 1);
        assert!(!report.has_warnings());
    }

    #[tokio::test]
    async fn test_missing_partials_dir_is_fatal() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        site(src.path());
        std::fs::remove_dir(src.path().join("partials")).unwrap();

        let result = builder(src.path(), out.path()).build().await;
        assert!(matches!(
            result,
            Err(BuildError::MissingDirectory(path)) if path.ends_with("partials")
        ));
    }
}
