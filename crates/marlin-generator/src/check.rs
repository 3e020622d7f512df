//! Dry-run validation of a site source tree.

use std::path::PathBuf;

use futures_util::future::join_all;
use marlin_core::FileRef;
use tracing::info;

use crate::{
    build::{Builder, Result},
    dirs::read_text,
    page::{parse_or_report, shared_data},
    report::{BuildReport, Diagnostic, DiagnosticKind},
};

/// A content file whose base name has no template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingTemplate {
    pub name: String,
    pub path: PathBuf,
}

/// Result of [`Builder::check`].
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Routes in the content tree.
    pub routes: usize,

    /// Content files inspected.
    pub content_files: usize,

    /// Content files that would abort a build.
    pub missing_templates: Vec<MissingTemplate>,

    /// Recoverable problems.
    pub report: BuildReport,
}

impl CheckReport {
    /// Whether a build would get past template binding.
    pub fn is_ok(&self) -> bool {
        self.missing_templates.is_empty()
    }
}

impl Builder {
    /// Inspect every source without writing anything.
    ///
    /// Unlike a build, every content file is checked, not only the one
    /// selected for each language.
    pub async fn check(&self) -> Result<CheckReport> {
        let site = self.load().await?;
        let mut report = site.report;
        shared_data(self.parsers(), &site.commons, &mut report);

        let mut files: Vec<(String, &FileRef)> = Vec::new();
        site.tree.visit(&site.root_name, &mut |route, node| {
            files.extend(node.content.iter().map(|file| (route.to_string(), file)));
        });

        let contents = join_all(files.iter().map(|(_, file)| read_text(&file.path))).await;

        let mut missing_templates = Vec::new();
        for ((route, file), raw) in files.iter().zip(contents) {
            let mime = file.mime_str();
            let locate = |diagnostic: Diagnostic| {
                diagnostic
                    .with_path(&file.path)
                    .with_route(route.as_str())
                    .with_mime(mime)
            };
            match raw {
                Ok(raw) => {
                    parse_or_report(
                        self.parsers(),
                        mime,
                        &raw,
                        |kind, message| locate(Diagnostic::new(kind, message)),
                        &mut report,
                    );
                }
                Err(e) => report.warn(locate(Diagnostic::new(
                    DiagnosticKind::UnreadableFile,
                    e.to_string(),
                ))),
            }

            if !site.templates.contains_key(&file.base_name) {
                missing_templates.push(MissingTemplate {
                    name: file.base_name.clone(),
                    path: file.path.clone(),
                });
            }
        }

        for (name, variants) in &site.templates {
            for mime in variants.keys() {
                if !self.engines().contains(mime) {
                    report.warn(
                        Diagnostic::new(
                            DiagnosticKind::MissingEngine,
                            format!("no engine for template {name}"),
                        )
                        .with_mime(mime.as_str()),
                    );
                }
            }
        }

        info!(
            routes = site.tree.len(),
            content_files = files.len(),
            missing_templates = missing_templates.len(),
            warnings = report.diagnostics.len(),
            "check complete"
        );

        Ok(CheckReport {
            routes: site.tree.len(),
            content_files: files.len(),
            missing_templates,
            report,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::{path::Path, sync::Arc};

    use marlin_core::Config;
    use tempfile::TempDir;

    use super::*;
    use crate::{engine::EngineRegistry, stache::Stache};

    fn write(root: &Path, rel: &str, content: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, content).unwrap();
    }

    fn builder(source: &Path, output: &Path) -> Builder {
        let config = Config::default();
        let mut engines = EngineRegistry::new(config.mime_table());
        engines.register(Arc::new(Stache::new()), ["html"], "html");
        Builder::new(config, engines, source, output)
    }

    #[tokio::test]
    async fn test_check_reports_problems_without_writing() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        for dir in ["home", "templates", "partials", "commons"] {
            std::fs::create_dir_all(src.path().join(dir)).unwrap();
        }
        write(src.path(), "home/home.md", "Title:\nHi\n");
        write(src.path(), "home/data/data.json", "[1]");
        write(src.path(), "home/contact/contact.md", "Title:\nMail\n");
        write(src.path(), "home/archive.zip", "");
        write(src.path(), "templates/home.html", "{{Title}}");
        write(src.path(), "templates/data.html", "");
        write(src.path(), "templates/home.mustache", "{{Title}}");

        let check = builder(src.path(), out.path()).check().await.unwrap();

        assert!(!check.is_ok());
        assert_eq!(check.routes, 3);
        assert_eq!(check.content_files, 3);
        assert_eq!(check.missing_templates.len(), 1);
        assert_eq!(check.missing_templates[0].name, "contact");
        assert_eq!(check.report.count(DiagnosticKind::InvalidJson), 1);
        assert_eq!(check.report.count(DiagnosticKind::UnknownMime), 1);
        assert_eq!(check.report.count(DiagnosticKind::MissingEngine), 1);
        assert_eq!(std::fs::read_dir(out.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn test_check_reports_unreadable_content() {
        let src = TempDir::new().unwrap();
        let out = TempDir::new().unwrap();
        for dir in ["home", "templates", "partials", "commons"] {
            std::fs::create_dir_all(src.path().join(dir)).unwrap();
        }
        write(src.path(), "home/home.md", "Title:\nHi\n");
        std::fs::create_dir_all(src.path().join("home/bad")).unwrap();
        std::fs::write(src.path().join("home/bad/bad.txt"), b"Title:\n\xff\xfe\n").unwrap();
        write(src.path(), "templates/home.html", "{{Title}}");
        write(src.path(), "templates/bad.html", "{{Title}}");

        let check = builder(src.path(), out.path()).check().await.unwrap();

        assert!(check.is_ok());
        assert_eq!(check.content_files, 2);
        let unreadable: Vec<_> = check.report.of_kind(DiagnosticKind::UnreadableFile).collect();
        assert_eq!(unreadable.len(), 1);
        assert_eq!(unreadable[0].route.as_deref(), Some("home/bad"));
    }
}
