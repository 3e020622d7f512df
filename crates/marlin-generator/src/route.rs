//! Route tree construction.
//!
//! Walks the content directory and turns every directory into a
//! [`RouteNode`]. Sibling directories are scanned concurrently and each scan
//! returns its own node and report; the parent only combines them.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
};

use futures_util::{
    FutureExt,
    future::{BoxFuture, join_all},
};
use marlin_core::{FileRef, FileRole, MimeTable};
use tokio::fs;
use tracing::{debug, info};

use crate::{
    build::{BuildError, Result},
    dirs::{list_sorted, require_dir},
    report::{BuildReport, Diagnostic, DiagnosticKind},
};

/// One directory of the content tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RouteNode {
    /// Subdirectories by name.
    pub children: BTreeMap<String, RouteNode>,

    /// Content files in name order.
    pub content: Vec<FileRef>,

    pub stylesheets: Vec<FileRef>,
    pub images: Vec<FileRef>,
    pub scripts: Vec<FileRef>,
}

impl RouteNode {
    /// Every file copied verbatim next to the page.
    pub fn assets(&self) -> impl Iterator<Item = &FileRef> {
        self.stylesheets
            .iter()
            .chain(&self.images)
            .chain(&self.scripts)
    }

    /// Number of nodes in this subtree, including this one.
    pub fn len(&self) -> usize {
        1 + self.children.values().map(RouteNode::len).sum::<usize>()
    }

    /// Call `f` with the slash-joined route and node for every node in the
    /// subtree, parents before children.
    pub fn visit<'a>(&'a self, route: &str, f: &mut impl FnMut(&str, &'a RouteNode)) {
        f(route, self);
        for (name, child) in &self.children {
            child.visit(&format!("{route}/{name}"), f);
        }
    }

    fn push(&mut self, file: FileRef) -> bool {
        let bucket = match file.role() {
            FileRole::Content => &mut self.content,
            FileRole::Stylesheet => &mut self.stylesheets,
            FileRole::Image => &mut self.images,
            FileRole::Script => &mut self.scripts,
            FileRole::Unknown => return false,
        };
        bucket.push(file);
        true
    }
}

/// Builds a [`RouteNode`] tree from a content directory.
#[derive(Debug, Clone, Copy)]
pub struct RouteTreeBuilder<'a> {
    default_lang: &'a str,
    mime: &'a MimeTable,
}

impl<'a> RouteTreeBuilder<'a> {
    pub fn new(default_lang: &'a str, mime: &'a MimeTable) -> Self {
        Self { default_lang, mime }
    }

    /// Scan `root` recursively.
    ///
    /// A missing root is fatal. An unreadable directory below the root is
    /// reported and left out of the tree.
    pub async fn build(&self, root: &Path) -> Result<(RouteNode, BuildReport)> {
        require_dir(root).await?;
        info!(root = %root.display(), "scanning content tree");

        let (node, report) = self
            .scan(root.to_path_buf(), String::new())
            .await
            .map_err(|source| BuildError::Read {
                path: root.to_path_buf(),
                source,
            })?;

        info!(routes = node.len(), "content tree scanned");
        Ok((node, report))
    }

    fn scan(
        &self,
        dir: PathBuf,
        route: String,
    ) -> BoxFuture<'_, std::io::Result<(RouteNode, BuildReport)>> {
        async move {
            let mut node = RouteNode::default();
            let mut report = BuildReport::new();
            let mut subdirs = Vec::new();

            for path in list_sorted(&dir).await? {
                let meta = match fs::metadata(&path).await {
                    Ok(meta) => meta,
                    Err(e) => {
                        debug!(path = %path.display(), error = %e, "skipping unreadable entry");
                        continue;
                    }
                };

                if meta.is_dir() {
                    subdirs.push(path);
                    continue;
                }
                if !meta.is_file() {
                    continue;
                }

                let Some(file) = FileRef::from_path(&path, self.default_lang, self.mime) else {
                    debug!(path = %path.display(), "skipping file without a UTF-8 name");
                    continue;
                };
                let mime = file.mime_str().to_string();
                if !node.push(file) {
                    let message = if mime.is_empty() {
                        "unknown file type".to_string()
                    } else {
                        format!("{mime} has no route role")
                    };
                    let mut diagnostic = Diagnostic::new(DiagnosticKind::UnknownMime, message)
                        .with_path(&path)
                        .with_route(route.as_str());
                    if !mime.is_empty() {
                        diagnostic = diagnostic.with_mime(mime);
                    }
                    report.warn(diagnostic);
                }
            }

            let names: Vec<String> = subdirs
                .iter()
                .map(|p| p.file_name().unwrap_or_default().to_string_lossy().into_owned())
                .collect();
            let scans = subdirs
                .iter()
                .zip(&names)
                .map(|(path, name)| self.scan(path.clone(), format!("{route}/{name}")));
            let results = join_all(scans).await;

            for ((path, name), result) in subdirs.into_iter().zip(names).zip(results) {
                match result {
                    Ok((child, child_report)) => {
                        report.merge(child_report);
                        node.children.insert(name, child);
                    }
                    Err(e) => report.warn(
                        Diagnostic::new(DiagnosticKind::UnreadableDirectory, e.to_string())
                            .with_path(path)
                            .with_route(format!("{route}/{name}")),
                    ),
                }
            }

            Ok((node, report))
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::*;

    fn touch(root: &Path, rel: &str) {
        let path = root.join(rel);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "x").unwrap();
    }

    async fn scan(root: &Path) -> Result<(RouteNode, BuildReport)> {
        let table = MimeTable::new();
        RouteTreeBuilder::new("en", &table).build(root).await
    }

    fn names(files: &[FileRef]) -> Vec<&str> {
        files.iter().map(|f| f.file_name.as_str()).collect()
    }

    #[tokio::test]
    async fn test_classifies_files_by_role() {
        let dir = TempDir::new().unwrap();
        for name in ["index.md", "index.se.md", "style.css", "logo.png", "app.js", "data.json"] {
            touch(dir.path(), name);
        }

        let (node, report) = scan(dir.path()).await.unwrap();

        assert!(!report.has_warnings());
        assert_eq!(names(&node.content), vec!["data.json", "index.md", "index.se.md"]);
        assert_eq!(names(&node.stylesheets), vec!["style.css"]);
        assert_eq!(names(&node.images), vec!["logo.png"]);
        assert_eq!(names(&node.scripts), vec!["app.js"]);
        assert_eq!(node.assets().count(), 3);
    }

    #[tokio::test]
    async fn test_nested_children() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "index.md");
        touch(dir.path(), "about/about.md");
        touch(dir.path(), "about/team/team.md");
        fs::create_dir_all(dir.path().join("empty")).unwrap();

        let (node, _) = scan(dir.path()).await.unwrap();

        assert_eq!(node.children.keys().collect::<Vec<_>>(), vec!["about", "empty"]);
        assert!(node.children["about"].children.contains_key("team"));
        assert_eq!(node.children["empty"], RouteNode::default());
        assert_eq!(node.len(), 4);

        let mut routes = Vec::new();
        node.visit("home", &mut |route, _| routes.push(route.to_string()));
        assert_eq!(routes, vec!["home", "home/about", "home/about/team", "home/empty"]);
    }

    #[tokio::test]
    async fn test_unknown_mime_warned_and_skipped() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), "index.md");
        touch(dir.path(), "blob.bin");
        touch(dir.path(), "layout.html");

        let (node, report) = scan(dir.path()).await.unwrap();

        assert_eq!(names(&node.content), vec!["index.md"]);
        assert_eq!(report.count(DiagnosticKind::UnknownMime), 2);
        let unknown: Vec<_> = report
            .of_kind(DiagnosticKind::UnknownMime)
            .map(|d| d.path.as_ref().unwrap().file_name().unwrap().to_owned())
            .collect();
        assert_eq!(unknown, vec!["blob.bin", "layout.html"]);
    }

    #[tokio::test]
    async fn test_hidden_entries_ignored() {
        let dir = TempDir::new().unwrap();
        touch(dir.path(), ".DS_Store");
        touch(dir.path(), ".git/config");
        touch(dir.path(), "index.md");

        let (node, report) = scan(dir.path()).await.unwrap();

        assert!(node.children.is_empty());
        assert!(!report.has_warnings());
    }

    #[tokio::test]
    async fn test_missing_root_is_fatal() {
        let dir = TempDir::new().unwrap();
        let result = scan(&dir.path().join("home")).await;
        assert!(matches!(result, Err(BuildError::MissingDirectory(_))));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_unreadable_subdirectory_isolated() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        touch(dir.path(), "open/open.md");
        touch(dir.path(), "locked/locked.md");
        let locked = dir.path().join("locked");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o000)).unwrap();

        // Permission bits are ignored when running as root.
        if fs::read_dir(&locked).is_ok() {
            fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();
            return;
        }

        let (node, report) = scan(dir.path()).await.unwrap();
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o755)).unwrap();

        assert!(node.children.contains_key("open"));
        assert!(!node.children.contains_key("locked"));
        assert_eq!(report.count(DiagnosticKind::UnreadableDirectory), 1);
    }
}
