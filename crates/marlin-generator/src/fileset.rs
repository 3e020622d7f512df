//! Flat directory loader for templates, partials and commons.
//!
//! Every file is keyed by its base name (the part before the first dot) and
//! then by MIME type, so `about.html` and `about.css` become two variants of
//! the template `about`.

use std::{collections::BTreeMap, path::Path};

use futures_util::future::join_all;
use marlin_core::{FileRef, MimeTable};
use tokio::fs;
use tracing::debug;

use crate::{
    build::{BuildError, Result},
    dirs::{list_sorted, read_text, require_dir},
    report::{BuildReport, Diagnostic, DiagnosticKind},
};

/// Logical name to MIME type to raw file content.
pub type FileSet = BTreeMap<String, BTreeMap<String, String>>;

/// Load every file directly inside `dir`.
///
/// Subdirectories and hidden files are ignored. Files with an unknown MIME
/// type or unreadable content are reported and skipped. When two files share
/// a name and MIME type the first in name order is kept.
pub async fn load_file_set(
    dir: &Path,
    default_lang: &str,
    mime: &MimeTable,
) -> Result<(FileSet, BuildReport)> {
    require_dir(dir).await?;

    let paths = list_sorted(dir).await.map_err(|source| BuildError::Read {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut report = BuildReport::new();
    let mut files = Vec::with_capacity(paths.len());

    for path in paths {
        let meta = fs::metadata(&path).await.map_err(|source| BuildError::Read {
            path: path.clone(),
            source,
        })?;
        if !meta.is_file() {
            debug!(path = %path.display(), "skipping non-file entry");
            continue;
        }

        let Some(file) = FileRef::from_path(&path, default_lang, mime) else {
            debug!(path = %path.display(), "skipping file without a UTF-8 name");
            continue;
        };
        let Some(file_mime) = file.mime.clone() else {
            report.warn(
                Diagnostic::new(
                    DiagnosticKind::UnknownMime,
                    format!("unknown file type: {}", file.file_name),
                )
                .with_path(&path),
            );
            continue;
        };
        files.push((file, file_mime));
    }

    let contents = join_all(files.iter().map(|(file, _)| read_text(&file.path))).await;

    let mut set = FileSet::new();
    for ((file, file_mime), content) in files.into_iter().zip(contents) {
        let content = match content {
            Ok(content) => content,
            Err(e) => {
                report.warn(
                    Diagnostic::new(DiagnosticKind::UnreadableFile, e.to_string())
                        .with_path(&file.path)
                        .with_mime(file_mime),
                );
                continue;
            }
        };

        let variants = set.entry(file.base_name.clone()).or_default();
        if variants.contains_key(&file_mime) {
            report.warn(
                Diagnostic::new(
                    DiagnosticKind::DuplicateEntry,
                    format!("{} already loaded for {}, ignoring", file_mime, file.base_name),
                )
                .with_path(&file.path)
                .with_mime(file_mime),
            );
            continue;
        }
        variants.insert(file_mime, content);
    }

    debug!(dir = %dir.display(), entries = set.len(), "loaded file set");
    Ok((set, report))
}
