//! Timestamp-based asset synchronization.
//!
//! An asset is copied when the destination is missing or its modification
//! time differs from the source's. After copying, the destination is stamped
//! with the source's modification time so the next build sees them as equal.
//! File contents are never compared.

use std::{
    io,
    path::{Path, PathBuf},
    time::SystemTime,
};

use futures_util::future::join_all;
use marlin_core::FileRef;
use thiserror::Error;
use tokio::fs;
use tracing::debug;

use crate::report::BuildReport;

/// Asset synchronization errors.
#[derive(Debug, Error)]
#[error("failed to sync {} to {}: {source}", .src.display(), .dest.display())]
pub struct AssetError {
    pub src: PathBuf,
    pub dest: PathBuf,
    #[source]
    pub source: io::Error,
}

/// What happened to one asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncOutcome {
    Copied,
    UpToDate,
}

async fn modified(path: &Path) -> io::Result<SystemTime> {
    fs::metadata(path).await?.modified()
}

/// Whether `dest` exists and carries the same modification time as `src`.
pub async fn is_up_to_date(src: &Path, dest: &Path) -> io::Result<bool> {
    let src_time = modified(src).await?;
    match modified(dest).await {
        Ok(dest_time) => Ok(dest_time == src_time),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Copy `src` to `dest` unless the timestamps already match.
pub async fn sync_file(src: &Path, dest: &Path) -> Result<SyncOutcome, AssetError> {
    let wrap = |source| AssetError {
        src: src.to_path_buf(),
        dest: dest.to_path_buf(),
        source,
    };

    if is_up_to_date(src, dest).await.map_err(wrap)? {
        debug!(path = %dest.display(), "asset up to date");
        return Ok(SyncOutcome::UpToDate);
    }

    let mtime = modified(src).await.map_err(wrap)?;
    fs::copy(src, dest).await.map_err(wrap)?;
    stamp(dest.to_path_buf(), mtime).await.map_err(wrap)?;

    debug!(src = %src.display(), dest = %dest.display(), "copied asset");
    Ok(SyncOutcome::Copied)
}

async fn stamp(path: PathBuf, mtime: SystemTime) -> io::Result<()> {
    tokio::task::spawn_blocking(move || {
        std::fs::OpenOptions::new()
            .write(true)
            .open(&path)?
            .set_modified(mtime)
    })
    .await
    .map_err(io::Error::other)?
}

/// Sync every asset into `dest_dir`, keeping each file name.
///
/// Assets are processed concurrently; the first failure is returned after
/// all of them finish.
pub async fn sync_assets<'a, I>(assets: I, dest_dir: &Path) -> Result<BuildReport, AssetError>
where
    I: IntoIterator<Item = &'a FileRef>,
{
    let jobs = assets.into_iter().map(|asset| {
        let dest = dest_dir.join(&asset.file_name);
        async move { sync_file(&asset.path, &dest).await }
    });

    let mut report = BuildReport::new();
    for outcome in join_all(jobs).await {
        match outcome? {
            SyncOutcome::Copied => report.assets_copied += 1,
            SyncOutcome::UpToDate => report.assets_up_to_date += 1,
        }
    }
    Ok(report)
}
