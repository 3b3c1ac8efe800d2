//! Folder and archive walker.
//!
//! Recursively discovers supported files under a root, expands zip archives
//! into per-invocation temp workspaces, and runs the pipeline over every
//! discovered file. One file's failure never aborts the batch; the caller
//! gets a summary with per-file detail.
//!
//! Archive workspaces are `tempfile::TempDir`s: removal happens on drop, on
//! every exit path, so a failing inner file cannot leak extracted data on
//! disk.

use anyhow::{bail, Context, Result};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::config::WalkerConfig;
use crate::extract::{extension_of, is_archive_extension};
use crate::models::BatchSummary;
use crate::pipeline::Pipeline;

/// Extensions the walker picks up. Everything else is skipped silently.
pub const SUPPORTED_EXTENSIONS: &[&str] = &[
    "pdf", "doc", "docx", "xls", "xlsx", "ppt", "pptx", "png", "jpg", "jpeg", "gif", "bmp",
    "tiff", "webp", "txt", "csv", "rtf", "dwg", "dxf", "zip",
];

/// Prefix for archive extraction workspaces under the system temp root.
const ARCHIVE_WORKSPACE_PREFIX: &str = "intake-archive-";

pub fn is_supported_extension(ext: &str, config: &WalkerConfig) -> bool {
    SUPPORTED_EXTENSIONS.contains(&ext)
        || config.extra_extensions.iter().any(|e| e == ext)
}

/// Enumerate supported files under `root`, sorted for deterministic order.
/// Archives are returned as-is; [`process_folder`] expands them.
pub fn discover_files(root: &Path, config: &WalkerConfig) -> Result<Vec<PathBuf>> {
    if !root.exists() {
        bail!("Walk root does not exist: {}", root.display());
    }

    let mut files = Vec::new();
    let walker = WalkDir::new(root).follow_links(config.follow_symlinks);
    for entry in walker {
        let entry = entry?;
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        match extension_of(path) {
            Some(ext) if is_supported_extension(&ext, config) => {
                files.push(path.to_path_buf());
            }
            _ => {
                debug!(path = %path.display(), "skipping unsupported file");
            }
        }
    }

    files.sort();
    Ok(files)
}

/// Walk `root` and process every supported file, recursing into archives.
///
/// Only a missing root propagates as an error; everything that goes wrong
/// with an individual file (including an unreadable archive) is captured as
/// a per-file failure in the summary.
pub async fn process_folder(
    pipeline: &Pipeline,
    root: &Path,
    config: &WalkerConfig,
    actor: &str,
) -> Result<BatchSummary> {
    process_folder_inner(pipeline, root.to_path_buf(), config.clone(), actor.to_string()).await
}

// Async recursion (archive → extracted folder → possibly nested archives)
// needs boxing.
fn process_folder_inner(
    pipeline: &Pipeline,
    root: PathBuf,
    config: WalkerConfig,
    actor: String,
) -> Pin<Box<dyn Future<Output = Result<BatchSummary>> + Send + '_>> {
    Box::pin(async move {
        let files = discover_files(&root, &config)?;
        let mut summary = BatchSummary::default();

        for path in files {
            let file_name = path
                .file_name()
                .map(|n| n.to_string_lossy().to_string())
                .unwrap_or_else(|| path.display().to_string());
            let path_str = path.display().to_string();
            let ext = extension_of(&path).unwrap_or_default();

            if is_archive_extension(&ext) {
                match process_archive(pipeline, &path, &config, &actor).await {
                    Ok(inner) => summary.merge(inner),
                    Err(e) => {
                        warn!(path = %path_str, error = %e, "archive processing failed");
                        summary.record_failure(file_name, path_str, e.to_string());
                    }
                }
                continue;
            }

            match pipeline.process_path(&path, &actor).await {
                Ok(doc) => summary.record_success(file_name, path_str, doc),
                Err(e) => {
                    warn!(path = %path_str, error = %e, "file processing failed");
                    summary.record_failure(file_name, path_str, e.to_string());
                }
            }
        }

        Ok(summary)
    })
}

/// Extract a zip into a fresh temp workspace and recurse into it. The
/// workspace is removed when this function returns, success or failure.
async fn process_archive(
    pipeline: &Pipeline,
    archive_path: &Path,
    config: &WalkerConfig,
    actor: &str,
) -> Result<BatchSummary> {
    let workspace = tempfile::Builder::new()
        .prefix(ARCHIVE_WORKSPACE_PREFIX)
        .tempdir()
        .context("Failed to create archive workspace")?;

    let file = std::fs::File::open(archive_path)
        .with_context(|| format!("Failed to open archive: {}", archive_path.display()))?;
    let mut archive = zip::ZipArchive::new(file)
        .with_context(|| format!("Unreadable archive: {}", archive_path.display()))?;
    archive
        .extract(workspace.path())
        .with_context(|| format!("Failed to extract archive: {}", archive_path.display()))?;

    debug!(
        archive = %archive_path.display(),
        workspace = %workspace.path().display(),
        "archive extracted"
    );

    let summary =
        process_folder_inner(pipeline, workspace.path().to_path_buf(), config.clone(), actor.to_string())
            .await?;

    // workspace dropped here; TempDir removes the directory tree
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn discover_filters_unsupported_extensions() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("quote.pdf"), b"x").unwrap();
        fs::write(dir.path().join("leads.csv"), b"x").unwrap();
        fs::write(dir.path().join("setup.exe"), b"x").unwrap();
        fs::write(dir.path().join("notes.bak"), b"x").unwrap();

        let files = discover_files(dir.path(), &WalkerConfig::default()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().to_string())
            .collect();
        assert_eq!(names, vec!["leads.csv", "quote.pdf"]);
    }

    #[test]
    fn discover_recurses_into_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("2024/q1")).unwrap();
        fs::write(dir.path().join("2024/q1/invoice.pdf"), b"x").unwrap();

        let files = discover_files(dir.path(), &WalkerConfig::default()).unwrap();
        assert_eq!(files.len(), 1);
        assert!(files[0].ends_with("2024/q1/invoice.pdf"));
    }

    #[test]
    fn discover_fails_on_missing_root() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(discover_files(&missing, &WalkerConfig::default()).is_err());
    }

    #[test]
    fn extra_extensions_extend_the_supported_set() {
        let config = WalkerConfig {
            follow_symlinks: false,
            extra_extensions: vec!["heic".to_string()],
        };
        assert!(is_supported_extension("heic", &config));
        assert!(!is_supported_extension("exe", &config));
        assert!(is_supported_extension("pdf", &config));
    }
}
