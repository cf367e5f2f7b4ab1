//! Local directory scanning for batch uploads.
//!
//! Walks a directory recursively and produces the files to upload with
//! relative paths normalized to forward slashes.

use std::path::{Path, PathBuf};

use glob::Pattern;

use crate::error::UploadError;

/// Glob patterns that exclude files from a batch.
///
/// A relative path is excluded when any pattern matches the whole path or
/// any single segment of it, so `node_modules` drops a directory at any
/// depth and `*.tmp` drops matching files anywhere.
#[derive(Debug, Clone, Default)]
pub struct ExcludeSet {
    patterns: Vec<Pattern>,
}

impl ExcludeSet {
    pub fn new(patterns: &[String]) -> Result<Self, UploadError> {
        let patterns = patterns
            .iter()
            .map(|p| {
                Pattern::new(p).map_err(|e| UploadError::InvalidPattern {
                    pattern: p.clone(),
                    message: e.msg.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { patterns })
    }

    /// `relative` uses `/` as separator.
    pub fn is_excluded(&self, relative: &str) -> bool {
        self.patterns.iter().any(|p| {
            p.matches(relative) || relative.split('/').any(|segment| p.matches(segment))
        })
    }
}

/// A regular file found under the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScannedFile {
    pub local_path: PathBuf,
    /// Relative to the scan root, `/`-separated.
    pub relative_path: String,
    pub size: u64,
}

/// Scans `root` recursively and returns the files to upload, sorted by
/// relative path. Excluded directories are not descended into.
pub fn scan_files_for_upload(
    root: &Path,
    exclude: &ExcludeSet,
) -> Result<Vec<ScannedFile>, UploadError> {
    let meta = std::fs::metadata(root).map_err(|e| access(root, e))?;
    if !meta.is_dir() {
        return Err(UploadError::InvalidPath(format!(
            "{} is not a directory",
            root.display()
        )));
    }

    let mut files = Vec::new();
    walk_dir(root, root, exclude, &mut files)?;
    files.sort_by(|a, b| a.relative_path.cmp(&b.relative_path));
    Ok(files)
}

fn walk_dir(
    root: &Path,
    current: &Path,
    exclude: &ExcludeSet,
    files: &mut Vec<ScannedFile>,
) -> Result<(), UploadError> {
    let entries = std::fs::read_dir(current).map_err(|e| access(current, e))?;

    for entry in entries {
        let entry = entry.map_err(|e| access(current, e))?;
        let path = entry.path();
        let metadata = entry.metadata().map_err(|e| access(&path, e))?;

        let rel_path = path
            .strip_prefix(root)
            .map_err(|e| access(&path, std::io::Error::other(e)))?;
        // Normalize to forward slashes.
        let rel_str = rel_path.to_string_lossy().replace('\\', "/");

        if exclude.is_excluded(&rel_str) {
            tracing::trace!(path = %rel_str, "excluded");
            continue;
        }

        if metadata.is_dir() {
            walk_dir(root, &path, exclude, files)?;
        } else if metadata.is_file() {
            files.push(ScannedFile {
                local_path: path,
                relative_path: rel_str,
                size: metadata.len(),
            });
        }
    }

    Ok(())
}

fn access(path: &Path, source: std::io::Error) -> UploadError {
    UploadError::FileAccess {
        path: path.to_path_buf(),
        source,
    }
}
