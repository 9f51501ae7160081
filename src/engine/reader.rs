//! engine::reader
//!
//! Thin read path over a content tree on disk: read a file, list files,
//! search text. Used by both store variants; never takes the gate.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::EngineError;
use crate::core::types::ContentPath;

/// One matching line from [`search`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub path: ContentPath,
    /// 1-based.
    pub line_number: usize,
    pub line: String,
}

/// Contents of `path` under `root`, or `None` if there is no such file.
pub fn read_file(root: &Path, path: &ContentPath) -> Result<Option<Vec<u8>>, EngineError> {
    let full = path.under(root);
    match fs::read(&full) {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) if full.is_dir() => {
            tracing::debug!(path = %path, error = %e, "path is a directory");
            Ok(None)
        }
        Err(e) => Err(EngineError::Read {
            path: path.to_string(),
            message: e.to_string(),
        }),
    }
}

/// Files below `dir` (recursively), sorted, optionally filtered by extension.
///
/// `dir` is relative to `root`; an empty string means the whole tree.
/// A missing directory yields an empty list. `.git` is never listed.
pub fn list_files(
    root: &Path,
    dir: &str,
    extension: Option<&str>,
) -> Result<Vec<ContentPath>, EngineError> {
    let start = if dir.trim_matches('/').is_empty() {
        root.to_path_buf()
    } else {
        ContentPath::new(dir)?.under(root)
    };

    let mut found = Vec::new();
    if start.is_dir() {
        walk(root, &start, extension, &mut found)?;
    }
    found.sort();
    Ok(found)
}

fn walk(
    root: &Path,
    dir: &Path,
    extension: Option<&str>,
    found: &mut Vec<ContentPath>,
) -> Result<(), EngineError> {
    let read_err = |e: std::io::Error| EngineError::Read {
        path: dir.display().to_string(),
        message: e.to_string(),
    };

    for entry in fs::read_dir(dir).map_err(read_err)? {
        let entry = entry.map_err(read_err)?;
        let path = entry.path();
        if entry.file_name() == ".git" {
            continue;
        }
        let file_type = entry.file_type().map_err(read_err)?;
        if file_type.is_dir() {
            walk(root, &path, extension, found)?;
        } else if file_type.is_file() {
            let Ok(relative) = path.strip_prefix(root) else {
                continue;
            };
            let Ok(content_path) = ContentPath::new(relative.to_string_lossy()) else {
                continue;
            };
            if extension.map_or(true, |ext| content_path.extension() == Some(ext)) {
                found.push(content_path);
            }
        }
    }
    Ok(())
}

/// Case-insensitive substring search over UTF-8 files below `dir`.
pub fn search(root: &Path, dir: &str, query: &str) -> Result<Vec<SearchHit>, EngineError> {
    let needle = query.to_lowercase();
    if needle.is_empty() {
        return Ok(Vec::new());
    }

    let mut hits = Vec::new();
    for path in list_files(root, dir, None)? {
        let Some(bytes) = read_file(root, &path)? else {
            continue;
        };
        // Binary files are skipped.
        let Ok(text) = String::from_utf8(bytes) else {
            continue;
        };
        for (idx, line) in text.lines().enumerate() {
            if line.to_lowercase().contains(&needle) {
                hits.push(SearchHit {
                    path: path.clone(),
                    line_number: idx + 1,
                    line: line.to_string(),
                });
            }
        }
    }
    Ok(hits)
}
