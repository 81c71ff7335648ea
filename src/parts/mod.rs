//! Part discovery and indexing
//!
//! A part is a file whose name ends in a literal dot followed by decimal
//! digits, e.g. `archive.zip.001`. The digits are the part's ordering key.

mod pattern;

pub use pattern::PartPattern;

use crate::error::{PartError, Result};
use crate::types::Part;
use regex::Regex;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use tracing::{debug, info};

#[allow(clippy::expect_used)]
fn suffix_regex() -> &'static Regex {
    static SUFFIX: OnceLock<Regex> = OnceLock::new();
    SUFFIX.get_or_init(|| Regex::new(r"\.(\d+)$").expect("suffix regex is valid"))
}

/// Extract the numeric ordering key from a part's file name
///
/// `archive.zip.001` yields `1`. Names without a trailing `.<digits>` (or
/// whose digits overflow `u64`) fail with [`PartError::Format`] rather than
/// being ordered as zero.
///
/// # Examples
///
/// ```
/// use rejoin::parts::part_index;
///
/// assert_eq!(part_index("archive.zip.007").unwrap(), 7);
/// assert!(part_index("archive.zip").is_err());
/// ```
pub fn part_index(name: &str) -> std::result::Result<u64, PartError> {
    suffix_regex()
        .captures(name)
        .and_then(|caps| caps.get(1))
        .and_then(|digits| digits.as_str().parse::<u64>().ok())
        .ok_or_else(|| PartError::Format {
            name: name.to_string(),
        })
}

/// Discover the parts in `dir` whose names match `pattern`
///
/// Only regular files directly inside `dir` are considered. Paths listed in
/// `exclude` (the output file and its sidecar) are skipped, as are hidden
/// names unless the pattern itself starts with a dot.
///
/// Returns the parts sorted ascending by index. Fails with
/// [`PartError::NotFound`] when nothing matches, before any indexing, and
/// with [`PartError::Format`] for the first matching name that has no
/// numeric suffix.
pub async fn discover_parts(
    dir: &Path,
    pattern: &PartPattern,
    exclude: &[PathBuf],
) -> Result<Vec<Part>> {
    debug!(?dir, pattern = pattern.as_str(), "scanning for parts");

    let include_hidden = pattern.as_str().starts_with('.');
    let exclude = canonical_paths(exclude).await;

    let mut matched = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        std::io::Error::other(format!(
            "failed to read directory {}: {}",
            dir.display(),
            e
        ))
    })?;

    while let Some(entry) = entries.next_entry().await? {
        let name = entry.file_name().to_string_lossy().into_owned();
        if !pattern.matches(&name) || (name.starts_with('.') && !include_hidden) {
            continue;
        }

        let metadata = entry.metadata().await?;
        if !metadata.is_file() {
            continue;
        }

        let path = entry.path();
        if is_excluded(&path, &exclude).await {
            debug!(?path, "skipping excluded file");
            continue;
        }

        matched.push((path, name, metadata.len()));
    }

    if matched.is_empty() {
        return Err(PartError::NotFound {
            pattern: pattern.as_str().to_string(),
            dir: dir.to_path_buf(),
        }
        .into());
    }

    let mut parts = Vec::with_capacity(matched.len());
    for (path, name, size) in matched {
        let index = part_index(&name)?;
        parts.push(Part {
            path,
            name,
            index,
            size,
        });
    }

    parts.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.name.cmp(&b.name)));

    for part in &parts {
        info!(part = %part.name, index = part.index, size = part.size, "found part");
    }

    Ok(parts)
}

async fn canonical_paths(paths: &[PathBuf]) -> Vec<PathBuf> {
    let mut out = Vec::with_capacity(paths.len() * 2);
    for path in paths {
        out.push(path.clone());
        if let Ok(canonical) = tokio::fs::canonicalize(path).await {
            out.push(canonical);
        }
    }
    out
}

async fn is_excluded(path: &Path, exclude: &[PathBuf]) -> bool {
    if exclude.iter().any(|p| p == path) {
        return true;
    }
    match tokio::fs::canonicalize(path).await {
        Ok(canonical) => exclude.iter().any(|p| *p == canonical),
        Err(_) => false,
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
