//! Archive verification and extraction
//!
//! Archive parsing, decompression and entry-path sanitization belong to the
//! archive library behind [`ArchiveHandler`]. This module only sequences
//! "test every entry, then extract" and aborts on the first bad entry.

mod zip;

pub use self::zip::ZipArchiveHandler;

use crate::error::{ArchiveError, Result};
use crate::types::Stage;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::info;

/// Archive library contract used by the pipeline
///
/// # Examples
///
/// ```no_run
/// use rejoin::archive::{ArchiveHandler, ZipArchiveHandler};
/// use std::path::Path;
///
/// # #[tokio::main]
/// # async fn main() -> rejoin::Result<()> {
/// let handler = ZipArchiveHandler;
/// match handler.test_integrity(Path::new("data.zip")).await? {
///     Some(bad) => println!("corrupted entry: {}", bad),
///     None => {
///         handler.extract_all(Path::new("data.zip"), Path::new("out")).await?;
///     }
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait ArchiveHandler: Send + Sync {
    /// Check every entry's stored checksum against its content
    ///
    /// Returns the name of the first entry that fails, or `None` if all pass.
    /// Errors are reserved for archives that cannot be opened at all.
    async fn test_integrity(&self, archive: &Path) -> Result<Option<String>>;

    /// Extract every entry into `dest`, returning the files written
    async fn extract_all(&self, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}

/// Test `archive` and, if every entry passes, extract it into `dest`
///
/// `dest` (and any missing parents) is created before the test runs. When an
/// entry fails the test this returns [`ArchiveError::Corrupt`] and nothing is
/// extracted.
pub async fn verify_and_extract(
    handler: &dyn ArchiveHandler,
    archive: &Path,
    dest: &Path,
) -> Result<Vec<PathBuf>> {
    tokio::fs::create_dir_all(dest).await.map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("failed to create destination {}: {}", dest.display(), e),
        )
    })?;

    info!(stage = %Stage::Verify, ?archive, handler = handler.name(), "testing archive integrity");
    if let Some(entry) = handler.test_integrity(archive).await? {
        return Err(ArchiveError::Corrupt {
            archive: archive.to_path_buf(),
            entry,
        }
        .into());
    }

    info!(stage = %Stage::Extract, ?archive, ?dest, "archive OK, extracting");
    let files = handler.extract_all(archive, dest).await?;
    info!(?dest, extracted_count = files.len(), "extraction complete");

    Ok(files)
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
