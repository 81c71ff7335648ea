use crate::error::{ArchiveError, Error, Result};
use async_trait::async_trait;
use std::fs::File;
use std::path::{Path, PathBuf};
use tokio::task::spawn_blocking;
use tracing::{debug, info, warn};

use super::ArchiveHandler;

/// [`ArchiveHandler`] for ZIP files, backed by the `zip` crate
#[derive(Clone, Copy, Debug, Default)]
pub struct ZipArchiveHandler;

impl ZipArchiveHandler {
    fn open(archive_path: &Path) -> Result<::zip::ZipArchive<File>> {
        let file = File::open(archive_path).map_err(|e| {
            std::io::Error::new(
                e.kind(),
                format!("failed to open archive {}: {}", archive_path.display(), e),
            )
        })?;

        ::zip::ZipArchive::new(file).map_err(|e| {
            Error::Archive(ArchiveError::Unreadable {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to read ZIP archive: {}", e),
            })
        })
    }

    /// Read every entry to the end so the library checks its CRC-32
    pub fn test_blocking(archive_path: &Path) -> Result<Option<String>> {
        let mut archive = Self::open(archive_path)?;
        debug!(?archive_path, entries = archive.len(), "testing ZIP entries");

        for i in 0..archive.len() {
            let mut entry = match archive.by_index(i) {
                Ok(entry) => entry,
                Err(::zip::result::ZipError::UnsupportedArchive(reason)) => {
                    return Err(ArchiveError::Unreadable {
                        archive: archive_path.to_path_buf(),
                        reason: format!("unsupported ZIP entry #{}: {}", i, reason),
                    }
                    .into());
                }
                Err(e) => {
                    warn!(?archive_path, index = i, error = %e, "unreadable ZIP entry header");
                    return Ok(Some(format!("entry #{}", i)));
                }
            };

            if entry.is_dir() {
                continue;
            }

            let name = entry.name().to_string();
            if let Err(e) = std::io::copy(&mut entry, &mut std::io::sink()) {
                warn!(?archive_path, entry = %name, error = %e, "ZIP entry failed integrity test");
                return Ok(Some(name));
            }
        }

        Ok(None)
    }

    /// Extract a single ZIP entry to disk, creating directories as needed
    fn extract_entry(
        mut entry: ::zip::read::ZipFile,
        dest_path: &Path,
        archive_path: &Path,
    ) -> Result<Option<PathBuf>> {
        let file_path = match entry.enclosed_name() {
            Some(path) => dest_path.join(path),
            None => {
                warn!(entry = entry.name(), "skipping entry with unsafe path");
                return Ok(None);
            }
        };

        if entry.is_dir() {
            std::fs::create_dir_all(&file_path).map_err(|e| {
                std::io::Error::new(e.kind(), format!("failed to create directory: {}", e))
            })?;
            return Ok(None);
        }

        if let Some(parent) = file_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                std::io::Error::new(
                    e.kind(),
                    format!("failed to create parent directories: {}", e),
                )
            })?;
        }

        let mut outfile = File::create(&file_path).map_err(|e| {
            std::io::Error::new(e.kind(), format!("failed to create output file: {}", e))
        })?;

        std::io::copy(&mut entry, &mut outfile).map_err(|e| {
            Error::Archive(ArchiveError::ExtractionFailed {
                archive: archive_path.to_path_buf(),
                reason: format!("failed to extract {}: {}", entry.name(), e),
            })
        })?;

        Ok(Some(file_path))
    }

    /// Extract every entry of `archive_path` into `dest_path`
    pub fn extract_blocking(archive_path: &Path, dest_path: &Path) -> Result<Vec<PathBuf>> {
        let mut archive = Self::open(archive_path)?;
        let mut extracted_files = Vec::new();

        for i in 0..archive.len() {
            let entry = archive.by_index(i).map_err(|e| {
                Error::Archive(ArchiveError::ExtractionFailed {
                    archive: archive_path.to_path_buf(),
                    reason: format!("failed to read ZIP entry #{}: {}", i, e),
                })
            })?;

            if let Some(file_path) = Self::extract_entry(entry, dest_path, archive_path)? {
                debug!(?file_path, "extracted");
                extracted_files.push(file_path);
            }
        }

        info!(
            ?archive_path,
            extracted_count = extracted_files.len(),
            "ZIP extraction successful"
        );

        Ok(extracted_files)
    }
}

fn task_failed(archive: &Path, e: tokio::task::JoinError) -> Error {
    Error::Archive(ArchiveError::ExtractionFailed {
        archive: archive.to_path_buf(),
        reason: format!("archive task panicked: {}", e),
    })
}

#[async_trait]
impl ArchiveHandler for ZipArchiveHandler {
    async fn test_integrity(&self, archive: &Path) -> Result<Option<String>> {
        let archive_owned = archive.to_path_buf();
        spawn_blocking(move || Self::test_blocking(&archive_owned))
            .await
            .map_err(|e| task_failed(archive, e))?
    }

    async fn extract_all(&self, archive: &Path, dest: &Path) -> Result<Vec<PathBuf>> {
        let archive_owned = archive.to_path_buf();
        let dest_owned = dest.to_path_buf();
        spawn_blocking(move || Self::extract_blocking(&archive_owned, &dest_owned))
            .await
            .map_err(|e| task_failed(archive, e))?
    }

    fn name(&self) -> &'static str {
        "zip"
    }
}
