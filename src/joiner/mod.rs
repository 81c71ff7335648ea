//! Part joiner
//!
//! Streams ordered parts into a single output file. The output is assembled
//! in a hidden temporary file beside the destination and renamed into place
//! only after every part has been copied, so a failed or interrupted join
//! never leaves a file at the destination path.
//!
//! If the destination already exists the join is skipped (see
//! [`ReusePolicy`] for how much checking happens first).

mod manifest;

pub use manifest::{JoinManifest, PartRecord, manifest_path, sha256_file};

use crate::config::{DEFAULT_CHUNK_SIZE, MAX_CHUNK_SIZE, ReusePolicy};
use crate::error::{Error, Result};
use crate::types::{JoinOutcome, JoinStatus, Part};
use manifest::parent_dir;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Options for [`join_parts`]
#[derive(Clone, Debug)]
pub struct JoinOptions {
    /// Bytes per read/write step
    pub chunk_size: usize,
    /// Handling of an existing destination
    pub reuse_policy: ReusePolicy,
    /// Checked before every chunk; once cancelled the join stops with
    /// [`Error::Interrupted`] and its temporary file is removed
    pub cancel_token: CancellationToken,
}

impl Default for JoinOptions {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            reuse_policy: ReusePolicy::default(),
            cancel_token: CancellationToken::new(),
        }
    }
}

/// Concatenate `parts` (already sorted by index) into `dest`
///
/// On success the destination holds the byte-for-byte concatenation of the
/// parts and a [`JoinManifest`] is written beside it. Any read or write
/// failure or cancellation aborts the join; the partially written temporary
/// file is removed and the destination is left untouched.
///
/// When `dest` already exists:
/// - [`ReusePolicy::Exists`]: nothing is written and `dest` is returned as is.
///   A missing or disagreeing manifest is logged as a warning.
/// - [`ReusePolicy::Verify`]: `dest` is reused only if its manifest matches
///   `parts` and the file's size and SHA-256; otherwise it is joined again.
pub fn join_parts(parts: &[Part], dest: &Path, options: &JoinOptions) -> Result<JoinOutcome> {
    if dest.try_exists()? {
        let reusable = match options.reuse_policy {
            ReusePolicy::Exists => {
                warn_if_unverified(parts, dest)?;
                true
            }
            ReusePolicy::Verify => existing_output_is_valid(parts, dest, options.chunk_size)?,
        };

        if reusable {
            info!(?dest, "output already exists, skipping join");
            return Ok(JoinOutcome {
                path: dest.to_path_buf(),
                status: JoinStatus::Skipped,
                bytes_written: 0,
            });
        }

        warn!(?dest, "existing output does not match its parts, joining again");
        JoinManifest::remove(dest)?;
        let bytes_written = write_joined(parts, dest, options, true)?;
        return Ok(JoinOutcome {
            path: dest.to_path_buf(),
            status: JoinStatus::Rejoined,
            bytes_written,
        });
    }

    let bytes_written = write_joined(parts, dest, options, false)?;
    Ok(JoinOutcome {
        path: dest.to_path_buf(),
        status: JoinStatus::Written,
        bytes_written,
    })
}

fn write_joined(parts: &[Part], dest: &Path, options: &JoinOptions, replace: bool) -> Result<u64> {
    let chunk_size = options.chunk_size.clamp(1, MAX_CHUNK_SIZE);
    let dir = parent_dir(dest);
    std::fs::create_dir_all(dir)?;

    let file_name = dest
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let mut tmp = tempfile::Builder::new()
        .prefix(&format!(".{}.", file_name))
        .suffix(".partial")
        .tempfile_in(dir)?;

    info!(?dest, parts = parts.len(), "writing joined output");
    debug!(tmp_path = ?tmp.path(), chunk_size, "streaming into temporary file");

    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size];
    let mut total_written: u64 = 0;
    let mut records = Vec::with_capacity(parts.len());

    for part in parts {
        info!(part = %part.name, size = part.size, "appending part");
        let copied = append_part(
            part,
            tmp.as_file_mut(),
            &mut hasher,
            &mut buf,
            &options.cancel_token,
        )?;
        if copied != part.size {
            warn!(
                part = %part.name,
                expected = part.size,
                copied,
                "part size changed since discovery"
            );
        }
        total_written += copied;
        records.push(PartRecord {
            size: copied,
            ..PartRecord::from(part)
        });
    }

    tmp.as_file_mut().flush()?;
    tmp.as_file().sync_all()?;

    if replace {
        tmp.persist(dest).map_err(|e| e.error)?;
    } else {
        tmp.persist_noclobber(dest).map_err(|e| e.error)?;
    }

    info!(?dest, bytes_written = total_written, "join complete");

    let sha256 = format!("{:x}", hasher.finalize());
    let manifest = JoinManifest::new(records, total_written, sha256);
    match manifest.store(dest) {
        Ok(path) => debug!(?path, "join manifest written"),
        Err(e) => warn!(error = %e, ?dest, "failed to write join manifest"),
    }

    Ok(total_written)
}

fn append_part(
    part: &Part,
    out: &mut File,
    hasher: &mut Sha256,
    buf: &mut [u8],
    cancel_token: &CancellationToken,
) -> Result<u64> {
    let mut reader = File::open(&part.path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("failed to open part {}: {}", part.path.display(), e),
        )
    })?;

    let mut copied: u64 = 0;
    loop {
        if cancel_token.is_cancelled() {
            warn!(part = %part.name, copied, "join cancelled, discarding partial output");
            return Err(Error::Interrupted);
        }
        let n = match reader.read(buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => {
                return Err(std::io::Error::new(
                    e.kind(),
                    format!("failed to read part {}: {}", part.path.display(), e),
                )
                .into());
            }
        };
        out.write_all(&buf[..n])?;
        hasher.update(&buf[..n]);
        copied += n as u64;
    }

    Ok(copied)
}

/// Log when an existing output cannot be vouched for without re-reading it
fn warn_if_unverified(parts: &[Part], dest: &Path) -> Result<()> {
    let manifest = match JoinManifest::load(dest) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => {
            warn!(
                ?dest,
                "reusing existing output without a join manifest; it may be incomplete. \
                 Remove it or use the verify reuse policy to rebuild"
            );
            return Ok(());
        }
        Err(e) => {
            warn!(error = %e, ?dest, "join manifest unreadable; reusing existing output unverified");
            return Ok(());
        }
    };

    let actual = std::fs::metadata(dest)?.len();
    if actual != manifest.total_bytes || !manifest.matches_parts(parts) {
        warn!(
            ?dest,
            actual_bytes = actual,
            manifest_bytes = manifest.total_bytes,
            "existing output disagrees with its join manifest or the current parts; reusing it anyway"
        );
    }
    Ok(())
}

fn existing_output_is_valid(parts: &[Part], dest: &Path, chunk_size: usize) -> Result<bool> {
    let manifest = match JoinManifest::load(dest) {
        Ok(Some(manifest)) => manifest,
        Ok(None) => {
            warn!(?dest, "no join manifest for existing output");
            return Ok(false);
        }
        Err(e) => {
            warn!(error = %e, ?dest, "join manifest unreadable");
            return Ok(false);
        }
    };

    if !manifest.matches_parts(parts) {
        debug!(?dest, "join manifest lists a different part set");
        return Ok(false);
    }

    let expected: u64 = parts.iter().map(|p| p.size).sum();
    let actual = std::fs::metadata(dest)?.len();
    if actual != manifest.total_bytes || actual != expected {
        debug!(actual, expected, manifest_bytes = manifest.total_bytes, "size mismatch");
        return Ok(false);
    }

    let digest = sha256_file(dest, chunk_size)?;
    if digest != manifest.sha256 {
        debug!(?dest, "checksum mismatch");
        return Ok(false);
    }

    debug!(?dest, "existing output verified against join manifest");
    Ok(true)
}
