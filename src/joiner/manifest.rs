//! Join manifest sidecar
//!
//! Written next to the output after a successful join. Records what the
//! output was built from so a later run can tell a finished join from a
//! stale or foreign file.

use crate::config::MAX_CHUNK_SIZE;
use crate::error::Result;
use crate::types::Part;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

const MANIFEST_VERSION: u32 = 1;

/// One part as recorded in the manifest
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartRecord {
    /// File name of the part
    pub name: String,
    /// Ordering key
    pub index: u64,
    /// Size in bytes when joined
    pub size: u64,
}

impl From<&Part> for PartRecord {
    fn from(part: &Part) -> Self {
        Self {
            name: part.name.clone(),
            index: part.index,
            size: part.size,
        }
    }
}

/// Record of a completed join
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JoinManifest {
    /// Manifest format version
    pub version: u32,
    /// Size of the output in bytes
    pub total_bytes: u64,
    /// Lowercase hex SHA-256 of the output
    pub sha256: String,
    /// Parts in join order
    pub parts: Vec<PartRecord>,
}

impl JoinManifest {
    /// Build a manifest for parts joined into `total_bytes` with digest `sha256`
    pub fn new(parts: Vec<PartRecord>, total_bytes: u64, sha256: String) -> Self {
        Self {
            version: MANIFEST_VERSION,
            total_bytes,
            sha256,
            parts,
        }
    }

    /// Whether this manifest describes exactly the given part set
    pub fn matches_parts(&self, parts: &[Part]) -> bool {
        self.parts.len() == parts.len()
            && self
                .parts
                .iter()
                .zip(parts)
                .all(|(record, part)| *record == PartRecord::from(part))
    }

    /// Read the manifest for `output`, `Ok(None)` if there is none
    pub fn load(output: &Path) -> Result<Option<Self>> {
        let path = manifest_path(output);
        let raw = match std::fs::read(&path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };
        Ok(Some(serde_json::from_slice(&raw)?))
    }

    /// Atomically write the manifest for `output`
    pub fn store(&self, output: &Path) -> Result<PathBuf> {
        let path = manifest_path(output);
        let dir = parent_dir(&path);
        let mut tmp = tempfile::Builder::new()
            .prefix(".manifest.")
            .suffix(".partial")
            .tempfile_in(dir)?;
        serde_json::to_writer_pretty(tmp.as_file_mut(), self)?;
        tmp.as_file_mut().write_all(b"\n")?;
        tmp.as_file().sync_all()?;
        tmp.persist(&path).map_err(|e| e.error)?;
        Ok(path)
    }

    /// Remove the manifest for `output` if present
    pub fn remove(output: &Path) -> Result<()> {
        match std::fs::remove_file(manifest_path(output)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Sidecar location for `output`: `.<output-name>.manifest.json` beside it
pub fn manifest_path(output: &Path) -> PathBuf {
    let name = output
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    parent_dir(output).join(format!(".{}.manifest.json", name))
}

/// Lowercase hex SHA-256 of the file at `path`, read `chunk_size` bytes at a time
pub fn sha256_file(path: &Path, chunk_size: usize) -> Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; chunk_size.clamp(1, MAX_CHUNK_SIZE)];
    loop {
        let n = match file.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == std::io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        };
        hasher.update(&buf[..n]);
    }
    Ok(format!("{:x}", hasher.finalize()))
}

pub(crate) fn parent_dir(path: &Path) -> &Path {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    }
}
