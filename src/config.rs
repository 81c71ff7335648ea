//! Configuration types for rejoin
//!
//! A run is fully described by one [`Config`] value handed to the
//! [`Pipeline`](crate::pipeline::Pipeline). There are no process-wide settings.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default read/write chunk size for the join (16 MiB)
pub const DEFAULT_CHUNK_SIZE: usize = 16 * 1024 * 1024;

/// Largest accepted join chunk size (1 GiB); the whole chunk is allocated up front
pub const MAX_CHUNK_SIZE: usize = 1024 * 1024 * 1024;

/// What to do when the reconstructed archive already exists
#[derive(
    Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "snake_case")]
pub enum ReusePolicy {
    /// Reuse any existing output without re-reading the parts (default).
    /// A missing or disagreeing manifest is reported as a warning only.
    #[default]
    Exists,
    /// Reuse the existing output only when its manifest matches the current
    /// parts and the file's size and checksum; otherwise join again
    Verify,
}

/// Main configuration for a join-and-extract run
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Directory scanned for parts (default: ".")
    #[serde(default = "default_parts_dir")]
    pub parts_dir: PathBuf,

    /// Glob matched against whole file names; `*` and `?` are wildcards
    /// (default: "stanza_resources.zip.*")
    #[serde(default = "default_part_pattern")]
    pub part_pattern: String,

    /// Reconstructed archive path, relative to `parts_dir` unless absolute
    /// (default: "stanza_resources.zip")
    #[serde(default = "default_output_path")]
    pub output_path: PathBuf,

    /// Extraction directory, relative to `parts_dir` unless absolute
    /// (default: "stanza_resources_extracted")
    #[serde(default = "default_extract_dir")]
    pub extract_dir: PathBuf,

    /// Bytes read and written per step while joining (default: 16 MiB)
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Handling of an already existing output file
    #[serde(default)]
    pub reuse_policy: ReusePolicy,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            parts_dir: default_parts_dir(),
            part_pattern: default_part_pattern(),
            output_path: default_output_path(),
            extract_dir: default_extract_dir(),
            chunk_size: default_chunk_size(),
            reuse_policy: ReusePolicy::default(),
        }
    }
}

impl Config {
    /// Load a configuration from a JSON file; missing keys take their defaults
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| Error::Config {
            message: format!("failed to read {}: {}", path.display(), e),
            key: None,
        })?;
        let config = serde_json::from_str(&raw)?;
        Ok(config)
    }

    /// Reject settings the pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.part_pattern.trim().is_empty() {
            return Err(Error::Config {
                message: "part pattern must not be empty".to_string(),
                key: Some("part_pattern".to_string()),
            });
        }

        if self.chunk_size == 0 {
            return Err(Error::Config {
                message: "chunk size must be greater than zero".to_string(),
                key: Some("chunk_size".to_string()),
            });
        }

        if self.chunk_size > MAX_CHUNK_SIZE {
            return Err(Error::Config {
                message: format!(
                    "chunk size {} exceeds the maximum of {} bytes",
                    self.chunk_size, MAX_CHUNK_SIZE
                ),
                key: Some("chunk_size".to_string()),
            });
        }

        if self.output_path.as_os_str().is_empty() {
            return Err(Error::Config {
                message: "output path must not be empty".to_string(),
                key: Some("output_path".to_string()),
            });
        }

        if self.resolved_output_path() == self.resolved_extract_dir() {
            return Err(Error::Config {
                message: "extraction directory must differ from the output path".to_string(),
                key: Some("extract_dir".to_string()),
            });
        }

        Ok(())
    }

    /// Output path resolved against `parts_dir`
    pub fn resolved_output_path(&self) -> PathBuf {
        self.parts_dir.join(&self.output_path)
    }

    /// Extraction directory resolved against `parts_dir`
    pub fn resolved_extract_dir(&self) -> PathBuf {
        self.parts_dir.join(&self.extract_dir)
    }
}

fn default_parts_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_part_pattern() -> String {
    "stanza_resources.zip.*".to_string()
}

fn default_output_path() -> PathBuf {
    PathBuf::from("stanza_resources.zip")
}

fn default_extract_dir() -> PathBuf {
    PathBuf::from("stanza_resources_extracted")
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}
