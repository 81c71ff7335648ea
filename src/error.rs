//! Error types for rejoin
//!
//! Every failure aborts the run. The variants carry enough context (file name,
//! missing indices, bad entry name) for an operator to diagnose the problem by hand.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for rejoin operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for rejoin
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "chunk_size")
        key: Option<String>,
    },

    /// Part discovery, indexing, or sequencing error
    #[error(transparent)]
    Part(#[from] PartError),

    /// Archive verification or extraction error
    #[error(transparent)]
    Archive(#[from] ArchiveError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error (config file, join manifest)
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The operator interrupted the run
    #[error("interrupted")]
    Interrupted,
}

/// Errors raised while discovering and ordering parts
#[derive(Debug, Error)]
pub enum PartError {
    /// No file in the scanned directory matches the part pattern
    #[error("no files matching {pattern} in {dir}")]
    NotFound {
        /// The configured part pattern
        pattern: String,
        /// The directory that was scanned
        dir: PathBuf,
    },

    /// A matched file has no trailing `.<digits>` suffix
    #[error("not a part file (no numeric suffix): {name}")]
    Format {
        /// The offending file name
        name: String,
    },

    /// The discovered indices do not form a contiguous range
    #[error("{}", missing_parts_message(missing, *missing_count, found))]
    MissingParts {
        /// Indices absent from the range, ascending (lowest ones only for very wide gaps)
        missing: Vec<u64>,
        /// Total number of absent indices
        missing_count: u64,
        /// Indices actually discovered, ascending
        found: Vec<u64>,
    },

    /// Two or more files resolve to the same index (e.g. `a.zip.1` and `a.zip.001`)
    #[error("duplicate part index {index}: {names:?}")]
    DuplicateIndex {
        /// The index claimed more than once
        index: u64,
        /// Every file name that resolved to it
        names: Vec<String>,
    },

    /// Sequence validation was asked to check an empty index set
    #[error("no part indices to validate")]
    EmptySequence,
}

/// Errors raised by the archive verifier/extractor
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// An entry failed the integrity test
    #[error("corrupted file inside {archive}: {entry}")]
    Corrupt {
        /// The archive under test
        archive: PathBuf,
        /// Name of the first entry that failed
        entry: String,
    },

    /// The archive library could not open or parse the file
    #[error("failed to read archive {archive}: {reason}")]
    Unreadable {
        /// The archive that could not be read
        archive: PathBuf,
        /// The reason reported by the archive library
        reason: String,
    },

    /// Extraction failed after the integrity test passed
    #[error("extraction failed for {archive}: {reason}")]
    ExtractionFailed {
        /// The archive being extracted
        archive: PathBuf,
        /// The reason extraction failed
        reason: String,
    },
}

fn missing_parts_message(missing: &[u64], missing_count: u64, found: &[u64]) -> String {
    if missing_count > missing.len() as u64 {
        format!(
            "missing part(s): {:?} and {} more ({} in total)  found: {:?}",
            missing,
            missing_count - missing.len() as u64,
            missing_count,
            found
        )
    } else {
        format!("missing part(s): {:?}  found: {:?}", missing, found)
    }
}

impl Error {
    /// Machine-readable error code, used in the final log line of a failed run
    pub fn error_code(&self) -> &'static str {
        match self {
            Error::Config { .. } => "config_error",
            Error::Part(e) => match e {
                PartError::NotFound { .. } => "parts_not_found",
                PartError::Format { .. } => "part_format",
                PartError::MissingParts { .. } => "missing_parts",
                PartError::DuplicateIndex { .. } => "duplicate_part",
                PartError::EmptySequence => "empty_sequence",
            },
            Error::Archive(e) => match e {
                ArchiveError::Corrupt { .. } => "corrupt_archive",
                ArchiveError::Unreadable { .. } => "unreadable_archive",
                ArchiveError::ExtractionFailed { .. } => "extraction_failed",
            },
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::Interrupted => "interrupted",
        }
    }
}
