//! Core types shared between the pipeline stages

use std::fmt;
use std::path::PathBuf;

/// One fragment of a split file, discovered on disk
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Part {
    /// Full path to the part
    pub path: PathBuf,
    /// File name, as matched against the part pattern
    pub name: String,
    /// Ordering key taken from the trailing `.<digits>` suffix
    pub index: u64,
    /// Size in bytes at discovery time
    pub size: u64,
}

/// Pipeline stage, used to tag progress output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    /// List the directory and index matching files
    Discover,
    /// Check the indices form a contiguous range
    Validate,
    /// Concatenate parts into the output file
    Join,
    /// Integrity test of the reconstructed archive
    Verify,
    /// Unpack the archive
    Extract,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Discover => "discover",
            Stage::Validate => "validate",
            Stage::Join => "join",
            Stage::Verify => "verify",
            Stage::Extract => "extract",
        };
        f.write_str(name)
    }
}

/// How the join stage produced its output
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum JoinStatus {
    /// Parts were concatenated into a fresh file
    Written,
    /// An existing output was reused; nothing was written
    Skipped,
    /// An existing output failed verification and was joined again
    Rejoined,
}

/// Result of the join stage
#[derive(Clone, Debug)]
pub struct JoinOutcome {
    /// Path of the reconstructed archive
    pub path: PathBuf,
    /// Whether bytes were written
    pub status: JoinStatus,
    /// Bytes written by this run (0 when skipped)
    pub bytes_written: u64,
}

/// Summary of a completed run
#[derive(Clone, Debug)]
pub struct PipelineReport {
    /// Parts discovered, ascending by index
    pub parts: Vec<Part>,
    /// Join stage outcome
    pub join: JoinOutcome,
    /// Extraction directory
    pub extract_dir: PathBuf,
    /// Files written during extraction
    pub extracted_files: Vec<PathBuf>,
}
