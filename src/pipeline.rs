//! Join-and-extract pipeline
//!
//! Runs the stages in a fixed order, each one awaited before the next starts:
//! 1. Discover - list the directory and index matching parts
//! 2. Validate - require a contiguous index range
//! 3. Join - concatenate parts into the output file
//! 4. Verify - integrity test of every archive entry
//! 5. Extract - unpack into the extraction directory
//!
//! The first failure ends the run. Nothing is retried or rolled back.
//! Cancelling the pipeline's token stops an in-flight join (its temporary
//! file is removed) and prevents extraction from starting.

use crate::archive::{ArchiveHandler, ZipArchiveHandler, verify_and_extract};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::joiner::{JoinOptions, join_parts, manifest_path};
use crate::parts::{PartPattern, discover_parts};
use crate::sequence::validate_parts;
use crate::types::{JoinStatus, PipelineReport, Stage};
use std::sync::Arc;
use tokio::task::spawn_blocking;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Pipeline executor
pub struct Pipeline {
    config: Config,
    archive_handler: Arc<dyn ArchiveHandler>,
    cancel_token: CancellationToken,
}

impl Pipeline {
    /// Create a pipeline that extracts with the ZIP handler
    pub fn new(config: Config) -> Result<Self> {
        Self::with_handler(config, Arc::new(ZipArchiveHandler))
    }

    /// Create a pipeline with a custom archive handler
    pub fn with_handler(config: Config, archive_handler: Arc<dyn ArchiveHandler>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            archive_handler,
            cancel_token: CancellationToken::new(),
        })
    }

    /// Token that stops a running [`run`](Self::run) with [`Error::Interrupted`]
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel_token.clone()
    }

    /// Run every stage in order
    pub async fn run(&self) -> Result<PipelineReport> {
        let output_path = self.config.resolved_output_path();
        let extract_dir = self.config.resolved_extract_dir();

        info!(
            parts_dir = ?self.config.parts_dir,
            pattern = %self.config.part_pattern,
            ?output_path,
            ?extract_dir,
            "starting join pipeline"
        );

        debug!(stage = %Stage::Discover, "running stage");
        let pattern = PartPattern::new(&self.config.part_pattern)?;
        let exclude = [output_path.clone(), manifest_path(&output_path)];
        let parts = discover_parts(&self.config.parts_dir, &pattern, &exclude).await?;
        let total_size: u64 = parts.iter().map(|p| p.size).sum();
        info!(count = parts.len(), total_size, "parts discovered");

        debug!(stage = %Stage::Validate, "running stage");
        validate_parts(&parts)?;

        debug!(stage = %Stage::Join, "running stage");
        let options = JoinOptions {
            chunk_size: self.config.chunk_size,
            reuse_policy: self.config.reuse_policy,
            cancel_token: self.cancel_token.clone(),
        };
        let join_parts_owned = parts.clone();
        let join_dest = output_path.clone();
        let join = spawn_blocking(move || join_parts(&join_parts_owned, &join_dest, &options))
            .await
            .map_err(|e| Error::Io(std::io::Error::other(format!("join task panicked: {}", e))))??;

        match join.status {
            JoinStatus::Skipped => info!(path = ?join.path, "using existing output"),
            JoinStatus::Written | JoinStatus::Rejoined => info!(
                path = ?join.path,
                bytes_written = join.bytes_written,
                "output joined"
            ),
        }

        if self.cancel_token.is_cancelled() {
            return Err(Error::Interrupted);
        }

        let extracted_files =
            verify_and_extract(self.archive_handler.as_ref(), &join.path, &extract_dir).await?;

        info!(?extract_dir, files = extracted_files.len(), "pipeline complete");

        Ok(PipelineReport {
            parts,
            join,
            extract_dir,
            extracted_files,
        })
    }
}
