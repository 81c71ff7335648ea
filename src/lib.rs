//! # rejoin
//!
//! Reassembles a file that was split into numbered parts (`archive.zip.001`,
//! `archive.zip.002`, ...), checks the reconstructed archive, and extracts it.
//!
//! ## Quick Start
//!
//! ```no_run
//! use rejoin::{Config, Pipeline};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config {
//!         part_pattern: "backup.zip.*".to_string(),
//!         output_path: "backup.zip".into(),
//!         extract_dir: "backup".into(),
//!         ..Default::default()
//!     };
//!
//!     let report = Pipeline::new(config)?.run().await?;
//!     println!("extracted {} files", report.extracted_files.len());
//!     Ok(())
//! }
//! ```
//!
//! Stages run strictly one after another. The parts must form a contiguous
//! index range before any output is written, and the archive must pass an
//! integrity test before anything is extracted.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Archive verification and extraction
pub mod archive;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Streaming part concatenation
pub mod joiner;
/// Part discovery and indexing
pub mod parts;
/// Join-and-extract orchestration
pub mod pipeline;
/// Part sequence validation
pub mod sequence;
/// Core types
pub mod types;

// Re-export commonly used types
pub use archive::{ArchiveHandler, ZipArchiveHandler};
pub use config::{Config, ReusePolicy};
pub use error::{ArchiveError, Error, PartError, Result};
pub use pipeline::Pipeline;
pub use types::{JoinOutcome, JoinStatus, Part, PipelineReport, Stage};

/// Run the pipeline, failing with [`Error::Interrupted`] on SIGINT/SIGTERM.
///
/// An interrupted join removes its temporary file and never promotes it,
/// so the output path stays absent and the next run starts the join from
/// scratch.
///
/// # Example
///
/// ```no_run
/// use rejoin::{Config, Pipeline, run_until_interrupted};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let pipeline = Pipeline::new(Config::default())?;
///     run_until_interrupted(&pipeline).await?;
///     Ok(())
/// }
/// ```
pub async fn run_until_interrupted(pipeline: &Pipeline) -> Result<PipelineReport> {
    run_with_shutdown(pipeline, wait_for_signal()).await
}

/// Run the pipeline until it finishes or `shutdown` completes
///
/// On shutdown the pipeline's cancellation token is cancelled and the run
/// is awaited to completion, so the join can clean up after itself before
/// this returns [`Error::Interrupted`].
pub async fn run_with_shutdown<F>(pipeline: &Pipeline, shutdown: F) -> Result<PipelineReport>
where
    F: std::future::Future<Output = ()>,
{
    let run = pipeline.run();
    tokio::pin!(run);

    tokio::select! {
        result = &mut run => result,
        _ = shutdown => {
            tracing::info!("shutdown requested, waiting for the current stage to stop");
            pipeline.cancel_token().cancel();
            match run.await {
                Err(Error::Interrupted) => {}
                Err(e) => tracing::debug!(error = %e, "pipeline failed while shutting down"),
                Ok(_) => tracing::debug!("pipeline finished before observing the shutdown"),
            }
            Err(Error::Interrupted)
        }
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::warn!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::warn!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), Ok(mut sigint)) => {
            tracing::debug!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            sigint.recv().await;
            tracing::warn!("Received SIGINT signal (Ctrl+C)");
        }
        (Ok(mut sigterm), Err(e)) => {
            tracing::debug!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            sigterm.recv().await;
            tracing::warn!("Received SIGTERM signal");
        }
        (Err(e), Err(_)) => {
            tracing::debug!(error = %e, "Could not register any signal handlers");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::warn!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to listen for Ctrl+C signal");
            std::future::pending::<()>().await;
        }
    }
}
