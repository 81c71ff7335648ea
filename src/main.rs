use clap::Parser;
use rejoin::{Config, Error, Pipeline, ReusePolicy, run_until_interrupted};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    author,
    version,
    about = "Join numbered split parts, verify the archive, and extract it",
    long_about = None
)]
struct Cli {
    /// Directory containing the parts
    #[arg(long)]
    dir: Option<PathBuf>,

    /// Glob matching part file names, e.g. "backup.zip.*"
    #[arg(long)]
    pattern: Option<String>,

    /// Reconstructed archive path (relative to --dir)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Extraction directory (relative to --dir)
    #[arg(long)]
    extract_dir: Option<PathBuf>,

    /// JSON config file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Join buffer size in MiB
    #[arg(long)]
    chunk_size_mib: Option<usize>,

    /// What to do when the output file already exists
    #[arg(long, value_enum)]
    reuse: Option<ReusePolicy>,

    /// Debug-level progress output
    #[arg(short, long, conflicts_with = "quiet")]
    verbose: bool,

    /// Only warnings and errors
    #[arg(short, long)]
    quiet: bool,
}

impl Cli {
    fn into_config(self) -> rejoin::Result<Config> {
        let mut config = match &self.config {
            Some(path) => Config::from_json_file(path)?,
            None => Config::default(),
        };

        if let Some(dir) = self.dir {
            config.parts_dir = dir;
        }
        if let Some(pattern) = self.pattern {
            config.part_pattern = pattern;
        }
        if let Some(output) = self.output {
            config.output_path = output;
        }
        if let Some(extract_dir) = self.extract_dir {
            config.extract_dir = extract_dir;
        }
        if let Some(mib) = self.chunk_size_mib {
            config.chunk_size = mib.checked_mul(1024 * 1024).ok_or_else(|| Error::Config {
                message: format!("chunk size of {} MiB is too large", mib),
                key: Some("chunk_size".to_string()),
            })?;
        }
        if let Some(reuse) = self.reuse {
            config.reuse_policy = reuse;
        }

        Ok(config)
    }

    fn default_level(&self) -> &'static str {
        if self.verbose {
            "debug"
        } else if self.quiet {
            "warn"
        } else {
            "info"
        }
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("rejoin={}", cli.default_level())));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    let result = match cli.into_config().and_then(Pipeline::new) {
        Ok(pipeline) => run_until_interrupted(&pipeline).await,
        Err(e) => Err(e),
    };

    match result {
        Ok(report) => {
            info!(
                extract_dir = ?report.extract_dir,
                files = report.extracted_files.len(),
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(code = e.error_code(), "{}", e);
            ExitCode::FAILURE
        }
    }
}
