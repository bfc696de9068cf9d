//! Error types emitted by the corridor CLI.
//!
//! Keep this error type reasonably small, as CLI helpers return
//! `Result<_, CliError>` and the workspace enables `clippy::result_large_err`.

use std::sync::Arc;

use camino::Utf8PathBuf;
use corridor_core::ReprojectError;
use corridor_data::PipelineError;
use thiserror::Error;

/// Errors emitted by the corridor CLI.
#[derive(Debug, Error)]
pub enum CliError {
    /// Provided arguments failed Clap validation.
    #[error(transparent)]
    ArgumentParsing(#[from] clap::Error),
    /// Configuration layering failed (files, env, CLI).
    #[error("failed to load configuration: {0}")]
    Configuration(#[from] Arc<ortho_config::OrthoError>),
    /// A required option is missing after configuration merging.
    #[error("missing {field} (set --{field} or {env})")]
    MissingArgument {
        /// Long flag name of the option.
        field: &'static str,
        /// Environment variable that can supply it.
        env: &'static str,
    },
    /// A distance outside the curated list was requested.
    #[error("{distance} m is not an offered buffer distance (choose from {offered})")]
    UnsupportedDistance {
        /// Requested distance in metres.
        distance: u32,
        /// Comma-separated curated distances.
        offered: String,
    },
    /// An input layer could not be read from disk.
    #[error("failed to read {field} from {path:?}: {source}")]
    ReadInput {
        /// Long flag name of the input.
        field: &'static str,
        /// Path that was read.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// The output directory exists but is not a directory.
    #[error("output directory {path:?} is not a directory")]
    OutputDirectoryNotDirectory {
        /// Offending path.
        path: Utf8PathBuf,
    },
    /// The analysis could not start.
    #[error("analysis failed: {0}")]
    Analysis(#[source] Box<PipelineError>),
    /// The map centre for the summary could not be computed.
    #[error("failed to summarise the analysis: {0}")]
    Summary(#[source] ReprojectError),
    /// Writing a result archive failed.
    #[error("failed to write {path:?}: {source}")]
    WriteArchive {
        /// Destination path.
        path: Utf8PathBuf,
        /// Underlying IO failure.
        #[source]
        source: std::io::Error,
    },
    /// Serializing the summary failed.
    #[error("failed to write summary: {0}")]
    WriteSummary(#[source] serde_json::Error),
}

impl From<PipelineError> for CliError {
    fn from(err: PipelineError) -> Self {
        Self::Analysis(Box::new(err))
    }
}
