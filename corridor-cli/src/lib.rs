//! Command-line interface for the corridor parcel analysis.
#![forbid(unsafe_code)]

mod error;

use std::io::{self, Write};

use camino::{Utf8Path, Utf8PathBuf};
use clap::{Parser, Subcommand};
use corridor_data::{
    AnalysisRequest, BufferDistances, CURATED_DISTANCES, LayerUpload, OfflineFetcher,
    ReportSummary, RoadsSource, is_curated, run_analysis,
};
use log::{info, warn};
use ortho_config::{OrthoConfig, SubcmdConfigMerge};
use serde::{Deserialize, Serialize};

pub use error::CliError;

const ARG_PARCELS: &str = "parcels";
const ARG_ROADS: &str = "roads";
const ARG_DISTANCE: &str = "distance";
const ARG_COMPARE: &str = "compare";
const ARG_OUTPUT_DIR: &str = "output-dir";
const ENV_PARCELS: &str = "CORRIDOR_CMDS_ANALYSE_PARCELS";
const ENV_ROADS: &str = "CORRIDOR_CMDS_ANALYSE_ROADS";
const ENV_DISTANCE: &str = "CORRIDOR_CMDS_ANALYSE_DISTANCE";
const DEFAULT_OUTPUT_DIR: &str = "corridor-results";

/// Run the corridor CLI with the current process arguments and environment.
///
/// # Errors
/// Returns [`CliError`] when arguments are invalid, inputs cannot be read or
/// loaded, or results cannot be written.
pub fn run() -> Result<(), CliError> {
    let cli = Cli::try_parse().map_err(CliError::ArgumentParsing)?;
    match cli.command {
        Command::Analyse(args) => {
            let config = args.into_config()?;
            let outcome = run_analyse(&config)?;
            write_summary(&outcome.summary, &mut io::stdout().lock())?;
        }
    }
    Ok(())
}

#[derive(Debug, Parser)]
#[command(
    name = "corridor",
    about = "Find the parcels within buffer distances of a road network",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Buffer a road network and count the parcels each buffer touches.
    Analyse(AnalyseArgs),
}

/// CLI arguments for the `analyse` subcommand.
#[derive(Debug, Clone, Parser, Deserialize, Serialize, OrthoConfig, Default)]
#[command(
    name = "analyse",
    long_about = "Buffer the road layer at the selected distance and any \
                 comparison distances, then report which parcels each buffer \
                 touches. Paths can come from CLI flags, configuration files, \
                 or environment variables.",
    about = "Buffer roads and match parcels"
)]
#[ortho_config(prefix = "CORRIDOR")]
struct AnalyseArgs {
    /// Parcel layer: a zipped shapefile or a GeoJSON file.
    #[arg(long = ARG_PARCELS, value_name = "path")]
    #[serde(default)]
    parcels: Option<Utf8PathBuf>,
    /// Road layer: a zipped shapefile or a GeoJSON file.
    #[arg(long = ARG_ROADS, value_name = "path")]
    #[serde(default)]
    roads: Option<Utf8PathBuf>,
    /// Primary buffer distance in metres.
    #[arg(long = ARG_DISTANCE, value_name = "metres")]
    #[serde(default)]
    distance: Option<u32>,
    /// Further distances to compare, comma separated.
    #[arg(long = ARG_COMPARE, value_name = "metres", value_delimiter = ',')]
    #[serde(default)]
    compare: Option<Vec<u32>>,
    /// Directory receiving the result archives.
    #[arg(long = ARG_OUTPUT_DIR, value_name = "dir")]
    #[serde(default)]
    output_dir: Option<Utf8PathBuf>,
}

impl AnalyseArgs {
    fn into_config(self) -> Result<AnalyseConfig, CliError> {
        let merged = self.load_and_merge().map_err(CliError::Configuration)?;
        AnalyseConfig::try_from(merged)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AnalyseConfig {
    parcels: Utf8PathBuf,
    roads: Utf8PathBuf,
    distances: BufferDistances,
    output_dir: Utf8PathBuf,
}

impl AnalyseConfig {
    fn read_request(&self) -> Result<AnalysisRequest, CliError> {
        Ok(AnalysisRequest {
            parcels: Some(read_upload(&self.parcels, ARG_PARCELS)?),
            roads: RoadsSource::Upload(read_upload(&self.roads, ARG_ROADS)?),
            distances: self.distances.clone(),
        })
    }

    fn prepare_output_dir(&self) -> Result<(), CliError> {
        if self.output_dir.exists() && !self.output_dir.is_dir() {
            return Err(CliError::OutputDirectoryNotDirectory {
                path: self.output_dir.clone(),
            });
        }
        corridor_fs::create_dir_all(&self.output_dir).map_err(|source| CliError::WriteArchive {
            path: self.output_dir.clone(),
            source,
        })
    }
}

impl TryFrom<AnalyseArgs> for AnalyseConfig {
    type Error = CliError;

    fn try_from(args: AnalyseArgs) -> Result<Self, Self::Error> {
        let parcels = args.parcels.ok_or(CliError::MissingArgument {
            field: ARG_PARCELS,
            env: ENV_PARCELS,
        })?;
        let roads = args.roads.ok_or(CliError::MissingArgument {
            field: ARG_ROADS,
            env: ENV_ROADS,
        })?;
        let distance = args.distance.ok_or(CliError::MissingArgument {
            field: ARG_DISTANCE,
            env: ENV_DISTANCE,
        })?;
        let compare = args.compare.unwrap_or_default();
        for &candidate in std::iter::once(&distance).chain(&compare) {
            require_curated(candidate)?;
        }
        Ok(Self {
            parcels,
            roads,
            distances: BufferDistances::from_selection(distance, &compare),
            output_dir: args
                .output_dir
                .unwrap_or_else(|| Utf8PathBuf::from(DEFAULT_OUTPUT_DIR)),
        })
    }
}

fn require_curated(distance: u32) -> Result<(), CliError> {
    if is_curated(distance) {
        return Ok(());
    }
    let offered = CURATED_DISTANCES
        .iter()
        .map(u32::to_string)
        .collect::<Vec<_>>()
        .join(", ");
    Err(CliError::UnsupportedDistance { distance, offered })
}

fn read_upload(path: &Utf8Path, field: &'static str) -> Result<LayerUpload, CliError> {
    let bytes = corridor_fs::read_file(path).map_err(|source| CliError::ReadInput {
        field,
        path: path.to_path_buf(),
        source,
    })?;
    Ok(LayerUpload::new(path.file_name().unwrap_or(path.as_str()), bytes))
}

/// What one `analyse` invocation produced.
#[derive(Debug)]
struct AnalyseOutcome {
    summary: ReportSummary,
    written: Vec<Utf8PathBuf>,
}

fn run_analyse(config: &AnalyseConfig) -> Result<AnalyseOutcome, CliError> {
    let request = config.read_request()?;
    let report = run_analysis(&request, &OfflineFetcher)?;
    for outcome in &report.outcomes {
        if let Err(err) = &outcome.result {
            warn!("{} m buffer failed: {err}", outcome.distance_m);
        }
    }

    config.prepare_output_dir()?;
    let mut written = Vec::new();
    for archive in report.archives() {
        let path = config.output_dir.join(&archive.file_name);
        corridor_fs::write_file(&path, &archive.bytes).map_err(|source| {
            CliError::WriteArchive {
                path: path.clone(),
                source,
            }
        })?;
        info!("wrote {path}");
        written.push(path);
    }

    let summary = report.summary().map_err(CliError::Summary)?;
    Ok(AnalyseOutcome { summary, written })
}

fn write_summary<W: Write>(summary: &ReportSummary, out: &mut W) -> Result<(), CliError> {
    serde_json::to_writer_pretty(&mut *out, summary).map_err(CliError::WriteSummary)?;
    writeln!(out).map_err(|err| CliError::WriteSummary(serde_json::Error::io(err)))
}

#[cfg(test)]
mod tests;
