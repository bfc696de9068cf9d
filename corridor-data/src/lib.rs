//! File formats and the analysis pipeline for corridor.
//!
//! Responsibilities:
//! - Decode uploaded zipped shapefiles and GeoJSON into layers.
//! - Package result layers as zipped shapefiles.
//! - Render WGS 84 display payloads.
//! - Drive the per-distance buffer and overlay analysis.
//!
//! Boundaries:
//! - Geometry rules live in `corridor-core`.
//! - Nothing here writes outside scratch directories; persisting archives is
//!   the caller's job.
//!
//! Invariants:
//! - Loaded layers are always in the working CRS.
//! - Scratch directories never outlive the call that created them.

#![forbid(unsafe_code)]

pub mod display;
pub mod export;
pub mod loader;
pub mod pipeline;

pub use display::{DEFAULT_CENTER, display_center, to_display_geojson};
pub use export::{ExportError, package_layer};
pub use loader::{LayerUpload, LoadError, ParseError, load_layer};
pub use pipeline::{
    AnalysisReport, AnalysisRequest, Archive, BufferDistances, CURATED_DISTANCES,
    DistanceAnalysis, DistanceError, DistanceOutcome, DistanceSummary, InputLayer,
    OfflineFetcher, PipelineError, ReportSummary, RoadFetchError, RoadNetworkFetcher,
    RoadsSource, is_curated, run_analysis,
};
