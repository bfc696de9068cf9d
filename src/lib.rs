//! Facade crate for the corridor road buffer and parcel overlay engine.
//!
//! This crate re-exports the geometry domain types and, behind the `data`
//! feature, the file loaders, exporters and analysis pipeline.

#![forbid(unsafe_code)]

pub use corridor_core::{
    AttributeValue, Attributes, BufferError, BufferResult, Crs, CrsError, CrsKind, Feature, Layer,
    MetricFrame, OverlayError, OverlayResult, ReprojectError, build_buffer, match_parcels,
    project_to_metric, utm_crs_for,
};

#[cfg(feature = "data")]
pub use corridor_data::{
    AnalysisReport, AnalysisRequest, BufferDistances, CURATED_DISTANCES, ExportError, LayerUpload,
    LoadError, PipelineError, RoadNetworkFetcher, RoadsSource, load_layer, package_layer,
    run_analysis, to_display_geojson,
};
