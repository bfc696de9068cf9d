//! Run the buffer and overlay analysis for one request.
//!
//! Inputs are loaded once; each requested distance is then processed
//! independently, in order, so a failure at one distance is recorded in its
//! [`DistanceOutcome`] without affecting the others.

mod distances;
mod fetch;

use corridor_core::{
    BufferError, BufferResult, Crs, Layer, OverlayError, OverlayResult, ReprojectError,
    build_buffer, match_parcels,
};
use log::{info, warn};
use serde::Serialize;
use thiserror::Error;

pub use distances::{BufferDistances, CURATED_DISTANCES, is_curated};
pub use fetch::{OfflineFetcher, RoadFetchError, RoadNetworkFetcher};

use crate::{ExportError, LayerUpload, LoadError, display_center, load_layer, package_layer};

/// Where the road network comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoadsSource {
    /// An uploaded road layer.
    Upload(LayerUpload),
    /// A place name resolved through a [`RoadNetworkFetcher`].
    Place(String),
    /// No road source was supplied.
    Absent,
}

/// Inputs for [`run_analysis`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalysisRequest {
    /// Parcel layer upload; required.
    pub parcels: Option<LayerUpload>,
    /// Road network source; required.
    pub roads: RoadsSource,
    /// Distances to evaluate, in order.
    pub distances: BufferDistances,
}

/// Which input a [`PipelineError`] refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputLayer {
    /// The parcel layer.
    Parcels,
    /// The road layer.
    Roads,
}

impl std::fmt::Display for InputLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Self::Parcels => "parcels",
            Self::Roads => "roads",
        })
    }
}

/// Errors that stop a request before any distance is processed.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// A required input layer was not supplied.
    #[error("{layer} data is required")]
    MissingInput {
        /// The missing layer.
        layer: InputLayer,
    },
    /// An uploaded layer could not be loaded.
    #[error("cannot load {layer}: {source}")]
    Load {
        /// The layer being loaded.
        layer: InputLayer,
        /// Loader failure.
        #[source]
        source: LoadError,
    },
    /// The road network could not be fetched for a place name.
    #[error("cannot fetch roads for {place:?}: {source}")]
    Fetch {
        /// Requested place name.
        place: String,
        /// Fetcher failure.
        #[source]
        source: RoadFetchError,
    },
    /// A fetched road layer could not be converted into the working CRS.
    #[error("cannot reproject fetched roads: {0}")]
    Reproject(#[source] ReprojectError),
}

/// Errors confined to a single distance.
#[derive(Debug, Error)]
pub enum DistanceError {
    /// Buffering the roads failed.
    #[error(transparent)]
    Buffer(#[from] BufferError),
    /// Matching parcels against the buffer failed.
    #[error(transparent)]
    Overlay(#[from] OverlayError),
    /// Packaging a result layer failed.
    #[error(transparent)]
    Export(#[from] ExportError),
}

/// A packaged shapefile archive ready for download or writing to disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Archive {
    /// File name, e.g. `buffer_50m.zip`.
    pub file_name: String,
    /// Zip archive bytes.
    pub bytes: Vec<u8>,
}

/// Results computed for one distance.
#[derive(Debug, Clone, PartialEq)]
pub struct DistanceAnalysis {
    /// Buffer polygon in the working CRS.
    pub buffer: BufferResult,
    /// Parcels intersecting the buffer.
    pub intersections: OverlayResult,
    /// Buffer and intersection archives; empty layers are not packaged.
    pub archives: Vec<Archive>,
}

/// Result of processing one distance.
#[derive(Debug)]
pub struct DistanceOutcome {
    /// Buffer distance in metres.
    pub distance_m: u32,
    /// Analysis for this distance, or why it failed.
    pub result: Result<DistanceAnalysis, DistanceError>,
}

/// Everything produced by [`run_analysis`].
#[derive(Debug)]
pub struct AnalysisReport {
    /// Parcels in the working CRS.
    pub parcels: Layer,
    /// Roads in the working CRS.
    pub roads: Layer,
    /// One outcome per requested distance, in request order.
    pub outcomes: Vec<DistanceOutcome>,
}

/// Serialisable digest of one [`DistanceOutcome`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DistanceSummary {
    /// Buffer distance in metres.
    pub distance_m: u32,
    /// Number of intersecting parcels, when the distance succeeded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parcel_count: Option<usize>,
    /// EPSG code of the metric CRS used for buffering.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_epsg: Option<u32>,
    /// Whether buffering fell back to Web Mercator.
    pub fallback: bool,
    /// Archive file names produced for this distance.
    pub archives: Vec<String>,
    /// Failure message, when the distance failed.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl From<&DistanceOutcome> for DistanceSummary {
    fn from(outcome: &DistanceOutcome) -> Self {
        match &outcome.result {
            Ok(analysis) => Self {
                distance_m: outcome.distance_m,
                parcel_count: Some(analysis.intersections.count),
                metric_epsg: Some(analysis.buffer.metric_crs.epsg()),
                fallback: analysis.buffer.fallback,
                archives: analysis
                    .archives
                    .iter()
                    .map(|archive| archive.file_name.clone())
                    .collect(),
                error: None,
            },
            Err(err) => Self {
                distance_m: outcome.distance_m,
                parcel_count: None,
                metric_epsg: None,
                fallback: false,
                archives: Vec::new(),
                error: Some(err.to_string()),
            },
        }
    }
}

/// Serialisable digest of an [`AnalysisReport`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    /// Number of parcels loaded.
    pub parcels: usize,
    /// Number of road features loaded.
    pub roads: usize,
    /// Suggested map centre as `[lat, lon]`.
    pub center: (f64, f64),
    /// Per-distance digests in request order.
    pub distances: Vec<DistanceSummary>,
}

impl AnalysisReport {
    /// Summarise the report for display or serialisation.
    ///
    /// # Errors
    /// Returns [`ReprojectError`] when the map centre cannot be computed.
    pub fn summary(&self) -> Result<ReportSummary, ReprojectError> {
        Ok(ReportSummary {
            parcels: self.parcels.len(),
            roads: self.roads.len(),
            center: display_center(&self.parcels, &self.roads)?,
            distances: self.outcomes.iter().map(DistanceSummary::from).collect(),
        })
    }

    /// Archives from every successful distance, in request order.
    pub fn archives(&self) -> impl Iterator<Item = &Archive> {
        self.outcomes
            .iter()
            .filter_map(|outcome| outcome.result.as_ref().ok())
            .flat_map(|analysis| analysis.archives.iter())
    }
}

/// Load the inputs of `request` and analyse every requested distance.
///
/// Roads are resolved first, then parcels. Per-distance failures are
/// recorded in the matching [`DistanceOutcome`].
///
/// # Errors
/// Returns [`PipelineError`] when an input is missing or cannot be loaded;
/// no distance is processed in that case.
pub fn run_analysis<F>(request: &AnalysisRequest, fetcher: &F) -> Result<AnalysisReport, PipelineError>
where
    F: RoadNetworkFetcher + ?Sized,
{
    let roads = resolve_roads(&request.roads, fetcher)?;
    let parcels = request
        .parcels
        .as_ref()
        .ok_or(PipelineError::MissingInput {
            layer: InputLayer::Parcels,
        })
        .and_then(|upload| {
            load_layer(upload).map_err(|source| PipelineError::Load {
                layer: InputLayer::Parcels,
                source,
            })
        })?;
    info!(
        "analysing {} parcels against {} roads at {} distances",
        parcels.len(),
        roads.len(),
        request.distances.len()
    );

    let outcomes = request
        .distances
        .as_slice()
        .iter()
        .map(|&distance_m| {
            let result = analyse_distance(&parcels, &roads, distance_m);
            if let Err(err) = &result {
                warn!("distance {distance_m} m failed: {err}");
            }
            DistanceOutcome { distance_m, result }
        })
        .collect();
    Ok(AnalysisReport {
        parcels,
        roads,
        outcomes,
    })
}

fn resolve_roads<F>(source: &RoadsSource, fetcher: &F) -> Result<Layer, PipelineError>
where
    F: RoadNetworkFetcher + ?Sized,
{
    match source {
        RoadsSource::Upload(upload) => load_layer(upload).map_err(|err| PipelineError::Load {
            layer: InputLayer::Roads,
            source: err,
        }),
        RoadsSource::Place(place) if !place.trim().is_empty() => {
            let name = place.trim();
            let fetched = fetcher
                .fetch_roads(name)
                .map_err(|err| PipelineError::Fetch {
                    place: name.to_owned(),
                    source: err,
                })?;
            fetched.to_crs(Crs::WORKING).map_err(PipelineError::Reproject)
        }
        RoadsSource::Place(_) | RoadsSource::Absent => Err(PipelineError::MissingInput {
            layer: InputLayer::Roads,
        }),
    }
}

fn analyse_distance(
    parcels: &Layer,
    roads: &Layer,
    distance_m: u32,
) -> Result<DistanceAnalysis, DistanceError> {
    let buffer = build_buffer(roads, f64::from(distance_m))?;
    let intersections = match_parcels(parcels, &buffer.layer)?;
    info!(
        "{distance_m} m buffer intersects {} parcels",
        intersections.count
    );

    let mut archives = Vec::with_capacity(2);
    let buffer_name = format!("buffer_{distance_m}m");
    if buffer.polygon().0.is_empty() {
        warn!("{buffer_name} is empty; skipping export");
    } else {
        archives.push(Archive {
            bytes: package_layer(&buffer.layer, &buffer_name)?,
            file_name: format!("{buffer_name}.zip"),
        });
    }
    let intersection_name = format!("intersection_{distance_m}m");
    if intersections.matches.is_empty() {
        warn!("{intersection_name} is empty; skipping export");
    } else {
        archives.push(Archive {
            bytes: package_layer(&intersections.matches, &intersection_name)?,
            file_name: format!("{intersection_name}.zip"),
        });
    }

    Ok(DistanceAnalysis {
        buffer,
        intersections,
        archives,
    })
}
