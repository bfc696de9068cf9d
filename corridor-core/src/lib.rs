//! Geometry domain for the corridor parcel analysis.
//!
//! Responsibilities:
//! - Model vector layers, their features and coordinate reference systems.
//! - Reproject layers between the supported CRSs.
//! - Dissolve and buffer road networks in a local metric frame.
//! - Match parcels against a buffer polygon.
//!
//! Boundaries:
//! - No file formats or archives (live in `corridor-data`).
//! - No filesystem access.
//!
//! Invariants:
//! - Every [`Layer`] carries exactly one CRS shared by all its features.
//! - Buffers are always returned in [`Crs::WORKING`].

#![forbid(unsafe_code)]

pub mod buffer;
pub mod crs;
pub mod layer;
pub mod overlay;
pub mod reproject;
#[cfg(any(test, feature = "test-support"))]
pub mod test_support;
pub mod utm;

pub use buffer::{BufferError, BufferResult, DISTANCE_ATTRIBUTE, Dissolved, build_buffer, dissolve};
pub use crs::{Crs, CrsError, CrsKind};
pub use layer::{AttributeValue, Attributes, Feature, Layer};
pub use overlay::{OverlayError, OverlayResult, match_parcels};
pub use reproject::{ReprojectError, Reprojector};
pub use utm::{MetricFrame, project_to_metric, utm_crs_for};
