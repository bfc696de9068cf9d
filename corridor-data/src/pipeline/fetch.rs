//! Road-network fetch seam for place-name requests.

use corridor_core::Layer;
use thiserror::Error;

/// Errors from [`RoadNetworkFetcher::fetch_roads`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RoadFetchError {
    /// The place name did not resolve to any road network.
    #[error("no road network found for {place:?}")]
    NotFound {
        /// Requested place name.
        place: String,
    },
    /// The backing service could not be used.
    #[error("road network service unavailable: {reason}")]
    Unavailable {
        /// Description of the failure.
        reason: String,
    },
}

/// Resolve a place name into a road line layer.
///
/// Implementations should return the layer in
/// [`Crs::WORKING`](corridor_core::Crs::WORKING); other CRSs are reprojected
/// by the pipeline.
///
/// # Examples
///
/// ```rust
/// use corridor_core::{Crs, Layer};
/// use corridor_data::{RoadFetchError, RoadNetworkFetcher};
///
/// struct EmptyTown;
///
/// impl RoadNetworkFetcher for EmptyTown {
///     fn fetch_roads(&self, place: &str) -> Result<Layer, RoadFetchError> {
///         if place == "Nowhere" {
///             return Err(RoadFetchError::NotFound { place: place.to_owned() });
///         }
///         Ok(Layer::empty(Crs::WORKING))
///     }
/// }
///
/// assert!(EmptyTown.fetch_roads("Mysuru")?.is_empty());
/// # Ok::<(), RoadFetchError>(())
/// ```
pub trait RoadNetworkFetcher {
    /// Fetch the road network for `place`; `place` is never blank.
    fn fetch_roads(&self, place: &str) -> Result<Layer, RoadFetchError>;
}

/// Fetcher for builds without network access; every lookup is unavailable.
#[derive(Debug, Default, Clone, Copy)]
pub struct OfflineFetcher;

impl RoadNetworkFetcher for OfflineFetcher {
    fn fetch_roads(&self, _place: &str) -> Result<Layer, RoadFetchError> {
        Err(RoadFetchError::Unavailable {
            reason: "place lookups are not available offline".to_owned(),
        })
    }
}
