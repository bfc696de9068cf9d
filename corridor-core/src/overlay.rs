//! Partition parcels by whether they touch a buffer polygon.

use geo::{BoundingRect, Geometry, Intersects, MultiPolygon, Rect};
use rstar::primitives::{GeomWithData, Rectangle};
use rstar::{AABB, RTree};
use thiserror::Error;

use crate::buffer::dissolve;
use crate::{Crs, Layer};

type ParcelEnvelope = GeomWithData<Rectangle<[f64; 2]>, usize>;

/// Parcels intersecting a buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayResult {
    /// Number of intersecting parcels.
    pub count: usize,
    /// Intersecting parcels in their original order, attributes intact.
    pub matches: Layer,
}

/// Errors from [`match_parcels`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OverlayError {
    /// The layers must share a CRS; the matcher never reprojects.
    #[error("parcels are in {parcels} but the buffer is in {buffer}")]
    CrsMismatch {
        /// CRS of the parcel layer.
        parcels: Crs,
        /// CRS of the buffer layer.
        buffer: Crs,
    },
}

/// Select the parcels whose geometry shares at least one point with the
/// dissolved `buffer`.
///
/// Intersection is boundary-inclusive, so parcels that merely touch the
/// buffer count. An empty parcel layer or an empty buffer yields a count of
/// zero.
///
/// # Errors
/// Returns [`OverlayError::CrsMismatch`] when the layers use different CRSs.
///
/// # Examples
/// ```
/// use corridor_core::{Crs, Feature, Layer, match_parcels};
/// use geo::{Geometry, Rect, coord};
///
/// # fn main() -> Result<(), corridor_core::OverlayError> {
/// let square = |x: f64| {
///     Feature::from_geometry(Geometry::Rect(Rect::new(
///         coord! { x: x, y: 0.0 },
///         coord! { x: x + 1.0, y: 1.0 },
///     )))
/// };
/// let buffer = Layer::new(Crs::WORKING, vec![square(0.0)]);
/// let parcels = Layer::new(Crs::WORKING, vec![square(1.0), square(5.0)]);
///
/// let result = match_parcels(&parcels, &buffer)?;
/// assert_eq!(result.count, 1);
/// # Ok(())
/// # }
/// ```
pub fn match_parcels(parcels: &Layer, buffer: &Layer) -> Result<OverlayResult, OverlayError> {
    if parcels.crs() != buffer.crs() {
        return Err(OverlayError::CrsMismatch {
            parcels: parcels.crs(),
            buffer: buffer.crs(),
        });
    }

    let zone = dissolve(buffer.geometries()).polygons;
    let hits = match zone.bounding_rect() {
        Some(extent) => intersecting_indices(parcels, &zone, extent),
        None => Vec::new(),
    };

    let features = hits
        .iter()
        .filter_map(|&index| parcels.features().get(index).cloned())
        .collect::<Vec<_>>();
    Ok(OverlayResult {
        count: features.len(),
        matches: Layer::new(parcels.crs(), features),
    })
}

fn intersecting_indices(parcels: &Layer, zone: &MultiPolygon<f64>, extent: Rect<f64>) -> Vec<usize> {
    let tree = RTree::bulk_load(parcel_envelopes(parcels));
    let query = AABB::from_corners(
        [extent.min().x, extent.min().y],
        [extent.max().x, extent.max().y],
    );
    let mut hits: Vec<usize> = tree
        .locate_in_envelope_intersecting(&query)
        .map(|entry| entry.data)
        .filter(|&index| parcel_intersects(parcels, index, zone))
        .collect();
    hits.sort_unstable();
    hits
}

fn parcel_envelopes(parcels: &Layer) -> Vec<ParcelEnvelope> {
    parcels
        .features()
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| {
            let rect = feature.geometry.as_ref()?.bounding_rect()?;
            let envelope = Rectangle::from_corners(
                [rect.min().x, rect.min().y],
                [rect.max().x, rect.max().y],
            );
            Some(GeomWithData::new(envelope, index))
        })
        .collect()
}

fn parcel_intersects(parcels: &Layer, index: usize, zone: &MultiPolygon<f64>) -> bool {
    parcels
        .features()
        .get(index)
        .and_then(|feature| feature.geometry.as_ref())
        .is_some_and(|geometry: &Geometry<f64>| geometry.intersects(zone))
}
