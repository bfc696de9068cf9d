//! Select a local metric frame for distance-accurate buffering.
//!
//! The frame is the WGS 84 UTM zone containing the centroid of the layer's
//! dissolved geometry. Whenever that zone cannot be used, the layer is
//! projected into spherical Web Mercator instead so buffering can still
//! proceed; [`MetricFrame::fallback`] records which path was taken.

use geo::{Centroid, Coord};
use log::{debug, warn};

use crate::buffer::dissolve;
use crate::{Crs, CrsError, Layer, ReprojectError, Reprojector};

/// A layer expressed in a metric CRS, plus the CRS actually used.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricFrame {
    /// The reprojected layer.
    pub layer: Layer,
    /// The metric CRS `layer` is expressed in.
    pub crs: Crs,
    /// `true` when the UTM zone could not be used and Web Mercator was
    /// substituted.
    pub fallback: bool,
}

/// Derive the UTM CRS whose zone contains `lon`/`lat` (degrees).
///
/// The zone is `floor((lon + 180) / 6) + 1`; latitudes `>= 0` select the
/// northern variant (`326zz`), others the southern one (`327zz`).
///
/// # Errors
/// Returns [`CrsError::InvalidUtmZone`] when the longitude maps outside
/// zones `1..=60`, including non-finite input.
///
/// # Examples
/// ```
/// use corridor_core::utm_crs_for;
///
/// # fn main() -> Result<(), corridor_core::CrsError> {
/// let crs = utm_crs_for(-0.1276, 51.5072)?;
/// assert_eq!(crs.epsg(), 32630);
/// # Ok(())
/// # }
/// ```
#[expect(
    clippy::float_arithmetic,
    clippy::cast_possible_truncation,
    reason = "zone numbers are derived from floored longitude bands"
)]
pub fn utm_crs_for(lon: f64, lat: f64) -> Result<Crs, CrsError> {
    if !lon.is_finite() || !lat.is_finite() {
        return Err(CrsError::InvalidUtmZone { zone: 0 });
    }
    let zone = ((lon + 180.0) / 6.0).floor() as i64 + 1;
    Crs::utm(zone, lat >= 0.0)
}

/// Reproject `layer` into the UTM zone containing its centroid.
///
/// The centroid is taken from the dissolved geometry in the layer's own CRS,
/// converted to longitude/latitude, and used to pick the zone with
/// [`utm_crs_for`]. If any step fails (an empty layer has no centroid) the
/// layer is projected into [`Crs::WEB_MERCATOR`] instead.
///
/// # Errors
/// Returns [`ReprojectError`] only when the Web Mercator fallback itself
/// fails.
pub fn project_to_metric(layer: &Layer) -> Result<MetricFrame, ReprojectError> {
    match project_to_utm(layer) {
        Ok((projected, crs)) => {
            debug!("projected {} features into {crs}", projected.len());
            Ok(MetricFrame {
                layer: projected,
                crs,
                fallback: false,
            })
        }
        Err(reason) => {
            warn!(
                "UTM projection unavailable ({reason}); falling back to {}",
                Crs::WEB_MERCATOR
            );
            Ok(MetricFrame {
                layer: layer.to_crs(Crs::WEB_MERCATOR)?,
                crs: Crs::WEB_MERCATOR,
                fallback: true,
            })
        }
    }
}

fn project_to_utm(layer: &Layer) -> Result<(Layer, Crs), UtmUnavailable> {
    let centroid = dissolve(layer.geometries())
        .to_geometry_collection()
        .centroid()
        .ok_or(UtmUnavailable::NoCentroid)?;
    let lon_lat = Reprojector::new(layer.crs(), Crs::WGS84)?.coord(Coord::from(centroid))?;
    let crs = utm_crs_for(lon_lat.x, lon_lat.y).map_err(ReprojectError::from)?;
    Ok((layer.to_crs(crs)?, crs))
}

#[derive(Debug, thiserror::Error)]
enum UtmUnavailable {
    #[error("layer has no centroid")]
    NoCentroid,
    #[error(transparent)]
    Reproject(#[from] ReprojectError),
}
