//! Reproject geometries and layers between supported CRSs.
//!
//! Transformations are delegated to `proj4rs`, a pure-Rust port of PROJ.4,
//! so no system projection library is required. Geographic coordinates are
//! kept in degrees everywhere outside this module.

mod error;

use std::fmt;

use geo::{Coord, Geometry, MapCoords};
use proj4rs::Proj;

pub use error::ReprojectError;

use crate::{Crs, Layer};

/// A prepared transformation between two coordinate reference systems.
///
/// # Examples
/// ```
/// use corridor_core::{Crs, Reprojector};
/// use geo::Coord;
///
/// # fn main() -> Result<(), corridor_core::ReprojectError> {
/// let reprojector = Reprojector::new(Crs::WGS84, Crs::WORKING)?;
/// let projected = reprojector.coord(Coord { x: 75.0, y: 0.0 })?;
/// assert!((projected.x - 500_000.0).abs() < 1e-6);
/// # Ok(())
/// # }
/// ```
pub struct Reprojector {
    from: Crs,
    to: Crs,
    source_proj: Proj,
    target_proj: Proj,
}

impl fmt::Debug for Reprojector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Reprojector")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

impl Reprojector {
    /// Prepare a transformation from `from` to `to`.
    ///
    /// # Errors
    /// Returns [`ReprojectError::Crs`] for unsupported codes and
    /// [`ReprojectError::Definition`] when the projection engine rejects a
    /// definition.
    pub fn new(from: Crs, to: Crs) -> Result<Self, ReprojectError> {
        Ok(Self {
            from,
            to,
            source_proj: build_proj(from)?,
            target_proj: build_proj(to)?,
        })
    }

    /// Source CRS.
    #[must_use]
    pub const fn from_crs(&self) -> Crs {
        self.from
    }

    /// Target CRS.
    #[must_use]
    pub const fn to_crs(&self) -> Crs {
        self.to
    }

    /// Transform a single coordinate.
    ///
    /// # Errors
    /// Returns [`ReprojectError::Transform`] when the engine fails and
    /// [`ReprojectError::NonFinite`] when it yields NaN or infinity.
    #[expect(
        clippy::float_arithmetic,
        reason = "angle conversion between degrees and radians"
    )]
    pub fn coord(&self, coord: Coord<f64>) -> Result<Coord<f64>, ReprojectError> {
        if self.from == self.to {
            return Ok(coord);
        }
        let mut point = if self.from.is_geographic() {
            (coord.x.to_radians(), coord.y.to_radians(), 0.0_f64)
        } else {
            (coord.x, coord.y, 0.0_f64)
        };
        proj4rs::transform::transform(&self.source_proj, &self.target_proj, &mut point).map_err(
            |err| ReprojectError::Transform {
                from: self.from,
                to: self.to,
                reason: err.to_string(),
            },
        )?;
        let (x, y, _) = point;
        let out = if self.to.is_geographic() {
            Coord {
                x: x.to_degrees(),
                y: y.to_degrees(),
            }
        } else {
            Coord { x, y }
        };
        if out.x.is_finite() && out.y.is_finite() {
            Ok(out)
        } else {
            Err(ReprojectError::NonFinite {
                from: self.from,
                to: self.to,
            })
        }
    }

    /// Transform every coordinate of `geometry`.
    ///
    /// # Errors
    /// Propagates the first coordinate failure; see [`Reprojector::coord`].
    pub fn geometry(&self, geometry: &Geometry<f64>) -> Result<Geometry<f64>, ReprojectError> {
        geometry.try_map_coords(|coord| self.coord(coord))
    }

    /// Transform every feature of `layer`, returning a new layer in the target
    /// CRS. Attributes and feature order are preserved.
    ///
    /// # Errors
    /// Propagates the first geometry failure.
    pub fn layer(&self, layer: &Layer) -> Result<Layer, ReprojectError> {
        let features = layer
            .features()
            .iter()
            .map(|feature| {
                let geometry = feature
                    .geometry
                    .as_ref()
                    .map(|geometry| self.geometry(geometry))
                    .transpose()?;
                Ok(feature.with_geometry(geometry))
            })
            .collect::<Result<Vec<_>, ReprojectError>>()?;
        Ok(Layer::new(self.to, features))
    }
}

impl Layer {
    /// Return a copy of this layer reprojected into `target`.
    ///
    /// A layer already in `target` is cloned unchanged.
    ///
    /// # Errors
    /// Returns [`ReprojectError`] when the transformation cannot be built or
    /// any coordinate fails to transform.
    ///
    /// # Examples
    /// ```
    /// use corridor_core::{Crs, Feature, Layer};
    /// use geo::{Geometry, point};
    ///
    /// # fn main() -> Result<(), corridor_core::ReprojectError> {
    /// let layer = Layer::new(
    ///     Crs::WORKING,
    ///     vec![Feature::from_geometry(Geometry::Point(point!(x: 500_000.0, y: 0.0)))],
    /// );
    /// let geographic = layer.to_crs(Crs::WGS84)?;
    /// assert_eq!(geographic.crs(), Crs::WGS84);
    /// assert_eq!(geographic.len(), 1);
    /// # Ok(())
    /// # }
    /// ```
    pub fn to_crs(&self, target: Crs) -> Result<Self, ReprojectError> {
        if self.crs() == target {
            return Ok(self.clone());
        }
        Reprojector::new(self.crs(), target)?.layer(self)
    }
}

fn build_proj(crs: Crs) -> Result<Proj, ReprojectError> {
    let definition = crs.proj_definition()?;
    Proj::from_proj_string(&definition).map_err(|err| ReprojectError::Definition {
        crs,
        reason: err.to_string(),
    })
}
