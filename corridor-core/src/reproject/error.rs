use thiserror::Error;

use crate::{Crs, CrsError};

/// Errors from [`crate::Reprojector`] and [`crate::Layer::to_crs`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReprojectError {
    /// One side of the transformation is not a supported CRS.
    #[error(transparent)]
    Crs(#[from] CrsError),
    /// The PROJ definition for a CRS was rejected.
    #[error("cannot build projection for {crs}: {reason}")]
    Definition {
        /// CRS whose definition failed.
        crs: Crs,
        /// Message reported by the projection engine.
        reason: String,
    },
    /// A coordinate could not be transformed.
    #[error("cannot reproject from {from} to {to}: {reason}")]
    Transform {
        /// Source CRS.
        from: Crs,
        /// Target CRS.
        to: Crs,
        /// Message reported by the projection engine.
        reason: String,
    },
    /// The transformation produced NaN or infinite coordinates.
    #[error("reprojecting from {from} to {to} produced non-finite coordinates")]
    NonFinite {
        /// Source CRS.
        from: Crs,
        /// Target CRS.
        to: Crs,
    },
}
