use corridor_core::CrsError;
use thiserror::Error;

/// Errors from [`crate::package_layer`].
#[derive(Debug, Error)]
pub enum ExportError {
    /// Features mix points, lines and polygons, which one shapefile cannot hold.
    #[error("cannot export a layer mixing {first} and {second} geometries")]
    MixedGeometry {
        /// Kind of the first geometry.
        first: &'static str,
        /// Conflicting kind found later.
        second: &'static str,
    },
    /// A feature has no geometry.
    #[error("feature {index} has no geometry")]
    MissingGeometry {
        /// Position of the feature in the layer.
        index: usize,
    },
    /// A multi-part geometry has no parts, or a polygon has no exterior ring.
    #[error("feature {index} has an empty geometry")]
    EmptyGeometry {
        /// Position of the feature in the layer.
        index: usize,
    },
    /// A line part has fewer than two points.
    #[error("feature {index} has a line part with fewer than two points")]
    DegenerateGeometry {
        /// Position of the feature in the layer.
        index: usize,
    },
    /// A geometry collection cannot be written as a single shape.
    #[error("feature {index} holds a geometry collection")]
    UnsupportedGeometry {
        /// Position of the feature in the layer.
        index: usize,
    },
    /// The layer CRS has no WKT rendering.
    #[error("cannot describe the layer CRS: {0}")]
    Crs(#[from] CrsError),
    /// The attribute schema could not be declared.
    #[error("invalid attribute field {name:?}: {reason}")]
    Field {
        /// Field name after truncation.
        name: String,
        /// Message reported by the table writer.
        reason: &'static str,
    },
    /// Writing the shapefile components failed.
    #[error("cannot write shapefile: {0}")]
    Shapefile(#[from] shapefile::Error),
    /// Scratch storage could not be used.
    #[error("cannot stage shapefile components: {0}")]
    Io(#[from] std::io::Error),
    /// Building the zip archive failed.
    #[error("cannot build archive: {0}")]
    Archive(#[from] zip::result::ZipError),
}
