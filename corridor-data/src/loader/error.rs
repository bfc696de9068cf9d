use corridor_core::{CrsError, ReprojectError};
use thiserror::Error;

/// Errors from [`crate::load_layer`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The file name does not end in `.zip`, `.geojson` or `.json`.
    #[error("unsupported file type for {name:?}; upload a zipped shapefile or GeoJSON")]
    UnsupportedFormat {
        /// Declared file name.
        name: String,
    },
    /// The archive holds no `.shp` file.
    #[error("no .shp file found in the uploaded archive")]
    NoGeometryFound,
    /// The archive holds more than one `.shp` file.
    #[error("the uploaded archive holds {count} .shp files; expected exactly one")]
    AmbiguousGeometry {
        /// Number of `.shp` files found.
        count: usize,
    },
    /// The input could not be decoded.
    #[error("cannot read {name:?}: {source}")]
    Parse {
        /// Declared file name.
        name: String,
        /// Underlying decoder failure.
        #[source]
        source: ParseError,
    },
    /// No feature has a geometry and no property can stand in for one.
    #[error("the layer has no geometry column")]
    MissingGeometryColumn,
    /// The declared CRS cannot be identified or has no known definition.
    #[error("cannot use the declared coordinate reference system: {source}")]
    UnrecognizedCrs {
        /// CRS text as found in the source.
        definition: String,
        /// Why it was rejected.
        #[source]
        source: CrsError,
    },
    /// Converting the layer into the working CRS failed.
    #[error("cannot reproject layer into the working CRS: {0}")]
    Reprojection(#[source] ReprojectError),
}

/// Decoder failures wrapped by [`LoadError::Parse`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// The zip container is corrupt.
    #[error(transparent)]
    Archive(#[from] zip::result::ZipError),
    /// Scratch storage or an extracted file could not be accessed.
    #[error(transparent)]
    Io(#[from] std::io::Error),
    /// The shapefile geometry could not be read.
    #[error(transparent)]
    Shapefile(#[from] shapefile::Error),
    /// The `.dbf` attribute table could not be read.
    #[error(transparent)]
    Table(#[from] shapefile::dbase::Error),
    /// A shape has no geometry equivalent.
    #[error("unsupported shape: {0}")]
    Shape(&'static str),
    /// The document is not well-formed JSON, or its structure is not
    /// GeoJSON.
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    /// A GeoJSON object could not be converted into a geometry.
    #[error(transparent)]
    GeoJson(#[from] geojson::Error),
}
