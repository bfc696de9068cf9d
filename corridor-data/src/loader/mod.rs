//! Decode uploaded vector files into layers in the working CRS.
//!
//! Two upload shapes are accepted, chosen by the file extension
//! (case-insensitive): a zip archive holding exactly one shapefile, or a
//! single GeoJSON document (`.geojson` or `.json`). A layer whose source
//! declares no CRS is assumed to be in [`Crs::WORKING`]; anything else is
//! reprojected into it.

mod archive;
mod document;
mod error;

use std::path::Path;

use corridor_core::{Crs, Feature, Layer};
use log::{debug, info};

pub use error::{LoadError, ParseError};

/// Raw bytes of an uploaded file plus its declared name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LayerUpload {
    /// File name as supplied by the user; only its extension is inspected.
    pub name: String,
    /// File contents.
    pub bytes: Vec<u8>,
}

impl LayerUpload {
    /// Wrap `bytes` under the declared `name`.
    ///
    /// # Examples
    /// ```
    /// use corridor_data::LayerUpload;
    ///
    /// let upload = LayerUpload::new("roads.geojson", br#"{"type":"FeatureCollection","features":[]}"#.to_vec());
    /// assert_eq!(upload.name, "roads.geojson");
    /// ```
    #[must_use]
    pub fn new(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            bytes,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    ZippedShapefile,
    GeoJson,
}

impl Format {
    fn detect(name: &str) -> Option<Self> {
        let extension = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
        match extension.as_str() {
            "zip" => Some(Self::ZippedShapefile),
            "geojson" | "json" => Some(Self::GeoJson),
            _ => None,
        }
    }
}

/// Features decoded from a source, with the CRS it declares, if any.
struct Decoded {
    features: Vec<Feature>,
    crs: Option<Crs>,
}

/// Decode `upload` into a layer expressed in [`Crs::WORKING`].
///
/// Scratch storage used for archive extraction is removed before this
/// function returns, on success and on every error path.
///
/// # Errors
/// - [`LoadError::UnsupportedFormat`] for extensions other than `.zip`,
///   `.geojson` and `.json`.
/// - [`LoadError::NoGeometryFound`] / [`LoadError::AmbiguousGeometry`] when
///   an archive holds zero or several `.shp` files.
/// - [`LoadError::Parse`] for corrupt archives, shapefiles or JSON.
/// - [`LoadError::MissingGeometryColumn`] when a GeoJSON document has
///   features but no geometry anywhere.
/// - [`LoadError::UnrecognizedCrs`] / [`LoadError::Reprojection`] when the
///   declared CRS cannot be converted into the working CRS.
///
/// # Examples
/// ```
/// use corridor_core::Crs;
/// use corridor_data::{LayerUpload, load_layer};
///
/// # fn main() -> Result<(), corridor_data::LoadError> {
/// let body = br#"{"type":"FeatureCollection","features":[
///     {"type":"Feature","properties":{"id":1},
///      "geometry":{"type":"Point","coordinates":[500000.0,1400000.0]}}
/// ]}"#;
/// let layer = load_layer(&LayerUpload::new("plots.geojson", body.to_vec()))?;
/// assert_eq!(layer.crs(), Crs::WORKING);
/// assert_eq!(layer.len(), 1);
/// # Ok(())
/// # }
/// ```
pub fn load_layer(upload: &LayerUpload) -> Result<Layer, LoadError> {
    let format = Format::detect(&upload.name).ok_or_else(|| LoadError::UnsupportedFormat {
        name: upload.name.clone(),
    })?;
    let decoded = match format {
        Format::ZippedShapefile => archive::read(upload)?,
        Format::GeoJson => document::read(upload)?,
    };

    let source_crs = decoded.crs.unwrap_or_else(|| {
        debug!(
            "{:?} declares no CRS; assuming {}",
            upload.name,
            Crs::WORKING
        );
        Crs::WORKING
    });
    let layer = Layer::new(source_crs, decoded.features)
        .to_crs(Crs::WORKING)
        .map_err(LoadError::Reprojection)?;
    info!(
        "loaded {} features from {:?} ({source_crs})",
        layer.len(),
        upload.name
    );
    Ok(layer)
}

impl LoadError {
    fn parse(name: &str, source: impl Into<ParseError>) -> Self {
        Self::Parse {
            name: name.to_owned(),
            source: source.into(),
        }
    }
}
