//! Package layers as zipped ESRI shapefiles.
//!
//! The shapefile components are staged in a scratch directory, then zipped
//! in memory. Archives are reproducible: entries are sorted by name and
//! carry a fixed timestamp.

mod error;
mod schema;

use std::fs;
use std::io::{Cursor, Write};
use std::path::{Path, PathBuf};

use corridor_core::Layer;
use geo::{Geometry, LineString, MultiLineString, MultiPoint, MultiPolygon};
use log::debug;
use tempfile::TempDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, DateTime, ZipWriter};

pub use error::ExportError;

/// Family of geometry a shapefile can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Family {
    Point,
    Line,
    Polygon,
}

impl Family {
    const fn label(self) -> &'static str {
        match self {
            Self::Point => "point",
            Self::Line => "line",
            Self::Polygon => "polygon",
        }
    }

    fn of(index: usize, geometry: Option<&Geometry<f64>>) -> Result<Self, ExportError> {
        match geometry {
            None => Err(ExportError::MissingGeometry { index }),
            Some(Geometry::Point(_) | Geometry::MultiPoint(_)) => Ok(Self::Point),
            Some(Geometry::Line(_) | Geometry::LineString(_) | Geometry::MultiLineString(_)) => {
                Ok(Self::Line)
            }
            Some(
                Geometry::Polygon(_)
                | Geometry::MultiPolygon(_)
                | Geometry::Rect(_)
                | Geometry::Triangle(_),
            ) => Ok(Self::Polygon),
            Some(Geometry::GeometryCollection(_)) => {
                Err(ExportError::UnsupportedGeometry { index })
            }
        }
    }
}

/// Serialise `layer` as `<prefix>.shp/.shx/.dbf/.prj` and return the zip
/// archive bytes.
///
/// Attribute names are cut to ten characters and de-duplicated; a layer
/// without attributes gets a sequential `FID` column. Empty layers are
/// written as-is.
///
/// # Errors
/// - [`ExportError::MissingGeometry`] for features without geometry.
/// - [`ExportError::MixedGeometry`] when points, lines and polygons are mixed.
/// - [`ExportError::UnsupportedGeometry`] for geometry collections.
/// - [`ExportError::EmptyGeometry`] for multi-part geometries without parts.
/// - [`ExportError::DegenerateGeometry`] for line parts shorter than two
///   points.
/// - [`ExportError::Shapefile`], [`ExportError::Io`] or
///   [`ExportError::Archive`] when writing fails.
///
/// # Examples
/// ```
/// use corridor_core::{Crs, Feature, Layer};
/// use corridor_data::package_layer;
/// use geo::{Geometry, point};
///
/// # fn main() -> Result<(), corridor_data::ExportError> {
/// let layer = Layer::new(
///     Crs::WORKING,
///     vec![Feature::from_geometry(Geometry::Point(point!(x: 500_000.0, y: 1_400_000.0)))],
/// );
/// let bytes = package_layer(&layer, "wells")?;
/// assert!(bytes.starts_with(b"PK"));
/// # Ok(())
/// # }
/// ```
pub fn package_layer(layer: &Layer, prefix: &str) -> Result<Vec<u8>, ExportError> {
    let family = layer_family(layer)?;
    let scratch = TempDir::new()?;
    let shp_path = scratch.path().join(format!("{prefix}.shp"));

    write_shapefile(layer, family, &shp_path)?;
    fs::write(
        scratch.path().join(format!("{prefix}.prj")),
        layer.crs().to_wkt()?,
    )?;

    let bytes = zip_directory(scratch.path())?;
    debug!(
        "packaged {} {} features as {prefix} ({} bytes)",
        layer.len(),
        family.label(),
        bytes.len()
    );
    Ok(bytes)
}

fn layer_family(layer: &Layer) -> Result<Family, ExportError> {
    let mut family = None;
    for (index, feature) in layer.features().iter().enumerate() {
        let current = Family::of(index, feature.geometry.as_ref())?;
        if let Some(geometry) = &feature.geometry {
            check_parts(index, current, geometry)?;
        }
        match family {
            None => family = Some(current),
            Some(first) if first != current => {
                return Err(ExportError::MixedGeometry {
                    first: first.label(),
                    second: current.label(),
                });
            }
            Some(_) => {}
        }
    }
    Ok(family.unwrap_or(Family::Polygon))
}

/// Reject geometries the shapefile writer cannot encode: shapes need at
/// least one part, and polylines need two points per part.
fn check_parts(index: usize, family: Family, geometry: &Geometry<f64>) -> Result<(), ExportError> {
    let empty = ExportError::EmptyGeometry { index };
    match family {
        Family::Point => {
            if as_multi_point(geometry).0.is_empty() {
                return Err(empty);
            }
        }
        Family::Line => {
            let lines = as_multi_line(geometry);
            if lines.0.is_empty() {
                return Err(empty);
            }
            if lines.iter().any(|line| line.0.len() < 2) {
                return Err(ExportError::DegenerateGeometry { index });
            }
        }
        Family::Polygon => {
            let polygons = as_multi_polygon(geometry);
            let hollow = polygons
                .iter()
                .any(|polygon| polygon.exterior().0.is_empty());
            if polygons.0.is_empty() || hollow {
                return Err(empty);
            }
        }
    }
    Ok(())
}

fn write_shapefile(layer: &Layer, family: Family, path: &Path) -> Result<(), ExportError> {
    let columns = schema::derive_columns(layer);
    let mut writer = shapefile::Writer::from_path(path, schema::table_builder(&columns)?)?;
    let multipoint = layer
        .geometries()
        .any(|geometry| matches!(geometry, Geometry::MultiPoint(_)));

    for (index, geometry) in layer
        .features()
        .iter()
        .enumerate()
        .filter_map(|(index, feature)| Some((index, feature.geometry.as_ref()?)))
    {
        let record = schema::record(&columns, index, layer);
        match family {
            Family::Polygon => {
                let shape = shapefile::Polygon::from(as_multi_polygon(geometry));
                writer.write_shape_and_record(&shape, &record)?;
            }
            Family::Line => {
                let shape = shapefile::Polyline::from(as_multi_line(geometry));
                writer.write_shape_and_record(&shape, &record)?;
            }
            Family::Point if multipoint => {
                let shape = shapefile::Multipoint::from(as_multi_point(geometry));
                writer.write_shape_and_record(&shape, &record)?;
            }
            Family::Point => {
                if let Geometry::Point(point) = geometry {
                    let shape = shapefile::Point::from(*point);
                    writer.write_shape_and_record(&shape, &record)?;
                }
            }
        }
    }
    // Dropping the writer flushes the headers of every component file.
    drop(writer);
    Ok(())
}

fn as_multi_polygon(geometry: &Geometry<f64>) -> MultiPolygon<f64> {
    match geometry {
        Geometry::Polygon(polygon) => MultiPolygon::new(vec![polygon.clone()]),
        Geometry::MultiPolygon(multi) => multi.clone(),
        Geometry::Rect(rect) => MultiPolygon::new(vec![rect.to_polygon()]),
        Geometry::Triangle(triangle) => MultiPolygon::new(vec![triangle.to_polygon()]),
        _ => MultiPolygon::new(Vec::new()),
    }
}

fn as_multi_line(geometry: &Geometry<f64>) -> MultiLineString<f64> {
    match geometry {
        Geometry::Line(line) => MultiLineString::new(vec![LineString::from(*line)]),
        Geometry::LineString(line) => MultiLineString::new(vec![line.clone()]),
        Geometry::MultiLineString(multi) => multi.clone(),
        _ => MultiLineString::new(Vec::new()),
    }
}

fn as_multi_point(geometry: &Geometry<f64>) -> MultiPoint<f64> {
    match geometry {
        Geometry::Point(point) => MultiPoint::new(vec![*point]),
        Geometry::MultiPoint(multi) => multi.clone(),
        _ => MultiPoint::new(Vec::new()),
    }
}

fn zip_directory(dir: &Path) -> Result<Vec<u8>, ExportError> {
    let mut files: Vec<PathBuf> = fs::read_dir(dir)?
        .map(|entry| entry.map(|item| item.path()))
        .collect::<Result<_, _>>()?;
    files.sort();

    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .last_modified_time(DateTime::default());
    let mut archive = ZipWriter::new(Cursor::new(Vec::new()));
    for path in files {
        let Some(name) = path.file_name().and_then(|name| name.to_str()) else {
            continue;
        };
        archive.start_file(name, options)?;
        archive.write_all(&fs::read(&path)?)?;
    }
    Ok(archive.finish()?.into_inner())
}

#[cfg(test)]
mod tests;
