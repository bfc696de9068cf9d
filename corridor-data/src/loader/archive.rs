//! Zipped shapefile uploads.

use std::collections::{BTreeMap, HashMap};
use std::fs::{self, File};
use std::io::{self, Cursor};
use std::path::{Component, Path, PathBuf};

use corridor_core::{AttributeValue, Attributes, Crs, Feature};
use geo::Geometry;
use log::{debug, warn};
use shapefile::Shape;
use shapefile::dbase::{FieldValue, Record};
use tempfile::TempDir;
use zip::ZipArchive;

use super::{Decoded, LayerUpload, LoadError, ParseError};

const RESOURCE_FORK_DIR: &str = "__MACOSX";

pub(super) fn read(upload: &LayerUpload) -> Result<Decoded, LoadError> {
    let parse = |source: ParseError| LoadError::parse(&upload.name, source);

    // Dropping `scratch` removes the extracted files on every return path.
    let scratch = TempDir::new().map_err(|err| parse(err.into()))?;
    extract(&upload.bytes, scratch.path()).map_err(parse)?;

    let mut candidates = find_shapefiles(scratch.path()).map_err(|err| parse(err.into()))?;
    let shp = match candidates.len() {
        0 => return Err(LoadError::NoGeometryFound),
        1 => candidates.remove(0),
        count => return Err(LoadError::AmbiguousGeometry { count }),
    };
    debug!("reading {} from {:?}", shp.display(), upload.name);

    let features = read_features(&shp).map_err(parse)?;
    let crs = match sidecar(&shp, "prj").map_err(|err| parse(err.into()))? {
        Some(prj) => declared_crs(&prj).map_err(parse)?.transpose()?,
        None => None,
    };
    Ok(Decoded { features, crs })
}

fn extract(bytes: &[u8], destination: &Path) -> Result<(), ParseError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        let Some(relative) = entry.enclosed_name() else {
            warn!("skipping archive entry with unsafe path {:?}", entry.name());
            continue;
        };
        if is_resource_fork(&relative) {
            continue;
        }
        let target = destination.join(&relative);
        if entry.is_dir() {
            fs::create_dir_all(&target)?;
            continue;
        }
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut output = File::create(&target)?;
        io::copy(&mut entry, &mut output)?;
    }
    Ok(())
}

fn is_resource_fork(path: &Path) -> bool {
    matches!(
        path.components().next(),
        Some(Component::Normal(first)) if first == RESOURCE_FORK_DIR
    )
}

fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case(extension))
}

fn find_shapefiles(root: &Path) -> io::Result<Vec<PathBuf>> {
    let mut found = Vec::new();
    let mut pending = vec![root.to_path_buf()];
    while let Some(dir) = pending.pop() {
        for entry in fs::read_dir(&dir)? {
            let path = entry?.path();
            if path.is_dir() {
                pending.push(path);
            } else if has_extension(&path, "shp") {
                found.push(path);
            }
        }
    }
    found.sort();
    Ok(found)
}

/// Locate the sibling of `shp` with the given extension, ignoring case.
fn sidecar(shp: &Path, extension: &str) -> io::Result<Option<PathBuf>> {
    let (Some(dir), Some(stem)) = (shp.parent(), shp.file_stem()) else {
        return Ok(None);
    };
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        if path.file_stem() == Some(stem) && has_extension(&path, extension) && path.is_file() {
            return Ok(Some(path));
        }
    }
    Ok(None)
}

fn read_features(shp: &Path) -> Result<Vec<Feature>, ParseError> {
    let shapes = shapefile::read_shapes(shp)?;
    let records = match sidecar(shp, "dbf")? {
        Some(dbf) => shapefile::dbase::read(dbf)?,
        None => {
            debug!("{} has no attribute table", shp.display());
            Vec::new()
        }
    };

    let mut records = records.into_iter();
    shapes
        .into_iter()
        .map(|shape| {
            let attributes = records.next().map(attributes_from).unwrap_or_default();
            Ok(Feature {
                geometry: shape_geometry(shape)?,
                attributes,
            })
        })
        .collect()
}

fn shape_geometry(shape: Shape) -> Result<Option<Geometry<f64>>, ParseError> {
    match shape {
        Shape::NullShape => Ok(None),
        other => Geometry::<f64>::try_from(other)
            .map(Some)
            .map_err(ParseError::Shape),
    }
}

fn attributes_from(record: Record) -> Attributes {
    HashMap::<String, FieldValue>::from(record)
        .into_iter()
        .map(|(name, value)| (name, attribute_value(value)))
        .collect::<BTreeMap<_, _>>()
}

fn attribute_value(value: FieldValue) -> AttributeValue {
    match value {
        FieldValue::Character(Some(text)) => AttributeValue::Text(text),
        FieldValue::Numeric(Some(number)) | FieldValue::Double(number) => {
            AttributeValue::Number(number)
        }
        FieldValue::Float(Some(number)) => AttributeValue::Number(f64::from(number)),
        FieldValue::Integer(number) => AttributeValue::Integer(i64::from(number)),
        FieldValue::Logical(Some(flag)) => AttributeValue::Bool(flag),
        FieldValue::Character(None)
        | FieldValue::Numeric(None)
        | FieldValue::Float(None)
        | FieldValue::Logical(None) => AttributeValue::Null,
        other => AttributeValue::Text(format!("{other:?}")),
    }
}

/// Read a `.prj` sidecar. The outer result carries I/O failures, the inner
/// one an unrecognised definition; an empty file declares nothing.
fn declared_crs(prj: &Path) -> Result<Option<Result<Crs, LoadError>>, ParseError> {
    let wkt = fs::read_to_string(prj)?;
    let definition = wkt.trim();
    if definition.is_empty() {
        return Ok(None);
    }
    Ok(Some(Crs::from_wkt(definition).map_err(|source| {
        LoadError::UnrecognizedCrs {
            definition: definition.to_owned(),
            source,
        }
    })))
}
