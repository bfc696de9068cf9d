//! GeoJSON uploads.

use std::collections::BTreeSet;

use corridor_core::{AttributeValue, Attributes, Crs, CrsError, Feature};
use geo::Geometry;
use geojson::{GeoJson, JsonObject, JsonValue};
use log::info;

use super::{Decoded, LayerUpload, LoadError, ParseError};

const CRS_MEMBER: &str = "crs";

pub(super) fn read(upload: &LayerUpload) -> Result<Decoded, LoadError> {
    let parse = |source: ParseError| LoadError::parse(&upload.name, source);

    let document =
        GeoJson::from_reader(upload.bytes.as_slice()).map_err(|err| parse(ParseError::Json(err)))?;
    let (mut features, foreign) = match document {
        GeoJson::FeatureCollection(collection) => (collection.features, collection.foreign_members),
        GeoJson::Feature(feature) => {
            let foreign = feature.foreign_members.clone();
            (vec![feature], foreign)
        }
        GeoJson::Geometry(geometry) => (vec![geojson::Feature::from(geometry)], None),
    };
    let crs = foreign.as_ref().map(declared_crs).transpose()?.flatten();

    if !features.is_empty() && features.iter().all(|feature| feature.geometry.is_none()) {
        let column = infer_geometry_column(&features).ok_or(LoadError::MissingGeometryColumn)?;
        info!("promoting property {column:?} of {:?} to geometry", upload.name);
        promote_geometry_column(&mut features, &column).map_err(parse)?;
    }

    let features = features
        .into_iter()
        .map(convert_feature)
        .collect::<Result<Vec<_>, _>>()
        .map_err(parse)?;
    Ok(Decoded { features, crs })
}

/// Read the legacy `crs` member, in either its named or its EPSG-code form.
fn declared_crs(foreign: &JsonObject) -> Result<Option<Crs>, LoadError> {
    let Some(member) = foreign.get(CRS_MEMBER).filter(|value| !value.is_null()) else {
        return Ok(None);
    };
    let properties = member.get("properties");
    let name = properties
        .and_then(|props| props.get("name"))
        .and_then(JsonValue::as_str);
    let code = properties
        .and_then(|props| props.get("code"))
        .and_then(JsonValue::as_u64);
    let (definition, resolved) = match (name, code) {
        (Some(name), _) => (name.to_owned(), Crs::from_identifier(name)),
        (None, Some(code)) => (
            format!("EPSG:{code}"),
            u32::try_from(code)
                .map_err(|_| CrsError::Unrecognized {
                    definition: code.to_string(),
                })
                .and_then(Crs::from_epsg),
        ),
        (None, None) => {
            let definition = member.to_string();
            let source = CrsError::Unrecognized {
                definition: definition.clone(),
            };
            (definition, Err(source))
        }
    };
    resolved
        .map(Some)
        .map_err(|source| LoadError::UnrecognizedCrs { definition, source })
}

/// First property name, in sorted order, whose value is a GeoJSON geometry
/// object on at least one feature.
fn infer_geometry_column(features: &[geojson::Feature]) -> Option<String> {
    let names: BTreeSet<&String> = features
        .iter()
        .filter_map(|feature| feature.properties.as_ref())
        .flat_map(JsonObject::keys)
        .collect();
    names
        .into_iter()
        .find(|name| {
            features.iter().any(|feature| {
                feature
                    .property(name.as_str())
                    .is_some_and(|value| as_geometry(value).is_some())
            })
        })
        .cloned()
}

fn as_geometry(value: &JsonValue) -> Option<geojson::Geometry> {
    if !value.is_object() {
        return None;
    }
    geojson::Geometry::from_json_value(value.clone()).ok()
}

fn promote_geometry_column(
    features: &mut [geojson::Feature],
    column: &str,
) -> Result<(), ParseError> {
    for feature in features {
        let Some(value) = feature.remove_property(column) else {
            continue;
        };
        if value.is_null() {
            continue;
        }
        feature.geometry = Some(geojson::Geometry::from_json_value(value)?);
    }
    Ok(())
}

fn convert_feature(feature: geojson::Feature) -> Result<Feature, ParseError> {
    let geometry = feature
        .geometry
        .map(|geometry| Geometry::<f64>::try_from(geometry.value))
        .transpose()?;
    let attributes = feature
        .properties
        .unwrap_or_default()
        .into_iter()
        .map(|(name, value)| (name, attribute_value(value)))
        .collect::<Attributes>();
    Ok(Feature {
        geometry,
        attributes,
    })
}

fn attribute_value(value: JsonValue) -> AttributeValue {
    match value {
        JsonValue::Null => AttributeValue::Null,
        JsonValue::Bool(flag) => AttributeValue::Bool(flag),
        JsonValue::Number(number) => number.as_i64().map_or_else(
            || AttributeValue::Number(number.as_f64().unwrap_or(f64::NAN)),
            AttributeValue::Integer,
        ),
        JsonValue::String(text) => AttributeValue::Text(text),
        nested @ (JsonValue::Array(_) | JsonValue::Object(_)) => {
            AttributeValue::Text(nested.to_string())
        }
    }
}
