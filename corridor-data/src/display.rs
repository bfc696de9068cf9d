//! Map payloads in WGS 84 for display clients.

use corridor_core::{AttributeValue, Crs, Layer, ReprojectError};
use geojson::{FeatureCollection, JsonObject, JsonValue};

/// Map centre used when neither layer has any extent, as `(lat, lon)`.
pub const DEFAULT_CENTER: (f64, f64) = (20.5937, 78.9629);

/// Render `layer` as a GeoJSON feature collection in EPSG:4326.
///
/// Attributes become feature properties; features without geometry keep a
/// `null` geometry.
///
/// # Errors
/// Returns [`ReprojectError`] when the layer cannot be converted to WGS 84.
///
/// # Examples
/// ```
/// use corridor_core::{Crs, Feature, Layer};
/// use corridor_data::to_display_geojson;
/// use geo::{Geometry, point};
///
/// # fn main() -> Result<(), corridor_core::ReprojectError> {
/// let layer = Layer::new(
///     Crs::WORKING,
///     vec![Feature::from_geometry(Geometry::Point(point!(x: 500_000.0, y: 0.0)))],
/// );
/// let collection = to_display_geojson(&layer)?;
/// assert_eq!(collection.features.len(), 1);
/// # Ok(())
/// # }
/// ```
pub fn to_display_geojson(layer: &Layer) -> Result<FeatureCollection, ReprojectError> {
    let geographic = layer.to_crs(Crs::WGS84)?;
    let features = geographic
        .features()
        .iter()
        .map(|feature| geojson::Feature {
            bbox: None,
            geometry: feature
                .geometry
                .as_ref()
                .map(|geometry| geojson::Geometry::new(geojson::Value::from(geometry))),
            id: None,
            properties: Some(properties(&feature.attributes)),
            foreign_members: None,
        })
        .collect();
    Ok(FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    })
}

fn properties(attributes: &corridor_core::Attributes) -> JsonObject {
    attributes
        .iter()
        .map(|(name, value)| (name.clone(), json_value(value)))
        .collect()
}

fn json_value(value: &AttributeValue) -> JsonValue {
    match value {
        AttributeValue::Null => JsonValue::Null,
        AttributeValue::Bool(flag) => JsonValue::Bool(*flag),
        AttributeValue::Integer(number) => JsonValue::from(*number),
        AttributeValue::Number(number) => serde_json::Number::from_f64(*number)
            .map_or(JsonValue::Null, JsonValue::Number),
        AttributeValue::Text(text) => JsonValue::String(text.clone()),
    }
}

/// Centre for a map showing `parcels` and `roads`, as `(lat, lon)`.
///
/// Uses the WGS 84 bounds of the parcels, or of the roads when the parcels
/// have no extent, and [`DEFAULT_CENTER`] when neither does.
///
/// # Errors
/// Returns [`ReprojectError`] when a layer cannot be converted to WGS 84.
#[expect(
    clippy::float_arithmetic,
    reason = "midpoint of a bounding rectangle"
)]
pub fn display_center(parcels: &Layer, roads: &Layer) -> Result<(f64, f64), ReprojectError> {
    for layer in [parcels, roads] {
        if layer.bounds().is_none() {
            continue;
        }
        if let Some(bounds) = layer.to_crs(Crs::WGS84)?.bounds() {
            let min = bounds.min();
            let max = bounds.max();
            return Ok(((min.y + max.y) / 2.0, (min.x + max.x) / 2.0));
        }
    }
    Ok(DEFAULT_CENTER)
}
