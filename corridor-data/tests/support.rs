//! Upload builders shared by the behaviour tests.

use corridor_core::test_support::{crossroads, stepped_parcels};
use corridor_core::{Crs, Layer};
use corridor_data::{LayerUpload, package_layer, to_display_geojson};
use serde_json::{Value, json};

/// Zipped shapefile upload of the crossroads fixture.
pub fn roads_archive() -> LayerUpload {
    LayerUpload::new(
        "roads.zip",
        package_layer(&crossroads(), "roads").unwrap_or_else(|err| {
            panic!("failed to package roads fixture: {err}");
        }),
    )
}

/// Zipped shapefile upload of the stepped parcels fixture.
pub fn parcels_archive() -> LayerUpload {
    LayerUpload::new(
        "parcels.zip",
        package_layer(&stepped_parcels(), "parcels").unwrap_or_else(|err| {
            panic!("failed to package parcels fixture: {err}");
        }),
    )
}

/// GeoJSON upload of `layer` in WGS 84 with a legacy `crs` member.
pub fn geographic_geojson(name: &str, layer: &Layer) -> LayerUpload {
    let collection = to_display_geojson(layer).unwrap_or_else(|err| {
        panic!("failed to convert fixture to WGS 84: {err}");
    });
    let mut document = serde_json::to_value(&collection).unwrap_or_else(|err| {
        panic!("failed to serialise fixture: {err}");
    });
    if let Value::Object(members) = &mut document {
        members.insert(
            "crs".to_owned(),
            json!({"type": "name", "properties": {"name": Crs::WGS84.to_string()}}),
        );
    }
    LayerUpload::new(name, document.to_string().into_bytes())
}

/// GeoJSON upload holding an empty feature collection.
pub fn empty_geojson(name: &str) -> LayerUpload {
    LayerUpload::new(
        name,
        json!({"type": "FeatureCollection", "features": []})
            .to_string()
            .into_bytes(),
    )
}
