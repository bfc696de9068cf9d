//! Unit tests for shapefile packaging.

use std::io::Cursor;

use super::*;
use crate::{LayerUpload, load_layer};
use corridor_core::test_support::{crossroads, parcel, stepped_parcels};
use corridor_core::{AttributeValue, Attributes, Crs, Feature, Layer, build_buffer};
use geo::{GeometryCollection, line_string, point};
use rstest::rstest;
use zip::ZipArchive;

fn entry_names(bytes: &[u8]) -> Vec<String> {
    let archive = ZipArchive::new(Cursor::new(bytes)).expect("valid archive");
    archive.file_names().map(str::to_owned).collect::<Vec<_>>()
}

#[rstest]
fn archive_holds_sorted_shapefile_components() {
    let bytes = package_layer(&stepped_parcels(), "intersection_50m").expect("package");
    let mut names = entry_names(&bytes);
    let listed = names.clone();
    names.sort();
    assert_eq!(listed, names, "entries are written in sorted order");
    assert_eq!(
        names,
        vec![
            "intersection_50m.dbf",
            "intersection_50m.prj",
            "intersection_50m.shp",
            "intersection_50m.shx",
        ]
    );
}

#[rstest]
fn packaging_is_reproducible() {
    let layer = stepped_parcels();
    let first = package_layer(&layer, "parcels").expect("first package");
    let second = package_layer(&layer, "parcels").expect("second package");
    assert_eq!(first, second);
}

#[rstest]
fn packaged_layers_load_back_unchanged_in_shape() {
    let layer = stepped_parcels();
    let bytes = package_layer(&layer, "parcels").expect("package");
    let loaded = load_layer(&LayerUpload::new("parcels.zip", bytes)).expect("load");

    assert_eq!(loaded.crs(), Crs::WORKING);
    assert_eq!(loaded.len(), layer.len());
    let bounds = loaded.bounds().expect("bounds");
    let original = layer.bounds().expect("bounds");
    assert!((bounds.min().x - original.min().x).abs() < 1e-6);
    assert!((bounds.max().y - original.max().y).abs() < 1e-6);
}

#[rstest]
fn line_layers_are_written_as_polylines() {
    let bytes = package_layer(&crossroads(), "roads").expect("package roads");
    let loaded = load_layer(&LayerUpload::new("roads.zip", bytes)).expect("load roads");
    assert_eq!(loaded.len(), 2);
    assert!(loaded.geometries().all(|geometry| matches!(
        geometry,
        Geometry::LineString(_) | Geometry::MultiLineString(_)
    )));
}

#[rstest]
fn layers_without_attributes_get_sequential_ids() {
    let layer = Layer::new(
        Crs::WORKING,
        vec![
            Feature::from_geometry(Geometry::Point(point!(x: 500_000.0, y: 1_400_000.0))),
            Feature::from_geometry(Geometry::Point(point!(x: 500_010.0, y: 1_400_000.0))),
        ],
    );
    let bytes = package_layer(&layer, "wells").expect("package");
    let loaded = load_layer(&LayerUpload::new("wells.zip", bytes)).expect("load");
    let ids: Vec<_> = loaded
        .features()
        .iter()
        .map(|feature| feature.attributes.get("FID").cloned())
        .collect();
    assert_eq!(
        ids,
        vec![
            Some(AttributeValue::Number(0.0)),
            Some(AttributeValue::Number(1.0)),
        ]
    );
}

#[rstest]
fn long_attribute_names_are_truncated() {
    let mut attributes = Attributes::new();
    attributes.insert("survey_number".into(), "12/3".into());
    attributes.insert("survey_numeral".into(), "XII".into());
    let layer = Layer::new(
        Crs::WORKING,
        vec![Feature::new(Geometry::Point(point!(x: 0.0, y: 0.0)), attributes)],
    );
    let bytes = package_layer(&layer, "survey").expect("package");
    let loaded = load_layer(&LayerUpload::new("survey.zip", bytes)).expect("load");
    let feature = loaded.features().first().expect("one feature");
    assert_eq!(
        feature.attributes.get("survey_n_1"),
        Some(&AttributeValue::from("XII"))
    );
    assert_eq!(
        feature.attributes.get("survey_num"),
        Some(&AttributeValue::from("12/3"))
    );
}

#[rstest]
fn mixed_geometry_is_rejected() {
    let mut features = crossroads().into_features();
    features.push(parcel("plot", 0.0, 0.0, 10.0));
    let err = package_layer(&Layer::new(Crs::WORKING, features), "mixed").expect_err("mixed");
    assert!(
        matches!(
            err,
            ExportError::MixedGeometry {
                first: "line",
                second: "polygon"
            }
        ),
        "{err:?}"
    );
}

#[rstest]
fn null_geometry_is_rejected() {
    let layer = Layer::new(
        Crs::WORKING,
        vec![
            parcel("plot", 0.0, 0.0, 10.0),
            Feature {
                geometry: None,
                attributes: Attributes::new(),
            },
        ],
    );
    let err = package_layer(&layer, "nulls").expect_err("null geometry");
    assert!(matches!(err, ExportError::MissingGeometry { index: 1 }), "{err:?}");
}

#[rstest]
fn collections_are_rejected() {
    let layer = Layer::new(
        Crs::WORKING,
        vec![Feature::from_geometry(Geometry::GeometryCollection(
            GeometryCollection(vec![Geometry::Point(point!(x: 0.0, y: 0.0))]),
        ))],
    );
    let err = package_layer(&layer, "bag").expect_err("collection");
    assert!(matches!(err, ExportError::UnsupportedGeometry { index: 0 }), "{err:?}");
}

#[rstest]
fn buffer_of_empty_roads_is_rejected_without_panicking() {
    let buffer = build_buffer(&Layer::empty(Crs::WORKING), 10.0).expect("empty buffer");
    let err = package_layer(&buffer.layer, "buffer_10m").expect_err("empty polygon");
    assert!(matches!(err, ExportError::EmptyGeometry { index: 0 }), "{err:?}");
}

#[rstest]
#[case::multipolygon(Geometry::MultiPolygon(MultiPolygon::new(Vec::new())))]
#[case::multiline(Geometry::MultiLineString(MultiLineString::new(Vec::new())))]
#[case::multipoint(Geometry::MultiPoint(MultiPoint::new(Vec::new())))]
fn empty_multi_part_geometries_are_rejected(#[case] geometry: Geometry<f64>) {
    let layer = Layer::new(Crs::WORKING, vec![Feature::from_geometry(geometry)]);
    let err = package_layer(&layer, "empty").expect_err("empty geometry");
    assert!(matches!(err, ExportError::EmptyGeometry { index: 0 }), "{err:?}");
}

#[rstest]
fn loaded_empty_multipolygon_is_rejected() {
    let layer = load_layer(&LayerUpload::new(
        "empty.geojson",
        br#"{"type":"Feature","properties":{},"geometry":{"type":"MultiPolygon","coordinates":[]}}"#
            .to_vec(),
    ))
    .expect("load empty multipolygon");
    let err = package_layer(&layer, "empty").expect_err("empty geometry");
    assert!(matches!(err, ExportError::EmptyGeometry { index: 0 }), "{err:?}");
}

#[rstest]
fn single_point_lines_are_rejected() {
    let layer = Layer::new(
        Crs::WORKING,
        vec![
            Feature::from_geometry(Geometry::LineString(line_string![
                (x: 0.0, y: 0.0),
                (x: 10.0, y: 0.0),
            ])),
            Feature::from_geometry(Geometry::LineString(line_string![(x: 5.0, y: 5.0)])),
        ],
    );
    let err = package_layer(&layer, "stub").expect_err("degenerate line");
    assert!(
        matches!(err, ExportError::DegenerateGeometry { index: 1 }),
        "{err:?}"
    );
}

#[rstest]
fn projection_sidecar_describes_layer_crs() {
    let bytes = package_layer(&stepped_parcels(), "parcels").expect("package");
    let mut archive = ZipArchive::new(Cursor::new(bytes.as_slice())).expect("archive");
    let mut prj = String::new();
    std::io::Read::read_to_string(
        &mut archive.by_name("parcels.prj").expect("prj entry"),
        &mut prj,
    )
    .expect("read prj");
    assert_eq!(Crs::from_wkt(&prj), Ok(Crs::WORKING));
}
