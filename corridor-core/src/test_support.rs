//! Layer builders shared by unit and behaviour tests.
//!
//! Coordinates are expressed in [`Crs::WORKING`] around a point near
//! Bengaluru so buffers stay inside UTM zone 43.

use geo::{Coord, Geometry, LineString, Rect};

use crate::{AttributeValue, Attributes, Crs, Feature, Layer};

/// Easting/northing used as the origin of test layouts.
pub const ORIGIN: Coord<f64> = Coord {
    x: 500_000.0,
    y: 1_400_000.0,
};

/// Build a road feature from `(dx, dy)` offsets relative to [`ORIGIN`].
#[expect(
    clippy::float_arithmetic,
    reason = "offsets are added to a fixed origin"
)]
#[must_use]
pub fn road(offsets: &[(f64, f64)]) -> Feature {
    let line: LineString<f64> = offsets
        .iter()
        .map(|&(dx, dy)| Coord {
            x: ORIGIN.x + dx,
            y: ORIGIN.y + dy,
        })
        .collect();
    Feature::from_geometry(Geometry::LineString(line))
}

/// Build a square parcel whose lower-left corner is offset from
/// [`ORIGIN`], labelled with a `name` attribute.
#[expect(
    clippy::float_arithmetic,
    reason = "corners are offsets from a fixed origin"
)]
#[must_use]
pub fn parcel(name: &str, dx: f64, dy: f64, size: f64) -> Feature {
    let min = Coord {
        x: ORIGIN.x + dx,
        y: ORIGIN.y + dy,
    };
    let max = Coord {
        x: min.x + size,
        y: min.y + size,
    };
    let mut attributes = Attributes::new();
    attributes.insert("name".to_owned(), AttributeValue::from(name));
    Feature::new(Geometry::Polygon(Rect::new(min, max).to_polygon()), attributes)
}

/// Two 2 km roads crossing at [`ORIGIN`], one east-west and one north-south.
#[must_use]
pub fn crossroads() -> Layer {
    Layer::new(
        Crs::WORKING,
        vec![
            road(&[(-1_000.0, 0.0), (1_000.0, 0.0)]),
            road(&[(0.0, -1_000.0), (0.0, 1_000.0)]),
        ],
    )
}

/// Three 20 m parcels placed 5 m, 30 m and 80 m north of the east-west road.
///
/// Against [`crossroads`] they are intersected by 10 m, 50 m and 100 m
/// buffers respectively, giving counts of 1, 2 and 3.
#[must_use]
pub fn stepped_parcels() -> Layer {
    Layer::new(
        Crs::WORKING,
        vec![
            parcel("near", 300.0, 5.0, 20.0),
            parcel("middle", 300.0, 30.0, 20.0),
            parcel("far", 300.0, 80.0, 20.0),
        ],
    )
}

/// Read the `name` attribute of each feature in order.
#[must_use]
pub fn names(layer: &Layer) -> Vec<String> {
    layer
        .features()
        .iter()
        .filter_map(|feature| match feature.attributes.get("name") {
            Some(AttributeValue::Text(name)) => Some(name.clone()),
            _ => None,
        })
        .collect()
}
