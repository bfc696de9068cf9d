//! Dissolve road geometry and expand it into a buffer polygon.

use geo::{
    BooleanOps, Buffer, Geometry, GeometryCollection, LineString, MultiLineString, MultiPoint,
    MultiPolygon, Polygon,
};
use log::debug;
use thiserror::Error;

use crate::utm::project_to_metric;
use crate::{AttributeValue, Attributes, Crs, Feature, Layer, ReprojectError};

/// Attribute recording the buffer distance on the buffer feature.
pub const DISTANCE_ATTRIBUTE: &str = "distance_m";

/// Geometry collapsed into one multi-part value per dimension.
///
/// Polygons are unioned so overlaps and shared edges disappear. Line work is
/// kept as a single multi-line geometry; the buffer engine resolves overlaps
/// between the offset curves, so buffering it once never double counts.
#[derive(Debug, Clone, PartialEq)]
pub struct Dissolved {
    /// Point components.
    pub points: MultiPoint<f64>,
    /// Line components.
    pub lines: MultiLineString<f64>,
    /// Polygon components after union.
    pub polygons: MultiPolygon<f64>,
}

impl Dissolved {
    /// Report whether no component has any geometry.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.0.is_empty() && self.lines.0.is_empty() && self.polygons.0.is_empty()
    }

    /// Collect the non-empty components into one geometry collection.
    #[must_use]
    pub fn to_geometry_collection(&self) -> GeometryCollection<f64> {
        let mut parts = Vec::new();
        if !self.points.0.is_empty() {
            parts.push(Geometry::MultiPoint(self.points.clone()));
        }
        if !self.lines.0.is_empty() {
            parts.push(Geometry::MultiLineString(self.lines.clone()));
        }
        if !self.polygons.0.is_empty() {
            parts.push(Geometry::MultiPolygon(self.polygons.clone()));
        }
        GeometryCollection(parts)
    }

    /// Expand every component outward by `distance` and union the results.
    ///
    /// Joins and caps use the engine's default round style.
    #[must_use]
    pub fn buffer(&self, distance: f64) -> MultiPolygon<f64> {
        let mut pieces = Vec::with_capacity(3);
        if !self.points.0.is_empty() {
            pieces.push(self.points.buffer(distance));
        }
        if !self.lines.0.is_empty() {
            pieces.push(self.lines.buffer(distance));
        }
        if !self.polygons.0.is_empty() {
            pieces.push(self.polygons.buffer(distance));
        }
        union_all(pieces.iter())
    }
}

/// Collapse `geometries` into a [`Dissolved`] value.
///
/// # Examples
/// ```
/// use corridor_core::dissolve;
/// use geo::{Geometry, Rect, coord};
///
/// let left = Geometry::Rect(Rect::new(coord! { x: 0.0, y: 0.0 }, coord! { x: 2.0, y: 2.0 }));
/// let right = Geometry::Rect(Rect::new(coord! { x: 1.0, y: 0.0 }, coord! { x: 3.0, y: 2.0 }));
/// let dissolved = dissolve([&left, &right]);
/// assert_eq!(dissolved.polygons.0.len(), 1);
/// ```
pub fn dissolve<'a, I>(geometries: I) -> Dissolved
where
    I: IntoIterator<Item = &'a Geometry<f64>>,
{
    let mut points = Vec::new();
    let mut lines = Vec::new();
    let mut polygons = Vec::new();
    for geometry in geometries {
        collect_parts(geometry, &mut points, &mut lines, &mut polygons);
    }
    Dissolved {
        points: MultiPoint::new(points),
        lines: MultiLineString::new(lines),
        polygons: union_all(polygons.iter()),
    }
}

fn collect_parts(
    geometry: &Geometry<f64>,
    points: &mut Vec<geo::Point<f64>>,
    lines: &mut Vec<LineString<f64>>,
    polygons: &mut Vec<Polygon<f64>>,
) {
    match geometry {
        Geometry::Point(point) => points.push(*point),
        Geometry::MultiPoint(multi) => points.extend(multi.iter().copied()),
        Geometry::Line(line) => lines.push(LineString::from(*line)),
        Geometry::LineString(line) => lines.push(line.clone()),
        Geometry::MultiLineString(multi) => lines.extend(multi.iter().cloned()),
        Geometry::Polygon(polygon) => polygons.push(polygon.clone()),
        Geometry::MultiPolygon(multi) => polygons.extend(multi.iter().cloned()),
        Geometry::Rect(rect) => polygons.push(rect.to_polygon()),
        Geometry::Triangle(triangle) => polygons.push(triangle.to_polygon()),
        Geometry::GeometryCollection(collection) => {
            for inner in collection {
                collect_parts(inner, points, lines, polygons);
            }
        }
    }
}

fn union_all<'a, B>(shapes: impl Iterator<Item = &'a B>) -> MultiPolygon<f64>
where
    B: BooleanOps<Scalar = f64> + 'a,
{
    shapes.fold(MultiPolygon::new(Vec::new()), |acc, shape| acc.union(shape))
}

/// A road buffer expressed in the working CRS.
#[derive(Debug, Clone, PartialEq)]
pub struct BufferResult {
    /// Single-feature layer holding the buffer polygon.
    pub layer: Layer,
    /// Metric CRS the buffer was computed in.
    pub metric_crs: Crs,
    /// Whether the metric CRS is the Web Mercator fallback.
    pub fallback: bool,
    /// Buffer distance in metres.
    pub distance_m: f64,
}

impl BufferResult {
    /// The buffer polygon, empty when the roads had no geometry.
    #[must_use]
    pub fn polygon(&self) -> MultiPolygon<f64> {
        dissolve(self.layer.geometries()).polygons
    }
}

/// Errors from [`build_buffer`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BufferError {
    /// Projecting the roads into a metric frame failed.
    #[error("cannot project roads into a metric frame: {0}")]
    Project(#[source] ReprojectError),
    /// Converting the buffer back into the working CRS failed.
    #[error("cannot return buffer to the working CRS: {0}")]
    Restore(#[source] ReprojectError),
}

/// Buffer the dissolved `roads` by `distance_m` metres.
///
/// The roads are projected into the local UTM zone (or Web Mercator, see
/// [`project_to_metric`](crate::project_to_metric)), dissolved, buffered and
/// returned as a single-feature layer in [`Crs::WORKING`]. Distances are
/// passed through unchecked; callers restrict them to positive values.
///
/// # Errors
/// Returns [`BufferError`] when either reprojection step fails.
pub fn build_buffer(roads: &Layer, distance_m: f64) -> Result<BufferResult, BufferError> {
    let frame = project_to_metric(roads).map_err(BufferError::Project)?;
    let dissolved = dissolve(frame.layer.geometries());
    let polygon = dissolved.buffer(distance_m);
    debug!(
        "buffered {} roads by {distance_m} m in {} into {} polygon parts",
        roads.len(),
        frame.crs,
        polygon.0.len()
    );

    let mut attributes = Attributes::new();
    attributes.insert(
        DISTANCE_ATTRIBUTE.to_owned(),
        AttributeValue::Number(distance_m),
    );
    let metric = Layer::new(
        frame.crs,
        vec![Feature::new(Geometry::MultiPolygon(polygon), attributes)],
    );
    let layer = metric.to_crs(Crs::WORKING).map_err(BufferError::Restore)?;
    Ok(BufferResult {
        layer,
        metric_crs: frame.crs,
        fallback: frame.fallback,
        distance_m,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use geo::{Area, Contains, Coord, Euclidean, Distance, Point, line_string, point, polygon};
    use rstest::{fixture, rstest};

    const ORIGIN: Coord<f64> = Coord {
        x: 500_000.0,
        y: 1_400_000.0,
    };

    #[fixture]
    fn crossing_roads() -> Layer {
        Layer::new(
            Crs::WORKING,
            vec![
                Feature::from_geometry(Geometry::LineString(line_string![
                    (x: ORIGIN.x - 500.0, y: ORIGIN.y - 500.0),
                    (x: ORIGIN.x + 500.0, y: ORIGIN.y + 500.0),
                ])),
                Feature::from_geometry(Geometry::LineString(line_string![
                    (x: ORIGIN.x - 500.0, y: ORIGIN.y + 500.0),
                    (x: ORIGIN.x + 500.0, y: ORIGIN.y - 500.0),
                ])),
            ],
        )
    }

    #[rstest]
    fn buffer_is_single_feature_in_working_crs(crossing_roads: Layer) {
        let result = build_buffer(&crossing_roads, 50.0).expect("buffer");
        assert_eq!(result.layer.crs(), Crs::WORKING);
        assert_eq!(result.layer.len(), 1);
        assert_eq!(result.metric_crs, Crs::WORKING);
        assert!(!result.fallback);
        assert_eq!(
            result.layer.features()[0].attributes.get(DISTANCE_ATTRIBUTE),
            Some(&AttributeValue::Number(50.0))
        );
    }

    #[rstest]
    fn buffer_contains_every_road_vertex(crossing_roads: Layer) {
        let polygon = build_buffer(&crossing_roads, 50.0)
            .expect("buffer")
            .polygon();
        for geometry in crossing_roads.geometries() {
            let Geometry::LineString(line) = geometry else {
                panic!("expected line strings");
            };
            for coord in line.coords() {
                assert!(polygon.contains(&Point::from(*coord)), "{coord:?} outside");
            }
        }
    }

    #[rstest]
    fn buffer_reaches_distance_but_not_beyond(crossing_roads: Layer) {
        let polygon = build_buffer(&crossing_roads, 50.0)
            .expect("buffer")
            .polygon();
        // Perpendicular to the first diagonal at the far end of the segment.
        let inside = point!(x: ORIGIN.x + 300.0 + 30.0, y: ORIGIN.y + 300.0 - 30.0);
        let outside = point!(x: ORIGIN.x + 300.0 + 40.0, y: ORIGIN.y + 300.0 - 40.0);
        assert!(polygon.contains(&inside));
        assert!(!polygon.contains(&outside));
    }

    #[rstest]
    fn buffering_is_deterministic(crossing_roads: Layer) {
        let first = build_buffer(&crossing_roads, 100.0).expect("first buffer");
        let second = build_buffer(&crossing_roads, 100.0).expect("second buffer");
        assert_eq!(first, second);
    }

    #[rstest]
    fn dissolving_overlapping_roads_does_not_double_count(crossing_roads: Layer) {
        let single = build_buffer(&crossing_roads, 25.0).expect("buffer").polygon();
        let mut doubled = crossing_roads.clone().into_features();
        doubled.extend(crossing_roads.features().iter().cloned());
        let doubled = Layer::new(Crs::WORKING, doubled);
        let repeated = build_buffer(&doubled, 25.0).expect("buffer").polygon();

        let delta = (single.unsigned_area() - repeated.unsigned_area()).abs();
        assert!(delta < 1.0, "area changed by {delta}");
    }

    #[rstest]
    fn empty_roads_produce_empty_buffer() {
        let result = build_buffer(&Layer::empty(Crs::WORKING), 10.0).expect("buffer");
        assert_eq!(result.layer.len(), 1);
        assert!(result.polygon().0.is_empty());
        assert!(result.fallback);
    }

    #[rstest]
    fn dissolve_merges_touching_polygons() {
        let left = Geometry::Polygon(geo::polygon![
            (x: 0.0, y: 0.0), (x: 1.0, y: 0.0), (x: 1.0, y: 1.0), (x: 0.0, y: 1.0),
        ]);
        let right = Geometry::Polygon(geo::polygon![
            (x: 1.0, y: 0.0), (x: 2.0, y: 0.0), (x: 2.0, y: 1.0), (x: 1.0, y: 1.0),
        ]);
        let dissolved = dissolve([&left, &right]);
        assert_eq!(dissolved.polygons.0.len(), 1);
        assert!((dissolved.polygons.unsigned_area() - 2.0).abs() < 1e-6);
    }

    #[rstest]
    fn dissolve_flattens_collections() {
        let collection = Geometry::GeometryCollection(GeometryCollection(vec![
            Geometry::Point(point!(x: 1.0, y: 1.0)),
            Geometry::LineString(line_string![(x: 0.0, y: 0.0), (x: 1.0, y: 0.0)]),
        ]));
        let dissolved = dissolve([&collection]);
        assert_eq!(dissolved.points.0.len(), 1);
        assert_eq!(dissolved.lines.0.len(), 1);
        assert!(dissolved.polygons.0.is_empty());
        assert_eq!(dissolved.to_geometry_collection().0.len(), 2);
    }

    #[rstest]
    fn point_buffer_radius_matches_distance() {
        let centre = point!(x: 10.0, y: 10.0);
        let dissolved = dissolve([&Geometry::Point(centre)]);
        let polygon = dissolved.buffer(5.0);
        let exterior = polygon.0.first().expect("one polygon").exterior();
        for coord in exterior.coords() {
            let radius = Euclidean.distance(centre, Point::from(*coord));
            assert!((radius - 5.0).abs() < 1e-3, "vertex at radius {radius}");
        }
    }
}
