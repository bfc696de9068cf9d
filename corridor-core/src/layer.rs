//! In-memory vector layers shared by every pipeline stage.

use std::collections::BTreeMap;

use geo::{BoundingRect, Geometry, Rect};

use crate::Crs;

/// Attribute record attached to a feature, keyed by field name.
pub type Attributes = BTreeMap<String, AttributeValue>;

/// Scalar attribute value.
///
/// This is the subset of values that both DBF tables and GeoJSON properties
/// can represent without loss.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(untagged))]
pub enum AttributeValue {
    /// Missing value.
    Null,
    /// Boolean flag.
    Bool(bool),
    /// Whole number.
    Integer(i64),
    /// Floating-point number.
    Number(f64),
    /// Free text.
    Text(String),
}

impl From<&str> for AttributeValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for AttributeValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<i64> for AttributeValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for AttributeValue {
    fn from(value: f64) -> Self {
        Self::Number(value)
    }
}

impl From<bool> for AttributeValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

/// A single geometry plus its attribute record.
///
/// `geometry` is `None` for null shapes, which never intersect anything.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// Feature geometry, expressed in the owning layer's CRS.
    pub geometry: Option<Geometry<f64>>,
    /// Attribute record.
    pub attributes: Attributes,
}

impl Feature {
    /// Construct a feature with a geometry and attributes.
    ///
    /// # Examples
    /// ```
    /// use corridor_core::{Attributes, Feature};
    /// use geo::{Geometry, point};
    ///
    /// let feature = Feature::new(Geometry::Point(point!(x: 1.0, y: 2.0)), Attributes::new());
    /// assert!(feature.geometry.is_some());
    /// ```
    #[must_use]
    pub const fn new(geometry: Geometry<f64>, attributes: Attributes) -> Self {
        Self {
            geometry: Some(geometry),
            attributes,
        }
    }

    /// Construct a feature without attributes.
    #[must_use]
    pub const fn from_geometry(geometry: Geometry<f64>) -> Self {
        Self::new(geometry, Attributes::new())
    }

    /// Return a copy of this feature with `geometry` swapped in.
    #[must_use]
    pub fn with_geometry(&self, geometry: Option<Geometry<f64>>) -> Self {
        Self {
            geometry,
            attributes: self.attributes.clone(),
        }
    }
}

/// An ordered collection of features sharing one coordinate reference system.
///
/// Layers are treated as read-only once built; reprojection produces a new
/// layer through [`Layer::to_crs`](crate::Layer::to_crs).
#[derive(Debug, Clone, PartialEq)]
pub struct Layer {
    crs: Crs,
    features: Vec<Feature>,
}

impl Layer {
    /// Construct a layer from features already expressed in `crs`.
    ///
    /// # Examples
    /// ```
    /// use corridor_core::{Crs, Layer};
    ///
    /// let layer = Layer::new(Crs::WORKING, Vec::new());
    /// assert!(layer.is_empty());
    /// assert_eq!(layer.crs(), Crs::WORKING);
    /// ```
    #[must_use]
    pub const fn new(crs: Crs, features: Vec<Feature>) -> Self {
        Self { crs, features }
    }

    /// Construct a zero-feature layer.
    #[must_use]
    pub const fn empty(crs: Crs) -> Self {
        Self::new(crs, Vec::new())
    }

    /// Coordinate reference system shared by all features.
    #[must_use]
    pub const fn crs(&self) -> Crs {
        self.crs
    }

    /// Features in their original order.
    #[must_use]
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Number of features.
    #[must_use]
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Report whether the layer holds no features.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Iterate over the non-null geometries.
    pub fn geometries(&self) -> impl Iterator<Item = &Geometry<f64>> {
        self.features
            .iter()
            .filter_map(|feature| feature.geometry.as_ref())
    }

    /// Bounding rectangle of every geometry, or `None` when nothing has extent.
    #[must_use]
    pub fn bounds(&self) -> Option<Rect<f64>> {
        self.geometries()
            .filter_map(BoundingRect::bounding_rect)
            .reduce(|lhs, rhs| {
                Rect::new(
                    geo::Coord {
                        x: lhs.min().x.min(rhs.min().x),
                        y: lhs.min().y.min(rhs.min().y),
                    },
                    geo::Coord {
                        x: lhs.max().x.max(rhs.max().x),
                        y: lhs.max().y.max(rhs.max().y),
                    },
                )
            })
    }

    /// Consume the layer and return its features.
    #[must_use]
    pub fn into_features(self) -> Vec<Feature> {
        self.features
    }
}
