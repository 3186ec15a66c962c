use geo::Point;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::fmt;

/// Identifier of a point of interest, as carried by the feed.
///
/// GeoJSON allows both numeric and string feature ids; both are kept
/// verbatim so that identity survives a round trip through the feed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureId {
    Number(i64),
    String(String),
}

impl fmt::Display for FeatureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeatureId::Number(n) => write!(f, "{}", n),
            FeatureId::String(s) => f.write_str(s),
        }
    }
}

impl From<i64> for FeatureId {
    fn from(value: i64) -> Self {
        FeatureId::Number(value)
    }
}

impl From<&str> for FeatureId {
    fn from(value: &str) -> Self {
        FeatureId::String(value.to_string())
    }
}

impl From<String> for FeatureId {
    fn from(value: String) -> Self {
        FeatureId::String(value)
    }
}

/// An immutable point of interest.
///
/// `properties` carries domain attributes (category, slug, accepted
/// materials) and is opaque to clustering.
///
/// # Examples
///
/// ```
/// use ecomap_types::feature::{FeatureId, PointFeature};
/// use serde_json::json;
///
/// let gps = PointFeature::new(FeatureId::from("tracker-1"), -8.42, 41.54)
///     .with_property("type", json!("gps"));
/// assert_eq!(gps.category(), Some("gps"));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFeature {
    pub id: FeatureId,
    pub longitude: f64,
    pub latitude: f64,
    #[serde(default)]
    pub properties: Map<String, Value>,
}

impl PointFeature {
    /// Create a feature with no properties.
    pub fn new(id: FeatureId, longitude: f64, latitude: f64) -> Self {
        Self {
            id,
            longitude,
            latitude,
            properties: Map::new(),
        }
    }

    /// Attach a property, replacing any previous value under `key`.
    pub fn with_property(mut self, key: impl Into<String>, value: Value) -> Self {
        self.properties.insert(key.into(), value);
        self
    }

    /// Position as a `geo::Point` (x = longitude, y = latitude).
    pub fn point(&self) -> Point<f64> {
        Point::new(self.longitude, self.latitude)
    }

    /// `true` when both coordinates are finite numbers.
    pub fn has_finite_coordinates(&self) -> bool {
        self.longitude.is_finite() && self.latitude.is_finite()
    }

    /// Compare only the coordinate pair of two features.
    pub fn same_geometry(&self, other: &PointFeature) -> bool {
        self.longitude == other.longitude && self.latitude == other.latitude
    }

    /// The `"type"` property, used to pick marker glyphs and filter by
    /// category.
    pub fn category(&self) -> Option<&str> {
        self.properties.get("type").and_then(Value::as_str)
    }
}

/// An ordered set of features with lookup by id.
///
/// Order is kept as received; it never changes which points cluster
/// together, only the order in which ties are resolved.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct FeatureCollection {
    features: Vec<PointFeature>,
    by_id: HashMap<FeatureId, usize>,
}

impl FeatureCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a collection. When an id occurs more than once the last
    /// occurrence wins the id lookup, but every feature is kept.
    pub fn from_features(features: Vec<PointFeature>) -> Self {
        let by_id = features
            .iter()
            .enumerate()
            .map(|(idx, feature)| (feature.id.clone(), idx))
            .collect();
        Self { features, by_id }
    }

    pub fn push(&mut self, feature: PointFeature) {
        self.by_id.insert(feature.id.clone(), self.features.len());
        self.features.push(feature);
    }

    pub fn get(&self, id: &FeatureId) -> Option<&PointFeature> {
        self.by_id.get(id).map(|&idx| &self.features[idx])
    }

    pub fn contains(&self, id: &FeatureId) -> bool {
        self.by_id.contains_key(id)
    }

    pub fn features(&self) -> &[PointFeature] {
        &self.features
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PointFeature> {
        self.features.iter()
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Keep only features matching `predicate`, preserving order.
    pub fn filtered(&self, mut predicate: impl FnMut(&PointFeature) -> bool) -> Self {
        Self::from_features(
            self.features
                .iter()
                .filter(|feature| predicate(feature))
                .cloned()
                .collect(),
        )
    }
}

impl FromIterator<PointFeature> for FeatureCollection {
    fn from_iter<I: IntoIterator<Item = PointFeature>>(iter: I) -> Self {
        Self::from_features(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a FeatureCollection {
    type Item = &'a PointFeature;
    type IntoIter = std::slice::Iter<'a, PointFeature>;

    fn into_iter(self) -> Self::IntoIter {
        self.features.iter()
    }
}
