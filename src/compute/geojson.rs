//! GeoJSON conversion for point features and query results.

use crate::error::{EcomapError, Result};
use crate::index::QueryEntry;
use ecomap_types::feature::{FeatureCollection, FeatureId, PointFeature};
use geojson::feature::Id;
use geojson::{Feature, GeoJson, Geometry, Value};
use serde_json::{Map, Value as JsonValue};

/// Parses a feed body into a feature collection.
///
/// Accepts a GeoJSON `FeatureCollection`, a single `Feature`, or a bare JSON
/// array of features (the endpoint answers `[]` when it has no data).
/// Features that are not usable points are skipped with a warning.
///
/// # Examples
///
/// ```
/// use ecomap::compute::geojson::parse_feature_collection;
///
/// let body = r#"{
///     "type": "FeatureCollection",
///     "features": [{
///         "type": "Feature",
///         "id": 1,
///         "properties": { "slug": "ecoponto-braga" },
///         "geometry": { "type": "Point", "coordinates": [-8.427375, 41.544581] }
///     }]
/// }"#;
/// let collection = parse_feature_collection(body).unwrap();
/// assert_eq!(collection.len(), 1);
/// ```
pub fn parse_feature_collection(body: &str) -> Result<FeatureCollection> {
    let json: JsonValue = serde_json::from_str(body)?;
    collection_from_json(json)
}

/// Same as [`parse_feature_collection`] for an already parsed JSON value.
pub fn collection_from_json(json: JsonValue) -> Result<FeatureCollection> {
    let features: Vec<Feature> = match json {
        JsonValue::Array(items) => serde_json::from_value(JsonValue::Array(items))?,
        other => match GeoJson::from_json_value(other)
            .map_err(|e| EcomapError::Decode(format!("Invalid GeoJSON: {}", e)))?
        {
            GeoJson::FeatureCollection(collection) => collection.features,
            GeoJson::Feature(feature) => vec![feature],
            GeoJson::Geometry(_) => {
                return Err(EcomapError::Decode(
                    "Expected a FeatureCollection, got a bare geometry".to_string(),
                ));
            }
        },
    };

    let mut collection = FeatureCollection::new();
    for (idx, feature) in features.into_iter().enumerate() {
        match point_feature_from_geojson(feature) {
            Ok(point) => collection.push(point),
            Err(e) => log::warn!("Skipping feed feature at index {}: {}", idx, e),
        }
    }
    Ok(collection)
}

/// Converts one GeoJSON feature into a [`PointFeature`].
///
/// The id comes from the feature's `id` member, falling back to an `id`
/// property.
pub fn point_feature_from_geojson(feature: Feature) -> Result<PointFeature> {
    let properties = feature.properties.unwrap_or_default();

    let id = match feature.id {
        Some(Id::String(s)) => FeatureId::String(s),
        Some(Id::Number(n)) => number_to_id(&n),
        None => match properties.get("id") {
            Some(JsonValue::String(s)) => FeatureId::String(s.clone()),
            Some(JsonValue::Number(n)) => number_to_id(n),
            _ => {
                return Err(EcomapError::InvalidInput(
                    "Feature has no id".to_string(),
                ));
            }
        },
    };

    let geometry = feature
        .geometry
        .ok_or_else(|| EcomapError::InvalidInput(format!("Feature {} has no geometry", id)))?;

    match geometry.value {
        Value::Point(coords) => {
            if coords.len() < 2 {
                return Err(EcomapError::InvalidInput(format!(
                    "Feature {}: Point must have at least 2 coordinates",
                    id
                )));
            }
            Ok(PointFeature {
                id,
                longitude: coords[0],
                latitude: coords[1],
                properties,
            })
        }
        _ => Err(EcomapError::InvalidInput(format!(
            "Feature {}: geometry is not a Point",
            id
        ))),
    }
}

fn number_to_id(n: &serde_json::Number) -> FeatureId {
    n.as_i64()
        .map(FeatureId::Number)
        .unwrap_or_else(|| FeatureId::String(n.to_string()))
}

fn id_to_geojson(id: &FeatureId) -> Id {
    match id {
        FeatureId::Number(n) => Id::Number((*n).into()),
        FeatureId::String(s) => Id::String(s.clone()),
    }
}

/// Converts a [`PointFeature`] to a GeoJSON feature.
pub fn point_feature_to_geojson(feature: &PointFeature) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(Value::Point(vec![
            feature.longitude,
            feature.latitude,
        ]))),
        id: Some(id_to_geojson(&feature.id)),
        properties: Some(feature.properties.clone()),
        foreign_members: None,
    }
}

/// Short label for a cluster badge: `950`, `1.2k`, `15k`.
///
/// ```
/// use ecomap::compute::geojson::abbreviate_point_count;
///
/// assert_eq!(abbreviate_point_count(950), "950");
/// assert_eq!(abbreviate_point_count(1_234), "1.2k");
/// assert_eq!(abbreviate_point_count(15_400), "15k");
/// ```
pub fn abbreviate_point_count(count: usize) -> String {
    if count >= 10_000 {
        format!("{}k", (count as f64 / 1000.0).round())
    } else if count >= 1000 {
        format!("{}k", (count as f64 / 100.0).round() / 10.0)
    } else {
        count.to_string()
    }
}

/// Converts query entries into GeoJSON features. Clusters carry
/// `cluster`, `cluster_id`, `point_count` and `point_count_abbreviated`
/// properties; singleton features keep their own properties.
pub fn entries_to_geojson(entries: &[QueryEntry]) -> geojson::FeatureCollection {
    let features = entries
        .iter()
        .map(|entry| match entry {
            QueryEntry::Feature(feature) => point_feature_to_geojson(feature),
            QueryEntry::Cluster(cluster) => {
                let mut properties = Map::new();
                properties.insert("cluster".to_string(), JsonValue::Bool(true));
                properties.insert("cluster_id".to_string(), cluster.id.get().into());
                properties.insert("point_count".to_string(), cluster.point_count.into());
                properties.insert(
                    "point_count_abbreviated".to_string(),
                    JsonValue::String(abbreviate_point_count(cluster.point_count)),
                );
                let [lng, lat] = cluster.coordinates;
                Feature {
                    bbox: None,
                    geometry: Some(Geometry::new(Value::Point(vec![lng, lat]))),
                    id: Some(Id::Number(cluster.id.get().into())),
                    properties: Some(properties),
                    foreign_members: None,
                }
            }
        })
        .collect();

    geojson::FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}
