//! Validation for geographic coordinates and incoming features.

use crate::error::{EcomapError, Result};
use ecomap_types::bbox::BoundingBox;
use ecomap_types::feature::{FeatureCollection, PointFeature};
use geo::Point;

/// Checks that a feature sits on the globe: finite coordinates, longitude
/// within `[-180, 180]` and latitude within `[-90, 90]`.
///
/// ```
/// use ecomap::compute::validation::validate_feature;
/// use ecomap_types::feature::PointFeature;
///
/// assert!(validate_feature(&PointFeature::new(1.into(), -8.4273, 41.5445)).is_ok());
/// assert!(validate_feature(&PointFeature::new(2.into(), 200.0, 40.0)).is_err());
/// assert!(validate_feature(&PointFeature::new(3.into(), f64::NAN, 40.0)).is_err());
/// ```
pub fn validate_feature(feature: &PointFeature) -> Result<()> {
    let point: Point = feature.point();
    let on_globe = (-180.0..=180.0).contains(&point.x()) && (-90.0..=90.0).contains(&point.y());
    if on_globe {
        return Ok(());
    }
    Err(EcomapError::InvalidInput(format!(
        "Feature {} has coordinates off the globe: [{}, {}]",
        feature.id, feature.longitude, feature.latitude
    )))
}

/// Drops features whose coordinates are non-finite or out of range.
///
/// Returns the retained collection (order preserved) and the number of
/// dropped features. This is the upstream filtering step the cluster index
/// relies on.
///
/// # Examples
///
/// ```
/// use ecomap::compute::validation::retain_valid_features;
/// use ecomap_types::feature::{FeatureCollection, PointFeature};
/// use geo::Point;
///
/// let raw: FeatureCollection = vec![
///     PointFeature::new(1.into(), 0.0, 0.0),
///     PointFeature::new(2.into(), f64::NAN, 0.0),
/// ]
/// .into_iter()
/// .collect();
///
/// let (valid, dropped) = retain_valid_features(&raw);
/// assert_eq!(valid.len(), 1);
/// assert_eq!(dropped, 1);
/// ```
pub fn retain_valid_features(features: &FeatureCollection) -> (FeatureCollection, usize) {
    let mut dropped = 0;
    let valid = features.filtered(|feature| match validate_feature(feature) {
        Ok(()) => true,
        Err(e) => {
            log::warn!("Dropping feature with invalid coordinates: {}", e);
            dropped += 1;
            false
        }
    });
    (valid, dropped)
}

/// Rejects bounding boxes with NaN or infinite edges. Wrapped longitudes
/// and latitudes past the poles are accepted; callers clamp them.
pub fn validate_bbox(bbox: &BoundingBox) -> Result<()> {
    let values = bbox.to_array();
    if values.iter().all(|v| v.is_finite()) {
        return Ok(());
    }
    Err(EcomapError::InvalidInput(format!(
        "Bounding box must have finite coordinates, got: {:?}",
        values
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn at(lng: f64, lat: f64) -> PointFeature {
        PointFeature::new(1.into(), lng, lat)
    }

    #[test]
    fn test_feature_on_globe() {
        assert!(validate_feature(&at(-8.427375, 41.544581)).is_ok());
        assert!(validate_feature(&at(180.0, 0.0)).is_ok());
        assert!(validate_feature(&at(-180.0, 0.0)).is_ok());
        assert!(validate_feature(&at(0.0, 90.0)).is_ok());
        assert!(validate_feature(&at(0.0, -90.0)).is_ok());
    }

    #[test]
    fn test_feature_off_globe() {
        assert!(validate_feature(&at(200.0, 40.0)).is_err());
        assert!(validate_feature(&at(-180.1, 40.0)).is_err());
        assert!(validate_feature(&at(f64::INFINITY, 40.0)).is_err());
        assert!(validate_feature(&at(0.0, 90.5)).is_err());

        let err = validate_feature(&at(0.0, f64::NAN)).unwrap_err();
        assert!(err.to_string().contains("Feature 1"));
    }

    #[test]
    fn test_retain_preserves_order() {
        let raw: FeatureCollection = vec![
            PointFeature::new(1.into(), 0.0, 0.0),
            PointFeature::new(2.into(), 0.0, f64::NEG_INFINITY),
            PointFeature::new(3.into(), 500.0, 0.0),
            PointFeature::new(4.into(), 1.0, 1.0),
        ]
        .into_iter()
        .collect();

        let (valid, dropped) = retain_valid_features(&raw);
        assert_eq!(dropped, 2);
        let ids: Vec<String> = valid.iter().map(|f| f.id.to_string()).collect();
        assert_eq!(ids, vec!["1", "4"]);
    }

    #[test]
    fn test_validate_bbox() {
        assert!(validate_bbox(&BoundingBox::world()).is_ok());
        assert!(validate_bbox(&BoundingBox::new(170.0, -10.0, -170.0, 10.0)).is_ok());
        assert!(validate_bbox(&BoundingBox::new(-400.0, -100.0, 400.0, 100.0)).is_ok());
        assert!(validate_bbox(&BoundingBox::new(f64::NAN, 0.0, 1.0, 5.0)).is_err());
        assert!(validate_bbox(&BoundingBox::new(0.0, 0.0, f64::INFINITY, 5.0)).is_err());
    }
}
