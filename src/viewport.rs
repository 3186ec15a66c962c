//! Tracking of the host map's visible area.

use crate::compute::validation::validate_bbox;
use crate::config::ViewportConfig;
use crate::error::{EcomapError, Result};
use crate::marker::Marker;
use ecomap_types::bbox::{BoundingBox, LatLng};

/// The map widget the markers are drawn on.
///
/// Reads fail with [`EcomapError::Host`] while the map is not ready.
pub trait MapHost {
    fn bounds(&self) -> Result<BoundingBox>;
    fn zoom(&self) -> Result<f64>;
    fn center(&self) -> Result<LatLng>;

    fn pan_to(&self, position: LatLng);
    fn set_zoom(&self, zoom: f64);
    /// Replace every marker currently shown.
    fn show_markers(&self, markers: &[Marker]);
}

/// A normalized viewport. `version` grows by one on every change.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Viewport {
    pub bbox: BoundingBox,
    pub zoom: f64,
    pub version: u64,
}

#[derive(Debug, Clone)]
pub struct ViewportTracker {
    config: ViewportConfig,
    current: Viewport,
}

impl ViewportTracker {
    /// Start at the whole world and the configured default zoom.
    pub fn new(config: ViewportConfig) -> Self {
        let current = Viewport {
            bbox: BoundingBox::world(),
            zoom: config.default_zoom,
            version: 0,
        };
        Self { config, current }
    }

    pub fn current(&self) -> Viewport {
        self.current
    }

    /// Read bounds and zoom after the host map settled.
    ///
    /// Returns the new viewport when it differs from the current one.
    /// Host failures keep the current viewport.
    pub fn on_idle(&mut self, host: &dyn MapHost) -> Option<Viewport> {
        let read = host.bounds().and_then(|bbox| Ok((bbox, host.zoom()?)));
        match read {
            Ok((bbox, zoom)) => self.update(bbox, zoom),
            Err(e) => {
                log::debug!("Ignoring idle event, host map not ready: {}", e);
                None
            }
        }
    }

    /// Apply raw bounds and zoom from any source.
    pub fn update(&mut self, bbox: BoundingBox, zoom: f64) -> Option<Viewport> {
        let (bbox, zoom) = match self.normalize(bbox, zoom) {
            Ok(normalized) => normalized,
            Err(e) => {
                log::debug!("Ignoring viewport update: {}", e);
                return None;
            }
        };

        if bbox == self.current.bbox && zoom == self.current.zoom {
            return None;
        }

        self.current = Viewport {
            bbox,
            zoom,
            version: self.current.version + 1,
        };
        log::trace!(
            "Viewport v{}: {:?} at zoom {}",
            self.current.version,
            self.current.bbox.to_array(),
            zoom
        );
        Some(self.current)
    }

    fn normalize(&self, bbox: BoundingBox, zoom: f64) -> Result<(BoundingBox, f64)> {
        validate_bbox(&bbox).map_err(|e| EcomapError::Host(e.to_string()))?;
        if !zoom.is_finite() {
            return Err(EcomapError::Host(format!("zoom is not finite: {}", zoom)));
        }

        let pad = self.config.padding_degrees;
        let (south, north) = if bbox.south <= bbox.north {
            (bbox.south, bbox.north)
        } else {
            (bbox.north, bbox.south)
        };

        Ok((
            BoundingBox::new(
                bbox.west - pad,
                (south - pad).clamp(-90.0, 90.0),
                bbox.east + pad,
                (north + pad).clamp(-90.0, 90.0),
            ),
            zoom,
        ))
    }
}

impl Default for ViewportTracker {
    fn default() -> Self {
        Self::new(ViewportConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[derive(Default)]
    struct FakeHost {
        bounds: RefCell<Option<BoundingBox>>,
        zoom: RefCell<f64>,
    }

    impl FakeHost {
        fn at(bbox: BoundingBox, zoom: f64) -> Self {
            Self {
                bounds: RefCell::new(Some(bbox)),
                zoom: RefCell::new(zoom),
            }
        }
    }

    impl MapHost for FakeHost {
        fn bounds(&self) -> Result<BoundingBox> {
            self.bounds
                .borrow()
                .ok_or_else(|| EcomapError::Host("map not initialised".into()))
        }

        fn zoom(&self) -> Result<f64> {
            Ok(*self.zoom.borrow())
        }

        fn center(&self) -> Result<LatLng> {
            Ok(self.bounds()?.center())
        }

        fn pan_to(&self, _position: LatLng) {}

        fn set_zoom(&self, zoom: f64) {
            *self.zoom.borrow_mut() = zoom;
        }

        fn show_markers(&self, _markers: &[Marker]) {}
    }

    #[test]
    fn test_initial_viewport_is_world_at_default_zoom() {
        let tracker = ViewportTracker::default();
        let viewport = tracker.current();
        assert_eq!(viewport.bbox, BoundingBox::world());
        assert_eq!(viewport.zoom, 14.0);
        assert_eq!(viewport.version, 0);
    }

    #[test]
    fn test_version_bumps_only_on_change() {
        let host = FakeHost::at(BoundingBox::new(-9.0, 38.0, -8.0, 39.0), 10.0);
        let mut tracker = ViewportTracker::default();

        let first = tracker.on_idle(&host).unwrap();
        assert_eq!(first.version, 1);
        assert!(tracker.on_idle(&host).is_none());

        host.set_zoom(11.0);
        assert_eq!(tracker.on_idle(&host).map(|v| v.version), Some(2));
    }

    #[test]
    fn test_host_errors_keep_previous_viewport() {
        let host = FakeHost::default();
        let mut tracker = ViewportTracker::default();
        assert!(tracker.on_idle(&host).is_none());
        assert_eq!(tracker.current().version, 0);
    }

    #[test]
    fn test_latitude_clamped_and_padding_applied() {
        let config = ViewportConfig {
            padding_degrees: 1.0,
            ..ViewportConfig::default()
        };
        let mut tracker = ViewportTracker::new(config);
        let viewport = tracker
            .update(BoundingBox::new(-10.0, 89.5, 10.0, 60.0), 3.0)
            .unwrap();
        assert_eq!(viewport.bbox, BoundingBox::new(-11.0, 59.0, 11.0, 90.0));
    }

    #[test]
    fn test_non_finite_input_ignored() {
        let mut tracker = ViewportTracker::default();
        assert!(
            tracker
                .update(BoundingBox::new(f64::NAN, 0.0, 1.0, 1.0), 3.0)
                .is_none()
        );
        assert!(tracker.update(BoundingBox::world(), f64::INFINITY).is_none());
    }
}
