//! Configuration for clustering, feed polling and viewport handling.
//!
//! Every section has serde defaults, so an empty document is a valid
//! configuration:
//!
//! ```rust
//! use ecomap::Config;
//!
//! let config = Config::from_json_str("{}").unwrap();
//! assert_eq!(config.cluster.radius, 60.0);
//! assert_eq!(config.feed.poll_interval_ms, 1000);
//!
//! let json = r#"{
//!     "cluster": { "radius": 40.0, "max_zoom": 16 },
//!     "feed": { "endpoint": "http://localhost:3000/api/location" }
//! }"#;
//! let config = Config::from_json_str(json).unwrap();
//! assert_eq!(config.cluster.max_zoom, 16);
//! ```

use crate::error::{EcomapError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Highest zoom level a cluster id can encode.
pub const MAX_SUPPORTED_ZOOM: u8 = 30;

/// Parameters of the hierarchical clustering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ClusterOptions {
    /// Tile extent in pixels. `radius` is measured on a world `2 * extent`
    /// pixels wide at zoom 0.
    #[serde(default = "ClusterOptions::default_extent")]
    pub extent: u32,

    /// Cluster radius in pixels.
    #[serde(default = "ClusterOptions::default_radius")]
    pub radius: f64,

    /// Lowest zoom level at which clusters are generated.
    #[serde(default)]
    pub min_zoom: u8,

    /// Highest zoom level at which clusters are generated. Above it every
    /// feature renders on its own.
    #[serde(default = "ClusterOptions::default_max_zoom")]
    pub max_zoom: u8,

    /// Minimum number of points needed to form a cluster.
    #[serde(default = "ClusterOptions::default_min_points")]
    pub min_points: usize,
}

impl ClusterOptions {
    const fn default_extent() -> u32 {
        256
    }

    const fn default_radius() -> f64 {
        60.0
    }

    const fn default_max_zoom() -> u8 {
        12
    }

    const fn default_min_points() -> usize {
        2
    }

    pub fn with_extent(mut self, extent: u32) -> Self {
        self.extent = extent;
        self
    }

    pub fn with_radius(mut self, radius: f64) -> Self {
        self.radius = radius;
        self
    }

    pub fn with_zoom_range(mut self, min_zoom: u8, max_zoom: u8) -> Self {
        self.min_zoom = min_zoom;
        self.max_zoom = max_zoom;
        self
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.extent == 0 {
            return Err("Extent must be greater than zero".to_string());
        }
        if !self.radius.is_finite() || self.radius <= 0.0 {
            return Err(format!(
                "Radius must be a positive finite number, got: {}",
                self.radius
            ));
        }
        if self.max_zoom > MAX_SUPPORTED_ZOOM {
            return Err(format!(
                "Max zoom must be at most {}, got: {}",
                MAX_SUPPORTED_ZOOM, self.max_zoom
            ));
        }
        if self.min_zoom > self.max_zoom {
            return Err(format!(
                "Min zoom ({}) must not exceed max zoom ({})",
                self.min_zoom, self.max_zoom
            ));
        }
        if self.min_points < 2 {
            return Err("Min points must be at least 2".to_string());
        }
        Ok(())
    }
}

impl Default for ClusterOptions {
    fn default() -> Self {
        Self {
            extent: Self::default_extent(),
            radius: Self::default_radius(),
            min_zoom: 0,
            max_zoom: Self::default_max_zoom(),
            min_points: Self::default_min_points(),
        }
    }
}

/// Point feed polling settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedConfig {
    /// Absolute URL of the `GET /api/location` endpoint.
    #[serde(default = "FeedConfig::default_endpoint")]
    pub endpoint: String,

    #[serde(default = "FeedConfig::default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Per-request timeout. `None` waits for the server; a slow answer
    /// then delays the next tick instead of overlapping it.
    #[serde(default)]
    pub request_timeout_ms: Option<u64>,

    /// Publish snapshots whose geometry diff is empty. Off by default so
    /// that an unchanged feed never triggers an index rebuild.
    #[serde(default)]
    pub publish_unchanged: bool,
}

impl FeedConfig {
    fn default_endpoint() -> String {
        "http://localhost:3000/api/location".to_string()
    }

    const fn default_poll_interval_ms() -> u64 {
        1000
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = interval.as_millis() as u64;
        self
    }

    pub fn with_publish_unchanged(mut self, publish: bool) -> Self {
        self.publish_unchanged = publish;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.endpoint.trim().is_empty() {
            return Err("Feed endpoint cannot be empty".to_string());
        }
        if self.poll_interval_ms == 0 {
            return Err("Poll interval must be greater than zero".to_string());
        }
        if self.request_timeout_ms == Some(0) {
            return Err("Request timeout must be greater than zero".to_string());
        }
        Ok(())
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            endpoint: Self::default_endpoint(),
            poll_interval_ms: Self::default_poll_interval_ms(),
            request_timeout_ms: None,
            publish_unchanged: false,
        }
    }
}

/// Viewport normalisation settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ViewportConfig {
    /// Degrees added around the visible bounds before querying.
    #[serde(default)]
    pub padding_degrees: f64,

    /// Zoom assumed before the host map reports its first idle event.
    #[serde(default = "ViewportConfig::default_zoom")]
    pub default_zoom: f64,
}

impl ViewportConfig {
    const fn default_zoom() -> f64 {
        14.0
    }

    pub fn validate(&self) -> std::result::Result<(), String> {
        if !self.padding_degrees.is_finite() || self.padding_degrees < 0.0 {
            return Err(format!(
                "Padding must be a non-negative finite number, got: {}",
                self.padding_degrees
            ));
        }
        if !self.default_zoom.is_finite() || self.default_zoom < 0.0 {
            return Err(format!(
                "Default zoom must be a non-negative finite number, got: {}",
                self.default_zoom
            ));
        }
        Ok(())
    }
}

impl Default for ViewportConfig {
    fn default() -> Self {
        Self {
            padding_degrees: 0.0,
            default_zoom: Self::default_zoom(),
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default)]
    pub cluster: ClusterOptions,

    #[serde(default)]
    pub feed: FeedConfig,

    #[serde(default)]
    pub viewport: ViewportConfig,
}

impl Config {
    pub fn with_cluster(mut self, cluster: ClusterOptions) -> Self {
        self.cluster = cluster;
        self
    }

    pub fn with_feed(mut self, feed: FeedConfig) -> Self {
        self.feed = feed;
        self
    }

    pub fn with_viewport(mut self, viewport: ViewportConfig) -> Self {
        self.viewport = viewport;
        self
    }

    /// Validate every section.
    pub fn validate(&self) -> Result<()> {
        self.cluster.validate().map_err(EcomapError::Config)?;
        self.feed.validate().map_err(EcomapError::Config)?;
        self.viewport.validate().map_err(EcomapError::Config)?;
        Ok(())
    }

    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Config = serde_json::from_str(json)
            .map_err(|e| EcomapError::Config(format!("Failed to parse JSON config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a TOML document.
    #[cfg(feature = "toml")]
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let config: Config = toml::from_str(toml_str)
            .map_err(|e| EcomapError::Config(format!("Failed to parse TOML config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file; the format follows the extension
    /// (`.toml` needs the `toml` feature, anything else is read as JSON).
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            EcomapError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|ext| ext.to_str()) {
            #[cfg(feature = "toml")]
            Some("toml") => Self::from_toml_str(&contents),
            #[cfg(not(feature = "toml"))]
            Some("toml") => Err(EcomapError::Config(
                "TOML configuration requires the `toml` feature".to_string(),
            )),
            _ => Self::from_json_str(&contents),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_map_settings() {
        let config = Config::default();
        assert_eq!(config.cluster.extent, 256);
        assert_eq!(config.cluster.radius, 60.0);
        assert_eq!(config.cluster.max_zoom, 12);
        assert_eq!(config.cluster.min_points, 2);
        assert_eq!(config.feed.poll_interval(), Duration::from_secs(1));
        assert!(!config.feed.publish_unchanged);
        assert_eq!(config.viewport.padding_degrees, 0.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_cluster_option_validation() {
        assert!(ClusterOptions::default().with_radius(0.0).validate().is_err());
        assert!(ClusterOptions::default().with_radius(f64::NAN).validate().is_err());
        assert!(ClusterOptions::default().with_extent(0).validate().is_err());
        assert!(ClusterOptions::default().with_zoom_range(5, 3).validate().is_err());
        assert!(ClusterOptions::default().with_zoom_range(0, 31).validate().is_err());
        assert!(ClusterOptions::default().with_min_points(1).validate().is_err());
        assert!(ClusterOptions::default().with_zoom_range(0, 30).validate().is_ok());
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let err = Config::from_json_str(r#"{ "cluster": { "radious": 10 } }"#).unwrap_err();
        assert!(matches!(err, EcomapError::Config(_)));
    }

    #[test]
    fn test_invalid_values_rejected_on_parse() {
        let err = Config::from_json_str(r#"{ "feed": { "poll_interval_ms": 0 } }"#).unwrap_err();
        assert!(err.to_string().contains("Poll interval"));
    }

    #[cfg(feature = "toml")]
    #[test]
    fn test_toml_config() {
        let toml_str = r#"
            [cluster]
            radius = 80.0
            max_zoom = 14

            [feed]
            endpoint = "https://example.org/api/location"
            publish_unchanged = true
        "#;
        let config = Config::from_toml_str(toml_str).unwrap();
        assert_eq!(config.cluster.radius, 80.0);
        assert_eq!(config.cluster.max_zoom, 14);
        assert_eq!(config.cluster.extent, 256);
        assert!(config.feed.publish_unchanged);
    }
}
