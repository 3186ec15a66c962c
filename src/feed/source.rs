//! Where feed snapshots come from.

use crate::error::Result;
use ecomap_types::feature::FeatureCollection;
use std::future::Future;
use std::sync::Arc;

#[cfg(feature = "http")]
pub use self::http::HttpFeatureSource;

/// Produces the current set of point features.
///
/// Implementations return every feature the backend knows about; the feed
/// works out what changed.
pub trait FeatureSource: Send + Sync {
    fn fetch_snapshot(&self) -> impl Future<Output = Result<FeatureCollection>> + Send;
}

impl<S: FeatureSource> FeatureSource for Arc<S> {
    fn fetch_snapshot(&self) -> impl Future<Output = Result<FeatureCollection>> + Send {
        (**self).fetch_snapshot()
    }
}

#[cfg(feature = "http")]
mod http {
    use super::FeatureSource;
    use crate::compute::geojson::parse_feature_collection;
    use crate::compute::validation::retain_valid_features;
    use crate::config::FeedConfig;
    use crate::error::{EcomapError, Result};
    use ecomap_types::feature::FeatureCollection;
    use reqwest::Client;
    use std::fmt;

    /// Polls `GET <endpoint>` and decodes the GeoJSON body.
    #[derive(Clone)]
    pub struct HttpFeatureSource {
        client: Client,
        endpoint: String,
    }

    impl HttpFeatureSource {
        pub fn new(endpoint: impl Into<String>) -> Self {
            Self {
                client: Client::new(),
                endpoint: endpoint.into(),
            }
        }

        /// Build a source from the feed settings, applying the request
        /// timeout when one is configured.
        pub fn from_config(config: &FeedConfig) -> Result<Self> {
            config.validate().map_err(EcomapError::Config)?;

            let mut builder = Client::builder();
            if let Some(timeout) = config.request_timeout() {
                builder = builder.timeout(timeout);
            }
            let client = builder
                .build()
                .map_err(|e| EcomapError::Network(format!("Failed to create HTTP client: {}", e)))?;

            Ok(Self {
                client,
                endpoint: config.endpoint.clone(),
            })
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    impl fmt::Debug for HttpFeatureSource {
        fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.debug_struct("HttpFeatureSource")
                .field("endpoint", &self.endpoint)
                .finish()
        }
    }

    impl FeatureSource for HttpFeatureSource {
        async fn fetch_snapshot(&self) -> Result<FeatureCollection> {
            let response = self
                .client
                .get(&self.endpoint)
                .send()
                .await
                .map_err(|e| EcomapError::Network(format!("GET {}: {}", self.endpoint, e)))?;

            let status = response.status();
            if !status.is_success() {
                return Err(EcomapError::HttpStatus {
                    url: self.endpoint.clone(),
                    status: status.as_u16(),
                });
            }

            let body = response.text().await?;
            let collection = parse_feature_collection(&body)?;
            let (valid, dropped) = retain_valid_features(&collection);
            if dropped > 0 {
                log::debug!(
                    "Dropped {} of {} features from {}",
                    dropped,
                    collection.len(),
                    self.endpoint
                );
            }
            Ok(valid)
        }
    }
}
