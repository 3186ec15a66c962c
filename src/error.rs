//! Error types for the clustering engine and the point feed.

use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, EcomapError>;

#[derive(Debug, Error)]
pub enum EcomapError {
    /// Transport failure while fetching the point feed.
    #[error("network error: {0}")]
    Network(String),

    /// The feed endpoint answered with a non-success status.
    #[error("feed endpoint {url} returned HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    /// The feed body could not be decoded into a feature collection.
    #[error("failed to decode feed body: {0}")]
    Decode(String),

    /// Building a cluster index failed; the previous index stays in use.
    #[error("index build failed: {0}")]
    IndexBuild(String),

    /// The cluster id does not belong to the current index build.
    #[error("no cluster with id {0} in this index")]
    UnknownCluster(u64),

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The host map could not answer (typically not initialised yet).
    #[error("host map error: {0}")]
    Host(String),
}

impl EcomapError {
    /// Errors the poll loop recovers from by waiting for the next tick.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            EcomapError::Network(_) | EcomapError::HttpStatus { .. } | EcomapError::Decode(_)
        )
    }
}

impl From<serde_json::Error> for EcomapError {
    fn from(err: serde_json::Error) -> Self {
        EcomapError::Decode(err.to_string())
    }
}

#[cfg(feature = "http")]
impl From<reqwest::Error> for EcomapError {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => EcomapError::HttpStatus {
                url: err
                    .url()
                    .map(|url| url.to_string())
                    .unwrap_or_default(),
                status: status.as_u16(),
            },
            None if err.is_decode() => EcomapError::Decode(err.to_string()),
            None => EcomapError::Network(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(EcomapError::Network("refused".into()).is_transient());
        assert!(
            EcomapError::HttpStatus {
                url: "http://localhost/api/location".into(),
                status: 503
            }
            .is_transient()
        );
        assert!(!EcomapError::IndexBuild("radius".into()).is_transient());
        assert!(!EcomapError::UnknownCluster(42).is_transient());
    }

    #[test]
    fn test_display_messages() {
        let err = EcomapError::HttpStatus {
            url: "http://x/api/location".into(),
            status: 500,
        };
        assert_eq!(
            err.to_string(),
            "feed endpoint http://x/api/location returned HTTP 500"
        );
        assert_eq!(
            EcomapError::UnknownCluster(7).to_string(),
            "no cluster with id 7 in this index"
        );
    }

    #[test]
    fn test_from_serde_json_is_decode() {
        let err: EcomapError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, EcomapError::Decode(_)));
    }
}
