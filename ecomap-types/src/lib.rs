//! # ecomap-types
//!
//! Core value types shared by the ecomap clustering engine and its hosts:
//!
//! - **Features**: `PointFeature`, `FeatureId`, `FeatureCollection`
//! - **Geometry**: `BoundingBox`, `LatLng`
//!
//! All types are serializable with Serde and interoperate with the `geo`
//! crate's primitives.
//!
//! ## Examples
//!
//! ```rust
//! use ecomap_types::feature::{FeatureId, PointFeature};
//! use ecomap_types::bbox::BoundingBox;
//!
//! let depot = PointFeature::new(FeatureId::from(7), -8.427375, 41.544581);
//! assert!(BoundingBox::world().contains(depot.longitude, depot.latitude));
//! ```

pub mod bbox;
pub mod feature;

pub use bbox::{BoundingBox, LatLng};
pub use feature::{FeatureCollection, FeatureId, PointFeature};
