//! Pure helpers shared by the index and the feed: coordinate validation,
//! Web-Mercator projection and GeoJSON conversion.

pub mod geojson;
pub mod projection;
pub mod validation;
