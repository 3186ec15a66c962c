//! Spherical Web-Mercator projection onto the unit square.
//!
//! `x` grows eastwards from 0 at -180° to 1 at 180°; `y` grows southwards
//! from 0 at the north edge to 1 at the south edge. Latitudes beyond the
//! Mercator limit are clamped into `[0, 1]`.

use std::f64::consts::PI;

/// Longitude in degrees to unit-square x.
#[inline]
pub fn lng_to_x(lng: f64) -> f64 {
    lng / 360.0 + 0.5
}

/// Latitude in degrees to unit-square y.
#[inline]
pub fn lat_to_y(lat: f64) -> f64 {
    let sin = (lat * PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / PI;
    y.clamp(0.0, 1.0)
}

/// Unit-square x back to longitude in degrees.
#[inline]
pub fn x_to_lng(x: f64) -> f64 {
    (x - 0.5) * 360.0
}

/// Unit-square y back to latitude in degrees.
#[inline]
pub fn y_to_lat(y: f64) -> f64 {
    let y2 = (180.0 - y * 360.0) * PI / 180.0;
    360.0 * y2.exp().atan() / PI - 90.0
}

/// Search radius in unit-square units for a pixel radius at `zoom`.
#[inline]
pub fn radius_at_zoom(radius_px: f64, extent: u32, zoom: i32) -> f64 {
    radius_px / (extent as f64 * 2f64.powi(zoom))
}
