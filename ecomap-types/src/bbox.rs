use serde::{Deserialize, Serialize};

/// A latitude/longitude pair as exchanged with the host map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lng: f64,
}

impl LatLng {
    pub fn new(lat: f64, lng: f64) -> Self {
        Self { lat, lng }
    }

    /// Build from a `[lng, lat]` pair, the GeoJSON coordinate order.
    pub fn from_lng_lat(coordinates: [f64; 2]) -> Self {
        Self {
            lat: coordinates[1],
            lng: coordinates[0],
        }
    }
}

/// A geographic rectangle in degrees.
///
/// `west > east` is allowed and means the box crosses the antimeridian.
///
/// # Examples
///
/// ```
/// use ecomap_types::bbox::BoundingBox;
///
/// let pacific = BoundingBox::new(170.0, -10.0, -170.0, 10.0);
/// assert!(pacific.crosses_antimeridian());
/// assert!(pacific.contains(175.0, 0.0));
/// assert!(pacific.contains(-175.0, 0.0));
/// assert!(!pacific.contains(0.0, 0.0));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
}

impl BoundingBox {
    pub fn new(west: f64, south: f64, east: f64, north: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
        }
    }

    /// The whole world, `[-180, -90, 180, 90]`.
    pub fn world() -> Self {
        Self::new(-180.0, -90.0, 180.0, 90.0)
    }

    /// Build from `[west, south, east, north]`.
    pub fn from_array(bbox: [f64; 4]) -> Self {
        Self::new(bbox[0], bbox[1], bbox[2], bbox[3])
    }

    pub fn to_array(&self) -> [f64; 4] {
        [self.west, self.south, self.east, self.north]
    }

    pub fn crosses_antimeridian(&self) -> bool {
        self.west > self.east
    }

    /// Longitude span in degrees, accounting for antimeridian crossing.
    pub fn width(&self) -> f64 {
        if self.crosses_antimeridian() {
            360.0 - (self.west - self.east)
        } else {
            self.east - self.west
        }
    }

    /// Point-in-box test; boundaries are inclusive.
    pub fn contains(&self, lng: f64, lat: f64) -> bool {
        if lat < self.south || lat > self.north {
            return false;
        }
        if self.crosses_antimeridian() {
            lng >= self.west || lng <= self.east
        } else {
            lng >= self.west && lng <= self.east
        }
    }

    /// Centre of the box, wrapping across the antimeridian when needed.
    pub fn center(&self) -> LatLng {
        let lat = (self.south + self.north) / 2.0;
        let mut lng = self.west + self.width() / 2.0;
        if lng > 180.0 {
            lng -= 360.0;
        }
        LatLng::new(lat, lng)
    }
}
