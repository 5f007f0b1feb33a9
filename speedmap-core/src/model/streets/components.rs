//! Street network components - locations, streets and their properties

use geo::{Point, Rect, coord};

use crate::{IntersectionId, StreetId};

/// Geographic position in degrees
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Location {
    pub lat: f64,
    pub lon: f64,
}

impl Location {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Coordinate along a k-d tree axis: 0 is latitude, anything else longitude
    #[inline]
    pub fn axis(&self, axis: usize) -> f64 {
        if axis == 0 { self.lat } else { self.lon }
    }
}

impl From<Point<f64>> for Location {
    fn from(point: Point<f64>) -> Self {
        Self::new(point.y(), point.x())
    }
}

impl From<Location> for Point<f64> {
    fn from(location: Location) -> Self {
        Point::new(location.lon, location.lat)
    }
}

/// Directed street, identified by its ordered endpoints
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Street {
    pub src: IntersectionId,
    pub dst: IntersectionId,
}

impl Street {
    pub fn new(src: IntersectionId, dst: IntersectionId) -> Self {
        Self { src, dst }
    }

    /// The same street travelled the other way
    pub fn reversed(self) -> Self {
        Self::new(self.dst, self.src)
    }
}

/// Properties carried by each graph edge for pathfinding
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct EdgeProperty {
    /// Traversal cost, usually the street length in miles
    pub weight: f32,
    /// Stable identifier used to key speed statistics
    pub index: StreetId,
}

impl EdgeProperty {
    pub fn new(weight: f32, index: StreetId) -> Self {
        Self { weight, index }
    }
}

/// Bounding box of all intersections
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    pub min: Location,
    pub max: Location,
}

impl Default for Bounds {
    fn default() -> Self {
        Self::empty()
    }
}

impl Bounds {
    /// Inverted box that any location will expand
    pub fn empty() -> Self {
        Self {
            min: Location::new(f64::INFINITY, f64::INFINITY),
            max: Location::new(f64::NEG_INFINITY, f64::NEG_INFINITY),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.min.lat > self.max.lat || self.min.lon > self.max.lon
    }

    pub fn extend(&mut self, location: Location) {
        self.min.lat = self.min.lat.min(location.lat);
        self.min.lon = self.min.lon.min(location.lon);
        self.max.lat = self.max.lat.max(location.lat);
        self.max.lon = self.max.lon.max(location.lon);
    }

    pub fn contains(&self, location: Location) -> bool {
        location.lat >= self.min.lat
            && location.lat <= self.max.lat
            && location.lon >= self.min.lon
            && location.lon <= self.max.lon
    }

    pub fn center(&self) -> Location {
        Location::new(
            (self.min.lat + self.max.lat) * 0.5,
            (self.min.lon + self.max.lon) * 0.5,
        )
    }

    /// `(min_lat, min_lon, max_lat, max_lon)`
    pub fn as_array(&self) -> [f64; 4] {
        [self.min.lat, self.min.lon, self.max.lat, self.max.lon]
    }

    /// The box as a `geo` rectangle, x = longitude
    pub fn to_rect(&self) -> Rect<f64> {
        Rect::new(
            coord! { x: self.min.lon, y: self.min.lat },
            coord! { x: self.max.lon, y: self.max.lat },
        )
    }
}
