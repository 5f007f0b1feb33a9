//! Distance metrics over latitude/longitude pairs

use crate::model::Location;

/// Earth radius used by the great-circle distance, in miles
pub const EARTH_RADIUS_MILES: f64 = 3961.0;

/// Great-circle (haversine) distance in miles
pub fn distance(src: Location, dst: Location) -> f64 {
    let lat1 = src.lat.to_radians();
    let lat2 = dst.lat.to_radians();
    let d_lat = ((lat2 - lat1) / 2.0).sin();
    let d_lon = ((dst.lon - src.lon).to_radians() / 2.0).sin();
    let a = d_lat * d_lat + d_lon * d_lon * lat1.cos() * lat2.cos();
    2.0 * EARTH_RADIUS_MILES * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Squared planar distance in degree space with longitude scaled by `ratio`.
///
/// Only meaningful for comparing candidates around the same point.
#[inline]
pub fn pseudo_distance(src: Location, dst: Location, ratio: f64) -> f64 {
    let d0 = src.lat - dst.lat;
    let d1 = (src.lon - dst.lon) * ratio;
    d0 * d0 + d1 * d1
}

/// Length of one degree of longitude over one degree of latitude around
/// `center`, the longitude scale for [`pseudo_distance`]
pub fn lon_lat_ratio(center: Location) -> f64 {
    let d_lat = distance(
        Location::new(center.lat - 0.5, center.lon),
        Location::new(center.lat + 0.5, center.lon),
    );
    let d_lon = distance(
        Location::new(center.lat, center.lon - 0.5),
        Location::new(center.lat, center.lon + 0.5),
    );
    if d_lat > 0.0 { d_lon / d_lat } else { 1.0 }
}
