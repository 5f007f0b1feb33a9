//! Matching recorded trips to candidate street routes

use thiserror::Error;

use super::top_k::top_k_paths;
use crate::model::{CityMap, Trip};
use crate::routing::AllPairsPaths;
use crate::{Error as EngineError, Path};

/// Reasons a trip produces no candidate routes
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum TripRejection {
    #[error("trip distance is zero")]
    ZeroDistance,
    #[error("dropoff time is not after pickup time")]
    InvalidTimes,
    #[error("pickup or dropoff is not near any intersection")]
    Unmapped,
    #[error("pickup and dropoff snap to the same intersection")]
    SameEndpoints,
    #[error("trip distance {0:.3} is below the minimum")]
    TooShort(f64),
}

/// A route that may explain a trip
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateRoute {
    pub path: Path,
    /// Route length in miles
    pub cost: f32,
    /// Inverse of the gap between route length and trip distance
    pub weight: f32,
    /// Speed implied by the route length and trip duration, in mph
    pub speed: f64,
}

/// Turns trips into weighted candidate routes over a [`CityMap`] with
/// all-pairs paths attached
#[derive(Debug, Clone)]
pub struct TripMatcher<'a> {
    city: &'a CityMap,
    paths: &'a AllPairsPaths,
    k: usize,
    min_distance: f64,
    max_speed: f64,
}

impl<'a> TripMatcher<'a> {
    pub const DEFAULT_K: usize = 20;
    pub const DEFAULT_MIN_DISTANCE: f64 = 1.0;
    pub const DEFAULT_MAX_SPEED: f64 = 80.0;

    /// # Errors
    ///
    /// Returns [`EngineError::PathsNotComputed`] if `city` has no all-pairs data
    pub fn new(city: &'a CityMap) -> Result<Self, EngineError> {
        let paths = city.paths().ok_or(EngineError::PathsNotComputed)?;
        Ok(Self {
            city,
            paths,
            k: Self::DEFAULT_K,
            min_distance: Self::DEFAULT_MIN_DISTANCE,
            max_speed: Self::DEFAULT_MAX_SPEED,
        })
    }

    #[must_use]
    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k;
        self
    }

    /// Trips must be strictly longer than this many miles
    #[must_use]
    pub fn with_min_distance(mut self, miles: f64) -> Self {
        self.min_distance = miles;
        self
    }

    /// Candidates implying a faster speed (mph) are dropped
    #[must_use]
    pub fn with_max_speed(mut self, mph: f64) -> Self {
        self.max_speed = mph;
        self
    }

    /// Candidate routes for `trip`, best length match first
    #[allow(clippy::cast_possible_truncation)]
    pub fn match_trip(&self, trip: &Trip) -> Result<Vec<CandidateRoute>, TripRejection> {
        if trip.distance < 1e-6 {
            return Err(TripRejection::ZeroDistance);
        }
        let hours = trip.duration_hours().ok_or(TripRejection::InvalidTimes)?;

        let (Some(src), Some(dst)) = (
            self.city.nearest_node(trip.pickup),
            self.city.nearest_node(trip.dropoff),
        ) else {
            return Err(TripRejection::Unmapped);
        };
        if src == dst {
            return Err(TripRejection::SameEndpoints);
        }
        if trip.distance <= self.min_distance {
            return Err(TripRejection::TooShort(trip.distance));
        }

        let distance = trip.distance as f32;
        let routes = top_k_paths(self.paths, self.k, src, dst, distance);
        let candidates = routes
            .into_iter()
            .filter_map(|path| {
                let cost = self.city.graph().path_cost(&path)?;
                let closeness = (cost - distance).abs();
                let weight = 1.0 / (closeness + if closeness == 0.0 { 1e-5 } else { 0.0 });
                let speed = f64::from(cost) / hours;
                if speed > self.max_speed {
                    log::trace!("Dropping route of {cost:.3} miles: {speed:.1} mph");
                    return None;
                }
                Some(CandidateRoute {
                    path,
                    cost,
                    weight,
                    speed,
                })
            })
            .collect();
        Ok(candidates)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loading::CityMapConfig;
    use crate::model::{Location, Street, StreetGraph};

    /// Two-way street along a meridian, one intersection every 0.01 degree
    /// (about 0.69 miles), with street weights set to the real distance
    fn avenue() -> CityMap {
        let mut graph = StreetGraph::with_capacity(6, 10);
        for id in 0..6 {
            graph
                .add_intersection(id, Location::new(40.70 + id as f64 * 0.01, -74.0))
                .unwrap();
        }
        let mut street = 0;
        for id in 0..5 {
            let miles = crate::spatial::distance(
                graph.intersection(id).unwrap(),
                graph.intersection(id + 1).unwrap(),
            ) as f32;
            graph.add_street(street, Street::new(id, id + 1), miles).unwrap();
            graph.add_street(street + 1, Street::new(id + 1, id), miles).unwrap();
            street += 2;
        }
        let mut city = CityMap::from_graph(graph, &CityMapConfig::default());
        city.build_all_shortest_paths(|_, _| {});
        city
    }

    fn trip(from: usize, to: usize, distance: f64, seconds: u32) -> Trip {
        Trip {
            pickup: Location::new(40.70 + from as f64 * 0.01, -74.0),
            dropoff: Location::new(40.70 + to as f64 * 0.01, -74.0),
            pickup_time: 1_000,
            dropoff_time: 1_000 + seconds,
            distance,
        }
    }

    #[test]
    fn requires_paths() {
        let graph = StreetGraph::with_capacity(1, 0);
        let city = CityMap::from_graph(graph, &CityMapConfig::default());
        assert!(matches!(
            TripMatcher::new(&city),
            Err(EngineError::PathsNotComputed)
        ));
    }

    #[test]
    fn noisy_trips_are_rejected() {
        let city = avenue();
        let matcher = TripMatcher::new(&city).unwrap();
        assert_eq!(
            matcher.match_trip(&trip(0, 3, 0.0, 600)),
            Err(TripRejection::ZeroDistance)
        );
        assert_eq!(
            matcher.match_trip(&trip(0, 3, 2.0, 0)),
            Err(TripRejection::InvalidTimes)
        );
        assert_eq!(
            matcher.match_trip(&trip(2, 2, 2.0, 600)),
            Err(TripRejection::SameEndpoints)
        );
        assert_eq!(
            matcher.match_trip(&trip(0, 1, 0.7, 600)),
            Err(TripRejection::TooShort(0.7))
        );

        let mut far = trip(0, 3, 2.0, 600);
        far.pickup = Location::new(45.0, -70.0);
        assert_eq!(matcher.match_trip(&far), Err(TripRejection::Unmapped));
    }

    #[test]
    fn candidates_carry_weight_and_speed() {
        let city = avenue();
        let matcher = TripMatcher::new(&city).unwrap();
        // 0 -> 3 is about 2.07 miles, driven in ten minutes
        let candidates = matcher.match_trip(&trip(0, 3, 2.07, 600)).unwrap();
        assert!(!candidates.is_empty());
        let best = &candidates[0];
        assert_eq!(best.path, vec![0, 1, 2, 3]);
        assert!((best.speed - f64::from(best.cost) * 6.0).abs() < 1e-6);
        assert!(best.weight > 10.0);
        assert!(candidates.iter().all(|candidate| candidate.speed <= 80.0));
    }

    #[test]
    fn fast_routes_are_dropped() {
        let city = avenue();
        let matcher = TripMatcher::new(&city).unwrap().with_max_speed(10.0);
        // over two miles in one minute
        assert_eq!(matcher.match_trip(&trip(0, 3, 2.07, 60)), Ok(Vec::new()));
    }
}
