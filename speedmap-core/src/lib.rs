//! Road-network engine for estimating per-street traffic speeds.
//!
//! GPS trips are snapped onto a directed street graph, matched against
//! candidate routes of plausible length, and the implied speeds are
//! accumulated per street.

pub mod algo;
pub mod error;
pub mod loading;
pub mod model;
pub mod prelude;
pub mod routing;
pub mod spatial;

pub use error::Error;
pub use loading::{CityMapConfig, create_city_map, load_street_graph, save_street_graph};
pub use model::{CityMap, IntersectionProperty, Location, SpeedVector, Street, StreetGraph, Trip};
pub use routing::AllPairsPaths;

/// Index of an intersection (graph node)
pub type IntersectionId = usize;
/// Index of a street (directed graph edge)
pub type StreetId = usize;
/// Sequence of intersections
pub type Path = Vec<IntersectionId>;

/// Angular size of a spatial grid cell in degrees (~111 m)
pub const GRID_DEGREE: f64 = 0.001;

/// Largest great-circle distance (miles) accepted when snapping a point
/// through the k-d tree fallback
pub const MAX_SNAP_DISTANCE: f64 = 0.35;

/// Distances at or above this value mean "not reachable"
pub const UNREACHABLE_DISTANCE: f32 = 1e38;
