pub use crate::{GRID_DEGREE, MAX_SNAP_DISTANCE, UNREACHABLE_DISTANCE};

// Re-export key components
pub use crate::algo::matching::{CandidateRoute, TripMatcher, TripRejection};
pub use crate::algo::top_k::top_k_paths;
pub use crate::loading::{
    CityMapConfig, create_city_map, load_paths, load_street_graph, load_vectors, save_binary,
    save_paths, save_street_graph, save_text, save_vectors,
};
pub use crate::model::{
    Bounds, CityMap, EdgeProperty, IntersectionProperty, Location, SpeedVector, Street,
    StreetGraph, Trip,
};
pub use crate::routing::{
    AllPairsPaths, Exhaustive, ShortestPathTree, StopAt, StopAtAll, StopCondition, dijkstra,
    forward_path, trace_back,
};
pub use crate::spatial::SpatialIndex;

// Core types for the street network
pub use crate::Error;
pub use crate::IntersectionId;
pub use crate::Path;
pub use crate::StreetId;
