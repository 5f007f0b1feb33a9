//! Algorithms built on top of the precomputed shortest paths

pub mod matching;
pub mod top_k;

pub use matching::{CandidateRoute, TripMatcher, TripRejection};
pub use top_k::top_k_paths;
