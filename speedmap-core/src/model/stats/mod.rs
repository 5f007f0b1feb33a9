//! Per-street speed statistics

pub mod intersection;
pub mod vector;

pub use intersection::IntersectionProperty;
pub use vector::SpeedVector;
