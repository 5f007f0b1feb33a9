//! Street network model

pub mod components;
pub mod network;

pub use components::{Bounds, EdgeProperty, Location, Street};
pub use network::StreetGraph;
