//! Data model of the speed estimation engine
//!
//! Contains the directed street graph, per-street speed statistics and the
//! [`CityMap`] tying them together with the spatial index and cached routes.

pub mod city_map;
pub mod stats;
pub mod streets;
pub mod trip;

pub use city_map::CityMap;
pub use stats::{IntersectionProperty, SpeedVector};
pub use streets::{Bounds, EdgeProperty, Location, Street, StreetGraph};
pub use trip::Trip;
