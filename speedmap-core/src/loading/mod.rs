//! This module is responsible for reading and writing street graphs, speed
//! statistics and shortest-path caches, and for building a [`CityMap`](crate::CityMap)
//! from a configuration.

mod builder;
mod config;
pub mod formats;
mod paths_cache;
mod vectors;

pub use builder::{create_city_map, load_street_graph, save_street_graph};
pub use config::CityMapConfig;
pub use formats::binary::{load_binary, save_binary};
pub use formats::osrm::load_osrm;
pub use formats::text::{load_text, save_text};
pub use paths_cache::{load_paths, save_paths};
pub use vectors::{load_vectors, save_vectors};
