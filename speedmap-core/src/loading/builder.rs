use std::path::Path;

use log::info;

use super::config::CityMapConfig;
use super::formats::binary::{load_binary, save_binary};
use super::formats::osrm::load_osrm;
use super::formats::text::{load_text, save_text};
use super::paths_cache::{load_paths, save_paths};
use crate::{CityMap, Error, StreetGraph};

/// Load a street graph, picking the format from the file extension:
/// `.txt` text, `.osrm` OSRM dump, anything else binary
pub fn load_street_graph(path: &Path) -> Result<StreetGraph, Error> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("txt") => load_text(path),
        Some("osrm") => load_osrm(path),
        _ => load_binary(path),
    }
}

/// Write a street graph in the format named by the file extension.
/// OSRM dumps can only be read.
pub fn save_street_graph(graph: &StreetGraph, path: &Path) -> Result<(), Error> {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("txt") => save_text(graph, path),
        Some("osrm") => Err(Error::UnsupportedFormat(format!(
            "cannot write OSRM dumps: {}",
            path.display()
        ))),
        _ => save_binary(graph, path),
    }
}

/// Creates a city map based on the provided configuration
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the graph file is
/// malformed, or the shortest-path cache cannot be read or written
pub fn create_city_map(config: &CityMapConfig) -> Result<CityMap, Error> {
    validate_config(config)?;

    info!("Loading street graph: {}", config.graph_path.display());
    let graph = load_street_graph(&config.graph_path)?;
    let mut city = CityMap::from_graph(graph, config);

    if let Some(cache) = &config.paths_cache {
        if cache.exists() {
            let paths = load_paths(cache, city.intersection_count())?;
            city.attach_paths(paths)?;
        } else {
            info!("No shortest-path cache at {}, computing", cache.display());
            city.build_all_shortest_paths(|done, total| {
                if done == total || done % 1000 == 0 {
                    log::debug!("Shortest paths: {done}/{total}");
                }
            });
            if let Some(paths) = city.paths() {
                save_paths(paths, cache)?;
            }
        }
    }

    info!("City map created successfully");
    Ok(city)
}

fn validate_config(config: &CityMapConfig) -> Result<(), Error> {
    if !config.graph_path.is_file() {
        return Err(Error::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("Graph file not found: {}", config.graph_path.display()),
        )));
    }

    if !(config.grid_degree.is_finite() && config.grid_degree > 0.0) {
        return Err(Error::InvalidData(format!(
            "Grid cell size must be positive, got {}",
            config.grid_degree
        )));
    }

    if !(config.max_snap_distance.is_finite() && config.max_snap_distance >= 0.0) {
        return Err(Error::InvalidData(format!(
            "Snap distance must be non-negative, got {}",
            config.max_snap_distance
        )));
    }

    if let Some(parent) = config
        .paths_cache
        .as_deref()
        .and_then(Path::parent)
        .filter(|parent| !parent.as_os_str().is_empty())
    {
        if !parent.is_dir() {
            return Err(Error::InvalidData(format!(
                "Cache directory does not exist: {}",
                parent.display()
            )));
        }
    }

    Ok(())
}
