use std::path::PathBuf;

use serde::Deserialize;

use crate::{GRID_DEGREE, MAX_SNAP_DISTANCE};

/// Settings for building a [`CityMap`](crate::CityMap)
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct CityMapConfig {
    /// Street graph file; `.txt`, `.osrm` or binary
    pub graph_path: PathBuf,
    /// All-pairs cache file, mapped when present and written when missing
    pub paths_cache: Option<PathBuf>,
    /// Spatial grid cell size in degrees
    pub grid_degree: f64,
    /// Snapping cutoff in miles for the k-d tree fallback
    pub max_snap_distance: f64,
}

impl Default for CityMapConfig {
    fn default() -> Self {
        Self {
            graph_path: PathBuf::new(),
            paths_cache: None,
            grid_degree: GRID_DEGREE,
            max_snap_distance: MAX_SNAP_DISTANCE,
        }
    }
}

impl CityMapConfig {
    pub fn new(graph_path: impl Into<PathBuf>) -> Self {
        Self {
            graph_path: graph_path.into(),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_paths_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.paths_cache = Some(path.into());
        self
    }
}
