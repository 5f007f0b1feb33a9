use std::path::{Path, PathBuf};

use anyhow::Context;
use serde::Deserialize;
use speedmap_core::CityMapConfig;

/// Settings file layout:
///
/// ```toml
/// log_level = "debug"
///
/// [city]
/// graph_path = "data/manhattan.bin"
/// paths_cache = "data/manhattan.paths"
/// grid_degree = 0.001
/// max_snap_distance = 0.35
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub log_level: Option<String>,
    pub city: CityMapConfig,
}

impl AppConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        toml::from_str(&text).with_context(|| format!("parsing config {}", path.display()))
    }

    /// Command-line values win over the file
    pub fn apply_overrides(
        &mut self,
        graph: Option<PathBuf>,
        paths_cache: Option<PathBuf>,
        log_level: Option<String>,
    ) {
        if let Some(graph) = graph {
            self.city.graph_path = graph;
        }
        if paths_cache.is_some() {
            self.city.paths_cache = paths_cache;
        }
        if log_level.is_some() {
            self.log_level = log_level;
        }
    }
}
