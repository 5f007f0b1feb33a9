mod config;

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use geo::Point;
use rayon::prelude::*;
use serde::Deserialize;
use speedmap_core::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use crate::config::AppConfig;

#[derive(Parser, Debug)]
#[command(author, version, about = "Street speed estimation from trip records")]
struct Cli {
    /// TOML settings file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Street graph (`.txt`, `.osrm` or binary)
    #[arg(long)]
    graph: Option<PathBuf>,

    /// All-pairs cache, mapped when present and written when missing
    #[arg(long)]
    paths_cache: Option<PathBuf>,

    /// Log filter, e.g. `info` or `speedmap_core=debug`
    #[arg(long)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print graph size and extent
    Info,
    /// Compute all-pairs shortest paths and write the cache
    Precompute,
    /// Snap `lat,lon` points to their nearest intersections
    Snap {
        #[arg(required = true)]
        points: Vec<String>,
    },
    /// Shortest path between two intersections
    Route { from: IntersectionId, to: IntersectionId },
    /// Routes between two intersections with length closest to a distance
    TopK {
        from: IntersectionId,
        to: IntersectionId,
        /// Target length in miles
        distance: f32,
        #[arg(short, default_value_t = TripMatcher::DEFAULT_K)]
        k: usize,
    },
    /// Match trips onto the network and accumulate per-street speeds
    Estimate {
        /// CSV with pickup_time, dropoff_time, pickup_lat, pickup_lon,
        /// dropoff_lat, dropoff_lon and distance columns
        trips: PathBuf,
        /// Where to write the speed vectors
        #[arg(long)]
        vectors: PathBuf,
        /// Also append a per-street speed line to this file
        #[arg(long)]
        speeds: Option<PathBuf>,
        /// Label of the speed line
        #[arg(long, default_value = "speeds")]
        label: String,
        /// Start from previously saved vectors
        #[arg(long)]
        resume: Option<PathBuf>,
        #[arg(short, default_value_t = TripMatcher::DEFAULT_K)]
        k: usize,
    },
    /// Rewrite the street graph in the format named by the output extension
    Convert { output: PathBuf },
}

#[derive(Debug, Deserialize)]
struct TripRecord {
    pickup_time: u32,
    dropoff_time: u32,
    pickup_lat: f64,
    pickup_lon: f64,
    dropoff_lat: f64,
    dropoff_lon: f64,
    distance: f64,
}

impl From<&TripRecord> for Trip {
    fn from(record: &TripRecord) -> Self {
        Trip {
            pickup: Location::new(record.pickup_lat, record.pickup_lon),
            dropoff: Location::new(record.dropoff_lat, record.dropoff_lon),
            pickup_time: record.pickup_time,
            dropoff_time: record.dropoff_time,
            distance: record.distance,
        }
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AppConfig::from_file(path)?,
        None => AppConfig::default(),
    };
    config.apply_overrides(cli.graph, cli.paths_cache, cli.log_level);
    init_tracing(config.log_level.as_deref());

    if config.city.graph_path.as_os_str().is_empty() {
        bail!("no street graph given, pass --graph or set city.graph_path");
    }

    match cli.command {
        Command::Info => info_command(&config),
        Command::Precompute => precompute(&config),
        Command::Snap { points } => snap(&config, &points),
        Command::Route { from, to } => route(&config, from, to),
        Command::TopK { from, to, distance, k } => top_k(&config, from, to, distance, k),
        Command::Estimate {
            trips,
            vectors,
            speeds,
            label,
            resume,
            k,
        } => estimate(&config, &trips, &vectors, speeds.as_deref(), &label, resume.as_deref(), k),
        Command::Convert { output } => convert(&config, &output),
    }
}

/// `RUST_LOG` wins, then the configured level, then `info`
fn init_tracing(level: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.unwrap_or("info")));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// City map without the all-pairs cache, for commands that never need it
fn open_city(config: &AppConfig) -> anyhow::Result<CityMap> {
    let mut city_config = config.city.clone();
    city_config.paths_cache = None;
    create_city_map(&city_config).context("loading city map")
}

/// City map with all-pairs data, mapped, computed and cached, or computed in memory
fn open_city_with_paths(config: &AppConfig) -> anyhow::Result<CityMap> {
    let mut city = create_city_map(&config.city).context("loading city map")?;
    if city.paths().is_none() {
        warn!("No paths cache configured, computing shortest paths in memory");
        city.build_all_shortest_paths(report_progress);
    }
    Ok(city)
}

fn report_progress(done: usize, total: usize) {
    if done == total || done % 1000 == 0 {
        info!(done, total, "all-pairs shortest paths");
    }
}

fn info_command(config: &AppConfig) -> anyhow::Result<()> {
    let city = open_city(config)?;
    let bounds = city.graph().bounds();
    println!("intersections: {}", city.intersection_count());
    println!("streets:       {}", city.street_count());
    println!(
        "bounds:        ({:.6}, {:.6}) - ({:.6}, {:.6})",
        bounds.min.lat, bounds.min.lon, bounds.max.lat, bounds.max.lon
    );
    let extent = bounds.to_rect();
    println!(
        "extent:        {:.6} x {:.6} degrees (lat x lon)",
        extent.height(),
        extent.width()
    );
    println!("lon/lat ratio: {:.6}", city.spatial_index().ratio());
    let [width, height] = city.spatial_index().grid().size();
    println!("grid:          {width} x {height}");
    Ok(())
}

fn precompute(config: &AppConfig) -> anyhow::Result<()> {
    let Some(cache) = &config.city.paths_cache else {
        bail!("precompute needs --paths-cache or city.paths_cache");
    };
    let mut city = open_city(config)?;
    city.build_all_shortest_paths(report_progress);
    if let Some(paths) = city.paths() {
        save_paths(paths, cache)
            .with_context(|| format!("writing paths cache {}", cache.display()))?;
    }
    Ok(())
}

fn parse_point(raw: &str) -> anyhow::Result<Point<f64>> {
    let Some((lat, lon)) = raw.split_once(',') else {
        bail!("expected `lat,lon`, got {raw:?}");
    };
    let lat: f64 = lat.trim().parse().with_context(|| format!("latitude in {raw:?}"))?;
    let lon: f64 = lon.trim().parse().with_context(|| format!("longitude in {raw:?}"))?;
    Ok(Point::new(lon, lat))
}

fn snap(config: &AppConfig, points: &[String]) -> anyhow::Result<()> {
    let points = points
        .iter()
        .map(|raw| parse_point(raw))
        .collect::<anyhow::Result<Vec<_>>>()?;
    let city = open_city(config)?;

    let snapped: Vec<Option<IntersectionId>> = points
        .par_iter()
        .map(|point| city.nearest_node(Location::from(*point)))
        .collect();

    for (point, node) in points.iter().zip(snapped) {
        match node {
            Some(node) => println!("{:.6},{:.6}\t{node}", point.y(), point.x()),
            None => println!("{:.6},{:.6}\tunmapped", point.y(), point.x()),
        }
    }
    Ok(())
}

fn format_path(path: &[IntersectionId]) -> String {
    path.iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(" ")
}

fn route(config: &AppConfig, from: IntersectionId, to: IntersectionId) -> anyhow::Result<()> {
    let city = open_city(config)?;
    match city.shortest_path(from, to) {
        Some((path, cost)) => println!("{cost:.4}\t{}", format_path(&path)),
        None => println!("no path from {from} to {to}"),
    }
    Ok(())
}

fn top_k(
    config: &AppConfig,
    from: IntersectionId,
    to: IntersectionId,
    distance: f32,
    k: usize,
) -> anyhow::Result<()> {
    let city = open_city_with_paths(config)?;
    let routes = city.top_k(k, from, to, distance)?;
    if routes.is_empty() {
        println!("no routes from {from} to {to}");
    }
    for path in routes {
        let cost = city.graph().path_cost(&path).unwrap_or(f32::NAN);
        println!("{cost:.4}\t{}", format_path(&path));
    }
    Ok(())
}

#[allow(clippy::cast_possible_truncation)]
fn estimate(
    config: &AppConfig,
    trips: &Path,
    vectors: &Path,
    speeds: Option<&Path>,
    label: &str,
    resume: Option<&Path>,
    k: usize,
) -> anyhow::Result<()> {
    let mut city = open_city_with_paths(config)?;
    if let Some(previous) = resume {
        load_vectors(&mut city, previous)
            .with_context(|| format!("reading vectors {}", previous.display()))?;
    }

    let records: Vec<TripRecord> = csv::Reader::from_path(trips)
        .with_context(|| format!("opening trips {}", trips.display()))?
        .deserialize()
        .collect::<Result<_, _>>()
        .with_context(|| format!("reading trips {}", trips.display()))?;
    info!(count = records.len(), "Matching trips");

    let matcher = TripMatcher::new(&city)?.with_k(k);
    let outcomes: Vec<_> = records
        .par_iter()
        .map(|record| matcher.match_trip(&Trip::from(record)))
        .collect();

    let mut matched = 0;
    let mut rejected = 0;
    let mut samples = 0;
    for (line, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(candidates) => {
                matched += 1;
                for candidate in candidates {
                    samples += city.record_path_sample(
                        &candidate.path,
                        candidate.speed as f32,
                        candidate.weight,
                    );
                }
            }
            Err(rejection) => {
                rejected += 1;
                debug!(record = line + 1, %rejection, "Trip rejected");
            }
        }
    }
    info!(matched, rejected, samples, "Trips matched");

    save_vectors(&city, vectors)
        .with_context(|| format!("writing vectors {}", vectors.display()))?;
    if let Some(speeds) = speeds {
        let file = File::options()
            .create(true)
            .append(true)
            .open(speeds)
            .with_context(|| format!("opening {}", speeds.display()))?;
        let mut writer = BufWriter::new(file);
        city.export_speeds(&mut writer, label)?;
        writer.flush()?;
    }
    Ok(())
}

fn convert(config: &AppConfig, output: &Path) -> anyhow::Result<()> {
    let graph = load_street_graph(&config.city.graph_path)
        .with_context(|| format!("loading {}", config.city.graph_path.display()))?;
    save_street_graph(&graph, output)
        .with_context(|| format!("writing {}", output.display()))?;
    info!(
        intersections = graph.intersection_count(),
        streets = graph.street_count(),
        "Wrote {}",
        output.display()
    );
    Ok(())
}
