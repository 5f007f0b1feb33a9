//! Whitespace-separated text graph: `nodes edges` header, one `lat lon`
//! line per intersection, one `src dst weight` line per street.
//!
//! Weights in the file are ignored on load and replaced by the great-circle
//! length of the street.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use std::str::FromStr;

use super::binary::street_length;
use super::count;
use crate::model::{Location, Street, StreetGraph};
use crate::Error;

struct Tokens<'a> {
    inner: std::str::SplitAsciiWhitespace<'a>,
}

impl Tokens<'_> {
    fn next<T: FromStr>(&mut self, what: &str) -> Result<T, Error> {
        let token = self
            .inner
            .next()
            .ok_or_else(|| Error::InvalidData(format!("Unexpected end of file reading {what}")))?;
        token
            .parse()
            .map_err(|_| Error::InvalidData(format!("Invalid {what}: {token:?}")))
    }
}

pub fn load_text(path: &Path) -> Result<StreetGraph, Error> {
    let content = std::fs::read_to_string(path)?;
    let graph = parse_text(&content)?;
    log::info!(
        "Loaded text graph {}: {} intersections, {} streets",
        path.display(),
        graph.intersection_count(),
        graph.street_count()
    );
    Ok(graph)
}

fn parse_text(content: &str) -> Result<StreetGraph, Error> {
    let mut tokens = Tokens {
        inner: content.split_ascii_whitespace(),
    };
    let node_count = count(tokens.next("intersection count")?, "intersection")?;
    // a negative count used to flag weights; they are recomputed either way
    let raw_edges: i64 = tokens.next("street count")?;
    let edge_count = raw_edges
        .checked_abs()
        .ok_or_else(|| Error::InvalidData(format!("Invalid street count: {raw_edges}")))
        .and_then(|edges| count(edges, "street"))?;

    let needed = node_count
        .checked_mul(2)
        .zip(edge_count.checked_mul(3))
        .and_then(|(nodes, edges)| nodes.checked_add(edges));
    let available = tokens.inner.clone().count();
    match needed {
        Some(needed) if needed <= available => {}
        _ => {
            return Err(Error::InvalidData(format!(
                "Header announces {node_count} intersections and {edge_count} streets, \
                 file holds {available} values"
            )));
        }
    }

    let mut graph = StreetGraph::with_capacity(node_count, edge_count);
    for id in 0..node_count {
        let lat = tokens.next("latitude")?;
        let lon = tokens.next("longitude")?;
        graph.add_intersection(id, Location::new(lat, lon))?;
    }

    for id in 0..edge_count {
        let src: usize = tokens.next("street source")?;
        let dst: usize = tokens.next("street target")?;
        tokens.next::<f32>("street weight")?;
        if src >= node_count || dst >= node_count {
            return Err(Error::InvalidData(format!(
                "Street {id} references {src} -> {dst}, only {node_count} intersections"
            )));
        }
        let weight = street_length(&graph, src, dst)?;
        graph.add_street(id, Street::new(src, dst), weight)?;
    }

    graph.finalize();
    Ok(graph)
}

/// Write `graph` in the text format, coordinates and weights with six decimals
pub fn save_text(graph: &StreetGraph, path: &Path) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "{} {}", graph.intersection_count(), graph.street_count())?;
    for location in graph.intersections() {
        writeln!(writer, "{:.6} {:.6}", location.lat, location.lon)?;
    }
    for (id, street) in graph.streets().iter().enumerate() {
        let weight = graph
            .street_property(id)
            .map(|props| props.weight)
            .unwrap_or_default();
        writeln!(writer, "{} {} {weight:.6}", street.src, street.dst)?;
    }
    writer.flush()?;
    Ok(())
}
