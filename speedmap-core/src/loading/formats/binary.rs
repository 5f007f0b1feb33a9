//! Compact binary graph: `i32` node count, `i32` edge count (negative when
//! weights follow each edge), `f64` lat/lon pairs, then `i32` src/dst pairs
//! with an optional `f32` weight.

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

use super::{RecordReader, count, ensure_len};
use crate::model::{Location, Street, StreetGraph};
use crate::spatial::distance;
use crate::Error;

const NODE_RECORD: u64 = 16;
const EDGE_RECORD: u64 = 8;
const WEIGHT_FIELD: u64 = 4;

#[allow(clippy::cast_possible_truncation)]
pub fn load_binary(path: &Path) -> Result<StreetGraph, Error> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = RecordReader::new(BufReader::new(file));

    let node_count = count(reader.i32()?.into(), "intersection")?;
    let raw_edges = reader.i32()?;
    let has_weights = raw_edges < 0;
    let edge_count = count(i64::from(raw_edges).abs(), "street")?;

    let edge_record = EDGE_RECORD + if has_weights { WEIGHT_FIELD } else { 0 };
    ensure_len(
        file_len,
        8 + node_count as u64 * NODE_RECORD + edge_count as u64 * edge_record,
        "binary graph",
    )?;

    let mut graph = StreetGraph::with_capacity(node_count, edge_count);
    reader.section("intersection records");
    for id in 0..node_count {
        let lat = reader.f64()?;
        let lon = reader.f64()?;
        graph.add_intersection(id, Location::new(lat, lon))?;
    }

    reader.section("street records");
    for id in 0..edge_count {
        let src = node_id(reader.i32()?, node_count)?;
        let dst = node_id(reader.i32()?, node_count)?;
        let weight = if has_weights {
            reader.f32()?
        } else {
            street_length(&graph, src, dst)?
        };
        graph.add_street(id, Street::new(src, dst), weight)?;
    }

    log::info!(
        "Loaded binary graph {}: {node_count} intersections, {edge_count} streets{}",
        path.display(),
        if has_weights { " with weights" } else { "" }
    );
    graph.finalize();
    Ok(graph)
}

/// Writes `graph` with weights, so the negative edge count form
#[allow(clippy::cast_possible_truncation, clippy::cast_possible_wrap)]
pub fn save_binary(graph: &StreetGraph, path: &Path) -> Result<(), Error> {
    let node_count = i32::try_from(graph.intersection_count())
        .map_err(|_| Error::InvalidData("Too many intersections for the binary format".into()))?;
    let edge_count = i32::try_from(graph.street_count())
        .map_err(|_| Error::InvalidData("Too many streets for the binary format".into()))?;

    let mut writer = BufWriter::new(File::create(path)?);
    writer.write_all(&node_count.to_le_bytes())?;
    writer.write_all(&(-edge_count).to_le_bytes())?;
    for location in graph.intersections() {
        writer.write_all(&location.lat.to_le_bytes())?;
        writer.write_all(&location.lon.to_le_bytes())?;
    }
    for (id, street) in graph.streets().iter().enumerate() {
        let weight = graph
            .street_property(id)
            .map(|props| props.weight)
            .unwrap_or_default();
        writer.write_all(&(street.src as i32).to_le_bytes())?;
        writer.write_all(&(street.dst as i32).to_le_bytes())?;
        writer.write_all(&weight.to_le_bytes())?;
    }
    writer.flush()?;
    Ok(())
}

pub(crate) fn node_id(raw: i32, node_count: usize) -> Result<usize, Error> {
    usize::try_from(raw)
        .ok()
        .filter(|&id| id < node_count)
        .ok_or_else(|| Error::InvalidData(format!("Intersection id {raw} out of range 0..{node_count}")))
}

/// Great-circle length of the street between two placed intersections
#[allow(clippy::cast_possible_truncation)]
pub(crate) fn street_length(graph: &StreetGraph, src: usize, dst: usize) -> Result<f32, Error> {
    match (graph.intersection(src), graph.intersection(dst)) {
        (Some(from), Some(to)) => Ok(distance(from, to) as f32),
        _ => Err(Error::InvalidNodeIndex),
    }
}
