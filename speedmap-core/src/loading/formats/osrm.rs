//! OSRM `.osrm` dump: packed node and edge records.
//!
//! ```text
//! i32 node_count
//! node_count x { i32 lat*1e5, i32 lon*1e5, i32 id, u8 bollard, u8 traffic_light, u8[2] }
//! i32 edge_count
//! edge_count x { u32 src, u32 dst, i32 distance, u16 oneway, i32 weight, u16 type,
//!                i32 name_index, u8 roundabout, u8 ignore_in_grid, u8 access_restricted }
//! ```
//!
//! Edge endpoints are external node ids. Two-way edges become two streets.

use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

use hashbrown::HashMap;

use super::{RecordReader, count, ensure_len};
use crate::model::{Location, Street, StreetGraph};
use crate::Error;

const NODE_RECORD: u64 = 16;
const EDGE_RECORD: u64 = 27;
const COORDINATE_SCALE: f64 = 1e-5;

#[derive(Debug, Clone, Copy)]
struct OsrmNode {
    lat: i32,
    lon: i32,
    id: i32,
}

impl OsrmNode {
    fn read<R: Read>(reader: &mut RecordReader<R>) -> Result<Self, Error> {
        let lat = reader.i32()?;
        let lon = reader.i32()?;
        let id = reader.i32()?;
        // bollard, traffic light, padding
        for _ in 0..4 {
            reader.u8()?;
        }
        Ok(Self { lat, lon, id })
    }

    fn location(self) -> Location {
        Location::new(
            f64::from(self.lat) * COORDINATE_SCALE,
            f64::from(self.lon) * COORDINATE_SCALE,
        )
    }
}

#[derive(Debug, Clone, Copy)]
struct OsrmEdge {
    src: u32,
    dst: u32,
    oneway: bool,
    weight: i32,
}

impl OsrmEdge {
    fn read<R: Read>(reader: &mut RecordReader<R>) -> Result<Self, Error> {
        let src = reader.u32()?;
        let dst = reader.u32()?;
        let _distance = reader.i32()?;
        let oneway = reader.u16()? != 0;
        let weight = reader.i32()?;
        let _edge_type = reader.u16()?;
        let _name_index = reader.i32()?;
        // roundabout, ignore in grid, access restricted
        for _ in 0..3 {
            reader.u8()?;
        }
        Ok(Self {
            src,
            dst,
            oneway,
            weight,
        })
    }
}

#[allow(clippy::cast_precision_loss, clippy::cast_possible_wrap)]
pub fn load_osrm(path: &Path) -> Result<StreetGraph, Error> {
    let file = File::open(path)?;
    let file_len = file.metadata()?.len();
    let mut reader = RecordReader::new(BufReader::new(file));

    let node_count = count(reader.i32()?.into(), "intersection")?;
    let nodes_end = 4 + node_count as u64 * NODE_RECORD;
    if file_len < nodes_end + 4 {
        return Err(Error::InvalidData(format!(
            "Truncated OSRM node section: {file_len} bytes, expected at least {}",
            nodes_end + 4
        )));
    }

    reader.section("OSRM node records");
    let nodes = (0..node_count)
        .map(|_| OsrmNode::read(&mut reader))
        .collect::<Result<Vec<_>, _>>()?;
    let index: HashMap<i32, usize> = nodes
        .iter()
        .enumerate()
        .map(|(position, node)| (node.id, position))
        .collect();

    reader.section("OSRM edge count");
    let edge_count = count(reader.i32()?.into(), "edge")?;
    ensure_len(
        file_len,
        nodes_end + 4 + edge_count as u64 * EDGE_RECORD,
        "OSRM dump",
    )?;
    if edge_count == 0 {
        log::warn!("OSRM dump {} has no edges", path.display());
    }

    reader.section("OSRM edge records");
    let edges = (0..edge_count)
        .map(|_| OsrmEdge::read(&mut reader))
        .collect::<Result<Vec<_>, _>>()?;

    let street_count = edges.len() + edges.iter().filter(|edge| !edge.oneway).count();
    let mut graph = StreetGraph::with_capacity(node_count, street_count);
    for (id, node) in nodes.iter().enumerate() {
        graph.add_intersection(id, node.location())?;
    }

    let resolve = |external: u32| {
        index
            .get(&(external as i32))
            .copied()
            .ok_or_else(|| Error::InvalidData(format!("Unknown OSRM node id {external}")))
    };
    let mut street_id = 0;
    for edge in &edges {
        let src = resolve(edge.src)?;
        let dst = resolve(edge.dst)?;
        let weight = edge.weight as f32;
        graph.add_street(street_id, Street::new(src, dst), weight)?;
        street_id += 1;
        if !edge.oneway {
            graph.add_street(street_id, Street::new(dst, src), weight)?;
            street_id += 1;
        }
    }

    log::info!(
        "Loaded OSRM dump {}: {node_count} intersections, {edge_count} edges as {street_count} streets",
        path.display()
    );
    graph.finalize();
    Ok(graph)
}
