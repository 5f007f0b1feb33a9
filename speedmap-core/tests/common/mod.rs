#![allow(dead_code)]

use speedmap_core::prelude::*;
use speedmap_core::spatial::distance;

pub const ORIGIN: Location = Location {
    lat: 40.70,
    lon: -74.00,
};

/// Lattice of `rows` x `cols` intersections `spacing` degrees apart.
///
/// Even rows run two-way, odd rows one-way eastbound, columns two-way.
/// Street weights are great-circle lengths in miles.
pub fn lattice(rows: usize, cols: usize, spacing: f64) -> StreetGraph {
    let id = |row: usize, col: usize| row * cols + col;
    let mut pairs = Vec::new();
    for row in 0..rows {
        for col in 0..cols {
            if col + 1 < cols {
                pairs.push((id(row, col), id(row, col + 1)));
                if row % 2 == 0 {
                    pairs.push((id(row, col + 1), id(row, col)));
                }
            }
            if row + 1 < rows {
                pairs.push((id(row, col), id(row + 1, col)));
                pairs.push((id(row + 1, col), id(row, col)));
            }
        }
    }

    let mut graph = StreetGraph::with_capacity(rows * cols, pairs.len());
    for row in 0..rows {
        for col in 0..cols {
            let location = Location::new(
                ORIGIN.lat + row as f64 * spacing,
                ORIGIN.lon + col as f64 * spacing,
            );
            graph.add_intersection(id(row, col), location).unwrap();
        }
    }
    for (street_id, &(src, dst)) in pairs.iter().enumerate() {
        let miles = distance(
            graph.intersection(src).unwrap(),
            graph.intersection(dst).unwrap(),
        ) as f32;
        graph
            .add_street(street_id, Street::new(src, dst), miles)
            .unwrap();
    }
    graph.finalize();
    graph
}

pub fn city(rows: usize, cols: usize, spacing: f64) -> CityMap {
    CityMap::from_graph(lattice(rows, cols, spacing), &CityMapConfig::default())
}

/// Deterministic pseudo-random sequence in `[0, 1)`
pub fn unit_samples(count: usize) -> impl Iterator<Item = f64> {
    let mut state: u64 = 0x2545_F491_4F6C_DD1D;
    (0..count).map(move |_| {
        state ^= state << 13;
        state ^= state >> 7;
        state ^= state << 17;
        (state >> 11) as f64 / (1u64 << 53) as f64
    })
}
