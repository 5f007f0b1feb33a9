mod state;
pub mod stop;

use std::collections::BinaryHeap;

use fixedbitset::FixedBitSet;
use petgraph::visit::EdgeRef;

use self::state::State;
pub use stop::{Exhaustive, StopAt, StopAtAll, StopCondition};

use super::path::forward_path;
use crate::{IntersectionId, Path, StreetGraph, UNREACHABLE_DISTANCE};

/// Dijkstra's algorithm from `start`, writing the shortest-path tree into
/// `predecessors` and `distances` (one slot per intersection).
///
/// Unreached nodes keep `predecessors[v] == v` and `distances[v] == f32::MAX`.
/// `stop` is consulted every time a node is settled; returns `true` if it
/// ended the search early.
#[allow(clippy::cast_possible_truncation)]
pub fn dijkstra<S>(
    graph: &StreetGraph,
    start: IntersectionId,
    predecessors: &mut [u32],
    distances: &mut [f32],
    stop: &mut S,
) -> bool
where
    S: StopCondition + ?Sized,
{
    let node_count = graph.intersection_count();
    debug_assert_eq!(predecessors.len(), node_count);
    debug_assert_eq!(distances.len(), node_count);

    for (node, predecessor) in predecessors.iter_mut().enumerate() {
        *predecessor = node as u32;
    }
    distances.fill(f32::MAX);

    if start >= node_count {
        return false;
    }

    let mut settled = FixedBitSet::with_capacity(node_count);
    let mut heap = BinaryHeap::new();

    // Start node has distance 0
    distances[start] = 0.0;
    heap.push(State {
        cost: 0.0,
        node: start,
    });

    while let Some(State { cost, node }) = heap.pop() {
        // Stale entry, a cheaper one was already settled
        if settled.put(node) {
            continue;
        }

        if stop.on_settled(node).is_break() {
            return true;
        }

        for edge in graph.edges(node) {
            let next = edge.target().index();
            if settled.contains(next) {
                continue;
            }
            let next_cost = cost + edge.weight().weight;
            if next_cost < distances[next] {
                distances[next] = next_cost;
                predecessors[next] = node as u32;
                heap.push(State {
                    cost: next_cost,
                    node: next,
                });
            }
        }
    }

    false
}

/// Owned single-source result of [`dijkstra`]
#[derive(Debug, Clone)]
pub struct ShortestPathTree {
    pub source: IntersectionId,
    pub predecessors: Vec<u32>,
    pub distances: Vec<f32>,
}

impl ShortestPathTree {
    /// Run a search from `source` until `stop` fires or the graph is exhausted
    pub fn compute<S>(graph: &StreetGraph, source: IntersectionId, stop: &mut S) -> (Self, bool)
    where
        S: StopCondition + ?Sized,
    {
        let node_count = graph.intersection_count();
        let mut tree = Self {
            source,
            predecessors: vec![0; node_count],
            distances: vec![f32::MAX; node_count],
        };
        let stopped = dijkstra(
            graph,
            source,
            &mut tree.predecessors,
            &mut tree.distances,
            stop,
        );
        (tree, stopped)
    }

    /// Distance to `node`, `None` when it was not reached
    pub fn distance(&self, node: IntersectionId) -> Option<f32> {
        self.distances
            .get(node)
            .copied()
            .filter(|&distance| distance < UNREACHABLE_DISTANCE)
    }

    pub fn is_reached(&self, node: IntersectionId) -> bool {
        self.distance(node).is_some()
    }

    /// Path from the source to `node`, source first
    pub fn path_to(&self, node: IntersectionId) -> Option<Path> {
        self.distance(node)?;
        forward_path(&self.predecessors, self.source, node)
    }
}
