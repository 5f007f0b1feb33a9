//! Precomputed shortest paths between every pair of intersections

use std::sync::atomic::{AtomicUsize, Ordering};

use memmap2::Mmap;
use rayon::prelude::*;

use super::dijkstra::{Exhaustive, dijkstra};
use super::path::{forward_path, trace_back};
use crate::{Error, IntersectionId, Path, StreetGraph, UNREACHABLE_DISTANCE};

const ELEMENT_SIZE: usize = size_of::<u32>();

#[derive(Debug)]
enum Storage {
    /// Freshly computed, exclusively owned
    Owned {
        predecessors: Vec<u32>,
        distances: Vec<f32>,
        transposed: Vec<f32>,
    },
    /// Read-only view over a cache file: predecessors, distances, transposed
    Mapped(Mmap),
}

/// Three row-major N x N matrices: the predecessor row and distance row of
/// each source, plus the distances transposed so that row `dst` holds the
/// distance from every node to `dst`.
#[derive(Debug)]
pub struct AllPairsPaths {
    node_count: usize,
    storage: Storage,
}

impl AllPairsPaths {
    /// Runs one exhaustive search per source, in parallel, then fills the
    /// transposed matrix. `progress(done, total)` is called after each source.
    #[allow(clippy::cast_possible_truncation)]
    pub fn compute<F>(graph: &StreetGraph, progress: F) -> Self
    where
        F: Fn(usize, usize) + Sync,
    {
        let n = graph.intersection_count();
        let cells = n * n;
        let mut predecessors = vec![0u32; cells];
        let mut distances = vec![f32::MAX; cells];
        let mut transposed = vec![f32::MAX; cells];

        if n > 0 {
            log::info!("Computing shortest paths from {n} intersections");
            let done = AtomicUsize::new(0);
            predecessors
                .par_chunks_mut(n)
                .zip(distances.par_chunks_mut(n))
                .enumerate()
                .for_each(|(src, (prev_row, dist_row))| {
                    dijkstra(graph, src, prev_row, dist_row, &mut Exhaustive);
                    progress(done.fetch_add(1, Ordering::Relaxed) + 1, n);
                });

            transposed
                .par_chunks_mut(n)
                .enumerate()
                .for_each(|(dst, row)| {
                    for (src, cell) in row.iter_mut().enumerate() {
                        *cell = distances[src * n + dst];
                    }
                });
            log::info!("All-pairs shortest paths ready");
        }

        Self {
            node_count: n,
            storage: Storage::Owned {
                predecessors,
                distances,
                transposed,
            },
        }
    }

    /// Wraps a mapped cache file laid out as predecessors, distances and
    /// transposed distances, each `node_count^2` four-byte elements.
    pub fn from_mapped(mmap: Mmap, node_count: usize) -> Result<Self, Error> {
        let expected = Self::byte_len(node_count)?;
        if mmap.len() != expected {
            return Err(Error::CacheSizeMismatch {
                expected,
                actual: mmap.len(),
            });
        }
        bytemuck::try_cast_slice::<u8, u32>(&mmap[..])
            .map_err(|err| Error::InvalidData(format!("Misaligned path cache: {err}")))?;

        Ok(Self {
            node_count,
            storage: Storage::Mapped(mmap),
        })
    }

    /// Size in bytes of the cache for `node_count` intersections
    pub fn byte_len(node_count: usize) -> Result<usize, Error> {
        node_count
            .checked_mul(node_count)
            .and_then(|cells| cells.checked_mul(3 * ELEMENT_SIZE))
            .ok_or_else(|| Error::InvalidData(format!("{node_count} intersections overflow")))
    }

    pub fn node_count(&self) -> usize {
        self.node_count
    }

    pub fn is_mapped(&self) -> bool {
        matches!(self.storage, Storage::Mapped(_))
    }

    fn mapped_section(mmap: &Mmap, index: usize, cells: usize) -> &[u8] {
        let len = cells * ELEMENT_SIZE;
        &mmap[index * len..(index + 1) * len]
    }

    pub fn predecessors(&self) -> &[u32] {
        match &self.storage {
            Storage::Owned { predecessors, .. } => predecessors,
            Storage::Mapped(mmap) => {
                bytemuck::cast_slice(Self::mapped_section(mmap, 0, self.cells()))
            }
        }
    }

    pub fn distances(&self) -> &[f32] {
        match &self.storage {
            Storage::Owned { distances, .. } => distances,
            Storage::Mapped(mmap) => {
                bytemuck::cast_slice(Self::mapped_section(mmap, 1, self.cells()))
            }
        }
    }

    pub fn transposed(&self) -> &[f32] {
        match &self.storage {
            Storage::Owned { transposed, .. } => transposed,
            Storage::Mapped(mmap) => {
                bytemuck::cast_slice(Self::mapped_section(mmap, 2, self.cells()))
            }
        }
    }

    /// The three matrices as raw bytes, in file order
    pub fn sections(&self) -> [&[u8]; 3] {
        [
            bytemuck::cast_slice(self.predecessors()),
            bytemuck::cast_slice(self.distances()),
            bytemuck::cast_slice(self.transposed()),
        ]
    }

    fn cells(&self) -> usize {
        self.node_count * self.node_count
    }

    fn row<'a, T>(&self, matrix: &'a [T], row: IntersectionId) -> Option<&'a [T]> {
        let n = self.node_count;
        (row < n).then(|| &matrix[row * n..(row + 1) * n])
    }

    /// Predecessor row of the tree rooted at `src`
    pub fn predecessor_row(&self, src: IntersectionId) -> Option<&[u32]> {
        self.row(self.predecessors(), src)
    }

    /// Distances from `src` to every node
    pub fn distance_row(&self, src: IntersectionId) -> Option<&[f32]> {
        self.row(self.distances(), src)
    }

    /// Distances from every node to `dst`
    pub fn transposed_row(&self, dst: IntersectionId) -> Option<&[f32]> {
        self.row(self.transposed(), dst)
    }

    /// Shortest distance, `None` when out of range or unreachable
    pub fn distance(&self, src: IntersectionId, dst: IntersectionId) -> Option<f32> {
        self.distance_row(src)?
            .get(dst)
            .copied()
            .filter(|&distance| distance < UNREACHABLE_DISTANCE)
    }

    /// Raw trace from `dst` back to (excluding) `src`
    pub fn trace(&self, src: IntersectionId, dst: IntersectionId) -> Option<Path> {
        trace_back(self.predecessor_row(src)?, src, dst)
    }

    /// Shortest path in travel order with its cost. Identical endpoints and
    /// unreachable targets give `None`.
    pub fn path(&self, src: IntersectionId, dst: IntersectionId) -> Option<(Path, f32)> {
        if src == dst {
            return None;
        }
        let cost = self.distance(src, dst)?;
        let path = forward_path(self.predecessor_row(src)?, src, dst)?;
        Some((path, cost))
    }
}
