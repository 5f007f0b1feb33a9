//! Uniform lat/lon grid over intersections in CSR layout

use itertools::iproduct;

use crate::IntersectionId;
use crate::model::{Bounds, Location};

/// Cell budget; wider networks get coarser cells
pub const MAX_GRID_CELLS: usize = 1 << 24;

#[derive(Debug, Clone, Default)]
pub struct GridIndex {
    bounds: Bounds,
    cell_degree: f64,
    /// Cell counts along latitude and longitude
    size: [usize; 2],
    /// First slot of each cell in `members`
    cell_start: Vec<u32>,
    cell_count: Vec<u32>,
    /// Intersection ids grouped by cell
    members: Vec<u32>,
}

impl GridIndex {
    /// Bucket `locations` into cells of roughly `cell_degree` degrees, or
    /// coarser when that would exceed [`MAX_GRID_CELLS`]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn build(locations: &[Location], bounds: Bounds, cell_degree: f64) -> Self {
        let (size, cell_degree) = Self::dimensions(bounds, cell_degree);

        let mut grid = Self {
            bounds,
            cell_degree,
            size,
            cell_start: vec![0; size[0] * size[1]],
            cell_count: vec![0; size[0] * size[1]],
            members: vec![0; locations.len()],
        };
        if locations.is_empty() {
            return grid;
        }

        let cells: Vec<usize> = locations
            .iter()
            .map(|&location| {
                let (x, y) = grid.clamped_cell(location);
                grid.cell_id(x, y)
            })
            .collect();

        // Counting sort: histogram, exclusive prefix sum, scatter
        for &cell in &cells {
            grid.cell_start[cell] += 1;
        }
        let mut offset = 0;
        for start in &mut grid.cell_start {
            let count = *start;
            *start = offset;
            offset += count;
        }
        for (id, &cell) in cells.iter().enumerate() {
            let slot = grid.cell_start[cell] + grid.cell_count[cell];
            grid.members[slot as usize] = id as u32;
            grid.cell_count[cell] += 1;
        }

        log::debug!(
            "Grid index with {}x{} cells over {} intersections",
            size[0],
            size[1],
            locations.len()
        );
        grid
    }

    pub fn size(&self) -> [usize; 2] {
        self.size
    }

    /// Effective cell size in degrees
    pub fn cell_degree(&self) -> f64 {
        self.cell_degree
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn dimensions(bounds: Bounds, cell_degree: f64) -> ([usize; 2], f64) {
        if bounds.is_empty() {
            return ([0, 0], cell_degree);
        }
        let lat_extent = bounds.max.lat - bounds.min.lat;
        let lon_extent = bounds.max.lon - bounds.min.lon;

        let mut degree = cell_degree;
        for _ in 0..64 {
            let rows = (lat_extent / degree).ceil().max(1.0);
            let cols = (lon_extent / degree).ceil().max(1.0);
            if rows * cols <= MAX_GRID_CELLS as f64 {
                if degree > cell_degree {
                    log::warn!(
                        "Network spans {lat_extent:.3} x {lon_extent:.3} degrees, \
                         grid cells widened from {cell_degree} to {degree} degrees"
                    );
                }
                return ([rows as usize, cols as usize], degree);
            }
            degree *= 2.0;
        }
        log::warn!("Unbounded network extent, using a single grid cell");
        ([1, 1], degree)
    }

    #[inline]
    fn cell_id(&self, x: usize, y: usize) -> usize {
        y * self.size[0] + x
    }

    #[allow(clippy::cast_possible_truncation)]
    fn axis_cell(value: f64, min: f64, max: f64, size: usize) -> i64 {
        let extent = max - min;
        if size <= 1 || extent <= 0.0 {
            return 0;
        }
        ((value - min) / extent * (size - 1) as f64 + 0.49) as i64
    }

    fn raw_cell(&self, location: Location) -> (i64, i64) {
        (
            Self::axis_cell(location.lat, self.bounds.min.lat, self.bounds.max.lat, self.size[0]),
            Self::axis_cell(location.lon, self.bounds.min.lon, self.bounds.max.lon, self.size[1]),
        )
    }

    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    fn clamped_cell(&self, location: Location) -> (usize, usize) {
        let (x, y) = self.raw_cell(location);
        (
            x.clamp(0, self.size[0] as i64 - 1) as usize,
            y.clamp(0, self.size[1] as i64 - 1) as usize,
        )
    }

    /// Cell holding `location`, `None` outside the grid
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn cell_of(&self, location: Location) -> Option<(usize, usize)> {
        let margin = self.cell_degree;
        let near = location.lat >= self.bounds.min.lat - margin
            && location.lat <= self.bounds.max.lat + margin
            && location.lon >= self.bounds.min.lon - margin
            && location.lon <= self.bounds.max.lon + margin;
        if !near {
            return None;
        }
        let (x, y) = self.raw_cell(location);
        let inside = (0..self.size[0] as i64).contains(&x) && (0..self.size[1] as i64).contains(&y);
        inside.then_some((x as usize, y as usize))
    }

    /// Per axis, how far `location` in cell `(x, y)` is from the edge of the
    /// 3x3 block around that cell, in degrees. Intersections closer than
    /// this on both axes are in [`GridIndex::neighborhood`].
    pub fn block_margin(&self, location: Location, x: usize, y: usize) -> [f64; 2] {
        [
            Self::axis_margin(location.lat, self.bounds.min.lat, self.bounds.max.lat, self.size[0], x),
            Self::axis_margin(location.lon, self.bounds.min.lon, self.bounds.max.lon, self.size[1], y),
        ]
    }

    /// Inverse of [`GridIndex::axis_cell`]: cell `c` holds offsets in
    /// `[c - 0.49, c + 0.51)` cell widths from `min`
    #[allow(clippy::cast_precision_loss)]
    fn axis_margin(value: f64, min: f64, max: f64, size: usize, cell: usize) -> f64 {
        let extent = max - min;
        if size <= 1 || extent <= 0.0 {
            return f64::INFINITY;
        }
        let width = extent / (size - 1) as f64;
        let low = min + (cell as f64 - 1.49) * width;
        let high = min + (cell as f64 + 1.51) * width;
        (value - low).min(high - value)
    }

    /// Intersections stored in cell `(x, y)`
    pub fn cell(&self, x: usize, y: usize) -> &[u32] {
        if x >= self.size[0] || y >= self.size[1] {
            return &[];
        }
        let id = self.cell_id(x, y);
        let start = self.cell_start[id] as usize;
        &self.members[start..start + self.cell_count[id] as usize]
    }

    /// Intersections in the 3x3 block of cells centred on `(x, y)`
    pub fn neighborhood(&self, x: usize, y: usize) -> impl Iterator<Item = IntersectionId> + '_ {
        iproduct!(-1i64..=1, -1i64..=1)
            .filter_map(move |(dy, dx)| {
                let cx = usize::try_from(x as i64 + dx).ok()?;
                let cy = usize::try_from(y as i64 + dy).ok()?;
                Some(self.cell(cx, cy))
            })
            .flatten()
            .map(|&id| id as IntersectionId)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn locations() -> Vec<Location> {
        vec![
            Location::new(0.0, 0.0),
            Location::new(0.0, 0.01),
            Location::new(0.01, 0.0),
            Location::new(0.01, 0.01),
            Location::new(0.005, 0.005),
        ]
    }

    fn bounds(locations: &[Location]) -> Bounds {
        let mut bounds = Bounds::empty();
        for &location in locations {
            bounds.extend(location);
        }
        bounds
    }

    #[test]
    fn every_intersection_lands_in_exactly_one_cell() {
        let locations = locations();
        let grid = GridIndex::build(&locations, bounds(&locations), 0.001);
        assert_eq!(grid.size(), [10, 10]);

        let mut seen = vec![0; locations.len()];
        for x in 0..10 {
            for y in 0..10 {
                for &id in grid.cell(x, y) {
                    seen[id as usize] += 1;
                }
            }
        }
        assert!(seen.iter().all(|&count| count == 1));
    }

    #[test]
    fn corners_map_to_corner_cells() {
        let locations = locations();
        let grid = GridIndex::build(&locations, bounds(&locations), 0.001);

        assert_eq!(grid.cell_of(Location::new(0.0, 0.0)), Some((0, 0)));
        assert_eq!(grid.cell_of(Location::new(0.01, 0.01)), Some((9, 9)));
        assert_eq!(grid.cell(9, 9), &[3]);
        assert_eq!(grid.cell_of(Location::new(0.5, 0.5)), None);
        assert_eq!(grid.cell_of(Location::new(-0.5, 0.0)), None);
    }

    #[test]
    fn neighborhood_clips_at_edges() {
        let locations = locations();
        let grid = GridIndex::build(&locations, bounds(&locations), 0.001);

        let mut near: Vec<_> = grid.neighborhood(0, 0).collect();
        near.sort_unstable();
        assert_eq!(near, vec![0]);

        let mut centre: Vec<_> = grid.neighborhood(4, 5).collect();
        centre.sort_unstable();
        assert_eq!(centre, vec![4]);
    }

    #[test]
    fn single_point_grid_does_not_panic() {
        let locations = vec![Location::new(40.0, -73.0)];
        let grid = GridIndex::build(&locations, bounds(&locations), 0.001);
        assert_eq!(grid.size(), [1, 1]);
        assert_eq!(grid.cell_of(Location::new(40.0, -73.0)), Some((0, 0)));
        assert_eq!(grid.neighborhood(0, 0).collect::<Vec<_>>(), vec![0]);
        assert_eq!(grid.cell_of(Location::new(40.5, -73.0)), None);
    }

    #[test]
    fn wide_extents_are_coarsened() {
        let locations = vec![Location::new(0.0, 0.0), Location::new(30.0, 40.0)];
        let grid = GridIndex::build(&locations, bounds(&locations), 0.001);
        let [rows, cols] = grid.size();
        assert!(rows * cols <= MAX_GRID_CELLS);
        assert!(grid.cell_degree() > 0.001);
        assert_eq!(grid.cell_of(Location::new(30.0, 40.0)), Some((rows - 1, cols - 1)));
        assert_eq!(grid.neighborhood(rows - 1, cols - 1).collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn block_margin_bounds_the_neighborhood() {
        let locations = locations();
        let grid = GridIndex::build(&locations, bounds(&locations), 0.001);
        let point = Location::new(0.005, 0.005);
        let (x, y) = grid.cell_of(point).unwrap();
        let [lat, lon] = grid.block_margin(point, x, y);
        // one full cell on every side, at most two
        assert!((0.001..=0.0023).contains(&lat), "{lat}");
        assert!((0.001..=0.0023).contains(&lon), "{lon}");

        let single = vec![Location::new(40.0, -73.0)];
        let grid = GridIndex::build(&single, bounds(&single), 0.001);
        assert_eq!(grid.block_margin(single[0], 0, 0), [f64::INFINITY; 2]);
    }

    #[test]
    fn empty_grid_has_no_cells() {
        let grid = GridIndex::build(&[], Bounds::empty(), 0.001);
        assert_eq!(grid.size(), [0, 0]);
        assert_eq!(grid.cell_of(Location::new(0.0, 0.0)), None);
    }
}
