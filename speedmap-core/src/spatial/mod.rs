//! Mapping arbitrary coordinates onto street graph intersections

pub mod distance;
pub mod grid;
pub mod kdtree;

pub use distance::{distance, lon_lat_ratio, pseudo_distance};
pub use grid::GridIndex;
pub use kdtree::KdTree;

use crate::model::{Bounds, Location};
use crate::{GRID_DEGREE, IntersectionId, MAX_SNAP_DISTANCE};

/// Two-tier nearest intersection lookup: a uniform grid for points inside
/// the network, with a k-d tree fallback for everything the grid misses.
#[derive(Debug, Clone)]
pub struct SpatialIndex {
    locations: Vec<Location>,
    grid: GridIndex,
    kd_tree: KdTree,
    /// Longitude/latitude length ratio at the network center
    ratio: f64,
    cell_degree: f64,
    max_snap_distance: f64,
}

impl Default for SpatialIndex {
    fn default() -> Self {
        Self::build(Vec::new(), Bounds::empty(), GRID_DEGREE, MAX_SNAP_DISTANCE)
    }
}

impl SpatialIndex {
    pub fn build(
        locations: Vec<Location>,
        bounds: Bounds,
        cell_degree: f64,
        max_snap_distance: f64,
    ) -> Self {
        let ratio = if bounds.is_empty() {
            1.0
        } else {
            lon_lat_ratio(bounds.center())
        };
        log::debug!("Longitude/latitude ratio at network center: {ratio:.6}");

        let grid = GridIndex::build(&locations, bounds, cell_degree);
        let kd_tree = KdTree::build(&locations);

        Self {
            locations,
            grid,
            kd_tree,
            ratio,
            cell_degree,
            max_snap_distance,
        }
    }

    pub fn ratio(&self) -> f64 {
        self.ratio
    }

    pub fn grid(&self) -> &GridIndex {
        &self.grid
    }

    /// Nearest intersection to `point`, or `None` when nothing is close enough.
    ///
    /// A grid winner stands when it is closer than any intersection outside
    /// the 3x3 block could be. Otherwise the k-d tree decides.
    pub fn nearest_node(&self, point: Location) -> Option<IntersectionId> {
        if let Some((found, best)) = self.grid_nearest(point) {
            if best <= self.block_reach(point) {
                return Some(found);
            }
            return match self.nearest_intersection(point) {
                Some(closer)
                    if pseudo_distance(point, self.locations[closer], self.ratio) < best =>
                {
                    Some(closer)
                }
                _ => Some(found),
            };
        }

        let candidate = self.nearest_intersection(point)?;
        let miles = distance(point, self.locations[candidate]);
        if miles < self.max_snap_distance {
            Some(candidate)
        } else {
            log::trace!("No intersection within {miles:.3} miles of {point:?}");
            None
        }
    }

    /// Best pseudo-distance match among the 3x3 cells around `point`
    fn grid_nearest(&self, point: Location) -> Option<(IntersectionId, f64)> {
        let (x, y) = self.grid.cell_of(point)?;
        self.grid
            .neighborhood(x, y)
            .map(|id| (id, pseudo_distance(point, self.locations[id], self.ratio)))
            .min_by(|a, b| a.1.total_cmp(&b.1))
    }

    /// Squared pseudo-distance below which nothing outside the 3x3 block
    /// around `point` can compete
    fn block_reach(&self, point: Location) -> f64 {
        let Some((x, y)) = self.grid.cell_of(point) else {
            return 0.0;
        };
        let [lat, lon] = self.grid.block_margin(point, x, y);
        let reach = lat.min(lon * self.ratio);
        if reach > 0.0 { reach * reach } else { 0.0 }
    }

    /// k-d tree search with a one-cell margin, no distance cutoff
    pub fn nearest_intersection(&self, point: Location) -> Option<IntersectionId> {
        self.kd_tree
            .nearest(&self.locations, point, self.ratio, self.cell_degree)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index(locations: Vec<Location>) -> SpatialIndex {
        let mut bounds = Bounds::empty();
        for &location in &locations {
            bounds.extend(location);
        }
        SpatialIndex::build(locations, bounds, GRID_DEGREE, MAX_SNAP_DISTANCE)
    }

    #[test]
    fn grid_hit_inside_bounds() {
        let index = index(vec![
            Location::new(40.700, -74.000),
            Location::new(40.700, -73.990),
            Location::new(40.710, -74.000),
        ]);
        assert_eq!(index.nearest_node(Location::new(40.7001, -73.9999)), Some(0));
        assert_eq!(index.nearest_node(Location::new(40.7099, -74.0001)), Some(2));
    }

    #[test]
    fn empty_neighborhood_falls_back_to_tree() {
        let index = index(vec![
            Location::new(40.700, -74.000),
            Location::new(40.720, -73.980),
        ]);
        // centre of the box: no intersection in the surrounding cells
        let probe = Location::new(40.703, -73.997);
        assert_eq!(index.nearest_node(probe), Some(0));
    }

    #[test]
    fn far_points_are_rejected() {
        let index = index(vec![
            Location::new(40.700, -74.000),
            Location::new(40.710, -73.990),
        ]);
        // about 0.7 miles north of the box
        assert_eq!(index.nearest_node(Location::new(40.72, -73.99)), None);
        // about 0.2 miles east, outside the box but close
        assert_eq!(index.nearest_node(Location::new(40.710, -73.986)), Some(1));
    }

    /// Scattered points inside the 40.70..40.72 x -74.00..-73.98 box
    fn scatter(count: usize, seed: u64) -> Vec<Location> {
        let mut state = seed;
        let mut next = move || {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            (state >> 11) as f64 / (1u64 << 53) as f64
        };
        let mut locations = vec![
            Location::new(40.700, -74.000),
            Location::new(40.720, -73.980),
        ];
        locations.extend((0..count).map(|_| {
            Location::new(40.700 + 0.02 * next(), -74.000 + 0.02 * next())
        }));
        locations
    }

    #[test]
    fn closer_node_outside_the_block_wins() {
        let corners = vec![
            Location::new(40.700, -74.000),
            Location::new(40.720, -73.980),
        ];
        let [rows, cols] = index(corners.clone()).grid().size();
        let lat_step = 0.02 / (rows - 1) as f64;
        let lon_step = 0.02 / (cols - 1) as f64;
        let at = |lat: f64, lon: f64| Location::new(40.700 + lat * lat_step, -74.000 + lon * lon_step);

        let mut locations = corners;
        // inside the 3x3 block around the query cell
        locations.push(at(10.4, 9.0));
        // one cell beyond the block, nearer once longitude is scaled
        locations.push(at(9.0, 10.6));
        let index = index(locations);

        let point = at(9.0, 9.0);
        let (x, y) = index.grid().cell_of(point).unwrap();
        assert_eq!(index.grid().neighborhood(x, y).collect::<Vec<_>>(), vec![2]);
        assert_eq!(index.nearest_node(point), Some(3));
    }

    #[test]
    fn scattered_nodes_snap_to_the_exact_nearest() {
        let index = index(scatter(300, 0x9E37_79B9_7F4A_7C15));
        let points = scatter(400, 0x2545_F491_4F6C_DD1D);
        for &point in &points[2..] {
            let expected = index
                .locations
                .iter()
                .map(|&location| pseudo_distance(point, location, index.ratio))
                .fold(f64::INFINITY, f64::min);
            let found = index.nearest_node(point).unwrap();
            assert_eq!(
                pseudo_distance(point, index.locations[found], index.ratio),
                expected,
                "{point:?}"
            );
        }
    }

    #[test]
    fn empty_index_finds_nothing() {
        let index = SpatialIndex::default();
        assert_eq!(index.nearest_node(Location::new(0.0, 0.0)), None);
    }
}
