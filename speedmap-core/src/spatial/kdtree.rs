//! Median-split k-d tree over intersection coordinates, alternating lat/lon

use super::distance::pseudo_distance;
use crate::IntersectionId;
use crate::model::Location;

#[derive(Debug, Clone, Copy, PartialEq)]
enum KdNode {
    /// One intersection
    Leaf(u32),
    /// Children live at `first_child` and `first_child + 1`
    Split { median: f64, first_child: u32 },
    /// Placeholder for a missing child
    Empty,
}

#[derive(Debug, Clone, Default)]
pub struct KdTree {
    nodes: Vec<KdNode>,
}

impl KdTree {
    #[allow(clippy::cast_possible_truncation)]
    pub fn build(locations: &[Location]) -> Self {
        let mut tree = Self {
            nodes: vec![KdNode::Empty],
        };
        let mut indices: Vec<u32> = (0..locations.len() as u32).collect();
        tree.build_node(locations, &mut indices, 0, 0);
        tree
    }

    pub fn is_empty(&self) -> bool {
        matches!(self.nodes.first(), None | Some(KdNode::Empty))
    }

    #[allow(clippy::cast_possible_truncation)]
    fn build_node(
        &mut self,
        locations: &[Location],
        indices: &mut [u32],
        depth: usize,
        slot: usize,
    ) {
        match indices.len() {
            0 => {
                self.nodes[slot] = KdNode::Empty;
                return;
            }
            1 => {
                self.nodes[slot] = KdNode::Leaf(indices[0]);
                return;
            }
            _ => {}
        }

        let axis = depth % 2;
        let median_index = indices.len() / 2 - 1;
        indices.select_nth_unstable_by(median_index, |&a, &b| {
            locations[a as usize]
                .axis(axis)
                .total_cmp(&locations[b as usize].axis(axis))
        });
        let median = locations[indices[median_index] as usize].axis(axis);

        let first_child = self.nodes.len();
        self.nodes[slot] = KdNode::Split {
            median,
            first_child: first_child as u32,
        };
        self.nodes.extend([KdNode::Empty, KdNode::Empty]);

        let (lower, upper) = indices.split_at_mut(median_index + 1);
        self.build_node(locations, lower, depth + 1, first_child);
        self.build_node(locations, upper, depth + 1, first_child + 1);
    }

    /// Closest intersection to `point` by pseudo-distance.
    ///
    /// The far side of a split is visited when `point` lies within `margin`
    /// degrees of the median, or when the splitting plane is closer than the
    /// best candidate so far.
    pub fn nearest(
        &self,
        locations: &[Location],
        point: Location,
        ratio: f64,
        margin: f64,
    ) -> Option<IntersectionId> {
        let mut best = None;
        let mut best_distance = f64::INFINITY;
        self.search(
            locations,
            point,
            ratio,
            margin,
            0,
            0,
            &mut best,
            &mut best_distance,
        );
        best
    }

    #[allow(clippy::too_many_arguments)]
    fn search(
        &self,
        locations: &[Location],
        point: Location,
        ratio: f64,
        margin: f64,
        slot: usize,
        depth: usize,
        best: &mut Option<IntersectionId>,
        best_distance: &mut f64,
    ) {
        match self.nodes[slot] {
            KdNode::Empty => {}
            KdNode::Leaf(id) => {
                let id = id as IntersectionId;
                let distance = pseudo_distance(point, locations[id], ratio);
                if distance < *best_distance {
                    *best_distance = distance;
                    *best = Some(id);
                }
            }
            KdNode::Split {
                median,
                first_child,
            } => {
                let axis = depth % 2;
                let value = point.axis(axis);
                let lower = first_child as usize;
                let upper = lower + 1;
                let within_lower = value - margin <= median;
                let within_upper = value + margin > median;

                // Pseudo-distance from the point to the splitting plane
                let scale = if axis == 0 { 1.0 } else { ratio };
                let plane = ((value - median) * scale).powi(2);

                let (near, far, within_far) = if value <= median {
                    (lower, upper, within_upper)
                } else {
                    (upper, lower, within_lower)
                };
                self.search(
                    locations,
                    point,
                    ratio,
                    margin,
                    near,
                    depth + 1,
                    best,
                    best_distance,
                );
                if within_far || plane < *best_distance {
                    self.search(
                        locations,
                        point,
                        ratio,
                        margin,
                        far,
                        depth + 1,
                        best,
                        best_distance,
                    );
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scatter() -> Vec<Location> {
        (0..50)
            .map(|i| {
                let f = f64::from(i);
                Location::new(
                    40.70 + (f * 0.37).sin() * 0.002,
                    -73.99 + (f * 0.73).cos() * 0.002,
                )
            })
            .collect()
    }

    #[test]
    fn every_location_finds_itself() {
        let locations = scatter();
        let tree = KdTree::build(&locations);
        for (id, &location) in locations.iter().enumerate() {
            let found = tree.nearest(&locations, location, 1.0, 0.001).unwrap();
            assert_eq!(pseudo_distance(location, locations[found], 1.0), 0.0, "id {id}");
        }
    }

    #[test]
    fn leaves_cover_all_intersections() {
        let locations = scatter();
        let tree = KdTree::build(&locations);
        let mut leaves: Vec<u32> = tree
            .nodes
            .iter()
            .filter_map(|node| match node {
                KdNode::Leaf(id) => Some(*id),
                _ => None,
            })
            .collect();
        leaves.sort_unstable();
        assert_eq!(leaves, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn matches_linear_scan_away_from_the_data() {
        let locations = scatter();
        let tree = KdTree::build(&locations);
        let ratio = 1.32;
        for probe in [
            Location::new(40.71, -73.99),
            Location::new(40.69, -74.01),
            Location::new(40.7005, -73.985),
        ] {
            let expected = (0..locations.len())
                .min_by(|&a, &b| {
                    pseudo_distance(probe, locations[a], ratio)
                        .total_cmp(&pseudo_distance(probe, locations[b], ratio))
                })
                .unwrap();
            let found = tree.nearest(&locations, probe, ratio, 0.001).unwrap();
            assert_eq!(
                pseudo_distance(probe, locations[found], ratio),
                pseudo_distance(probe, locations[expected], ratio)
            );
        }
    }

    #[test]
    fn empty_and_single_trees() {
        let empty = KdTree::build(&[]);
        assert!(empty.is_empty());
        assert_eq!(empty.nearest(&[], Location::new(0.0, 0.0), 1.0, 0.001), None);

        let one = [Location::new(1.0, 2.0)];
        let tree = KdTree::build(&one);
        assert!(!tree.is_empty());
        assert_eq!(tree.nearest(&one, Location::new(5.0, 5.0), 1.0, 0.001), Some(0));
    }
}
