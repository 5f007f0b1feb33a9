//! Street graph, spatial index, statistics and cached routes for one snapshot

use std::io::Write;

use hashbrown::HashSet;
use itertools::Itertools;

use super::stats::IntersectionProperty;
use super::streets::{Location, Street, StreetGraph};
use crate::algo::top_k::top_k_paths;
use crate::loading::CityMapConfig;
use crate::routing::{AllPairsPaths, Exhaustive, ShortestPathTree, StopAt, StopAtAll};
use crate::spatial::SpatialIndex;
use crate::{Error, IntersectionId, Path};

/// Engine instance for one time bucket.
///
/// Instances are independent of each other; combining buckets goes through
/// [`CityMap::merge_speed`].
#[derive(Debug)]
pub struct CityMap {
    graph: StreetGraph,
    spatial: SpatialIndex,
    properties: Vec<IntersectionProperty>,
    paths: Option<AllPairsPaths>,
    timestamp: u32,
    global_sample_count: u64,
}

impl CityMap {
    /// Finalizes `graph` if needed and builds the spatial index over it
    pub fn from_graph(mut graph: StreetGraph, config: &CityMapConfig) -> Self {
        if !graph.is_finalized() {
            graph.finalize();
        }

        let bounds = graph.bounds();
        let spatial = SpatialIndex::build(
            graph.intersections().collect(),
            bounds,
            config.grid_degree,
            config.max_snap_distance,
        );
        log::info!(
            "City map ready: {} intersections, {} streets, bounds {:?}",
            graph.intersection_count(),
            graph.street_count(),
            bounds.as_array()
        );

        Self {
            properties: vec![IntersectionProperty::default(); graph.intersection_count()],
            graph,
            spatial,
            paths: None,
            timestamp: 0,
            global_sample_count: 0,
        }
    }

    pub fn graph(&self) -> &StreetGraph {
        &self.graph
    }

    pub fn spatial_index(&self) -> &SpatialIndex {
        &self.spatial
    }

    pub fn intersection_count(&self) -> usize {
        self.graph.intersection_count()
    }

    pub fn street_count(&self) -> usize {
        self.graph.street_count()
    }

    /// Snap a coordinate to the closest intersection
    pub fn nearest_node(&self, location: Location) -> Option<IntersectionId> {
        self.spatial.nearest_node(location)
    }

    /// Change a street weight; affects searches run afterwards, not cached
    /// all-pairs data
    pub fn set_street_weight(&mut self, street: Street, weight: f32) -> bool {
        self.graph.set_street_weight(street, weight)
    }

    /// Single-pair search that stops once `dst` is settled
    pub fn shortest_path(&self, src: IntersectionId, dst: IntersectionId) -> Option<(Path, f32)> {
        if src == dst {
            return None;
        }
        let (tree, reached) = ShortestPathTree::compute(&self.graph, src, &mut StopAt(dst));
        if !reached {
            return None;
        }
        let cost = tree.distance(dst)?;
        Some((tree.path_to(dst)?, cost))
    }

    /// Search from `src` until every node of `targets` is settled.
    ///
    /// Settled targets are removed from the set; the count of targets
    /// reached is returned with the tree. An empty set runs to exhaustion.
    pub fn shortest_paths_to(
        &self,
        src: IntersectionId,
        targets: &mut HashSet<IntersectionId>,
    ) -> (ShortestPathTree, usize) {
        let requested = targets.len();
        let (tree, _) = ShortestPathTree::compute(&self.graph, src, &mut StopAtAll::new(targets));
        (tree, requested - targets.len())
    }

    pub fn shortest_path_tree(&self, src: IntersectionId) -> ShortestPathTree {
        ShortestPathTree::compute(&self.graph, src, &mut Exhaustive).0
    }

    /// Compute and attach all-pairs shortest paths
    pub fn build_all_shortest_paths<F>(&mut self, progress: F)
    where
        F: Fn(usize, usize) + Sync,
    {
        self.paths = Some(AllPairsPaths::compute(&self.graph, progress));
    }

    /// Attach precomputed (typically mapped) all-pairs data
    pub fn attach_paths(&mut self, paths: AllPairsPaths) -> Result<(), Error> {
        if paths.node_count() != self.intersection_count() {
            return Err(Error::InvalidData(format!(
                "path data covers {} intersections, graph has {}",
                paths.node_count(),
                self.intersection_count()
            )));
        }
        self.paths = Some(paths);
        Ok(())
    }

    pub fn paths(&self) -> Option<&AllPairsPaths> {
        self.paths.as_ref()
    }

    fn require_paths(&self) -> Result<&AllPairsPaths, Error> {
        self.paths.as_ref().ok_or(Error::PathsNotComputed)
    }

    /// Shortest path read from the all-pairs data
    pub fn cached_path(
        &self,
        src: IntersectionId,
        dst: IntersectionId,
    ) -> Result<Option<(Path, f32)>, Error> {
        Ok(self.require_paths()?.path(src, dst))
    }

    pub fn cached_distance(
        &self,
        src: IntersectionId,
        dst: IntersectionId,
    ) -> Result<Option<f32>, Error> {
        Ok(self.require_paths()?.distance(src, dst))
    }

    /// Up to `k` routes from `src` to `dst` whose length is closest to `distance`
    pub fn top_k(
        &self,
        k: usize,
        src: IntersectionId,
        dst: IntersectionId,
        distance: f32,
    ) -> Result<Vec<Path>, Error> {
        Ok(top_k_paths(self.require_paths()?, k, src, dst, distance))
    }

    /// [`CityMap::top_k`] between snapped coordinates
    pub fn top_k_between(
        &self,
        k: usize,
        from: Location,
        to: Location,
        distance: f32,
    ) -> Result<Vec<Path>, Error> {
        let paths = self.require_paths()?;
        match (self.nearest_node(from), self.nearest_node(to)) {
            (Some(src), Some(dst)) => Ok(top_k_paths(paths, k, src, dst, distance)),
            _ => Ok(Vec::new()),
        }
    }

    pub fn intersection_property(&self, id: IntersectionId) -> Option<&IntersectionProperty> {
        self.properties.get(id)
    }

    pub fn intersection_property_mut(
        &mut self,
        id: IntersectionId,
    ) -> Option<&mut IntersectionProperty> {
        self.properties.get_mut(id)
    }

    pub fn intersection_properties(&self) -> &[IntersectionProperty] {
        &self.properties
    }

    /// Add one sample per street along `path`, keyed at the street's tail
    /// intersection. Returns the number of samples recorded.
    pub fn record_path_sample(&mut self, path: &[IntersectionId], value: f32, weight: f32) -> usize {
        let mut recorded = 0;
        for (&src, &dst) in path.iter().tuple_windows() {
            let Some(street_id) = self.graph.street_id(Street::new(src, dst)) else {
                log::trace!("Skipping {src} -> {dst}: not a street");
                continue;
            };
            self.properties[src].add_sample(street_id, value, weight);
            recorded += 1;
        }
        self.global_sample_count += recorded as u64;
        recorded
    }

    /// Fold in statistics from another snapshot of the same city, for every
    /// street this map already has samples for
    pub fn merge_speed(&mut self, other: &CityMap) {
        for (property, other_property) in self.properties.iter_mut().zip(&other.properties) {
            property.merge_speed(other_property);
        }
    }

    /// Write one line: `label`, then per street (in id order) the summed
    /// sample values, or `-1` when the street has none
    pub fn export_speeds<W: Write>(&self, writer: &mut W, label: &str) -> Result<(), Error> {
        write!(writer, "{label}")?;
        for street in self.graph.streets() {
            let speed = self
                .graph
                .street_id(*street)
                .and_then(|street_id| self.properties[street.src].vector(street_id));
            match speed {
                Some(vector) => write!(writer, " {}", vector.speed_custom)?,
                None => write!(writer, " -1")?,
            }
        }
        writeln!(writer)?;
        Ok(())
    }

    pub fn timestamp(&self) -> u32 {
        self.timestamp
    }

    pub fn set_timestamp(&mut self, timestamp: u32) {
        self.timestamp = timestamp;
    }

    /// Samples recorded (or restored) across all intersections
    pub fn global_sample_count(&self) -> u64 {
        self.global_sample_count
    }

    pub(crate) fn set_global_sample_count(&mut self, count: u64) {
        self.global_sample_count = count;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Two-way square 0-1-2-3 with unit sides and one diagonal 0 -> 2
    fn square() -> CityMap {
        let corners = [
            Location::new(40.700, -74.000),
            Location::new(40.700, -73.990),
            Location::new(40.710, -73.990),
            Location::new(40.710, -74.000),
        ];
        let mut pairs = Vec::new();
        for id in 0..4 {
            let next = (id + 1) % 4;
            pairs.extend([(id, next), (next, id)]);
        }
        pairs.push((0, 2));

        let mut graph = StreetGraph::with_capacity(4, pairs.len());
        for (id, location) in corners.into_iter().enumerate() {
            graph.add_intersection(id, location).unwrap();
        }
        for (id, &(src, dst)) in pairs.iter().enumerate() {
            let weight = if (src, dst) == (0, 2) { 1.5 } else { 1.0 };
            graph.add_street(id, Street::new(src, dst), weight).unwrap();
        }
        CityMap::from_graph(graph, &CityMapConfig::default())
    }

    #[test]
    fn single_pair_matches_cached() {
        let mut city = square();
        let (path, cost) = city.shortest_path(0, 2).unwrap();
        assert_eq!(path, vec![0, 2]);
        assert_eq!(cost, 1.5);

        assert!(matches!(city.cached_path(0, 2), Err(Error::PathsNotComputed)));
        city.build_all_shortest_paths(|_, _| {});
        let (cached, cached_cost) = city.cached_path(0, 2).unwrap().unwrap();
        assert_eq!(city.graph().path_cost(&cached), Some(cached_cost));
        assert_eq!(cached_cost, cost);
        assert_eq!(city.cached_distance(2, 0).unwrap(), Some(2.0));
        assert_eq!(city.shortest_path(1, 1), None);
    }

    #[test]
    fn weight_changes_reroute() {
        let mut city = square();
        assert!(city.set_street_weight(Street::new(0, 2), 5.0));
        let (_, cost) = city.shortest_path(0, 2).unwrap();
        assert_eq!(cost, 2.0);
        assert!(!city.set_street_weight(Street::new(2, 0), 1.0));
    }

    #[test]
    fn target_set_counts_reached() {
        let city = square();
        let mut targets: HashSet<IntersectionId> = [1, 3].into_iter().collect();
        let (tree, reached) = city.shortest_paths_to(0, &mut targets);
        assert_eq!(reached, 2);
        assert!(targets.is_empty());
        assert_eq!(tree.distance(3), Some(1.0));

        let mut targets = HashSet::new();
        let (tree, reached) = city.shortest_paths_to(0, &mut targets);
        assert_eq!(reached, 0);
        assert!((0..4).all(|node| tree.is_reached(node)));
    }

    #[test]
    fn samples_follow_the_path() {
        let mut city = square();
        assert_eq!(city.record_path_sample(&[0, 1, 2], 12.0, 1.0), 2);
        assert_eq!(city.record_path_sample(&[0, 1], 18.0, 1.0), 1);
        // 1 -> 3 is not a street
        assert_eq!(city.record_path_sample(&[1, 3], 5.0, 1.0), 0);
        assert_eq!(city.global_sample_count(), 3);

        let street = city.graph().street_id(Street::new(0, 1)).unwrap();
        let vector = city.intersection_property(0).unwrap().vector(street).unwrap();
        assert_eq!(vector.num_samples, 2);
        assert_eq!(vector.speed_mean, 15.0);
        assert_eq!(vector.speed_custom, 30.0);
    }

    #[test]
    fn merge_weights_means() {
        let mut first = square();
        let mut second = square();
        first.record_path_sample(&[0, 1], 10.0, 2.0);
        second.record_path_sample(&[0, 1], 20.0, 2.0);
        second.record_path_sample(&[1, 2], 20.0, 2.0);

        first.merge_speed(&second);
        let street = first.graph().street_id(Street::new(0, 1)).unwrap();
        let vector = first.intersection_property(0).unwrap().vector(street).unwrap();
        assert_eq!(vector.speed_mean, 15.0);
        assert_eq!(vector.speed_custom, 30.0);
        // streets without samples here stay empty
        let street = first.graph().street_id(Street::new(1, 2)).unwrap();
        assert!(first.intersection_property(1).unwrap().vector(street).is_none());
    }

    #[test]
    fn speeds_line_lists_every_street() {
        let mut city = square();
        city.record_path_sample(&[0, 1], 12.5, 1.0);
        let mut out = Vec::new();
        city.export_speeds(&mut out, "2013_01_01-00_00_00").unwrap();
        let line = String::from_utf8(out).unwrap();
        assert_eq!(line, "2013_01_01-00_00_00 12.5 -1 -1 -1 -1 -1 -1 -1 -1\n");
    }

    #[test]
    fn top_k_needs_paths() {
        let mut city = square();
        assert!(city.top_k(3, 0, 2, 2.0).is_err());
        city.build_all_shortest_paths(|_, _| {});
        let routes = city.top_k(3, 0, 2, 2.0).unwrap();
        assert!(!routes.is_empty());
        assert!(routes.iter().all(|route| route[0] == 0 && route.last() == Some(&2)));
        assert!(city.top_k(3, 1, 1, 2.0).unwrap().is_empty());

        let far = Location::new(41.5, -72.0);
        assert!(city.top_k_between(3, far, Location::new(40.71, -73.99), 2.0).unwrap().is_empty());
    }
}
