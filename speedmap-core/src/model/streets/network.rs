use hashbrown::HashMap;
use itertools::Itertools;
use petgraph::graph::{DiGraph, EdgeIndex, EdgeReference, NodeIndex};

use super::components::{Bounds, EdgeProperty, Location, Street};
use crate::{Error, IntersectionId, StreetId};

/// Directed street graph.
///
/// Storage is sized up front by [`StreetGraph::with_capacity`] and filled by
/// id, so intersection and street ids are stable array indices. Streets are
/// staged in a table and materialized as graph edges by
/// [`StreetGraph::finalize`]; after that, edge index `i` is street id `i`.
#[derive(Debug, Clone, Default)]
pub struct StreetGraph {
    pub(crate) graph: DiGraph<Location, EdgeProperty, u32>,
    streets: Vec<Street>,
    street_props: Vec<EdgeProperty>,
    street_ids: HashMap<Street, StreetId>,
    bounds: Bounds,
    finalized: bool,
}

impl StreetGraph {
    /// Allocate `nodes` intersections (at the origin) and `edges` empty streets
    pub fn with_capacity(nodes: usize, edges: usize) -> Self {
        let mut graph = DiGraph::with_capacity(nodes, edges);
        for _ in 0..nodes {
            graph.add_node(Location::default());
        }

        Self {
            graph,
            streets: vec![Street::default(); edges],
            street_props: vec![EdgeProperty::default(); edges],
            street_ids: HashMap::with_capacity(edges),
            bounds: Bounds::empty(),
            finalized: false,
        }
    }

    /// Place intersection `id`, growing the bounding box
    pub fn add_intersection(&mut self, id: IntersectionId, location: Location) -> Result<(), Error> {
        let node = self
            .graph
            .node_weight_mut(NodeIndex::new(id))
            .ok_or(Error::InvalidNodeIndex)?;
        *node = location;
        self.bounds.extend(location);
        Ok(())
    }

    /// Register street `id` from `street.src` to `street.dst`
    pub fn add_street(&mut self, id: StreetId, street: Street, weight: f32) -> Result<(), Error> {
        if id >= self.streets.len() {
            return Err(Error::InvalidData(format!(
                "street id {id} out of range (capacity {})",
                self.streets.len()
            )));
        }
        let node_count = self.intersection_count();
        if street.src >= node_count || street.dst >= node_count {
            return Err(Error::InvalidData(format!(
                "street {id} references intersection outside 0..{node_count}: {} -> {}",
                street.src, street.dst
            )));
        }

        // Re-registering an id drops the pair it used to own
        let previous = self.streets[id];
        if self.street_ids.get(&previous) == Some(&id) {
            self.street_ids.remove(&previous);
        }

        self.streets[id] = street;
        self.street_ids.insert(street, id);
        self.street_props[id] = EdgeProperty::new(weight, id);
        self.finalized = false;
        Ok(())
    }

    /// Materialize the staged streets as graph edges, in street id order
    pub fn finalize(&mut self) {
        self.graph.clear_edges();
        for (street, props) in self.streets.iter().zip(&self.street_props) {
            self.graph.add_edge(
                NodeIndex::new(street.src),
                NodeIndex::new(street.dst),
                *props,
            );
        }
        self.finalized = true;
        log::debug!(
            "Street graph finalized with {} intersections and {} streets",
            self.graph.node_count(),
            self.graph.edge_count()
        );
    }

    pub fn is_finalized(&self) -> bool {
        self.finalized
    }

    pub fn intersection_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn street_count(&self) -> usize {
        self.streets.len()
    }

    pub fn intersection(&self, id: IntersectionId) -> Option<Location> {
        self.graph.node_weight(NodeIndex::new(id)).copied()
    }

    pub fn intersections(&self) -> impl Iterator<Item = Location> + '_ {
        self.graph.node_weights().copied()
    }

    pub fn street(&self, id: StreetId) -> Option<Street> {
        self.streets.get(id).copied()
    }

    pub fn street_property(&self, id: StreetId) -> Option<EdgeProperty> {
        self.street_props.get(id).copied()
    }

    pub fn streets(&self) -> &[Street] {
        &self.streets
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Identifier of the directed street `src -> dst`
    pub fn street_id(&self, street: Street) -> Option<StreetId> {
        self.street_ids
            .get(&street)
            .map(|&id| self.street_props[id].index)
    }

    pub fn street_weight(&self, street: Street) -> Option<f32> {
        self.street_ids
            .get(&street)
            .map(|&id| self.street_props[id].weight)
    }

    /// Change the weight of an existing street; later searches see the new value
    pub fn set_street_weight(&mut self, street: Street, weight: f32) -> bool {
        let Some(&id) = self.street_ids.get(&street) else {
            return false;
        };
        self.street_props[id].weight = weight;
        if self.finalized {
            if let Some(edge) = self.graph.edge_weight_mut(EdgeIndex::new(id)) {
                edge.weight = weight;
            }
        }
        true
    }

    /// Total weight along consecutive intersections of `path`
    pub fn path_cost(&self, path: &[IntersectionId]) -> Option<f32> {
        path.iter()
            .tuple_windows()
            .map(|(&src, &dst)| self.street_weight(Street::new(src, dst)))
            .sum()
    }

    /// Outgoing edges of `node`
    pub(crate) fn edges(
        &self,
        node: IntersectionId,
    ) -> impl Iterator<Item = EdgeReference<'_, EdgeProperty, u32>> {
        self.graph.edges(NodeIndex::new(node))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triangle() -> StreetGraph {
        let mut graph = StreetGraph::with_capacity(3, 3);
        graph.add_intersection(0, Location::new(0.0, 0.0)).unwrap();
        graph.add_intersection(1, Location::new(0.0, 1.0)).unwrap();
        graph.add_intersection(2, Location::new(1.0, 1.0)).unwrap();
        graph.add_street(0, Street::new(0, 1), 1.0).unwrap();
        graph.add_street(1, Street::new(1, 2), 2.0).unwrap();
        graph.add_street(2, Street::new(2, 0), 4.0).unwrap();
        graph.finalize();
        graph
    }

    #[test]
    fn street_lookup_is_directional() {
        let graph = triangle();
        assert_eq!(graph.street_id(Street::new(0, 1)), Some(0));
        assert_eq!(graph.street_id(Street::new(1, 0)), None);
        assert_eq!(graph.street_weight(Street::new(1, 2)), Some(2.0));
        assert_eq!(graph.street_weight(Street::new(2, 1)), None);
    }

    #[test]
    fn weight_updates_reach_the_graph() {
        let mut graph = triangle();
        assert!(graph.set_street_weight(Street::new(2, 0), 0.5));
        assert!(!graph.set_street_weight(Street::new(0, 2), 0.5));

        let edge = graph.edges(2).next().unwrap();
        assert_eq!(edge.weight().weight, 0.5);
        assert_eq!(edge.weight().index, 2);
    }

    #[test]
    fn out_of_range_ids_are_rejected() {
        let mut graph = StreetGraph::with_capacity(2, 1);
        assert!(matches!(
            graph.add_intersection(2, Location::new(0.0, 0.0)),
            Err(Error::InvalidNodeIndex)
        ));
        assert!(graph.add_street(1, Street::new(0, 1), 1.0).is_err());
        assert!(graph.add_street(0, Street::new(0, 5), 1.0).is_err());
    }

    #[test]
    fn path_cost_sums_street_weights() {
        let graph = triangle();
        assert_eq!(graph.path_cost(&[0, 1, 2]), Some(3.0));
        assert_eq!(graph.path_cost(&[0, 1, 2, 0]), Some(7.0));
        assert_eq!(graph.path_cost(&[0, 2]), None);
        assert_eq!(graph.path_cost(&[1]), Some(0.0));
    }
}
