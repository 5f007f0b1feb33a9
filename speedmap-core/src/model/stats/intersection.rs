use hashbrown::HashMap;
use itertools::Itertools;

use super::vector::SpeedVector;
use crate::StreetId;

/// Speed statistics of all outgoing streets of one intersection
#[derive(Debug, Clone, Default)]
pub struct IntersectionProperty {
    pub(crate) vectors: HashMap<StreetId, SpeedVector>,
    pub(crate) total_num_samples: u32,
}

impl IntersectionProperty {
    /// Record one speed sample for the outgoing street `edge_id`
    pub fn add_sample(&mut self, edge_id: StreetId, value: f32, weight: f32) {
        self.vectors
            .entry(edge_id)
            .or_insert_with(|| SpeedVector::new(edge_id))
            .add_sample(value, weight);
        self.total_num_samples += 1;
    }

    pub fn vector(&self, edge_id: StreetId) -> Option<&SpeedVector> {
        self.vectors.get(&edge_id)
    }

    /// Vectors ordered by street id
    pub fn vectors(&self) -> impl Iterator<Item = &SpeedVector> {
        self.vectors
            .values()
            .sorted_unstable_by_key(|vector| vector.edge_id)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }

    pub fn total_num_samples(&self) -> u32 {
        self.total_num_samples
    }

    /// Replace all statistics, as read back from an export
    pub(crate) fn restore(&mut self, vectors: impl IntoIterator<Item = SpeedVector>) {
        self.vectors.clear();
        self.total_num_samples = 0;
        for vector in vectors {
            self.total_num_samples += vector.num_samples;
            self.vectors.insert(vector.edge_id, vector);
        }
    }

    /// Merge each vector this intersection already has with its counterpart in `other`
    pub fn merge_speed(&mut self, other: &IntersectionProperty) {
        for (edge_id, vector) in &mut self.vectors {
            if let Some(other_vector) = other.vectors.get(edge_id) {
                vector.merge(other_vector);
            }
        }
    }
}
