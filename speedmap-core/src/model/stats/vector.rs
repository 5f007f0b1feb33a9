use crate::StreetId;

/// Streaming speed statistics for one outgoing street of an intersection
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SpeedVector {
    pub edge_id: StreetId,
    /// Weighted running mean of the samples
    pub speed_mean: f32,
    /// Weighted standard deviation, meaningful once `num_samples > 1`
    pub speed_std: f32,
    /// Plain sum of the raw sample values
    pub speed_custom: f32,
    pub num_samples: u32,
    pub total_weight: f32,
    /// Running weighted sum of squared deviations
    sum_squares: f32,
}

impl SpeedVector {
    pub fn new(edge_id: StreetId) -> Self {
        Self {
            edge_id,
            ..Self::default()
        }
    }

    /// Rebuild a vector from exported statistics
    pub(crate) fn restored(
        edge_id: StreetId,
        speed_mean: f32,
        speed_std: f32,
        num_samples: u32,
    ) -> Self {
        let total_weight = num_samples as f32;
        let sum_squares = if num_samples > 1 {
            speed_std * speed_std * (num_samples - 1) as f32 * total_weight / num_samples as f32
        } else {
            0.0
        };
        Self {
            edge_id,
            speed_mean,
            speed_std,
            speed_custom: 0.0,
            num_samples,
            total_weight,
            sum_squares,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.num_samples == 0
    }

    /// Weighted online (West/Welford) update with one sample
    #[allow(clippy::cast_precision_loss)]
    pub fn add_sample(&mut self, value: f32, weight: f32) {
        if self.num_samples == 0 {
            self.speed_mean = value;
            self.speed_std = 0.0;
            self.speed_custom = value;
            self.num_samples = 1;
            self.total_weight = weight;
            self.sum_squares = 0.0;
            return;
        }

        let prior_mean = self.speed_mean;
        let prior_weight = self.total_weight;
        let combined_weight = prior_weight + weight;
        let delta = value - prior_mean;

        self.speed_custom += value;
        self.sum_squares += weight * delta * delta * prior_weight / combined_weight;
        self.speed_mean += weight * delta / combined_weight;
        self.total_weight = combined_weight;
        self.num_samples += 1;

        let n = self.num_samples as f32;
        self.speed_std = (self.sum_squares / ((n - 1.0) * self.total_weight / n)).sqrt();
    }

    /// Fold in the statistics of the same street from an adjacent snapshot.
    ///
    /// Only the weighted mean and the raw sum are combined; the spread is
    /// left as is.
    pub fn merge(&mut self, other: &SpeedVector) {
        let combined_weight = self.total_weight + other.total_weight;
        if combined_weight > 0.0 {
            self.speed_mean = (self.speed_mean * self.total_weight
                + other.speed_mean * other.total_weight)
                / combined_weight;
        }
        self.speed_custom += other.speed_custom;
    }
}
