use super::Location;

/// A recorded taxi trip as handed over by the ingestion layer
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Trip {
    pub pickup: Location,
    pub dropoff: Location,
    /// Seconds since an arbitrary epoch
    pub pickup_time: u32,
    pub dropoff_time: u32,
    /// Odometer distance in miles
    pub distance: f64,
}

impl Trip {
    /// Trip duration in hours, `None` unless dropoff is strictly after pickup
    pub fn duration_hours(&self) -> Option<f64> {
        (self.dropoff_time > self.pickup_time)
            .then(|| f64::from(self.dropoff_time - self.pickup_time) / 3600.0)
    }
}
