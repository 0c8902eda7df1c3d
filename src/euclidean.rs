//! Euclidean distance matrix provider.
//!
//! Compares days by the straight-line distance between their concatenated
//! profiles across all properties.

use crate::params::DistanceMatrix;
use crate::profile::DailyProfiles;
use crate::traits::{DistanceMatrixProvider, PropertyKey};

/// Euclidean day-to-day distances.
///
/// With `normalize`, each property is min-max scaled to `[0, 1]` over the
/// whole horizon first, so large-magnitude properties do not dominate.
#[derive(Debug, Clone, Default)]
pub struct EuclideanMatrix {
    pub normalize: bool,
}

impl EuclideanMatrix {
    pub fn new(normalize: bool) -> Self {
        Self { normalize }
    }

    /// Flattened feature vector of every day, properties in key order.
    fn features<P: PropertyKey>(&self, profiles: &DailyProfiles<P>) -> Vec<Vec<f64>> {
        let mut features = vec![Vec::new(); profiles.n_days()];

        for property in profiles.properties() {
            let (low, high) = self.scale_bounds(profiles, property);
            let span = if high > low { high - low } else { 1.0 };

            for (day, out) in features.iter_mut().enumerate() {
                if let Some(values) = profiles.day(property, day) {
                    out.extend(values.iter().map(|&v| (v - low) / span));
                }
            }
        }

        features
    }

    fn scale_bounds<P: PropertyKey>(
        &self,
        profiles: &DailyProfiles<P>,
        property: &P,
    ) -> (f64, f64) {
        if !self.normalize {
            // identity scaling
            return (0.0, 1.0);
        }

        let mut low = f64::INFINITY;
        let mut high = f64::NEG_INFINITY;
        for day in 0..profiles.n_days() {
            for &v in profiles.day(property, day).unwrap_or_default() {
                low = low.min(v);
                high = high.max(v);
            }
        }

        if low.is_finite() && high.is_finite() {
            (low, high)
        } else {
            (0.0, 0.0)
        }
    }

    fn euclidean(a: &[f64], b: &[f64]) -> f64 {
        a.iter()
            .zip(b)
            .map(|(x, y)| (x - y).powi(2))
            .sum::<f64>()
            .sqrt()
    }
}

impl DistanceMatrixProvider for EuclideanMatrix {
    fn matrix_for<P: PropertyKey>(&self, profiles: &DailyProfiles<P>) -> DistanceMatrix {
        let features = self.features(profiles);
        let n = features.len();
        let mut rows = vec![vec![0.0; n]; n];

        for i in 0..n {
            for j in (i + 1)..n {
                let d = Self::euclidean(&features[i], &features[j]);
                rows[i][j] = d;
                rows[j][i] = d;
            }
        }

        DistanceMatrix::new(rows)
    }
}
