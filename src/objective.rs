//! Total intra-cluster dissimilarity.

use crate::assignment::ClusteringModel;
use crate::model::LinearExpr;
use crate::params::DistanceMatrix;
use crate::traits::PropertyKey;

impl<P: PropertyKey> ClusteringModel<P> {
    /// Sets the objective to Σ_{i,j} distance[i,j]·z[i,j].
    ///
    /// Preservation never touches the objective; it only adds constraints.
    pub(crate) fn set_total_distance_objective(&mut self, distance: &DistanceMatrix) {
        let mut objective = LinearExpr::new();
        for i in 0..self.n_days {
            for j in 0..self.n_days {
                let d = distance.get(i, j);
                if d != 0.0 {
                    objective.add_term(self.z(i, j), d);
                }
            }
        }
        self.objective = objective;
    }
}

#[cfg(test)]
mod tests {
    use crate::assignment::ClusteringModel;
    use crate::config::PreservationOptions;
    use crate::params::{ClusteringParams, DistanceMatrix, PropertyData};

    #[test]
    fn test_objective_weights_assignments_by_distance() {
        let distance = DistanceMatrix::new(vec![vec![0.0, 2.0], vec![3.0, 0.0]]);
        let params: ClusteringParams<String> = ClusteringParams::new(1, distance);
        let m = ClusteringModel::build(&params, PreservationOptions::plain()).unwrap();

        assert_eq!(m.objective().coefficient(m.z(0, 1)), 2.0);
        assert_eq!(m.objective().coefficient(m.z(1, 0)), 3.0);
        assert_eq!(m.objective().coefficient(m.z(0, 0)), 0.0);
        assert_eq!(m.objective().constant_term(), 0.0);
    }

    #[test]
    fn test_objective_is_independent_of_options() {
        let distance = DistanceMatrix::from_fn(3, |i, j| (i + 2 * j) as f64);
        let params = ClusteringParams::new(1, distance).with_property(
            "demand",
            PropertyData::default()
                .with_totals(vec![1.0, 2.0, 3.0], 0.2)
                .with_peaks(vec![1.0, 2.0, 3.0], 0.9),
        );
        let plain = ClusteringModel::build(&params, PreservationOptions::plain()).unwrap();
        let full = ClusteringModel::build(&params, PreservationOptions::all()).unwrap();
        assert_eq!(plain.objective(), full.objective());
    }
}
