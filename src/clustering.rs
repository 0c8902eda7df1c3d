//! Clustering runs: build the model, hand it to a solver, read the answer back.

use std::collections::{BTreeMap, BTreeSet};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{info, instrument, warn};

use crate::assignment::ClusteringModel;
use crate::config::PreservationOptions;
use crate::error::{ClusteringError, SolverFailure};
use crate::model::VarId;
use crate::params::ClusteringParams;
use crate::solver::SolveStatus;
use crate::traits::{MilpSolver, PropertyKey};

/// Solved selection of representative days.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusteringResult<P: PropertyKey> {
    /// `Optimal` or `Feasible`.
    pub status: SolveStatus,
    /// Total distance between days and their representatives.
    pub objective: f64,
    pub representatives: BTreeSet<usize>,
    /// Day -> representative. Extreme days have no entry.
    pub assignment: BTreeMap<usize, usize>,
    /// Days covered by no representative and not representatives themselves.
    pub extreme_days: BTreeSet<usize>,
    /// Number of days each day stands for.
    pub weights: Vec<f64>,
    /// Weighted estimate of each property's total.
    pub estimated_totals: BTreeMap<P, f64>,
}

impl<P: PropertyKey> ClusteringResult<P> {
    pub fn is_proven_optimal(&self) -> bool {
        self.status == SolveStatus::Optimal
    }

    /// Days standing for at least one day: representatives and extreme days.
    pub fn chosen_days(&self) -> BTreeSet<usize> {
        self.representatives.union(&self.extreme_days).copied().collect()
    }

    /// Members of the cluster represented by `representative`.
    pub fn cluster_of(&self, representative: usize) -> Vec<usize> {
        self.assignment
            .iter()
            .filter(|&(_, &rep)| rep == representative)
            .map(|(&day, _)| day)
            .collect()
    }
}

/// One independent parameter set for [`cluster_many`].
#[derive(Debug, Clone)]
pub struct ClusteringRun<P: PropertyKey> {
    pub params: ClusteringParams<P>,
    pub options: PreservationOptions,
}

#[instrument(skip_all, fields(n_days = params.n_days, n_clusters = params.n_clusters))]
pub fn cluster<P, S>(
    params: &ClusteringParams<P>,
    options: PreservationOptions,
    solver: &S,
) -> Result<ClusteringResult<P>, ClusteringError>
where
    P: PropertyKey,
    S: MilpSolver + ?Sized,
{
    let model = ClusteringModel::build(params, options)?;
    let response = solver.solve(&model.to_problem());

    match &response.status {
        SolveStatus::Optimal | SolveStatus::Feasible => {}
        SolveStatus::Infeasible => {
            warn!("clustering model is infeasible");
            return Err(ClusteringError::Infeasible);
        }
        SolveStatus::TimedOut(limit) => {
            return Err(SolverFailure::TimedOut(*limit).into());
        }
        SolveStatus::Error(message) => {
            warn!(%message, "solver failed");
            return Err(SolverFailure::Backend(message.clone()).into());
        }
    }

    let result = extract_result(&model, response.status, &response.values)?;
    info!(
        status = ?result.status,
        objective = result.objective,
        representatives = ?result.representatives,
        extreme_days = ?result.extreme_days,
        "clustering solved"
    );

    Ok(result)
}

/// Runs independent clusterings in parallel. Each run builds its own model.
pub fn cluster_many<P, S>(
    runs: &[ClusteringRun<P>],
    solver: &S,
) -> Vec<Result<ClusteringResult<P>, ClusteringError>>
where
    P: PropertyKey + Send + Sync,
    S: MilpSolver + Sync,
{
    runs.par_iter()
        .map(|run| cluster(&run.params, run.options, solver))
        .collect()
}

/// Reads a solver answer back into day sets and maps.
///
/// Binaries are rounded at 0.5, so weights and totals come out exact.
/// `values` must hold one entry per model variable.
pub fn extract_result<P: PropertyKey>(
    model: &ClusteringModel<P>,
    status: SolveStatus,
    values: &[f64],
) -> Result<ClusteringResult<P>, SolverFailure> {
    if values.len() != model.variables().len() {
        return Err(SolverFailure::Backend(format!(
            "solver returned {} values for {} variables",
            values.len(),
            model.variables().len()
        )));
    }

    let rounded: Vec<f64> = values.iter().map(|v| v.round()).collect();
    let is_set = |var: VarId| rounded[var.index()] > 0.5;
    let n = model.n_days();

    let representatives: BTreeSet<usize> = (0..n).filter(|&i| is_set(model.y(i))).collect();

    let assignment: BTreeMap<usize, usize> = (0..n)
        .filter_map(|j| (0..n).find(|&i| is_set(model.z(i, j))).map(|i| (j, i)))
        .collect();

    let extreme_days = (0..n)
        .filter(|i| !representatives.contains(i))
        .filter(|&i| model.chosen(i).evaluate(&rounded) > 0.5)
        .collect();

    let weights = (0..n).map(|i| model.weight(i).evaluate(&rounded)).collect();

    let estimated_totals = model
        .properties()
        .map(|p| (p.clone(), model.estimated_total(p).evaluate(&rounded)))
        .collect();

    Ok(ClusteringResult {
        status,
        objective: model.objective().evaluate(&rounded),
        representatives,
        assignment,
        extreme_days,
        weights,
        estimated_totals,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::{DistanceMatrix, PropertyData};

    #[test]
    fn test_extract_reads_sets_and_weights() {
        let distance = DistanceMatrix::from_fn(4, |i, j| i.abs_diff(j) as f64);
        let totals = PropertyData::default().with_totals(vec![1.0, 2.0, 3.0, 10.0], 0.5);
        let params = ClusteringParams::new(1, distance)
            .with_extreme_days(1)
            .with_property("demand", totals);
        let model = ClusteringModel::build(&params, PreservationOptions::plain()).unwrap();

        let mut values = vec![0.0; model.variables().len()];
        values[model.y(1).index()] = 0.9999;
        for j in 0..3 {
            values[model.z(1, j).index()] = 1.0;
        }

        let result = extract_result(&model, SolveStatus::Feasible, &values).unwrap();
        assert_eq!(result.representatives, BTreeSet::from([1]));
        assert_eq!(result.assignment, BTreeMap::from([(0, 1), (1, 1), (2, 1)]));
        assert_eq!(result.extreme_days, BTreeSet::from([3]));
        assert_eq!(result.weights, vec![0.0, 3.0, 0.0, 1.0]);
        assert_eq!(result.estimated_totals[&"demand"], 16.0);
        assert_eq!(result.objective, 2.0);
        assert_eq!(result.chosen_days(), BTreeSet::from([1, 3]));
        assert_eq!(result.cluster_of(1), vec![0, 1, 2]);
        assert!(!result.is_proven_optimal());
    }

    #[test]
    fn test_extract_rejects_short_values() {
        let params: ClusteringParams<&str> =
            ClusteringParams::new(1, DistanceMatrix::from_fn(2, |i, j| i.abs_diff(j) as f64));
        let model = ClusteringModel::build(&params, PreservationOptions::plain()).unwrap();

        let err = extract_result(&model, SolveStatus::Optimal, &[1.0]).unwrap_err();
        assert!(matches!(err, SolverFailure::Backend(message) if message.contains("1 values")));
    }
}
