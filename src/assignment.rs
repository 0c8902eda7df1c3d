//! Assignment model: representative flags, day assignments and the
//! k-medoids constraints every variant of the model shares.

use std::collections::BTreeMap;

use tracing::info;

use crate::config::PreservationOptions;
use crate::error::ConfigError;
use crate::model::{
    Constraint, ConstraintFamily, LinearExpr, MilpProblem, Relation, VarId, Variable, VariableArena,
};
use crate::params::ClusteringParams;
use crate::preservation::PropertyInputs;
use crate::traits::PropertyKey;

/// The full clustering MILP for one run.
///
/// Built once from validated parameters with every constraint present; the
/// captured [`PreservationOptions`] then decide which of them are active.
#[derive(Debug, Clone)]
pub struct ClusteringModel<P: PropertyKey> {
    pub(crate) n_days: usize,
    pub(crate) n_clusters: usize,
    pub(crate) n_extreme_days: usize,
    pub(crate) options: PreservationOptions,
    pub(crate) arena: VariableArena,
    /// `y[i]`: day i is a representative.
    pub(crate) y: Vec<VarId>,
    /// `z[i * n_days + j]`: day j is represented by day i.
    pub(crate) z: Vec<VarId>,
    /// `w[p][i]`: day i witnesses the peak of property p.
    pub(crate) w: BTreeMap<P, Vec<VarId>>,
    pub(crate) properties: BTreeMap<P, PropertyInputs>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) objective: LinearExpr,
}

impl<P: PropertyKey> ClusteringModel<P> {
    /// Validates `params`, builds every variable and constraint, sets the
    /// objective and applies `options` once.
    pub fn build(
        params: &ClusteringParams<P>,
        options: PreservationOptions,
    ) -> Result<Self, ConfigError> {
        params.validate(&options)?;

        let mut model = Self::with_assignment_variables(params, options);
        model.add_assignment_constraints();
        model.add_preservation(params);
        model.set_total_distance_objective(&params.distance);
        model.apply_options();

        info!(
            n_days = model.n_days,
            n_clusters = model.n_clusters,
            n_extreme_days = model.n_extreme_days,
            properties = model.properties.len(),
            variables = model.arena.as_slice().len(),
            constraints = model.constraints.len(),
            "clustering model built"
        );

        Ok(model)
    }

    fn with_assignment_variables(
        params: &ClusteringParams<P>,
        options: PreservationOptions,
    ) -> Self {
        let n = params.n_days;
        let mut arena = VariableArena::default();

        let y = (0..n).map(|i| arena.add_binary(format!("y[{i}]"))).collect();
        let z = (0..n)
            .flat_map(|i| (0..n).map(move |j| (i, j)))
            .map(|(i, j)| arena.add_binary(format!("z[{i},{j}]")))
            .collect();

        Self {
            n_days: n,
            n_clusters: params.n_clusters,
            n_extreme_days: params.n_extreme_days,
            options,
            arena,
            y,
            z,
            w: BTreeMap::new(),
            properties: BTreeMap::new(),
            constraints: Vec::new(),
            objective: LinearExpr::new(),
        }
    }

    fn add_assignment_constraints(&mut self) {
        let n = self.n_days;

        self.constraints.push(Constraint::new(
            ConstraintFamily::TotalRepresentativeDays,
            ConstraintFamily::TotalRepresentativeDays.to_string(),
            LinearExpr::sum(self.y.iter().copied()),
            Relation::Equal,
            self.n_clusters as f64,
        ));

        // Inequality: extreme days are represented by nobody.
        for j in 0..n {
            self.constraints.push(Constraint::new(
                ConstraintFamily::EachNonExtremeDayIsRepresented,
                format!("{}[{j}]", ConstraintFamily::EachNonExtremeDayIsRepresented),
                self.assigned_to(j),
                Relation::LessEq,
                1.0,
            ));
        }

        self.constraints.push(Constraint::new(
            ConstraintFamily::TotalRepresentedDays,
            ConstraintFamily::TotalRepresentedDays.to_string(),
            LinearExpr::sum(self.z.iter().copied()),
            Relation::Equal,
            (n - self.n_extreme_days) as f64,
        ));

        for i in 0..n {
            for j in 0..n {
                let mut lhs = LinearExpr::new();
                lhs.add_term(self.z(i, j), 1.0).add_term(self.y(i), -1.0);
                self.constraints.push(Constraint::new(
                    ConstraintFamily::RepresentedByRepresentative,
                    format!("{}[{i},{j}]", ConstraintFamily::RepresentedByRepresentative),
                    lhs,
                    Relation::LessEq,
                    0.0,
                ));
            }
        }
    }

    pub fn n_days(&self) -> usize {
        self.n_days
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn n_extreme_days(&self) -> usize {
        self.n_extreme_days
    }

    pub fn options(&self) -> PreservationOptions {
        self.options
    }

    pub fn y(&self, day: usize) -> VarId {
        self.y[day]
    }

    pub fn z(&self, representative: usize, day: usize) -> VarId {
        self.z[representative * self.n_days + day]
    }

    pub fn w(&self, property: &P, day: usize) -> Option<VarId> {
        self.w.get(property).map(|vars| vars[day])
    }

    pub fn properties(&self) -> impl Iterator<Item = &P> {
        self.properties.keys()
    }

    pub fn variables(&self) -> &[Variable] {
        self.arena.as_slice()
    }

    pub fn variable(&self, id: VarId) -> &Variable {
        &self.arena.as_slice()[id.index()]
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn constraints_in(&self, family: ConstraintFamily) -> impl Iterator<Item = &Constraint> {
        self.constraints.iter().filter(move |c| c.family == family)
    }

    pub fn objective(&self) -> &LinearExpr {
        &self.objective
    }

    /// Σ_k z[k,day]: how many representatives cover `day` (0 or 1).
    fn assigned_to(&self, day: usize) -> LinearExpr {
        LinearExpr::sum((0..self.n_days).map(|k| self.z(k, day)))
    }

    /// Number of days represented by `day`, plus one if `day` is covered by
    /// no representative (it then stands for itself as an extreme day).
    pub fn weight(&self, day: usize) -> LinearExpr {
        let mut expr = LinearExpr::sum((0..self.n_days).map(|j| self.z(day, j)));
        expr.add_constant(1.0).add_scaled(&self.assigned_to(day), -1.0);
        expr
    }

    /// 1 exactly when `day` is a representative or an uncovered extreme day.
    pub fn chosen(&self, day: usize) -> LinearExpr {
        let mut expr = LinearExpr::sum([self.y(day)]);
        expr.add_constant(1.0).add_scaled(&self.assigned_to(day), -1.0);
        expr
    }

    /// Request for a solver: all variables, active constraints, objective.
    pub fn to_problem(&self) -> MilpProblem {
        MilpProblem::from_parts(self.arena.as_slice(), &self.constraints, &self.objective)
    }

    /// Active constraints violated by `values` (one value per variable).
    pub fn violated_constraints(&self, values: &[f64], tolerance: f64) -> Vec<&Constraint> {
        self.constraints
            .iter()
            .filter(|c| c.active && !c.is_satisfied(values, tolerance))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::params::DistanceMatrix;

    fn model(n_days: usize, n_clusters: usize, n_extreme_days: usize) -> ClusteringModel<String> {
        let distance = DistanceMatrix::from_fn(n_days, |i, j| i.abs_diff(j) as f64);
        let params = ClusteringParams::new(n_clusters, distance).with_extreme_days(n_extreme_days);
        ClusteringModel::build(&params, PreservationOptions::plain()).unwrap()
    }

    /// Values with `reps` as representatives and `assignment[j] = Some(i)`.
    fn values_for(
        model: &ClusteringModel<String>,
        reps: &[usize],
        assignment: &[Option<usize>],
    ) -> Vec<f64> {
        let mut values = vec![0.0; model.variables().len()];
        for &r in reps {
            values[model.y(r).index()] = 1.0;
        }
        for (j, rep) in assignment.iter().enumerate() {
            if let Some(i) = rep {
                values[model.z(*i, j).index()] = 1.0;
            }
        }
        values
    }

    #[test]
    fn test_variable_counts() {
        let m = model(4, 2, 0);
        assert_eq!(m.variables().len(), 4 + 16);
        assert!(m.variables().iter().all(|v| v.initial == 0.0));
        assert_eq!(m.variable(m.z(1, 2)).name, "z[1,2]");
    }

    #[test]
    fn test_constraint_counts_per_family() {
        let m = model(3, 1, 0);
        let count = |family| m.constraints_in(family).count();
        assert_eq!(count(ConstraintFamily::TotalRepresentativeDays), 1);
        assert_eq!(count(ConstraintFamily::EachNonExtremeDayIsRepresented), 3);
        assert_eq!(count(ConstraintFamily::TotalRepresentedDays), 1);
        assert_eq!(count(ConstraintFamily::RepresentedByRepresentative), 9);
    }

    #[test]
    fn test_total_represented_rhs_excludes_extreme_days() {
        let m = model(5, 2, 2);
        let c = m.constraints_in(ConstraintFamily::TotalRepresentedDays).next().unwrap();
        assert_eq!(c.rhs, 3.0);
        assert_eq!(c.relation, Relation::Equal);
    }

    #[test]
    fn test_weight_and_chosen_on_regular_assignment() {
        let m = model(4, 2, 0);
        let values = values_for(&m, &[0, 2], &[Some(0), Some(0), Some(2), Some(2)]);

        assert!(m.violated_constraints(&values, 1e-9).is_empty());
        let weights: Vec<f64> = (0..4).map(|d| m.weight(d).evaluate(&values)).collect();
        assert_eq!(weights, vec![2.0, 0.0, 2.0, 0.0]);
        let chosen: Vec<f64> = (0..4).map(|d| m.chosen(d).evaluate(&values)).collect();
        assert_eq!(chosen, vec![1.0, 0.0, 1.0, 0.0]);
    }

    #[test]
    fn test_extreme_day_weighs_itself() {
        let m = model(4, 1, 1);
        let values = values_for(&m, &[1], &[Some(1), Some(1), Some(1), None]);

        assert!(m.violated_constraints(&values, 1e-9).is_empty());
        assert_eq!(m.weight(3).evaluate(&values), 1.0);
        assert_eq!(m.chosen(3).evaluate(&values), 1.0);
        assert_eq!(m.weight(1).evaluate(&values), 3.0);
        let total: f64 = (0..4).map(|d| m.weight(d).evaluate(&values)).sum();
        assert_eq!(total, 4.0);
    }

    #[test]
    fn test_gating_rejects_assignment_to_non_representative() {
        let m = model(3, 1, 0);
        let values = values_for(&m, &[0], &[Some(0), Some(1), Some(0)]);
        let violated = m.violated_constraints(&values, 1e-9);
        assert!(violated.iter().any(|c| c.label == "represented_by_representative[1,1]"));
    }

    #[test]
    fn test_double_coverage_is_rejected() {
        let m = model(3, 2, 0);
        let mut values = values_for(&m, &[0, 1], &[Some(0), Some(1), Some(0)]);
        values[m.z(1, 2).index()] = 1.0;
        let violated = m.violated_constraints(&values, 1e-9);
        assert!(violated.iter().any(|c| c.label == "each_non_extreme_day_is_represented[2]"));
    }

    #[test]
    fn test_build_rejects_invalid_params() {
        let params: ClusteringParams<String> =
            ClusteringParams::new(5, DistanceMatrix::from_fn(3, |_, _| 0.0));
        assert!(matches!(
            ClusteringModel::build(&params, PreservationOptions::plain()),
            Err(ConfigError::TooManyClusters { .. })
        ));
    }
}
