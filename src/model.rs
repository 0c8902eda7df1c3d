//! Solver-independent MILP representation.
//!
//! The clustering model keeps every constraint it ever builds; activation only
//! flips the `active` flag. [`MilpProblem`] is the snapshot actually handed to
//! a solver, holding the active constraints alone.

use std::fmt;

use serde::Serialize;

/// Dense index of a decision variable within its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct VarId(usize);

impl VarId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A binary decision variable.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Variable {
    pub name: String,
    /// Warm-start value. Not guaranteed to be part of a feasible point.
    pub initial: f64,
    /// Value the variable is pinned to, if any.
    pub fixed: Option<f64>,
}

/// Affine combination of variables: `Σ coef·var + constant`.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LinearExpr {
    terms: Vec<(VarId, f64)>,
    constant: f64,
}

impl LinearExpr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn constant(value: f64) -> Self {
        Self {
            terms: Vec::new(),
            constant: value,
        }
    }

    pub fn sum(vars: impl IntoIterator<Item = VarId>) -> Self {
        Self {
            terms: vars.into_iter().map(|var| (var, 1.0)).collect(),
            constant: 0.0,
        }
    }

    pub fn add_term(&mut self, var: VarId, coef: f64) -> &mut Self {
        self.terms.push((var, coef));
        self
    }

    pub fn add_constant(&mut self, value: f64) -> &mut Self {
        self.constant += value;
        self
    }

    /// Adds `scale * other` to this expression.
    pub fn add_scaled(&mut self, other: &LinearExpr, scale: f64) -> &mut Self {
        self.terms
            .extend(other.terms.iter().map(|&(var, coef)| (var, coef * scale)));
        self.constant += other.constant * scale;
        self
    }

    pub fn scaled(&self, scale: f64) -> Self {
        let mut out = Self::new();
        out.add_scaled(self, scale);
        out
    }

    pub fn terms(&self) -> &[(VarId, f64)] {
        &self.terms
    }

    pub fn constant_term(&self) -> f64 {
        self.constant
    }

    /// Coefficient of `var`, summing repeated terms.
    pub fn coefficient(&self, var: VarId) -> f64 {
        self.terms
            .iter()
            .filter(|(v, _)| *v == var)
            .map(|(_, coef)| coef)
            .sum()
    }

    /// Value of the expression given one value per model variable.
    pub fn evaluate(&self, values: &[f64]) -> f64 {
        self.terms
            .iter()
            .map(|&(var, coef)| coef * values[var.index()])
            .sum::<f64>()
            + self.constant
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Relation {
    LessEq,
    GreaterEq,
    Equal,
}

impl Relation {
    pub fn holds(self, lhs: f64, rhs: f64, tolerance: f64) -> bool {
        match self {
            Relation::LessEq => lhs <= rhs + tolerance,
            Relation::GreaterEq => lhs >= rhs - tolerance,
            Relation::Equal => (lhs - rhs).abs() <= tolerance,
        }
    }
}

/// Named constraint groups of the clustering model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub enum ConstraintFamily {
    /// Σ y = n_clusters.
    TotalRepresentativeDays,
    /// Σ_i z[i,j] ≤ 1 for each day j.
    EachNonExtremeDayIsRepresented,
    /// Σ z = n_days − n_extreme_days.
    TotalRepresentedDays,
    /// z[i,j] ≤ y[i].
    RepresentedByRepresentative,
    RelativeErrorUpper,
    RelativeErrorLower,
    /// dailyMax·chosen − w·share·globalMax ≥ 0.
    PreservePeak,
    /// Σ_i w[p,i] ≥ 1.
    AtLeastOnePreserved,
}

impl ConstraintFamily {
    pub fn name(self) -> &'static str {
        match self {
            ConstraintFamily::TotalRepresentativeDays => "total_representative_days",
            ConstraintFamily::EachNonExtremeDayIsRepresented => {
                "each_non_extreme_day_is_represented"
            }
            ConstraintFamily::TotalRepresentedDays => "total_represented_days",
            ConstraintFamily::RepresentedByRepresentative => "represented_by_representative",
            ConstraintFamily::RelativeErrorUpper => "relative_error_upper",
            ConstraintFamily::RelativeErrorLower => "relative_error_lower",
            ConstraintFamily::PreservePeak => "preserve_peak",
            ConstraintFamily::AtLeastOnePreserved => "at_least_one_preserved",
        }
    }
}

impl fmt::Display for ConstraintFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Constraint {
    pub family: ConstraintFamily,
    pub label: String,
    pub lhs: LinearExpr,
    pub relation: Relation,
    pub rhs: f64,
    pub active: bool,
}

impl Constraint {
    pub fn new(
        family: ConstraintFamily,
        label: String,
        lhs: LinearExpr,
        relation: Relation,
        rhs: f64,
    ) -> Self {
        Self {
            family,
            label,
            lhs,
            relation,
            rhs,
            active: true,
        }
    }

    pub fn is_satisfied(&self, values: &[f64], tolerance: f64) -> bool {
        self.relation.holds(self.lhs.evaluate(values), self.rhs, tolerance)
    }
}

/// Column description handed to a solver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemVariable {
    pub name: String,
    pub lower: f64,
    pub upper: f64,
    pub integer: bool,
    pub initial: f64,
}

/// Row handed to a solver: `Σ terms  relation  rhs`, constants already folded
/// into `rhs`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProblemRow {
    pub label: String,
    pub terms: Vec<(VarId, f64)>,
    pub relation: Relation,
    pub rhs: f64,
}

/// Minimisation request for an external MILP solver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MilpProblem {
    pub variables: Vec<ProblemVariable>,
    pub rows: Vec<ProblemRow>,
    pub objective: LinearExpr,
}

impl MilpProblem {
    /// Snapshot of the given variables and the active subset of `constraints`.
    pub fn from_parts(
        variables: &[Variable],
        constraints: &[Constraint],
        objective: &LinearExpr,
    ) -> Self {
        let variables = variables
            .iter()
            .map(|var| {
                let (lower, upper) = match var.fixed {
                    Some(value) => (value, value),
                    None => (0.0, 1.0),
                };
                ProblemVariable {
                    name: var.name.clone(),
                    lower,
                    upper,
                    integer: true,
                    initial: var.initial,
                }
            })
            .collect();

        let rows = constraints
            .iter()
            .filter(|c| c.active)
            .map(|c| ProblemRow {
                label: c.label.clone(),
                terms: c.lhs.terms().to_vec(),
                relation: c.relation,
                rhs: c.rhs - c.lhs.constant_term(),
            })
            .collect();

        Self {
            variables,
            rows,
            objective: objective.clone(),
        }
    }
}

/// Index bookkeeping for variables, shared by the builders.
#[derive(Debug, Clone, Default)]
pub(crate) struct VariableArena {
    variables: Vec<Variable>,
}

impl VariableArena {
    pub(crate) fn add_binary(&mut self, name: String) -> VarId {
        let id = VarId(self.variables.len());
        self.variables.push(Variable {
            name,
            initial: 0.0,
            fixed: None,
        });
        id
    }

    pub(crate) fn get_mut(&mut self, id: VarId) -> &mut Variable {
        &mut self.variables[id.index()]
    }

    pub(crate) fn as_slice(&self) -> &[Variable] {
        &self.variables
    }
}
