//! MILP solver backend built on `good_lp` (pure-Rust `microlp` engine).

use std::panic::{self, UnwindSafe};
use std::time::Duration;

use good_lp::{
    Expression, ProblemVariables, ResolutionError, Solution, SolutionStatus, SolverModel,
    Variable, WithTimeLimit, microlp, variable,
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::SolveOptions;
use crate::model::{MilpProblem, Relation, VarId};
use crate::traits::MilpSolver;

/// Outcome reported by a solver.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum SolveStatus {
    /// Proven optimal.
    Optimal,
    /// Feasible, optimality not proven (e.g. stopped on a gap or node limit).
    Feasible,
    Infeasible,
    TimedOut(Duration),
    Error(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverResponse {
    pub status: SolveStatus,
    /// One value per problem variable; empty unless `status` has a solution.
    pub values: Vec<f64>,
}

impl SolverResponse {
    pub fn solved(status: SolveStatus, values: Vec<f64>) -> Self {
        Self { status, values }
    }

    pub fn without_solution(status: SolveStatus) -> Self {
        Self {
            status,
            values: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct GoodLpSolver {
    options: SolveOptions,
}

impl GoodLpSolver {
    pub fn new(options: SolveOptions) -> Self {
        Self { options }
    }
}

impl MilpSolver for GoodLpSolver {
    fn solve(&self, problem: &MilpProblem) -> SolverResponse {
        let limit = self.options.time_limit();
        debug!(
            variables = problem.variables.len(),
            rows = problem.rows.len(),
            time_limit = ?limit,
            "submitting problem to good_lp"
        );

        let response = catch_backend_panic(|| solve_blocking(problem, limit));
        if let SolveStatus::TimedOut(limit) = response.status {
            warn!(?limit, "solver timed out before finding a feasible assignment");
        }
        response
    }
}

/// Runs a backend call, turning a panic inside it into `SolveStatus::Error`.
fn catch_backend_panic(solve: impl FnOnce() -> SolverResponse + UnwindSafe) -> SolverResponse {
    panic::catch_unwind(solve).unwrap_or_else(|payload| {
        let message = payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string());
        SolverResponse::without_solution(SolveStatus::Error(format!("solver panicked: {message}")))
    })
}

/// Builds the good_lp model and solves it. The time limit is enforced by the
/// backend itself, which stops and reports its best incumbent when it expires.
fn solve_blocking(problem: &MilpProblem, limit: Option<Duration>) -> SolverResponse {
    let mut vars = ProblemVariables::new();
    let columns: Vec<Variable> = problem
        .variables
        .iter()
        .map(|v| {
            let mut definition = variable()
                .name(v.name.clone())
                .min(v.lower)
                .max(v.upper)
                .initial(v.initial);
            if v.integer {
                definition = definition.integer();
            }
            vars.add(definition)
        })
        .collect();

    let objective = expression(
        problem.objective.terms(),
        problem.objective.constant_term(),
        &columns,
    );
    let mut model = vars.minimise(objective).using(microlp);
    if let Some(limit) = limit {
        model = model.with_time_limit(limit.as_secs_f64());
    }

    for row in &problem.rows {
        let lhs = expression(&row.terms, 0.0, &columns);
        let constraint = match row.relation {
            Relation::LessEq => lhs.leq(row.rhs),
            Relation::GreaterEq => lhs.geq(row.rhs),
            Relation::Equal => lhs.eq(row.rhs),
        };
        model = model.with(constraint);
    }

    match (model.solve(), limit) {
        (Ok(solution), _) => {
            let status = match solution.status() {
                SolutionStatus::Optimal => SolveStatus::Optimal,
                SolutionStatus::TimeLimit | SolutionStatus::GapLimit => SolveStatus::Feasible,
            };
            let values = columns
                .iter()
                .map(|&column| solution.value(column))
                .collect();
            SolverResponse::solved(status, values)
        }
        (Err(ResolutionError::Infeasible), _) => {
            SolverResponse::without_solution(SolveStatus::Infeasible)
        }
        (Err(ResolutionError::Unbounded), _) => SolverResponse::without_solution(
            SolveStatus::Error("problem is unbounded".to_string()),
        ),
        // microlp reports "no incumbent when the clock ran out" as `Other`.
        (Err(ResolutionError::Other(_)), Some(limit)) => {
            SolverResponse::without_solution(SolveStatus::TimedOut(limit))
        }
        (Err(err), _) => SolverResponse::without_solution(SolveStatus::Error(err.to_string())),
    }
}

fn expression(terms: &[(VarId, f64)], constant: f64, columns: &[Variable]) -> Expression {
    let mut expr = Expression::with_capacity(terms.len());
    for &(var, coef) in terms {
        expr.add_mul(coef, columns[var.index()]);
    }
    expr + constant
}
