//! Core domain traits for the representative-day planner.
//!
//! These are the seams to the collaborators the planner does not own: the
//! distance computation between days and the MILP solver itself.

use std::fmt::Debug;

use crate::model::MilpProblem;
use crate::params::DistanceMatrix;
use crate::profile::DailyProfiles;
use crate::solver::SolverResponse;

/// Key identifying a tracked property (e.g. "electricity_demand").
///
/// Properties carry no identity beyond their key; `Ord` keeps every
/// property-indexed map iterated in a stable order.
pub trait PropertyKey: Clone + Ord + Debug {}

impl<T> PropertyKey for T where T: Clone + Ord + Debug {}

/// Provides a day-to-day distance matrix for a set of daily profiles.
///
/// The matrix is indexed by day, in the order the profiles hold them.
pub trait DistanceMatrixProvider {
    fn matrix_for<P: PropertyKey>(&self, profiles: &DailyProfiles<P>) -> DistanceMatrix;
}

/// A generic MILP solver.
///
/// Receives the active part of a model and returns the variable values along
/// with the solve status. Implementations block until the solve finishes or
/// their own time limit elapses.
pub trait MilpSolver {
    fn solve(&self, problem: &MilpProblem) -> SolverResponse;
}
