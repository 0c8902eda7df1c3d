//! repday-planner core
//!
//! Exact MILP selection of representative days (k-medoids style), with optional
//! preservation of per-property totals and peaks.

pub mod traits;
pub mod config;
pub mod error;
pub mod params;
pub mod model;
pub mod assignment;
pub mod preservation;
pub mod objective;
pub mod solver;
pub mod clustering;
pub mod profile;
pub mod euclidean;
