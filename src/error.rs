use std::time::Duration;

use thiserror::Error;

/// Malformed run input, detected before any model is built.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("n_days must be positive")]
    NoDays,

    #[error("n_clusters must be positive")]
    NoClusters,

    #[error("n_clusters ({n_clusters}) exceeds n_days ({n_days})")]
    TooManyClusters { n_clusters: usize, n_days: usize },

    #[error("n_extreme_days ({n_extreme_days}) exceeds n_days ({n_days})")]
    TooManyExtremeDays { n_extreme_days: usize, n_days: usize },

    #[error(
        "distance matrix must be {expected}x{expected}, \
         found {rows} rows (row {row} has {cols} columns)"
    )]
    DistanceShape {
        expected: usize,
        rows: usize,
        row: usize,
        cols: usize,
    },

    #[error("distance[{from}][{to}] must be finite and non-negative, got {value}")]
    InvalidDistance { from: usize, to: usize, value: f64 },

    #[error("property {property}: missing {field}")]
    MissingPropertyData {
        property: String,
        field: &'static str,
    },

    #[error("property {property}: {field} has {found} values, expected {expected}")]
    SeriesLength {
        property: String,
        field: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("property {property}: {field} is out of range, got {value}")]
    InvalidParameter {
        property: String,
        field: &'static str,
        value: f64,
    },

    #[error("property {property}: {field}[{day}] must be finite, got {value}")]
    NonFiniteSeries {
        property: String,
        field: &'static str,
        day: usize,
        value: f64,
    },

    #[error("steps_per_day must be positive")]
    NoSteps,

    #[error(
        "property {property}: {len} timesteps is not a whole number of {steps_per_day}-step days"
    )]
    PartialDay {
        property: String,
        len: usize,
        steps_per_day: usize,
    },

    #[error("property {property}: spans {found} days, expected {expected}")]
    DayCountMismatch {
        property: String,
        expected: usize,
        found: usize,
    },
}

/// The external solver failed to produce a usable answer.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum SolverFailure {
    #[error("solver timed out after {0:?}")]
    TimedOut(Duration),

    #[error("solver error: {0}")]
    Backend(String),
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ClusteringError {
    #[error("invalid configuration: {0}")]
    Configuration(#[from] ConfigError),

    #[error("model is infeasible")]
    Infeasible,

    #[error(transparent)]
    Solver(#[from] SolverFailure),
}
