//! Run options.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Which preservation guarantees are enforced on top of the plain k-medoids model.
///
/// Captured by value when a model is built and never mutated afterwards.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreservationOptions {
    /// Keep each property's estimated total within its relative tolerance.
    pub preserve_total_values: bool,
    /// Keep at least one chosen day whose peak clears the required share.
    pub preserve_peak_values: bool,
}

impl PreservationOptions {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn all() -> Self {
        Self {
            preserve_total_values: true,
            preserve_peak_values: true,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolveOptions {
    /// Wall-clock limit for a single solve. `None` waits indefinitely.
    pub time_limit_secs: Option<u64>,
}

impl SolveOptions {
    pub fn time_limit(&self) -> Option<Duration> {
        self.time_limit_secs.map(Duration::from_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_plain() {
        let options = PreservationOptions::default();
        assert!(!options.preserve_total_values);
        assert!(!options.preserve_peak_values);
        assert_eq!(options, PreservationOptions::plain());
    }

    #[test]
    fn test_partial_deserialize_fills_defaults() {
        let options: PreservationOptions =
            serde_json::from_str(r#"{"preserve_peak_values": true}"#).unwrap();
        assert!(options.preserve_peak_values);
        assert!(!options.preserve_total_values);
    }

    #[test]
    fn test_solve_options_time_limit() {
        let options: SolveOptions = serde_json::from_str(r#"{"time_limit_secs": 5}"#).unwrap();
        assert_eq!(options.time_limit(), Some(Duration::from_secs(5)));
        assert_eq!(SolveOptions::default().time_limit(), None);
    }
}
