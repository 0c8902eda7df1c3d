//! Run inputs and their validation.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::PreservationOptions;
use crate::error::ConfigError;
use crate::traits::PropertyKey;

/// Day-to-day distances, row-major: `get(i, j)` is the cost of representing
/// day `j` by day `i`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistanceMatrix {
    rows: Vec<Vec<f64>>,
}

impl DistanceMatrix {
    pub fn new(rows: Vec<Vec<f64>>) -> Self {
        Self { rows }
    }

    /// Builds an `n x n` matrix from a distance function.
    pub fn from_fn(n: usize, mut distance: impl FnMut(usize, usize) -> f64) -> Self {
        let rows = (0..n)
            .map(|i| (0..n).map(|j| distance(i, j)).collect())
            .collect();
        Self { rows }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn get(&self, from: usize, to: usize) -> f64 {
        self.rows[from][to]
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    fn validate(&self, n_days: usize) -> Result<(), ConfigError> {
        for (row, values) in self.rows.iter().enumerate() {
            if values.len() != n_days {
                return Err(ConfigError::DistanceShape {
                    expected: n_days,
                    rows: self.rows.len(),
                    row,
                    cols: values.len(),
                });
            }
        }
        if self.rows.len() != n_days {
            return Err(ConfigError::DistanceShape {
                expected: n_days,
                rows: self.rows.len(),
                row: 0,
                cols: self.rows.first().map_or(0, Vec::len),
            });
        }

        for (from, values) in self.rows.iter().enumerate() {
            for (to, &value) in values.iter().enumerate() {
                if !value.is_finite() || value < 0.0 {
                    return Err(ConfigError::InvalidDistance { from, to, value });
                }
            }
        }

        Ok(())
    }
}

/// Per-property inputs. Each field is only required when the preservation
/// option that reads it is enabled.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PropertyData {
    /// Sum of the property over each day's timesteps.
    pub daily_total: Option<Vec<f64>>,
    /// Maximum of the property within each day.
    pub daily_max: Option<Vec<f64>>,
    /// Maximum of `daily_max` over all days.
    pub global_max: Option<f64>,
    /// Accepted relative error on the estimated total.
    pub rel_tol: Option<f64>,
    /// Share of `global_max` that at least one chosen day must reach.
    pub min_peak_share: Option<f64>,
}

impl PropertyData {
    pub fn with_totals(mut self, daily_total: Vec<f64>, rel_tol: f64) -> Self {
        self.daily_total = Some(daily_total);
        self.rel_tol = Some(rel_tol);
        self
    }

    /// Sets the daily maxima; the global maximum is derived from them.
    pub fn with_peaks(mut self, daily_max: Vec<f64>, min_peak_share: f64) -> Self {
        self.global_max = daily_max.iter().copied().reduce(f64::max);
        self.daily_max = Some(daily_max);
        self.min_peak_share = Some(min_peak_share);
        self
    }
}

/// Everything a single clustering run needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClusteringParams<P: PropertyKey> {
    pub n_days: usize,
    pub n_clusters: usize,
    #[serde(default)]
    pub n_extreme_days: usize,
    pub distance: DistanceMatrix,
    #[serde(default)]
    pub properties: BTreeMap<P, PropertyData>,
}

impl<P: PropertyKey> ClusteringParams<P> {
    pub fn new(n_clusters: usize, distance: DistanceMatrix) -> Self {
        Self {
            n_days: distance.len(),
            n_clusters,
            n_extreme_days: 0,
            distance,
            properties: BTreeMap::new(),
        }
    }

    pub fn with_extreme_days(mut self, n_extreme_days: usize) -> Self {
        self.n_extreme_days = n_extreme_days;
        self
    }

    pub fn with_property(mut self, key: P, data: PropertyData) -> Self {
        self.properties.insert(key, data);
        self
    }

    pub fn validate(&self, options: &PreservationOptions) -> Result<(), ConfigError> {
        if self.n_days == 0 {
            return Err(ConfigError::NoDays);
        }
        if self.n_clusters == 0 {
            return Err(ConfigError::NoClusters);
        }
        if self.n_clusters > self.n_days {
            return Err(ConfigError::TooManyClusters {
                n_clusters: self.n_clusters,
                n_days: self.n_days,
            });
        }
        if self.n_extreme_days > self.n_days {
            return Err(ConfigError::TooManyExtremeDays {
                n_extreme_days: self.n_extreme_days,
                n_days: self.n_days,
            });
        }
        self.distance.validate(self.n_days)?;

        let totals = options.preserve_total_values;
        let peaks = options.preserve_peak_values;
        for (key, data) in &self.properties {
            let property = format!("{key:?}");
            let check = FieldCheck {
                property: &property,
                n_days: self.n_days,
            };

            check.series("daily_total", data.daily_total.as_deref(), totals)?;
            check.scalar("rel_tol", data.rel_tol, totals, Sign::NonNegative)?;

            check.series("daily_max", data.daily_max.as_deref(), peaks)?;
            check.scalar("global_max", data.global_max, peaks, Sign::Any)?;
            check.scalar("min_peak_share", data.min_peak_share, peaks, Sign::NonNegative)?;
        }

        Ok(())
    }
}

#[derive(Clone, Copy, PartialEq)]
enum Sign {
    Any,
    NonNegative,
}

/// Checks one property's fields. Series lengths are always checked; values
/// are only checked, and only required, when the option reading them is on.
struct FieldCheck<'a> {
    property: &'a str,
    n_days: usize,
}

impl FieldCheck<'_> {
    fn series(
        &self,
        field: &'static str,
        values: Option<&[f64]>,
        required: bool,
    ) -> Result<(), ConfigError> {
        let Some(values) = values else {
            return if required {
                Err(self.missing(field))
            } else {
                Ok(())
            };
        };
        if values.len() != self.n_days {
            return Err(ConfigError::SeriesLength {
                property: self.property.to_string(),
                field,
                expected: self.n_days,
                found: values.len(),
            });
        }
        if !required {
            return Ok(());
        }

        match values.iter().position(|v| !v.is_finite()) {
            Some(day) => Err(ConfigError::NonFiniteSeries {
                property: self.property.to_string(),
                field,
                day,
                value: values[day],
            }),
            None => Ok(()),
        }
    }

    fn scalar(
        &self,
        field: &'static str,
        value: Option<f64>,
        required: bool,
        sign: Sign,
    ) -> Result<(), ConfigError> {
        match value {
            _ if !required => Ok(()),
            None => Err(self.missing(field)),
            Some(value) if !value.is_finite() || (sign == Sign::NonNegative && value < 0.0) => {
                Err(ConfigError::InvalidParameter {
                    property: self.property.to_string(),
                    field,
                    value,
                })
            }
            Some(_) => Ok(()),
        }
    }

    fn missing(&self, field: &'static str) -> ConfigError {
        ConfigError::MissingPropertyData {
            property: self.property.to_string(),
            field,
        }
    }
}
