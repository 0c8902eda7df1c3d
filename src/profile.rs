//! Daily profiles: continuous per-property series cut into days of a fixed
//! number of timesteps, plus the per-day aggregates the preservation
//! constraints read.

use std::collections::BTreeMap;

use crate::error::ConfigError;
use crate::params::PropertyData;
use crate::traits::PropertyKey;

#[derive(Debug, Clone, PartialEq)]
pub struct DailyProfiles<P: PropertyKey> {
    steps_per_day: usize,
    n_days: usize,
    /// `days[p][d]` holds the `steps_per_day` values of day `d`.
    days: BTreeMap<P, Vec<Vec<f64>>>,
}

impl<P: PropertyKey> DailyProfiles<P> {
    /// Splits each series into consecutive days.
    ///
    /// Every series must cover the same whole number of days.
    pub fn from_series(
        series: BTreeMap<P, Vec<f64>>,
        steps_per_day: usize,
    ) -> Result<Self, ConfigError> {
        if steps_per_day == 0 {
            return Err(ConfigError::NoSteps);
        }

        let mut n_days = None;
        let mut days = BTreeMap::new();
        for (key, values) in series {
            if values.len() % steps_per_day != 0 {
                return Err(ConfigError::PartialDay {
                    property: format!("{key:?}"),
                    len: values.len(),
                    steps_per_day,
                });
            }

            let split: Vec<Vec<f64>> = values.chunks(steps_per_day).map(<[f64]>::to_vec).collect();
            match n_days {
                None => n_days = Some(split.len()),
                Some(expected) if expected != split.len() => {
                    return Err(ConfigError::DayCountMismatch {
                        property: format!("{key:?}"),
                        expected,
                        found: split.len(),
                    });
                }
                Some(_) => {}
            }
            days.insert(key, split);
        }

        Ok(Self {
            steps_per_day,
            n_days: n_days.unwrap_or(0),
            days,
        })
    }

    pub fn n_days(&self) -> usize {
        self.n_days
    }

    pub fn steps_per_day(&self) -> usize {
        self.steps_per_day
    }

    pub fn properties(&self) -> impl Iterator<Item = &P> {
        self.days.keys()
    }

    /// Timestep values of `property` on `day`.
    pub fn day(&self, property: &P, day: usize) -> Option<&[f64]> {
        self.days.get(property).and_then(|days| days.get(day)).map(Vec::as_slice)
    }

    pub fn daily_totals(&self, property: &P) -> Option<Vec<f64>> {
        self.days
            .get(property)
            .map(|days| days.iter().map(|day| day.iter().sum()).collect())
    }

    pub fn daily_maxima(&self, property: &P) -> Option<Vec<f64>> {
        self.days.get(property).map(|days| {
            days.iter()
                .map(|day| day.iter().copied().fold(f64::NEG_INFINITY, f64::max))
                .collect()
        })
    }

    pub fn global_max(&self, property: &P) -> Option<f64> {
        self.daily_maxima(property)?.into_iter().reduce(f64::max)
    }

    /// Packages the aggregates of every property with a shared tolerance and
    /// peak share.
    pub fn property_data(&self, rel_tol: f64, min_peak_share: f64) -> BTreeMap<P, PropertyData> {
        self.days
            .keys()
            .map(|key| {
                let data = PropertyData {
                    daily_total: self.daily_totals(key),
                    daily_max: self.daily_maxima(key),
                    global_max: self.global_max(key),
                    rel_tol: Some(rel_tol),
                    min_peak_share: Some(min_peak_share),
                };
                (key.clone(), data)
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profiles() -> DailyProfiles<&'static str> {
        let series = BTreeMap::from([
            ("demand", vec![1.0, 2.0, 3.0, 4.0, 0.5, 0.5]),
            ("solar", vec![0.0, 5.0, 0.0, 1.0, 0.0, 2.0]),
        ]);
        DailyProfiles::from_series(series, 2).unwrap()
    }

    #[test]
    fn test_splits_into_days() {
        let p = profiles();
        assert_eq!(p.n_days(), 3);
        assert_eq!(p.day(&"demand", 1), Some(&[3.0, 4.0][..]));
        assert_eq!(p.day(&"demand", 3), None);
    }

    #[test]
    fn test_aggregates() {
        let p = profiles();
        assert_eq!(p.daily_totals(&"demand"), Some(vec![3.0, 7.0, 1.0]));
        assert_eq!(p.daily_maxima(&"solar"), Some(vec![5.0, 1.0, 2.0]));
        assert_eq!(p.global_max(&"solar"), Some(5.0));
        assert_eq!(p.global_max(&"wind"), None);
    }

    #[test]
    fn test_property_data_is_complete() {
        let data = profiles().property_data(0.05, 0.9);
        let demand = &data["demand"];
        assert_eq!(demand.global_max, Some(4.0));
        assert_eq!(demand.rel_tol, Some(0.05));
        assert_eq!(demand.min_peak_share, Some(0.9));
        assert_eq!(data.len(), 2);
    }

    #[test]
    fn test_rejects_partial_day() {
        let series = BTreeMap::from([("demand", vec![1.0, 2.0, 3.0])]);
        assert!(matches!(
            DailyProfiles::from_series(series, 2),
            Err(ConfigError::PartialDay { len: 3, .. })
        ));
    }

    #[test]
    fn test_rejects_mismatched_day_counts() {
        let series = BTreeMap::from([("a", vec![1.0, 2.0]), ("b", vec![1.0, 2.0, 3.0, 4.0])]);
        assert!(matches!(
            DailyProfiles::from_series(series, 2),
            Err(ConfigError::DayCountMismatch { expected: 1, found: 2, .. })
        ));
    }

    #[test]
    fn test_rejects_zero_steps() {
        let series: BTreeMap<&str, Vec<f64>> = BTreeMap::new();
        assert_eq!(DailyProfiles::from_series(series, 0), Err(ConfigError::NoSteps));
    }
}
