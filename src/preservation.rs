//! Optional guarantees layered over the assignment model: bounded relative
//! error on each property's total, and retention of a day close to each
//! property's peak.
//!
//! Both are always built. [`ClusteringModel::apply_options`] decides what is
//! active.

use tracing::debug;

use crate::assignment::ClusteringModel;
use crate::model::{Constraint, ConstraintFamily, LinearExpr, Relation};
use crate::params::{ClusteringParams, PropertyData};
use crate::traits::PropertyKey;

/// Per-property inputs with every field present. Fields the enabled options
/// never read default to zero.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct PropertyInputs {
    pub(crate) daily_total: Vec<f64>,
    pub(crate) daily_max: Vec<f64>,
    pub(crate) global_max: f64,
    pub(crate) rel_tol: f64,
    pub(crate) min_peak_share: f64,
}

impl PropertyInputs {
    fn resolve(data: &PropertyData, n_days: usize) -> Self {
        Self {
            daily_total: data.daily_total.clone().unwrap_or_else(|| vec![0.0; n_days]),
            daily_max: data.daily_max.clone().unwrap_or_else(|| vec![0.0; n_days]),
            global_max: data.global_max.unwrap_or(0.0),
            rel_tol: data.rel_tol.unwrap_or(0.0),
            min_peak_share: data.min_peak_share.unwrap_or(0.0),
        }
    }

    fn true_total(&self) -> f64 {
        self.daily_total.iter().sum()
    }
}

impl<P: PropertyKey> ClusteringModel<P> {
    pub(crate) fn add_preservation(&mut self, params: &ClusteringParams<P>) {
        for (key, data) in &params.properties {
            let inputs = PropertyInputs::resolve(data, self.n_days);
            let witnesses = (0..self.n_days)
                .map(|i| self.arena.add_binary(format!("w[{key:?},{i}]")))
                .collect();
            self.w.insert(key.clone(), witnesses);
            self.properties.insert(key.clone(), inputs);
        }

        let keys: Vec<P> = self.properties.keys().cloned().collect();
        for key in &keys {
            self.add_total_value_constraints(key);
            self.add_peak_value_constraints(key);
        }
    }

    fn add_total_value_constraints(&mut self, key: &P) {
        let inputs = &self.properties[key];
        let true_total = inputs.true_total();
        let upper = (1.0 + inputs.rel_tol) * true_total;
        let lower = (1.0 - inputs.rel_tol) * true_total;
        let estimate = self.estimated_total(key);

        self.constraints.push(Constraint::new(
            ConstraintFamily::RelativeErrorUpper,
            format!("{}[{key:?}]", ConstraintFamily::RelativeErrorUpper),
            estimate.clone(),
            Relation::LessEq,
            upper,
        ));
        self.constraints.push(Constraint::new(
            ConstraintFamily::RelativeErrorLower,
            format!("{}[{key:?}]", ConstraintFamily::RelativeErrorLower),
            estimate,
            Relation::GreaterEq,
            lower,
        ));
    }

    fn add_peak_value_constraints(&mut self, key: &P) {
        let inputs = &self.properties[key];
        let threshold = inputs.min_peak_share * inputs.global_max;
        let daily_max = inputs.daily_max.clone();
        let witnesses = self.w[key].clone();

        // chosen(i) is 0/1, so it masks the day's peak without a big-M term.
        for (i, (&peak, &witness)) in daily_max.iter().zip(&witnesses).enumerate() {
            let mut lhs = self.chosen(i).scaled(peak);
            lhs.add_term(witness, -threshold);
            self.constraints.push(Constraint::new(
                ConstraintFamily::PreservePeak,
                format!("{}[{key:?},{i}]", ConstraintFamily::PreservePeak),
                lhs,
                Relation::GreaterEq,
                0.0,
            ));
        }

        self.constraints.push(Constraint::new(
            ConstraintFamily::AtLeastOnePreserved,
            format!("{}[{key:?}]", ConstraintFamily::AtLeastOnePreserved),
            LinearExpr::sum(witnesses),
            Relation::GreaterEq,
            1.0,
        ));
    }

    /// Σ_i dailyTotal[p,i]; `None` for an unknown property.
    pub fn true_total(&self, property: &P) -> Option<f64> {
        self.properties.get(property).map(PropertyInputs::true_total)
    }

    /// Σ_i weight(i)·dailyTotal[p,i]. Empty for an unknown property.
    pub fn estimated_total(&self, property: &P) -> LinearExpr {
        let mut estimate = LinearExpr::new();
        if let Some(inputs) = self.properties.get(property) {
            for (i, &total) in inputs.daily_total.iter().enumerate() {
                estimate.add_scaled(&self.weight(i), total);
            }
        }
        estimate
    }

    /// Activates constraint families and fixes witnesses according to the
    /// options captured at build time. Assigns state outright, so repeated
    /// calls leave the model unchanged.
    pub fn apply_options(&mut self) {
        let totals = self.options.preserve_total_values;
        let peaks = self.options.preserve_peak_values;

        for constraint in &mut self.constraints {
            constraint.active = match constraint.family {
                ConstraintFamily::RelativeErrorUpper | ConstraintFamily::RelativeErrorLower => {
                    totals
                }
                ConstraintFamily::PreservePeak | ConstraintFamily::AtLeastOnePreserved => peaks,
                _ => true,
            };
        }

        let fixed = if peaks { None } else { Some(0.0) };
        for witnesses in self.w.values() {
            for &w in witnesses {
                self.arena.get_mut(w).fixed = fixed;
            }
        }

        debug!(
            preserve_total_values = totals,
            preserve_peak_values = peaks,
            active = self.constraints.iter().filter(|c| c.active).count(),
            "preservation options applied"
        );
    }
}
