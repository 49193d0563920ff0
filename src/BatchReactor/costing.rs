//! # Cost Correlation Module
//!
//! ## Aim
//! Power-law purchase cost scaling for process equipment:
//!
//! `purchase = units * BM * base_cost * (CE / CE_ref) * (size / S_ref)^n`
//!
//! Each `CostItem` names the design-result entry it scales on (the size
//! driver). Sizes stored in design results are per reactor; items flagged
//! `per_reactor` multiply by the reactor count taken from the
//! `"Number of reactors"` entry. The CE plant cost index escalates
//! correlations from their reference year to the analysis year.
//!
//! The default registry carries the five NREL batch bioreactor items
//! (vessels, agitators, cleaning-in-place, recirculation pumps, heat
//! exchangers).

use crate::Reactions::reaction_step::BioprocessError;
use crate::Units::unit_op::DesignResults;
use serde::{Deserialize, Serialize};

/// CE plant cost index used to escalate correlations (2017 annual value)
pub const CE_DEFAULT: f64 = 567.5;

/// One power-law cost correlation
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostItem {
    /// Design-result entry the correlation scales on
    pub basis: String,
    /// Equipment name in the cost breakdown
    pub name: String,
    /// Purchase cost at the reference size (USD, at ce_ref)
    pub base_cost: f64,
    /// Reference size the base cost was quoted at
    pub ref_size: f64,
    /// Scaling exponent
    pub exponent: f64,
    /// Bare module factor (installation multiplier)
    pub bare_module: f64,
    /// CE index of the correlation's reference year
    pub ce_ref: f64,
    /// Electricity demand at the reference size (kW per unit)
    pub kW: f64,
    /// Multiply by the reactor count from the design results
    pub per_reactor: bool,
    /// Scale on the magnitude of the size driver (for duties that may be
    /// negative under cooling)
    pub magnitude: bool,
}

impl CostItem {
    /// Purchase cost of `units` identical items of the given size at the
    /// plant CE index
    #[allow(non_snake_case)]
    pub fn purchase_cost(&self, size: f64, units: f64, CE: f64) -> f64 {
        let size = if self.magnitude { size.abs() } else { size.max(0.0) };
        units * self.bare_module * self.base_cost * (CE / self.ce_ref)
            * (size / self.ref_size).powf(self.exponent)
    }
}

/// Named cost breakdown produced by a costing pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub entries: Vec<(String, f64)>,
}

impl CostBreakdown {
    pub fn insert(&mut self, name: &str, cost: f64) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = cost;
        } else {
            self.entries.push((name.to_string(), cost));
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, c)| *c)
    }

    pub fn total(&self) -> f64 {
        self.entries.iter().map(|(_, c)| c).sum()
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }
}

/// Registry of cost correlations for one unit operation, evaluated fresh
/// against the current design results on every costing pass
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostCorrelations {
    /// Plant CE cost index of the analysis year
    pub CE: f64,
    pub items: Vec<CostItem>,
}

impl CostCorrelations {
    #[allow(non_snake_case)]
    pub fn new(CE: f64) -> Self {
        Self {
            CE,
            items: Vec::new(),
        }
    }

    pub fn add(&mut self, item: CostItem) {
        self.items.push(item);
    }

    /// The NREL batch bioreactor cost stack: stainless vessels, agitators
    /// and recirculation pumps per reactor, one shared cleaning-in-place
    /// skid, and duty-scaled heat exchangers
    pub fn nrel_batch_bioreactor() -> Self {
        let mut correlations = Self::new(CE_DEFAULT);
        correlations.add(CostItem {
            basis: "Reactor volume".to_string(),
            name: "Reactors".to_string(),
            base_cost: 844000.0,
            ref_size: 3785.0,
            exponent: 0.5,
            bare_module: 1.5,
            ce_ref: 521.9,
            kW: 0.0,
            per_reactor: true,
            magnitude: false,
        });
        correlations.add(CostItem {
            basis: "Reactor volume".to_string(),
            name: "Agitators".to_string(),
            base_cost: 52500.0,
            ref_size: 3785.0,
            exponent: 0.5,
            bare_module: 1.5,
            ce_ref: 521.9,
            kW: 22.371,
            per_reactor: true,
            magnitude: false,
        });
        correlations.add(CostItem {
            basis: "Reactor volume".to_string(),
            name: "Cleaning in place".to_string(),
            base_cost: 421000.0,
            ref_size: 3785.0,
            exponent: 0.6,
            bare_module: 1.8,
            ce_ref: 521.9,
            kW: 0.0,
            per_reactor: false,
            magnitude: false,
        });
        correlations.add(CostItem {
            basis: "Recirculation flow rate".to_string(),
            name: "Recirculation pumps".to_string(),
            base_cost: 47200.0,
            ref_size: 77.22216,
            exponent: 0.8,
            bare_module: 2.3,
            ce_ref: 522.0,
            kW: 30.0,
            per_reactor: true,
            magnitude: false,
        });
        correlations.add(CostItem {
            basis: "Reactor duty".to_string(),
            name: "Heat exchangers".to_string(),
            base_cost: 23900.0,
            ref_size: 20920000.0,
            exponent: 0.7,
            bare_module: 2.2,
            ce_ref: 522.0,
            kW: 0.0,
            per_reactor: true,
            magnitude: true,
        });
        correlations
    }

    fn units_for(&self, item: &CostItem, design: &DesignResults) -> f64 {
        if item.per_reactor {
            design.get("Number of reactors").unwrap_or(1.0)
        } else {
            1.0
        }
    }

    /// Evaluate every correlation against the design results. A missing
    /// size-driver entry is a configuration error, not a zero.
    pub fn evaluate(&self, design: &DesignResults) -> Result<CostBreakdown, BioprocessError> {
        let mut breakdown = CostBreakdown::default();
        for item in &self.items {
            let size = design
                .get(&item.basis)
                .ok_or_else(|| BioprocessError::MissingDesignBasis(item.basis.clone()))?;
            let units = self.units_for(item, design);
            breakdown.insert(&item.name, item.purchase_cost(size, units, self.CE));
        }
        Ok(breakdown)
    }

    /// Total electricity demand of the costed items (kW)
    pub fn total_power(&self, design: &DesignResults) -> f64 {
        self.items
            .iter()
            .map(|item| item.kW * self.units_for(item, design))
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_power_law_scaling() {
        let item = CostItem {
            basis: "Reactor volume".to_string(),
            name: "Reactors".to_string(),
            base_cost: 844000.0,
            ref_size: 3785.0,
            exponent: 0.5,
            bare_module: 1.5,
            ce_ref: 521.9,
            kW: 0.0,
            per_reactor: true,
            magnitude: false,
        };
        // at the reference size and reference CE the cost is base * BM
        assert_relative_eq!(
            item.purchase_cost(3785.0, 1.0, 521.9),
            844000.0 * 1.5,
            epsilon = 1e-6
        );
        // quarter size at exponent 0.5 -> half cost
        assert_relative_eq!(
            item.purchase_cost(3785.0 / 4.0, 1.0, 521.9),
            844000.0 * 1.5 / 2.0,
            epsilon = 1e-6
        );
        // CE escalation is linear
        assert_relative_eq!(
            item.purchase_cost(3785.0, 1.0, 2.0 * 521.9),
            2.0 * 844000.0 * 1.5,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_magnitude_flag_for_cooling_duty() {
        let item = CostItem {
            basis: "Reactor duty".to_string(),
            name: "Heat exchangers".to_string(),
            base_cost: 23900.0,
            ref_size: 20920000.0,
            exponent: 0.7,
            bare_module: 2.2,
            ce_ref: 522.0,
            kW: 0.0,
            per_reactor: true,
            magnitude: true,
        };
        // exothermic duty is negative; magnitude items still cost money
        let cooling = item.purchase_cost(-20920000.0, 1.0, 522.0);
        assert_relative_eq!(cooling, 23900.0 * 2.2, epsilon = 1e-6);
    }

    #[test]
    fn test_evaluate_against_design() {
        let correlations = CostCorrelations::nrel_batch_bioreactor();
        let mut design = DesignResults::default();
        design.insert("Reactor volume", 3785.0);
        design.insert("Recirculation flow rate", 77.22216);
        design.insert("Reactor duty", -20920000.0);
        design.insert("Number of reactors", 2.0);
        let breakdown = correlations.evaluate(&design).unwrap();
        let ce_factor = CE_DEFAULT / 521.9;
        assert_relative_eq!(
            breakdown.get("Reactors").unwrap(),
            2.0 * 1.5 * 844000.0 * ce_factor,
            epsilon = 1e-3
        );
        // CIP is a shared skid, no count multiplier
        assert_relative_eq!(
            breakdown.get("Cleaning in place").unwrap(),
            1.8 * 421000.0 * ce_factor,
            epsilon = 1e-3
        );
        assert!(breakdown.total() > 0.0);
    }

    #[test]
    fn test_missing_basis_is_error() {
        let correlations = CostCorrelations::nrel_batch_bioreactor();
        let mut design = DesignResults::default();
        design.insert("Reactor volume", 100.0);
        let err = correlations.evaluate(&design).unwrap_err();
        assert!(matches!(err, BioprocessError::MissingDesignBasis(_)));
    }

    #[test]
    fn test_total_power() {
        let correlations = CostCorrelations::nrel_batch_bioreactor();
        let mut design = DesignResults::default();
        design.insert("Number of reactors", 3.0);
        // agitators 22.371 kW and pumps 30 kW, per reactor
        assert_relative_eq!(
            correlations.total_power(&design),
            3.0 * (22.371 + 30.0),
            epsilon = 1e-9
        );
    }
}
