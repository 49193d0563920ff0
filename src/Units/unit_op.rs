//! # Unit Operation Module
//!
//! ## Aim
//! The four-phase lifecycle every process step follows:
//!
//! `Constructed -> Configured(setup) -> [run -> design -> cost]*`
//!
//! The bracketed triple repeats once per simulation pass and is idempotent
//! given unchanged inputs - each phase is a pure function of the current
//! inlet streams and the fixed configuration, no state carries between
//! passes.
//!
//! Configuration errors are fatal at setup. Missing chemical species are
//! not: the reaction engine degrades to zero contribution and records the
//! degradation in the unit's warning list.
//!
//! The `ProcessUnit` enum dispatches the trait over the concrete unit types
//! so the flowsheet can hold a heterogeneous unit list without boxing.

use crate::BatchReactor::bioreactor::BatchBioreactor;
use crate::BatchReactor::costing::CostBreakdown;
use crate::Reactions::reaction_step::{BalanceWarning, BioprocessError};
use crate::Streams::process_stream::ProcessStream;
use crate::Units::downstream::{
    CellSeparator, Decolorization, Desalting, FluidBedDryer, OxygenCompressor,
};
use enum_dispatch::enum_dispatch;
use serde::{Deserialize, Serialize};

/// Ordered map of named design quantities, rebuilt on every design pass
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DesignResults {
    pub entries: Vec<(String, f64)>,
}

impl DesignResults {
    pub fn insert(&mut self, name: &str, value: f64) {
        if let Some(entry) = self.entries.iter_mut().find(|(n, _)| n == name) {
            entry.1 = value;
        } else {
            self.entries.push((name.to_string(), value));
        }
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.entries.iter().find(|(n, _)| n == name).map(|(_, v)| *v)
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, f64)> {
        self.entries.iter()
    }
}

/// Lifecycle of one process step
#[enum_dispatch]
pub trait UnitOperation {
    fn unit_name(&self) -> &str;

    /// Validate the configuration and bind the reaction model; fatal on
    /// configuration errors, called once before the first simulation pass
    fn setup(&mut self) -> Result<(), BioprocessError>;

    /// Mutate the outlet streams from the inlet streams
    fn run(&mut self) -> Result<(), BioprocessError>;

    /// Compute sizing and duty from the outlet state
    fn design(&mut self) -> Result<(), BioprocessError>;

    /// Evaluate cost correlations against the design results
    fn cost(&mut self) -> Result<(), BioprocessError>;

    fn ins(&self) -> &[ProcessStream];

    fn ins_mut(&mut self) -> &mut [ProcessStream];

    fn outs(&self) -> &[ProcessStream];

    fn design_results(&self) -> &DesignResults;

    fn purchase_costs(&self) -> &CostBreakdown;

    /// Electricity demand (kW)
    fn power_demand(&self) -> f64;

    /// Material balance degradations collected during the last run
    fn balance_warnings(&self) -> &[BalanceWarning];
}

/// The concrete unit operations of the tagatose flowsheet
#[enum_dispatch(UnitOperation)]
#[derive(Debug, Clone)]
pub enum ProcessUnit {
    BatchBioreactor,
    OxygenCompressor,
    CellSeparator,
    Decolorization,
    Desalting,
    FluidBedDryer,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_design_results_insert_and_replace() {
        let mut design = DesignResults::default();
        design.insert("Reactor volume", 10.0);
        design.insert("Number of reactors", 2.0);
        design.insert("Reactor volume", 12.0);
        assert_eq!(design.get("Reactor volume"), Some(12.0));
        assert_eq!(design.entries.len(), 2);
        assert_eq!(design.get("Missing"), None);
    }
}
