//! # Flowsheet Module
//!
//! ## Aim
//! Wires unit operations into a process system and runs one deterministic,
//! topologically-ordered simulation pass through every unit's
//! run/design/cost phases.
//!
//! Units are evaluated in insertion order; a stream link copies the
//! producer's outlet into the consumer's inlet just before the consumer
//! runs, so every stream keeps a single writer and repeated passes are
//! independent. Links must point forward (producer inserted before
//! consumer) - the insertion order is the topological order.

use crate::Reactions::reaction_step::{BalanceWarning, BioprocessError};
use crate::Units::unit_op::{ProcessUnit, UnitOperation};
use log::info;
use prettytable::{Cell, Row, Table};

/// Producer outlet -> consumer inlet connection
#[derive(Debug, Clone, Copy)]
pub struct StreamLink {
    pub from_unit: usize,
    pub from_slot: usize,
    pub to_unit: usize,
    pub to_slot: usize,
}

/// An ordered set of unit operations with stream connections
pub struct ProcessSystem {
    pub name: String,
    pub units: Vec<ProcessUnit>,
    pub links: Vec<StreamLink>,
    simulated: bool,
}

impl ProcessSystem {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            units: Vec::new(),
            links: Vec::new(),
            simulated: false,
        }
    }

    /// Append a unit, returning its index in evaluation order
    pub fn add_unit(&mut self, unit: impl Into<ProcessUnit>) -> usize {
        self.units.push(unit.into());
        self.units.len() - 1
    }

    /// Connect `from_unit` outlet `from_slot` to `to_unit` inlet `to_slot`.
    /// The producer must have been inserted before the consumer.
    pub fn connect(
        &mut self,
        from_unit: usize,
        from_slot: usize,
        to_unit: usize,
        to_slot: usize,
    ) -> Result<(), BioprocessError> {
        if from_unit >= self.units.len() || to_unit >= self.units.len() {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "stream link references unknown unit ({} -> {})",
                from_unit, to_unit
            )));
        }
        if from_unit >= to_unit {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "stream link {} -> {} goes against the evaluation order; \
                 insert producers before consumers",
                from_unit, to_unit
            )));
        }
        if from_slot >= self.units[from_unit].outs().len() {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "unit {} has no outlet slot {}",
                from_unit, from_slot
            )));
        }
        if to_slot >= self.units[to_unit].ins().len() {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "unit {} has no inlet slot {}",
                to_unit, to_slot
            )));
        }
        self.links.push(StreamLink {
            from_unit,
            from_slot,
            to_unit,
            to_slot,
        });
        Ok(())
    }

    /// One full simulation pass: for each unit in order, pull the linked
    /// inlet streams, then run, design and cost
    pub fn simulate(&mut self) -> Result<(), BioprocessError> {
        info!("simulating system '{}' ({} units)", self.name, self.units.len());
        for i in 0..self.units.len() {
            let incoming: Vec<StreamLink> = self
                .links
                .iter()
                .copied()
                .filter(|link| link.to_unit == i)
                .collect();
            for link in incoming {
                let upstream = self.units[link.from_unit].outs()[link.from_slot].clone();
                self.units[i].ins_mut()[link.to_slot].copy_like(&upstream);
            }
            let unit = &mut self.units[i];
            unit.setup()?;
            unit.run()?;
            unit.design()?;
            unit.cost()?;
        }
        self.simulated = true;
        Ok(())
    }

    pub fn is_simulated(&self) -> bool {
        self.simulated
    }

    /// Sum of all equipment purchase costs (USD)
    pub fn total_purchase_cost(&self) -> f64 {
        self.units.iter().map(|u| u.purchase_costs().total()).sum()
    }

    /// Total electricity demand (kW)
    pub fn total_power(&self) -> f64 {
        self.units.iter().map(|u| u.power_demand()).sum()
    }

    /// All material balance warnings of the last pass, per unit
    pub fn balance_warnings(&self) -> Vec<(&str, &BalanceWarning)> {
        self.units
            .iter()
            .flat_map(|u| {
                u.balance_warnings()
                    .iter()
                    .map(move |w| (u.unit_name(), w))
            })
            .collect()
    }

    /// Inlet streams that no link feeds: the system-level feeds
    pub fn feed_streams(&self) -> Vec<&crate::Streams::process_stream::ProcessStream> {
        let mut feeds = Vec::new();
        for (i, unit) in self.units.iter().enumerate() {
            for (slot, stream) in unit.ins().iter().enumerate() {
                let linked = self
                    .links
                    .iter()
                    .any(|link| link.to_unit == i && link.to_slot == slot);
                if !linked {
                    feeds.push(stream);
                }
            }
        }
        feeds
    }

    /// Outlet streams no link consumes: the system-level products and vents
    pub fn product_streams(&self) -> Vec<&crate::Streams::process_stream::ProcessStream> {
        let mut products = Vec::new();
        for (i, unit) in self.units.iter().enumerate() {
            for (slot, stream) in unit.outs().iter().enumerate() {
                let linked = self
                    .links
                    .iter()
                    .any(|link| link.from_unit == i && link.from_slot == slot);
                if !linked {
                    products.push(stream);
                }
            }
        }
        products
    }

    /// Print per-unit design and cost tables
    pub fn print_report(&self) {
        println!("\n=== SYSTEM REPORT: {} ===", self.name);
        for unit in &self.units {
            println!("\nUnit: {}", unit.unit_name());
            let mut design_table = Table::new();
            design_table.add_row(Row::new(vec![Cell::new("Design"), Cell::new("Value")]));
            for (name, value) in unit.design_results().iter() {
                design_table.add_row(Row::new(vec![
                    Cell::new(name),
                    Cell::new(&format!("{:.3}", value)),
                ]));
            }
            design_table.printstd();
            let mut cost_table = Table::new();
            cost_table.add_row(Row::new(vec![Cell::new("Equipment"), Cell::new("USD")]));
            for (name, cost) in &unit.purchase_costs().entries {
                cost_table.add_row(Row::new(vec![
                    Cell::new(name),
                    Cell::new(&format!("{:.0}", cost)),
                ]));
            }
            cost_table.printstd();
        }
        println!(
            "\nTotal purchase cost: ${:.0}, total power: {:.1} kW",
            self.total_purchase_cost(),
            self.total_power()
        );
        let warnings = self.balance_warnings();
        if !warnings.is_empty() {
            println!("{} material balance warnings:", warnings.len());
            for (unit, warning) in warnings {
                println!("  [{}] {}", unit, warning);
            }
        }
    }
}
