//! # Techno-Economic Analysis Module
//!
//! ## Aim
//! Rolls a simulated process system up into CAPEX, annual OPEX and
//! profitability metrics. The arithmetic follows the standard factored
//! estimate: equipment purchase costs from the costing passes, indirect
//! costs and working capital as CAPEX factors, raw materials priced off the
//! system feed streams, consumables off the design results.
//!
//! ## Degeneracy policy
//! Zero or negative annual profit is not an error: payback returns an
//! infinite sentinel and IRR returns `None`. Downstream reporting must
//! still render, so degeneracies propagate as data.

use crate::BatchReactor::costing::CostBreakdown;
use crate::Flowsheet::ProcessSystem;
use crate::Reactions::reaction_step::BioprocessError;
use crate::Units::unit_op::UnitOperation;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Market and utility prices of the analysis
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PriceSet {
    /// Raw material prices (USD/kg), keyed by species name
    pub species_usd_per_kg: HashMap<String, f64>,
    /// Species sold as the product
    pub product_species: String,
    /// Product price (USD/kg)
    pub product_price: f64,
    pub electricity_usd_per_kwh: f64,
    pub labor_usd_per_hr: f64,
    /// Activated carbon makeup price (USD/kg)
    pub carbon_usd_per_kg: f64,
}

impl PriceSet {
    /// Baseline tagatose market scenario: purified galactose feed, cofactor
    /// makeup at catalog prices, product at the conservative end of the
    /// market range
    pub fn tagatose_default() -> Self {
        let mut species = HashMap::new();
        species.insert("Galactose".to_string(), 2.0);
        species.insert("Formate".to_string(), 0.25);
        species.insert("EColi".to_string(), 50.0);
        // catalog cofactor prices per kg, from $710/mol NAD and $5000/mol NADP
        species.insert("NAD".to_string(), 1070.0);
        species.insert("NADP".to_string(), 6726.0);
        species.insert("Water".to_string(), 0.002);
        Self {
            species_usd_per_kg: species,
            product_species: "Tagatose".to_string(),
            product_price: 10.0,
            electricity_usd_per_kwh: 0.12,
            labor_usd_per_hr: 50.0,
            carbon_usd_per_kg: 2.0,
        }
    }

    pub fn species_price(&self, name: &str) -> f64 {
        self.species_usd_per_kg.get(name).copied().unwrap_or(0.0)
    }
}

/// Factored techno-economic analysis over a simulated system
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EconomicAnalysis {
    pub prices: PriceSet,
    /// Plant on-stream hours per year
    pub operating_hours: f64,
    pub project_life_years: u32,
    pub discount_rate: f64,
    /// Indirect costs as a fraction of equipment cost
    pub indirect_factor: f64,
    /// Working capital as a fraction of equipment cost
    pub working_capital_factor: f64,
    /// Annual maintenance as a fraction of CAPEX
    pub maintenance_factor: f64,
    /// Annual miscellaneous as a fraction of CAPEX
    pub misc_factor: f64,
    /// Name of the stream the product is sold from; `None` counts the
    /// product species across every unconsumed outlet
    pub product_stream: Option<String>,
}

impl Default for EconomicAnalysis {
    fn default() -> Self {
        Self {
            prices: PriceSet::tagatose_default(),
            operating_hours: 7500.0,
            project_life_years: 20,
            discount_rate: 0.10,
            indirect_factor: 0.40,
            working_capital_factor: 0.15,
            maintenance_factor: 0.04,
            misc_factor: 0.02,
            product_stream: None,
        }
    }
}

impl EconomicAnalysis {
    /// Batch cycle time taken from the reactor design results (hr)
    fn cycle_time(&self, system: &ProcessSystem) -> Option<f64> {
        system
            .units
            .iter()
            .find_map(|unit| unit.design_results().get("Cycle time"))
    }

    /// CAPEX breakdown: equipment, indirect, working capital
    pub fn capex(&self, system: &ProcessSystem) -> CostBreakdown {
        let equipment = system.total_purchase_cost();
        let mut breakdown = CostBreakdown::default();
        breakdown.insert("Equipment", equipment);
        breakdown.insert("Indirect cost", equipment * self.indirect_factor);
        breakdown.insert("Working capital", equipment * self.working_capital_factor);
        breakdown
    }

    pub fn total_capex(&self, system: &ProcessSystem) -> f64 {
        self.capex(system).total()
    }

    /// Annual OPEX breakdown: raw materials off the feed streams,
    /// consumables off the design results, utilities, labor and the
    /// CAPEX-derived factors
    pub fn opex(&self, system: &ProcessSystem) -> Result<CostBreakdown, BioprocessError> {
        let mut breakdown = CostBreakdown::default();

        // raw materials: every species entering through a system feed
        let feeds: Vec<_> = system.feed_streams();
        let mut material_cost: HashMap<String, f64> = HashMap::new();
        for stream in &feeds {
            for component in stream.components() {
                let price = self.prices.species_price(&component);
                if price == 0.0 {
                    continue;
                }
                let mass = self.component_mass_flow(system, stream, &component);
                *material_cost.entry(component).or_insert(0.0) +=
                    mass * price * self.operating_hours;
            }
        }
        let mut materials: Vec<_> = material_cost.into_iter().collect();
        materials.sort_by(|a, b| a.0.cmp(&b.0));
        for (species, cost) in materials {
            breakdown.insert(&species, cost);
        }

        // consumables recorded by the downstream designs
        let mut carbon = 0.0;
        let mut resin_per_batch = 0.0;
        for unit in &system.units {
            carbon += unit.design_results().get("Carbon makeup").unwrap_or(0.0);
            resin_per_batch += unit
                .design_results()
                .get("Resin cost per batch")
                .unwrap_or(0.0);
        }
        if carbon > 0.0 {
            breakdown.insert(
                "Activated carbon",
                carbon * self.prices.carbon_usd_per_kg * self.operating_hours,
            );
        }
        if resin_per_batch > 0.0 {
            let cycle = self.cycle_time(system).ok_or_else(|| {
                BioprocessError::MissingData(
                    "no unit reports a cycle time, cannot count batches per year".to_string(),
                )
            })?;
            breakdown.insert(
                "Ion exchange resin",
                resin_per_batch * self.operating_hours / cycle,
            );
        }

        breakdown.insert(
            "Electricity",
            system.total_power() * self.operating_hours * self.prices.electricity_usd_per_kwh,
        );
        breakdown.insert(
            "Labor",
            self.operating_hours * self.prices.labor_usd_per_hr,
        );
        let capex = self.total_capex(system);
        breakdown.insert("Maintenance", capex * self.maintenance_factor);
        breakdown.insert("Miscellaneous", capex * self.misc_factor);
        Ok(breakdown)
    }

    fn component_mass_flow(
        &self,
        system: &ProcessSystem,
        stream: &crate::Streams::process_stream::ProcessStream,
        component: &str,
    ) -> f64 {
        for unit in &system.units {
            if let Some(registry) = unit_registry(unit) {
                return stream.mass_flow(component, registry);
            }
        }
        0.0
    }

    /// Annual revenue from the product species leaving the system (USD/yr).
    /// Entrained losses in side outlets are excluded when a product stream
    /// is designated.
    pub fn revenue(&self, system: &ProcessSystem) -> f64 {
        let product = &self.prices.product_species;
        let mass_per_hr: f64 = system
            .product_streams()
            .iter()
            .filter(|stream| match &self.product_stream {
                Some(name) => &stream.name == name,
                None => true,
            })
            .map(|stream| self.component_mass_flow(system, stream, product))
            .sum();
        mass_per_hr * self.operating_hours * self.prices.product_price
    }

    pub fn annual_profit(&self, system: &ProcessSystem) -> Result<f64, BioprocessError> {
        Ok(self.revenue(system) - self.opex(system)?.total())
    }

    /// Simple payback period (years); infinite when the plant never earns
    /// its CAPEX back
    pub fn payback_years(&self, system: &ProcessSystem) -> Result<f64, BioprocessError> {
        let profit = self.annual_profit(system)?;
        if profit <= 0.0 {
            return Ok(f64::INFINITY);
        }
        Ok(self.total_capex(system) / profit)
    }

    /// Net present value at the given discount rate (USD)
    pub fn npv_at(&self, system: &ProcessSystem, rate: f64) -> Result<f64, BioprocessError> {
        let profit = self.annual_profit(system)?;
        let mut npv = -self.total_capex(system);
        for year in 1..=self.project_life_years {
            npv += profit / (1.0 + rate).powi(year as i32);
        }
        Ok(npv)
    }

    pub fn npv(&self, system: &ProcessSystem) -> Result<f64, BioprocessError> {
        self.npv_at(system, self.discount_rate)
    }

    /// Internal rate of return by bisection on the NPV; `None` when the
    /// project never breaks even over its life (undefined IRR)
    pub fn irr(&self, system: &ProcessSystem) -> Result<Option<f64>, BioprocessError> {
        let profit = self.annual_profit(system)?;
        if profit <= 0.0 {
            return Ok(None);
        }
        let (mut low, mut high) = (-0.9, 10.0);
        let npv_low = self.npv_at(system, low)?;
        let npv_high = self.npv_at(system, high)?;
        if npv_low.signum() == npv_high.signum() {
            return Ok(None);
        }
        for _ in 0..100 {
            let mid = 0.5 * (low + high);
            let npv_mid = self.npv_at(system, mid)?;
            if npv_mid.signum() == npv_low.signum() {
                low = mid;
            } else {
                high = mid;
            }
        }
        Ok(Some(0.5 * (low + high)))
    }

    /// Print the full analysis as tables
    pub fn print_analysis(&self, system: &ProcessSystem) -> Result<(), BioprocessError> {
        println!("\n=== TECHNO-ECONOMIC ANALYSIS: {} ===", system.name);
        let capex = self.capex(system);
        let mut capex_table = Table::new();
        capex_table.add_row(Row::new(vec![Cell::new("CAPEX item"), Cell::new("USD")]));
        for (name, cost) in &capex.entries {
            capex_table.add_row(Row::new(vec![
                Cell::new(name),
                Cell::new(&format!("{:.0}", cost)),
            ]));
        }
        capex_table.add_row(Row::new(vec![
            Cell::new("Total"),
            Cell::new(&format!("{:.0}", capex.total())),
        ]));
        capex_table.printstd();

        let opex = self.opex(system)?;
        let mut opex_table = Table::new();
        opex_table.add_row(Row::new(vec![Cell::new("OPEX item"), Cell::new("USD/yr")]));
        for (name, cost) in &opex.entries {
            opex_table.add_row(Row::new(vec![
                Cell::new(name),
                Cell::new(&format!("{:.0}", cost)),
            ]));
        }
        opex_table.add_row(Row::new(vec![
            Cell::new("Total"),
            Cell::new(&format!("{:.0}", opex.total())),
        ]));
        opex_table.printstd();

        println!("Revenue: ${:.0}/yr", self.revenue(system));
        println!("Annual profit: ${:.0}/yr", self.annual_profit(system)?);
        let payback = self.payback_years(system)?;
        if payback.is_finite() {
            println!("Payback: {:.1} years", payback);
        } else {
            println!("Payback: never (operating at a loss)");
        }
        println!(
            "NPV at {:.0}% over {} years: ${:.0}",
            self.discount_rate * 100.0,
            self.project_life_years,
            self.npv(system)?
        );
        match self.irr(system)? {
            Some(irr) => println!("IRR: {:.1}%", irr * 100.0),
            None => println!("IRR: undefined"),
        }
        Ok(())
    }
}

/// Species registry of a unit, when it has one
fn unit_registry(
    unit: &crate::Units::unit_op::ProcessUnit,
) -> Option<&crate::Streams::User_species::SpeciesRegistry> {
    use crate::Units::unit_op::ProcessUnit;
    match unit {
        ProcessUnit::BatchBioreactor(u) => Some(&u.registry),
        ProcessUnit::OxygenCompressor(u) => Some(&u.registry),
        ProcessUnit::CellSeparator(u) => Some(&u.registry),
        ProcessUnit::Decolorization(u) => Some(&u.registry),
        ProcessUnit::Desalting(u) => Some(&u.registry),
        ProcessUnit::FluidBedDryer(u) => Some(&u.registry),
    }
}
