//! # Process Stream Module
//!
//! ## Aim
//! Material stream container for the flowsheet: component molar flows plus
//! temperature, pressure and phase. Streams are the only objects mutated
//! during a simulation pass; each one has a single writer (the unit that
//! produces it).
//!
//! ## Main Data Structures
//! - `ProcessStream`: named map of component molar flows (mol/hr) with T, P
//!
//! ## Key Methods
//! - `get_mol()` / `set_mol()` / `add_mol()`: component flow access; reads of
//!   absent components return 0.0 - "truly zero" and "not modeled" are
//!   indistinguishable by design, callers handle both identically
//! - `total_mass_flow()` / `total_volumetric_flow()`: derived totals against
//!   a species registry
//! - `mix_from()` / `copy_like()` / `empty()`: stream-to-stream operations
//! - `receive_vent()`: pulls the gas-phase components out of a liquid stream

use super::User_species::{Phase, SpeciesRegistry};
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Universal gas constant in J/(mol*K)
pub const R_G: f64 = 8.314;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[allow(non_snake_case)]
pub struct ProcessStream {
    pub name: String,
    /// component name -> molar flow (mol/hr)
    pub mol: HashMap<String, f64>,
    /// Temperature (K)
    pub T: f64,
    /// Pressure (Pa)
    pub P: f64,
    pub phase: Phase,
}

impl ProcessStream {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            mol: HashMap::new(),
            T: 298.15,
            P: 101325.0,
            phase: Phase::Liquid,
        }
    }

    /// Construct a stream from (component, mol/hr) pairs
    pub fn with_mol(name: &str, flows: &[(&str, f64)]) -> Self {
        let mut stream = Self::new(name);
        for (component, flow) in flows {
            stream.mol.insert(component.to_string(), *flow);
        }
        stream
    }

    /// Molar flow of a component (mol/hr); 0.0 for components not present
    pub fn get_mol(&self, component: &str) -> f64 {
        self.mol.get(component).copied().unwrap_or(0.0)
    }

    pub fn set_mol(&mut self, component: &str, flow: f64) {
        self.mol.insert(component.to_string(), flow);
    }

    pub fn add_mol(&mut self, component: &str, flow: f64) {
        *self.mol.entry(component.to_string()).or_insert(0.0) += flow;
    }

    pub fn has_component(&self, component: &str) -> bool {
        self.mol.contains_key(component)
    }

    /// Component names, sorted for deterministic iteration
    pub fn components(&self) -> Vec<String> {
        let mut names: Vec<String> = self.mol.keys().cloned().collect();
        names.sort();
        names
    }

    /// Total molar flow (mol/hr)
    pub fn total_mol_flow(&self) -> f64 {
        self.mol.values().sum()
    }

    /// Total mass flow (kg/hr); components absent from the registry
    /// contribute nothing
    pub fn total_mass_flow(&self, registry: &SpeciesRegistry) -> f64 {
        self.mol
            .iter()
            .map(|(name, flow)| match registry.molar_mass(name) {
                Some(mw) => flow * mw / 1000.0,
                None => 0.0,
            })
            .sum()
    }

    /// Mass flow (kg/hr) of one component
    pub fn mass_flow(&self, component: &str, registry: &SpeciesRegistry) -> f64 {
        match registry.molar_mass(component) {
            Some(mw) => self.get_mol(component) * mw / 1000.0,
            None => 0.0,
        }
    }

    /// Total volumetric flow (m3/hr). Liquid and solid components by their
    /// density, gas components by ideal gas at stream T and P.
    pub fn total_volumetric_flow(&self, registry: &SpeciesRegistry) -> f64 {
        self.mol
            .iter()
            .map(|(name, flow)| {
                let Some(data) = registry.get(name) else {
                    return 0.0;
                };
                match data.default_phase {
                    Phase::Gas => flow * R_G * self.T / self.P,
                    _ => flow * data.molar_mass / 1000.0 / data.density,
                }
            })
            .sum()
    }

    /// Copy composition and conditions from another stream (name is kept)
    pub fn copy_like(&mut self, other: &ProcessStream) {
        self.mol = other.mol.clone();
        self.T = other.T;
        self.P = other.P;
        self.phase = other.phase;
    }

    /// Replace this stream's composition with the sum of the given streams;
    /// T and P are taken from the first non-empty source
    pub fn mix_from(&mut self, sources: &[&ProcessStream]) {
        self.mol.clear();
        let mut conditions_set = false;
        for source in sources {
            for (component, flow) in &source.mol {
                *self.mol.entry(component.clone()).or_insert(0.0) += flow;
            }
            if !conditions_set && !source.mol.is_empty() {
                self.T = source.T;
                self.P = source.P;
                conditions_set = true;
            }
        }
    }

    pub fn empty(&mut self) {
        self.mol.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.mol.is_empty() || self.total_mol_flow() == 0.0
    }

    /// Move every gas-phase component of `liquid` into this stream.
    /// Components unknown to the registry stay in the liquid.
    pub fn receive_vent(&mut self, liquid: &mut ProcessStream, registry: &SpeciesRegistry) {
        self.phase = Phase::Gas;
        let gas_components: Vec<String> = liquid
            .mol
            .keys()
            .filter(|name| registry.default_phase(name) == Some(Phase::Gas))
            .cloned()
            .collect();
        for component in gas_components {
            if let Some(flow) = liquid.mol.remove(&component) {
                self.add_mol(&component, flow);
            }
        }
    }

    /// Pretty-print the stream composition
    pub fn print_composition(&self, registry: &SpeciesRegistry) {
        let mut table = Table::new();
        table.add_row(Row::new(vec![
            Cell::new("Component"),
            Cell::new("mol/hr"),
            Cell::new("kg/hr"),
        ]));
        for component in self.components() {
            table.add_row(Row::new(vec![
                Cell::new(&component),
                Cell::new(&format!("{:.3}", self.get_mol(&component))),
                Cell::new(&format!("{:.3}", self.mass_flow(&component, registry))),
            ]));
        }
        println!("Stream '{}': T = {:.2} K, P = {:.0} Pa", self.name, self.T, self.P);
        table.printstd();
    }
}
