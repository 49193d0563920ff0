//! # User Species Module
//!
//! ## Aim
//! Registry of the chemical species taking part in the modeled bioprocess.
//! Every unit operation receives its own copy of the registry at construction,
//! so there is no process-wide mutable species database.
//!
//! ## Main Data Structures
//! - `SpeciesData`: molar mass, density and default phase of one species
//! - `Phase` enum: gas, liquid, solid
//! - `SpeciesRegistry`: name -> SpeciesData map with query methods
//!
//! ## Usage
//! ```rust, ignore
//! let registry = SpeciesRegistry::tagatose_process();
//! assert!(registry.has_species("Galactose"));
//! let mw = registry.molar_mass("Tagatose").unwrap();
//! ```
//!
//! Property values are deliberately simple (constant density, standard
//! molecular weights): the material balance is the primary concern of this
//! model, not phase equilibria.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Phase enum: solid, liquid, gas
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Phase {
    Gas,
    Liquid,
    Solid,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Gas => "gas",
            Phase::Liquid => "liquid",
            Phase::Solid => "solid",
        }
    }
}

/// Physical data for one species
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeciesData {
    /// Chemical formula or short description
    pub formula: String,
    /// Molar mass (g/mol)
    pub molar_mass: f64,
    /// Density of the pure species (kg/m3); for dissolved solids the
    /// crystalline density is used, the solution volume is dominated by water
    pub density: f64,
    /// Phase the species takes at process conditions
    pub default_phase: Phase,
}

impl SpeciesData {
    pub fn new(formula: &str, molar_mass: f64, density: f64, default_phase: Phase) -> Self {
        Self {
            formula: formula.to_string(),
            molar_mass,
            density,
            default_phase,
        }
    }
}

/// Species registry: maps species names to their physical data.
///
/// Constructed once per flowsheet and passed by value into every unit
/// operation. Queries for unknown names return `None`/`false`, never panic -
/// absent species are a supported condition of the material balance engine.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpeciesRegistry {
    pub species: HashMap<String, SpeciesData>,
}

impl SpeciesRegistry {
    pub fn new() -> Self {
        Self {
            species: HashMap::new(),
        }
    }

    /// Register a species; replaces existing data under the same name
    pub fn add(&mut self, name: &str, data: SpeciesData) {
        self.species.insert(name.to_string(), data);
    }

    pub fn has_species(&self, name: &str) -> bool {
        self.species.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&SpeciesData> {
        self.species.get(name)
    }

    /// Molar mass (g/mol) of a registered species
    pub fn molar_mass(&self, name: &str) -> Option<f64> {
        self.species.get(name).map(|s| s.molar_mass)
    }

    /// Density (kg/m3) of a registered species
    pub fn density(&self, name: &str) -> Option<f64> {
        self.species.get(name).map(|s| s.density)
    }

    pub fn default_phase(&self, name: &str) -> Option<Phase> {
        self.species.get(name).map(|s| s.default_phase)
    }

    /// All registered names, sorted for deterministic iteration
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.species.keys().cloned().collect();
        names.sort();
        names
    }

    /// Full species set of the galactose -> tagatose whole-cell process:
    /// substrates, product, galactitol intermediate, cofactor pools,
    /// dissolved gases, biocatalyst and the auxiliary process chemicals.
    pub fn tagatose_process() -> Self {
        let mut registry = Self::new();
        registry.add("Water", SpeciesData::new("H2O", 18.015, 1000.0, Phase::Liquid));
        registry.add(
            "Galactose",
            SpeciesData::new("C6H12O6", 180.156, 1540.0, Phase::Liquid),
        );
        registry.add(
            "Tagatose",
            SpeciesData::new("C6H12O6", 180.156, 1540.0, Phase::Liquid),
        );
        registry.add(
            "Galactitol",
            SpeciesData::new("C6H14O6", 182.172, 1470.0, Phase::Liquid),
        );
        // tracked as the formate ion pool, fed as sodium formate
        registry.add(
            "Formate",
            SpeciesData::new("HCOONa", 68.007, 1920.0, Phase::Liquid),
        );
        registry.add("CO2", SpeciesData::new("CO2", 44.009, 1.84, Phase::Gas));
        registry.add("O2", SpeciesData::new("O2", 31.998, 1.33, Phase::Gas));
        registry.add("N2", SpeciesData::new("N2", 28.014, 1.16, Phase::Gas));
        registry.add("NAD", SpeciesData::new("C21H27N7O14P2", 663.43, 1300.0, Phase::Liquid));
        registry.add("NADH", SpeciesData::new("C21H29N7O14P2", 665.44, 1300.0, Phase::Liquid));
        registry.add("NADP", SpeciesData::new("C21H28N7O17P3", 743.41, 1300.0, Phase::Liquid));
        registry.add("NADPH", SpeciesData::new("C21H30N7O17P3", 745.42, 1300.0, Phase::Liquid));
        // whole-cell biocatalyst, dry cell weight equivalent
        registry.add("EColi", SpeciesData::new("biomass", 1000.0, 1100.0, Phase::Solid));
        registry.add("H2SO4", SpeciesData::new("H2SO4", 98.079, 1830.0, Phase::Liquid));
        registry.add("NaOH", SpeciesData::new("NaOH", 39.997, 2130.0, Phase::Liquid));
        registry.add(
            "ActivatedCarbon",
            SpeciesData::new("C", 12.011, 2000.0, Phase::Solid),
        );
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_tagatose_process_registry() {
        let registry = SpeciesRegistry::tagatose_process();
        assert!(registry.has_species("Galactose"));
        assert!(registry.has_species("Tagatose"));
        assert!(registry.has_species("Galactitol"));
        assert!(registry.has_species("Formate"));
        assert!(registry.has_species("NADH"));
        assert!(!registry.has_species("Unobtainium"));
        // galactose and tagatose are isomers
        assert_relative_eq!(
            registry.molar_mass("Galactose").unwrap(),
            registry.molar_mass("Tagatose").unwrap(),
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_missing_species_queries() {
        let registry = SpeciesRegistry::tagatose_process();
        assert_eq!(registry.molar_mass("Xylose"), None);
        assert_eq!(registry.density("Xylose"), None);
        assert_eq!(registry.default_phase("Xylose"), None);
    }

    #[test]
    fn test_phases() {
        let registry = SpeciesRegistry::tagatose_process();
        assert_eq!(registry.default_phase("CO2"), Some(Phase::Gas));
        assert_eq!(registry.default_phase("Water"), Some(Phase::Liquid));
        assert_eq!(registry.default_phase("EColi"), Some(Phase::Solid));
        assert_eq!(Phase::Gas.as_str(), "gas");
    }
}
