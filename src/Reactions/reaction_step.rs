//! # Reaction Step Module
//!
//! ## Aim
//! One stoichiometric conversion applied against a process stream. The step
//! is irreversible and forced: the extent is set by the basis component flow
//! and the fractional conversion, co-reactants follow stoichiometry even if
//! their pool runs negative (the cofactor shuttle recovers the deficit in a
//! later step of the cascade).
//!
//! ## Degradation policy
//! A species missing from the registry never aborts a step. Its contribution
//! is skipped and a structured `BalanceWarning` is returned, so an incomplete
//! material balance is visible to the caller instead of passing silently.
//!
//! ## Key Methods
//! - `ReactionStep::from_equation()`: build a step from an equation string
//! - `force()`: mutate a stream in place, returning the warning list

use crate::Reactions::reaction_parser::{SideTerms, parse_reaction_equation};
use crate::Streams::User_species::SpeciesRegistry;
use crate::Streams::process_stream::ProcessStream;
use log::warn;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Error types of the bioprocess model. Configuration errors are fatal at the
/// point of assignment; everything the material balance can degrade around is
/// reported through `BalanceWarning` instead.
#[derive(Debug, Error)]
pub enum BioprocessError {
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
    #[error("Reactor count must be greater than 1, got {0}")]
    InvalidReactorCount(usize),
    #[error("Reactor volume must be greater than 1 m3, got {0}")]
    InvalidReactorVolume(f64),
    #[error("Reactor count and target volume cannot both be set")]
    ConflictingSizing,
    #[error(
        "Required reactor count {required} exceeds the maximum {nmax}. \
         Increase the target volume or reduce the reaction time"
    )]
    SizingInfeasible { required: usize, nmax: usize },
    #[error("Failed to parse reaction equation '{equation}': {reason}")]
    ReactionParse { equation: String, reason: String },
    #[error("Design results are missing basis '{0}' required for costing")]
    MissingDesignBasis(String),
    #[error("Missing data: {0}")]
    MissingData(String),
}

/// Non-fatal material balance degradation, collected during a reaction pass
#[derive(Debug, Clone, PartialEq)]
pub enum BalanceWarning {
    /// A species of the reaction is not in the active registry; its
    /// contribution was dropped
    SpeciesNotModeled { species: String, reaction: String },
    /// A co-reactant pool went negative under forced conversion
    NegativeFlow {
        species: String,
        reaction: String,
        flow: f64,
    },
}

impl fmt::Display for BalanceWarning {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            BalanceWarning::SpeciesNotModeled { species, reaction } => {
                write!(
                    f,
                    "species '{}' is not modeled, its contribution to '{}' was dropped",
                    species, reaction
                )
            }
            BalanceWarning::NegativeFlow {
                species,
                reaction,
                flow,
            } => {
                write!(
                    f,
                    "flow of '{}' went negative ({:.4} mol/hr) in '{}'",
                    species, flow, reaction
                )
            }
        }
    }
}

/// One stoichiometric transformation with a basis component and a fractional
/// conversion
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionStep {
    pub equation: String,
    pub reactants: SideTerms,
    pub products: SideTerms,
    /// Limiting reactant the conversion is defined on
    pub basis: String,
    /// Fractional conversion of the basis component, in [0, 1]
    pub conversion: f64,
}

impl ReactionStep {
    /// Build a reaction step from an equation string. The basis species must
    /// appear on the reactant side and the conversion must lie in [0, 1];
    /// violations are fatal configuration errors.
    pub fn from_equation(
        equation: &str,
        basis: &str,
        conversion: f64,
    ) -> Result<Self, BioprocessError> {
        let (reactants, products) = parse_reaction_equation(equation)?;
        if !(0.0..=1.0).contains(&conversion) {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "fractional conversion must be in [0, 1], got {} for '{}'",
                conversion, equation
            )));
        }
        if !reactants.iter().any(|(name, _)| name == basis) {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "basis species '{}' is not a reactant of '{}'",
                basis, equation
            )));
        }
        Ok(Self {
            equation: equation.to_string(),
            reactants,
            products,
            basis: basis.to_string(),
            conversion,
        })
    }

    pub fn set_conversion(&mut self, conversion: f64) -> Result<(), BioprocessError> {
        if !(0.0..=1.0).contains(&conversion) {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "fractional conversion must be in [0, 1], got {} for '{}'",
                conversion, self.equation
            )));
        }
        self.conversion = conversion;
        Ok(())
    }

    fn basis_coefficient(&self) -> f64 {
        self.reactants
            .iter()
            .find(|(name, _)| name == &self.basis)
            .map(|(_, coeff)| *coeff)
            .unwrap_or(1.0)
    }

    /// Net coefficient of a species over this step (products positive)
    pub fn net_coefficient(&self, species: &str) -> f64 {
        let produced: f64 = self
            .products
            .iter()
            .filter(|(name, _)| name == species)
            .map(|(_, c)| c)
            .sum();
        let consumed: f64 = self
            .reactants
            .iter()
            .filter(|(name, _)| name == species)
            .map(|(_, c)| c)
            .sum();
        produced - consumed
    }

    /// Apply the conversion against the stream, in place.
    ///
    /// extent = basis_flow * conversion / basis_coefficient; every reactant
    /// flow decreases by extent * coefficient, every product flow increases
    /// by extent * coefficient. Species not in the registry are skipped with
    /// a warning; the basis itself being unmodeled skips the whole step.
    pub fn force(
        &self,
        stream: &mut ProcessStream,
        registry: &SpeciesRegistry,
    ) -> Vec<BalanceWarning> {
        let mut warnings = Vec::new();
        if !registry.has_species(&self.basis) {
            let warning = BalanceWarning::SpeciesNotModeled {
                species: self.basis.clone(),
                reaction: self.equation.clone(),
            };
            warn!("{}", warning);
            warnings.push(warning);
            return warnings;
        }
        let extent = stream.get_mol(&self.basis) * self.conversion / self.basis_coefficient();
        if extent == 0.0 {
            return warnings;
        }
        for (species, coefficient) in &self.reactants {
            if !registry.has_species(species) {
                let warning = BalanceWarning::SpeciesNotModeled {
                    species: species.clone(),
                    reaction: self.equation.clone(),
                };
                warn!("{}", warning);
                warnings.push(warning);
                continue;
            }
            let updated = stream.get_mol(species) - extent * coefficient;
            if updated < -1e-9 {
                let warning = BalanceWarning::NegativeFlow {
                    species: species.clone(),
                    reaction: self.equation.clone(),
                    flow: updated,
                };
                warn!("{}", warning);
                warnings.push(warning);
            }
            stream.set_mol(species, updated);
        }
        for (species, coefficient) in &self.products {
            if !registry.has_species(species) {
                let warning = BalanceWarning::SpeciesNotModeled {
                    species: species.clone(),
                    reaction: self.equation.clone(),
                };
                warn!("{}", warning);
                warnings.push(warning);
                continue;
            }
            stream.add_mol(species, extent * coefficient);
        }
        warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn registry() -> SpeciesRegistry {
        SpeciesRegistry::tagatose_process()
    }

    #[test]
    fn test_conversion_bounds_rejected() {
        assert!(ReactionStep::from_equation("Galactose -> Tagatose", "Galactose", 1.2).is_err());
        assert!(ReactionStep::from_equation("Galactose -> Tagatose", "Galactose", -0.1).is_err());
        assert!(ReactionStep::from_equation("Galactose -> Tagatose", "Galactose", 1.0).is_ok());
    }

    #[test]
    fn test_basis_must_be_reactant() {
        assert!(ReactionStep::from_equation("Galactose -> Tagatose", "Tagatose", 0.5).is_err());
    }

    #[test]
    fn test_conservation_at_full_conversion() {
        let step = ReactionStep::from_equation(
            "Galactose + Formate -> Galactitol + CO2",
            "Galactose",
            1.0,
        )
        .unwrap();
        let mut stream =
            ProcessStream::with_mol("feed", &[("Galactose", 100.0), ("Formate", 105.0)]);
        let warnings = step.force(&mut stream, &registry());
        assert!(warnings.is_empty());
        assert_relative_eq!(stream.get_mol("Galactose"), 0.0, epsilon = 1e-9);
        assert_relative_eq!(stream.get_mol("Formate"), 5.0, epsilon = 1e-9);
        assert_relative_eq!(stream.get_mol("Galactitol"), 100.0, epsilon = 1e-9);
        assert_relative_eq!(stream.get_mol("CO2"), 100.0, epsilon = 1e-9);
    }

    #[test]
    fn test_zero_conversion_is_identity() {
        let step = ReactionStep::from_equation(
            "Galactose + Formate -> Galactitol + CO2",
            "Galactose",
            0.0,
        )
        .unwrap();
        let mut stream =
            ProcessStream::with_mol("feed", &[("Galactose", 100.0), ("Formate", 105.0)]);
        step.force(&mut stream, &registry());
        assert_relative_eq!(stream.get_mol("Galactose"), 100.0);
        assert_relative_eq!(stream.get_mol("Galactitol"), 0.0);
    }

    #[test]
    fn test_fractional_stoichiometry_scaling() {
        // reactant decrease / its coefficient == product increase / its
        // coefficient, for every product
        let step =
            ReactionStep::from_equation("NADH + 0.25 O2 -> NAD + 0.5 H2O", "NADH", 0.8).unwrap();
        let mut stream = ProcessStream::with_mol("s", &[("NADH", 50.0), ("O2", 20.0)]);
        step.force(&mut stream, &registry());
        let reacted = 50.0 * 0.8;
        assert_relative_eq!(stream.get_mol("NADH"), 50.0 - reacted, epsilon = 1e-9);
        assert_relative_eq!(stream.get_mol("O2"), 20.0 - 0.25 * reacted, epsilon = 1e-9);
        assert_relative_eq!(stream.get_mol("NAD"), reacted, epsilon = 1e-9);
        assert_relative_eq!(stream.get_mol("H2O"), 0.5 * reacted, epsilon = 1e-9);
    }

    #[test]
    fn test_unmodeled_species_skipped_with_warning() {
        // H2O is not a registered name (the registry uses "Water"), so the
        // product contribution must be dropped with a warning but the step
        // itself must not fail
        let step =
            ReactionStep::from_equation("NADH + 0.25 O2 -> NAD + 0.5 H2O", "NADH", 1.0).unwrap();
        let mut stream = ProcessStream::with_mol("s", &[("NADH", 10.0), ("O2", 5.0)]);
        let warnings = step.force(&mut stream, &registry());
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            BalanceWarning::SpeciesNotModeled { species, .. } if species == "H2O"
        ));
        // present species still satisfy conservation
        assert_relative_eq!(stream.get_mol("NADH"), 0.0, epsilon = 1e-9);
        assert_relative_eq!(stream.get_mol("O2"), 5.0 - 2.5, epsilon = 1e-9);
        assert_relative_eq!(stream.get_mol("NAD"), 10.0, epsilon = 1e-9);
    }

    #[test]
    fn test_unmodeled_basis_skips_whole_step() {
        let step = ReactionStep::from_equation("Xylose -> Xylitol", "Xylose", 1.0).unwrap();
        let mut stream = ProcessStream::with_mol("s", &[("Xylose", 10.0)]);
        let warnings = step.force(&mut stream, &registry());
        assert_eq!(warnings.len(), 1);
        assert_relative_eq!(stream.get_mol("Xylose"), 10.0);
    }

    #[test]
    fn test_negative_coreactant_warning() {
        let step = ReactionStep::from_equation(
            "Galactitol + NAD -> Tagatose + NADH",
            "Galactitol",
            1.0,
        )
        .unwrap();
        let mut stream = ProcessStream::with_mol("s", &[("Galactitol", 100.0), ("NAD", 1.0)]);
        let warnings = step.force(&mut stream, &registry());
        assert_eq!(warnings.len(), 1);
        assert!(matches!(
            &warnings[0],
            BalanceWarning::NegativeFlow { species, .. } if species == "NAD"
        ));
        assert_relative_eq!(stream.get_mol("NAD"), -99.0, epsilon = 1e-9);
        assert_relative_eq!(stream.get_mol("Tagatose"), 100.0, epsilon = 1e-9);
    }
}
