//! # Reaction Network Module
//!
//! ## Aim
//! Ordered cascade of stoichiometric conversion steps. Steps are applied
//! against the live stream state, so later steps see the depletion and the
//! products of earlier ones - step order is a correctness-critical design
//! parameter for staged chemistries (the anaerobic product of stage 1 is the
//! aerobic substrate of stage 2).
//!
//! ## Main Data Structures
//! - `ReactionNetwork`: the step list with matrix and reduction queries
//!
//! ## Key Methods
//! - `force_all()`: run the cascade against a stream, collecting warnings
//! - `stoichiometric_matrix()`: steps x species coefficient matrix
//! - `overall_stoichiometry()`: net chemistry at full conversion; for the
//!   tagatose network this collapses to
//!   `Galactose + Formate + 0.25 O2 -> Tagatose + CO2 + 0.5 Water`
//!   with the cofactor pools cancelling exactly
//! - `tagatose_three_stage()`: the whole-cell galactose -> tagatose cascade

use crate::Reactions::reaction_step::{BalanceWarning, BioprocessError, ReactionStep};
use crate::Streams::User_species::SpeciesRegistry;
use crate::Streams::process_stream::ProcessStream;
use nalgebra::DMatrix;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReactionNetwork {
    pub steps: Vec<ReactionStep>,
}

impl ReactionNetwork {
    pub fn new(steps: Vec<ReactionStep>) -> Self {
        Self { steps }
    }

    /// Apply every step in order against the stream; each step reads the
    /// stream state left by the previous one
    pub fn force_all(
        &self,
        stream: &mut ProcessStream,
        registry: &SpeciesRegistry,
    ) -> Vec<BalanceWarning> {
        let mut warnings = Vec::new();
        for step in &self.steps {
            warnings.extend(step.force(stream, registry));
        }
        warnings
    }

    pub fn set_step_conversion(
        &mut self,
        index: usize,
        conversion: f64,
    ) -> Result<(), BioprocessError> {
        let step = self.steps.get_mut(index).ok_or_else(|| {
            BioprocessError::MissingData(format!("reaction network has no step {}", index))
        })?;
        step.set_conversion(conversion)
    }

    /// Species taking part in the network, in order of first appearance
    pub fn species(&self) -> Vec<String> {
        let mut names: Vec<String> = Vec::new();
        for step in &self.steps {
            for (name, _) in step.reactants.iter().chain(step.products.iter()) {
                if !names.contains(name) {
                    names.push(name.clone());
                }
            }
        }
        names
    }

    /// Stoichiometric coefficient matrix, steps x species, products positive.
    /// Column order matches the returned species list.
    pub fn stoichiometric_matrix(&self) -> (Vec<String>, DMatrix<f64>) {
        let species = self.species();
        let mut matrix = DMatrix::zeros(self.steps.len(), species.len());
        for (i, step) in self.steps.iter().enumerate() {
            for (j, name) in species.iter().enumerate() {
                matrix[(i, j)] = step.net_coefficient(name);
            }
        }
        (species, matrix)
    }

    /// Net chemistry of the cascade at 100% conversion of every step:
    /// column sums of the stoichiometric matrix, with cancelled species
    /// (shuttled cofactors, intermediates) dropped
    pub fn overall_stoichiometry(&self) -> Vec<(String, f64)> {
        let (species, matrix) = self.stoichiometric_matrix();
        species
            .into_iter()
            .enumerate()
            .map(|(j, name)| (name, matrix.column(j).sum()))
            .filter(|(_, net)| net.abs() > 1e-12)
            .collect()
    }

    /// The three-stage whole-cell cascade converting D-galactose to
    /// D-tagatose:
    ///
    /// 1. anaerobic reduction, `Galactose + Formate -> Galactitol + CO2`;
    ///    the NADPH shuttle (`NADP + Formate -> CO2 + NADPH`) runs inside
    ///    the cell at the same conversion and is folded into this step
    /// 2. aerobic oxidation, `Galactitol + NAD -> Tagatose + NADH`
    /// 3. oxygen-driven cofactor regeneration,
    ///    `NADH + 0.25 O2 -> NAD + 0.5 Water`; the conversion of this step
    ///    is the effective regeneration efficiency after oxygen-transfer
    ///    gating
    pub fn tagatose_three_stage(
        stage1_conversion: f64,
        stage2_conversion: f64,
        regeneration_efficiency: f64,
    ) -> Result<Self, BioprocessError> {
        let steps = vec![
            ReactionStep::from_equation(
                "Galactose + Formate -> Galactitol + CO2",
                "Galactose",
                stage1_conversion,
            )?,
            ReactionStep::from_equation(
                "Galactitol + NAD -> Tagatose + NADH",
                "Galactitol",
                stage2_conversion,
            )?,
            ReactionStep::from_equation(
                "NADH + 0.25 O2 -> NAD + 0.5 Water",
                "NADH",
                regeneration_efficiency,
            )?,
        ];
        Ok(Self::new(steps))
    }
}
