//! # Downstream Units Module
//!
//! The purification train after the bioreactor, plus the compressed-air
//! supply for the aerobic stage:
//!
//! - `OxygenCompressor`: compressed air for oxygen-abundant aeration
//! - `CellSeparator`: centrifuge, removes the whole-cell biocatalyst
//! - `Decolorization`: activated carbon treatment
//! - `Desalting`: ion exchange polish
//! - `FluidBedDryer`: solution -> powder, direct drying
//!
//! The separations are split-fraction mass balances with experimental
//! recoveries; equipment costs are power-law scaled from the 1000 L batch
//! reference scale.

use crate::BatchReactor::costing::{CE_DEFAULT, CostBreakdown, CostItem, CostCorrelations};
use crate::Reactions::reaction_step::{BalanceWarning, BioprocessError};
use crate::Streams::User_species::{Phase, SpeciesRegistry};
use crate::Streams::process_stream::{ProcessStream, R_G};
use crate::Units::unit_op::{DesignResults, UnitOperation};
use serde::{Deserialize, Serialize};

/// Feed mass flow of the canonical 1000 L batch train (kg/hr), the
/// reference scale the downstream cost correlations are anchored at
const REF_FEED_MASS_FLOW: f64 = 37.0;

fn feed_scaled_item(name: &str, base_cost: f64) -> CostItem {
    CostItem {
        basis: "Feed mass flow".to_string(),
        name: name.to_string(),
        base_cost,
        ref_size: REF_FEED_MASS_FLOW,
        exponent: 0.6,
        bare_module: 1.0,
        ce_ref: CE_DEFAULT,
        kW: 0.0,
        per_reactor: false,
        magnitude: false,
    }
}

// ============================================================================
// Cell separator
// ============================================================================

/// Centrifugal cell removal: biocatalyst to the solids outlet, everything
/// else splits by the product recovery
#[derive(Debug, Clone)]
pub struct CellSeparator {
    pub name: String,
    pub registry: SpeciesRegistry,
    /// Fraction of the dissolved components recovered in the liquid
    pub recovery: f64,
    /// Species collected entirely in the solids outlet
    pub solids_species: String,
    pub power_kw: f64,
    pub cost_correlations: CostCorrelations,
    ins: Vec<ProcessStream>,
    outs: Vec<ProcessStream>,
    design: DesignResults,
    costs: CostBreakdown,
}

impl CellSeparator {
    pub fn new(name: &str, registry: SpeciesRegistry) -> Self {
        let mut cost_correlations = CostCorrelations::new(CE_DEFAULT);
        cost_correlations.add(feed_scaled_item("Centrifuge", 25000.0));
        Self {
            name: name.to_string(),
            registry,
            recovery: 0.98,
            solids_species: "EColi".to_string(),
            power_kw: 2.0,
            cost_correlations,
            ins: vec![ProcessStream::new(&format!("{} feed", name))],
            outs: vec![
                ProcessStream::new(&format!("{} liquid", name)),
                ProcessStream::new(&format!("{} solids", name)),
            ],
            design: DesignResults::default(),
            costs: CostBreakdown::default(),
        }
    }
}

impl UnitOperation for CellSeparator {
    fn unit_name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self) -> Result<(), BioprocessError> {
        if !(0.0..=1.0).contains(&self.recovery) {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "separator recovery must be in [0, 1], got {}",
                self.recovery
            )));
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), BioprocessError> {
        let feed = self.ins[0].clone();
        let solids_name = self.outs[1].name.clone();
        let liquid = &mut self.outs[0];
        liquid.empty();
        liquid.T = feed.T;
        liquid.P = feed.P;
        let mut solids = ProcessStream::new(&solids_name);
        solids.phase = Phase::Solid;
        solids.T = feed.T;
        for component in feed.components() {
            let flow = feed.get_mol(&component);
            if component == self.solids_species {
                solids.add_mol(&component, flow);
            } else {
                liquid.add_mol(&component, flow * self.recovery);
                solids.add_mol(&component, flow * (1.0 - self.recovery));
            }
        }
        self.outs[1] = solids;
        Ok(())
    }

    fn design(&mut self) -> Result<(), BioprocessError> {
        self.design.clear();
        self.design
            .insert("Feed mass flow", self.ins[0].total_mass_flow(&self.registry));
        self.design.insert("Product recovery", self.recovery);
        Ok(())
    }

    fn cost(&mut self) -> Result<(), BioprocessError> {
        self.costs = self.cost_correlations.evaluate(&self.design)?;
        Ok(())
    }

    fn ins(&self) -> &[ProcessStream] {
        &self.ins
    }

    fn ins_mut(&mut self) -> &mut [ProcessStream] {
        &mut self.ins
    }

    fn outs(&self) -> &[ProcessStream] {
        &self.outs
    }

    fn design_results(&self) -> &DesignResults {
        &self.design
    }

    fn purchase_costs(&self) -> &CostBreakdown {
        &self.costs
    }

    fn power_demand(&self) -> f64 {
        self.power_kw
    }

    fn balance_warnings(&self) -> &[BalanceWarning] {
        &[]
    }
}

// ============================================================================
// Decolorization
// ============================================================================

/// Activated carbon treatment; a small share of the product adsorbs onto
/// the carbon and is lost with it
#[derive(Debug, Clone)]
pub struct Decolorization {
    pub name: String,
    pub registry: SpeciesRegistry,
    pub recovery: f64,
    /// Carbon dose, kg carbon per kg of dissolved product
    pub carbon_loading: f64,
    pub power_kw: f64,
    pub cost_correlations: CostCorrelations,
    ins: Vec<ProcessStream>,
    outs: Vec<ProcessStream>,
    design: DesignResults,
    costs: CostBreakdown,
}

impl Decolorization {
    pub fn new(name: &str, registry: SpeciesRegistry) -> Self {
        let mut cost_correlations = CostCorrelations::new(CE_DEFAULT);
        cost_correlations.add(feed_scaled_item("Carbon contactor", 20000.0));
        Self {
            name: name.to_string(),
            registry,
            recovery: 0.96,
            carbon_loading: 0.02,
            power_kw: 0.5,
            cost_correlations,
            ins: vec![ProcessStream::new(&format!("{} feed", name))],
            outs: vec![ProcessStream::new(&format!("{} product", name))],
            design: DesignResults::default(),
            costs: CostBreakdown::default(),
        }
    }

    /// Dissolved (non-water) mass in the feed (kg/hr)
    fn solute_mass(&self) -> f64 {
        let feed = &self.ins[0];
        feed.components()
            .iter()
            .filter(|c| c.as_str() != "Water")
            .map(|c| feed.mass_flow(c, &self.registry))
            .sum()
    }
}

impl UnitOperation for Decolorization {
    fn unit_name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self) -> Result<(), BioprocessError> {
        if !(0.0..=1.0).contains(&self.recovery) {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "decolorization recovery must be in [0, 1], got {}",
                self.recovery
            )));
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), BioprocessError> {
        let feed = self.ins[0].clone();
        let product = &mut self.outs[0];
        product.empty();
        product.T = feed.T;
        product.P = feed.P;
        for component in feed.components() {
            product.add_mol(&component, feed.get_mol(&component) * self.recovery);
        }
        Ok(())
    }

    fn design(&mut self) -> Result<(), BioprocessError> {
        let carbon_makeup = self.carbon_loading * self.solute_mass();
        self.design.clear();
        self.design
            .insert("Feed mass flow", self.ins[0].total_mass_flow(&self.registry));
        self.design.insert("Carbon makeup", carbon_makeup);
        Ok(())
    }

    fn cost(&mut self) -> Result<(), BioprocessError> {
        self.costs = self.cost_correlations.evaluate(&self.design)?;
        Ok(())
    }

    fn ins(&self) -> &[ProcessStream] {
        &self.ins
    }

    fn ins_mut(&mut self) -> &mut [ProcessStream] {
        &mut self.ins
    }

    fn outs(&self) -> &[ProcessStream] {
        &self.outs
    }

    fn design_results(&self) -> &DesignResults {
        &self.design
    }

    fn purchase_costs(&self) -> &CostBreakdown {
        &self.costs
    }

    fn power_demand(&self) -> f64 {
        self.power_kw
    }

    fn balance_warnings(&self) -> &[BalanceWarning] {
        &[]
    }
}

// ============================================================================
// Desalting
// ============================================================================

/// Ion exchange polish; the resin charge is replaced every batch
#[derive(Debug, Clone)]
pub struct Desalting {
    pub name: String,
    pub registry: SpeciesRegistry,
    pub recovery: f64,
    /// Resin replacement cost per batch (USD)
    pub resin_cost_per_batch: f64,
    pub power_kw: f64,
    pub cost_correlations: CostCorrelations,
    ins: Vec<ProcessStream>,
    outs: Vec<ProcessStream>,
    design: DesignResults,
    costs: CostBreakdown,
}

impl Desalting {
    pub fn new(name: &str, registry: SpeciesRegistry) -> Self {
        let mut cost_correlations = CostCorrelations::new(CE_DEFAULT);
        cost_correlations.add(feed_scaled_item("Ion exchange columns", 50000.0));
        Self {
            name: name.to_string(),
            registry,
            recovery: 0.94,
            resin_cost_per_batch: 500.0,
            power_kw: 1.0,
            cost_correlations,
            ins: vec![ProcessStream::new(&format!("{} feed", name))],
            outs: vec![ProcessStream::new(&format!("{} product", name))],
            design: DesignResults::default(),
            costs: CostBreakdown::default(),
        }
    }
}

impl UnitOperation for Desalting {
    fn unit_name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self) -> Result<(), BioprocessError> {
        if !(0.0..=1.0).contains(&self.recovery) {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "desalting recovery must be in [0, 1], got {}",
                self.recovery
            )));
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), BioprocessError> {
        let feed = self.ins[0].clone();
        let product = &mut self.outs[0];
        product.empty();
        product.T = feed.T;
        product.P = feed.P;
        for component in feed.components() {
            product.add_mol(&component, feed.get_mol(&component) * self.recovery);
        }
        Ok(())
    }

    fn design(&mut self) -> Result<(), BioprocessError> {
        self.design.clear();
        self.design
            .insert("Feed mass flow", self.ins[0].total_mass_flow(&self.registry));
        self.design
            .insert("Resin cost per batch", self.resin_cost_per_batch);
        Ok(())
    }

    fn cost(&mut self) -> Result<(), BioprocessError> {
        self.costs = self.cost_correlations.evaluate(&self.design)?;
        Ok(())
    }

    fn ins(&self) -> &[ProcessStream] {
        &self.ins
    }

    fn ins_mut(&mut self) -> &mut [ProcessStream] {
        &mut self.ins
    }

    fn outs(&self) -> &[ProcessStream] {
        &self.outs
    }

    fn design_results(&self) -> &DesignResults {
        &self.design
    }

    fn purchase_costs(&self) -> &CostBreakdown {
        &self.costs
    }

    fn power_demand(&self) -> f64 {
        self.power_kw
    }

    fn balance_warnings(&self) -> &[BalanceWarning] {
        &[]
    }
}

// ============================================================================
// Fluid bed dryer
// ============================================================================

/// Direct drying of the product solution to powder. The powder carries a
/// small residual moisture; the rest of the water leaves as vapor together
/// with the entrained product losses.
#[derive(Debug, Clone)]
pub struct FluidBedDryer {
    pub name: String,
    pub registry: SpeciesRegistry,
    pub recovery: f64,
    /// Residual moisture mass fraction of the powder
    pub moisture_content: f64,
    /// Drying temperature (K)
    pub temperature: f64,
    pub power_kw: f64,
    pub cost_correlations: CostCorrelations,
    ins: Vec<ProcessStream>,
    outs: Vec<ProcessStream>,
    design: DesignResults,
    costs: CostBreakdown,
}

impl FluidBedDryer {
    pub fn new(name: &str, registry: SpeciesRegistry) -> Self {
        let mut cost_correlations = CostCorrelations::new(CE_DEFAULT);
        cost_correlations.add(feed_scaled_item("Fluid bed dryer", 80000.0));
        Self {
            name: name.to_string(),
            registry,
            recovery: 0.95,
            moisture_content: 0.03,
            temperature: 338.15,
            power_kw: 3.0,
            cost_correlations,
            ins: vec![ProcessStream::new(&format!("{} feed", name))],
            outs: vec![
                ProcessStream::new(&format!("{} powder", name)),
                ProcessStream::new(&format!("{} vapor", name)),
            ],
            design: DesignResults::default(),
            costs: CostBreakdown::default(),
        }
    }
}

impl UnitOperation for FluidBedDryer {
    fn unit_name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self) -> Result<(), BioprocessError> {
        if !(0.0..1.0).contains(&self.moisture_content) {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "moisture content must be in [0, 1), got {}",
                self.moisture_content
            )));
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), BioprocessError> {
        let feed = self.ins[0].clone();
        let mut powder = ProcessStream::new(&self.outs[0].name);
        powder.phase = Phase::Solid;
        powder.T = self.temperature;
        let mut vapor = ProcessStream::new(&self.outs[1].name);
        vapor.phase = Phase::Gas;
        vapor.T = self.temperature;

        let mut solids_mass = 0.0;
        for component in feed.components() {
            let flow = feed.get_mol(&component);
            if component == "Water" {
                continue;
            }
            powder.add_mol(&component, flow * self.recovery);
            vapor.add_mol(&component, flow * (1.0 - self.recovery));
            solids_mass += feed.mass_flow(&component, &self.registry) * self.recovery;
        }
        // residual moisture rides with the powder, the rest evaporates
        let moisture_mass = solids_mass * self.moisture_content / (1.0 - self.moisture_content);
        let water_mw = self.registry.molar_mass("Water").unwrap_or(18.015);
        let moisture_mol = (moisture_mass * 1000.0 / water_mw).min(feed.get_mol("Water"));
        powder.add_mol("Water", moisture_mol);
        vapor.add_mol("Water", feed.get_mol("Water") - moisture_mol);

        self.outs[0] = powder;
        self.outs[1] = vapor;
        Ok(())
    }

    fn design(&mut self) -> Result<(), BioprocessError> {
        self.design.clear();
        self.design
            .insert("Feed mass flow", self.ins[0].total_mass_flow(&self.registry));
        self.design.insert(
            "Evaporated water",
            self.outs[1].mass_flow("Water", &self.registry),
        );
        self.design
            .insert("Powder mass flow", self.outs[0].total_mass_flow(&self.registry));
        Ok(())
    }

    fn cost(&mut self) -> Result<(), BioprocessError> {
        self.costs = self.cost_correlations.evaluate(&self.design)?;
        Ok(())
    }

    fn ins(&self) -> &[ProcessStream] {
        &self.ins
    }

    fn ins_mut(&mut self) -> &mut [ProcessStream] {
        &mut self.ins
    }

    fn outs(&self) -> &[ProcessStream] {
        &self.outs
    }

    fn design_results(&self) -> &DesignResults {
        &self.design
    }

    fn purchase_costs(&self) -> &CostBreakdown {
        &self.costs
    }

    fn power_demand(&self) -> f64 {
        self.power_kw
    }

    fn balance_warnings(&self) -> &[BalanceWarning] {
        &[]
    }
}

// ============================================================================
// Oxygen compressor
// ============================================================================

/// Compressed air supply for the aerobic regeneration stage. Sizes the air
/// flow from the oxygen demand when the inlet is unspecified and computes
/// isothermal compression power.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OxygenCompressorSpec {
    /// Oxygen demand of the reactor (mol/hr)
    pub oxygen_demand: f64,
    /// Outlet over inlet pressure
    pub compression_ratio: f64,
    /// Isothermal efficiency, in (0, 1]
    pub efficiency: f64,
}

impl Default for OxygenCompressorSpec {
    fn default() -> Self {
        Self {
            oxygen_demand: 0.0,
            compression_ratio: 2.0,
            efficiency: 0.75,
        }
    }
}

/// Mole fraction of oxygen in ambient air
const O2_IN_AIR: f64 = 0.21;

#[derive(Debug, Clone)]
pub struct OxygenCompressor {
    pub name: String,
    pub registry: SpeciesRegistry,
    pub spec: OxygenCompressorSpec,
    pub cost_correlations: CostCorrelations,
    ins: Vec<ProcessStream>,
    outs: Vec<ProcessStream>,
    design: DesignResults,
    costs: CostBreakdown,
    power_kw: f64,
}

impl OxygenCompressor {
    pub fn new(name: &str, registry: SpeciesRegistry, spec: OxygenCompressorSpec) -> Self {
        let mut cost_correlations = CostCorrelations::new(CE_DEFAULT);
        cost_correlations.add(CostItem {
            basis: "Compression power".to_string(),
            name: "Compressor".to_string(),
            base_cost: 12000.0,
            ref_size: 10.0,
            exponent: 0.62,
            bare_module: 2.15,
            ce_ref: CE_DEFAULT,
            kW: 0.0,
            per_reactor: false,
            magnitude: false,
        });
        Self {
            name: name.to_string(),
            registry,
            spec,
            cost_correlations,
            ins: vec![ProcessStream::new(&format!("{} ambient air", name))],
            outs: vec![ProcessStream::new(&format!("{} compressed air", name))],
            design: DesignResults::default(),
            costs: CostBreakdown::default(),
            power_kw: 0.0,
        }
    }
}

impl UnitOperation for OxygenCompressor {
    fn unit_name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self) -> Result<(), BioprocessError> {
        if self.spec.compression_ratio <= 1.0 {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "compression ratio must exceed 1, got {}",
                self.spec.compression_ratio
            )));
        }
        if !(self.spec.efficiency > 0.0 && self.spec.efficiency <= 1.0) {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "compressor efficiency must be in (0, 1], got {}",
                self.spec.efficiency
            )));
        }
        Ok(())
    }

    fn run(&mut self) -> Result<(), BioprocessError> {
        let inlet = self.ins[0].clone();
        let out = &mut self.outs[0];
        out.empty();
        out.phase = Phase::Gas;
        if inlet.is_empty() {
            // size the air flow from the oxygen demand
            out.set_mol("O2", self.spec.oxygen_demand);
            out.set_mol(
                "N2",
                self.spec.oxygen_demand * (1.0 - O2_IN_AIR) / O2_IN_AIR,
            );
            out.T = 298.15;
            out.P = 101325.0 * self.spec.compression_ratio;
        } else {
            out.copy_like(&inlet);
            out.P = inlet.P * self.spec.compression_ratio;
        }
        Ok(())
    }

    fn design(&mut self) -> Result<(), BioprocessError> {
        let out = &self.outs[0];
        let total_mol = out.total_mol_flow();
        // isothermal compression: W = n R T ln(P2/P1) / efficiency
        let work_j_per_hr =
            total_mol * R_G * out.T * self.spec.compression_ratio.ln() / self.spec.efficiency;
        self.power_kw = work_j_per_hr / 3.6e6;
        self.design.clear();
        self.design
            .insert("Air mass flow", out.total_mass_flow(&self.registry));
        self.design.insert("Oxygen supplied", out.get_mol("O2"));
        self.design.insert("Compression power", self.power_kw);
        Ok(())
    }

    fn cost(&mut self) -> Result<(), BioprocessError> {
        self.costs = self.cost_correlations.evaluate(&self.design)?;
        Ok(())
    }

    fn ins(&self) -> &[ProcessStream] {
        &self.ins
    }

    fn ins_mut(&mut self) -> &mut [ProcessStream] {
        &mut self.ins
    }

    fn outs(&self) -> &[ProcessStream] {
        &self.outs
    }

    fn design_results(&self) -> &DesignResults {
        &self.design
    }

    fn purchase_costs(&self) -> &CostBreakdown {
        &self.costs
    }

    fn power_demand(&self) -> f64 {
        self.power_kw
    }

    fn balance_warnings(&self) -> &[BalanceWarning] {
        &[]
    }
}
