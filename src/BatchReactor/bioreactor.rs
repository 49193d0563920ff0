//! # Batch Bioreactor Module
//!
//! ## Aim
//! The generic batch bioreactor unit. One reactor type serves every variant
//! of the process: the staged chemistry is an injected `ReactionNetwork`
//! and the aeration strategy an injected `AerationPolicy`, so a different
//! reactor "model" is a different pair of policy values, not a subclass.
//!
//! ## Lifecycle
//! - `setup`: validates the configuration and applies the oxygen-transfer
//!   gating to the regeneration step of the network
//! - `run`: mixes the feed and air inlets into the effluent, forces the
//!   reaction cascade, splits the vent gases and computes the heat duty
//! - `design`: resolves the reactor count (fixed / target-volume /
//!   auto-select), sizes the battery and records the design results;
//!   sizes are stored per reactor
//! - `cost`: evaluates the NREL cost correlation stack
//!
//! Every phase is recomputed from scratch on each call; re-running with
//! unchanged inputs reproduces the same outputs.
//!
//! ## Material balance policy
//! Species missing from the registry never abort a run. Their contributions
//! are dropped and collected as `BalanceWarning`s, queryable through
//! `balance_warnings()` - an incomplete balance is visible, not silent.

use crate::BatchReactor::costing::{CostBreakdown, CostCorrelations};
use crate::BatchReactor::oxygen_transfer::AerationPolicy;
use crate::BatchReactor::sizing::{SizingSpec, autoselect_count, size_batch};
use crate::Reactions::reaction_network::ReactionNetwork;
use crate::Reactions::reaction_step::{BalanceWarning, BioprocessError};
use crate::Streams::User_species::{Phase, SpeciesRegistry};
use crate::Streams::process_stream::ProcessStream;
use crate::Units::unit_op::{DesignResults, UnitOperation};
use log::info;
use serde::{Deserialize, Serialize};

/// Immutable configuration of a batch bioreactor, fixed at construction
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BioreactorConfig {
    /// Operating temperature (K)
    pub T: f64,
    /// Operating pressure (Pa)
    pub P: f64,
    pub sizing: SizingSpec,
    /// Heat released per mol of basis substrate reacted (kJ/mol, negative =
    /// exothermic), dominated by the formate oxidation
    pub heat_of_reaction: f64,
    /// Limiting substrate the conversion and duty are tracked on
    pub basis_species: String,
    /// Nominal (oxygen-unlimited) cofactor regeneration efficiency, in [0, 1]
    pub regeneration_efficiency: f64,
    /// Index of the regeneration step in the network whose conversion is
    /// gated by oxygen transfer
    pub oxygen_gated_step: Option<usize>,
    /// Whole-cell biocatalyst loading (g/L)
    pub biocatalyst_loading: f64,
}

impl BioreactorConfig {
    /// Whole-cell biocatalysis defaults: 37 C, atmospheric pressure,
    /// formate-driven exotherm of -50 kJ/mol, galactose basis
    pub fn whole_cell(sizing: SizingSpec) -> Self {
        Self {
            T: 310.15,
            P: 101325.0,
            sizing,
            heat_of_reaction: -50.0,
            basis_species: "Galactose".to_string(),
            regeneration_efficiency: 0.95,
            oxygen_gated_step: Some(2),
            biocatalyst_loading: 10.0,
        }
    }

    pub fn validate(&self) -> Result<(), BioprocessError> {
        if !(0.0..=1.0).contains(&self.regeneration_efficiency) {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "regeneration efficiency must be in [0, 1], got {}",
                self.regeneration_efficiency
            )));
        }
        if self.T <= 0.0 || self.P <= 0.0 {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "temperature and pressure must be positive, got T = {}, P = {}",
                self.T, self.P
            )));
        }
        Ok(())
    }
}

/// Batch bioreactor unit: two inlets (feed, air), two outlets (vent,
/// effluent)
#[derive(Debug, Clone)]
pub struct BatchBioreactor {
    pub name: String,
    pub config: BioreactorConfig,
    pub network: ReactionNetwork,
    pub aeration: AerationPolicy,
    pub registry: SpeciesRegistry,
    pub cost_correlations: CostCorrelations,
    ins: Vec<ProcessStream>,
    outs: Vec<ProcessStream>,
    design: DesignResults,
    costs: CostBreakdown,
    warnings: Vec<BalanceWarning>,
    /// Net heat duty of the whole battery (kJ/hr)
    duty: f64,
    configured: bool,
    has_run: bool,
}

impl BatchBioreactor {
    pub fn new(
        name: &str,
        config: BioreactorConfig,
        network: ReactionNetwork,
        aeration: AerationPolicy,
        registry: SpeciesRegistry,
    ) -> Result<Self, BioprocessError> {
        config.validate()?;
        if let Some(index) = config.oxygen_gated_step {
            if index >= network.steps.len() {
                return Err(BioprocessError::InvalidConfiguration(format!(
                    "oxygen-gated step index {} is out of range for a {}-step network",
                    index,
                    network.steps.len()
                )));
            }
        }
        let ins = vec![
            ProcessStream::new(&format!("{} feed", name)),
            ProcessStream::new(&format!("{} air", name)),
        ];
        let outs = vec![
            ProcessStream::new(&format!("{} vent", name)),
            ProcessStream::new(&format!("{} effluent", name)),
        ];
        Ok(Self {
            name: name.to_string(),
            config,
            network,
            aeration,
            registry,
            cost_correlations: CostCorrelations::nrel_batch_bioreactor(),
            ins,
            outs,
            design: DesignResults::default(),
            costs: CostBreakdown::default(),
            warnings: Vec::new(),
            duty: 0.0,
            configured: false,
            has_run: false,
        })
    }

    pub fn feed(&self) -> &ProcessStream {
        &self.ins[0]
    }

    pub fn feed_mut(&mut self) -> &mut ProcessStream {
        &mut self.ins[0]
    }

    pub fn air_mut(&mut self) -> &mut ProcessStream {
        &mut self.ins[1]
    }

    pub fn vent(&self) -> &ProcessStream {
        &self.outs[0]
    }

    pub fn effluent(&self) -> &ProcessStream {
        &self.outs[1]
    }

    /// Net heat duty (kJ/hr), negative when cooling is required
    pub fn duty(&self) -> f64 {
        self.duty
    }

    /// Effective conversion of the oxygen-gated regeneration step
    pub fn effective_regeneration(&self) -> f64 {
        self.config.regeneration_efficiency * self.aeration.efficiency_factor()
    }

    fn basis_reacted(&self) -> f64 {
        let basis = &self.config.basis_species;
        let fed = self.ins.iter().map(|s| s.get_mol(basis)).sum::<f64>();
        fed - self.outs[1].get_mol(basis)
    }
}

impl UnitOperation for BatchBioreactor {
    fn unit_name(&self) -> &str {
        &self.name
    }

    fn setup(&mut self) -> Result<(), BioprocessError> {
        self.config.validate()?;
        if let Some(index) = self.config.oxygen_gated_step {
            let effective = self.effective_regeneration();
            self.network.set_step_conversion(index, effective)?;
        }
        for out in &mut self.outs {
            out.T = self.config.T;
            out.P = self.config.P;
        }
        self.outs[0].phase = Phase::Gas;
        self.configured = true;
        Ok(())
    }

    fn run(&mut self) -> Result<(), BioprocessError> {
        if !self.configured {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "unit '{}' must be set up before running",
                self.name
            )));
        }
        let mut effluent = ProcessStream::new(&self.outs[1].name);
        effluent.mix_from(&[&self.ins[0], &self.ins[1]]);
        effluent.T = self.config.T;
        effluent.P = self.config.P;

        self.warnings = self.network.force_all(&mut effluent, &self.registry);

        let mut vent = ProcessStream::new(&self.outs[0].name);
        vent.receive_vent(&mut effluent, &self.registry);
        vent.T = self.config.T;
        vent.P = self.config.P;

        self.outs[0] = vent;
        self.outs[1] = effluent;
        self.has_run = true;

        self.duty = self.config.heat_of_reaction * self.basis_reacted();
        info!(
            "{}: reacted {:.2} mol/hr of {}, duty {:.1} kJ/hr, {} balance warnings",
            self.name,
            self.basis_reacted(),
            self.config.basis_species,
            self.duty,
            self.warnings.len()
        );
        Ok(())
    }

    fn design(&mut self) -> Result<(), BioprocessError> {
        if !self.has_run {
            return Err(BioprocessError::InvalidConfiguration(format!(
                "unit '{}' must run before design",
                self.name
            )));
        }
        let spec = &self.config.sizing;
        let v_0 = self.outs[1].total_volumetric_flow(&self.registry);

        let n = if spec.autoselect_N {
            let correlations = self.cost_correlations.clone();
            let duty = self.duty;
            let (tau, tau_0, v_wf) = (spec.tau, spec.tau_0, spec.V_wf);
            autoselect_count(spec.Nmin, spec.Nmax, |n| {
                let Ok(sized) = size_batch(v_0, tau, tau_0, n, v_wf) else {
                    return f64::INFINITY;
                };
                let mut candidate = DesignResults::default();
                candidate.insert("Reactor volume", sized.reactor_volume);
                candidate.insert("Recirculation flow rate", v_0 / n as f64);
                candidate.insert("Reactor duty", duty / n as f64);
                candidate.insert("Number of reactors", n as f64);
                correlations
                    .evaluate(&candidate)
                    .map(|breakdown| breakdown.total())
                    .unwrap_or(f64::INFINITY)
            })
        } else {
            spec.resolve_count(v_0)?
        };

        let sized = size_batch(v_0, spec.tau, spec.tau_0, n, spec.V_wf)?;

        self.design.clear();
        self.design.insert("Reactor volume", sized.reactor_volume);
        self.design.insert("Cycle time", sized.cycle_time);
        self.design.insert("Loading time", sized.loading_time);
        self.design.insert("Total dead time", sized.total_dead_time);
        self.design.insert("Number of reactors", n as f64);
        self.design.insert("Recirculation flow rate", v_0 / n as f64);
        self.design.insert("Reactor duty", self.duty / n as f64);
        if let Some(kla) = self.aeration.kla() {
            self.design.insert("kLa", kla);
        }
        self.design.insert(
            "NAD regeneration rate",
            self.aeration
                .regeneration_rate(self.config.regeneration_efficiency),
        );
        self.design
            .insert("Tagatose production", self.outs[1].get_mol("Tagatose"));
        self.design
            .insert("Galactose remaining", self.outs[1].get_mol("Galactose"));
        self.design
            .insert("CO2 production", self.outs[0].get_mol("CO2"));
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
        self.cost_correlations.total_power(&self.design)
    }

    fn balance_warnings(&self) -> &[BalanceWarning] {
        &self.warnings
    }
}
