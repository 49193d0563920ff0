//! # Scenarios Module
//!
//! ## Purpose
//! The reactor model went through several campaign configurations over its
//! development (different substrate concentrations, cofactor loadings,
//! batch durations and aeration strategies). All stage coefficients and
//! loadings are configuration data here, not constants: each historical
//! parameter set survives as a named preset, and `canonical_1000L` is the
//! default the test suite pins down.
//!
//! Presets serialize to JSON so a campaign can be saved and reloaded
//! between runs.
//!
//! ## Presets
//! | name | scale | reaction | loading | aeration |
//! |------|-------|----------|---------|----------|
//! | `canonical_1000L` | 1000 L | 24 h (16 anaerobic + 8 aerobic) | 110 g/L | compressed air |
//! | `shake_flask_500L` | 500 L | 36 h (12 + 24) | 150 g/L | kLa medium |
//! | `bench_continuous_feed` | 50 kg/hr feed | 24 h | - | kLa medium |

use crate::BatchReactor::bioreactor::{BatchBioreactor, BioreactorConfig};
use crate::BatchReactor::oxygen_transfer::{AerationPolicy, KlaOption};
use crate::BatchReactor::sizing::SizingSpec;
use crate::Flowsheet::ProcessSystem;
use crate::Reactions::reaction_network::ReactionNetwork;
use crate::Reactions::reaction_step::BioprocessError;
use crate::Streams::User_species::SpeciesRegistry;
use crate::Streams::process_stream::ProcessStream;
use crate::Units::downstream::{
    CellSeparator, Decolorization, Desalting, FluidBedDryer, OxygenCompressor,
    OxygenCompressorSpec,
};
use crate::Units::unit_op::UnitOperation;
use serde::{Deserialize, Serialize};
use std::fs;

/// How the feed streams of a preset are specified
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum FeedBasis {
    /// Per-batch loadings of a batch campaign
    BatchLoading {
        batch_volume_l: f64,
        galactose_g_per_l: f64,
        /// Molar excess of formate over galactose
        formate_molar_excess: f64,
        biocatalyst_g_per_l: f64,
        /// Cofactor charges per batch (mol)
        nad_mol: f64,
        nadp_mol: f64,
        /// Compressed air charge per batch (kg)
        air_kg: f64,
    },
    /// Direct hourly flows (bench-scale continuous equivalent)
    HourlyFlows {
        galactose_kg_hr: f64,
        formate_kg_hr: f64,
        water_kg_hr: f64,
        air_kg_hr: f64,
    },
}

/// One complete campaign configuration
#[allow(non_snake_case)]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioPreset {
    pub name: String,
    pub feed: FeedBasis,
    /// Reaction time (hr), anaerobic + aerobic phases
    pub tau: f64,
    pub anaerobic_hours: f64,
    pub aerobic_hours: f64,
    /// Turnaround time (hr)
    pub tau_0: f64,
    /// Operating temperature (K)
    pub T: f64,
    pub pH: f64,
    pub stage1_conversion: f64,
    pub stage2_conversion: f64,
    pub regeneration_efficiency: f64,
    pub aeration: AerationPolicy,
    /// Fixed reactor count; mutually exclusive with `target_volume_m3`
    pub reactor_count: Option<usize>,
    pub target_volume_m3: Option<f64>,
    pub autoselect_count: bool,
    pub count_bounds: (usize, usize),
}

#[allow(non_snake_case)]
impl ScenarioPreset {
    /// The default campaign: 1000 L batch, 110 g/L galactose, 24 h reaction
    /// (16 h anaerobic + 8 h aerobic), 6 h turnaround for a 30 h cycle
    /// (250 batches per 7500 h year), compressed-air aeration
    pub fn canonical_1000L() -> Self {
        Self {
            name: "canonical_1000L".to_string(),
            feed: FeedBasis::BatchLoading {
                batch_volume_l: 1000.0,
                galactose_g_per_l: 110.0,
                formate_molar_excess: 0.05,
                biocatalyst_g_per_l: 20.0,
                nad_mol: 1.0,
                nadp_mol: 0.1,
                air_kg: 500.0,
            },
            tau: 24.0,
            anaerobic_hours: 16.0,
            aerobic_hours: 8.0,
            tau_0: 6.0,
            T: 298.15,
            pH: 8.0,
            stage1_conversion: 0.995,
            stage2_conversion: 0.98,
            regeneration_efficiency: 0.95,
            aeration: AerationPolicy::OxygenAbundant,
            reactor_count: Some(2),
            target_volume_m3: None,
            autoselect_count: false,
            count_bounds: (2, 36),
        }
    }

    /// Historical shake-flask campaign: 500 L, 150 g/L, 36 h reaction,
    /// diffusion-limited aeration at the standard shaker tier
    pub fn shake_flask_500L() -> Self {
        Self {
            name: "shake_flask_500L".to_string(),
            feed: FeedBasis::BatchLoading {
                batch_volume_l: 500.0,
                galactose_g_per_l: 150.0,
                formate_molar_excess: 0.05,
                biocatalyst_g_per_l: 50.0,
                nad_mol: 1.5,
                nadp_mol: 0.05,
                air_kg: 250.0,
            },
            tau: 36.0,
            anaerobic_hours: 12.0,
            aerobic_hours: 24.0,
            tau_0: 3.0,
            T: 298.15,
            pH: 8.0,
            stage1_conversion: 0.85,
            stage2_conversion: 1.0,
            regeneration_efficiency: 0.95,
            aeration: AerationPolicy::TransferLimited(KlaOption::Medium),
            reactor_count: Some(2),
            target_volume_m3: None,
            autoselect_count: false,
            count_bounds: (2, 36),
        }
    }

    /// Early bench configuration with direct hourly flows and a fixed
    /// four-reactor battery
    pub fn bench_continuous_feed() -> Self {
        Self {
            name: "bench_continuous_feed".to_string(),
            feed: FeedBasis::HourlyFlows {
                galactose_kg_hr: 50.0,
                formate_kg_hr: 30.0,
                water_kg_hr: 1000.0,
                air_kg_hr: 120.0,
            },
            tau: 24.0,
            anaerobic_hours: 16.0,
            aerobic_hours: 8.0,
            tau_0: 3.0,
            T: 310.15,
            pH: 7.0,
            stage1_conversion: 0.85,
            stage2_conversion: 0.98,
            regeneration_efficiency: 0.95,
            aeration: AerationPolicy::TransferLimited(KlaOption::Medium),
            reactor_count: Some(4),
            target_volume_m3: None,
            autoselect_count: false,
            count_bounds: (2, 36),
        }
    }

    pub fn cycle_time(&self) -> f64 {
        self.tau + self.tau_0
    }

    fn sizing(&self) -> Result<SizingSpec, BioprocessError> {
        let mut sizing = SizingSpec::new(
            self.tau,
            self.tau_0,
            0.9,
            self.count_bounds.0,
            self.count_bounds.1,
        )?;
        sizing.autoselect_N = self.autoselect_count;
        if let Some(n) = self.reactor_count {
            sizing.set_N(Some(n))?;
        }
        if let Some(v) = self.target_volume_m3 {
            sizing.set_V(Some(v))?;
        }
        Ok(sizing)
    }

    /// Hourly feed stream of the preset
    pub fn build_feed(&self, registry: &SpeciesRegistry) -> ProcessStream {
        let mut feed = ProcessStream::new("feed");
        feed.T = self.T;
        let kg_to_mol = |species: &str, kg: f64| -> f64 {
            registry
                .molar_mass(species)
                .map(|mw| kg * 1000.0 / mw)
                .unwrap_or(0.0)
        };
        match &self.feed {
            FeedBasis::BatchLoading {
                batch_volume_l,
                galactose_g_per_l,
                formate_molar_excess,
                biocatalyst_g_per_l,
                nad_mol,
                nadp_mol,
                ..
            } => {
                let cycle = self.cycle_time();
                let galactose_kg = batch_volume_l * galactose_g_per_l / 1000.0;
                let galactose_mol = kg_to_mol("Galactose", galactose_kg);
                // solution volume carried as water
                let water_kg = batch_volume_l * 1.0;
                feed.set_mol("Galactose", galactose_mol / cycle);
                feed.set_mol(
                    "Formate",
                    galactose_mol * (1.0 + formate_molar_excess) / cycle,
                );
                feed.set_mol("Water", kg_to_mol("Water", water_kg) / cycle);
                feed.set_mol(
                    "EColi",
                    kg_to_mol("EColi", batch_volume_l * biocatalyst_g_per_l / 1000.0) / cycle,
                );
                feed.set_mol("NAD", nad_mol / cycle);
                feed.set_mol("NADP", nadp_mol / cycle);
            }
            FeedBasis::HourlyFlows {
                galactose_kg_hr,
                formate_kg_hr,
                water_kg_hr,
                ..
            } => {
                feed.set_mol("Galactose", kg_to_mol("Galactose", *galactose_kg_hr));
                feed.set_mol("Formate", kg_to_mol("Formate", *formate_kg_hr));
                feed.set_mol("Water", kg_to_mol("Water", *water_kg_hr));
            }
        }
        feed
    }

    /// Hourly ambient air stream fed to the compressor
    pub fn build_air(&self, registry: &SpeciesRegistry) -> ProcessStream {
        let air_kg_hr = match &self.feed {
            FeedBasis::BatchLoading { air_kg, .. } => air_kg / self.cycle_time(),
            FeedBasis::HourlyFlows { air_kg_hr, .. } => *air_kg_hr,
        };
        let mut air = ProcessStream::new("ambient air");
        air.phase = crate::Streams::User_species::Phase::Gas;
        // 23.3% O2 by mass
        let o2_kg = air_kg_hr * 0.233;
        let n2_kg = air_kg_hr - o2_kg;
        if let Some(mw) = registry.molar_mass("O2") {
            air.set_mol("O2", o2_kg * 1000.0 / mw);
        }
        if let Some(mw) = registry.molar_mass("N2") {
            air.set_mol("N2", n2_kg * 1000.0 / mw);
        }
        air
    }

    /// Assemble the full flowsheet of the preset: compressor -> bioreactor
    /// -> cell separator -> decolorization -> desalting -> dryer
    pub fn build_system(
        &self,
        registry: &SpeciesRegistry,
    ) -> Result<ProcessSystem, BioprocessError> {
        let network = ReactionNetwork::tagatose_three_stage(
            self.stage1_conversion,
            self.stage2_conversion,
            self.regeneration_efficiency,
        )?;
        let mut config = BioreactorConfig::whole_cell(self.sizing()?);
        config.T = self.T;
        config.regeneration_efficiency = self.regeneration_efficiency;
        match &self.feed {
            FeedBasis::BatchLoading {
                biocatalyst_g_per_l,
                ..
            } => config.biocatalyst_loading = *biocatalyst_g_per_l,
            FeedBasis::HourlyFlows { .. } => {}
        }

        let mut reactor = BatchBioreactor::new(
            "R1",
            config,
            network,
            self.aeration,
            registry.clone(),
        )?;
        *reactor.feed_mut() = self.build_feed(registry);

        let feed_galactose = reactor.feed().get_mol("Galactose");
        let compressor = OxygenCompressor::new(
            "C1",
            registry.clone(),
            OxygenCompressorSpec {
                oxygen_demand: feed_galactose * 0.25,
                ..Default::default()
            },
        );

        let mut system = ProcessSystem::new(&self.name);
        let c1 = system.add_unit(compressor);
        let r1 = system.add_unit(reactor);
        let s1 = system.add_unit(CellSeparator::new("S1", registry.clone()));
        let d1 = system.add_unit(Decolorization::new("D1", registry.clone()));
        let ds1 = system.add_unit(Desalting::new("DS1", registry.clone()));
        let fd1 = system.add_unit(FluidBedDryer::new("FD1", registry.clone()));

        // the compressor inlet carries the scenario's air charge
        system.units[c1].ins_mut()[0] = self.build_air(registry);

        system.connect(c1, 0, r1, 1)?;
        system.connect(r1, 1, s1, 0)?;
        system.connect(s1, 0, d1, 0)?;
        system.connect(d1, 0, ds1, 0)?;
        system.connect(ds1, 0, fd1, 0)?;
        Ok(system)
    }

    pub fn save_to_file(&self, path: &str) -> Result<(), String> {
        let json = serde_json::to_string_pretty(self).map_err(|e| e.to_string())?;
        fs::write(path, json).map_err(|e| e.to_string())
    }

    pub fn load_from_file(path: &str) -> Result<Self, String> {
        let content = fs::read_to_string(path).map_err(|e| e.to_string())?;
        serde_json::from_str(&content).map_err(|e| e.to_string())
    }
}
