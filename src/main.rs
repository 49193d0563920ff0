use TagaTEA::Streams::User_species::SpeciesRegistry;
use TagaTEA::TEA::EconomicAnalysis;
use TagaTEA::scenarios::ScenarioPreset;
use simplelog::{Config, LevelFilter, SimpleLogger};

pub fn main() {
    let _ = SimpleLogger::init(LevelFilter::Info, Config::default());

    let registry = SpeciesRegistry::tagatose_process();
    let preset = ScenarioPreset::canonical_1000L();
    println!(
        "\x1b[34mTagaTEA: batch whole-cell D-galactose -> D-tagatose process model\n\
         scenario '{}': {} h reaction + {} h turnaround\x1b[0m",
        preset.name, preset.tau, preset.tau_0
    );

    let mut system = match preset.build_system(&registry) {
        Ok(system) => system,
        Err(e) => {
            eprintln!("failed to build the flowsheet: {}", e);
            return;
        }
    };
    if let Err(e) = system.simulate() {
        eprintln!("simulation failed: {}", e);
        return;
    }
    system.print_report();

    let mut analysis = EconomicAnalysis::default();
    analysis.product_stream = Some("FD1 powder".to_string());
    if let Err(e) = analysis.print_analysis(&system) {
        eprintln!("economic analysis failed: {}", e);
    }
}
