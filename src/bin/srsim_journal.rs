use srsim::prelude::*;
use srsim::StrError;
use structopt::StructOpt;

/// Command line options
#[derive(StructOpt, Debug)]
#[structopt(
    name = "srsim_journal",
    about = "Assembles one worker's site model and writes the solver command journal"
)]
struct Options {
    /// Directory containing the tabular record files
    data_dir: String,

    /// Output journal path (JSON)
    out_path: String,

    /// Water level (y coordinate)
    #[structopt(long, default_value = "0.0")]
    water_level: f64,

    /// Worker id (0-based)
    #[structopt(long, default_value = "0")]
    pid: usize,

    /// Number of workers
    #[structopt(long, default_value = "1")]
    np: usize,

    /// Stop after the model assembly (skip the gravity and permeability phases)
    #[structopt(long)]
    assembly_only: bool,
}

fn main() -> Result<(), StrError> {
    env_logger::init();

    // parse options
    let options = Options::from_args();
    let ctx = PartitionContext::new(options.pid, options.np)?;

    // load records and build the model against the journal engine
    let store = GeometryStore::read_dir(&options.data_dir, options.water_level)?;
    let catalog = SampleSite::two_layer_catalog();
    let config = ModelConfig::new();
    let mut model = SiteModel::new(store, catalog, config, ctx)?;
    let mut engine = JournalEngine::new();
    model.build(&mut engine)?;
    println!("{}", model);

    // run the static phases so that the journal documents the whole sequence
    if !options.assembly_only {
        let mut stager = AnalysisStager::new(&model);
        stager.run_gravity_elastic(&mut engine)?;
        stager.run_gravity_plastic(&mut engine)?;
        stager.switch_permeability(&mut engine)?;
        println!("reached phase {}", stager.phase());
    }

    // write the journal
    engine.write_json(&options.out_path)?;
    println!("journal written to {}", options.out_path);
    Ok(())
}
