//! `rollmap` command line: one subcommand per pipeline stage plus `run-all`.

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use rollmap_lib::modules::crossref::application::DEFAULT_WORKERS as CROSSREF_WORKERS;
use rollmap_lib::modules::jobs::{cancel_on_ctrl_c, ConcurrencyCalculator, StageReport};
use rollmap_lib::shared::utils::init_logger;
use rollmap_lib::{merged_tally, Pipeline, PipelineConfig, StageOptions};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;

#[derive(Parser, Debug)]
#[clap(name = "rollmap")]
#[clap(about = "Property-roll ingestion and public-housing cross-referencing")]
struct Cli {
    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Parse roll documents into evaluation units
    IngestRoll(StageArgs),
    /// Set unit coordinates from the point dataset
    AssignCoordinates(StageArgs),
    /// Link units to their lot polygons
    LinkLots(StageArgs),
    /// Merge disaggregated multi-unit residential buildings
    AggregateMurbs(StageArgs),
    /// Geocode and match public-housing buildings to units
    CrossrefHousing(StageArgs),
    /// Probe street-level imagery coverage per unit
    CheckImagery(StageArgs),
    /// Every stage, in dependency order
    RunAll(StageArgs),
}

#[derive(Args, Debug, Clone)]
struct StageArgs {
    /// Data directory; each stage uses a subdirectory
    #[clap(short = 'o', long, default_value = "./data", value_name = "DIR")]
    output_folder: PathBuf,

    /// Download the input dataset even if it is already present
    #[clap(short = 'd', long)]
    download_data: bool,

    /// Delete the stage's data directory afterwards
    #[clap(long)]
    delete_data: bool,

    /// Worker count (default: CPU count minus one)
    #[clap(short = 'n', long, value_name = "N")]
    num_workers: Option<usize>,

    /// Bound every input to a small sample
    #[clap(short = 't', long)]
    test: bool,
}

impl StageArgs {
    fn options(&self, default_workers: usize) -> StageOptions {
        StageOptions {
            output_folder: self.output_folder.clone(),
            download_data: self.download_data,
            delete_data: self.delete_data,
            num_workers: self.num_workers.unwrap_or(default_workers).max(1),
            test: self.test,
        }
    }
}

fn print_report(report: &StageReport) {
    println!("{}", report);
    for (name, value) in report.tally.iter() {
        println!("  {:<32} {}", name, value);
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logger();
    let cli = Cli::parse();

    let config = PipelineConfig::from_env().context("loading configuration")?;
    let cancel = CancellationToken::new();
    cancel_on_ctrl_c(cancel.clone());

    let pipeline = Pipeline::new(config, cancel).context("connecting to the database")?;
    let cpu_workers = ConcurrencyCalculator::default_workers();

    let report = match &cli.command {
        Command::IngestRoll(args) => pipeline.ingest_roll(&args.options(cpu_workers)).await?,
        Command::AssignCoordinates(args) => {
            pipeline.assign_coordinates(&args.options(cpu_workers)).await?
        }
        Command::LinkLots(args) => pipeline.link_lots(&args.options(1)).await?,
        Command::AggregateMurbs(args) => pipeline.aggregate_murbs(&args.options(1)).await?,
        Command::CrossrefHousing(args) => {
            pipeline
                .crossref_housing(&args.options(CROSSREF_WORKERS))
                .await?
        }
        Command::CheckImagery(args) => pipeline.check_imagery(&args.options(cpu_workers)).await?,
        Command::RunAll(args) => {
            let (reports, error) = pipeline.run_all(&args.options(cpu_workers)).await;
            for report in &reports {
                print_report(report);
            }
            println!("total: {}", merged_tally(&reports));
            if let Some(e) = error {
                return Err(e).context("pipeline stopped");
            }
            return Ok(());
        }
    };

    print_report(&report);
    Ok(())
}
