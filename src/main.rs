use clap::Parser;
use hve_sim::{
    parameters::validate_inputs, reports, run_simulations, summarize, CategorySummary, HveError,
    Params,
};
use log::{error, info, warn};
use std::path::PathBuf;

#[derive(Parser)]
#[command(version, about = "Mortality by vaccination status under the healthy-vaccinee effect", long_about = None)]
struct Args {
    /// path to the input file
    #[arg(short, long, default_value = "input/input.json")]
    input_file: PathBuf,

    /// path to the output directory
    #[arg(short, long, default_value = "output")]
    output_directory: PathBuf,

    /// override the number of runs in the input file
    #[arg(short, long)]
    runs: Option<usize>,

    /// override the random seed in the input file
    #[arg(short, long)]
    seed: Option<u64>,

    /// number of worker threads (defaults to one per core)
    #[arg(short, long)]
    threads: Option<usize>,
}

fn initialize(args: &Args) -> Result<Params, HveError> {
    let parameters = Params::read_json_file(&args.input_file)?.with_overrides(args.runs, args.seed);
    validate_inputs(&parameters)?;
    if let Some(threads) = args.threads {
        if let Err(e) = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
        {
            warn!("Could not configure {threads} threads: {e}");
        }
    }
    // make it easy for the user to see what the parameters are
    println!("{parameters:?}");
    Ok(parameters)
}

fn print_summary(summary: &[CategorySummary], figure_per: f64) {
    let width = summary
        .iter()
        .map(|row| row.label.chars().count())
        .max()
        .unwrap_or(0);
    println!();
    println!("Deaths per {figure_per} person-years (mean ± std across runs)");
    for row in summary {
        let padding = width - row.label.chars().count();
        print!("{}{} {:>12.2} ± {:>10.2}", row.label, " ".repeat(padding), row.mean, row.std);
        if row.undefined_runs > 0 {
            print!("  (undefined in {} runs)", row.undefined_runs);
        }
        println!();
    }
}

fn run(args: &Args) -> Result<(), HveError> {
    let parameters = initialize(args)?;
    let results = run_simulations(&parameters)?;
    let summary = summarize(&parameters, &results);
    print_summary(&summary, parameters.figure_per);
    reports::write_reports(&args.output_directory, &parameters, &results)?;
    info!("Reports written to {}", args.output_directory.display());

    #[cfg(feature = "profiling")]
    hve_sim::profiling::print_profiling_data();
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();
    if let Err(e) = run(&args) {
        error!("{e}");
        std::process::exit(1);
    }
}
