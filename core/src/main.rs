use clap::Parser;
use log::{error, info};
use radiobatch_core::cli::{self, Cli, ProgressReporter, TextReport};
use std::process;

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    info!(
        "Processing images from {} with masks from {}",
        cli.image_dir.display(),
        cli.mask_dir.display()
    );

    let reporter = ProgressReporter::new();
    let outcome = match cli::run(&cli, &reporter) {
        Ok(outcome) => outcome,
        Err(e) => {
            error!("{}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    // Per-case failures are part of the table, not a failed run
    match &outcome.export {
        Some(path) => {
            println!(
                "Extracted {} of {} cases ({} failed)",
                outcome.table.success_count(),
                outcome.table.len(),
                outcome.table.failure_count()
            );
            println!("Wrote {}", path.display());
        }
        None => print!("{}", TextReport::new(&outcome.table)),
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}
