use std::{error::Error, process::ExitCode};

use clap::Parser;
use releasediff::{
    cli::args::CliArgs, config::ReleaseDiffConfig, AnalysisOptions, ReleaseDiff,
};

fn main() -> ExitCode {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    if let Err(e) = run() {
        log::error!("{}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}

fn run() -> Result<(), Box<dyn Error>> {
    let cli_args: CliArgs = CliArgs::parse();
    let config = ReleaseDiffConfig::load()?;

    let mut builder = ReleaseDiff::builder();
    if let Some(epics_top) = cli_args.epics_top.clone().or(config.epics_top) {
        builder = builder.epics_top(epics_top);
    }
    if let Some(output_directory) = cli_args.output_directory.clone().or(config.output_dir) {
        builder = builder.output_directory(output_directory);
    }
    if let Some(patterns) = config.release_file_patterns {
        builder = builder.release_file_patterns(patterns);
    }
    let release_diff = builder.try_build()?;

    let options = AnalysisOptions {
        compare: cli_args.compare_file_lists,
        complete_graph: cli_args.complete_dep_graph,
        listing_directory: cli_args.listing_dir.clone(),
    };
    release_diff.analyze(&cli_args.release_ids(), &options)
}
