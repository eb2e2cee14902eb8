use basketcast::cli::Cli;
use basketcast::commands::run;
use basketcast::init_logging;
use clap::Parser;

fn main() -> color_eyre::Result<()> {
    color_eyre::install()?;

    let cli = Cli::parse();
    init_logging(cli.log_file.as_deref(), &cli.log_level)?;

    run(cli)
}
