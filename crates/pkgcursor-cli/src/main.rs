//! pkgcursor - iterate package headers

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use pkgcursor_cli::cmd;
use pkgcursor_cli::{Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Query(args) => cmd::query::query(&args, cli.verbose),
        Commands::Pack { desc, output } => cmd::pack::pack(&desc, &output),
        Commands::Hdlist {
            inputs,
            output,
            compress,
        } => cmd::hdlist::hdlist(&inputs, &output, compress),
    }
}
