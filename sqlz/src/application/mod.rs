pub mod handlers;
pub mod shell;

use crate::presentation::cli::{Cli, Commands};
use sqlz_core::error::Result;
use clap::Parser;

pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let pipeline = cli.pipeline;
    match cli.command {
        Commands::List { inputs } => handlers::handle_list(&pipeline, inputs),
        Commands::Minify { inputs } => handlers::handle_minify(&pipeline, inputs),
        Commands::Compress {
            inputs,
            out,
            bundle,
            no_individual,
            json,
        } => handlers::handle_compress(&pipeline, inputs, out, bundle, no_individual, json),
        Commands::Verify { artifact } => handlers::handle_verify(artifact),
        Commands::Shell { inputs } => handlers::handle_shell(&pipeline, inputs),
    }
}
