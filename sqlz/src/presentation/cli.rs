use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about = "Minify and gzip SQL scripts", long_about = None)]
pub struct Cli {
    #[command(flatten)]
    pub pipeline: PipelineArgs,

    #[command(subcommand)]
    pub command: Commands,
}

/// Settings shared by every subcommand. Flags win over the config file.
#[derive(Args, Clone, Debug, Default)]
pub struct PipelineArgs {
    /// TOML file with pipeline settings
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// gzip level 0-9
    #[arg(long, global = true)]
    pub level: Option<u32>,

    /// Remove block comments across lines and leave string literals alone
    #[arg(long, global = true)]
    pub spanning_comments: bool,

    /// Fixed timestamps inside the bundle
    #[arg(long, global = true)]
    pub deterministic: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the SQL files a batch of inputs yields
    List {
        /// .sql files, .zip archives or directories
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Print the minified text of every SQL file
    Minify {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,
    },

    /// Minify and gzip every SQL file, then write the artifacts
    Compress {
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// output directory
        #[arg(long, short)]
        out: PathBuf,

        /// also write sql_compressed.zip with every artifact
        #[arg(long)]
        bundle: bool,

        /// skip the per-file compressed_<name>.gz outputs
        #[arg(long)]
        no_individual: bool,

        /// print the size summary as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// Check that a .gz artifact or a bundle .zip decompresses cleanly
    Verify { artifact: PathBuf },

    /// Interactive session: add, remove, compress and save files
    Shell { inputs: Vec<PathBuf> },
}
