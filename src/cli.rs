use clap::{Parser, Subcommand};
use std::path::PathBuf;

use crate::config::DEFAULT_CONFIG_FILE;

#[derive(Parser)]
#[command(name = "javadoc-search")]
#[command(about = "Fuzzy search over Javadoc API documentation", long_about = None)]
pub struct Cli {
    /// Configuration file; index paths in it are relative to its directory.
    #[arg(long, global = true, default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the best matches for a query.
    Search {
        query: String,
        #[arg(short, long)]
        library: Option<String>,
        #[arg(short = 'n', long)]
        limit: Option<usize>,
        /// Group the matches by entity kind.
        #[arg(long)]
        grouped: bool,
    },
    /// Print the URL of the best match.
    Url {
        query: String,
        #[arg(short, long)]
        library: Option<String>,
    },
    /// List the configured libraries.
    Libraries,
}
