use clap::{Parser, Subcommand};
use resultbox::Outcome;
use resultbox::config::HumanDuration;
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "resultbox")]
#[command(about = "Job result store CLI", long_about = None)]
pub struct Cli {
    /// Configuration file (defaults to $RESULTBOX_CONFIG or config/resultbox.toml)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the stored result of a job
    Get {
        id: String,
    },
    /// List job ids by outcome, most recent first
    List {
        /// success or failed
        outcome: Outcome,
        /// Print a JSON array instead of one id per line
        #[arg(long)]
        json: bool,
    },
    /// Delete a job's result and outcome entries
    Delete {
        id: String,
    },
    /// Remove outcome entries older than the given age
    Purge {
        #[arg(long)]
        older_than: HumanDuration,
    },
    /// Run the background flusher and purger until interrupted
    Run,
}
