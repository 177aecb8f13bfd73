mod cli;
mod daemon;

use std::process::ExitCode;

use clap::Parser;
use cli::{Cli, Commands};
use resultbox::config::Config;
use resultbox::{ResultOptions, ResultStore, backend};
use tracing_subscriber::EnvFilter;

type AnyError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<ExitCode, AnyError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = match cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };

    if let Commands::Run = cli.command {
        let store = ResultStore::connect(&config).await?;
        daemon::run(store).await?;
        return Ok(ExitCode::SUCCESS);
    }

    // One-shot commands write straight through and start no background loops
    let options = ResultOptions::builder()
        .expiry(config.results.expiry.as_duration())
        .build();
    let store = ResultStore::new(backend::open(&config.store).await?, options);

    let code = match cli.command {
        Commands::Get { id } => match store.get(&id).await {
            Ok(payload) => {
                println!("{}", String::from_utf8_lossy(&payload));
                ExitCode::SUCCESS
            }
            Err(e) if e.is_not_found() => {
                eprintln!("{}", e);
                ExitCode::FAILURE
            }
            Err(e) => return Err(e.into()),
        },
        Commands::List { outcome, json } => {
            let ids = store.list(outcome).await?;
            if json {
                println!("{}", serde_json::to_string(&ids)?);
            } else {
                for id in ids {
                    println!("{}", id);
                }
            }
            ExitCode::SUCCESS
        }
        Commands::Delete { id } => {
            store.delete_job(&id).await?;
            ExitCode::SUCCESS
        }
        Commands::Purge { older_than } => {
            let stats = store.purge_older_than(older_than.as_duration()).await?;
            println!(
                "purged outcome entries up to {} ({} expired results evicted)",
                stats.cutoff, stats.values_evicted
            );
            ExitCode::SUCCESS
        }
        Commands::Run => ExitCode::SUCCESS,
    };

    store.shutdown().await?;
    Ok(code)
}
