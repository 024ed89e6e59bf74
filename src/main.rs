mod cli;

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use cli::{Cli, Commands};
use themerr::config::Config;
use themerr::library::ManifestLibrary;
use themerr::progress::ThemeProvider;
use themerr::reconcile::{BatchReport, ItemOutcome};
use themerr::Themerr;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("themerr=info")))
        .init();

    let cli = Cli::parse();
    let mut config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Run { library, json } => {
            let app = Themerr::new(config, Arc::new(ManifestLibrary::new(library.library)))?;
            let cancel = CancellationToken::new();
            let stopper = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    stopper.cancel();
                }
            });
            let report = app.run_once(&cancel).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                print_report(&report);
            }
        }
        Commands::Watch { library, interval } => {
            if let Some(minutes) = interval {
                config.set_update_interval(minutes);
            }
            let app = Themerr::new(config, Arc::new(ManifestLibrary::new(library.library)))?;
            let cancel = CancellationToken::new();
            let stopper = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    tracing::info!("stopping after the current item");
                    stopper.cancel();
                }
            });
            tracing::info!(minutes = app.config().update_interval(), "watching library");
            let runs = app.watch(cancel).await;
            tracing::info!(runs, "stopped");
        }
        Commands::Progress { library, page } => {
            let app = Themerr::new(config, Arc::new(ManifestLibrary::new(library.library)))?;
            let progress = app.progress(page).await?;
            println!(
                "{} of {} items have theme songs (page {page} of {})",
                progress.media_with_themes,
                progress.media_count,
                progress.total_pages.max(1)
            );
            for item in &progress.items {
                let year = item.year.map(|y| format!(" ({y})")).unwrap_or_default();
                match item.theme_provider {
                    ThemeProvider::Themerr => println!("  [themerr] {}{year}", item.title),
                    ThemeProvider::User => println!("  [user]    {}{year}", item.title),
                    ThemeProvider::None => println!(
                        "  [none]    {}{year}  {}",
                        item.title,
                        item.issue_url.as_deref().unwrap_or_default()
                    ),
                }
            }
        }
        Commands::ShowConfig => {
            print!("{}", toml::to_string_pretty(&config)?);
        }
    }
    Ok(())
}

fn print_report(report: &BatchReport) {
    for item in &report.items {
        let purged = if item.purged { " (stale record removed)" } else { "" };
        match &item.outcome {
            ItemOutcome::Recorded { source_url } => println!("saved    {}: {source_url}{purged}", item.name),
            ItemOutcome::Skipped { reason } => println!("skipped  {}: {}{purged}", item.name, reason.as_str()),
            ItemOutcome::Failed { error } => println!("failed   {}: {error}{purged}", item.name),
            ItemOutcome::Cancelled => println!("cancelled {}", item.name),
        }
    }
    println!(
        "{} saved, {} skipped, {} failed, {} cancelled",
        report.recorded(),
        report.skipped(),
        report.failed(),
        report.cancelled()
    );
}
