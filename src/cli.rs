use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Keep theme songs in a media library in sync with ThemerrDB
#[derive(Parser)]
#[command(name = "themerr")]
#[command(about = "Downloads theme songs from ThemerrDB without touching user-supplied ones", long_about = None)]
pub struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args)]
pub struct LibraryArgs {
    /// JSON manifest listing the library's items
    #[arg(short, long)]
    pub library: PathBuf,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Reconcile every item once and print the report
    Run {
        #[command(flatten)]
        library: LibraryArgs,
        /// Print the report as JSON
        #[arg(long)]
        json: bool,
    },
    /// Reconcile now and then on the configured interval until Ctrl-C
    Watch {
        #[command(flatten)]
        library: LibraryArgs,
        /// Minutes between runs (never less than 15)
        #[arg(short, long)]
        interval: Option<u64>,
    },
    /// Show which items have themes and who supplied them
    Progress {
        #[command(flatten)]
        library: LibraryArgs,
        /// Page number, starting at 1
        #[arg(short, long, default_value_t = 1)]
        page: usize,
    },
    /// Print the effective configuration as TOML
    ShowConfig,
}
