//! groupbib: maintain a curated publication list for a group of people
//!
//! Pulls each member's DBLP feed, merges the records into a SQLite
//! store, and renders the visible subset into templated output files.

mod config;
mod render;

use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use thiserror::Error;
use tracing::error;
use tracing_subscriber::EnvFilter;

use groupbib_core::{PublicationType, Store, StoreError};
use groupbib_dblp::{pull, DblpClient};

use crate::config::{Config, ConfigError};
use crate::render::{render_outputs, RenderError};

#[derive(Parser)]
#[command(
    name = "groupbib",
    about = "Maintain a publication list for a group of people",
    version
)]
struct Cli {
    /// Configuration file
    #[arg(long, global = true, default_value = "groupbib.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Fetch every member's DBLP feed and merge it into the store
    Pull {
        /// Merge but do not commit
        #[arg(long)]
        dry_run: bool,
    },
    /// Render the visible publications into the configured outputs
    Push,
    /// Pull, then push
    Sync {
        /// Merge but do not commit, and skip rendering
        #[arg(long)]
        dry_run: bool,
    },
    /// Flip or set the visibility of one publication
    Toggle {
        /// Unique fragment of the publication's DBLP key
        key: String,
        /// Set explicitly instead of flipping
        #[arg(long, value_enum)]
        set: Option<VisibilityArg>,
    },
    /// Print the visible publications
    Show {
        /// Restrict the listing to these years
        years: Vec<i32>,
        /// Leave out informal preprints
        #[arg(long)]
        no_preprints: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum VisibilityArg {
    Visible,
    Hidden,
}

#[derive(Error, Debug)]
enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("{err}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), AppError> {
    let config = Config::load(&cli.config)?;
    let mut store = Store::open(&config.db_path)?;

    match cli.command {
        Command::Pull { dry_run } => pull_command(&mut store, &config, dry_run).await,
        Command::Push => Ok(render_outputs(&store, &config.outputs)?),
        Command::Sync { dry_run } => {
            pull_command(&mut store, &config, dry_run).await?;
            if !dry_run {
                render_outputs(&store, &config.outputs)?;
            }
            Ok(())
        }
        Command::Toggle { key, set } => {
            let publication = match set {
                None => store.toggle_visibility(&key)?,
                Some(VisibilityArg::Visible) => store.set_visibility(&key, true)?,
                Some(VisibilityArg::Hidden) => store.set_visibility(&key, false)?,
            };
            let state = if publication.visibility == Some(true) {
                "visible"
            } else {
                "hidden"
            };
            println!("{}: now {}", publication.key, state);
            Ok(())
        }
        Command::Show {
            years,
            no_preprints,
        } => {
            for publication in store.visible_publications()? {
                if !years.is_empty() && !years.contains(&publication.year) {
                    continue;
                }
                if no_preprints && publication.kind == PublicationType::Informal {
                    continue;
                }
                println!("- {publication}\n");
            }
            Ok(())
        }
    }
}

async fn pull_command(store: &mut Store, config: &Config, dry_run: bool) -> Result<(), AppError> {
    let members = config.members()?;
    let client = DblpClient::new();
    let report = pull(store, &client, &members, dry_run).await?;

    if let Some(stats) = report.committed {
        println!(
            "committed {} new publications, {} new authors",
            stats.new_publications, stats.new_authors
        );
    }
    for (pid, err) in &report.failures {
        eprintln!("import of '{pid}' failed: {err}");
    }
    Ok(())
}
