use std::io::Read;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gtm_portal_config::PortalConfig;
use gtm_portal_mod_revisions::config::resolve_data_dir;
use gtm_portal_mod_revisions::{
    RedbStorage, RevisionConfig, RevisionKind, RevisionStorage, RevisionStore,
};

mod commands;

/// Inspect and maintain the GTM portal's revision history.
#[derive(Parser, Debug)]
#[command(name = "gtm-portal", version, about)]
struct Cli {
    /// Config file to use instead of `gtm-portal.json` next to the executable.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Directory holding the revision database.
    #[arg(long = "data-dir", global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List items that have stored history.
    Items,
    /// Show the revision history of an item.
    History { item: String },
    /// Print the content of one revision.
    Show { item: String, version: u32 },
    /// Compare two revisions line by line.
    Diff { item: String, a: u32, b: u32 },
    /// Record a new revision. Content is read from `--file` or stdin.
    Record {
        item: String,
        #[arg(long, default_value = "document")]
        kind: RevisionKind,
        #[arg(long)]
        author: String,
        #[arg(long, default_value = "")]
        changes: String,
        #[arg(long)]
        file: Option<PathBuf>,
    },
    /// Export an item's history as JSON.
    Export {
        item: String,
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Import a history export and store it.
    Import { path: PathBuf },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(PortalConfig::config_path);
    let config = PortalConfig::load_or_create(&config_path);

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    let data_dir = cli
        .data_dir
        .clone()
        .or_else(|| config.configured_data_dir())
        .unwrap_or_else(resolve_data_dir);
    tracing::debug!("Using data directory {}", data_dir.display());

    let storage = RedbStorage::open(&data_dir)?;
    let shared: std::sync::Arc<dyn RevisionStorage> = storage.clone();
    let mut store = RevisionStore::new(RevisionConfig::from(&config.revisions), Some(shared));

    let stdout = std::io::stdout();
    let mut out = stdout.lock();
    let result = match cli.command {
        Command::Items => commands::items(&*storage, &mut out),
        Command::History { item } => commands::history(&mut store, &item, &mut out),
        Command::Show { item, version } => commands::show(&mut store, &item, version, &mut out),
        Command::Diff { item, a, b } => commands::diff(&mut store, &item, a, b, &mut out),
        Command::Record {
            item,
            kind,
            author,
            changes,
            file,
        } => {
            let content = read_content(file.as_deref())?;
            commands::record(&mut store, &item, &content, kind, &author, &changes, &mut out)
        }
        Command::Export { item, output } => match output {
            Some(path) => {
                let mut file = std::fs::File::create(&path)
                    .with_context(|| format!("Failed to create {}", path.display()))?;
                commands::export(&mut store, &item, &mut file)
            }
            None => commands::export(&mut store, &item, &mut out),
        },
        Command::Import { path } => {
            let data = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read {}", path.display()))?;
            commands::import(&mut store, &data, &mut out)
        }
    };

    store.shutdown();
    result
}

/// Reads revision content from `path`, or from stdin when no path is given.
fn read_content(path: Option<&std::path::Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display())),
        None => {
            let mut content = String::new();
            std::io::stdin()
                .read_to_string(&mut content)
                .context("Failed to read content from stdin")?;
            Ok(content)
        }
    }
}
