use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tracing::debug;

use crate::config::IndexConfig;
use crate::index_storage::FileStore;
use crate::lookup::ImageLocator;
use crate::source::{HttpTreeSource, LocalTreeSource, SharedSource};
use crate::utils::{get_cache_dir, resolve_cache_dir};

#[derive(Parser)]
#[command(name = "plaza-image-index")]
#[command(version = "0.1.0")]
#[command(about = "Find plaza images by key in a Drive image tree", long_about = None)]
pub struct Cli {
    /// Tree server base URL, or path to a drive_tree.json file
    #[arg(long, global = true, env = "PLAZA_INDEX_SOURCE")]
    pub source: Option<String>,

    /// Directory for the persisted index (default: user cache dir)
    #[arg(long, global = true)]
    pub cache_dir: Option<String>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Build the index, reusing a fresh cached copy unless forced
    Build {
        /// Always fetch and rebuild the tree
        #[arg(long)]
        force: bool,
    },
    /// Print image URLs for a plaza key, alias or key fragment
    Find { key: String },
    /// Compare the remote tree version with the cached index
    Check,
    /// Show statistics about the index
    Stats,
    /// Keep the index fresh and print events as JSON lines until interrupted
    Watch,
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    let Some(command) = &cli.command else {
        println!("Use --help for usage information");
        return Ok(());
    };

    let config = IndexConfig::from_env()?;
    let cache_dir = match cli.cache_dir.as_deref() {
        Some(dir) => resolve_cache_dir(Some(dir))?,
        None => get_cache_dir()?,
    };
    let locator = Arc::new(open_locator(cli.source.as_deref(), &cache_dir, config)?);

    match command {
        Commands::Build { force } => {
            let outcome = locator.build_index(*force).await;
            print_json(&outcome)?;
        }
        Commands::Find { key } => find(&locator, key).await,
        Commands::Check => print_json(&locator.check_cached_version().await)?,
        Commands::Stats => show_stats(&locator, &cache_dir).await,
        Commands::Watch => watch(&locator).await?,
    }

    Ok(())
}

/// `http(s)://` sources go to the server, anything else is a tree file path
pub fn open_source(source: Option<&str>, config: &IndexConfig) -> Result<SharedSource> {
    let Some(source) = source.map(str::trim).filter(|s| !s.is_empty()) else {
        bail!("No tree source given; pass --source or set PLAZA_INDEX_SOURCE");
    };

    if source.starts_with("http://") || source.starts_with("https://") {
        Ok(Arc::new(HttpTreeSource::new(source, config.http_timeout)?))
    } else {
        Ok(Arc::new(LocalTreeSource::new(source, &config.url_template)))
    }
}

fn open_locator(source: Option<&str>, cache_dir: &Path, config: IndexConfig) -> Result<ImageLocator> {
    let source = open_source(source, &config)?;
    let store = FileStore::open(cache_dir)
        .with_context(|| format!("Failed to open cache directory: {}", cache_dir.display()))?;
    debug!(cache_dir = %cache_dir.display(), "opened index store");
    Ok(ImageLocator::new(source, Arc::new(store), config))
}

fn print_json(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

async fn find(locator: &ImageLocator, key: &str) {
    let urls = locator.find_image_urls(key).await;
    if urls.is_empty() {
        eprintln!("No images found for '{}'", key.trim());
        return;
    }
    for url in urls {
        println!("{}", url);
    }
}

async fn show_stats(locator: &ImageLocator, cache_dir: &Path) {
    let outcome = locator.build_index(false).await;

    println!("Plaza Image Index Statistics");
    println!("============================");
    match locator.held_version() {
        Some(version) => println!("Version: {}", version),
        None => println!("Version: (none)"),
    }
    println!("Keys: {}", locator.index_size());
    println!("Aliases: {}", locator.alias_count());
    if let Some(stats) = outcome.stats {
        println!("Folders: {}", stats.folders);
    }
    println!("Files: {}", locator.file_count());
    if outcome.is_fallback {
        println!("Serving a cached index; the source is unavailable");
    }
    if let Some(error) = &outcome.error {
        println!("Build error: {}", error);
    }
    println!();
    println!("Cache directory: {}", cache_dir.display());
    println!("Cached versions: {}", locator.cached_versions().join(", "));
    match locator.last_cached_at() {
        Some(at) => println!("Last cached: {}", at.format("%Y-%m-%d %H:%M:%S")),
        None => println!("Last cached: never"),
    }
}

async fn watch(locator: &Arc<ImageLocator>) -> Result<()> {
    print_json_line(&locator.build_index(false).await)?;
    let mut events = locator.subscribe();

    let handle = locator.start_auto_refresh();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => print_json_line(&event)?,
                Err(RecvError::Lagged(skipped)) => debug!(skipped, "event output lagged"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    handle.shutdown().await
}

fn print_json_line(value: &impl Serialize) -> Result<()> {
    println!("{}", serde_json::to_string(value)?);
    Ok(())
}
