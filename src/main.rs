use babyfood_sync::{CacheResult, Config, RecipeSync};
use clap::{Parser, Subcommand};
use color_eyre::{eyre::eyre, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "bfsync")]
#[command(about = "Offline-first reader for the baby food recipe dataset")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/bfsync/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Print the dataset manifest
  Manifest {
    /// Skip the local cache and fetch from the origin
    #[arg(short, long)]
    force: bool,
  },
  /// Print the recipe index
  Index {
    #[arg(short, long)]
    force: bool,
  },
  /// Print a single recipe
  Recipe {
    id: String,
    #[arg(short, long)]
    force: bool,
    /// Dataset version scoping the cache slot (default: manifest version)
    #[arg(long = "data-version")]
    data_version: Option<String>,
  },
  /// Check whether the origin published a new dataset version
  CheckUpdate,
  /// Evict cached recipes (or everything with --all); favorites are kept
  ClearCache {
    #[arg(long)]
    all: bool,
  },
}

fn init_logging(log_dir: Option<&Path>) -> Result<Option<WorkerGuard>> {
  let filter =
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("babyfood_sync=info"));

  let stderr_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);

  match log_dir {
    Some(dir) => {
      let appender = tracing_appender::rolling::daily(dir, "bfsync.log");
      let (writer, guard) = tracing_appender::non_blocking(appender);
      tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(
          tracing_subscriber::fmt::layer()
            .with_ansi(false)
            .with_writer(writer),
        )
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(Some(guard))
    }
    None => {
      tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;
      Ok(None)
    }
  }
}

/// Print a resolved document, or fail when every tier came up empty.
fn print_resolved<T: Serialize>(what: &str, result: Option<CacheResult<T>>) -> Result<()> {
  let result = result.ok_or_else(|| eyre!("{} unavailable (offline with no cached copy)", what))?;
  eprintln!("{} from {}", what, result.source);
  println!("{}", serde_json::to_string_pretty(&result.data)?);
  Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();

  // Load configuration
  let config = Config::load(args.config.as_deref())?;
  let _log_guard = init_logging(config.log.file.as_deref())?;

  let sync = RecipeSync::from_config(&config)?;

  match args.command {
    Command::Manifest { force } => print_resolved("manifest", sync.fetch_manifest(force).await)?,
    Command::Index { force } => print_resolved("index", sync.fetch_index(force).await)?,
    Command::Recipe {
      id,
      force,
      data_version,
    } => print_resolved(
      &format!("recipe {}", id),
      sync
        .fetch_recipe(&id, force, data_version.as_deref())
        .await,
    )?,
    Command::CheckUpdate => {
      let status = sync.check_for_update().await;
      let current = status
        .manifest
        .as_ref()
        .map(|m| m.version.as_str())
        .unwrap_or("<unavailable>");
      if status.updated {
        println!(
          "update available: {} -> {}",
          status.previous_version.as_deref().unwrap_or("<none>"),
          current
        );
      } else {
        println!("up to date: {}", current);
      }
    }
    Command::ClearCache { all } => {
      let cleared = if all {
        sync.clear_all_cache()
      } else {
        sync.clear_recipe_cache()
      };
      if !cleared {
        return Err(eyre!("Failed to clear cache"));
      }
      println!("cache cleared");
    }
  }

  Ok(())
}
