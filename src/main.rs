mod app;
mod blob;
mod cache;
mod commands;
mod config;
mod network;
mod session;
mod summary;
mod sync;
mod table;

use clap::Parser;
use color_eyre::Result;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "eidx")]
#[command(about = "Track Eid expenses in a hosted datasheet, with an offline cache")]
#[command(version)]
struct Args {
  /// Path to config file (default: $XDG_CONFIG_HOME/eidx/config.yaml)
  #[arg(short, long, global = true)]
  config: Option<PathBuf>,

  /// Do not touch the network; serve reads from the cache
  #[arg(long, global = true)]
  offline: bool,

  #[command(subcommand)]
  command: commands::Command,
}

/// Log to `<data_dir>/eidx/eidx.log` so stdout only carries command output.
///
/// Filter with EIDX_LOG (e.g. `EIDX_LOG=debug`); defaults to `info`.
fn init_logging() -> Result<WorkerGuard> {
  let log_dir = cache::SqliteStorage::data_dir()?;
  std::fs::create_dir_all(&log_dir)?;

  let appender = tracing_appender::rolling::never(&log_dir, "eidx.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  let filter = EnvFilter::try_from_env("EIDX_LOG").unwrap_or_else(|_| EnvFilter::new("info"));
  tracing_subscriber::fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .init();

  Ok(guard)
}

#[tokio::main]
async fn main() -> Result<()> {
  color_eyre::install()?;

  let args = Args::parse();
  let _guard = init_logging()?;

  // Load configuration
  let config = config::Config::load(args.config.as_deref())?;

  let app = app::App::new(config, args.offline)?;
  app.run(args.command).await?;

  Ok(())
}
