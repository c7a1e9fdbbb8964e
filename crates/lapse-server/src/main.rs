//! lapse server binary.
//!
//! Reads `config.toml` (or the path given with `--config`) layered under
//! `LAPSE_*` environment variables, opens the subject store, and runs the
//! reconciliation timer next to the admin API.
//!
//! Nested keys use `__` in the environment, e.g. `LAPSE_GRAPH__CLIENT_SECRET`
//! or `LAPSE_NOTIFICATION__THRESHOLD_DAYS`.

use std::{
  path::{Path, PathBuf},
  sync::Arc,
};

use anyhow::Context as _;
use chrono::Utc;
use clap::Parser;
use lapse_core::{memory::MemoryStore, store::SubjectStore};
use lapse_engine::{Notifier, Reconciler};
use lapse_graph::{EventGridSink, GraphSource};
use lapse_server::{AppState, ServerConfig, scheduler};
use lapse_store_sqlite::SqliteStore;
use tokio::net::TcpListener;
use tracing::level_filters::LevelFilter;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Notifies about expiring application credentials")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "config.toml")]
  config: PathBuf,

  /// Run a single reconciliation cycle, print its report, and exit.
  #[arg(long, conflicts_with = "reset")]
  once: bool,

  /// Forget every known subject and exit.
  #[arg(long)]
  reset: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();

  let settings = config::Config::builder()
    .add_source(config::File::from(cli.config.as_path()).required(false))
    .add_source(
      config::Environment::with_prefix("LAPSE")
        .prefix_separator("_")
        .separator("__")
        .try_parsing(true),
    )
    .build()
    .context("failed to read configuration")?;

  let server_cfg: ServerConfig = settings
    .try_deserialize()
    .context("failed to deserialise ServerConfig")?;

  match server_cfg.store_path.as_deref().map(expand_tilde) {
    Some(path) => {
      let store = SqliteStore::open(&path)
        .await
        .with_context(|| format!("failed to open store at {path:?}"))?;
      run(cli, server_cfg, store).await
    }
    None => {
      tracing::warn!("no store_path configured, subject state will not survive a restart");
      run(cli, server_cfg, MemoryStore::new()).await
    }
  }
}

async fn run<S>(cli: Cli, cfg: ServerConfig, store: S) -> anyhow::Result<()>
where
  S: SubjectStore + 'static,
{
  if cli.reset {
    let cleared = lapse_engine::reset(&store).await.context("reset failed")?;
    println!("cleared {cleared} subjects");
    return Ok(());
  }

  let client = lapse_graph::http_client().context("failed to build HTTP client")?;
  let source = GraphSource::from_config(client.clone(), &cfg.graph);
  let sink = EventGridSink::from_config(client, &cfg.event_grid);
  let notifier = Notifier::new(Arc::new(sink), cfg.graph.tenant_id.clone());
  let reconciler = Reconciler::new(
    Arc::new(source),
    Arc::new(store),
    notifier,
    cfg.notification.settings(),
  );

  if cli.once {
    let report = reconciler
      .run_cycle(Utc::now())
      .await
      .context("reconciliation cycle failed")?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    return Ok(());
  }

  let state = AppState::new(reconciler);
  let timer = tokio::spawn(scheduler::run(
    state.clone(),
    cfg.notification.interval(),
    cfg.notification.run_on_startup,
  ));

  let app = lapse_server::router(state);
  let address = format!("{}:{}", cfg.server.host, cfg.server.port);

  tracing::info!("Listening on http://{address}");
  let listener = TcpListener::bind(&address)
    .await
    .with_context(|| format!("failed to bind {address}"))?;

  axum::serve(listener, app)
    .with_graceful_shutdown(shutdown_signal())
    .await
    .context("server error")?;

  timer.abort();
  tracing::info!("shut down");
  Ok(())
}

async fn shutdown_signal() {
  if let Err(e) = tokio::signal::ctrl_c().await {
    tracing::error!(error = %e, "failed to listen for ctrl-c");
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}
