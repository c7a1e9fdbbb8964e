//! Runtime surface for lapse.
//!
//! Wires the reconciler to a recurring timer and exposes a small JSON admin
//! API over axum:
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/health` | Liveness |
//! | `GET`  | `/subjects` | Every stored snapshot |
//! | `POST` | `/run` | Run one cycle now; 409 while one is in progress |
//! | `POST` | `/reset` | Forget every known subject; 409 while a cycle runs |

pub mod error;
pub mod handlers;
pub mod scheduler;

pub use error::ApiError;

use std::{num::NonZeroU64, path::PathBuf, sync::Arc, time::Duration};

use axum::{
  Router,
  routing::{get, post},
};
use chrono::Utc;
use lapse_core::{
  sink::EventSink, source::CredentialSource, store::SubjectStore, subject::ThresholdDays,
};
use lapse_engine::{CycleReport, Reconciler, reconcile::DEFAULT_MAX_CONCURRENCY};
use lapse_graph::{EventGridConfig, GraphConfig};
use serde::Deserialize;
use tokio::sync::Mutex;
use tower_http::trace::TraceLayer;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime configuration, deserialised from `config.toml` and `LAPSE_*`
/// environment variables.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
  #[serde(default)]
  pub server:       ListenConfig,
  /// SQLite database path. State is kept in memory when unset.
  pub store_path:   Option<PathBuf>,
  #[serde(default)]
  pub notification: NotificationConfig,
  pub graph:        GraphConfig,
  pub event_grid:   EventGridConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ListenConfig {
  #[serde(default = "default_host")]
  pub host: String,
  #[serde(default = "default_port")]
  pub port: u16,
}

impl Default for ListenConfig {
  fn default() -> Self { Self { host: default_host(), port: default_port() } }
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
  /// Notification window, and re-alert period, in days.
  #[serde(default)]
  pub threshold_days:  ThresholdDays,
  /// Seconds between scheduled cycles.
  #[serde(default = "default_interval_secs")]
  pub interval_secs:   NonZeroU64,
  #[serde(default = "default_max_concurrency")]
  pub max_concurrency: usize,
  /// Run a cycle as soon as the server starts instead of one interval later.
  #[serde(default = "default_run_on_startup")]
  pub run_on_startup:  bool,
}

impl NotificationConfig {
  pub fn interval(&self) -> Duration { Duration::from_secs(self.interval_secs.get()) }

  pub fn settings(&self) -> lapse_engine::Settings {
    lapse_engine::Settings {
      threshold:       self.threshold_days,
      max_concurrency: self.max_concurrency,
    }
  }
}

impl Default for NotificationConfig {
  fn default() -> Self {
    Self {
      threshold_days:  ThresholdDays::default(),
      interval_secs:   default_interval_secs(),
      max_concurrency: default_max_concurrency(),
      run_on_startup:  default_run_on_startup(),
    }
  }
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

/// One day.
const DEFAULT_INTERVAL_SECS: NonZeroU64 = NonZeroU64::new(86_400).unwrap();

fn default_interval_secs() -> NonZeroU64 { DEFAULT_INTERVAL_SECS }

fn default_max_concurrency() -> usize { DEFAULT_MAX_CONCURRENCY }

fn default_run_on_startup() -> bool { true }

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through the handlers and the scheduler.
pub struct AppState<C, S, E> {
  pub reconciler: Arc<Reconciler<C, S, E>>,
  /// Held for the duration of every cycle and every reset.
  pub cycle_lock: Arc<Mutex<()>>,
}

impl<C, S, E> Clone for AppState<C, S, E> {
  fn clone(&self) -> Self {
    Self {
      reconciler: Arc::clone(&self.reconciler),
      cycle_lock: Arc::clone(&self.cycle_lock),
    }
  }
}

impl<C, S, E> AppState<C, S, E>
where
  C: CredentialSource,
  S: SubjectStore,
  E: EventSink,
{
  pub fn new(reconciler: Reconciler<C, S, E>) -> Self {
    Self { reconciler: Arc::new(reconciler), cycle_lock: Arc::new(Mutex::new(())) }
  }

  /// Run one cycle evaluated at the current time, waiting for any cycle in
  /// progress to finish first.
  pub async fn run_cycle(&self) -> lapse_engine::Result<CycleReport> {
    let _guard = self.cycle_lock.lock().await;
    self.reconciler.run_cycle(Utc::now()).await
  }

  /// Run one cycle now, or fail with [`ApiError::Busy`] if one is already in
  /// progress.
  pub async fn try_run_cycle(&self) -> Result<CycleReport, ApiError> {
    let _guard = self.cycle_lock.try_lock().map_err(|_| ApiError::Busy)?;
    Ok(self.reconciler.run_cycle(Utc::now()).await?)
  }

  /// Forget every known subject, unless a cycle is in progress.
  pub async fn try_reset(&self) -> Result<usize, ApiError> {
    let _guard = self.cycle_lock.try_lock().map_err(|_| ApiError::Busy)?;
    Ok(lapse_engine::reset(self.reconciler.store().as_ref()).await?)
  }
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the admin [`Router`].
pub fn router<C, S, E>(state: AppState<C, S, E>) -> Router
where
  C: CredentialSource + 'static,
  S: SubjectStore + 'static,
  E: EventSink + 'static,
{
  Router::new()
    .route("/health", get(handlers::health::handler))
    .route("/subjects", get(handlers::subjects::list::<C, S, E>))
    .route("/run", post(handlers::cycle::run::<C, S, E>))
    .route("/reset", post(handlers::cycle::reset::<C, S, E>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}
