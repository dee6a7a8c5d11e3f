//! JSON REST API for the PSUR schedule.
//!
//! Exposes an axum [`Router`] backed by any
//! [`psur_core::store::ScheduleStore`]. Field maps arriving here are
//! validated into typed patches before the store sees them. Auth and TLS are
//! the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", psur_api::router(state))
//! ```

pub mod error;
pub mod records;
pub mod rollover;
pub mod search;
pub mod stats;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use chrono::{NaiveDate, Utc};
use psur_core::{cycle::RolloverPolicy, identifier::IdentifierFormat, store::ScheduleStore};
use serde::Deserialize;
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml` and
/// `PSUR_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Layout of generated tracking numbers.
  pub identifier: IdentifierFormat,
  /// Cycle rules and deadlines used by rollover and audit.
  pub rollover:   RolloverPolicy,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_owned(),
      port:       8080,
      store_path: PathBuf::from("psur_schedule.db"),
      identifier: IdentifierFormat::default(),
      rollover:   RolloverPolicy::default(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: ScheduleStore> {
  pub store:       Arc<S>,
  pub policy:      Arc<RolloverPolicy>,
  pub identifiers: Arc<IdentifierFormat>,
}

impl<S: ScheduleStore> AppState<S> {
  pub fn new(store: S, config: &ServerConfig) -> Self {
    Self {
      store:       Arc::new(store),
      policy:      Arc::new(config.rollover.clone()),
      identifiers: Arc::new(config.identifier.clone()),
    }
  }
}

/// The calendar date date-relative criteria are evaluated against.
pub(crate) fn today() -> NaiveDate { Utc::now().date_naive() }

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: ScheduleStore + Clone + 'static,
{
  Router::new()
    // Records
    .route("/records", get(records::list::<S>).post(records::create::<S>))
    .route("/records/bulk-update", post(records::bulk_update::<S>))
    .route(
      "/records/{tn}",
      get(records::get_one::<S>)
        .patch(records::update::<S>)
        .delete(records::delete::<S>),
    )
    .route("/records/{tn}/all", get(records::get_all::<S>))
    .route("/records/{tn}/notes", post(records::append_note::<S>))
    .route("/records/{tn}/links", post(records::attach_links::<S>))
    .route("/reports/{rn}", get(records::by_report_number::<S>))
    // Lifecycle
    .route("/records/{tn}/rollover", post(rollover::rollover_one::<S>))
    .route("/records/{tn}/clone", post(rollover::clone_one::<S>))
    .route("/records/{tn}/audit", get(rollover::audit_one::<S>))
    // Queries
    .route("/search", get(search::search::<S>))
    .route("/filter", get(search::filter::<S>))
    .route("/missing", get(search::missing::<S>))
    .route("/normalize", get(search::normalize::<S>))
    .route("/stats", get(stats::handler::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────
