//! JSON REST API for the Genkan access ledger.
//!
//! Exposes an axum [`Router`] backed by any store implementing the core
//! traits. This layer owns request validation and the result-to-status
//! mapping; everything stateful lives in `genkan-core`. Auth, TLS, and the
//! scheduler that drives the `/admin` endpoints are the caller's
//! responsibility.

pub mod error;
pub mod handlers;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post, put},
};
use chrono::NaiveDate;
use chrono_tz::Tz;
use genkan_core::{
  access::DailyAccessRecord,
  clock::Clock,
  directory::IdentityDirectory,
  ledger::DailyAccessLedger,
  person::Person,
  store::{KeyValueStore, SecondaryIndex},
};
use serde::Deserialize;

pub use error::ApiError;

// ─── Store bound ─────────────────────────────────────────────────────────────

/// The full set of store capabilities the API needs, as one bound.
pub trait LedgerStore:
  KeyValueStore<Person>
  + KeyValueStore<DailyAccessRecord>
  + SecondaryIndex<DailyAccessRecord, IndexKey = NaiveDate>
  + Clone
  + Send
  + Sync
  + 'static
{
}

impl<T> LedgerStore for T where
  T: KeyValueStore<Person>
    + KeyValueStore<DailyAccessRecord>
    + SecondaryIndex<DailyAccessRecord, IndexKey = NaiveDate>
    + Clone
    + Send
    + Sync
    + 'static
{
}

// ─── Application state ───────────────────────────────────────────────────────

/// Shared handler state: the two domain components over one store.
pub struct AppState<S, C> {
  pub directory: Arc<IdentityDirectory<S, C>>,
  pub ledger:    Arc<DailyAccessLedger<S, C>>,
}

impl<S, C> AppState<S, C>
where
  S: LedgerStore,
  C: Clock + Clone + 'static,
{
  pub fn new(store: S, clock: C) -> Self {
    Self {
      directory: Arc::new(IdentityDirectory::new(
        store.clone(),
        clock.clone(),
      )),
      ledger:    Arc::new(DailyAccessLedger::new(store, clock)),
    }
  }
}

impl<S, C> Clone for AppState<S, C> {
  fn clone(&self) -> Self {
    Self {
      directory: Arc::clone(&self.directory),
      ledger:    Arc::clone(&self.ledger),
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
///
/// The `/admin` routes are the scheduled operations (nightly close-all and
/// the daily report); they take no parameters and are meant to be invoked
/// by an external time-based trigger.
pub fn api_router<S, C>(state: AppState<S, C>) -> Router<()>
where
  S: LedgerStore,
  C: Clock + Clone + 'static,
{
  Router::new()
    .route("/user", put(handlers::put_user::<S, C>))
    .route("/user/{card_id}", get(handlers::get_user_status::<S, C>))
    .route("/user/{card_id}/entry", put(handlers::put_user_entry::<S, C>))
    .route("/user/{card_id}/exit", put(handlers::put_user_exit::<S, C>))
    .route("/users", get(handlers::get_users::<S, C>))
    .route("/admin/close-all", post(handlers::close_all::<S, C>))
    .route("/admin/report", get(handlers::daily_report::<S, C>))
    .with_state(state)
}

// ─── Configuration ───────────────────────────────────────────────────────────

/// Server configuration, read from `config.toml` and `GENKAN_*` environment
/// variables.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host: String,

  #[serde(default = "default_port")]
  pub port: u16,

  /// Path of the SQLite database file.
  pub store_path: PathBuf,

  /// IANA name of the local calendar used for day boundaries. The original
  /// deployment pinned Asia/Tokyo; it is a configuration value here.
  #[serde(default = "default_time_zone")]
  pub time_zone: Tz,
}

fn default_host() -> String { "127.0.0.1".to_owned() }

fn default_port() -> u16 { 8080 }

fn default_time_zone() -> Tz { chrono_tz::Asia::Tokyo }
