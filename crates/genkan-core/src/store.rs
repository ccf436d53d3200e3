//! The `KeyValueStore` trait and supporting record traits.
//!
//! The traits are implemented by storage backends (e.g.
//! `genkan-store-sqlite`). The domain components ([`IdentityDirectory`] and
//! [`DailyAccessLedger`]) hold a store by value and depend only on this
//! abstraction, never on a concrete backend.
//!
//! [`IdentityDirectory`]: crate::directory::IdentityDirectory
//! [`DailyAccessLedger`]: crate::ledger::DailyAccessLedger

use std::future::Future;

use crate::error::StoreError;

// ─── Record ──────────────────────────────────────────────────────────────────

/// A versioned item addressable by a primary key.
pub trait Record: Clone + Send + Sync + 'static {
  type Key: Clone + Send + Sync;

  fn key(&self) -> Self::Key;

  /// The optimistic-concurrency counter carried by the record.
  fn version(&self) -> u64;
}

// ─── KeyValueStore ───────────────────────────────────────────────────────────

/// Point-read, point-write, and conditional-update over a durable backend.
///
/// No method panics across this boundary; every failure is a tagged
/// [`StoreError`]. All methods return `Send` futures so the trait can be
/// used from multi-threaded async runtimes.
pub trait KeyValueStore<R: Record>: Send + Sync {
  /// Point read. `None` if no record exists under `key`.
  fn get<'a>(
    &'a self,
    key: &'a R::Key,
  ) -> impl Future<Output = Result<Option<R>, StoreError>> + Send + 'a;

  /// Unconditional insert of a fresh record (version 0).
  fn put<'a>(
    &'a self,
    record: &'a R,
  ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a;

  /// Atomically replace the stored record with `record`, but only if the
  /// stored version still equals `expected_version`.
  ///
  /// `record` carries the post-mutation state — the caller has already
  /// incremented its version by exactly 1. If a concurrent writer got there
  /// first, the store applies nothing and returns
  /// [`StoreError::VersionConflict`]. This conditional check is the
  /// load-bearing primitive of the whole system.
  fn conditional_update<'a>(
    &'a self,
    record: &'a R,
    expected_version: u64,
  ) -> impl Future<Output = Result<(), StoreError>> + Send + 'a;
}

// ─── SecondaryIndex ──────────────────────────────────────────────────────────

/// A store that can also enumerate records by a secondary index key.
pub trait SecondaryIndex<R: Record>: KeyValueStore<R> {
  type IndexKey: Send + Sync;

  /// All records whose index attribute equals `key`. No ordering guarantee.
  fn query_by_index<'a>(
    &'a self,
    key: &'a Self::IndexKey,
  ) -> impl Future<Output = Result<Vec<R>, StoreError>> + Send + 'a;
}
