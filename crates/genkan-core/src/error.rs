//! Error types for `genkan-core`.
//!
//! Expected conditions (a missing record, a lost optimistic-concurrency
//! race, an identity mismatch) are result variants, never panics. Version
//! conflicts are kept distinct from generic backend failures so callers can
//! decide whether a retry makes sense.

use thiserror::Error;

use crate::id::{CardId, UserId};

// ─── Store errors ────────────────────────────────────────────────────────────

/// A failure reported by a [`KeyValueStore`](crate::store::KeyValueStore)
/// backend.
#[derive(Debug, Error)]
pub enum StoreError {
  /// A conditional update observed a stored version different from the one
  /// the caller read. Exactly one of two concurrent writers receives this;
  /// the store performs no write for the loser.
  #[error("version conflict: stored version no longer equals {expected}")]
  VersionConflict { expected: u64 },

  /// The backend was unreachable or rejected the request.
  #[error("backend error: {0}")]
  Backend(#[source] Box<dyn std::error::Error + Send + Sync>),

  /// Stored data that violates a structural invariant (e.g. a daily record
  /// with an empty visit list). Aborts the current request.
  #[error("corrupt record: {0}")]
  Corrupt(String),
}

impl StoreError {
  /// Wrap an arbitrary backend error.
  pub fn backend(e: impl std::error::Error + Send + Sync + 'static) -> Self {
    Self::Backend(Box::new(e))
  }

  pub fn is_version_conflict(&self) -> bool {
    matches!(self, Self::VersionConflict { .. })
  }
}

// ─── Domain errors ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum Error {
  #[error(transparent)]
  Store(#[from] StoreError),

  /// An exit was requested for a user with no access record today.
  #[error("no access record today for user {0}")]
  NoRecordToday(UserId),

  /// A save supplied a `user_id` that disagrees with the one already bound
  /// to the card. No write is performed.
  #[error("card {card_id} is already bound to user {stored}")]
  IdentityConflict { card_id: CardId, stored: UserId },

  #[error("invalid card id: {0:?}")]
  InvalidCardId(String),

  #[error("invalid user id: {0:?}")]
  InvalidUserId(String),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
