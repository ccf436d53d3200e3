//! Person — the identity record bound to a physical entry card.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  id::{CardId, UserId},
  store::Record,
};

/// The identity record for one card.
///
/// `card_id` is the immutable primary key. `user_id` is expected to stay
/// stable for the life of the card; only `name` (and the bookkeeping fields)
/// change on subsequent saves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
  pub card_id:    CardId,
  pub user_id:    UserId,
  pub name:       String,
  /// Active flag; set on creation, never cleared by core logic.
  pub status:     bool,
  pub created_at: DateTime<Utc>,
  pub updated_at: Option<DateTime<Utc>>,
  /// Monotonic optimistic-concurrency counter, starting at 0.
  pub version:    u64,
}

impl Record for Person {
  type Key = CardId;

  fn key(&self) -> CardId { self.card_id.clone() }

  fn version(&self) -> u64 { self.version }
}
