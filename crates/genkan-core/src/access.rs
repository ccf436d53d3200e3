//! Daily access records — the per-person-per-day aggregate of visits.
//!
//! A visit is one entry/exit pair (or an open entry). The visit list is
//! append-only: once a visit has a successor, it is never touched again.
//! Only the last element may be mutated, and only to set its exit time.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::{
  error::StoreError,
  id::UserId,
  store::Record,
};

// ─── Purpose ─────────────────────────────────────────────────────────────────

/// Why the person entered the space.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Purpose {
  MeetUp,
  Study,
  Work,
  Circle,
}

impl Purpose {
  /// Display string used in the daily report.
  pub fn display_name(self) -> &'static str {
    match self {
      Self::Study => "自習",
      Self::MeetUp => "勉強会",
      Self::Circle => "サークル",
      Self::Work => "仕事",
    }
  }
}

// ─── Visit ───────────────────────────────────────────────────────────────────

/// One entry into the space, possibly still open.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Visit {
  pub entry_time: DateTime<Utc>,
  pub purpose:    Purpose,
  /// Absent while the person is still present.
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exit_time:  Option<DateTime<Utc>>,
}

impl Visit {
  pub fn open(entry_time: DateTime<Utc>, purpose: Purpose) -> Self {
    Self { entry_time, purpose, exit_time: None }
  }

  pub fn is_open(&self) -> bool { self.exit_time.is_none() }
}

// ─── DailyAccessRecord ───────────────────────────────────────────────────────

/// All visits of one person on one calendar day.
///
/// `date` is a calendar day in the deployment's configured time zone — a
/// "day" boundary is a local-time concept for this domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAccessRecord {
  pub user_id:    UserId,
  pub date:       NaiveDate,
  /// Denormalised copy of the person's name at entry time.
  pub name:       String,
  /// Append-only; insertion order is chronological order. Non-empty for
  /// every stored record.
  pub records:    Vec<Visit>,
  pub created_at: DateTime<Utc>,
  pub updated_at: Option<DateTime<Utc>>,
  /// Monotonic optimistic-concurrency counter, starting at 0.
  pub version:    u64,
}

impl DailyAccessRecord {
  /// The most recent visit. An empty visit list cannot be produced by core
  /// logic, so finding one means the stored data is malformed.
  pub fn last_visit(&self) -> Result<&Visit, StoreError> {
    self.records.last().ok_or_else(|| {
      StoreError::Corrupt(format!(
        "access record for user {} on {} has no visits",
        self.user_id, self.date
      ))
    })
  }

  /// Derive the [`CurrentVisit`] read model from the last visit.
  pub fn current_visit(&self) -> Result<CurrentVisit, StoreError> {
    let last = self.last_visit()?;
    Ok(CurrentVisit {
      user_id:    self.user_id.clone(),
      name:       self.name.clone(),
      purpose:    last.purpose,
      is_entry:   last.is_open(),
      entry_time: last.entry_time,
      exit_time:  last.exit_time,
    })
  }
}

impl Record for DailyAccessRecord {
  type Key = (UserId, NaiveDate);

  fn key(&self) -> (UserId, NaiveDate) { (self.user_id.clone(), self.date) }

  fn version(&self) -> u64 { self.version }
}

// ─── CurrentVisit ────────────────────────────────────────────────────────────

/// The derived present/absent state of a person today — never stored,
/// always computed from the last visit of the daily record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CurrentVisit {
  pub user_id:    UserId,
  pub name:       String,
  pub purpose:    Purpose,
  /// `true` while the last visit has no exit time (the person is present).
  pub is_entry:   bool,
  pub entry_time: DateTime<Utc>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub exit_time:  Option<DateTime<Utc>>,
}

// ─── Tests ───────────────────────────────────────────────────────────────────
