//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as RFC 3339 UTC strings, dates as `YYYY-MM-DD`,
//! and the visit list as a compact JSON array. Anything that fails to
//! decode surfaces as [`StoreError::Corrupt`] — malformed stored data
//! aborts the request that read it.

use chrono::{DateTime, NaiveDate, Utc};
use genkan_core::{
  StoreError,
  access::{DailyAccessRecord, Visit},
  person::Person,
};

// ─── Scalars ─────────────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String { dt.to_rfc3339() }

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>, StoreError> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| StoreError::Corrupt(format!("bad timestamp {s:?}: {e}")))
}

pub fn encode_date(d: NaiveDate) -> String { d.format("%Y-%m-%d").to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate, StoreError> {
  NaiveDate::parse_from_str(s, "%Y-%m-%d")
    .map_err(|e| StoreError::Corrupt(format!("bad date {s:?}: {e}")))
}

pub fn encode_version(v: u64) -> i64 { v as i64 }

pub fn decode_version(v: i64) -> Result<u64, StoreError> {
  u64::try_from(v)
    .map_err(|_| StoreError::Corrupt(format!("negative version {v}")))
}

// ─── Visits ──────────────────────────────────────────────────────────────────

pub fn encode_visits(visits: &[Visit]) -> Result<String, StoreError> {
  serde_json::to_string(visits)
    .map_err(|e| StoreError::Corrupt(format!("unencodable visits: {e}")))
}

pub fn decode_visits(s: &str) -> Result<Vec<Visit>, StoreError> {
  serde_json::from_str(s)
    .map_err(|e| StoreError::Corrupt(format!("bad visit list {s:?}: {e}")))
}

// ─── Row types ───────────────────────────────────────────────────────────────

/// Raw strings read directly from a `people` row.
pub struct RawPerson {
  pub card_id:    String,
  pub user_id:    String,
  pub name:       String,
  pub status:     bool,
  pub created_at: String,
  pub updated_at: Option<String>,
  pub version:    i64,
}

impl RawPerson {
  pub fn into_person(self) -> Result<Person, StoreError> {
    Ok(Person {
      card_id:    self
        .card_id
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("bad card id: {e}")))?,
      user_id:    self
        .user_id
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("bad user id: {e}")))?,
      name:       self.name,
      status:     self.status,
      created_at: decode_dt(&self.created_at)?,
      updated_at: self.updated_at.as_deref().map(decode_dt).transpose()?,
      version:    decode_version(self.version)?,
    })
  }
}

/// Raw strings read directly from an `accesses` row.
pub struct RawAccess {
  pub user_id:    String,
  pub date:       String,
  pub name:       String,
  pub records:    String,
  pub created_at: String,
  pub updated_at: Option<String>,
  pub version:    i64,
}

impl RawAccess {
  pub fn into_record(self) -> Result<DailyAccessRecord, StoreError> {
    Ok(DailyAccessRecord {
      user_id:    self
        .user_id
        .parse()
        .map_err(|e| StoreError::Corrupt(format!("bad user id: {e}")))?,
      date:       decode_date(&self.date)?,
      name:       self.name,
      records:    decode_visits(&self.records)?,
      created_at: decode_dt(&self.created_at)?,
      updated_at: self.updated_at.as_deref().map(decode_dt).transpose()?,
      version:    decode_version(self.version)?,
    })
  }
}
