//! [`DailyAccessLedger`] — entry/exit bookkeeping over daily access records.
//!
//! Every operation computes "today" through the injected clock's local
//! calendar, reads the current record, and writes back with a conditional
//! update. Losing a concurrent race yields a version conflict that is
//! surfaced, not retried: under contention the client retries with fresh
//! state, so the stored visit sequence always matches the person's actual
//! real-world order of entries and exits.

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

use crate::{
  access::{CurrentVisit, DailyAccessRecord, Purpose, Visit},
  clock::Clock,
  error::{Error, Result, StoreError},
  id::UserId,
  store::{KeyValueStore, SecondaryIndex},
};

/// Fixed report body when nobody has entered today.
pub const NO_PARTICIPANTS_MESSAGE: &str = "本日の参加者はいません😢";

/// The per-person-per-day access ledger.
#[derive(Debug, Clone)]
pub struct DailyAccessLedger<S, C> {
  store: S,
  clock: C,
}

impl<S, C> DailyAccessLedger<S, C>
where
  S: KeyValueStore<DailyAccessRecord>
    + SecondaryIndex<DailyAccessRecord, IndexKey = NaiveDate>,
  C: Clock,
{
  pub fn new(store: S, clock: C) -> Self { Self { store, clock } }

  async fn find(
    &self,
    user_id: &UserId,
    date: NaiveDate,
  ) -> Result<Option<DailyAccessRecord>, StoreError> {
    let key = (user_id.clone(), date);
    self.store.get(&key).await
  }

  // ── Per-person operations ─────────────────────────────────────────────

  /// The person's current visit state today, or `None` if they have not
  /// entered today.
  pub async fn get_today(
    &self,
    user_id: &UserId,
  ) -> Result<Option<CurrentVisit>> {
    match self.find(user_id, self.clock.today()).await? {
      None => Ok(None),
      Some(record) => Ok(Some(record.current_visit()?)),
    }
  }

  /// Record an entry: create today's record on first entry, otherwise
  /// append an open visit.
  ///
  /// A re-entry while the last visit is still open is permitted and simply
  /// appends another open visit; see the ledger tests for the documented
  /// behaviour.
  pub async fn record_entry(
    &self,
    user_id: &UserId,
    name: &str,
    purpose: Purpose,
  ) -> Result<()> {
    let today = self.clock.today();
    let now = self.clock.now_utc();

    match self.find(user_id, today).await? {
      None => {
        let record = DailyAccessRecord {
          user_id:    user_id.clone(),
          date:       today,
          name:       name.to_owned(),
          records:    vec![Visit::open(now, purpose)],
          created_at: now,
          updated_at: None,
          version:    0,
        };
        Ok(self.store.put(&record).await?)
      }

      Some(mut record) => {
        let expected = record.version;
        record.records.push(Visit::open(now, purpose));
        record.updated_at = Some(now);
        record.version = expected + 1;
        Ok(self.store.conditional_update(&record, expected).await?)
      }
    }
  }

  /// Record an exit: close the last visit of today's record.
  ///
  /// Earlier visits are never touched. A user with no record today cannot
  /// exit; that is a client error, not a fault.
  pub async fn record_exit(&self, user_id: &UserId) -> Result<()> {
    let today = self.clock.today();
    let now = self.clock.now_utc();

    let Some(mut record) = self.find(user_id, today).await? else {
      return Err(Error::NoRecordToday(user_id.clone()));
    };

    let expected = record.version;
    let last = record.records.last_mut().ok_or_else(|| {
      StoreError::Corrupt(format!(
        "access record for user {user_id} on {today} has no visits"
      ))
    })?;
    last.exit_time = Some(now);
    record.updated_at = Some(now);
    record.version = expected + 1;

    Ok(self.store.conditional_update(&record, expected).await?)
  }

  // ── Whole-day operations ──────────────────────────────────────────────

  /// Current visit state of everyone with a record today. No ordering
  /// guarantee across people.
  pub async fn list_today(&self) -> Result<Vec<CurrentVisit>> {
    let today = self.clock.today();
    let records = self.store.query_by_index(&today).await?;

    records
      .iter()
      .map(|record| record.current_visit().map_err(Error::from))
      .collect()
  }

  /// Close every still-open visit for today. Returns the number of records
  /// that could not be closed; 0 means full success.
  ///
  /// Not atomic across records and never retried: each failure (version
  /// conflict or backend error) is logged and skipped.
  pub async fn close_all_open_today(&self) -> usize {
    let today = self.clock.today();
    let now = self.clock.now_utc();

    let records = match self.store.query_by_index(&today).await {
      Ok(records) => records,
      Err(error) => {
        tracing::error!(%error, "failed to query today's access records");
        return 1;
      }
    };

    let mut failures = 0;
    for mut record in records {
      let Some(last) = record.records.last_mut() else {
        tracing::error!(user_id = %record.user_id, "access record has no visits");
        failures += 1;
        continue;
      };
      if !last.is_open() {
        continue;
      }

      last.exit_time = Some(now);
      let expected = record.version;
      record.updated_at = Some(now);
      record.version = expected + 1;

      if let Err(error) =
        self.store.conditional_update(&record, expected).await
      {
        tracing::error!(
          user_id = %record.user_id,
          %error,
          "failed to close open visit"
        );
        failures += 1;
      }
    }

    failures
  }

  /// Render today's participants as an HTML table for the daily mail, one
  /// row per person from their last visit. Open visits render an empty
  /// exit cell; zero participants yields [`NO_PARTICIPANTS_MESSAGE`].
  pub async fn render_daily_report(&self) -> Result<String> {
    let today = self.clock.today();
    let records = self.store.query_by_index(&today).await?;

    if records.is_empty() {
      return Ok(NO_PARTICIPANTS_MESSAGE.to_owned());
    }

    let tz = self.clock.time_zone();
    let mut html = String::from(
      "<table><thead><tr><th>名前</th><th>目的</th>\
       <th>入室時間</th><th>退室時間</th></tr></thead><tbody>",
    );

    for record in &records {
      let last = record.last_visit()?;
      let exit = last
        .exit_time
        .map(|t| format_local(t, tz))
        .unwrap_or_default();
      html.push_str(&format!(
        "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
        record.name,
        last.purpose.display_name(),
        format_local(last.entry_time, tz),
        exit,
      ));
    }

    html.push_str("</tbody></table>");
    Ok(html)
  }
}

/// Format an instant in the report's local-time convention.
fn format_local(t: DateTime<Utc>, tz: Tz) -> String {
  t.with_timezone(&tz).format("%Y/%m/%d %H:%M:%S").to_string()
}
