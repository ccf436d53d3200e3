//! [`SqliteStore`] — the SQLite implementation of the store traits.

use std::path::Path;

use chrono::NaiveDate;
use genkan_core::{
  StoreError,
  access::DailyAccessRecord,
  id::{CardId, UserId},
  person::Person,
  store::{KeyValueStore, SecondaryIndex},
};
use rusqlite::OptionalExtension as _;

use crate::{
  encode::{
    RawAccess, RawPerson, encode_date, encode_dt, encode_version,
    encode_visits,
  },
  schema::SCHEMA,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A Genkan store backed by a single SQLite file.
///
/// Cloning is cheap — the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
    let conn = tokio_rusqlite::Connection::open(path)
      .await
      .map_err(StoreError::backend)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store — useful for testing.
  pub async fn open_in_memory() -> Result<Self, StoreError> {
    let conn = tokio_rusqlite::Connection::open_in_memory()
      .await
      .map_err(StoreError::backend)?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<(), StoreError> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await
      .map_err(StoreError::backend)
  }
}

// ─── People ──────────────────────────────────────────────────────────────────

impl KeyValueStore<Person> for SqliteStore {
  async fn get(&self, key: &CardId) -> Result<Option<Person>, StoreError> {
    let card_id = key.to_string();

    let raw: Option<RawPerson> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT card_id, user_id, name, status, created_at, updated_at, version
               FROM people WHERE card_id = ?1",
              rusqlite::params![card_id],
              |row| {
                Ok(RawPerson {
                  card_id:    row.get(0)?,
                  user_id:    row.get(1)?,
                  name:       row.get(2)?,
                  status:     row.get(3)?,
                  created_at: row.get(4)?,
                  updated_at: row.get(5)?,
                  version:    row.get(6)?,
                })
              },
            )
            .optional()?,
        )
      })
      .await
      .map_err(StoreError::backend)?;

    raw.map(RawPerson::into_person).transpose()
  }

  async fn put(&self, record: &Person) -> Result<(), StoreError> {
    let card_id    = record.card_id.to_string();
    let user_id    = record.user_id.to_string();
    let name       = record.name.clone();
    let status     = record.status;
    let created_at = encode_dt(record.created_at);
    let updated_at = record.updated_at.map(encode_dt);
    let version    = encode_version(record.version);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO people
             (card_id, user_id, name, status, created_at, updated_at, version)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            card_id, user_id, name, status, created_at, updated_at, version,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(StoreError::backend)
  }

  async fn conditional_update(
    &self,
    record: &Person,
    expected_version: u64,
  ) -> Result<(), StoreError> {
    let card_id    = record.card_id.to_string();
    let user_id    = record.user_id.to_string();
    let name       = record.name.clone();
    let status     = record.status;
    let created_at = encode_dt(record.created_at);
    let updated_at = record.updated_at.map(encode_dt);
    let version    = encode_version(record.version);
    let expected   = encode_version(expected_version);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE people
           SET user_id = ?2, name = ?3, status = ?4, created_at = ?5,
               updated_at = ?6, version = ?7
           WHERE card_id = ?1 AND version = ?8",
          rusqlite::params![
            card_id, user_id, name, status, created_at, updated_at, version,
            expected,
          ],
        )?)
      })
      .await
      .map_err(StoreError::backend)?;

    if changed == 0 {
      return Err(StoreError::VersionConflict { expected: expected_version });
    }
    Ok(())
  }
}

// ─── Daily access records ────────────────────────────────────────────────────

fn access_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<RawAccess> {
  Ok(RawAccess {
    user_id:    row.get(0)?,
    date:       row.get(1)?,
    name:       row.get(2)?,
    records:    row.get(3)?,
    created_at: row.get(4)?,
    updated_at: row.get(5)?,
    version:    row.get(6)?,
  })
}

impl KeyValueStore<DailyAccessRecord> for SqliteStore {
  async fn get(
    &self,
    key: &(UserId, NaiveDate),
  ) -> Result<Option<DailyAccessRecord>, StoreError> {
    let user_id = key.0.to_string();
    let date = encode_date(key.1);

    let raw: Option<RawAccess> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT user_id, date, name, records, created_at, updated_at, version
               FROM accesses WHERE user_id = ?1 AND date = ?2",
              rusqlite::params![user_id, date],
              access_row,
            )
            .optional()?,
        )
      })
      .await
      .map_err(StoreError::backend)?;

    raw.map(RawAccess::into_record).transpose()
  }

  async fn put(&self, record: &DailyAccessRecord) -> Result<(), StoreError> {
    let user_id    = record.user_id.to_string();
    let date       = encode_date(record.date);
    let name       = record.name.clone();
    let records    = encode_visits(&record.records)?;
    let created_at = encode_dt(record.created_at);
    let updated_at = record.updated_at.map(encode_dt);
    let version    = encode_version(record.version);

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT OR REPLACE INTO accesses
             (user_id, date, name, records, created_at, updated_at, version)
           VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
          rusqlite::params![
            user_id, date, name, records, created_at, updated_at, version,
          ],
        )?;
        Ok(())
      })
      .await
      .map_err(StoreError::backend)
  }

  async fn conditional_update(
    &self,
    record: &DailyAccessRecord,
    expected_version: u64,
  ) -> Result<(), StoreError> {
    let user_id    = record.user_id.to_string();
    let date       = encode_date(record.date);
    let name       = record.name.clone();
    let records    = encode_visits(&record.records)?;
    let created_at = encode_dt(record.created_at);
    let updated_at = record.updated_at.map(encode_dt);
    let version    = encode_version(record.version);
    let expected   = encode_version(expected_version);

    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE accesses
           SET name = ?3, records = ?4, created_at = ?5, updated_at = ?6,
               version = ?7
           WHERE user_id = ?1 AND date = ?2 AND version = ?8",
          rusqlite::params![
            user_id, date, name, records, created_at, updated_at, version,
            expected,
          ],
        )?)
      })
      .await
      .map_err(StoreError::backend)?;

    if changed == 0 {
      return Err(StoreError::VersionConflict { expected: expected_version });
    }
    Ok(())
  }
}

impl SecondaryIndex<DailyAccessRecord> for SqliteStore {
  type IndexKey = NaiveDate;

  async fn query_by_index(
    &self,
    key: &NaiveDate,
  ) -> Result<Vec<DailyAccessRecord>, StoreError> {
    let date = encode_date(*key);

    let raws: Vec<RawAccess> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(
          "SELECT user_id, date, name, records, created_at, updated_at, version
           FROM accesses WHERE date = ?1",
        )?;
        let rows = stmt
          .query_map(rusqlite::params![date], access_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await
      .map_err(StoreError::backend)?;

    raws.into_iter().map(RawAccess::into_record).collect()
  }
}
