//! SQLite backend for the Genkan access ledger.
//!
//! Wraps [`tokio_rusqlite`] so all database access runs on a dedicated
//! thread pool without blocking the async runtime. The conditional-update
//! primitive is a single `UPDATE … WHERE key = ? AND version = ?`; zero
//! affected rows means a concurrent writer won the race.

mod encode;
mod schema;
mod store;

pub use store::SqliteStore;

#[cfg(test)]
mod tests;
