//! Core types and trait definitions for the Genkan access ledger.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod access;
pub mod clock;
pub mod directory;
pub mod error;
pub mod id;
pub mod ledger;
pub mod person;
pub mod store;

pub use error::{Error, Result, StoreError};
