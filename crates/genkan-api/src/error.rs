//! API error type and [`axum::response::IntoResponse`] implementation.
//!
//! Status mapping: validation failures, identity conflicts, and lost
//! optimistic-concurrency races are client errors (400 — the client retries
//! with fresh state); unknown cards and missing records are 404; only
//! backend faults surface as 500.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use genkan_core::{Error, StoreError};
use serde_json::json;
use thiserror::Error as ThisError;

/// An error returned by an API handler.
#[derive(Debug, ThisError)]
pub enum ApiError {
  /// The card (or the person's record for today) does not exist.
  /// `registered` tells the client whether the card itself is known.
  #[error("not found")]
  NotFound { registered: bool },

  #[error("bad request: {0}")]
  BadRequest(String),

  #[error("store error: {0}")]
  Store(#[source] StoreError),
}

impl ApiError {
  pub fn unknown_card() -> Self { Self::NotFound { registered: false } }

  pub fn no_record_today() -> Self { Self::NotFound { registered: true } }
}

impl From<Error> for ApiError {
  fn from(e: Error) -> Self {
    match e {
      Error::Store(StoreError::VersionConflict { .. }) => {
        Self::BadRequest("conflicting concurrent update; retry".to_owned())
      }
      Error::Store(store) => Self::Store(store),
      Error::NoRecordToday(_)
      | Error::IdentityConflict { .. }
      | Error::InvalidCardId(_)
      | Error::InvalidUserId(_) => Self::BadRequest(e.to_string()),
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    match self {
      ApiError::NotFound { registered } => (
        StatusCode::NOT_FOUND,
        Json(json!({ "message": "Not Found", "exists": registered })),
      )
        .into_response(),
      ApiError::BadRequest(message) => (
        StatusCode::BAD_REQUEST,
        Json(json!({ "message": message })),
      )
        .into_response(),
      ApiError::Store(e) => (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "message": e.to_string() })),
      )
        .into_response(),
    }
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────
