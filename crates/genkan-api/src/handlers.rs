//! Request handlers.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `PUT`  | `/user` | Body: `{"cardId","userId","name"}` — create or rename |
//! | `GET`  | `/user/:card_id` | Today's visit state for the card holder |
//! | `PUT`  | `/user/:card_id/entry` | Body: `{"purpose":"STUDY"}` etc. |
//! | `PUT`  | `/user/:card_id/exit` | Close the holder's last open visit |
//! | `GET`  | `/users` | Everyone with a record today |
//! | `POST` | `/admin/close-all` | Scheduled: close every open visit |
//! | `GET`  | `/admin/report` | Scheduled: render the daily mail body |

use axum::{
  Json,
  extract::{Path, State},
  http::StatusCode,
  response::IntoResponse,
};
use genkan_core::{
  access::{CurrentVisit, Purpose},
  clock::Clock,
  id::{CardId, UserId},
  person::Person,
};
use serde::Deserialize;
use serde_json::json;

use crate::{ApiError, AppState, LedgerStore};

fn parse_card_id(raw: &str) -> Result<CardId, ApiError> {
  raw.parse().map_err(ApiError::from)
}

/// Resolve the path card id to a registered person, 404 if unknown.
async fn resolve_person<S, C>(
  state: &AppState<S, C>,
  raw_card_id: &str,
) -> Result<Person, ApiError>
where
  S: LedgerStore,
  C: Clock + Clone + 'static,
{
  let card_id = parse_card_id(raw_card_id)?;
  state
    .directory
    .find_by_card_id(&card_id)
    .await?
    .ok_or_else(ApiError::unknown_card)
}

// ─── People ──────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveBody {
  pub card_id: CardId,
  pub user_id: UserId,
  pub name:    String,
}

/// `PUT /user`
pub async fn put_user<S, C>(
  State(state): State<AppState<S, C>>,
  Json(body): Json<SaveBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
  C: Clock + Clone + 'static,
{
  state
    .directory
    .save(&body.card_id, &body.user_id, &body.name)
    .await?;
  Ok((StatusCode::CREATED, Json(json!({ "message": "Created" }))))
}

/// `GET /user/:card_id`
pub async fn get_user_status<S, C>(
  State(state): State<AppState<S, C>>,
  Path(card_id): Path<String>,
) -> Result<Json<CurrentVisit>, ApiError>
where
  S: LedgerStore,
  C: Clock + Clone + 'static,
{
  let person = resolve_person(&state, &card_id).await?;
  let visit = state
    .ledger
    .get_today(&person.user_id)
    .await?
    .ok_or_else(ApiError::no_record_today)?;
  Ok(Json(visit))
}

// ─── Entry / exit ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct EntryBody {
  pub purpose: Purpose,
}

/// `PUT /user/:card_id/entry`
pub async fn put_user_entry<S, C>(
  State(state): State<AppState<S, C>>,
  Path(card_id): Path<String>,
  Json(body): Json<EntryBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
  C: Clock + Clone + 'static,
{
  let person = resolve_person(&state, &card_id).await?;
  state
    .ledger
    .record_entry(&person.user_id, &person.name, body.purpose)
    .await?;
  Ok(Json(json!({ "message": "OK" })))
}

/// `PUT /user/:card_id/exit`
pub async fn put_user_exit<S, C>(
  State(state): State<AppState<S, C>>,
  Path(card_id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
  S: LedgerStore,
  C: Clock + Clone + 'static,
{
  let person = resolve_person(&state, &card_id).await?;
  state.ledger.record_exit(&person.user_id).await?;
  Ok(Json(json!({ "message": "OK" })))
}

// ─── Whole-day views ─────────────────────────────────────────────────────────

/// `GET /users`
pub async fn get_users<S, C>(
  State(state): State<AppState<S, C>>,
) -> Result<Json<Vec<CurrentVisit>>, ApiError>
where
  S: LedgerStore,
  C: Clock + Clone + 'static,
{
  Ok(Json(state.ledger.list_today().await?))
}

// ─── Scheduled operations ────────────────────────────────────────────────────

/// `POST /admin/close-all` — best-effort; partial failure is reported as a
/// count, not rolled back.
pub async fn close_all<S, C>(
  State(state): State<AppState<S, C>>,
) -> Json<serde_json::Value>
where
  S: LedgerStore,
  C: Clock + Clone + 'static,
{
  let failures = state.ledger.close_all_open_today().await;
  Json(json!({ "failures": failures }))
}

/// `GET /admin/report`
pub async fn daily_report<S, C>(
  State(state): State<AppState<S, C>>,
) -> Result<Json<serde_json::Value>, ApiError>
where
  S: LedgerStore,
  C: Clock + Clone + 'static,
{
  let message = state.ledger.render_daily_report().await?;
  Ok(Json(json!({ "message": message })))
}
