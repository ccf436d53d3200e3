//! Validated identifier newtypes.
//!
//! A `CardId` is the token printed on a physical entry card; a `UserId` is
//! the natural identifier of the person holding it. Both validate on
//! construction, so every instance held by the rest of the crate is known
//! to be well-formed.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

use crate::error::Error;

// ─── CardId ──────────────────────────────────────────────────────────────────

/// A 16-character ASCII-alphanumeric card token.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CardId(String);

impl CardId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl FromStr for CardId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.len() == 16 && s.chars().all(|c| c.is_ascii_alphanumeric()) {
      Ok(Self(s.to_owned()))
    } else {
      Err(Error::InvalidCardId(s.to_owned()))
    }
  }
}

impl TryFrom<String> for CardId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<CardId> for String {
  fn from(id: CardId) -> Self { id.0 }
}

impl fmt::Display for CardId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── UserId ──────────────────────────────────────────────────────────────────

/// A 10-digit numeric user identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct UserId(String);

impl UserId {
  pub fn as_str(&self) -> &str { &self.0 }
}

impl FromStr for UserId {
  type Err = Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    if s.len() == 10 && s.chars().all(|c| c.is_ascii_digit()) {
      Ok(Self(s.to_owned()))
    } else {
      Err(Error::InvalidUserId(s.to_owned()))
    }
  }
}

impl TryFrom<String> for UserId {
  type Error = Error;

  fn try_from(s: String) -> Result<Self, Self::Error> { s.parse() }
}

impl From<UserId> for String {
  fn from(id: UserId) -> Self { id.0 }
}

impl fmt::Display for UserId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(&self.0)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn card_id_accepts_sixteen_alphanumerics() {
    assert!("aB3dE5fG7hJ9kL1m".parse::<CardId>().is_ok());
  }

  #[test]
  fn card_id_rejects_wrong_length_and_symbols() {
    assert!("short".parse::<CardId>().is_err());
    assert!("aB3dE5fG7hJ9kL1mX".parse::<CardId>().is_err());
    assert!("aB3dE5fG7hJ9kL1-".parse::<CardId>().is_err());
  }

  #[test]
  fn user_id_requires_ten_digits() {
    assert!("0123456789".parse::<UserId>().is_ok());
    assert!("123456789".parse::<UserId>().is_err());
    assert!("12345678901".parse::<UserId>().is_err());
    assert!("12345678ab".parse::<UserId>().is_err());
  }
}
