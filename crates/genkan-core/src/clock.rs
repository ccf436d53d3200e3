//! Injected clock and time-zone provider.
//!
//! The ledger keys its records by calendar day in the deployment's local
//! time zone. That day-boundary computation must be deterministic and
//! testable, so "now" and the zone are an explicit capability rather than
//! an ambient process default.

use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use chrono_tz::Tz;

/// Source of the current instant and of the local calendar convention.
pub trait Clock: Send + Sync {
  fn now_utc(&self) -> DateTime<Utc>;

  fn time_zone(&self) -> Tz;

  /// Today's calendar date in the configured zone.
  fn today(&self) -> NaiveDate {
    self.now_utc().with_timezone(&self.time_zone()).date_naive()
  }
}

// ─── SystemClock ─────────────────────────────────────────────────────────────

/// Wall-clock time in a configured time zone.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
  tz: Tz,
}

impl SystemClock {
  pub fn new(tz: Tz) -> Self { Self { tz } }
}

impl Clock for SystemClock {
  fn now_utc(&self) -> DateTime<Utc> { Utc::now() }

  fn time_zone(&self) -> Tz { self.tz }
}

// ─── FixedClock ──────────────────────────────────────────────────────────────

/// A clock pinned to a settable instant, for tests.
#[derive(Debug)]
pub struct FixedClock {
  instant: Mutex<DateTime<Utc>>,
  tz:      Tz,
}

impl FixedClock {
  pub fn new(instant: DateTime<Utc>, tz: Tz) -> Self {
    Self { instant: Mutex::new(instant), tz }
  }

  /// Move the clock to a new instant.
  pub fn set(&self, instant: DateTime<Utc>) {
    *self.instant.lock().unwrap() = instant;
  }
}

impl Clock for FixedClock {
  fn now_utc(&self) -> DateTime<Utc> { *self.instant.lock().unwrap() }

  fn time_zone(&self) -> Tz { self.tz }
}

impl<C: Clock> Clock for std::sync::Arc<C> {
  fn now_utc(&self) -> DateTime<Utc> { (**self).now_utc() }

  fn time_zone(&self) -> Tz { (**self).time_zone() }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use chrono::TimeZone as _;

  use super::*;

  #[test]
  fn day_boundary_follows_the_configured_zone() {
    // 17:00 UTC on June 1st is already June 2nd in Tokyo (UTC+9).
    let instant = Utc.with_ymd_and_hms(2024, 6, 1, 17, 0, 0).unwrap();

    let tokyo = FixedClock::new(instant, chrono_tz::Asia::Tokyo);
    assert_eq!(tokyo.today(), NaiveDate::from_ymd_opt(2024, 6, 2).unwrap());

    let utc = FixedClock::new(instant, chrono_tz::UTC);
    assert_eq!(utc.today(), NaiveDate::from_ymd_opt(2024, 6, 1).unwrap());
  }

  #[test]
  fn fixed_clock_advances_when_set() {
    let t0 = Utc.with_ymd_and_hms(2024, 6, 1, 10, 0, 0).unwrap();
    let t1 = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

    let clock = FixedClock::new(t0, chrono_tz::UTC);
    assert_eq!(clock.now_utc(), t0);
    clock.set(t1);
    assert_eq!(clock.now_utc(), t1);
  }
}
