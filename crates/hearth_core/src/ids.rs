//! crates/hearth_core/src/ids.rs
//!
//! Identifier and time helpers shared by every component of the store.
//!
//! Nothing in this crate reads the system clock or a global random source.
//! Both arrive through [`Env`], which the caller builds once per transition.

use chrono::{DateTime, Days, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use rand::RngCore;

/// The clock reading and random source a single transition may draw on.
pub struct Env<'a> {
    pub now: DateTime<Utc>,
    pub rng: &'a mut dyn RngCore,
}

impl<'a> Env<'a> {
    pub fn new(now: DateTime<Utc>, rng: &'a mut dyn RngCore) -> Self {
        Self { now, rng }
    }

    /// Draws a fresh opaque entity id.
    ///
    /// The id has the UUID v4 layout but its bytes come from the injected RNG,
    /// so a seeded generator yields a reproducible sequence.
    pub fn new_id(&mut self) -> String {
        let mut bytes = [0u8; 16];
        self.rng.fill_bytes(&mut bytes);
        uuid::Builder::from_random_bytes(bytes)
            .into_uuid()
            .to_string()
    }
}

/// Formats a timestamp the way it is persisted (`2024-01-08T00:00:00Z`).
pub fn iso(ts: DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::AutoSi, true)
}

/// Parses the timestamp shapes the UI and persisted snapshots produce.
///
/// Accepts RFC 3339, a zone-less `YYYY-MM-DDTHH:MM[:SS]` (read as UTC, which
/// is what `datetime-local` inputs send), and a bare `YYYY-MM-DD` (midnight).
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(Utc.from_utc_datetime(&naive));
        }
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

/// Adds whole calendar days, `None` only past the representable range.
pub fn add_days(ts: DateTime<Utc>, days: u32) -> Option<DateTime<Utc>> {
    ts.checked_add_days(Days::new(u64::from(days)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn at(raw: &str) -> DateTime<Utc> {
        parse_timestamp(raw).expect("timestamp")
    }

    #[test]
    fn seeded_rng_gives_reproducible_ids() {
        let now = Utc::now();
        let mut first = StdRng::seed_from_u64(42);
        let mut second = StdRng::seed_from_u64(42);
        let a = Env::new(now, &mut first).new_id();
        let b = Env::new(now, &mut second).new_id();
        assert_eq!(a, b);
        assert_eq!(a.len(), 36);
    }

    #[test]
    fn parses_the_accepted_shapes() {
        assert_eq!(iso(at("2024-01-01T00:00:00Z")), "2024-01-01T00:00:00Z");
        assert_eq!(iso(at("2024-01-01T02:00:00+02:00")), "2024-01-01T00:00:00Z");
        assert_eq!(iso(at("2024-03-05T18:30")), "2024-03-05T18:30:00Z");
        assert_eq!(iso(at("2024-03-05")), "2024-03-05T00:00:00Z");
        assert!(parse_timestamp("next tuesday").is_none());
        assert!(parse_timestamp("   ").is_none());
    }

    #[test]
    fn day_arithmetic_rolls_months_and_years() {
        assert_eq!(iso(add_days(at("2024-01-30T09:00:00Z"), 3).unwrap()), "2024-02-02T09:00:00Z");
        assert_eq!(iso(add_days(at("2024-02-28T00:00:00Z"), 1).unwrap()), "2024-02-29T00:00:00Z");
        assert_eq!(iso(add_days(at("2023-12-29T00:00:00Z"), 7).unwrap()), "2024-01-05T00:00:00Z");
    }
}
