//! Signup records and the statistics derived from them
//!
//! Raw records come from the backing database with every field optional. They are
//! normalised into privacy-reduced [`Signup`] values, and [`SignupStats`] are
//! recomputed over the full collection on each refresh.

use chrono::{DateTime, Duration, NaiveDate, NaiveTime, Offset, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Display name used when a record carries no usable name
pub const ANONYMOUS: &str = "Anonymous";

/// Length of the trailing window counted by `week_count`
const WEEK_DAYS: i64 = 7;

/// Errors that cause a single record to be dropped
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// Timestamp present but not an ISO-8601 instant or date
    #[error("Invalid timestamp: '{0}'")]
    InvalidTimestamp(String),
}

/// A signup exactly as read from the backing source
///
/// Any field may be absent; nothing here has been validated.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RawSignup {
    /// Full name as entered on the form
    pub name: Option<String>,
    /// ISO-8601 instant or date of the signup
    pub timestamp: Option<String>,
    /// Free-text comment left with the signup
    pub comment: Option<String>,
}

/// A normalised signup, safe to publish
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Signup {
    /// First name plus last initial, or [`ANONYMOUS`]
    pub display_name: String,
    /// When the signup happened
    pub timestamp: DateTime<Utc>,
    /// Optional comment, `null` when absent
    pub comment: Option<String>,
}

impl Signup {
    /// Normalises a raw record
    ///
    /// A missing timestamp defaults to `now`. A timestamp that is present but
    /// unparsable is an error; callers drop such records.
    pub fn normalize(raw: &RawSignup, now: DateTime<Utc>) -> Result<Self, RecordError> {
        let timestamp = match raw.timestamp.as_deref().map(str::trim) {
            None | Some("") => now,
            Some(value) => parse_timestamp(value)?,
        };

        let comment = raw
            .comment
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(str::to_string);

        Ok(Self {
            display_name: display_name(raw.name.as_deref()),
            timestamp,
            comment,
        })
    }
}

/// Normalises every record, dropping (and logging) the ones that fail
///
/// Source order is preserved.
pub fn normalize_all(raws: &[RawSignup], now: DateTime<Utc>) -> Vec<Signup> {
    raws.iter()
        .filter_map(|raw| match Signup::normalize(raw, now) {
            Ok(signup) => Some(signup),
            Err(e) => {
                warn!(error = %e, "dropping malformed signup record");
                None
            }
        })
        .collect()
}

/// Reduces a full name to "First L."
///
/// The initial comes from the last whitespace-delimited token. A single token is
/// returned as-is; an absent or blank name becomes [`ANONYMOUS`].
pub fn display_name(raw: Option<&str>) -> String {
    let tokens: Vec<&str> = raw.unwrap_or_default().split_whitespace().collect();

    match tokens.as_slice() {
        [] => ANONYMOUS.to_string(),
        [only] => (*only).to_string(),
        [first, .., last] => {
            let initial: String = last
                .chars()
                .next()
                .map(|c| c.to_uppercase().collect())
                .unwrap_or_default();
            format!("{} {}.", first, initial)
        }
    }
}

/// Parses an RFC 3339 instant, or a bare `YYYY-MM-DD` date taken as UTC midnight
fn parse_timestamp(value: &str) -> Result<DateTime<Utc>, RecordError> {
    if let Ok(instant) = DateTime::parse_from_rfc3339(value) {
        return Ok(instant.with_timezone(&Utc));
    }

    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| RecordError::InvalidTimestamp(value.to_string()))
}

/// Counts derived from the full signup collection
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignupStats {
    /// Every signup
    pub total_count: usize,
    /// Signups since midnight of `now`'s calendar day
    pub today_count: usize,
    /// Signups in the trailing seven days
    pub week_count: usize,
}

impl SignupStats {
    /// Computes the counts relative to `now`
    ///
    /// The day boundary is midnight in `now`'s timezone; both lower bounds are
    /// inclusive.
    pub fn compute<Tz: TimeZone>(signups: &[Signup], now: &DateTime<Tz>) -> Self {
        let day_start = start_of_day(now);
        let week_start = now.with_timezone(&Utc) - Duration::days(WEEK_DAYS);

        Self {
            total_count: signups.len(),
            today_count: signups.iter().filter(|s| s.timestamp >= day_start).count(),
            week_count: signups.iter().filter(|s| s.timestamp >= week_start).count(),
        }
    }
}

/// Midnight of `now`'s calendar day, as a UTC instant
fn start_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> DateTime<Utc> {
    let midnight = now.date_naive().and_time(NaiveTime::MIN);

    match now.timezone().from_local_datetime(&midnight).earliest() {
        Some(local) => local.with_timezone(&Utc),
        // Midnight skipped by a DST transition: fall back to the current offset
        None => {
            let offset = now.offset().fix().local_minus_utc();
            midnight.and_utc() - Duration::seconds(i64::from(offset))
        }
    }
}
