//! Lenient timestamps
//!
//! Persisted documents carry timestamps in two historical encodings: epoch
//! milliseconds (numbers) and text (RFC 3339, naive ISO-8601, or plain
//! `YYYY-MM-DD` dates). [`Timestamp`] keeps whichever encoding it was read
//! with so that a document round-trips verbatim, and exposes the parsed
//! instant for comparison.

use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

/// A point in time as it was persisted
///
/// Equality is representational: `Millis(0)` and `Text("1970-01-01T00:00:00Z")`
/// are different values. Use [`Timestamp::key`] when two timestamps must be
/// compared as instants.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Timestamp {
    /// Milliseconds since the Unix epoch
    Millis(i64),

    /// Textual timestamp, kept exactly as read
    Text(String),
}

/// Comparison key for a [`Timestamp`]
///
/// Parseable timestamps order by instant and sort before unparseable ones,
/// which order by raw text.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum TimestampKey {
    /// Parsed instant in epoch milliseconds
    Instant(i64),

    /// Unparseable raw text
    Raw(String),
}

impl Timestamp {
    /// Current time as RFC 3339 text with millisecond precision
    #[must_use]
    pub fn now() -> Self {
        Self::from_instant(Utc::now())
    }

    /// Text timestamp for an instant
    #[must_use]
    pub fn from_instant(instant: DateTime<Utc>) -> Self {
        Self::Text(instant.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    /// Parse into a UTC instant
    ///
    /// Returns `None` for text that matches none of the accepted formats.
    #[must_use]
    pub fn instant(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Millis(ms) => Utc.timestamp_millis_opt(*ms).single(),
            Self::Text(text) => parse_text(text.trim()),
        }
    }

    /// Epoch milliseconds of the parsed instant
    #[inline]
    #[must_use]
    pub fn millis(&self) -> Option<i64> {
        self.instant().map(|dt| dt.timestamp_millis())
    }

    /// Comparison key (instant first, raw text as fallback)
    #[must_use]
    pub fn key(&self) -> TimestampKey {
        match self.millis() {
            Some(ms) => TimestampKey::Instant(ms),
            None => TimestampKey::Raw(self.to_string()),
        }
    }

    /// Whether `self` is strictly later than `other`
    ///
    /// An unparseable timestamp is never later than a parseable one.
    #[inline]
    #[must_use]
    pub fn is_after(&self, other: &Self) -> bool {
        match (self.key(), other.key()) {
            (TimestampKey::Instant(a), TimestampKey::Instant(b)) => a > b,
            (TimestampKey::Instant(_), TimestampKey::Raw(_)) => true,
            (TimestampKey::Raw(_), TimestampKey::Instant(_)) => false,
            (TimestampKey::Raw(a), TimestampKey::Raw(b)) => a > b,
        }
    }
}

fn parse_text(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M") {
        return Some(Utc.from_utc_datetime(&naive));
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| Utc.from_utc_datetime(&naive))
}

impl Display for Timestamp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Millis(ms) => write!(f, "{ms}"),
            Self::Text(text) => f.write_str(text),
        }
    }
}

impl From<DateTime<Utc>> for Timestamp {
    fn from(instant: DateTime<Utc>) -> Self {
        Self::from_instant(instant)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn millis_and_text_share_instant() {
        let a = Timestamp::Millis(1_704_103_200_000);
        let b = Timestamp::Text("2024-01-01T10:00:00Z".to_string());
        assert_ne!(a, b);
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn fractional_and_plain_rfc3339_agree() {
        let a = Timestamp::Text("2024-01-01T10:00:00.000Z".to_string());
        let b = Timestamp::Text("2024-01-01T10:00:00Z".to_string());
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn date_only_parses_to_midnight() {
        let ts = Timestamp::Text("2024-03-05".to_string());
        let expected = Utc.with_ymd_and_hms(2024, 3, 5, 0, 0, 0).unwrap();
        assert_eq!(ts.instant(), Some(expected));
    }

    #[test]
    fn unparseable_sorts_after_parseable() {
        let good = Timestamp::Text("2024-01-01".to_string());
        let bad = Timestamp::Text("last tuesday".to_string());
        assert!(good.key() < bad.key());
        assert!(good.is_after(&bad));
        assert!(!bad.is_after(&good));
    }

    #[test]
    fn serde_keeps_encoding() {
        let json = r#"[1704103200000,"2024-01-01T10:00:00Z"]"#;
        let parsed: Vec<Timestamp> = serde_json::from_str(json).unwrap();
        assert_eq!(parsed[0], Timestamp::Millis(1_704_103_200_000));
        assert_eq!(serde_json::to_string(&parsed).unwrap(), json);
    }
}
