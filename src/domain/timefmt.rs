//! Timestamp formatting and parsing shared by the resolver, the state file
//! and the audit log.
//!
//! Everything written by snapwatch uses seconds precision with a `Z`
//! suffix (`2026-01-01T00:00:00Z`).

use chrono::{DateTime, FixedOffset, NaiveDateTime, SecondsFormat, TimeZone, Utc};

/// Date and time layouts accepted in front of the offset, extended and basic
const LOCAL_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
    "%Y%m%dT%H%M",
];

/// Render an instant as `YYYY-MM-DDTHH:MM:SSZ`
pub fn format_iso_z(dt: &DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// Parse an ISO-8601 string that carries an explicit UTC offset.
///
/// Accepts extended and basic layouts with a `Z` suffix or a `+HH`,
/// `+HHMM`, `+HH:MM`, `+HHMMSS` or `+HH:MM:SS` offset. Strings without
/// offset information are rejected rather than assumed to be UTC.
pub fn parse_iso_offset(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.with_timezone(&Utc));
    }

    let (local, offset) = split_offset(value)?;
    let offset = parse_utc_offset(offset)?;
    let naive = LOCAL_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(local, fmt).ok())?;

    offset
        .from_local_datetime(&naive)
        .single()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Split `value` into the local date-time and its offset designator
fn split_offset(value: &str) -> Option<(&str, &str)> {
    if let Some(head) = value.strip_suffix(|c: char| c == 'Z' || c == 'z') {
        return Some((head, "+00:00"));
    }

    // The offset sign can only appear after the time separator
    let time_start = value.find(|c: char| c == 'T' || c == 't' || c == ' ')?;
    let sign = value[time_start..].rfind(|c: char| c == '+' || c == '-')? + time_start;
    Some((&value[..sign], &value[sign..]))
}

/// `+HH`, `+HHMM`, `+HH:MM`, `+HHMMSS` or `+HH:MM:SS` (and `-` forms)
fn parse_utc_offset(text: &str) -> Option<FixedOffset> {
    let sign = match text.chars().next()? {
        '+' => 1,
        '-' => -1,
        _ => return None,
    };
    let body = &text[1..];

    let digits = if body.contains(':') {
        let parts: Vec<&str> = body.split(':').collect();
        if parts.len() > 3 || parts.iter().any(|p| p.len() != 2) {
            return None;
        }
        parts.concat()
    } else {
        body.to_string()
    };

    if !matches!(digits.len(), 2 | 4 | 6) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }

    let field = |at: usize| -> i32 {
        digits
            .get(at..at + 2)
            .and_then(|s| s.parse().ok())
            .unwrap_or(0)
    };
    let (hours, minutes, seconds) = (field(0), field(2), field(4));
    if hours > 23 || minutes > 59 || seconds > 59 {
        return None;
    }

    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60 + seconds))
}

/// Serde adapter for required timestamps.
pub mod iso_z {
    use chrono::{DateTime, Utc};
    use serde::{de, Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dt: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&super::format_iso_z(dt))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        super::parse_iso_offset(&raw)
            .ok_or_else(|| de::Error::custom(format!("invalid timestamp: {}", raw)))
    }
}

/// Serde adapter for optional timestamps read back from disk.
///
/// Anything that is not a string with an offset deserializes to `None`
/// instead of failing the whole document. Pair with `#[serde(default)]`.
pub mod iso_z_lenient {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(dt: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match dt {
            Some(dt) => serializer.serialize_str(&super::format_iso_z(dt)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = Option::<serde_json::Value>::deserialize(deserializer)?;
        Ok(raw
            .as_ref()
            .and_then(|v| v.as_str())
            .and_then(super::parse_iso_offset))
    }
}
