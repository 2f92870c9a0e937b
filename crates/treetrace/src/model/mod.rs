//! Core record types for treetrace.
//!
//! Records serialize with the JSON field names the web client expects
//! (`_id`, camelCase fields, `YYYY-MM-DD` dates).

pub mod health;
pub mod member;
pub mod user;

pub use health::{HealthCondition, HealthConditionPatch, NewHealthCondition};
pub use member::{FamilyMember, FamilyMemberPatch, Gender, LifeStatus, NewFamilyMember};
pub use user::{Credentials, NewUser, User};

use chrono::{DateTime, NaiveDate};
use serde::{de, Deserialize, Deserializer};

/// Generate a new record identifier.
#[must_use]
pub fn new_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

/// Trim a free-text field, mapping blank input to `None`.
#[must_use]
pub fn normalize_text(value: Option<String>) -> Option<String> {
    value.and_then(|v| {
        let trimmed = v.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    })
}

/// Parse a calendar date sent by the client.
///
/// Accepts `YYYY-MM-DD` as well as full RFC 3339 timestamps, which the
/// client produces when it round-trips dates through `Date#toISOString`.
/// Blank input means "no date".
///
/// # Errors
///
/// Returns a description of the problem when the text is not a date.
pub fn parse_date(raw: &str) -> std::result::Result<Option<NaiveDate>, String> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(date));
    }
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| Some(dt.date_naive()))
        .map_err(|_| format!("invalid date: {raw}"))
}

/// Deserialize an optional date, treating `null` and `""` as absent.
pub(crate) fn optional_date<'de, D>(deserializer: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        Some(raw) => parse_date(&raw).map_err(de::Error::custom),
        None => Ok(None),
    }
}

/// Deserialize a patch date: missing field stays `None`, `null`/`""` clears.
pub(crate) fn patch_date<'de, D>(deserializer: D) -> Result<Option<Option<NaiveDate>>, D::Error>
where
    D: Deserializer<'de>,
{
    optional_date(deserializer).map(Some)
}

/// Deserialize a patch field so that an explicit `null` becomes `Some(None)`.
pub(crate) fn patch_field<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_id_is_unique_hex() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
        assert_eq!(a.len(), 32);
        assert!(a.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_normalize_text() {
        assert_eq!(normalize_text(Some("  Oslo ".to_string())), Some("Oslo".to_string()));
        assert_eq!(normalize_text(Some("   ".to_string())), None);
        assert_eq!(normalize_text(None), None);
    }

    #[test]
    fn test_parse_date_formats() {
        let expected = NaiveDate::from_ymd_opt(1950, 3, 14);
        assert_eq!(parse_date("1950-03-14").unwrap(), expected);
        assert_eq!(parse_date("1950-03-14T00:00:00.000Z").unwrap(), expected);
        assert_eq!(parse_date("").unwrap(), None);
        assert!(parse_date("14/03/1950").is_err());
    }
}
