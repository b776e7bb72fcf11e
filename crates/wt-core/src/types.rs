//! Core type definitions with validation.

use std::borrow::Borrow;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Days, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Validation errors for core types.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// The provided value was empty.
    #[error("{field} cannot be empty")]
    Empty { field: &'static str },

    /// Invalid category name.
    #[error("invalid category: {value}")]
    InvalidCategory { value: String },

    /// Day keys must be `YYYY-MM-DD`.
    #[error("invalid day key: {value}")]
    InvalidDayKey { value: String },
}

/// A normalized web domain, the attribution key of the ledger.
///
/// Domains must be non-empty. Normalization (host extraction, `www.`
/// stripping) happens in [`crate::domain::domain_from_url`]; this type only
/// guarantees the value is usable as a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Domain(String);

impl Domain {
    /// Creates a new domain after validation.
    pub fn new(domain: impl Into<String>) -> Result<Self, ValidationError> {
        let domain = domain.into();
        if domain.is_empty() {
            return Err(ValidationError::Empty { field: "domain" });
        }
        Ok(Self(domain))
    }

    /// Returns the domain as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Domain {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Domain> for String {
    fn from(domain: Domain) -> Self {
        domain.0
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for Domain {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for Domain {
    fn borrow(&self) -> &str {
        &self.0
    }
}

/// A calendar day (UTC) used to partition the ledger.
///
/// Rendered as `YYYY-MM-DD`, which keeps lexicographic and chronological
/// ordering identical in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DayKey(NaiveDate);

impl DayKey {
    const FORMAT: &'static str = "%Y-%m-%d";

    /// The day a UTC timestamp falls on.
    pub fn of(timestamp: DateTime<Utc>) -> Self {
        Self(timestamp.date_naive())
    }

    /// Today's day key.
    pub fn today() -> Self {
        Self::of(Utc::now())
    }

    pub const fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub const fn date(self) -> NaiveDate {
        self.0
    }

    /// The day `days` before this one, saturating at the calendar minimum.
    #[must_use]
    pub fn days_back(self, days: u32) -> Self {
        Self(
            self.0
                .checked_sub_days(Days::new(u64::from(days)))
                .unwrap_or(NaiveDate::MIN),
        )
    }
}

impl fmt::Display for DayKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format(Self::FORMAT))
    }
}

impl FromStr for DayKey {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        NaiveDate::parse_from_str(s, Self::FORMAT)
            .map(Self)
            .map_err(|_| ValidationError::InvalidDayKey {
                value: s.to_string(),
            })
    }
}

impl TryFrom<String> for DayKey {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DayKey> for String {
    fn from(day: DayKey) -> Self {
        day.to_string()
    }
}

/// Productivity category assigned per domain.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum Category {
    Work,
    Social,
    Entertainment,
    #[default]
    Other,
}

impl Category {
    /// Every category, in display order.
    pub const ALL: [Self; 4] = [Self::Work, Self::Social, Self::Entertainment, Self::Other];

    /// String representation for storage and prompts.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Work => "Work",
            Self::Social => "Social",
            Self::Entertainment => "Entertainment",
            Self::Other => "Other",
        }
    }

    /// Time in this category counts as focus time.
    #[must_use]
    pub const fn is_focus(self) -> bool {
        matches!(self, Self::Work)
    }

    /// Social and entertainment sites are the ones focus mode targets.
    #[must_use]
    pub const fn is_distracting(self) -> bool {
        matches!(self, Self::Social | Self::Entertainment)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for Category {
    type Err = ValidationError;

    /// Parses a category name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|category| category.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ValidationError::InvalidCategory {
                value: s.to_string(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn domain_rejects_empty() {
        assert_eq!(
            Domain::new(""),
            Err(ValidationError::Empty { field: "domain" })
        );
    }

    #[test]
    fn domain_serde_rejects_empty() {
        let result: Result<Domain, _> = serde_json::from_str(r#""""#);
        assert!(result.is_err());
    }

    #[test]
    fn day_key_formats_as_date() {
        let ts = DateTime::parse_from_rfc3339("2025-01-15T23:59:59Z")
            .unwrap()
            .with_timezone(&Utc);
        assert_eq!(DayKey::of(ts).to_string(), "2025-01-15");
    }

    #[test]
    fn day_key_parse_and_walk_back() {
        let day: DayKey = "2025-03-01".parse().unwrap();
        assert_eq!(day.days_back(1).to_string(), "2025-02-28");
        assert_eq!(day.days_back(365).to_string(), "2024-03-01");
        assert!("03/01/2025".parse::<DayKey>().is_err());
    }

    #[test]
    fn category_parses_case_insensitively() {
        assert_eq!("work".parse::<Category>().unwrap(), Category::Work);
        assert_eq!(
            " ENTERTAINMENT ".parse::<Category>().unwrap(),
            Category::Entertainment
        );
        assert!(matches!(
            "Gaming".parse::<Category>(),
            Err(ValidationError::InvalidCategory { .. })
        ));
    }

    #[test]
    fn category_roundtrips_through_display() {
        for category in Category::ALL {
            let parsed: Category = category.to_string().parse().unwrap();
            assert_eq!(parsed, category);
        }
    }

    #[test]
    fn distracting_categories() {
        assert!(Category::Social.is_distracting());
        assert!(Category::Entertainment.is_distracting());
        assert!(!Category::Work.is_distracting());
        assert!(!Category::Other.is_distracting());
    }
}
