//! Revision selection by effective date.

use core::fmt;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

/// A point in time used to pick among stored revisions of a document.
///
/// Ordered chronologically. Month and day default to `1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BooksDate {
    /// Calendar year.
    pub year: u16,
    /// Month, 1-12.
    #[serde(default = "first")]
    pub month: u8,
    /// Day of month, 1-31.
    #[serde(default = "first")]
    pub day: u8,
}

fn first() -> u8 {
    1
}

impl BooksDate {
    /// Creates a date.
    #[must_use]
    pub fn new(year: u16, month: u8, day: u8) -> Self {
        Self { year, month, day }
    }

    /// The first day of `year`.
    #[must_use]
    pub fn year(year: u16) -> Self {
        Self::new(year, 1, 1)
    }
}

impl fmt::Display for BooksDate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}-{:02}", self.year, self.month, self.day)
    }
}

/// Error parsing a [`BooksDate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid date '{0}': expected YYYY, YYYY-MM or YYYY-MM-DD")]
pub struct ParseDateError(String);

impl FromStr for BooksDate {
    type Err = ParseDateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ParseDateError(s.to_owned());
        let mut parts = s.trim().split('-');

        let year = parts
            .next()
            .and_then(|part| part.parse::<u16>().ok())
            .ok_or_else(invalid)?;
        let mut component = |max: u8| -> Result<u8, ParseDateError> {
            match parts.next() {
                None => Ok(1),
                Some(part) => part
                    .parse::<u8>()
                    .ok()
                    .filter(|value| (1..=max).contains(value))
                    .ok_or_else(invalid),
            }
        };
        let month = component(12)?;
        let day = component(31)?;
        if parts.next().is_some() {
            return Err(invalid());
        }
        Ok(Self { year, month, day })
    }
}

/// Key of one stored revision of a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub enum RevisionKey {
    /// The most recent, undated revision.
    #[default]
    Default,
    /// A revision effective from a date.
    Dated(BooksDate),
}

impl RevisionKey {
    /// The date, for a dated revision.
    #[must_use]
    pub fn date(&self) -> Option<BooksDate> {
        match self {
            Self::Default => None,
            Self::Dated(date) => Some(*date),
        }
    }
}

impl fmt::Display for RevisionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Default => f.write_str("default"),
            Self::Dated(date) => date.fmt(f),
        }
    }
}

/// Picks the revision to use for a requested date.
///
/// Returns the latest of `available` that is not after `requested`, or
/// [`RevisionKey::Default`] when no date is requested or every stored
/// revision is later than it. `available` need not be sorted.
///
/// # Example
///
/// ```
/// use muster_registry::versioning::{BooksDate, RevisionKey, resolve_revision};
///
/// let stored = [BooksDate::year(2020), BooksDate::year(2022)];
/// let picked = resolve_revision(&stored, Some(&BooksDate::new(2021, 6, 1)));
/// assert_eq!(picked, RevisionKey::Dated(BooksDate::year(2020)));
/// assert_eq!(resolve_revision(&stored, None), RevisionKey::Default);
/// ```
#[must_use]
pub fn resolve_revision(available: &[BooksDate], requested: Option<&BooksDate>) -> RevisionKey {
    let Some(requested) = requested else {
        return RevisionKey::Default;
    };
    available
        .iter()
        .filter(|date| *date <= requested)
        .max()
        .map_or(RevisionKey::Default, |date| RevisionKey::Dated(*date))
}
