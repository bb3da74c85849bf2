//! Calendar-date parsing and month arithmetic.
//!
//! Due dates arrive as free text from inspection records (`2025.03.10`,
//! `2025.03.10.`, `2025/3/10`, `2025-03-10`). Everything downstream works on
//! [`jiff::civil::Date`], whose `Display` is the canonical `YYYY-MM-DD` key.

use std::{fmt, str::FromStr};

use jiff::civil::Date;

const SEPARATORS: [char; 3] = ['.', '-', '/'];

/// Errors from parsing calendar text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateError {
    #[error("malformed due date: {0:?}")]
    MalformedDueDate(String),

    #[error("malformed month: {0:?} (expected YYYY-MM)")]
    MalformedMonth(String),
}

/// Parse a due date, treating `.`, `-` and `/` as equivalent separators.
///
/// Surrounding whitespace and one trailing separator are tolerated, and month
/// and day may be written with one or two digits. The year must have four.
pub fn parse_due_date(raw: &str) -> Result<Date, DateError> {
    let malformed = || DateError::MalformedDueDate(raw.to_string());

    let parts = split_parts(raw).ok_or_else(malformed)?;
    let [year, month, day] = parts.as_slice() else {
        return Err(malformed());
    };
    if year.len() != 4 || month.len() > 2 || day.len() > 2 {
        return Err(malformed());
    }

    let year: i16 = year.parse().map_err(|_| malformed())?;
    let month: i8 = month.parse().map_err(|_| malformed())?;
    let day: i8 = day.parse().map_err(|_| malformed())?;
    Date::new(year, month, day).map_err(|_| malformed())
}

/// Splits date text on any separator. `None` if a part is empty or non-numeric.
fn split_parts(raw: &str) -> Option<Vec<&str>> {
    let trimmed = raw.trim();
    let trimmed = trimmed.strip_suffix(SEPARATORS).unwrap_or(trimmed);
    let parts: Vec<&str> = trimmed.split(SEPARATORS).map(str::trim).collect();
    let numeric = parts
        .iter()
        .all(|p| !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()));
    numeric.then_some(parts)
}

/// A calendar month, stored as its first day.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct YearMonth(Date);

impl YearMonth {
    /// The month containing `date`.
    pub fn of(date: Date) -> Self {
        Self(date.first_of_month())
    }

    pub fn year(self) -> i16 {
        self.0.year()
    }

    pub fn month(self) -> i8 {
        self.0.month()
    }

    pub fn first_day(self) -> Date {
        self.0
    }

    /// Every day of the month in order.
    pub fn days(self) -> impl Iterator<Item = Date> {
        let (year, month) = (self.year(), self.month());
        (1..=self.0.days_in_month()).filter_map(move |day| Date::new(year, month, day).ok())
    }

    /// The following month. Saturates at the end of the supported range.
    pub fn next(self) -> Self {
        let (year, month) = match self.month() {
            12 => (self.year().saturating_add(1), 1),
            m => (self.year(), m + 1),
        };
        Date::new(year, month, 1).map_or(self, Self)
    }

    /// The preceding month. Saturates at the start of the supported range.
    pub fn prev(self) -> Self {
        let (year, month) = match self.month() {
            1 => (self.year().saturating_sub(1), 12),
            m => (self.year(), m - 1),
        };
        Date::new(year, month, 1).map_or(self, Self)
    }
}

impl fmt::Display for YearMonth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year(), self.month())
    }
}

impl FromStr for YearMonth {
    type Err = DateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let malformed = || DateError::MalformedMonth(s.to_string());

        let parts = split_parts(s).ok_or_else(malformed)?;
        let [year, month] = parts.as_slice() else {
            return Err(malformed());
        };
        if year.len() != 4 || month.len() > 2 {
            return Err(malformed());
        }
        let year: i16 = year.parse().map_err(|_| malformed())?;
        let month: i8 = month.parse().map_err(|_| malformed())?;
        Date::new(year, month, 1).map(Self).map_err(|_| malformed())
    }
}
