use chrono::{DateTime, Datelike, NaiveDate, Utc};

use crate::error::{LedgerError, LedgerResult};

/// A budget period. Format: "YYYY-MM"
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct Month {
    label: String,
    first: NaiveDate,
}

impl Month {
    pub(crate) fn parse(s: &str) -> LedgerResult<Self> {
        let trimmed = s.trim();
        if trimmed.len() != 7 {
            return Err(LedgerError::invalid(format!(
                "month '{s}' must be formatted as YYYY-MM"
            )));
        }
        let first = NaiveDate::parse_from_str(&format!("{trimmed}-01"), "%Y-%m-%d")
            .map_err(|_| LedgerError::invalid(format!("month '{s}' is not a valid YYYY-MM")))?;
        Ok(Self::of_date(first))
    }

    pub(crate) fn of_date(date: NaiveDate) -> Self {
        let first = date.with_day(1).unwrap_or(date);
        Self {
            label: first.format("%Y-%m").to_string(),
            first,
        }
    }

    pub(crate) fn current() -> Self {
        Self::of_date(Utc::now().date_naive())
    }

    pub(crate) fn as_str(&self) -> &str {
        &self.label
    }

    pub(crate) fn first_day(&self) -> NaiveDate {
        self.first
    }

    /// First day of the following month (exclusive upper bound of this one).
    pub(crate) fn next_first_day(&self) -> NaiveDate {
        let first = self.first_day();
        let (year, month) = if first.month() == 12 {
            (first.year() + 1, 1)
        } else {
            (first.year(), first.month() + 1)
        };
        NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(first)
    }
}

impl std::fmt::Display for Month {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Parse a transaction date given either as a calendar date or a full instant.
/// Instants are reduced to their UTC calendar date.
pub(crate) fn parse_transaction_date(s: &str) -> LedgerResult<NaiveDate> {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        return Err(LedgerError::invalid("date is required"));
    }
    if let Ok(instant) = DateTime::parse_from_rfc3339(trimmed) {
        return Ok(instant.with_timezone(&Utc).date_naive());
    }
    for fmt in &["%Y-%m-%d", "%m/%d/%Y", "%Y/%m/%d"] {
        if let Ok(d) = NaiveDate::parse_from_str(trimmed, fmt) {
            return Ok(d);
        }
    }
    Err(LedgerError::invalid(format!("could not parse date '{s}'")))
}

/// Stored form of a transaction date: the instant at midnight UTC.
pub(crate) fn date_to_instant(date: NaiveDate) -> String {
    date.format("%Y-%m-%dT00:00:00.000Z").to_string()
}
