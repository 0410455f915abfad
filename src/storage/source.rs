use chrono::NaiveDate;
use crate::core::dates::DateRange;
use crate::core::error::Result;
use crate::core::types::{DayPresence, Kind, LanguageView, TrendEntry};

/// Scan/filter primitive over raw trend entries.
pub trait EntrySource: Send + Sync {
    /// Entries of `kind` dated inside `range`, restricted to one daily list
    /// when `view` is given. Rows come back in physical
    /// `(date, language, rank)` order.
    fn scan_entries(
        &self,
        kind: Kind,
        range: &DateRange,
        view: Option<&LanguageView>,
    ) -> Result<Vec<TrendEntry>>;

    /// Every date with at least one stored entry, ascending.
    fn known_dates(&self, kind: Kind) -> Result<Vec<NaiveDate>>;
}

/// Scan primitive over precomputed day presence rows.
pub trait PresenceSource: Send + Sync {
    fn scan_presence(&self, kind: Kind, range: &DateRange) -> Result<Vec<DayPresence>>;
}
