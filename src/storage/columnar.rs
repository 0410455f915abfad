use std::collections::BTreeSet;
use chrono::{Datelike, NaiveDate};
use rayon::prelude::*;
use crate::core::dates::DateRange;
use crate::core::error::Result;
use crate::core::types::{Kind, LanguageView, TrendEntry};
use crate::storage::layout::StorageLayout;
use crate::storage::segment_reader::SegmentReader;
use crate::storage::source::EntrySource;

/// Per-kind, per-year trend entry segments.
#[derive(Debug, Clone)]
pub struct ColumnarStore {
    pub layout: StorageLayout,
}

impl ColumnarStore {
    pub fn new(layout: StorageLayout) -> Self {
        ColumnarStore { layout }
    }

    fn years_in(&self, kind: Kind, range: &DateRange) -> Result<Vec<i32>> {
        Ok(self
            .layout
            .columnar_years(kind)?
            .into_iter()
            .filter(|year| range.start.year() <= *year && *year <= range.end.year())
            .collect())
    }

    fn scan_year(
        &self,
        kind: Kind,
        year: i32,
        range: &DateRange,
        view: Option<&LanguageView>,
    ) -> Result<Vec<TrendEntry>> {
        let reader = match SegmentReader::open(&self.layout.columnar_path(kind, year))? {
            Some(reader) => reader,
            None => return Ok(Vec::new()),
        };

        // Skip decoding when the header shows no date inside the window
        if !reader.header.metadata.dates.iter().any(|date| range.contains(*date)) {
            return Ok(Vec::new());
        }

        let mut entries = reader.read_entries()?;
        entries.retain(|entry| {
            range.contains(entry.date)
                && view.is_none_or(|view| view.matches(entry.language.as_deref()))
        });
        Ok(entries)
    }
}

impl EntrySource for ColumnarStore {
    fn scan_entries(
        &self,
        kind: Kind,
        range: &DateRange,
        view: Option<&LanguageView>,
    ) -> Result<Vec<TrendEntry>> {
        let years = self.years_in(kind, range)?;
        let per_year = years
            .par_iter()
            .map(|&year| self.scan_year(kind, year, range, view))
            .collect::<Result<Vec<_>>>()?;
        Ok(per_year.into_iter().flatten().collect())
    }

    fn known_dates(&self, kind: Kind) -> Result<Vec<NaiveDate>> {
        let mut dates = BTreeSet::new();
        for year in self.layout.columnar_years(kind)? {
            if let Some(reader) = SegmentReader::open(&self.layout.columnar_path(kind, year))? {
                dates.extend(reader.header.metadata.dates.iter().copied());
            }
        }
        Ok(dates.into_iter().collect())
    }
}
