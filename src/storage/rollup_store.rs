use std::collections::BTreeSet;
use chrono::Datelike;
use rayon::prelude::*;
use crate::core::dates::DateRange;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DayPresence, Kind};
use crate::storage::layout::StorageLayout;
use crate::storage::segment_reader::SegmentReader;
use crate::storage::source::PresenceSource;

/// Per-kind, per-year day presence rollups.
///
/// A rollup year is only served while it still matches the columnar
/// segment it was derived from; otherwise the scan fails with
/// `ErrorKind::Stale` and the caller falls back to the raw entries.
#[derive(Debug, Clone)]
pub struct RollupStore {
    pub layout: StorageLayout,
}

impl RollupStore {
    pub fn new(layout: StorageLayout) -> Self {
        RollupStore { layout }
    }

    fn scan_year(&self, kind: Kind, year: i32, range: &DateRange) -> Result<Vec<DayPresence>> {
        let source = SegmentReader::open(&self.layout.columnar_path(kind, year))?;
        let rollup = SegmentReader::open(&self.layout.rollup_path(kind, year))?;

        let rollup = match (source, rollup) {
            (None, None) => return Ok(Vec::new()),
            (Some(_), None) => return Err(stale(kind, year, "rollup missing")),
            (None, Some(_)) => return Err(stale(kind, year, "columnar segment missing")),
            (Some(source), Some(rollup)) => {
                if rollup.header.metadata.source_checksum != Some(source.header.checksum) {
                    return Err(stale(kind, year, "derived from a different columnar segment"));
                }
                rollup
            }
        };

        if !rollup.header.metadata.dates.iter().any(|date| range.contains(*date)) {
            return Ok(Vec::new());
        }

        let mut rows = rollup.read_presence()?;
        rows.retain(|row| range.contains(row.date));
        Ok(rows)
    }
}

impl PresenceSource for RollupStore {
    fn scan_presence(&self, kind: Kind, range: &DateRange) -> Result<Vec<DayPresence>> {
        let years: BTreeSet<i32> = self
            .layout
            .columnar_years(kind)?
            .into_iter()
            .chain(self.layout.rollup_years(kind)?)
            .filter(|year| range.start.year() <= *year && *year <= range.end.year())
            .collect();
        let years: Vec<i32> = years.into_iter().collect();

        let per_year = years
            .par_iter()
            .map(|&year| self.scan_year(kind, year, range))
            .collect::<Result<Vec<_>>>()?;
        Ok(per_year.into_iter().flatten().collect())
    }
}

fn stale(kind: Kind, year: i32, reason: &str) -> Error {
    Error::new(ErrorKind::Stale, format!("{} rollup for {}: {}", kind, year, reason))
}
