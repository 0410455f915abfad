use std::collections::{BTreeMap, BTreeSet};
use std::path::PathBuf;
use chrono::{Datelike, NaiveDate};
use crate::compression::compress::CompressionType;
use crate::core::error::{Error, Result};
use crate::core::types::{DayPresence, EntityKey, Kind, TrendEntry};
use crate::storage::file_lock::FileLock;
use crate::storage::layout::StorageLayout;
use crate::storage::segment_reader::SegmentReader;
use crate::storage::segment_writer::SegmentWriter;

#[derive(Debug, Clone)]
pub struct RollupResult {
    pub kind: Kind,
    pub years_built: Vec<i32>,
    pub segment_paths: Vec<PathBuf>,
    pub rows_written: usize,
}

#[derive(Default)]
struct DayAccumulator<'a> {
    best_rank_any: Option<u32>,
    best_rank_non_null: Option<u32>,
    languages: BTreeSet<&'a str>,
    has_all_languages_entry: bool,
}

/// Collapse entries to one presence row per `(date, entity)`, ordered by
/// date then entity key.
pub fn aggregate_presence(entries: &[TrendEntry]) -> Vec<DayPresence> {
    let mut days: BTreeMap<(NaiveDate, &EntityKey), DayAccumulator> = BTreeMap::new();

    for entry in entries {
        let acc = days.entry((entry.date, &entry.entity)).or_default();
        acc.best_rank_any = Some(acc.best_rank_any.map_or(entry.rank, |best| best.min(entry.rank)));
        match entry.language.as_deref() {
            Some(language) => {
                acc.best_rank_non_null =
                    Some(acc.best_rank_non_null.map_or(entry.rank, |best| best.min(entry.rank)));
                acc.languages.insert(language);
            }
            None => acc.has_all_languages_entry = true,
        }
    }

    days.into_iter()
        .filter_map(|((date, entity), acc)| {
            Some(DayPresence {
                date,
                entity: entity.clone(),
                best_rank_any: acc.best_rank_any?,
                best_rank_non_null: acc.best_rank_non_null,
                distinct_language_count: acc.languages.len() as u32,
                has_all_languages_entry: acc.has_all_languages_entry,
            })
        })
        .collect()
}

/// Re-derive the presence rollup of every columnar year of `kind`, or of
/// the years from `from_date` onward.
pub fn rollup_kind(
    layout: &StorageLayout,
    kind: Kind,
    from_date: Option<NaiveDate>,
    compression: CompressionType,
) -> Result<RollupResult> {
    let _lock = FileLock::acquire(layout)?;

    let years: Vec<i32> = layout
        .columnar_years(kind)?
        .into_iter()
        .filter(|year| from_date.is_none_or(|date| *year >= date.year()))
        .collect();

    let mut result = RollupResult {
        kind,
        years_built: Vec::new(),
        segment_paths: Vec::new(),
        rows_written: 0,
    };

    for year in years {
        let Some(source) = SegmentReader::open(&layout.columnar_path(kind, year))? else {
            continue;
        };
        // A year whose archived lists were all empty still gets a rollup,
        // otherwise the rollup store would report it stale.
        let entries = source.read_entries()?;
        let rows = aggregate_presence(&entries);
        let path = layout.rollup_path(kind, year);
        SegmentWriter::new(kind, year, compression).write_presence(
            &path,
            &rows,
            &source.header.metadata.dates,
            source.header.checksum,
        )?;
        tracing::info!(kind = %kind, year, rows = rows.len(), "rollup year built");

        result.years_built.push(year);
        result.segment_paths.push(path);
        result.rows_written += rows.len();
    }

    if result.years_built.is_empty() {
        return Err(Error::invalid("No rows available to roll up"));
    }
    Ok(result)
}
