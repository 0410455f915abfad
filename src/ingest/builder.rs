use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::{Path, PathBuf};
use chrono::{Datelike, NaiveDate};
use crate::compression::compress::CompressionType;
use crate::core::dates::iso_date;
use crate::core::error::{Error, Result};
use crate::core::types::{EntityKey, Kind, TrendEntry};
use crate::ingest::archive_reader::{archive_years, read_archive, ArchiveFile};
use crate::storage::file_lock::FileLock;
use crate::storage::layout::StorageLayout;
use crate::storage::manifest::{Manifest, ManifestKind};
use crate::storage::segment_reader::SegmentReader;
use crate::storage::segment_writer::SegmentWriter;

#[derive(Debug, Clone)]
pub struct BuildOptions {
    pub year: Option<i32>,          // Restrict to one archive year
    pub rebuild_year: bool,         // Rewrite instead of appending new dates
    pub compression: CompressionType,
}

impl Default for BuildOptions {
    fn default() -> Self {
        BuildOptions {
            year: None,
            rebuild_year: false,
            compression: CompressionType::Lz4,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BuildResult {
    pub kind: Kind,
    pub years_built: Vec<i32>,
    pub segment_paths: Vec<PathBuf>,
    pub manifest_path: PathBuf,
    pub rows_written: usize,
    pub duplicates_dropped: usize,
}

/// Compact the JSON archive of one kind into columnar year segments and
/// refresh the manifest.
pub fn build_kind(
    archive_root: &Path,
    layout: &StorageLayout,
    kind: Kind,
    options: &BuildOptions,
) -> Result<BuildResult> {
    if !archive_root.is_dir() {
        return Err(Error::invalid(format!(
            "Archive root does not exist: {}",
            archive_root.display()
        )));
    }
    let _lock = FileLock::acquire(layout)?;

    let years = match options.year {
        Some(year) => vec![year],
        None => archive_years(archive_root, kind)?,
    };

    let mut result = BuildResult {
        kind,
        years_built: years.clone(),
        segment_paths: Vec::new(),
        manifest_path: layout.manifest_path(),
        rows_written: 0,
        duplicates_dropped: 0,
    };

    for year in years {
        let files = read_archive(archive_root, kind, Some(year))?;
        if files.is_empty() {
            continue;
        }
        let writer = SegmentWriter::new(kind, year, options.compression);
        if let Some((path, rows, dropped)) =
            build_year(layout, &writer, &files, options.rebuild_year)?
        {
            tracing::info!(kind = %kind, year, rows, "columnar year built");
            result.segment_paths.push(path);
            result.rows_written += rows;
            result.duplicates_dropped += dropped;
        }
    }

    let mut manifest = Manifest::load(&layout.manifest_path())?;
    manifest.update_kind(kind, summarize_archive(kind, &read_archive(archive_root, kind, None)?));
    manifest.save(&layout.manifest_path())?;

    Ok(result)
}

/// Returns the segment path, rows written and duplicates dropped, or `None`
/// when an append found nothing new.
fn build_year(
    layout: &StorageLayout,
    writer: &SegmentWriter,
    files: &[ArchiveFile],
    rebuild_year: bool,
) -> Result<Option<(PathBuf, usize, usize)>> {
    let path = layout.columnar_path(writer.kind, writer.year);

    // Dates come from the segment header so that archived days whose lists
    // were all empty count as already built.
    let reader = if rebuild_year { None } else { SegmentReader::open(&path)? };
    let (existing, existing_dates) = match reader {
        Some(reader) => {
            let dates: BTreeSet<NaiveDate> = reader.header.metadata.dates.iter().copied().collect();
            (reader.read_entries()?, Some(dates))
        }
        None => (Vec::new(), None),
    };

    let new_files: Vec<&ArchiveFile> = files
        .iter()
        .filter(|file| !existing_dates.as_ref().is_some_and(|dates| dates.contains(&file.date)))
        .collect();
    if new_files.is_empty() && existing_dates.is_some() {
        return Ok(None);
    }

    let mut dates = existing_dates.unwrap_or_default();
    dates.extend(new_files.iter().map(|file| file.date));
    let dates: Vec<NaiveDate> = dates.into_iter().collect();

    let (new_rows, dropped) = collect_rows(writer.kind, new_files);
    let mut rows = existing;
    rows.extend(new_rows);
    rows.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));

    writer.write_entries(&path, &rows, &dates)?;
    Ok(Some((path, rows.len(), dropped)))
}

/// Flatten archive lists into entries. A `(date, list, entity)` triple is
/// kept once even when two files publish the same list.
pub fn collect_rows<'a, I>(kind: Kind, files: I) -> (Vec<TrendEntry>, usize)
where
    I: IntoIterator<Item = &'a ArchiveFile>,
{
    let mut seen: HashSet<(NaiveDate, Option<&str>, &str)> = HashSet::new();
    let mut rows = Vec::new();
    let mut dropped = 0;

    for file in files {
        let (ranked, duplicates) = file.ranked_items();
        dropped += duplicates;
        for (rank, key) in ranked {
            if !seen.insert((file.date, file.language.as_deref(), key)) {
                dropped += 1;
                continue;
            }
            rows.push(TrendEntry {
                date: file.date,
                language: file.language.clone(),
                rank,
                entity: EntityKey::new(kind, key),
            });
        }
    }
    rows.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
    (rows, dropped)
}

/// Manifest summary of the whole archive. Row counts are of kept rows.
fn summarize_archive(kind: Kind, files: &[ArchiveFile]) -> ManifestKind {
    let mut dates = BTreeSet::new();
    let mut languages = BTreeSet::new();
    let mut languages_by_date: BTreeMap<String, BTreeSet<Option<String>>> = BTreeMap::new();
    let mut row_counts_by_year: BTreeMap<String, u64> = BTreeMap::new();

    for file in files {
        let date = iso_date(file.date);
        dates.insert(date.clone());
        languages.insert(file.language.clone());
        languages_by_date.entry(date).or_default().insert(file.language.clone());
    }
    for row in collect_rows(kind, files).0 {
        *row_counts_by_year.entry(row.date.year().to_string()).or_default() += 1;
    }

    ManifestKind::from_parts(dates, languages, languages_by_date, row_counts_by_year)
}
