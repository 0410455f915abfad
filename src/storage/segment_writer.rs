use std::fs;
use std::io::Write;
use std::path::Path;
use chrono::{NaiveDate, Utc};
use crc32fast::Hasher;
use serde::Serialize;
use tempfile::NamedTempFile;
use crate::compression::compress::{CompressedBlock, CompressionType};
use crate::core::error::{Error, Result};
use crate::core::types::{DayPresence, Kind, TrendEntry};
use crate::storage::segment::{
    EntryBlock, PresenceBlock, SegmentHeader, SegmentMetadata, TableKind, MAGIC,
};

pub struct SegmentWriter {
    pub kind: Kind,
    pub year: i32,
    pub compression: CompressionType,
}

impl SegmentWriter {
    pub fn new(kind: Kind, year: i32, compression: CompressionType) -> Self {
        SegmentWriter { kind, year, compression }
    }

    /// Write a columnar segment. `entries` must already be in
    /// `(date, language, rank)` order. `archived` dates are recorded in the
    /// header with the row dates, so a day whose lists were all empty stays
    /// a known date.
    pub fn write_entries(
        &self,
        path: &Path,
        entries: &[TrendEntry],
        archived: &[NaiveDate],
    ) -> Result<SegmentHeader> {
        let mut dates: Vec<NaiveDate> =
            entries.iter().map(|e| e.date).chain(archived.iter().copied()).collect();
        dates.sort_unstable();
        dates.dedup();
        let block = EntryBlock::encode(entries);
        self.write_block(path, TableKind::TrendEntry, entries.len(), dates, None, &block)
    }

    /// Write a rollup segment derived from the columnar segment whose
    /// checksum is `source_checksum` and whose header lists `archived`.
    pub fn write_presence(
        &self,
        path: &Path,
        rows: &[DayPresence],
        archived: &[NaiveDate],
        source_checksum: u32,
    ) -> Result<SegmentHeader> {
        let mut dates: Vec<NaiveDate> =
            rows.iter().map(|r| r.date).chain(archived.iter().copied()).collect();
        dates.sort_unstable();
        dates.dedup();
        let block = PresenceBlock::encode(rows)?;
        self.write_block(path, TableKind::DayPresence, rows.len(), dates, Some(source_checksum), &block)
    }

    // [ MAGIC ][ header_len ][ HEADER ][ BODY ] <- written to a temp file,
    // then renamed over `path` so readers never observe a partial file
    fn write_block<B: Serialize>(
        &self,
        path: &Path,
        table: TableKind,
        row_count: usize,
        dates: Vec<NaiveDate>,
        source_checksum: Option<u32>,
        block: &B,
    ) -> Result<SegmentHeader> {
        let raw = bincode::serialize(block)?;
        let compressed = CompressedBlock::compress(&raw, self.compression)?;

        let mut hasher = Hasher::new();
        hasher.update(&compressed.data);

        let header = SegmentHeader {
            version: SegmentHeader::VERSION,
            table,
            kind: self.kind,
            row_count: row_count as u64,
            compression: self.compression,
            original_size: compressed.original_size as u64,
            checksum: hasher.finalize(),
            metadata: SegmentMetadata {
                year: self.year,
                dates,
                created_at: Utc::now(),
                source_checksum,
            },
        };
        let header_data = bincode::serialize(&header)?;

        let parent = path
            .parent()
            .ok_or_else(|| Error::internal(format!("Segment path has no parent: {}", path.display())))?;
        fs::create_dir_all(parent)?;

        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(MAGIC)?;
        file.write_all(&(header_data.len() as u32).to_le_bytes())?;
        file.write_all(&header_data)?;
        file.write_all(&compressed.data)?;
        file.as_file().sync_all()?;
        file.persist(path).map_err(|e| e.error)?;

        tracing::debug!(
            path = %path.display(),
            kind = %self.kind,
            year = self.year,
            rows = row_count,
            "segment written"
        );
        Ok(header)
    }
}
