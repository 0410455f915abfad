use chrono::{DateTime, NaiveDate, Utc};
use roaring::RoaringBitmap;
use serde::{Deserialize, Serialize};
use crate::compression::compress::CompressionType;
use crate::compression::delta::DeltaEncoder;
use crate::compression::dictionary::DictionaryColumn;
use crate::compression::vbyte::VByteEncoder;
use crate::core::dates::{from_day_number, to_day_number};
use crate::core::error::{Error, Result};
use crate::core::types::{DayPresence, EntityKey, Kind, TrendEntry};

pub const MAGIC: &[u8; 4] = b"TRND";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TableKind {
    TrendEntry,
    DayPresence,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentMetadata {
    pub year: i32,
    pub dates: Vec<NaiveDate>,          // Distinct dates present, ascending
    pub created_at: DateTime<Utc>,
    pub source_checksum: Option<u32>,   // Rollups: checksum of the columnar segment read
}

/// Segment file header
// [ MAGIC "TRND" ][ header_len u32 LE ][ header (bincode) ][ body (compressed column block) ]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SegmentHeader {
    pub version: u32,
    pub table: TableKind,
    pub kind: Kind,
    pub row_count: u64,
    pub compression: CompressionType,
    pub original_size: u64,
    pub checksum: u32,      // CRC32 of the compressed body
    pub metadata: SegmentMetadata,
}

impl SegmentHeader {
    pub const VERSION: u32 = 1;
}

/// Column block of a trend entry segment. Rows are stored in
/// `(date, language, rank)` order so the date column delta-encodes to
/// mostly zero bytes.
#[derive(Debug, Serialize, Deserialize)]
pub struct EntryBlock {
    pub dates: Vec<u8>,
    pub languages: DictionaryColumn,
    pub ranks: Vec<u8>,
    pub entities: DictionaryColumn,
}

impl EntryBlock {
    pub fn encode(entries: &[TrendEntry]) -> Self {
        let days: Vec<u32> = entries.iter().map(|e| to_day_number(e.date)).collect();
        let ranks: Vec<u32> = entries.iter().map(|e| e.rank).collect();
        EntryBlock {
            dates: DeltaEncoder::encode_u32_list(&days),
            languages: DictionaryColumn::encode(entries.iter().map(|e| e.language.as_deref())),
            ranks: VByteEncoder::encode_u32_list(&ranks),
            entities: DictionaryColumn::encode(entries.iter().map(|e| Some(e.entity.key()))),
        }
    }

    pub fn decode(&self, kind: Kind) -> Result<Vec<TrendEntry>> {
        let days = DeltaEncoder::decode_u32_list(&self.dates)?;
        let languages = self.languages.decode()?;
        let ranks = VByteEncoder::decode_u32_list(&self.ranks)?;
        let entities = self.entities.decode()?;

        let rows = days.len();
        if languages.len() != rows || ranks.len() != rows || entities.len() != rows {
            return Err(Error::corrupt("Entry columns have different lengths"));
        }

        let mut entries = Vec::with_capacity(rows);
        for i in 0..rows {
            let key = entities[i].ok_or_else(|| Error::corrupt("Null entity key"))?;
            entries.push(TrendEntry {
                date: from_day_number(days[i])?,
                language: languages[i].map(str::to_string),
                rank: ranks[i],
                entity: EntityKey::new(kind, key),
            });
        }
        Ok(entries)
    }
}

/// Column block of a day presence rollup segment.
#[derive(Debug, Serialize, Deserialize)]
pub struct PresenceBlock {
    pub dates: Vec<u8>,
    pub entities: DictionaryColumn,
    pub best_rank_any: Vec<u8>,
    pub best_rank_non_null: Vec<u8>,    // 0 = no language-specific entry
    pub language_counts: Vec<u8>,
    pub has_all_languages: Vec<u8>,     // Serialized bitmap of row indexes
}

impl PresenceBlock {
    pub fn encode(rows: &[DayPresence]) -> Result<Self> {
        let days: Vec<u32> = rows.iter().map(|r| to_day_number(r.date)).collect();
        let best_any: Vec<u32> = rows.iter().map(|r| r.best_rank_any).collect();
        let best_non_null: Vec<u32> = rows.iter().map(|r| r.best_rank_non_null.unwrap_or(0)).collect();
        let counts: Vec<u32> = rows.iter().map(|r| r.distinct_language_count).collect();

        let mut with_all = RoaringBitmap::new();
        for (i, row) in rows.iter().enumerate() {
            if row.has_all_languages_entry {
                with_all.insert(i as u32);
            }
        }
        let mut bitmap = Vec::with_capacity(with_all.serialized_size());
        with_all.serialize_into(&mut bitmap)?;

        Ok(PresenceBlock {
            dates: DeltaEncoder::encode_u32_list(&days),
            entities: DictionaryColumn::encode(rows.iter().map(|r| Some(r.entity.key()))),
            best_rank_any: VByteEncoder::encode_u32_list(&best_any),
            best_rank_non_null: VByteEncoder::encode_u32_list(&best_non_null),
            language_counts: VByteEncoder::encode_u32_list(&counts),
            has_all_languages: bitmap,
        })
    }

    pub fn decode(&self, kind: Kind) -> Result<Vec<DayPresence>> {
        let days = DeltaEncoder::decode_u32_list(&self.dates)?;
        let entities = self.entities.decode()?;
        let best_any = VByteEncoder::decode_u32_list(&self.best_rank_any)?;
        let best_non_null = VByteEncoder::decode_u32_list(&self.best_rank_non_null)?;
        let counts = VByteEncoder::decode_u32_list(&self.language_counts)?;
        let with_all = RoaringBitmap::deserialize_from(&self.has_all_languages[..])
            .map_err(|e| Error::corrupt(format!("Presence bitmap: {}", e)))?;

        let rows = days.len();
        if entities.len() != rows
            || best_any.len() != rows
            || best_non_null.len() != rows
            || counts.len() != rows
        {
            return Err(Error::corrupt("Presence columns have different lengths"));
        }

        let mut presence = Vec::with_capacity(rows);
        for i in 0..rows {
            let key = entities[i].ok_or_else(|| Error::corrupt("Null entity key"))?;
            presence.push(DayPresence {
                date: from_day_number(days[i])?,
                entity: EntityKey::new(kind, key),
                best_rank_any: best_any[i],
                best_rank_non_null: (best_non_null[i] != 0).then_some(best_non_null[i]),
                distinct_language_count: counts[i],
                has_all_languages_entry: with_all.contains(i as u32),
            });
        }
        Ok(presence)
    }
}
