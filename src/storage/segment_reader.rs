use std::fs::File;
use std::path::{Path, PathBuf};
use crc32fast::Hasher;
use memmap2::Mmap;
use crate::compression::compress::CompressedBlock;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::{DayPresence, TrendEntry};
use crate::storage::segment::{EntryBlock, PresenceBlock, SegmentHeader, TableKind, MAGIC};

/// Memory-mapped, validated segment. Opening parses only the header; the
/// body is checked and decoded on demand.
pub struct SegmentReader {
    pub path: PathBuf,
    pub header: SegmentHeader,
    mmap: Mmap,
    body_offset: usize,
}

impl SegmentReader {
    /// `Ok(None)` when there is no file: a partition that was never written
    /// is "no data", not an error.
    pub fn open(path: &Path) -> Result<Option<Self>> {
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        let len = file.metadata()?.len() as usize;
        if len < MAGIC.len() + 4 {
            return Err(Self::damaged(path, "file shorter than preamble"));
        }

        // Segments are replaced by rename, never modified in place.
        let mmap = unsafe { Mmap::map(&file)? };

        if &mmap[..4] != MAGIC {
            return Err(Self::damaged(path, "bad magic"));
        }
        let header_len = u32::from_le_bytes([mmap[4], mmap[5], mmap[6], mmap[7]]) as usize;
        let body_offset = 8 + header_len;
        if body_offset > len {
            return Err(Self::damaged(path, "header runs past end of file"));
        }

        let header: SegmentHeader = bincode::deserialize(&mmap[8..body_offset])
            .map_err(|e| Self::damaged(path, &format!("unreadable header: {}", e)))?;

        if header.version != SegmentHeader::VERSION {
            return Err(Self::damaged(
                path,
                &format!("incompatible segment version {}", header.version),
            ));
        }

        Ok(Some(SegmentReader {
            path: path.to_path_buf(),
            header,
            mmap,
            body_offset,
        }))
    }

    pub fn read_entries(&self) -> Result<Vec<TrendEntry>> {
        self.expect_table(TableKind::TrendEntry)?;
        let block: EntryBlock = self.decode_body()?;
        let entries = block.decode(self.header.kind)?;
        self.expect_rows(entries.len())?;
        Ok(entries)
    }

    pub fn read_presence(&self) -> Result<Vec<DayPresence>> {
        self.expect_table(TableKind::DayPresence)?;
        let block: PresenceBlock = self.decode_body()?;
        let rows = block.decode(self.header.kind)?;
        self.expect_rows(rows.len())?;
        Ok(rows)
    }

    fn decode_body<B: serde::de::DeserializeOwned>(&self) -> Result<B> {
        let body = &self.mmap[self.body_offset..];

        let mut hasher = Hasher::new();
        hasher.update(body);
        if hasher.finalize() != self.header.checksum {
            return Err(Self::damaged(&self.path, "checksum mismatch"));
        }

        let raw = CompressedBlock::decompress_raw(
            body,
            self.header.original_size as usize,
            self.header.compression,
        )?;
        bincode::deserialize(&raw)
            .map_err(|e| Self::damaged(&self.path, &format!("undecodable body: {}", e)))
    }

    fn expect_table(&self, table: TableKind) -> Result<()> {
        if self.header.table != table {
            return Err(Self::damaged(
                &self.path,
                &format!("expected {:?} segment, found {:?}", table, self.header.table),
            ));
        }
        Ok(())
    }

    fn expect_rows(&self, rows: usize) -> Result<()> {
        if rows as u64 != self.header.row_count {
            return Err(Self::damaged(
                &self.path,
                &format!("header promises {} rows, body has {}", self.header.row_count, rows),
            ));
        }
        Ok(())
    }

    fn damaged(path: &Path, reason: &str) -> Error {
        Error::new(ErrorKind::Corrupt, format!("{}: {}", path.display(), reason))
    }
}
