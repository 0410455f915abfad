use std::str::FromStr;
use serde::{Serialize, Deserialize};
use crate::core::error::{Error, ErrorKind, Result};

/// An LZ4 sequence expands to at most 255 bytes per input byte.
const LZ4_MAX_RATIO: usize = 255;

/// Compressed block storage for segment bodies
#[derive(Debug)]
pub struct CompressedBlock {
    pub data: Vec<u8>,
    pub original_size: usize,
    pub compression: CompressionType,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    Lz4,      // Fast, used for hot years
    Zstd,     // Better ratio for archival years
}

impl FromStr for CompressionType {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "none" => Ok(CompressionType::None),
            "lz4" => Ok(CompressionType::Lz4),
            "zstd" => Ok(CompressionType::Zstd),
            other => Err(Error::invalid(format!("Unknown compression: {}", other))),
        }
    }
}

impl CompressedBlock {
    pub fn compress(data: &[u8], compression: CompressionType) -> Result<Self> {
        let compressed = match compression {
            CompressionType::None => data.to_vec(),
            CompressionType::Lz4 => lz4_flex::block::compress(data),
            CompressionType::Zstd => zstd::encode_all(data, 3)?,  // Level 3 is balanced
        };

        Ok(CompressedBlock {
            data: compressed,
            original_size: data.len(),
            compression,
        })
    }

    /// Decompress a body read back from disk. Any codec failure means the
    /// file is damaged.
    pub fn decompress_raw(
        data: &[u8],
        original_size: usize,
        compression: CompressionType,
    ) -> Result<Vec<u8>> {
        // The header size sizes the LZ4 output buffer, so reject sizes no
        // body of this length could expand to before allocating.
        let max_size = match compression {
            CompressionType::None => data.len(),
            CompressionType::Lz4 => data.len().saturating_mul(LZ4_MAX_RATIO).saturating_add(16),
            CompressionType::Zstd => usize::MAX,
        };
        if original_size > max_size {
            return Err(Error::corrupt(format!(
                "Header size {} is impossible for a {} byte {:?} body",
                original_size,
                data.len(),
                compression
            )));
        }

        let raw = match compression {
            CompressionType::None => data.to_vec(),
            CompressionType::Lz4 => lz4_flex::block::decompress(data, original_size)
                .map_err(|e| Error::new(ErrorKind::Corrupt, format!("LZ4: {}", e)))?,
            CompressionType::Zstd => zstd::decode_all(data)
                .map_err(|e| Error::new(ErrorKind::Corrupt, format!("Zstd: {}", e)))?,
        };

        if raw.len() != original_size {
            return Err(Error::corrupt(format!(
                "Decompressed size {} does not match header size {}",
                raw.len(),
                original_size
            )));
        }
        Ok(raw)
    }

    pub fn decompress(&self) -> Result<Vec<u8>> {
        Self::decompress_raw(&self.data, self.original_size, self.compression)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_codec_restores_input() {
        let data: Vec<u8> = b"alpha/one python 1 ".iter().cycle().take(4096).copied().collect();
        for codec in [CompressionType::None, CompressionType::Lz4, CompressionType::Zstd] {
            let block = CompressedBlock::compress(&data, codec).unwrap();
            assert_eq!(block.decompress().unwrap(), data);
        }
    }

    #[test]
    fn garbage_is_reported_as_corrupt() {
        let err = CompressedBlock::decompress_raw(b"not lz4 at all", 1024, CompressionType::Lz4)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Corrupt);
    }

    #[test]
    fn oversized_header_size_is_rejected_before_decoding() {
        let block = CompressedBlock::compress(b"alpha/one", CompressionType::Lz4).unwrap();
        let err = CompressedBlock::decompress_raw(&block.data, usize::MAX / 2, CompressionType::Lz4)
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::Corrupt);

        let err = CompressedBlock::decompress_raw(b"abc", 4, CompressionType::None).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Corrupt);
    }

    #[test]
    fn parses_codec_names() {
        assert_eq!("zstd".parse::<CompressionType>().unwrap(), CompressionType::Zstd);
        assert!("snappy".parse::<CompressionType>().is_err());
    }
}
