use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, Result};

/// Delta encoding for non-decreasing integer columns (sorted day numbers).
pub struct DeltaEncoder;

impl DeltaEncoder {
    /// First value raw (4 bytes LE), then vbyte deltas.
    pub fn encode_u32_list(nums: &[u32]) -> Vec<u8> {
        if nums.is_empty() {
            return Vec::new();
        }

        let mut output = Vec::with_capacity(4 + nums.len());
        output.extend_from_slice(&nums[0].to_le_bytes());

        for pair in nums.windows(2) {
            VByteEncoder::encode_u32(&mut output, pair[1].wrapping_sub(pair[0]));
        }

        output
    }

    pub fn decode_u32_list(data: &[u8]) -> Result<Vec<u32>> {
        if data.is_empty() {
            return Ok(Vec::new());
        }
        if data.len() < 4 {
            return Err(Error::corrupt("Delta block shorter than its base value"));
        }

        let first = u32::from_le_bytes([data[0], data[1], data[2], data[3]]);
        let mut nums = vec![first];
        let mut pos = 4;
        let mut prev = first;

        while pos < data.len() {
            let (delta, consumed) = VByteEncoder::decode_u32(&data[pos..])?;
            let val = prev.wrapping_add(delta);
            nums.push(val);
            prev = val;
            pos += consumed;
        }

        Ok(nums)
    }
}
