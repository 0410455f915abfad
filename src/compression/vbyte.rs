use crate::core::error::{Error, ErrorKind, Result};

/// Variable byte encoding for integers (best for small integers)
pub struct VByteEncoder;

impl VByteEncoder {
    /// Encode single u32 value
    /// Values < 128 use 1 byte, < 16384 use 2 bytes, etc.
    pub fn encode_u32(output: &mut Vec<u8>, mut value: u32) {
        while value >= 128 {
            output.push((value & 127) as u8 | 128);  // Set continuation bit
            value >>= 7;
        }
        output.push(value as u8);
    }

    pub fn encode_u32_list(nums: &[u32]) -> Vec<u8> {
        let mut output = Vec::with_capacity(nums.len());
        for &num in nums {
            Self::encode_u32(&mut output, num);
        }
        output
    }

    /// Decode single u32 value, returns (value, bytes_consumed)
    pub fn decode_u32(input: &[u8]) -> Result<(u32, usize)> {
        let mut value = 0u32;
        let mut shift = 0;
        let mut consumed = 0;

        for &byte in input {
            consumed += 1;
            value |= ((byte & 127) as u32) << shift;

            if byte & 128 == 0 {
                return Ok((value, consumed));
            }

            shift += 7;
            if shift > 28 {  // Max 5 bytes for u32
                return Err(Error::new(ErrorKind::Corrupt, "VByte overflow".to_string()));
            }
        }

        Err(Error::new(ErrorKind::Corrupt, "Incomplete VByte".to_string()))
    }

    pub fn decode_u32_list(data: &[u8]) -> Result<Vec<u32>> {
        let mut nums = Vec::new();
        let mut pos = 0;

        while pos < data.len() {
            let (value, consumed) = Self::decode_u32(&data[pos..])?;
            nums.push(value);
            pos += consumed;
        }

        Ok(nums)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn small_values_take_one_byte() {
        assert_eq!(VByteEncoder::encode_u32_list(&[1, 2, 127]).len(), 3);
        assert_eq!(VByteEncoder::encode_u32_list(&[128]).len(), 2);
    }

    #[test]
    fn truncated_input_is_corrupt() {
        let mut bytes = VByteEncoder::encode_u32_list(&[300]);
        bytes.pop();
        let err = VByteEncoder::decode_u32_list(&bytes).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Corrupt);
    }

    #[test]
    fn decodes_max_value() {
        let bytes = VByteEncoder::encode_u32_list(&[u32::MAX, 0]);
        assert_eq!(VByteEncoder::decode_u32_list(&bytes).unwrap(), vec![u32::MAX, 0]);
    }
}
