use std::collections::HashMap;
use serde::{Serialize, Deserialize};
use crate::compression::vbyte::VByteEncoder;
use crate::core::error::{Error, Result};

/// Dictionary-encoded string column. Nullable values use id 0; real
/// values are stored at `id - 1` in `values`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DictionaryColumn {
    pub values: Vec<String>,
    pub ids: Vec<u8>,   // vbyte ids, one per row
}

impl DictionaryColumn {
    pub fn encode<'a, I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Option<&'a str>>,
    {
        let mut lookup: HashMap<&'a str, u32> = HashMap::new();
        let mut values = Vec::new();
        let mut ids = Vec::new();

        for row in rows {
            let id = match row {
                None => 0,
                Some(value) => *lookup.entry(value).or_insert_with(|| {
                    values.push(value.to_string());
                    values.len() as u32
                }),
            };
            VByteEncoder::encode_u32(&mut ids, id);
        }

        DictionaryColumn { values, ids }
    }

    pub fn decode(&self) -> Result<Vec<Option<&str>>> {
        VByteEncoder::decode_u32_list(&self.ids)?
            .into_iter()
            .map(|id| match id {
                0 => Ok(None),
                id => self
                    .values
                    .get(id as usize - 1)
                    .map(|value| Some(value.as_str()))
                    .ok_or_else(|| Error::corrupt(format!("Dictionary id {} out of range", id))),
            })
            .collect()
    }
}
