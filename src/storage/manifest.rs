use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::io::Write;
use std::path::Path;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use tempfile::NamedTempFile;
use crate::core::error::{Error, Result};
use crate::core::types::Kind;

/// Denormalized summary of one dataset kind.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ManifestKind {
    #[serde(default)]
    pub min_date: Option<String>,
    #[serde(default)]
    pub max_date: Option<String>,
    #[serde(default)]
    pub dates: Vec<String>,
    #[serde(default)]
    pub languages: Vec<Option<String>>,
    #[serde(default)]
    pub languages_by_date: BTreeMap<String, Vec<Option<String>>>,
    #[serde(default)]
    pub row_counts_by_year: BTreeMap<String, u64>,
}

impl ManifestKind {
    pub fn from_parts(
        dates: BTreeSet<String>,
        languages: BTreeSet<Option<String>>,
        languages_by_date: BTreeMap<String, BTreeSet<Option<String>>>,
        row_counts_by_year: BTreeMap<String, u64>,
    ) -> Self {
        let dates: Vec<String> = dates.into_iter().collect();
        ManifestKind {
            min_date: dates.first().cloned(),
            max_date: dates.last().cloned(),
            dates,
            languages: sort_languages(languages),
            languages_by_date: languages_by_date
                .into_iter()
                .map(|(date, languages)| (date, sort_languages(languages)))
                .collect(),
            row_counts_by_year,
        }
    }

    /// Languages known for `date`, falling back to every known language
    /// when the date has no entry.
    pub fn languages_for(&self, date: &str) -> &[Option<String>] {
        self.languages_by_date
            .get(date)
            .map(Vec::as_slice)
            .unwrap_or(&self.languages)
    }

    pub fn neighbors(&self, date: &str) -> (Option<&str>, Option<&str>) {
        match self.dates.binary_search_by(|known| known.as_str().cmp(date)) {
            Ok(idx) => (
                idx.checked_sub(1).map(|prev| self.dates[prev].as_str()),
                self.dates.get(idx + 1).map(String::as_str),
            ),
            Err(_) => (None, None),
        }
    }
}

/// Specific languages in name order; the all-languages entry (`None`) last.
pub fn sort_languages(languages: BTreeSet<Option<String>>) -> Vec<Option<String>> {
    let mut sorted: Vec<Option<String>> = languages.into_iter().collect();
    sorted.sort_by(|a, b| match (a, b) {
        (None, None) => std::cmp::Ordering::Equal,
        (None, Some(_)) => std::cmp::Ordering::Greater,
        (Some(_), None) => std::cmp::Ordering::Less,
        (Some(a), Some(b)) => a.cmp(b),
    });
    sorted
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Manifest {
    pub generated_at: String,
    #[serde(default)]
    pub kinds: BTreeMap<String, ManifestKind>,
}

impl Manifest {
    pub fn empty() -> Self {
        Manifest { generated_at: utc_now_iso(), kinds: BTreeMap::new() }
    }

    /// A missing manifest is an empty one.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::empty());
        }
        let text = fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| Error::from(e).with_hint(Some(path.display().to_string())))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let parent = path
            .parent()
            .ok_or_else(|| Error::internal(format!("Manifest path has no parent: {}", path.display())))?;
        fs::create_dir_all(parent)?;

        // Round-trip through Value so object keys come out sorted
        let value = serde_json::to_value(self)?;
        let mut file = NamedTempFile::new_in(parent)?;
        file.write_all(serde_json::to_string_pretty(&value)?.as_bytes())?;
        file.persist(path).map_err(|e| e.error)?;
        Ok(())
    }

    pub fn kind(&self, kind: Kind) -> Option<&ManifestKind> {
        self.kinds.get(kind.as_str())
    }

    pub fn update_kind(&mut self, kind: Kind, summary: ManifestKind) {
        self.kinds.insert(kind.as_str().to_string(), summary);
        self.generated_at = utc_now_iso();
    }
}

fn utc_now_iso() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true)
}
