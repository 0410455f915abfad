use std::fs;
use std::path::{Path, PathBuf};
use crate::core::error::Result;
use crate::core::types::Kind;

/// Directory structure under the analytics root
#[derive(Debug, Clone)]
pub struct StorageLayout {
    pub base_dir: PathBuf,      // Analytics root
    pub columnar_dir: PathBuf,  // Raw trend entries, one segment per kind/year
    pub rollups_dir: PathBuf,   // Day presence rollups, one segment per kind/year
}

impl StorageLayout {
    /// Describe the layout without touching the filesystem. Readers use
    /// this; a missing directory simply means "no data".
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        let base_dir = base_dir.into();
        StorageLayout {
            columnar_dir: base_dir.join("columnar"),
            rollups_dir: base_dir.join("rollups"),
            base_dir,
        }
    }

    /// Layout for writers: creates the top-level directories.
    pub fn create(base_dir: impl Into<PathBuf>) -> Result<Self> {
        let layout = Self::new(base_dir);
        fs::create_dir_all(&layout.columnar_dir)?;
        fs::create_dir_all(&layout.rollups_dir)?;
        Ok(layout)
    }

    pub fn columnar_path(&self, kind: Kind, year: i32) -> PathBuf {
        self.columnar_dir
            .join(kind.as_str())
            .join(format!("year={}", year))
            .join(format!("{}.seg", kind.entry_table()))
    }

    pub fn rollup_path(&self, kind: Kind, year: i32) -> PathBuf {
        self.rollups_dir
            .join(kind.as_str())
            .join(format!("year={}", year))
            .join(format!("{}.seg", kind.rollup_table()))
    }

    pub fn manifest_path(&self) -> PathBuf {
        self.base_dir.join("manifest.json")
    }

    pub fn lock_path(&self) -> PathBuf {
        self.base_dir.join(".lock")
    }

    pub fn columnar_years(&self, kind: Kind) -> Result<Vec<i32>> {
        Self::years_under(&self.columnar_dir.join(kind.as_str()))
    }

    pub fn rollup_years(&self, kind: Kind) -> Result<Vec<i32>> {
        Self::years_under(&self.rollups_dir.join(kind.as_str()))
    }

    /// Sorted years of `year=YYYY` partitions below `dir`.
    fn years_under(dir: &Path) -> Result<Vec<i32>> {
        if !dir.exists() {
            return Ok(Vec::new());
        }
        let mut years = Vec::new();
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let name = entry.file_name();
            if let Some(year) = name
                .to_str()
                .and_then(|name| name.strip_prefix("year="))
                .and_then(|year| year.parse::<i32>().ok())
            {
                years.push(year);
            }
        }
        years.sort_unstable();
        Ok(years)
    }
}
