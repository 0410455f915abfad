use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use chrono::NaiveDate;
use regex::Regex;
use serde::Deserialize;
use crate::core::dates::parse_date;
use crate::core::error::{Error, ErrorKind, Result};
use crate::core::types::Kind;

static YEAR_DIR: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").expect("static regex"));

/// One published daily list: `<archive>/<kind>/<YYYY>/<date>/<name>.json`.
#[derive(Debug, Clone)]
pub struct ArchiveFile {
    pub kind: Kind,
    pub path: PathBuf,
    pub date: NaiveDate,
    pub language: Option<String>,   // None = all-languages list
    pub items: Vec<String>,         // Rank order, 1-based by position
}

impl ArchiveFile {
    /// `(rank, key)` pairs with repeated entities removed. The first
    /// (best-ranked) appearance wins; returns the number dropped.
    pub fn ranked_items(&self) -> (Vec<(u32, &str)>, usize) {
        let mut seen = HashSet::new();
        let mut ranked = Vec::with_capacity(self.items.len());
        let mut dropped = 0;
        for (index, item) in self.items.iter().enumerate() {
            if seen.insert(item.as_str()) {
                ranked.push((index as u32 + 1, item.as_str()));
            } else {
                dropped += 1;
                tracing::warn!(
                    path = %self.path.display(),
                    entity = %item,
                    rank = index + 1,
                    "duplicate entity in daily list dropped"
                );
            }
        }
        (ranked, dropped)
    }
}

#[derive(Deserialize)]
struct ArchivePayload {
    date: Option<String>,
    #[serde(default)]
    language: Option<String>,
    list: Option<serde_json::Value>,
}

pub fn read_archive_file(kind: Kind, path: &Path) -> Result<ArchiveFile> {
    let text = fs::read_to_string(path)?;
    let payload: ArchivePayload = serde_json::from_str(&text)
        .map_err(|e| parse_error(path, &e.to_string()))?;

    let (date, list) = match (payload.date, payload.list) {
        (Some(date), Some(list)) => (date, list),
        _ => return Err(parse_error(path, "Archive JSON missing required fields")),
    };
    let date = parse_date(&date).map_err(|e| parse_error(path, &e.context))?;

    let items = match list {
        serde_json::Value::Array(items) => items
            .into_iter()
            .map(|item| match item {
                serde_json::Value::String(s) => s,
                other => other.to_string(),
            })
            .collect(),
        _ => return Err(parse_error(path, "Archive JSON list must be an array")),
    };

    Ok(ArchiveFile {
        kind,
        path: path.to_path_buf(),
        date,
        language: payload.language.filter(|language| !language.is_empty()),
        items,
    })
}

/// Sorted year directories of one kind.
pub fn archive_years(archive_root: &Path, kind: Kind) -> Result<Vec<i32>> {
    let kind_root = kind_root(archive_root, kind)?;
    let mut years = Vec::new();
    for entry in fs::read_dir(&kind_root)? {
        let entry = entry?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else { continue };
        if entry.file_type()?.is_dir() && YEAR_DIR.is_match(name) {
            if let Ok(year) = name.parse() {
                years.push(year);
            }
        }
    }
    years.sort_unstable();
    Ok(years)
}

/// Every archive file of `kind`, or of one year, in path order.
pub fn read_archive(archive_root: &Path, kind: Kind, year: Option<i32>) -> Result<Vec<ArchiveFile>> {
    let kind_root = kind_root(archive_root, kind)?;
    let years = match year {
        Some(year) => vec![year],
        None => archive_years(archive_root, kind)?,
    };

    let mut files = Vec::new();
    for year in years {
        let year_dir = kind_root.join(year.to_string());
        if !year_dir.is_dir() {
            continue;
        }
        for date_dir in sorted_entries(&year_dir)? {
            if !date_dir.is_dir() {
                continue;
            }
            for path in sorted_entries(&date_dir)? {
                if path.extension().is_some_and(|ext| ext == "json") {
                    files.push(read_archive_file(kind, &path)?);
                }
            }
        }
    }
    Ok(files)
}

fn kind_root(archive_root: &Path, kind: Kind) -> Result<PathBuf> {
    let kind_root = archive_root.join(kind.as_str());
    if !kind_root.is_dir() {
        return Err(Error::invalid(format!("Archive kind not found: {}", kind_root.display())));
    }
    Ok(kind_root)
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut paths = fs::read_dir(dir)?
        .map(|entry| entry.map(|entry| entry.path()))
        .collect::<std::io::Result<Vec<_>>>()?;
    paths.sort();
    Ok(paths)
}

fn parse_error(path: &Path, reason: &str) -> Error {
    Error::new(ErrorKind::Parse, format!("{}: {}", reason, path.display()))
}
