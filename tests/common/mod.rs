#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tempfile::TempDir;
use trendlens::compression::compress::CompressionType;
use trendlens::ingest::builder::{build_kind, BuildOptions};
use trendlens::ingest::rollup::rollup_kind;
use trendlens::storage::layout::StorageLayout;
use trendlens::{Config, Kind};

/// A temporary archive plus the analytics root built from it.
pub struct Fixture {
    pub dir: TempDir,
    pub archive: PathBuf,
    pub analytics: PathBuf,
}

impl Fixture {
    pub fn empty() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let archive = dir.path().join("archive");
        let analytics = dir.path().join("analytics");
        Fixture { dir, archive, analytics }
    }

    /// The small two-day archive the examples in the docs use.
    pub fn standard() -> Self {
        let fixture = Self::empty();
        fixture.write_list(Kind::Repository, "2025-01-01", None, &["alpha/one", "beta/two"]);
        fixture.write_list(Kind::Repository, "2025-01-01", Some("python"), &["alpha/one", "gamma/three"]);
        fixture.write_list(Kind::Repository, "2025-01-01", Some("c++"), &["beta/two"]);
        fixture.write_list(Kind::Repository, "2025-01-02", None, &["alpha/one", "delta/four"]);
        fixture.write_list(Kind::Repository, "2025-01-02", Some("python"), &["alpha/one", "beta/two"]);
        fixture.write_list(Kind::Repository, "2025-01-02", Some("c#"), &["delta/four", "gamma/three"]);

        fixture.write_list(Kind::Developer, "2025-01-01", None, &["octo", "mona"]);
        fixture.write_list(Kind::Developer, "2025-01-01", Some("python"), &["octo"]);
        fixture.write_list(Kind::Developer, "2025-01-01", Some("rust"), &["ferris", "mona"]);
        fixture.write_list(Kind::Developer, "2025-01-02", None, &["mona", "ferris"]);
        fixture.write_list(Kind::Developer, "2025-01-02", Some("python"), &["octo"]);
        fixture.write_list(Kind::Developer, "2025-01-02", Some("rust"), &["ferris"]);
        fixture
    }

    pub fn write_list(&self, kind: Kind, date: &str, language: Option<&str>, items: &[&str]) {
        let name = match language {
            Some(language) => file_name(language),
            None => "all".to_string(),
        };
        let path = self
            .archive
            .join(kind.as_str())
            .join(&date[..4])
            .join(date)
            .join(format!("{}.json", name));
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let body = serde_json::json!({
            "date": date,
            "language": language.unwrap_or(""),
            "list": items,
        });
        fs::write(path, serde_json::to_string_pretty(&body).unwrap()).unwrap();
    }

    pub fn layout(&self) -> StorageLayout {
        StorageLayout::create(&self.analytics).unwrap()
    }

    pub fn build(&self) -> &Self {
        for kind in Kind::ALL {
            if self.archive.join(kind.as_str()).is_dir() {
                let options = BuildOptions { rebuild_year: true, ..BuildOptions::default() };
                build_kind(&self.archive, &self.layout(), kind, &options).unwrap();
            }
        }
        self
    }

    pub fn rollup(&self) -> &Self {
        for kind in Kind::ALL {
            if !self.layout().columnar_years(kind).unwrap().is_empty() {
                rollup_kind(&self.layout(), kind, None, CompressionType::Lz4).unwrap();
            }
        }
        self
    }

    pub fn config(&self, use_rollups: bool) -> Config {
        Config {
            use_rollups,
            prewarm_workers: 1,
            ..Config::with_root(&self.analytics)
        }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
}

/// Language names like `c++` and `c#` as file names.
fn file_name(language: &str) -> String {
    language.replace('+', "plus").replace('#', "sharp")
}

pub const LANGUAGES: [&str; 4] = ["python", "rust", "go", "c++"];

/// A seeded archive of `days` consecutive days starting 2024-12-20, so
/// windows cross a year boundary. Some days are skipped and some
/// entities show up in several lists of the same day.
pub fn random_archive(fixture: &Fixture, seed: u64, days: u32) {
    let mut rng = StdRng::seed_from_u64(seed);
    let start = chrono::NaiveDate::from_ymd_opt(2024, 12, 20).unwrap();
    let repos: Vec<String> = (0..24).map(|i| format!("owner{}/repo{}", i % 6, i)).collect();
    let devs: Vec<String> = (0..16).map(|i| format!("dev{}", i)).collect();

    for offset in 0..days {
        if rng.gen_range(0..7) == 0 {
            continue;
        }
        let date = start + chrono::Days::new(u64::from(offset));
        let date = date.format("%Y-%m-%d").to_string();
        for (kind, pool) in [(Kind::Repository, &repos), (Kind::Developer, &devs)] {
            let mut views: Vec<Option<&str>> = vec![None];
            views.extend(LANGUAGES.iter().filter(|_| rng.gen_range(0..3) > 0).map(|l| Some(*l)));
            for view in views {
                let len = rng.gen_range(0..8);
                let mut picked: Vec<&str> = Vec::new();
                while picked.len() < len {
                    let candidate = pool[rng.gen_range(0..pool.len())].as_str();
                    if !picked.contains(&candidate) {
                        picked.push(candidate);
                    }
                }
                fixture.write_list(kind, &date, view, &picked);
            }
        }
    }
}
