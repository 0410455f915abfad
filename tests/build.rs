mod common;

use trendlens::compression::compress::CompressionType;
use trendlens::ingest::builder::{build_kind, BuildOptions};
use trendlens::ingest::rollup::rollup_kind;
use trendlens::query::types::DayParams;
use trendlens::storage::file_lock::FileLock;
use trendlens::storage::manifest::Manifest;
use trendlens::{ErrorKind, Kind, LanguageView, QueryEngine};
use common::Fixture;

fn append(fixture: &Fixture, kind: Kind) -> trendlens::Result<trendlens::ingest::builder::BuildResult> {
    build_kind(&fixture.archive, &fixture.layout(), kind, &BuildOptions::default())
}

fn python_day(fixture: &Fixture, date: &str) -> Vec<String> {
    let engine = QueryEngine::open(&fixture.config(false));
    engine
        .get_day(&DayParams {
            kind: Kind::Repository,
            date: date.parse().unwrap(),
            language: LanguageView::parse("python"),
        })
        .unwrap()
        .entries
        .into_iter()
        .map(|e| e.entity.key().to_string())
        .collect()
}

#[test]
fn manifest_describes_the_archive() {
    let fixture = Fixture::standard();
    fixture.build();

    let manifest = Manifest::load(&fixture.layout().manifest_path()).unwrap();
    let repos = manifest.kind(Kind::Repository).unwrap();
    assert_eq!(repos.dates, vec!["2025-01-01", "2025-01-02"]);
    assert_eq!(repos.min_date.as_deref(), Some("2025-01-01"));
    assert_eq!(repos.max_date.as_deref(), Some("2025-01-02"));
    assert_eq!(
        repos.languages,
        vec![Some("c#".to_string()), Some("c++".to_string()), Some("python".to_string()), None]
    );
    assert_eq!(
        repos.languages_for("2025-01-01"),
        &[Some("c++".to_string()), Some("python".to_string()), None]
    );
    assert_eq!(repos.row_counts_by_year.get("2025"), Some(&11));
    assert!(manifest.kind(Kind::Developer).is_some());
}

#[test]
fn append_adds_only_new_dates() {
    let fixture = Fixture::standard();
    fixture.build();

    let unchanged = append(&fixture, Kind::Repository).unwrap();
    assert!(unchanged.segment_paths.is_empty());
    assert_eq!(unchanged.rows_written, 0);

    fixture.write_list(Kind::Repository, "2025-01-03", None, &["alpha/one"]);
    // Edits to an already built date are not picked up by an append.
    fixture.write_list(Kind::Repository, "2025-01-01", Some("python"), &["zeta/nine"]);
    let appended = append(&fixture, Kind::Repository).unwrap();
    assert_eq!(appended.segment_paths, vec![fixture.layout().columnar_path(Kind::Repository, 2025)]);
    assert_eq!(appended.rows_written, 12);
    assert_eq!(python_day(&fixture, "2025-01-01"), vec!["alpha/one", "gamma/three"]);

    let rebuilt = build_kind(
        &fixture.archive,
        &fixture.layout(),
        Kind::Repository,
        &BuildOptions { year: Some(2025), rebuild_year: true, compression: CompressionType::Zstd },
    )
    .unwrap();
    assert_eq!(rebuilt.years_built, vec![2025]);
    assert_eq!(rebuilt.rows_written, 11);
    assert_eq!(python_day(&fixture, "2025-01-01"), vec!["zeta/nine"]);
}

#[test]
fn repeated_entities_are_dropped() {
    let fixture = Fixture::empty();
    fixture.write_list(Kind::Developer, "2025-03-01", Some("go"), &["gopher", "gopher", "mona"]);
    let result = append(&fixture, Kind::Developer).unwrap();
    assert_eq!(result.rows_written, 2);
    assert_eq!(result.duplicates_dropped, 1);
}

#[test]
fn concurrent_builds_are_refused() {
    let fixture = Fixture::standard();
    let layout = fixture.layout();
    let lock = FileLock::acquire(&layout).unwrap();

    let err = append(&fixture, Kind::Repository).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Io);
    let err = rollup_kind(&layout, Kind::Repository, None, CompressionType::Lz4).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Io);

    drop(lock);
    assert!(append(&fixture, Kind::Repository).is_ok());
}

#[test]
fn missing_inputs_are_invalid() {
    let fixture = Fixture::empty();
    assert_eq!(append(&fixture, Kind::Repository).unwrap_err().kind, ErrorKind::InvalidRequest);

    let err = rollup_kind(&fixture.layout(), Kind::Repository, None, CompressionType::Lz4).unwrap_err();
    assert_eq!(err.kind, ErrorKind::InvalidRequest);
}

#[test]
fn rollup_from_date_limits_years() {
    let fixture = Fixture::standard();
    fixture.write_list(Kind::Repository, "2024-12-31", None, &["alpha/one"]);
    fixture.build();

    let all = rollup_kind(&fixture.layout(), Kind::Repository, None, CompressionType::Lz4).unwrap();
    assert_eq!(all.years_built, vec![2024, 2025]);

    let recent = rollup_kind(
        &fixture.layout(),
        Kind::Repository,
        Some("2025-01-02".parse().unwrap()),
        CompressionType::Lz4,
    )
    .unwrap();
    assert_eq!(recent.years_built, vec![2025]);
    assert_eq!(recent.segment_paths, vec![fixture.layout().rollup_path(Kind::Repository, 2025)]);
}

#[test]
fn empty_lists_keep_their_date() {
    let fixture = Fixture::empty();
    fixture.write_list(Kind::Developer, "2025-02-01", None, &[]);
    fixture.build();

    let manifest = Manifest::load(&fixture.layout().manifest_path()).unwrap();
    assert_eq!(manifest.kind(Kind::Developer).unwrap().dates, vec!["2025-02-01"]);

    let unchanged = append(&fixture, Kind::Developer).unwrap();
    assert!(unchanged.segment_paths.is_empty());

    let rolled = rollup_kind(&fixture.layout(), Kind::Developer, None, CompressionType::Lz4).unwrap();
    assert_eq!(rolled.years_built, vec![2025]);
    assert_eq!(rolled.rows_written, 0);

    for use_rollups in [false, true] {
        let engine = QueryEngine::open(&fixture.config(use_rollups));
        let day = engine
            .get_day(&DayParams {
                kind: Kind::Developer,
                date: "2025-02-01".parse().unwrap(),
                language: LanguageView::AllAggregate,
            })
            .unwrap();
        assert!(day.entries.is_empty());
    }
}
