mod common;

use std::fs;
use std::sync::Arc;
use std::time::Duration;
use trendlens::query::types::QueryOutput;
use trendlens::{ErrorKind, Kind, TrendService, WindowRequest};
use common::Fixture;

const WAIT: Duration = Duration::from_secs(10);

fn service(fixture: &Fixture) -> TrendService {
    fixture.build().rollup();
    TrendService::open(&fixture.config(true)).unwrap()
}

fn window<'a>(kind: &'a str, start: &'a str, end: &'a str) -> WindowRequest<'a> {
    WindowRequest {
        kind: Some(kind),
        start,
        end,
        ..WindowRequest::default()
    }
}

#[test]
fn day_miss_prewarms_neighbouring_days() {
    let fixture = Fixture::standard();
    let service = service(&fixture);

    let output = service.day("repository", "2025-01-01", Some("python")).unwrap();
    let QueryOutput::Day(snapshot) = output.as_ref() else {
        panic!("expected a daily list, got {:?}", output);
    };
    assert_eq!(snapshot.entries.len(), 2);

    assert!(service.wait_for_prewarm(WAIT));
    let stats = service.cache_stats();
    assert_eq!(stats.miss_count, 1);
    assert_eq!(stats.prewarm_success, 2);
    assert_eq!(stats.prewarm_failure, 0);
    assert_eq!(stats.size, 3);

    service.day("repository", "2025-01-02", Some("python")).unwrap();
    service.day("repository", "2025-01-02", None).unwrap();
    let stats = service.cache_stats();
    assert_eq!(stats.hit_count, 2);
    assert_eq!(stats.miss_count, 1);
}

#[test]
fn prewarm_failure_only_moves_the_counter() {
    let fixture = Fixture::empty();
    fixture.write_list(Kind::Repository, "2024-12-31", None, &["alpha/one"]);
    fixture.write_list(Kind::Repository, "2025-01-01", None, &["alpha/one", "beta/two"]);
    let layout = fixture.layout();
    fixture.build();

    // Damage the body of the 2024 segment; its header still reads.
    let path = layout.columnar_path(Kind::Repository, 2024);
    let mut bytes = fs::read(&path).unwrap();
    let last = bytes.len() - 1;
    bytes[last] ^= 0xff;
    fs::write(&path, bytes).unwrap();

    let service = TrendService::open(&fixture.config(false)).unwrap();
    let output = service.day("repository", "2025-01-01", None).unwrap();
    assert_eq!(output.len(), 2);
    assert!(service.wait_for_prewarm(WAIT));

    let stats = service.cache_stats();
    assert_eq!(stats.prewarm_failure, 1);
    assert_eq!(stats.prewarm_success, 0);
    assert_eq!(stats.size, 1);

    let err = service.day("repository", "2024-12-31", None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::Internal);
}

#[test]
fn repeated_queries_share_the_cached_result() {
    let fixture = Fixture::standard();
    let service = service(&fixture);
    let request = WindowRequest {
        include_all_languages: Some("yes"),
        limit: Some("10"),
        ..window("developer", "2025-01-01", "2025-01-02")
    };

    let first = service.top_streaks(&request).unwrap();
    let second = service.top_streaks(&request).unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    let other = service.top_streaks(&WindowRequest { limit: Some("1"), ..request }).unwrap();
    assert_eq!(other.len(), 1);
    let stats = service.cache_stats();
    assert_eq!((stats.hit_count, stats.miss_count), (1, 2));
}

#[test]
fn malformed_parameters_are_invalid_requests() {
    let fixture = Fixture::standard();
    let service = service(&fixture);
    let base = window("repository", "2025-01-01", "2025-01-02");

    let failures = [
        service.top_streaks(&WindowRequest { limit: Some("0"), ..base }).unwrap_err(),
        service.top_streaks(&WindowRequest { limit: Some("501"), ..base }).unwrap_err(),
        service.top_reappearing(&WindowRequest { presence: Some("weekly"), ..base }).unwrap_err(),
        service
            .top_newcomers(&WindowRequest { include_all_languages: Some("maybe"), ..base })
            .unwrap_err(),
        service.top_streaks(&WindowRequest { language: Some("haskell"), ..base }).unwrap_err(),
        service.top_streaks(&WindowRequest { kind: Some("organization"), ..base }).unwrap_err(),
        service.top_streaks(&WindowRequest { kind: None, ..base }).unwrap_err(),
        service.top_streaks(&window("repository", "2025-01-02", "2025-01-01")).unwrap_err(),
        service.top_streaks(&window("repository", "01/01/2025", "2025-01-02")).unwrap_err(),
        service
            .top_streaks(&WindowRequest {
                language: Some("python"),
                include_all_languages: Some("true"),
                ..base
            })
            .unwrap_err(),
        service.day("repository", "2025-01-01", Some("haskell")).unwrap_err(),
        service.list_dates("organization").unwrap_err(),
    ];
    for err in failures {
        assert_eq!(err.kind, ErrorKind::InvalidRequest, "{}", err);
    }
    assert_eq!(service.cache_stats().miss_count, 0);
}

#[test]
fn unknown_dates_suggest_recent_ones() {
    let fixture = Fixture::standard();
    let service = service(&fixture);

    let err = service.day("developer", "2025-02-01", None).unwrap_err();
    assert_eq!(err.kind, ErrorKind::NotFound);
    assert_eq!(err.hint.as_deref(), Some("Try one of: 2025-01-01, 2025-01-02"));
}

#[test]
fn owners_ignore_the_requested_kind() {
    let fixture = Fixture::standard();
    let service = service(&fixture);

    let owners = service.top_owners(&window("developer", "2025-01-01", "2025-01-02")).unwrap();
    let QueryOutput::Owners(rows) = owners.as_ref() else {
        panic!("expected owners, got {:?}", owners);
    };
    assert_eq!(rows[0].owner, "alpha");

    let languages = service
        .top_languages(&WindowRequest { kind: None, ..window("", "2025-01-01", "2025-01-02") })
        .unwrap();
    assert_eq!(languages.len(), 4);
}

#[test]
fn dates_and_json_output() {
    let fixture = Fixture::standard();
    let service = service(&fixture);

    let dates = service.list_dates("repository").unwrap();
    assert_eq!(
        serde_json::to_value(dates.as_ref()).unwrap(),
        serde_json::json!(["2025-01-01", "2025-01-02"])
    );

    let day = service.day("repository", "2025-01-01", None).unwrap();
    let json = serde_json::to_value(day.as_ref()).unwrap();
    assert_eq!(json["language"], "__all__");
    assert_eq!(json["entries"][0]["full_name"], "alpha/one");
    assert_eq!(json["entries"][0]["owner"], "alpha");
    assert_eq!(json["entries"][0]["rank"], 1);
}

#[test]
fn empty_archived_day_is_an_empty_list() {
    let fixture = Fixture::empty();
    fixture.write_list(Kind::Repository, "2025-01-01", None, &["alpha/one"]);
    fixture.write_list(Kind::Repository, "2025-01-02", None, &[]);
    let service = service(&fixture);

    let dates = service.list_dates("repository").unwrap();
    assert_eq!(
        serde_json::to_value(dates.as_ref()).unwrap(),
        serde_json::json!(["2025-01-01", "2025-01-02"])
    );

    service.day("repository", "2025-01-01", None).unwrap();
    assert!(service.wait_for_prewarm(WAIT));
    let stats = service.cache_stats();
    assert_eq!(stats.prewarm_success, 1);
    assert_eq!(stats.prewarm_failure, 0);

    let output = service.day("repository", "2025-01-02", None).unwrap();
    let QueryOutput::Day(snapshot) = output.as_ref() else {
        panic!("expected a daily list, got {:?}", output);
    };
    assert!(snapshot.entries.is_empty());
    assert_eq!(service.cache_stats().hit_count, 1);
}
