mod common;

use std::fs;
use chrono::{Days, NaiveDate};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use trendlens::ingest::builder::{build_kind, BuildOptions};
use trendlens::query::types::{
    LanguagesParams, OwnersParams, PresenceMode, Query, ReappearingParams, WindowParams,
};
use trendlens::{Kind, QueryEngine};
use common::{random_archive, Fixture, LANGUAGES};

const DAYS: u32 = 30;

fn day(offset: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 12, 20).unwrap() + Days::new(u64::from(offset))
}

/// Window queries for one random window, covering every scope.
fn window_queries(rng: &mut StdRng) -> Vec<Query> {
    let a = rng.gen_range(0..DAYS);
    let b = rng.gen_range(0..DAYS);
    let (start, end) = (day(a.min(b)), day(a.max(b)));
    let limit = rng.gen_range(1..40);

    let mut scopes: Vec<(Option<String>, bool)> = vec![(None, false), (None, true)];
    scopes.push((Some(LANGUAGES[rng.gen_range(0..LANGUAGES.len())].to_string()), false));

    let mut queries = Vec::new();
    for kind in Kind::ALL {
        for (language, include_all_languages) in &scopes {
            let window = WindowParams {
                kind,
                start,
                end,
                language: language.clone(),
                include_all_languages: *include_all_languages,
                limit,
            };
            for presence in [PresenceMode::Day, PresenceMode::Occurrence] {
                queries.push(Query::TopReappearing(ReappearingParams {
                    window: window.clone(),
                    presence,
                }));
            }
            queries.push(Query::TopStreaks(window.clone()));
            queries.push(Query::TopNewcomers(window.clone()));
            if kind == Kind::Repository {
                queries.push(Query::TopOwners(OwnersParams {
                    start,
                    end,
                    language: language.clone(),
                    include_all_languages: *include_all_languages,
                    limit,
                }));
            }
        }
        queries.push(Query::TopLanguages(LanguagesParams {
            start,
            end,
            kind: Some(kind),
            include_all_languages: false,
            limit,
        }));
    }
    queries
}

fn assert_same_answers(raw: &QueryEngine, rollup: &QueryEngine, seed: u64, rounds: usize) {
    let mut rng = StdRng::seed_from_u64(seed ^ 0x5eed);
    for _ in 0..rounds {
        for query in window_queries(&mut rng) {
            let expected = raw.execute(&query).unwrap();
            let actual = rollup.execute(&query).unwrap();
            assert_eq!(actual, expected, "answers differ for {:?}", query);
        }
    }
}

#[test]
fn rollup_and_raw_answer_identically() {
    for seed in [1, 7, 42] {
        let fixture = Fixture::empty();
        random_archive(&fixture, seed, DAYS);
        fixture.build().rollup();

        let raw = QueryEngine::open(&fixture.config(false));
        let rollup = QueryEngine::open(&fixture.config(true));
        assert!(!raw.uses_rollups());
        assert!(rollup.uses_rollups());
        assert_same_answers(&raw, &rollup, seed, 12);
    }
}

#[test]
fn standard_archive_answers_identically() {
    let fixture = Fixture::standard();
    fixture.build().rollup();
    let raw = QueryEngine::open(&fixture.config(false));
    let rollup = QueryEngine::open(&fixture.config(true));

    let window = |language: Option<&str>, include_all_languages| WindowParams {
        kind: Kind::Repository,
        start: day(12),
        end: day(13),
        language: language.map(str::to_string),
        include_all_languages,
        limit: 50,
    };
    for scope in [window(None, false), window(None, true), window(Some("python"), false)] {
        for query in [
            Query::TopReappearing(ReappearingParams { window: scope.clone(), presence: PresenceMode::Day }),
            Query::TopReappearing(ReappearingParams {
                window: scope.clone(),
                presence: PresenceMode::Occurrence,
            }),
            Query::TopStreaks(scope.clone()),
            Query::TopNewcomers(scope.clone()),
        ] {
            assert_eq!(raw.execute(&query).unwrap(), rollup.execute(&query).unwrap());
        }
    }
}

#[test]
fn corrupt_rollup_falls_back_to_raw() {
    let fixture = Fixture::empty();
    random_archive(&fixture, 3, DAYS);
    fixture.build().rollup();

    let layout = fixture.layout();
    for kind in Kind::ALL {
        for year in layout.rollup_years(kind).unwrap() {
            fs::write(layout.rollup_path(kind, year), b"not a segment").unwrap();
        }
    }

    let raw = QueryEngine::open(&fixture.config(false));
    let rollup = QueryEngine::open(&fixture.config(true));
    assert_same_answers(&raw, &rollup, 3, 4);
}

#[test]
fn stale_rollup_falls_back_to_raw() {
    let fixture = Fixture::empty();
    random_archive(&fixture, 11, DAYS);
    fixture.build().rollup();

    // A new day appended after the rollup changes the columnar checksum.
    fixture.write_list(Kind::Repository, "2025-01-20", None, &["owner1/repo1", "owner2/repo2"]);
    fixture.write_list(Kind::Repository, "2025-01-20", Some("rust"), &["owner1/repo1"]);
    build_kind(
        &fixture.archive,
        &fixture.layout(),
        Kind::Repository,
        &BuildOptions { year: Some(2025), ..BuildOptions::default() },
    )
    .unwrap();

    let raw = QueryEngine::open(&fixture.config(false));
    let rollup = QueryEngine::open(&fixture.config(true));
    let query = Query::TopReappearing(ReappearingParams {
        window: WindowParams {
            kind: Kind::Repository,
            start: day(0),
            end: day(31),
            language: None,
            include_all_languages: true,
            limit: 100,
        },
        presence: PresenceMode::Occurrence,
    });
    let answer = rollup.execute(&query).unwrap();
    assert_eq!(answer, raw.execute(&query).unwrap());
    assert_same_answers(&raw, &rollup, 11, 4);
}
