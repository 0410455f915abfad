use std::collections::HashSet;
use std::sync::Arc;
use chrono::NaiveDate;
use crate::core::config::Config;
use crate::core::dates::{iso_date, DateRange};
use crate::core::error::{Error, Result};
use crate::core::types::{Kind, TrendEntry};
use crate::query::aggregate;
use crate::query::filter::{observe_entries, observe_presence, Observation, WindowScope};
use crate::query::types::{
    DayParams, DaySnapshot, LanguageRow, LanguagesParams, NewcomerRow, OwnerRow, OwnersParams,
    Query, QueryOutput, ReappearingParams, ReappearingRow, StreakRow, WindowParams,
};
use crate::storage::columnar::ColumnarStore;
use crate::storage::layout::StorageLayout;
use crate::storage::rollup_store::RollupStore;
use crate::storage::source::{EntrySource, PresenceSource};

/// Store a query is answered from.
#[derive(Clone, Copy)]
enum Source<'a> {
    Raw(&'a dyn EntrySource),
    Rollup(&'a dyn PresenceSource),
}

impl Source<'_> {
    fn name(&self) -> &'static str {
        match self {
            Source::Raw(_) => "columnar",
            Source::Rollup(_) => "rollup",
        }
    }
}

/// Stateless query executor over the columnar store and, optionally, the
/// presence rollups.
///
/// Window queries that rollups can answer prefer them. A store read failure
/// (`Io`, `Parse`, `Corrupt`, `Stale`) is retried once on the other store;
/// when that fails too, or there is no other store, the failure becomes
/// `Internal`. Request errors are raised before any store is touched.
#[derive(Clone)]
pub struct QueryEngine {
    entries: Arc<dyn EntrySource>,
    rollups: Option<Arc<dyn PresenceSource>>,
}

impl QueryEngine {
    pub fn raw(entries: Arc<dyn EntrySource>) -> Self {
        QueryEngine { entries, rollups: None }
    }

    pub fn with_rollups(entries: Arc<dyn EntrySource>, rollups: Arc<dyn PresenceSource>) -> Self {
        QueryEngine { entries, rollups: Some(rollups) }
    }

    /// Engine over the stores under `config.analytics_root`. Rollups are
    /// used when enabled and at least one has been built.
    pub fn open(config: &Config) -> Self {
        let layout = StorageLayout::new(&config.analytics_root);
        let entries = Arc::new(ColumnarStore::new(layout.clone()));
        if config.use_rollups && layout.rollups_dir.is_dir() {
            Self::with_rollups(entries, Arc::new(RollupStore::new(layout)))
        } else {
            Self::raw(entries)
        }
    }

    pub fn uses_rollups(&self) -> bool {
        self.rollups.is_some()
    }

    pub fn execute(&self, query: &Query) -> Result<QueryOutput> {
        let output = match query {
            Query::Dates { kind } => QueryOutput::Dates(self.list_dates(*kind)?),
            Query::Day(params) => QueryOutput::Day(self.get_day(params)?),
            Query::TopReappearing(params) => QueryOutput::Reappearing(self.top_reappearing(params)?),
            Query::TopOwners(params) => QueryOutput::Owners(self.top_owners(params)?),
            Query::TopLanguages(params) => QueryOutput::Languages(self.top_languages(params)?),
            Query::TopStreaks(params) => QueryOutput::Streaks(self.top_streaks(params)?),
            Query::TopNewcomers(params) => QueryOutput::Newcomers(self.top_newcomers(params)?),
        };
        tracing::debug!(op = query.op(), rows = output.len(), "query executed");
        Ok(output)
    }

    pub fn list_dates(&self, kind: Kind) -> Result<Vec<NaiveDate>> {
        self.run("dates", false, |source| match source {
            Source::Raw(entries) => entries.known_dates(kind),
            Source::Rollup(_) => Err(Error::internal("dates are read from the columnar store")),
        })
    }

    /// One daily list in rank order. An archived date with no entries in
    /// the requested list is an empty snapshot; an unknown date is
    /// `NotFound`.
    pub fn get_day(&self, params: &DayParams) -> Result<DaySnapshot> {
        let kind = params.kind;
        let mut entries = self.run("day", false, |source| {
            let Source::Raw(store) = source else {
                return Err(Error::internal("daily lists are read from the columnar store"));
            };
            let known = store.known_dates(kind)?;
            if known.binary_search(&params.date).is_err() {
                return Err(Error::not_found(format!(
                    "No {} data for {}",
                    kind,
                    iso_date(params.date)
                ))
                .with_hint(nearby_dates_hint(&known, params.date)));
            }
            store.scan_entries(kind, &DateRange::single(params.date), Some(&params.language))
        })?;
        entries.sort_by_key(|entry| entry.rank);
        Ok(DaySnapshot {
            kind,
            date: params.date,
            language: params.language.clone(),
            entries,
        })
    }

    pub fn top_reappearing(&self, params: &ReappearingParams) -> Result<Vec<ReappearingRow>> {
        let window = &params.window;
        let (range, scope) = validate_window(window)?;
        let observations = self.observe("top_reappearing", window.kind, &range, &scope)?;
        Ok(aggregate::top_reappearing(&observations, params.presence, window.limit))
    }

    pub fn top_owners(&self, params: &OwnersParams) -> Result<Vec<OwnerRow>> {
        let window = params.window();
        let (range, scope) = validate_window(&window)?;
        let observations = self.observe("top_owners", Kind::Repository, &range, &scope)?;
        Ok(aggregate::top_owners(&observations, window.limit))
    }

    pub fn top_languages(&self, params: &LanguagesParams) -> Result<Vec<LanguageRow>> {
        validate_limit(params.limit)?;
        let range = DateRange::new(params.start, params.end)?;
        let kinds = match params.kind {
            Some(kind) => vec![kind],
            None => Kind::ALL.to_vec(),
        };

        let mut per_kind: Vec<(Kind, Vec<TrendEntry>)> = Vec::with_capacity(kinds.len());
        for kind in kinds {
            let entries = self.run("top_languages", false, |source| match source {
                Source::Raw(store) => store.scan_entries(kind, &range, None),
                Source::Rollup(_) => Err(Error::internal("languages are read from the columnar store")),
            })?;
            per_kind.push((kind, entries));
        }

        let rows = per_kind
            .iter()
            .flat_map(|(kind, entries)| entries.iter().map(move |entry| (*kind, entry)));
        Ok(aggregate::top_languages(rows, params.limit))
    }

    pub fn top_streaks(&self, params: &WindowParams) -> Result<Vec<StreakRow>> {
        let (range, scope) = validate_window(params)?;
        let observations = self.observe("top_streaks", params.kind, &range, &scope)?;
        aggregate::top_streaks(&observations, params.limit)
    }

    /// Entities whose first appearance in any list falls inside the window.
    pub fn top_newcomers(&self, params: &WindowParams) -> Result<Vec<NewcomerRow>> {
        let (range, scope) = validate_window(params)?;
        let kind = params.kind;
        let history = DateRange::before(range.start);

        let (observations, seen_before) =
            self.run("top_newcomers", scope.rollup_compatible(), |source| {
                let observations = observe_with(source, kind, &range, &scope)?;
                let mut seen_before = HashSet::new();
                if let Some(history) = &history {
                    match source {
                        Source::Raw(store) => seen_before.extend(
                            store.scan_entries(kind, history, None)?
                                .into_iter()
                                .map(|entry| entry.entity.key().to_string()),
                        ),
                        Source::Rollup(store) => seen_before.extend(
                            store.scan_presence(kind, history)?
                                .into_iter()
                                .map(|row| row.entity.key().to_string()),
                        ),
                    }
                }
                Ok((observations, seen_before))
            })?;

        Ok(aggregate::top_newcomers(&observations, &seen_before, params.limit))
    }

    fn observe(
        &self,
        op: &str,
        kind: Kind,
        range: &DateRange,
        scope: &WindowScope,
    ) -> Result<Vec<Observation>> {
        self.run(op, scope.rollup_compatible(), |source| observe_with(source, kind, range, scope))
    }

    fn run<T>(&self, op: &str, rollup_ok: bool, f: impl Fn(Source) -> Result<T>) -> Result<T> {
        let raw = Source::Raw(self.entries.as_ref());
        let (primary, alternate) = match (&self.rollups, rollup_ok) {
            (Some(rollups), true) => (Source::Rollup(rollups.as_ref()), Some(raw)),
            _ => (raw, None),
        };

        let first = match f(primary) {
            Ok(value) => return Ok(value),
            Err(e) if e.is_store_failure() => e,
            Err(e) => return Err(e),
        };

        let Some(alternate) = alternate else {
            return Err(Error::internal(format!("{} failed: {}", op, first)));
        };
        tracing::warn!(
            op,
            from = primary.name(),
            to = alternate.name(),
            error = %first,
            "store read failed, retrying on alternate store"
        );

        f(alternate).map_err(|second| {
            if second.is_store_failure() {
                Error::internal(format!("{} failed on both stores: {}; {}", op, first, second))
            } else {
                second
            }
        })
    }
}

fn observe_with(
    source: Source,
    kind: Kind,
    range: &DateRange,
    scope: &WindowScope,
) -> Result<Vec<Observation>> {
    match (source, scope) {
        (Source::Rollup(store), WindowScope::AllLanguages { include_aggregate }) => {
            Ok(observe_presence(&store.scan_presence(kind, range)?, *include_aggregate))
        }
        (Source::Rollup(_), WindowScope::Language(_)) => {
            Err(Error::internal("language scoped windows need the columnar store"))
        }
        (Source::Raw(store), _) => {
            let entries = store.scan_entries(kind, range, scope.view().as_ref())?;
            Ok(observe_entries(&entries, scope))
        }
    }
}

fn validate_limit(limit: usize) -> Result<()> {
    if limit == 0 {
        return Err(Error::invalid("limit must be at least 1"));
    }
    Ok(())
}

fn validate_window(params: &WindowParams) -> Result<(DateRange, WindowScope)> {
    validate_limit(params.limit)?;
    let range = DateRange::new(params.start, params.end)?;
    let scope = WindowScope::new(params.language.as_deref(), params.include_all_languages)?;
    Ok((range, scope))
}

/// Up to five known dates around `date`.
fn nearby_dates_hint(known: &[NaiveDate], date: NaiveDate) -> Option<String> {
    if known.is_empty() {
        return None;
    }
    let idx = known.partition_point(|d| *d < date);
    let start = idx.saturating_sub(2).min(known.len().saturating_sub(5));
    let end = (start + 5).min(known.len());
    let sample: Vec<String> = known[start..end].iter().map(|d| iso_date(*d)).collect();
    Some(format!("Try one of: {}", sample.join(", ")))
}
