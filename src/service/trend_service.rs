use std::sync::Arc;
use std::time::Duration;
use crate::core::config::Config;
use crate::core::dates::{iso_date, DateRange};
use crate::core::error::{Error, Result};
use crate::core::stats::CacheStats;
use crate::core::types::{Kind, LanguageView, ALL_LANGUAGES};
use crate::query::engine::QueryEngine;
use crate::query::filter::WindowScope;
use crate::query::prewarm::{PrewarmPool, SharedCache};
use crate::query::types::{
    DayParams, LanguagesParams, OwnersParams, Query, QueryOutput, ReappearingParams, WindowParams,
};
use crate::service::params::{parse_bool, parse_day, parse_kind, parse_limit, parse_presence};
use crate::storage::layout::StorageLayout;
use crate::storage::manifest::{Manifest, ManifestKind};

/// Raw parameters of a window request. Absent values take their defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct WindowRequest<'a> {
    pub kind: Option<&'a str>,
    pub start: &'a str,
    pub end: &'a str,
    pub language: Option<&'a str>,
    pub presence: Option<&'a str>,
    pub include_all_languages: Option<&'a str>,
    pub limit: Option<&'a str>,
}

/// Request-facing facade: validates raw parameters against the manifest,
/// answers through the result cache and prewarms neighbouring days.
pub struct TrendService {
    manifest: Manifest,
    engine: Arc<QueryEngine>,
    cache: Arc<SharedCache>,
    prewarm: PrewarmPool,
}

impl TrendService {
    pub fn open(config: &Config) -> Result<Self> {
        config.validate()?;
        let layout = StorageLayout::new(&config.analytics_root);
        let manifest = Manifest::load(&layout.manifest_path())?;
        let engine = Arc::new(QueryEngine::open(config));
        tracing::info!(
            root = %config.analytics_root.display(),
            rollups = engine.uses_rollups(),
            "trend service opened"
        );
        Self::with_engine(config, manifest, engine)
    }

    pub fn with_engine(config: &Config, manifest: Manifest, engine: Arc<QueryEngine>) -> Result<Self> {
        config.validate()?;
        let cache = Arc::new(SharedCache::new(config.cache_capacity, config.cache_ttl())?);
        let prewarm = PrewarmPool::start(
            engine.clone(),
            cache.clone(),
            config.prewarm_workers,
            config.prewarm_queue_size,
        )?;
        Ok(TrendService { manifest, engine, cache, prewarm })
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn engine(&self) -> &QueryEngine {
        &self.engine
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.cache.stats()
    }

    /// Wait for queued prewarm jobs; true when none are left.
    pub fn wait_for_prewarm(&self, timeout: Duration) -> bool {
        self.prewarm.wait_idle(timeout)
    }

    pub fn list_dates(&self, kind: &str) -> Result<Arc<QueryOutput>> {
        let kind = parse_kind(kind)?;
        self.cached(Query::Dates { kind }).map(|(output, _)| output)
    }

    /// One daily list; `language` absent means the all-languages list.
    pub fn day(&self, kind: &str, date: &str, language: Option<&str>) -> Result<Arc<QueryOutput>> {
        let kind = parse_kind(kind)?;
        let date = parse_day(date)?;
        let language = LanguageView::parse(language.unwrap_or(ALL_LANGUAGES));

        let summary = self.manifest.kind(kind);
        let day = iso_date(date);
        let Some(summary) = summary.filter(|s| s.dates.binary_search(&day).is_ok()) else {
            return Err(Error::not_found(format!("Date not available for {}: {}", kind, day))
                .with_hint(self.date_hint(kind)));
        };
        if !summary.languages_for(&day).iter().any(|known| language.matches(known.as_deref())) {
            return Err(Error::invalid(format!("Unknown language for {}: {}", day, language)));
        }

        let (output, miss) = self.cached(Query::Day(DayParams {
            kind,
            date,
            language: language.clone(),
        }))?;
        if miss {
            self.prewarm_neighbors(kind, summary, &day, language);
        }
        Ok(output)
    }

    pub fn top_reappearing(&self, request: &WindowRequest) -> Result<Arc<QueryOutput>> {
        let presence = parse_presence(request.presence)?;
        let window = self.window(request)?;
        self.cached(Query::TopReappearing(ReappearingParams { window, presence }))
            .map(|(output, _)| output)
    }

    /// Repository owners; `request.kind` is ignored.
    pub fn top_owners(&self, request: &WindowRequest) -> Result<Arc<QueryOutput>> {
        let window = self.window(&WindowRequest {
            kind: Some(Kind::Repository.as_str()),
            ..*request
        })?;
        self.cached(Query::TopOwners(OwnersParams {
            start: window.start,
            end: window.end,
            language: window.language,
            include_all_languages: window.include_all_languages,
            limit: window.limit,
        }))
        .map(|(output, _)| output)
    }

    /// Language leaderboard; `request.kind` absent covers both kinds and
    /// `request.language` is ignored.
    pub fn top_languages(&self, request: &WindowRequest) -> Result<Arc<QueryOutput>> {
        let kind = request.kind.map(parse_kind).transpose()?;
        let (start, end) = (parse_day(request.start)?, parse_day(request.end)?);
        DateRange::new(start, end)?;
        let include_all_languages = parse_bool(request.include_all_languages, false)?;
        let limit = parse_limit(request.limit)?;
        self.cached(Query::TopLanguages(LanguagesParams {
            start,
            end,
            kind,
            include_all_languages,
            limit,
        }))
        .map(|(output, _)| output)
    }

    pub fn top_streaks(&self, request: &WindowRequest) -> Result<Arc<QueryOutput>> {
        let window = self.window(request)?;
        self.cached(Query::TopStreaks(window)).map(|(output, _)| output)
    }

    pub fn top_newcomers(&self, request: &WindowRequest) -> Result<Arc<QueryOutput>> {
        let window = self.window(request)?;
        self.cached(Query::TopNewcomers(window)).map(|(output, _)| output)
    }

    /// Validate the shared window parameters; nothing here touches a store.
    fn window(&self, request: &WindowRequest) -> Result<WindowParams> {
        let kind = parse_kind(
            request.kind.ok_or_else(|| Error::invalid("kind is required"))?,
        )?;
        let start = parse_day(request.start)?;
        let end = parse_day(request.end)?;
        DateRange::new(start, end)?;
        let include_all_languages = parse_bool(request.include_all_languages, false)?;
        let limit = parse_limit(request.limit)?;
        WindowScope::new(request.language, include_all_languages)?;

        if let Some(language) = request.language {
            let known = self
                .manifest
                .kind(kind)
                .is_some_and(|s| s.languages.iter().flatten().any(|known| known == language));
            if !known {
                return Err(Error::invalid(format!("Unknown language: {}", language)));
            }
        }

        Ok(WindowParams {
            kind,
            start,
            end,
            language: request.language.map(str::to_string),
            include_all_languages,
            limit,
        })
    }

    /// Cached answer to `query`; the flag is true on a miss.
    fn cached(&self, query: Query) -> Result<(Arc<QueryOutput>, bool)> {
        let key = query.cache_key()?;
        if let Some(output) = self.cache.get(&key) {
            return Ok((output, false));
        }
        let output = Arc::new(self.engine.execute(&query)?);
        self.cache.set(key, output.clone());
        Ok((output, true))
    }

    fn prewarm_neighbors(&self, kind: Kind, summary: &ManifestKind, day: &str, language: LanguageView) {
        let (prev, next) = summary.neighbors(day);
        let mut views = vec![language];
        if views[0] != LanguageView::AllAggregate {
            views.push(LanguageView::AllAggregate);
        }

        for date in [prev, next].into_iter().flatten() {
            let Ok(date) = parse_day(date) else { continue };
            for view in &views {
                self.prewarm.submit(Query::Day(DayParams {
                    kind,
                    date,
                    language: view.clone(),
                }));
            }
        }
    }

    /// `"Try one of: …"` with the most recent known dates.
    fn date_hint(&self, kind: Kind) -> Option<String> {
        let dates = &self.manifest.kind(kind)?.dates;
        if dates.is_empty() {
            return None;
        }
        let recent = &dates[dates.len().saturating_sub(5)..];
        Some(format!("Try one of: {}", recent.join(", ")))
    }
}
