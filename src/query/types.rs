use std::fmt;
use std::str::FromStr;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};
use crate::core::types::{EntityKey, Kind, LanguageView, TrendEntry};
use crate::query::cache::CacheKey;

/// How `top_reappearing` scores an entity.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceMode {
    #[default]
    Day,        // Distinct calendar days
    Occurrence, // Daily lists, several per day with include_all_languages
}

impl PresenceMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PresenceMode::Day => "day",
            PresenceMode::Occurrence => "occurrence",
        }
    }
}

impl fmt::Display for PresenceMode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PresenceMode {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "day" => Ok(PresenceMode::Day),
            "occurrence" => Ok(PresenceMode::Occurrence),
            _ => Err(Error::invalid("presence must be 'day' or 'occurrence'")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct DayParams {
    pub kind: Kind,
    pub date: NaiveDate,
    pub language: LanguageView,
}

/// Window shared by the leaderboard queries.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct WindowParams {
    pub kind: Kind,
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub language: Option<String>,
    pub include_all_languages: bool,
    pub limit: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ReappearingParams {
    pub window: WindowParams,
    pub presence: PresenceMode,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct OwnersParams {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub language: Option<String>,
    pub include_all_languages: bool,
    pub limit: usize,
}

impl OwnersParams {
    pub fn window(&self) -> WindowParams {
        WindowParams {
            kind: Kind::Repository,
            start: self.start,
            end: self.end,
            language: self.language.clone(),
            include_all_languages: self.include_all_languages,
            limit: self.limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct LanguagesParams {
    pub start: NaiveDate,
    pub end: NaiveDate,
    pub kind: Option<Kind>,             // None = both kinds
    pub include_all_languages: bool,    // Accepted; the aggregate list has no language
    pub limit: usize,
}

/// Every operation the engine answers, with its full parameter set.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Query {
    Dates { kind: Kind },
    Day(DayParams),
    TopReappearing(ReappearingParams),
    TopOwners(OwnersParams),
    TopLanguages(LanguagesParams),
    TopStreaks(WindowParams),
    TopNewcomers(WindowParams),
}

impl Query {
    pub fn op(&self) -> &'static str {
        match self {
            Query::Dates { .. } => "dates",
            Query::Day(_) => "day",
            Query::TopReappearing(_) => "top_reappearing",
            Query::TopOwners(_) => "top_owners",
            Query::TopLanguages(_) => "top_languages",
            Query::TopStreaks(_) => "top_streaks",
            Query::TopNewcomers(_) => "top_newcomers",
        }
    }

    pub fn cache_key(&self) -> Result<CacheKey> {
        CacheKey::new(self.op(), self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DaySnapshot {
    pub kind: Kind,
    pub date: NaiveDate,
    pub language: LanguageView,
    pub entries: Vec<TrendEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReappearingRow {
    #[serde(flatten)]
    pub entity: EntityKey,
    pub presence_count: u32,
    pub best_rank: u32,
    pub first_date: NaiveDate,
    pub last_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OwnerRow {
    pub owner: String,
    pub presence_count: u32,
    pub repo_count: u32,
    pub best_rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LanguageRow {
    pub language: String,
    pub entry_count: u32,
    pub entity_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreakRow {
    #[serde(flatten)]
    pub entity: EntityKey,
    pub streak_len: u32,
    pub streak_start: NaiveDate,
    pub streak_end: NaiveDate,
    pub best_rank: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NewcomerRow {
    #[serde(flatten)]
    pub entity: EntityKey,
    pub best_rank: u32,
    pub first_date: NaiveDate,
    pub presence_days: u32,
}

/// Result of one `Query`; what the result cache stores.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum QueryOutput {
    Dates(Vec<NaiveDate>),
    Day(DaySnapshot),
    Reappearing(Vec<ReappearingRow>),
    Owners(Vec<OwnerRow>),
    Languages(Vec<LanguageRow>),
    Streaks(Vec<StreakRow>),
    Newcomers(Vec<NewcomerRow>),
}

impl QueryOutput {
    pub fn len(&self) -> usize {
        match self {
            QueryOutput::Dates(rows) => rows.len(),
            QueryOutput::Day(snapshot) => snapshot.entries.len(),
            QueryOutput::Reappearing(rows) => rows.len(),
            QueryOutput::Owners(rows) => rows.len(),
            QueryOutput::Languages(rows) => rows.len(),
            QueryOutput::Streaks(rows) => rows.len(),
            QueryOutput::Newcomers(rows) => rows.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presence_mode_parsing() {
        assert_eq!("occurrence".parse::<PresenceMode>().unwrap(), PresenceMode::Occurrence);
        assert_eq!(PresenceMode::default(), PresenceMode::Day);
        assert!("weeks".parse::<PresenceMode>().is_err());
    }

    #[test]
    fn query_serializes_with_operation_tag() {
        let query = Query::Dates { kind: Kind::Developer };
        let json = serde_json::to_value(&query).unwrap();
        assert_eq!(json["op"], "dates");
        assert_eq!(json["kind"], "developer");
        assert_eq!(query.op(), "dates");
    }

    #[test]
    fn cache_keys_follow_parameters() {
        let params = |limit| WindowParams {
            kind: Kind::Repository,
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            language: None,
            include_all_languages: false,
            limit,
        };
        let reordered = WindowParams {
            limit: 5,
            include_all_languages: false,
            language: None,
            end: NaiveDate::from_ymd_opt(2025, 1, 2).unwrap(),
            start: NaiveDate::from_ymd_opt(2025, 1, 1).unwrap(),
            kind: Kind::Repository,
        };
        let key = Query::TopStreaks(params(5)).cache_key().unwrap();
        assert_eq!(key, Query::TopStreaks(reordered).cache_key().unwrap());
        assert_ne!(key, Query::TopStreaks(params(6)).cache_key().unwrap());
        assert_ne!(key, Query::TopNewcomers(params(5)).cache_key().unwrap());
        assert!(key.as_str().starts_with("top_streaks:"));
    }
}
