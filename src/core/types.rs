use std::fmt;
use std::str::FromStr;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use crate::core::error::{Error, Result};

/// Sentinel used on the wire for the all-languages aggregate view.
pub const ALL_LANGUAGES: &str = "__all__";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Repository,
    Developer,
}

impl Kind {
    pub const ALL: [Kind; 2] = [Kind::Repository, Kind::Developer];

    pub fn as_str(&self) -> &'static str {
        match self {
            Kind::Repository => "repository",
            Kind::Developer => "developer",
        }
    }

    pub fn entry_table(&self) -> &'static str {
        match self {
            Kind::Repository => "repo_trend_entry",
            Kind::Developer => "dev_trend_entry",
        }
    }

    pub fn rollup_table(&self) -> &'static str {
        match self {
            Kind::Repository => "repo_day_presence",
            Kind::Developer => "dev_day_presence",
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Kind {
    type Err = Error;

    fn from_str(value: &str) -> Result<Self> {
        match value {
            "repository" => Ok(Kind::Repository),
            "developer" => Ok(Kind::Developer),
            other => Err(Error::invalid(format!("Unsupported kind: {}", other))),
        }
    }
}

/// One concrete daily list: a specific language or the all-languages view.
/// Serialized as the language name, or `__all__`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum LanguageView {
    Specific(String),
    AllAggregate,
}

impl LanguageView {
    /// Maps the stored nullable language column onto a view.
    pub fn from_stored(language: Option<&str>) -> Self {
        match language {
            Some(name) => LanguageView::Specific(name.to_string()),
            None => LanguageView::AllAggregate,
        }
    }

    pub fn parse(value: &str) -> Self {
        if value == ALL_LANGUAGES {
            LanguageView::AllAggregate
        } else {
            LanguageView::Specific(value.to_string())
        }
    }

    pub fn matches(&self, language: Option<&str>) -> bool {
        match (self, language) {
            (LanguageView::Specific(name), Some(stored)) => name == stored,
            (LanguageView::AllAggregate, None) => true,
            _ => false,
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            LanguageView::Specific(name) => name,
            LanguageView::AllAggregate => ALL_LANGUAGES,
        }
    }
}

impl From<String> for LanguageView {
    fn from(value: String) -> Self {
        if value == ALL_LANGUAGES {
            LanguageView::AllAggregate
        } else {
            LanguageView::Specific(value)
        }
    }
}

impl From<LanguageView> for String {
    fn from(view: LanguageView) -> Self {
        match view {
            LanguageView::Specific(name) => name,
            LanguageView::AllAggregate => ALL_LANGUAGES.to_string(),
        }
    }
}

impl fmt::Display for LanguageView {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of a trending entity. Repositories carry the owner/repo split
/// of their full name; developers are keyed by username.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(untagged)]
pub enum EntityKey {
    Repository {
        full_name: String,
        owner: Option<String>,
        repo: Option<String>,
    },
    Developer {
        username: String,
    },
}

impl EntityKey {
    pub fn new(kind: Kind, key: &str) -> Self {
        match kind {
            Kind::Repository => {
                let (owner, repo) = match key.split_once('/') {
                    Some((owner, repo)) => (Some(owner.to_string()), Some(repo.to_string())),
                    None => (None, None),
                };
                EntityKey::Repository { full_name: key.to_string(), owner, repo }
            }
            Kind::Developer => EntityKey::Developer { username: key.to_string() },
        }
    }

    pub fn key(&self) -> &str {
        match self {
            EntityKey::Repository { full_name, .. } => full_name,
            EntityKey::Developer { username } => username,
        }
    }

    pub fn owner(&self) -> Option<&str> {
        match self {
            EntityKey::Repository { owner, .. } => owner.as_deref(),
            EntityKey::Developer { .. } => None,
        }
    }
}

impl PartialOrd for EntityKey {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EntityKey {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.key().cmp(other.key())
    }
}

/// One ranked appearance of an entity in one daily list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TrendEntry {
    pub date: NaiveDate,
    pub language: Option<String>,
    pub rank: u32,
    #[serde(flatten)]
    pub entity: EntityKey,
}

impl TrendEntry {
    /// Physical sort order of columnar segments: date, language (the
    /// all-languages list first), rank.
    pub fn sort_key(&self) -> (NaiveDate, &str, u32) {
        (self.date, self.language.as_deref().unwrap_or(""), self.rank)
    }
}

/// Per-day presence summary of one entity, derived from its entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DayPresence {
    pub date: NaiveDate,
    pub entity: EntityKey,
    pub best_rank_any: u32,
    pub best_rank_non_null: Option<u32>,
    pub distinct_language_count: u32,
    pub has_all_languages_entry: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn repository_key_splits_on_first_slash() {
        let key = EntityKey::new(Kind::Repository, "alpha/one/extra");
        assert_eq!(key.owner(), Some("alpha"));
        match key {
            EntityKey::Repository { repo, .. } => assert_eq!(repo.as_deref(), Some("one/extra")),
            _ => panic!("expected repository key"),
        }
        assert_eq!(EntityKey::new(Kind::Repository, "loner").owner(), None);
    }

    #[test]
    fn language_view_matches_stored_column() {
        let python = LanguageView::parse("python");
        assert!(python.matches(Some("python")));
        assert!(!python.matches(None));
        let all = LanguageView::parse(ALL_LANGUAGES);
        assert!(all.matches(None));
        assert!(!all.matches(Some("python")));
    }

    #[test]
    fn kind_parsing() {
        assert_eq!("developer".parse::<Kind>().unwrap(), Kind::Developer);
        assert!("repos".parse::<Kind>().is_err());
    }

    #[test]
    fn entity_keys_serialize_flat() {
        let json = serde_json::to_value(EntityKey::new(Kind::Repository, "alpha/one")).unwrap();
        assert_eq!(json["full_name"], "alpha/one");
        assert_eq!(json["owner"], "alpha");
        let json = serde_json::to_value(EntityKey::new(Kind::Developer, "octo")).unwrap();
        assert_eq!(json["username"], "octo");
    }

    #[test]
    fn language_view_serializes_as_name() {
        assert_eq!(serde_json::to_value(LanguageView::AllAggregate).unwrap(), ALL_LANGUAGES);
        assert_eq!(serde_json::to_value(LanguageView::parse("rust")).unwrap(), "rust");
    }
}
