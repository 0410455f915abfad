use std::collections::BTreeMap;
use chrono::NaiveDate;
use crate::core::error::{Error, Result};
use crate::core::types::{DayPresence, EntityKey, LanguageView, TrendEntry, ALL_LANGUAGES};

/// Which daily lists count towards a window query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WindowScope {
    /// Only the list of one specific language.
    Language(String),
    /// Every language-specific list, plus the all-languages list when
    /// `include_aggregate` is set.
    AllLanguages { include_aggregate: bool },
}

impl WindowScope {
    pub fn new(language: Option<&str>, include_all_languages: bool) -> Result<Self> {
        match language {
            None => Ok(WindowScope::AllLanguages { include_aggregate: include_all_languages }),
            Some("") => Err(Error::invalid("language must not be empty")),
            Some(ALL_LANGUAGES) => Err(Error::invalid(format!(
                "{} is not a window language; use include_all_languages",
                ALL_LANGUAGES
            ))),
            Some(_) if include_all_languages => Err(Error::invalid(
                "language and include_all_languages are mutually exclusive",
            )),
            Some(name) => Ok(WindowScope::Language(name.to_string())),
        }
    }

    pub fn admits(&self, language: Option<&str>) -> bool {
        match (self, language) {
            (WindowScope::Language(name), Some(stored)) => name == stored,
            (WindowScope::Language(_), None) => false,
            (WindowScope::AllLanguages { .. }, Some(_)) => true,
            (WindowScope::AllLanguages { include_aggregate }, None) => *include_aggregate,
        }
    }

    /// The one daily list to scan, when the scope names one.
    pub fn view(&self) -> Option<LanguageView> {
        match self {
            WindowScope::Language(name) => Some(LanguageView::Specific(name.clone())),
            WindowScope::AllLanguages { .. } => None,
        }
    }

    /// Presence rollups carry no per-language detail, so only the
    /// all-languages scopes can be answered from them.
    pub fn rollup_compatible(&self) -> bool {
        matches!(self, WindowScope::AllLanguages { .. })
    }
}

/// Presence of one entity on one day under a scope. Both stores reduce to
/// this; the window algorithms only ever see observations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Observation {
    pub date: NaiveDate,
    pub entity: EntityKey,
    pub best_rank: u32,
    pub occurrences: u32,   // Admitted daily lists the entity was on
}

/// Group raw entries by `(date, entity)`. Output is ordered by date, then
/// entity key.
pub fn observe_entries(entries: &[TrendEntry], scope: &WindowScope) -> Vec<Observation> {
    let mut days: BTreeMap<(NaiveDate, &EntityKey), (u32, u32)> = BTreeMap::new();
    for entry in entries.iter().filter(|e| scope.admits(e.language.as_deref())) {
        let slot = days.entry((entry.date, &entry.entity)).or_insert((entry.rank, 0));
        slot.0 = slot.0.min(entry.rank);
        slot.1 += 1;
    }
    days.into_iter()
        .map(|((date, entity), (best_rank, occurrences))| Observation {
            date,
            entity: entity.clone(),
            best_rank,
            occurrences,
        })
        .collect()
}

/// Project presence rollups onto an all-languages scope. Same ordering as
/// `observe_entries`.
pub fn observe_presence(rows: &[DayPresence], include_aggregate: bool) -> Vec<Observation> {
    let mut observations: Vec<Observation> = rows
        .iter()
        .filter_map(|row| {
            let (best_rank, occurrences) = if include_aggregate {
                (
                    row.best_rank_any,
                    row.distinct_language_count + u32::from(row.has_all_languages_entry),
                )
            } else {
                (row.best_rank_non_null?, row.distinct_language_count)
            };
            Some(Observation {
                date: row.date,
                entity: row.entity.clone(),
                best_rank,
                occurrences,
            })
        })
        .collect();
    observations.sort_by(|a, b| (a.date, &a.entity).cmp(&(b.date, &b.entity)));
    observations
}
