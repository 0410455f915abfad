use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use chrono::NaiveDate;
use roaring::RoaringBitmap;
use crate::core::dates::{from_day_number, to_day_number};
use crate::core::error::Result;
use crate::core::types::{EntityKey, Kind, TrendEntry};
use crate::query::filter::Observation;
use crate::query::types::{
    LanguageRow, NewcomerRow, OwnerRow, PresenceMode, ReappearingRow, StreakRow,
};

/// Window totals of one entity.
struct EntityWindow<'a> {
    entity: &'a EntityKey,
    days: u32,
    occurrences: u32,
    best_rank: u32,
    first_date: NaiveDate,
    last_date: NaiveDate,
}

fn per_entity(observations: &[Observation]) -> Vec<EntityWindow<'_>> {
    let mut windows: BTreeMap<&EntityKey, EntityWindow> = BTreeMap::new();
    for obs in observations {
        windows
            .entry(&obs.entity)
            .and_modify(|w| {
                w.days += 1;
                w.occurrences += obs.occurrences;
                w.best_rank = w.best_rank.min(obs.best_rank);
                w.first_date = w.first_date.min(obs.date);
                w.last_date = w.last_date.max(obs.date);
            })
            .or_insert(EntityWindow {
                entity: &obs.entity,
                days: 1,
                occurrences: obs.occurrences,
                best_rank: obs.best_rank,
                first_date: obs.date,
                last_date: obs.date,
            });
    }
    windows.into_values().collect()
}

/// Count descending, best rank ascending, then key ascending.
fn by_count_then_rank(a: (u32, u32, &str), b: (u32, u32, &str)) -> Ordering {
    b.0.cmp(&a.0).then(a.1.cmp(&b.1)).then(a.2.cmp(b.2))
}

pub fn top_reappearing(
    observations: &[Observation],
    presence: PresenceMode,
    limit: usize,
) -> Vec<ReappearingRow> {
    let mut rows: Vec<ReappearingRow> = per_entity(observations)
        .into_iter()
        .filter(|w| w.days >= 2)
        .map(|w| ReappearingRow {
            entity: w.entity.clone(),
            presence_count: match presence {
                PresenceMode::Day => w.days,
                PresenceMode::Occurrence => w.occurrences,
            },
            best_rank: w.best_rank,
            first_date: w.first_date,
            last_date: w.last_date,
        })
        .collect();

    rows.sort_by(|a, b| {
        by_count_then_rank(
            (a.presence_count, a.best_rank, a.entity.key()),
            (b.presence_count, b.best_rank, b.entity.key()),
        )
    });
    rows.truncate(limit);
    rows
}

/// Repository owners by `(date, repository)` presence. Repositories
/// without an owner part are skipped.
pub fn top_owners(observations: &[Observation], limit: usize) -> Vec<OwnerRow> {
    struct OwnerWindow<'a> {
        presence_count: u32,
        repos: HashSet<&'a str>,
        best_rank: u32,
    }

    let mut owners: HashMap<&str, OwnerWindow> = HashMap::new();
    for obs in observations {
        let Some(owner) = obs.entity.owner() else { continue };
        let window = owners.entry(owner).or_insert_with(|| OwnerWindow {
            presence_count: 0,
            repos: HashSet::new(),
            best_rank: obs.best_rank,
        });
        window.presence_count += 1;
        window.repos.insert(obs.entity.key());
        window.best_rank = window.best_rank.min(obs.best_rank);
    }

    let mut rows: Vec<OwnerRow> = owners
        .into_iter()
        .map(|(owner, w)| OwnerRow {
            owner: owner.to_string(),
            presence_count: w.presence_count,
            repo_count: w.repos.len() as u32,
            best_rank: w.best_rank,
        })
        .collect();

    rows.sort_by(|a, b| {
        by_count_then_rank(
            (a.presence_count, a.best_rank, a.owner.as_str()),
            (b.presence_count, b.best_rank, b.owner.as_str()),
        )
    });
    rows.truncate(limit);
    rows
}

/// Language leaderboard over raw entries of one or more kinds. The
/// all-languages list is never a language. Entities are counted per kind
/// so a developer and a repository sharing a name stay distinct.
pub fn top_languages<'a, I>(entries: I, limit: usize) -> Vec<LanguageRow>
where
    I: IntoIterator<Item = (Kind, &'a TrendEntry)>,
{
    let mut languages: HashMap<&str, (u32, HashSet<(Kind, &str)>)> = HashMap::new();
    for (kind, entry) in entries {
        let Some(language) = entry.language.as_deref() else { continue };
        let (count, entities) = languages.entry(language).or_default();
        *count += 1;
        entities.insert((kind, entry.entity.key()));
    }

    let mut rows: Vec<LanguageRow> = languages
        .into_iter()
        .map(|(language, (entry_count, entities))| LanguageRow {
            language: language.to_string(),
            entry_count,
            entity_count: entities.len() as u32,
        })
        .collect();

    rows.sort_by(|a, b| {
        b.entry_count
            .cmp(&a.entry_count)
            .then(b.entity_count.cmp(&a.entity_count))
            .then(a.language.cmp(&b.language))
    });
    rows.truncate(limit);
    rows
}

/// Longest run of consecutive calendar days per entity. Any day without
/// presence ends a run, whether or not the archive has that day. Within
/// one entity the earliest of equally long runs wins; `best_rank` is taken
/// over the winning run.
pub fn top_streaks(observations: &[Observation], limit: usize) -> Result<Vec<StreakRow>> {
    let mut days: BTreeMap<&EntityKey, (RoaringBitmap, HashMap<u32, u32>)> = BTreeMap::new();
    for obs in observations {
        let day = to_day_number(obs.date);
        let (bitmap, ranks) = days.entry(&obs.entity).or_default();
        bitmap.insert(day);
        ranks.entry(day).and_modify(|r| *r = (*r).min(obs.best_rank)).or_insert(obs.best_rank);
    }

    let mut rows = Vec::with_capacity(days.len());
    for (entity, (bitmap, ranks)) in days {
        let Some((start, len)) = longest_run(&bitmap) else { continue };
        let best_rank = (start..start + len)
            .filter_map(|day| ranks.get(&day).copied())
            .min()
            .unwrap_or(u32::MAX);
        rows.push(StreakRow {
            entity: entity.clone(),
            streak_len: len,
            streak_start: from_day_number(start)?,
            streak_end: from_day_number(start + len - 1)?,
            best_rank,
        });
    }

    rows.sort_by(|a, b| {
        b.streak_len
            .cmp(&a.streak_len)
            .then(a.streak_start.cmp(&b.streak_start))
            .then(a.entity.key().cmp(b.entity.key()))
    });
    rows.truncate(limit);
    Ok(rows)
}

/// First and length of the longest run of consecutive values.
fn longest_run(days: &RoaringBitmap) -> Option<(u32, u32)> {
    let mut best: Option<(u32, u32)> = None;
    let mut current: Option<(u32, u32)> = None;
    for day in days.iter() {
        current = match current {
            Some((start, len)) if start + len == day => Some((start, len + 1)),
            _ => Some((day, 1)),
        };
        if let Some((start, len)) = current {
            if best.is_none_or(|(_, best_len)| len > best_len) {
                best = Some((start, len));
            }
        }
    }
    best
}

/// Entities observed in the window that `seen_before` does not contain.
pub fn top_newcomers(
    observations: &[Observation],
    seen_before: &HashSet<String>,
    limit: usize,
) -> Vec<NewcomerRow> {
    let mut rows: Vec<NewcomerRow> = per_entity(observations)
        .into_iter()
        .filter(|w| !seen_before.contains(w.entity.key()))
        .map(|w| NewcomerRow {
            entity: w.entity.clone(),
            best_rank: w.best_rank,
            first_date: w.first_date,
            presence_days: w.days,
        })
        .collect();

    rows.sort_by(|a, b| {
        a.best_rank
            .cmp(&b.best_rank)
            .then(a.entity.key().cmp(b.entity.key()))
    });
    rows.truncate(limit);
    rows
}
