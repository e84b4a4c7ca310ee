// Aggregate statistics over the (usually filtered) row view: overview KPIs,
// grouped leaderboards, activity over time, and the fun-facts panel.

use std::cmp::Ordering;
use std::collections::HashMap;

use chrono::Datelike;

use crate::dataset::normalize::{MatchRow, Role};

/// Leaderboards by win rate only consider entries with at least this many
/// matches unless the caller overrides the threshold.
pub const DEFAULT_MIN_MATCHES: u32 = 10;

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Default)]
pub struct OverviewMetrics {
    pub total_matches: usize,
    pub win_rate: f64,
    pub avg_hero_damage: f64,
    pub avg_deaths: f64,
    pub avg_spent_dead_secs: f64,
    pub avg_game_time_secs: f64,
    pub total_kills: u64,
    pub total_deaths: u64,
    pub total_assists: u64,
    pub avg_kills: f64,
    pub avg_assists: f64,
    pub avg_takedowns: f64,
}

/// Compute the overview KPI block in one pass.
pub fn overview(rows: &[&MatchRow]) -> OverviewMetrics {
    if rows.is_empty() {
        return OverviewMetrics::default();
    }

    let n = rows.len() as f64;
    let mut wins = 0usize;
    let mut hero_damage = 0u64;
    let mut deaths = 0u64;
    let mut spent_dead = 0u64;
    let mut game_time = 0u64;
    let mut kills = 0u64;
    let mut assists = 0u64;
    let mut takedowns = 0u64;

    for row in rows {
        if row.winner {
            wins += 1;
        }
        hero_damage += row.hero_damage;
        deaths += u64::from(row.deaths);
        spent_dead += u64::from(row.spent_dead_secs);
        game_time += u64::from(row.game_time_secs);
        kills += u64::from(row.hero_kills);
        assists += u64::from(row.assists);
        takedowns += u64::from(row.takedowns);
    }

    OverviewMetrics {
        total_matches: rows.len(),
        win_rate: wins as f64 / n,
        avg_hero_damage: hero_damage as f64 / n,
        avg_deaths: deaths as f64 / n,
        avg_spent_dead_secs: spent_dead as f64 / n,
        avg_game_time_secs: game_time as f64 / n,
        total_kills: kills,
        total_deaths: deaths,
        total_assists: assists,
        avg_kills: kills as f64 / n,
        avg_assists: assists as f64 / n,
        avg_takedowns: takedowns as f64 / n,
    }
}

// ---------------------------------------------------------------------------
// Grouped leaderboards
// ---------------------------------------------------------------------------

/// Match count, wins, and win rate for one group (player, hero, or map).
#[derive(Debug, Clone, PartialEq)]
pub struct GroupStats {
    pub name: String,
    pub matches: u32,
    pub wins: u32,
    pub win_rate: f64,
}

/// Group rows by a key in first-appearance order and compute per-group win
/// rates. Empty keys group under "Unknown".
fn group_by<'a, F>(rows: &[&'a MatchRow], key: F) -> Vec<GroupStats>
where
    F: Fn(&'a MatchRow) -> &'a str,
{
    let mut groups: Vec<GroupStats> = Vec::new();
    let mut index: HashMap<&'a str, usize> = HashMap::new();

    for &row in rows {
        let mut k = key(row);
        if k.is_empty() {
            k = "Unknown";
        }
        let i = *index.entry(k).or_insert_with(|| {
            groups.push(GroupStats {
                name: k.to_string(),
                matches: 0,
                wins: 0,
                win_rate: 0.0,
            });
            groups.len() - 1
        });
        groups[i].matches += 1;
        if row.winner {
            groups[i].wins += 1;
        }
    }

    for group in &mut groups {
        if group.matches > 0 {
            group.win_rate = f64::from(group.wins) / f64::from(group.matches);
        }
    }

    groups
}

fn by_matches_desc(a: &GroupStats, b: &GroupStats) -> Ordering {
    b.matches.cmp(&a.matches)
}

fn by_win_rate_desc(a: &GroupStats, b: &GroupStats) -> Ordering {
    b.win_rate
        .partial_cmp(&a.win_rate)
        .unwrap_or(Ordering::Equal)
}

/// Heroes by pick count, most picked first.
pub fn top_heroes_by_picks(rows: &[&MatchRow], limit: usize) -> Vec<GroupStats> {
    let mut groups = group_by(rows, |r| r.hero_name.as_str());
    groups.sort_by(by_matches_desc);
    groups.truncate(limit);
    groups
}

/// Heroes by win rate among those with at least `min_matches` games.
pub fn top_heroes_by_win_rate(
    rows: &[&MatchRow],
    min_matches: u32,
    limit: usize,
) -> Vec<GroupStats> {
    let mut groups = group_by(rows, |r| r.hero_name.as_str());
    groups.retain(|g| g.matches >= min_matches);
    groups.sort_by(by_win_rate_desc);
    groups.truncate(limit);
    groups
}

/// Players by match count, most active first.
pub fn top_players_by_matches(rows: &[&MatchRow], limit: usize) -> Vec<GroupStats> {
    let mut groups = group_by(rows, |r| r.player_name.as_str());
    groups.sort_by(by_matches_desc);
    groups.truncate(limit);
    groups
}

/// Players by win rate among those with at least `min_matches` games.
pub fn top_players_by_win_rate(
    rows: &[&MatchRow],
    min_matches: u32,
    limit: usize,
) -> Vec<GroupStats> {
    let mut groups = group_by(rows, |r| r.player_name.as_str());
    groups.retain(|g| g.matches >= min_matches);
    groups.sort_by(by_win_rate_desc);
    groups.truncate(limit);
    groups
}

/// All maps with their match counts and win rates, most played first.
pub fn maps_table(rows: &[&MatchRow]) -> Vec<GroupStats> {
    let mut groups = group_by(rows, |r| r.map.as_str());
    groups.sort_by(by_matches_desc);
    groups
}

// ---------------------------------------------------------------------------
// Role distribution
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct RoleShare {
    pub role: Role,
    pub count: u32,
    pub share: f64,
}

/// How often each role was played, largest share first.
pub fn role_distribution(rows: &[&MatchRow]) -> Vec<RoleShare> {
    let mut counts: Vec<RoleShare> = Vec::new();
    let mut index: HashMap<Role, usize> = HashMap::new();

    for row in rows {
        let i = *index.entry(row.role).or_insert_with(|| {
            counts.push(RoleShare {
                role: row.role,
                count: 0,
                share: 0.0,
            });
            counts.len() - 1
        });
        counts[i].count += 1;
    }

    let total = rows.len().max(1) as f64;
    for entry in &mut counts {
        entry.share = f64::from(entry.count) / total;
    }
    counts.sort_by(|a, b| b.count.cmp(&a.count));
    counts
}

// ---------------------------------------------------------------------------
// Matches over time
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PeriodStats {
    /// `YYYY-Www` (ISO week) or `YYYY-MM` in the month fallback.
    pub period: String,
    pub matches: u32,
    pub wins: u32,
    pub win_rate: f64,
}

fn year_week(row: &MatchRow) -> Option<String> {
    row.date.map(|d| {
        let week = d.iso_week();
        format!("{}-W{:02}", week.year(), week.week())
    })
}

fn year_month(row: &MatchRow) -> Option<String> {
    row.date.map(|d| format!("{}-{:02}", d.year(), d.month()))
}

fn group_periods(rows: &[&MatchRow], period: impl Fn(&MatchRow) -> Option<String>) -> Vec<PeriodStats> {
    let mut groups: HashMap<String, PeriodStats> = HashMap::new();
    for row in rows {
        let Some(key) = period(row) else { continue };
        let entry = groups.entry(key.clone()).or_insert(PeriodStats {
            period: key,
            matches: 0,
            wins: 0,
            win_rate: 0.0,
        });
        entry.matches += 1;
        if row.winner {
            entry.wins += 1;
        }
    }

    let mut result: Vec<PeriodStats> = groups.into_values().collect();
    for entry in &mut result {
        if entry.matches > 0 {
            entry.win_rate = f64::from(entry.wins) / f64::from(entry.matches);
        }
    }
    result.sort_by(|a, b| a.period.cmp(&b.period));
    result
}

/// Matches grouped by ISO week, chronologically. When fewer than half of the
/// rows carry a usable date the week buckets get too sparse to read, so the
/// grouping falls back to months.
pub fn matches_over_time(rows: &[&MatchRow]) -> Vec<PeriodStats> {
    let dated = rows.iter().filter(|r| r.date.is_some()).count();
    if dated * 2 < rows.len() {
        return group_periods(rows, year_month);
    }
    group_periods(rows, year_week)
}

// ---------------------------------------------------------------------------
// Fun facts
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerTotal {
    pub name: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PlayerAverage {
    pub name: String,
    pub value: f64,
    pub matches: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ViolentGame {
    pub player_name: String,
    pub hero_name: String,
    pub map: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct FunFacts {
    pub most_on_fire: Option<PlayerTotal>,
    pub most_time_dead: Option<PlayerTotal>,
    pub kamikaze: Option<PlayerAverage>,
    pub clutch_hero: Option<GroupStats>,
    pub most_violent_game: Option<ViolentGame>,
    pub cursed_map: Option<GroupStats>,
}

fn best_player_total(
    rows: &[&MatchRow],
    metric: impl Fn(&MatchRow) -> f64,
) -> Option<PlayerTotal> {
    let mut totals: Vec<PlayerTotal> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let i = *index.entry(row.player_name.clone()).or_insert_with(|| {
            totals.push(PlayerTotal {
                name: row.player_name.clone(),
                value: 0.0,
            });
            totals.len() - 1
        });
        totals[i].value += metric(row);
    }

    let mut best: Option<&PlayerTotal> = None;
    let mut best_value = 0.0;
    for total in &totals {
        if total.value > best_value {
            best_value = total.value;
            best = Some(total);
        }
    }
    best.cloned()
}

/// Highest average deaths per match among players with enough games.
fn kamikaze_award(rows: &[&MatchRow], min_matches: u32) -> Option<PlayerAverage> {
    struct Accum {
        name: String,
        deaths: f64,
        matches: u32,
    }
    let mut stats: Vec<Accum> = Vec::new();
    let mut index: HashMap<String, usize> = HashMap::new();
    for row in rows {
        let i = *index.entry(row.player_name.clone()).or_insert_with(|| {
            stats.push(Accum {
                name: row.player_name.clone(),
                deaths: 0.0,
                matches: 0,
            });
            stats.len() - 1
        });
        stats[i].deaths += f64::from(row.deaths);
        stats[i].matches += 1;
    }

    let mut best: Option<PlayerAverage> = None;
    let mut best_avg = 0.0;
    for s in &stats {
        if s.matches < min_matches {
            continue;
        }
        let avg = s.deaths / f64::from(s.matches);
        if avg > best_avg {
            best_avg = avg;
            best = Some(PlayerAverage {
                name: s.name.clone(),
                value: avg,
                matches: s.matches,
            });
        }
    }
    best
}

/// A hero that wins a lot without being picked much. Tries strict bounds
/// first (5-15 games, >= 60% win rate), then relaxes once (3-20 games,
/// >= 55%) before giving up.
fn clutch_hero(rows: &[&MatchRow]) -> Option<GroupStats> {
    let groups = group_by(rows, |r| r.hero_name.as_str());

    let pick = |min: u32, max: u32, wr: f64| -> Option<GroupStats> {
        let mut candidates: Vec<&GroupStats> = groups
            .iter()
            .filter(|g| g.matches >= min && g.matches <= max && g.win_rate >= wr)
            .collect();
        candidates.sort_by(|a, b| by_win_rate_desc(a, b));
        candidates.first().map(|g| (*g).clone())
    };

    pick(5, 15, 0.6).or_else(|| pick(3, 20, 0.55))
}

/// The single row with the highest combined hero + siege damage.
fn most_violent_game(rows: &[&MatchRow]) -> Option<ViolentGame> {
    let mut best: Option<ViolentGame> = None;
    let mut best_value = 0.0;
    for row in rows {
        let total = row.total_damage() as f64;
        if total > best_value {
            best_value = total;
            best = Some(ViolentGame {
                player_name: row.player_name.clone(),
                hero_name: row.hero_name.clone(),
                map: row.map.clone(),
                value: total,
            });
        }
    }
    best
}

/// The map with the lowest win rate among maps with enough games.
fn cursed_map(rows: &[&MatchRow], min_matches: u32) -> Option<GroupStats> {
    let mut groups = group_by(rows, |r| r.map.as_str());
    groups.retain(|g| g.matches >= min_matches);
    groups.sort_by(|a, b| by_win_rate_desc(b, a));
    groups.into_iter().next()
}

/// Compute the whole fun-facts panel.
pub fn fun_facts(rows: &[&MatchRow]) -> FunFacts {
    FunFacts {
        most_on_fire: best_player_total(rows, |r| f64::from(r.on_fire_secs)),
        most_time_dead: best_player_total(rows, |r| f64::from(r.spent_dead_secs)),
        kamikaze: kamikaze_award(rows, DEFAULT_MIN_MATCHES),
        clutch_hero: clutch_hero(rows),
        most_violent_game: most_violent_game(rows),
        cursed_map: cursed_map(rows, DEFAULT_MIN_MATCHES),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
