// Filter engine: stateless predicate composition over normalized rows.
//
// A row passes iff it satisfies every active filter. Categorical filters use
// `None` as the "all" sentinel; the search matches hero or player name,
// case-insensitively; input row order is preserved.

use std::collections::BTreeSet;

use chrono::NaiveDate;

use crate::dataset::normalize::{DatasetMeta, MatchRow, Role};

// ---------------------------------------------------------------------------
// Filter state
// ---------------------------------------------------------------------------

/// Outcome filter tri-state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WinnerFilter {
    #[default]
    All,
    Wins,
    Losses,
}

impl WinnerFilter {
    pub fn cycle(self) -> Self {
        match self {
            WinnerFilter::All => WinnerFilter::Wins,
            WinnerFilter::Wins => WinnerFilter::Losses,
            WinnerFilter::Losses => WinnerFilter::All,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            WinnerFilter::All => "Todas las partidas",
            WinnerFilter::Wins => "Solo victorias",
            WinnerFilter::Losses => "Solo derrotas",
        }
    }
}

/// User-selected predicate set. One instance per session, mutated only by
/// explicit user actions.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    pub date_min: Option<NaiveDate>,
    pub date_max: Option<NaiveDate>,
    pub map: Option<String>,
    pub role: Option<Role>,
    pub player: Option<String>,
    pub winner: WinnerFilter,
    pub search: String,
    pub only_listed_players: bool,
}

impl FilterState {
    /// Default filter state for a freshly loaded dataset: the full date
    /// range, narrowed to `default_year` when the dataset covers any of it.
    pub fn from_meta(
        meta: &DatasetMeta,
        default_year: Option<i32>,
        only_listed_players: bool,
    ) -> Self {
        let mut date_min = meta.date_min;
        let mut date_max = meta.date_max;

        if let (Some(year), Some(meta_min), Some(meta_max)) =
            (default_year, meta.date_min, meta.date_max)
        {
            let year_start = NaiveDate::from_ymd_opt(year, 1, 1);
            let year_end = NaiveDate::from_ymd_opt(year, 12, 31);
            if let (Some(start), Some(end)) = (year_start, year_end) {
                // Narrow to the requested year only when it intersects the
                // data; otherwise the full range stays.
                if meta_min <= end && meta_max >= start {
                    date_min = Some(meta_min.max(start));
                    date_max = Some(meta_max.min(end));
                }
            }
        }

        FilterState {
            date_min,
            date_max,
            map: None,
            role: None,
            player: None,
            winner: WinnerFilter::All,
            search: String::new(),
            only_listed_players,
        }
    }
}

// ---------------------------------------------------------------------------
// Predicates
// ---------------------------------------------------------------------------

/// Date-range check. An undated row passes only while no bound is active, so
/// a fully disabled filter set keeps every row.
pub fn date_in_range(
    date: Option<NaiveDate>,
    min: Option<NaiveDate>,
    max: Option<NaiveDate>,
) -> bool {
    match date {
        Some(date) => {
            if min.is_some_and(|min| date < min) {
                return false;
            }
            if max.is_some_and(|max| date > max) {
                return false;
            }
            true
        }
        None => min.is_none() && max.is_none(),
    }
}

fn row_passes(row: &MatchRow, filters: &FilterState, listed: Option<&BTreeSet<String>>) -> bool {
    if !date_in_range(row.date, filters.date_min, filters.date_max) {
        return false;
    }

    if let Some(map) = &filters.map {
        if &row.map != map {
            return false;
        }
    }

    if let Some(role) = filters.role {
        if row.role != role {
            return false;
        }
    }

    if let Some(player) = &filters.player {
        if &row.player_name != player {
            return false;
        }
    }

    if filters.only_listed_players {
        if let Some(listed) = listed {
            if !listed.is_empty() && !listed.contains(&row.player_name) {
                return false;
            }
        }
    }

    match filters.winner {
        WinnerFilter::All => {}
        WinnerFilter::Wins => {
            if !row.winner {
                return false;
            }
        }
        WinnerFilter::Losses => {
            if row.winner {
                return false;
            }
        }
    }

    if !filters.search.is_empty() {
        let needle = filters.search.to_lowercase();
        let matches_hero = row.hero_name.to_lowercase().contains(&needle);
        let matches_player = row.player_name.to_lowercase().contains(&needle);
        if !matches_hero && !matches_player {
            return false;
        }
    }

    true
}

/// Apply all active filters, preserving input order.
pub fn apply_filters<'a>(
    rows: &'a [MatchRow],
    filters: &FilterState,
    listed: Option<&BTreeSet<String>>,
) -> Vec<&'a MatchRow> {
    rows.iter()
        .filter(|row| row_passes(row, filters, listed))
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
