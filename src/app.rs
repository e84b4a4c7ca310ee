// Application orchestrator: owns the dataset, filter state, and aggregation
// results, processes user commands, and pushes view snapshots to the TUI.

use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::awards::{calculate_winners, AwardWinner, AWARD_ORDER};
use crate::cache::RowCache;
use crate::config::Config;
use crate::dataset::loader::{load_dataset, TextSource};
use crate::dataset::normalize::NormalizeContext;
use crate::dataset::sidecar::{load_award_tables, load_players_list, load_role_map, AwardTable};
use crate::dataset::Dataset;
use crate::filters::{apply_filters, FilterState};
use crate::metrics::{
    fun_facts, maps_table, matches_over_time, overview, role_distribution, top_heroes_by_picks,
    top_heroes_by_win_rate, top_players_by_matches, top_players_by_win_rate, DEFAULT_MIN_MATCHES,
};
use crate::protocol::{FilterSummary, LoadStatus, UiUpdate, UserCommand, ViewSnapshot};

/// Rows shown per leaderboard tab.
const LEADERBOARD_LIMIT: usize = 15;

// ---------------------------------------------------------------------------
// AppState
// ---------------------------------------------------------------------------

pub struct AppState {
    config: Config,
    ctx: NormalizeContext,
    listed_players: BTreeSet<String>,
    tables: Vec<AwardTable>,
    source: Box<dyn TextSource>,
    cache: Option<RowCache>,
    dataset: Option<Dataset>,
    filters: FilterState,
    awards: BTreeMap<String, AwardWinner>,
    status: LoadStatus,
}

impl AppState {
    /// Build the application state: side files are read here (all optional,
    /// degrading to empty defaults), the dataset itself is loaded by
    /// `load()`.
    pub fn new(config: Config, source: Box<dyn TextSource>, cache: Option<RowCache>) -> Self {
        let role_map = match config.data.roles_path.as_deref() {
            Some(path) => load_role_map(Path::new(path)),
            None => Default::default(),
        };
        let listed_players = match config.data.players_path.as_deref() {
            Some(path) => load_players_list(Path::new(path), &config.player_aliases),
            None => BTreeSet::new(),
        };
        let mut tables: Vec<AwardTable> = match config.data.awards_tables_path.as_deref() {
            Some(path) => load_award_tables(Path::new(path)).into_values().collect(),
            None => Vec::new(),
        };
        tables.sort_by(|a, b| a.name.cmp(&b.name));

        info!(
            "side files loaded: {} hero roles, {} listed players, {} award tables",
            role_map.len(),
            listed_players.len(),
            tables.len()
        );

        let ctx = NormalizeContext::new(role_map, config.player_aliases.clone());

        AppState {
            config,
            ctx,
            listed_players,
            tables,
            source,
            cache,
            dataset: None,
            filters: FilterState::default(),
            awards: BTreeMap::new(),
            status: LoadStatus::Loading,
        }
    }

    /// Load (or reload) the dataset. On success the filter state is reset to
    /// the configured defaults and the awards are recomputed from the full
    /// row set. On failure the previous dataset, if any, stays usable.
    pub async fn load(&mut self) {
        self.status = LoadStatus::Loading;
        match load_dataset(self.source.as_ref(), self.cache.as_ref(), &self.ctx).await {
            Ok(dataset) => {
                info!(
                    "dataset ready: {} rows, {} players",
                    dataset.meta.total_rows,
                    dataset.meta.players.len()
                );
                self.filters = FilterState::from_meta(
                    &dataset.meta,
                    self.config.filters.default_year,
                    self.config.filters.only_listed_players,
                );
                self.awards = calculate_winners(&dataset.rows);
                self.dataset = Some(dataset);
                self.status = LoadStatus::Ready;
            }
            Err(e) => {
                error!("dataset load failed: {e}");
                self.status = LoadStatus::Failed(e.to_string());
            }
        }
    }

    /// Apply one user command to the filter state. Returns `false` for
    /// `Quit`, `true` otherwise.
    pub fn handle_command(&mut self, command: &UserCommand) -> bool {
        match command {
            UserCommand::Quit => return false,
            // Reload is handled by the run loop (it needs await); nothing to
            // do here.
            UserCommand::Reload => {}
            UserCommand::SetSearch(text) => self.filters.search = text.clone(),
            UserCommand::CycleWinner => self.filters.winner = self.filters.winner.cycle(),
            UserCommand::CycleRole => self.cycle_role(),
            UserCommand::ToggleListedOnly => {
                self.filters.only_listed_players = !self.filters.only_listed_players;
            }
            UserCommand::ResetFilters => self.reset_filters(),
        }
        true
    }

    /// Advance the role filter through the roles present in the dataset:
    /// all -> first role -> ... -> last role -> all.
    fn cycle_role(&mut self) {
        let Some(dataset) = &self.dataset else {
            return;
        };
        let roles = &dataset.meta.roles;
        if roles.is_empty() {
            return;
        }
        self.filters.role = match self.filters.role {
            None => Some(roles[0]),
            Some(current) => match roles.iter().position(|r| *r == current) {
                Some(i) if i + 1 < roles.len() => Some(roles[i + 1]),
                _ => None,
            },
        };
    }

    fn reset_filters(&mut self) {
        if let Some(dataset) = &self.dataset {
            self.filters = FilterState::from_meta(
                &dataset.meta,
                self.config.filters.default_year,
                self.config.filters.only_listed_players,
            );
        }
    }

    /// Build the view snapshot for the current dataset and filter state.
    pub fn snapshot(&self) -> ViewSnapshot {
        let Some(dataset) = &self.dataset else {
            return ViewSnapshot {
                status: self.status.clone(),
                tables: self.tables.clone(),
                ..ViewSnapshot::default()
            };
        };

        let filtered = apply_filters(&dataset.rows, &self.filters, Some(&self.listed_players));

        let awards = AWARD_ORDER
            .iter()
            .filter_map(|name| {
                self.awards
                    .get(*name)
                    .map(|winner| ((*name).to_string(), winner.clone()))
            })
            .collect();

        let date_range = match (self.filters.date_min, self.filters.date_max) {
            (Some(min), Some(max)) => format!("{min} / {max}"),
            (Some(min), None) => format!("desde {min}"),
            (None, Some(max)) => format!("hasta {max}"),
            (None, None) => "todas las fechas".to_string(),
        };

        ViewSnapshot {
            status: self.status.clone(),
            filters: FilterSummary {
                date_range,
                role: self.filters.role,
                winner: self.filters.winner,
                search: self.filters.search.clone(),
                only_listed_players: self.filters.only_listed_players,
                filtered_rows: filtered.len(),
                total_rows: dataset.meta.total_rows,
            },
            awards,
            players: top_players_by_matches(&filtered, LEADERBOARD_LIMIT),
            players_by_win_rate: top_players_by_win_rate(
                &filtered,
                DEFAULT_MIN_MATCHES,
                LEADERBOARD_LIMIT,
            ),
            heroes_by_picks: top_heroes_by_picks(&filtered, LEADERBOARD_LIMIT),
            heroes_by_win_rate: top_heroes_by_win_rate(
                &filtered,
                DEFAULT_MIN_MATCHES,
                LEADERBOARD_LIMIT,
            ),
            maps: maps_table(&filtered),
            overview: overview(&filtered),
            roles: role_distribution(&filtered),
            trend: matches_over_time(&filtered),
            fun: fun_facts(&filtered),
            tables: self.tables.clone(),
        }
    }

    #[cfg(test)]
    pub(crate) fn filters(&self) -> &FilterState {
        &self.filters
    }

    #[cfg(test)]
    pub(crate) fn available_roles(&self) -> &[crate::dataset::normalize::Role] {
        self.dataset
            .as_ref()
            .map(|d| d.meta.roles.as_slice())
            .unwrap_or(&[])
    }
}

// ---------------------------------------------------------------------------
// Run loop
// ---------------------------------------------------------------------------

/// Application loop: perform the initial load, then process user commands
/// until the channel closes or the user quits, pushing a fresh snapshot
/// after every change.
pub async fn run(
    mut cmd_rx: mpsc::Receiver<UserCommand>,
    ui_tx: mpsc::Sender<UiUpdate>,
    mut state: AppState,
) -> anyhow::Result<()> {
    state.load().await;
    let _ = ui_tx
        .send(UiUpdate::Snapshot(Box::new(state.snapshot())))
        .await;

    while let Some(command) = cmd_rx.recv().await {
        if command == UserCommand::Reload {
            // Drop the cache so a retry reaches the source even when a stale
            // copy is stored.
            if let Some(cache) = &state.cache {
                if let Err(e) = cache.invalidate() {
                    error!("cache invalidation failed: {e}");
                }
            }
            state.load().await;
        } else if !state.handle_command(&command) {
            break;
        }

        let _ = ui_tx
            .send(UiUpdate::Snapshot(Box::new(state.snapshot())))
            .await;
    }

    info!("application loop finished");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
