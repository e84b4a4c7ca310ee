// Message types exchanged between the app orchestrator and the TUI.

use crate::awards::AwardWinner;
use crate::dataset::normalize::Role;
use crate::dataset::sidecar::AwardTable;
use crate::filters::WinnerFilter;
use crate::metrics::{FunFacts, GroupStats, OverviewMetrics, PeriodStats, RoleShare};

// ---------------------------------------------------------------------------
// Tabs
// ---------------------------------------------------------------------------

/// Which tab is active in the main panel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TabId {
    #[default]
    Awards,
    Players,
    Heroes,
    Maps,
    Tables,
}

impl TabId {
    pub fn title(&self) -> &'static str {
        match self {
            TabId::Awards => "Premios",
            TabId::Players => "Jugadores",
            TabId::Heroes => "Héroes",
            TabId::Maps => "Mapas",
            TabId::Tables => "Tablas",
        }
    }

    /// Tab bound to a number key (1-based), if any.
    pub fn from_index(index: usize) -> Option<TabId> {
        match index {
            1 => Some(TabId::Awards),
            2 => Some(TabId::Players),
            3 => Some(TabId::Heroes),
            4 => Some(TabId::Maps),
            5 => Some(TabId::Tables),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Load status
// ---------------------------------------------------------------------------

/// Dataset load state surfaced in the status bar. A failed load is
/// retryable; nothing here is fatal to the process.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum LoadStatus {
    #[default]
    Loading,
    Ready,
    Failed(String),
}

// ---------------------------------------------------------------------------
// Commands and updates
// ---------------------------------------------------------------------------

/// Commands the TUI sends to the app orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub enum UserCommand {
    Quit,
    /// Drop the cache and reload from the configured source.
    Reload,
    SetSearch(String),
    CycleWinner,
    CycleRole,
    ToggleListedOnly,
    ResetFilters,
}

/// Updates the app orchestrator pushes to the TUI.
#[derive(Debug, Clone)]
pub enum UiUpdate {
    Snapshot(Box<ViewSnapshot>),
}

// ---------------------------------------------------------------------------
// View snapshot
// ---------------------------------------------------------------------------

/// Current filter selections condensed for the filter banner.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterSummary {
    /// Human-readable date range, e.g. `2025-01-01 / 2025-07-01`.
    pub date_range: String,
    pub role: Option<Role>,
    pub winner: WinnerFilter,
    pub search: String,
    pub only_listed_players: bool,
    pub filtered_rows: usize,
    pub total_rows: usize,
}

/// Everything the TUI needs to render one frame, recomputed wholesale by the
/// orchestrator whenever the dataset or a filter changes.
#[derive(Debug, Clone, Default)]
pub struct ViewSnapshot {
    pub status: LoadStatus,
    pub filters: FilterSummary,
    /// Award winners in presentation order.
    pub awards: Vec<(String, AwardWinner)>,
    pub players: Vec<GroupStats>,
    pub players_by_win_rate: Vec<GroupStats>,
    pub heroes_by_picks: Vec<GroupStats>,
    pub heroes_by_win_rate: Vec<GroupStats>,
    pub maps: Vec<GroupStats>,
    pub overview: OverviewMetrics,
    pub roles: Vec<RoleShare>,
    pub trend: Vec<PeriodStats>,
    pub fun: FunFacts,
    /// Hand-maintained award tables from the sidecar CSV, by table name.
    pub tables: Vec<AwardTable>,
}
