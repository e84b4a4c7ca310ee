// Screen layout: panel arrangement and sizing.
//
// Divides the terminal area into fixed zones for the stats dashboard:
//
// +--------------------------------------------------+
// | Status Bar (1 row)                                |
// +--------------------------------------------------+
// | Filter Banner (3 rows)                            |
// +-------------------------+------------------------+
// | Main Panel (62%)         | Sidebar (38%)          |
// | (tabbed)                 | +- Overview (55%) ----+|
// |                          | +- Fun Facts (45%) ---+|
// +-------------------------+------------------------+
// | Help Bar (1 row)                                  |
// +--------------------------------------------------+

use ratatui::layout::{Constraint, Direction, Layout, Rect};

/// Resolved screen areas for each dashboard zone.
#[derive(Debug, Clone)]
pub struct AppLayout {
    /// Top row: load status, row counts, date range.
    pub status_bar: Rect,
    /// Second row: active filter selections.
    pub filter_banner: Rect,
    /// Left side of the middle section: tab-switched content area.
    pub main_panel: Rect,
    /// Right sidebar top: overview KPIs.
    pub overview: Rect,
    /// Right sidebar bottom: fun facts.
    pub fun_facts: Rect,
    /// Bottom row: keyboard shortcut hints.
    pub help_bar: Rect,
}

/// Build the dashboard layout from the available terminal area.
pub fn build_layout(area: Rect) -> AppLayout {
    // Vertical: status(1) | filters(3) | middle(fill) | help(1)
    let vertical = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1), // status bar
            Constraint::Length(3), // filter banner
            Constraint::Min(10),   // middle section (main + sidebar)
            Constraint::Length(1), // help bar
        ])
        .split(area);

    let status_bar = vertical[0];
    let filter_banner = vertical[1];
    let middle = vertical[2];
    let help_bar = vertical[3];

    // Horizontal: main panel (62%) | sidebar (38%)
    let horizontal = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(62), Constraint::Percentage(38)])
        .split(middle);

    let main_panel = horizontal[0];
    let sidebar = horizontal[1];

    // Sidebar vertical: overview (55%) | fun facts (45%)
    let sidebar_sections = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(sidebar);

    let overview = sidebar_sections[0];
    let fun_facts = sidebar_sections[1];

    AppLayout {
        status_bar,
        filter_banner,
        main_panel,
        overview,
        fun_facts,
        help_bar,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
