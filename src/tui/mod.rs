// TUI dashboard: layout, input handling, and rendering.
//
// The TUI owns a `ViewState` that mirrors the orchestrator's view snapshot.
// The app loop pushes `UiUpdate` messages over an mpsc channel; the TUI
// applies them to `ViewState` and re-renders at ~30 fps.

pub mod input;
pub mod layout;

use std::time::Duration;

use crossterm::event::{Event, EventStream, KeyCode, KeyModifiers};
use futures_util::StreamExt;
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph};
use ratatui::Frame;
use tokio::sync::mpsc;

use crate::awards::AwardWinner;
use crate::dataset::sidecar::{format_award_value, AwardTable};
use crate::format::{format_duration, format_number, format_percent};
use crate::metrics::{FunFacts, GroupStats};
use crate::protocol::{LoadStatus, TabId, UiUpdate, UserCommand, ViewSnapshot};

use layout::{build_layout, AppLayout};

// ---------------------------------------------------------------------------
// ViewState
// ---------------------------------------------------------------------------

/// TUI-local state: the latest snapshot plus purely presentational state
/// (active tab, scroll offset, search input).
#[derive(Default)]
pub struct ViewState {
    pub snapshot: ViewSnapshot,
    pub active_tab: TabId,
    pub scroll: usize,
    pub search_input: String,
    pub search_mode: bool,
}

/// Apply a single UiUpdate to the ViewState.
fn apply_ui_update(state: &mut ViewState, update: UiUpdate) {
    match update {
        UiUpdate::Snapshot(snapshot) => {
            state.snapshot = *snapshot;
        }
    }
}

// ---------------------------------------------------------------------------
// Line builders (plain strings, rendered into Paragraphs)
// ---------------------------------------------------------------------------

/// Supporting context for one award winner: who, over how many games, where.
fn describe_winner(winner: &AwardWinner) -> String {
    let mut parts: Vec<String> = Vec::new();

    match (&winner.player, &winner.hero) {
        (Some(player), Some(hero)) => parts.push(format!("{player} ({hero})")),
        (Some(player), None) => parts.push(player.clone()),
        _ => {}
    }

    if let Some(matches) = winner.matches {
        let noun = if matches == 1 { "partida" } else { "partidas" };
        parts.push(format!("{matches} {noun}"));
    }

    if let Some(game) = &winner.game {
        if !game.map.is_empty() {
            let mut place = game.map.clone();
            if !game.date_iso.is_empty() {
                place.push(' ');
                place.push_str(&game.date_iso);
            }
            parts.push(place);
        }
        if !game.players.is_empty() {
            parts.push(game.players.join(", "));
        }
    }

    if let (Some(impact), Some(ratio)) = (winner.impact, winner.ratio) {
        parts.push(format!("impacto {}, ratio {}", impact as i64, ratio as i64));
    }

    parts.join(" · ")
}

fn award_lines(snapshot: &ViewSnapshot) -> Vec<String> {
    if snapshot.awards.is_empty() {
        return vec!["Sin datos todavía.".to_string()];
    }
    snapshot
        .awards
        .iter()
        .map(|(name, winner)| {
            format!(
                "{name:<28} {value:>12}  {context}",
                value = winner.formatted_value,
                context = describe_winner(winner)
            )
        })
        .collect()
}

fn group_lines(groups: &[GroupStats]) -> Vec<String> {
    if groups.is_empty() {
        return vec!["Sin datos todavía.".to_string()];
    }
    groups
        .iter()
        .map(|g| {
            format!(
                "{name:<24} {matches:>5}  {rate:>7}",
                name = g.name,
                matches = g.matches,
                rate = format_percent(g.win_rate, 1)
            )
        })
        .collect()
}

fn players_lines(snapshot: &ViewSnapshot) -> Vec<String> {
    let mut lines = vec!["Más activos".to_string()];
    lines.extend(group_lines(&snapshot.players));
    lines.push(String::new());
    lines.push("Mejor winrate".to_string());
    lines.extend(group_lines(&snapshot.players_by_win_rate));
    lines
}

fn heroes_lines(snapshot: &ViewSnapshot) -> Vec<String> {
    let mut lines = vec!["Más jugados".to_string()];
    lines.extend(group_lines(&snapshot.heroes_by_picks));
    lines.push(String::new());
    lines.push("Mejor winrate".to_string());
    lines.extend(group_lines(&snapshot.heroes_by_win_rate));
    lines
}

fn table_lines(tables: &[AwardTable]) -> Vec<String> {
    if tables.is_empty() {
        return vec!["Sin tablas de premios.".to_string()];
    }

    let mut lines = Vec::new();
    for table in tables {
        lines.push(format!("{} ({})", table.name, table.value_label));
        for entry in &table.entries {
            let player = entry.get("PlayerName").map(String::as_str).unwrap_or("-");
            let hero = entry.get("HeroName").map(String::as_str).unwrap_or("-");
            let value = entry
                .get(table.value_column.as_str())
                .map(String::as_str)
                .unwrap_or("");
            lines.push(format!(
                "  {player:<20} {hero:<16} {}",
                format_award_value(value, table.is_time)
            ));
        }
        lines.push(String::new());
    }
    lines.pop();
    lines
}

/// Trend rows shown at the bottom of the overview panel.
const TREND_PERIODS: usize = 4;

fn overview_lines(snapshot: &ViewSnapshot) -> Vec<String> {
    let m = &snapshot.overview;
    let mut lines = vec![
        format!("Partidas        {}", format_number(m.total_matches as f64)),
        format!("Winrate         {}", format_percent(m.win_rate, 1)),
        format!("Kills           {}", format_number(m.total_kills as f64)),
        format!("Muertes         {}", format_number(m.total_deaths as f64)),
        format!("Asistencias     {}", format_number(m.total_assists as f64)),
        format!("Kills/partida   {:.1}", m.avg_kills),
        format!("Muertes/partida {:.1}", m.avg_deaths),
        format!("Daño medio      {}", format_number(m.avg_hero_damage)),
        format!(
            "Duración media  {}",
            format_duration(m.avg_game_time_secs as u32)
        ),
    ];

    if !snapshot.roles.is_empty() {
        lines.push(String::new());
        for share in snapshot.roles.iter().take(3) {
            lines.push(format!(
                "{:<15} {}",
                share.role.label(),
                format_percent(share.share, 0)
            ));
        }
    }

    if !snapshot.trend.is_empty() {
        lines.push(String::new());
        let recent = snapshot.trend.len().saturating_sub(TREND_PERIODS);
        for period in &snapshot.trend[recent..] {
            lines.push(format!(
                "{:<9} {:>3} partidas  {}",
                period.period,
                period.matches,
                format_percent(period.win_rate, 0)
            ));
        }
    }

    lines
}

fn fun_lines(fun: &FunFacts) -> Vec<String> {
    let mut lines = Vec::new();
    if let Some(f) = &fun.most_on_fire {
        lines.push(format!(
            "En llamas       {} ({})",
            f.name,
            format_duration(f.value as u32)
        ));
    }
    if let Some(f) = &fun.most_time_dead {
        lines.push(format!(
            "Más muerto      {} ({})",
            f.name,
            format_duration(f.value as u32)
        ));
    }
    if let Some(f) = &fun.kamikaze {
        lines.push(format!("Kamikaze        {} ({:.1}/partida)", f.name, f.value));
    }
    if let Some(f) = &fun.clutch_hero {
        lines.push(format!(
            "Héroe clutch    {} ({})",
            f.name,
            format_percent(f.win_rate, 0)
        ));
    }
    if let Some(f) = &fun.most_violent_game {
        lines.push(format!(
            "Más violento    {} ({}) {}",
            f.player_name,
            f.hero_name,
            format_number(f.value)
        ));
    }
    if let Some(f) = &fun.cursed_map {
        lines.push(format!(
            "Mapa maldito    {} ({})",
            f.name,
            format_percent(f.win_rate, 0)
        ));
    }
    if lines.is_empty() {
        lines.push("Sin datos todavía.".to_string());
    }
    lines
}

fn main_panel_lines(state: &ViewState) -> Vec<String> {
    match state.active_tab {
        TabId::Awards => award_lines(&state.snapshot),
        TabId::Players => players_lines(&state.snapshot),
        TabId::Heroes => heroes_lines(&state.snapshot),
        TabId::Maps => group_lines(&state.snapshot.maps),
        TabId::Tables => table_lines(&state.snapshot.tables),
    }
}

// ---------------------------------------------------------------------------
// Render frame
// ---------------------------------------------------------------------------

fn render_frame(frame: &mut Frame, state: &ViewState) {
    let layout = build_layout(frame.area());

    render_status_bar(frame, &layout, state);
    render_filter_banner(frame, &layout, state);
    render_main_panel(frame, &layout, state);
    render_overview(frame, &layout, state);
    render_fun_facts(frame, &layout, state);
    render_help_bar(frame, &layout, state);
}

fn render_status_bar(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let filters = &state.snapshot.filters;
    let (status_text, status_color) = match &state.snapshot.status {
        LoadStatus::Loading => ("Cargando...".to_string(), Color::Yellow),
        LoadStatus::Ready => ("Listo".to_string(), Color::Green),
        LoadStatus::Failed(message) => (format!("Error: {message}"), Color::Red),
    };

    let text = format!(
        " Nexus Stats | {status_text} | {}/{} filas | {}",
        filters.filtered_rows, filters.total_rows, filters.date_range
    );
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        text,
        Style::default().fg(status_color),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.status_bar);
}

fn render_filter_banner(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let filters = &state.snapshot.filters;
    let role = filters
        .role
        .map(|r| r.label().to_string())
        .unwrap_or_else(|| "todos".to_string());
    let listed = if filters.only_listed_players { "sí" } else { "no" };
    let search = if state.search_mode {
        format!("{}_", state.search_input)
    } else if filters.search.is_empty() {
        "-".to_string()
    } else {
        filters.search.clone()
    };

    let content = format!(
        "Rol: {role} | {} | Buscar: {search} | Solo listados: {listed}",
        filters.winner.label()
    );
    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Filtros"),
    );
    frame.render_widget(paragraph, layout.filter_banner);
}

fn render_main_panel(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let lines = main_panel_lines(state);
    let visible = layout.main_panel.height.saturating_sub(2) as usize;
    let max_scroll = lines.len().saturating_sub(visible.max(1));
    let offset = state.scroll.min(max_scroll);

    let content = lines
        .iter()
        .skip(offset)
        .cloned()
        .collect::<Vec<_>>()
        .join("\n");

    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .title(state.active_tab.title()),
    );
    frame.render_widget(paragraph, layout.main_panel);
}

fn render_overview(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let content = overview_lines(&state.snapshot).join("\n");
    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Resumen"),
    );
    frame.render_widget(paragraph, layout.overview);
}

fn render_fun_facts(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let content = fun_lines(&state.snapshot.fun).join("\n");
    let paragraph = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::ALL)
            .title("Fun Facts"),
    );
    frame.render_widget(paragraph, layout.fun_facts);
}

fn render_help_bar(frame: &mut Frame, layout: &AppLayout, state: &ViewState) {
    let text = if state.search_mode {
        " Escribe para buscar | Enter:Aceptar | Esc:Cancelar"
    } else {
        " q:Salir | 1-5:Pestañas | /:Buscar | w:Resultado | o:Rol | g:Listados | x:Reset | r:Recargar"
    };
    let paragraph = Paragraph::new(Line::from(vec![Span::styled(
        text,
        Style::default().fg(Color::White).add_modifier(Modifier::DIM),
    )]))
    .style(Style::default().bg(Color::DarkGray));
    frame.render_widget(paragraph, layout.help_bar);
}

// ---------------------------------------------------------------------------
// Main TUI loop
// ---------------------------------------------------------------------------

/// Run the TUI event loop.
///
/// 1. Initializes the terminal (raw mode, alternate screen).
/// 2. Installs a panic hook to restore the terminal on crash.
/// 3. Runs an async select loop: UI updates, keyboard input, render ticks.
/// 4. Restores the terminal on clean exit.
pub async fn run(
    mut ui_rx: mpsc::Receiver<UiUpdate>,
    cmd_tx: mpsc::Sender<UserCommand>,
) -> anyhow::Result<()> {
    let mut terminal = ratatui::init();

    // Restore the terminal even if rendering panics.
    let original_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |panic_info| {
        let _ = ratatui::restore();
        original_hook(panic_info);
    }));

    let mut view_state = ViewState::default();
    let mut event_stream = EventStream::new();

    let mut render_tick = tokio::time::interval(Duration::from_millis(33));
    render_tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            update = ui_rx.recv() => {
                match update {
                    Some(ui_update) => {
                        apply_ui_update(&mut view_state, ui_update);
                    }
                    None => {
                        // Channel closed: app is shutting down
                        break;
                    }
                }
            }

            maybe_event = event_stream.next() => {
                match maybe_event {
                    Some(Ok(Event::Key(key_event))) => {
                        if key_event.code == KeyCode::Char('c')
                            && key_event.modifiers.contains(KeyModifiers::CONTROL)
                        {
                            let _ = cmd_tx.send(UserCommand::Quit).await;
                            break;
                        }
                        if key_event.code == KeyCode::Char('q') && !view_state.search_mode {
                            let _ = cmd_tx.send(UserCommand::Quit).await;
                            break;
                        }
                        input::handle_key(key_event, &mut view_state, &cmd_tx).await;
                    }
                    Some(Ok(_)) => {
                        // Mouse / resize events: the next tick re-renders
                    }
                    Some(Err(_)) | None => {
                        break;
                    }
                }
            }

            _ = render_tick.tick() => {
                terminal.draw(|frame| render_frame(frame, &view_state))?;
            }
        }
    }

    ratatui::restore();

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::FilterSummary;

    #[test]
    fn view_state_default_is_sensible() {
        let state = ViewState::default();
        assert_eq!(state.active_tab, TabId::Awards);
        assert_eq!(state.scroll, 0);
        assert!(!state.search_mode);
        assert!(state.search_input.is_empty());
        assert_eq!(state.snapshot.status, LoadStatus::Loading);
        assert!(state.snapshot.awards.is_empty());
    }

    #[test]
    fn apply_snapshot_replaces_view_data() {
        let mut state = ViewState::default();
        let snapshot = ViewSnapshot {
            status: LoadStatus::Ready,
            filters: FilterSummary {
                filtered_rows: 42,
                total_rows: 100,
                ..FilterSummary::default()
            },
            ..ViewSnapshot::default()
        };

        apply_ui_update(&mut state, UiUpdate::Snapshot(Box::new(snapshot)));
        assert_eq!(state.snapshot.status, LoadStatus::Ready);
        assert_eq!(state.snapshot.filters.filtered_rows, 42);
    }

    #[test]
    fn describe_winner_player_and_game() {
        let winner = AwardWinner {
            player: Some("Indigente".to_string()),
            hero: Some("Valla".to_string()),
            game: Some(crate::awards::GameRef {
                map: "Cursed Hollow".to_string(),
                date_iso: "2025-03-14".to_string(),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert_eq!(
            describe_winner(&winner),
            "Indigente (Valla) · Cursed Hollow 2025-03-14"
        );
    }

    #[test]
    fn describe_winner_average_award() {
        let winner = AwardWinner {
            player: Some("Indigente".to_string()),
            matches: Some(2),
            ..Default::default()
        };
        assert_eq!(describe_winner(&winner), "Indigente · 2 partidas");
    }

    #[test]
    fn describe_winner_singular_match() {
        let winner = AwardWinner {
            player: Some("A".to_string()),
            matches: Some(1),
            ..Default::default()
        };
        assert_eq!(describe_winner(&winner), "A · 1 partida");
    }

    #[test]
    fn describe_winner_fake_damage_context() {
        let winner = AwardWinner {
            player: Some("B".to_string()),
            matches: Some(3),
            impact: Some(2.0),
            ratio: Some(25_000.0),
            ..Default::default()
        };
        assert_eq!(
            describe_winner(&winner),
            "B · 3 partidas · impacto 2, ratio 25000"
        );
    }

    #[test]
    fn describe_winner_match_award_lists_players() {
        let winner = AwardWinner {
            game: Some(crate::awards::GameRef {
                map: "Cursed Hollow".to_string(),
                date_iso: "2025-03-14".to_string(),
                replay_name: "r".to_string(),
                players: vec!["A".to_string(), "B".to_string()],
            }),
            ..Default::default()
        };
        assert_eq!(
            describe_winner(&winner),
            "Cursed Hollow 2025-03-14 · A, B"
        );
    }

    #[test]
    fn empty_snapshot_renders_placeholder_lines() {
        let state = ViewState::default();
        assert_eq!(award_lines(&state.snapshot), vec!["Sin datos todavía."]);
        assert_eq!(group_lines(&state.snapshot.players), vec!["Sin datos todavía."]);
        assert_eq!(table_lines(&state.snapshot.tables), vec!["Sin tablas de premios."]);
    }

    #[test]
    fn award_lines_include_value_and_context() {
        let mut snapshot = ViewSnapshot::default();
        snapshot.awards.push((
            "Asesino en Serie".to_string(),
            AwardWinner {
                player: Some("A".to_string()),
                value: 15.0,
                formatted_value: "15".to_string(),
                matches: Some(2),
                ..Default::default()
            },
        ));

        let lines = award_lines(&snapshot);
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("Asesino en Serie"));
        assert!(lines[0].contains("15"));
        assert!(lines[0].contains("A · 2 partidas"));
    }

    #[test]
    fn heroes_lines_have_both_sections() {
        let snapshot = ViewSnapshot::default();
        let lines = heroes_lines(&snapshot);
        assert!(lines.iter().any(|l| l == "Más jugados"));
        assert!(lines.iter().any(|l| l == "Mejor winrate"));
    }

    #[test]
    fn players_lines_have_both_sections() {
        let snapshot = ViewSnapshot::default();
        let lines = players_lines(&snapshot);
        assert!(lines.iter().any(|l| l == "Más activos"));
        assert!(lines.iter().any(|l| l == "Mejor winrate"));
    }

    #[test]
    fn overview_lines_include_roles_and_trend_when_present() {
        let mut snapshot = ViewSnapshot::default();
        snapshot.roles.push(crate::metrics::RoleShare {
            role: crate::dataset::normalize::Role::Healer,
            count: 3,
            share: 0.25,
        });
        snapshot.trend.push(crate::metrics::PeriodStats {
            period: "2025-W11".to_string(),
            matches: 5,
            wins: 3,
            win_rate: 0.6,
        });

        let lines = overview_lines(&snapshot);
        assert!(lines.iter().any(|l| l.starts_with("Healer")));
        assert!(lines.iter().any(|l| l.contains("2025-W11")));
    }

    #[test]
    fn overview_lines_skip_empty_sections() {
        let snapshot = ViewSnapshot::default();
        let lines = overview_lines(&snapshot);
        assert!(!lines.iter().any(String::is_empty));
    }

    #[test]
    fn table_lines_render_entries() {
        let mut entry = std::collections::HashMap::new();
        entry.insert("PlayerName".to_string(), "Indigente".to_string());
        entry.insert("HeroName".to_string(), "Valla".to_string());
        entry.insert("HeroKills".to_string(), "21".to_string());

        let tables = vec![AwardTable {
            name: "Top Kills".to_string(),
            value_column: "HeroKills".to_string(),
            value_label: "Kills".to_string(),
            is_time: false,
            entries: vec![entry],
        }];

        let lines = table_lines(&tables);
        assert_eq!(lines[0], "Top Kills (Kills)");
        assert!(lines[1].contains("Indigente"));
        assert!(lines[1].contains("21"));
    }
}
