// Keyboard handling for the dashboard.
//
// Quit keys (q / Ctrl+C) are handled in the main TUI loop; everything else
// lands here. While the search input is active, printable keys edit the
// query and each edit is pushed to the orchestrator immediately so the view
// filters as you type.

use crossterm::event::{KeyCode, KeyEvent};
use tokio::sync::mpsc;

use crate::protocol::{TabId, UserCommand};
use crate::tui::ViewState;

/// Lines scrolled by PageUp/PageDown.
const PAGE_STEP: usize = 10;

pub async fn handle_key(
    key: KeyEvent,
    state: &mut ViewState,
    cmd_tx: &mpsc::Sender<UserCommand>,
) {
    if state.search_mode {
        handle_search_key(key, state, cmd_tx).await;
        return;
    }

    match key.code {
        KeyCode::Char('/') => {
            state.search_mode = true;
        }
        KeyCode::Char(c @ '1'..='5') => {
            let index = c.to_digit(10).unwrap_or(0) as usize;
            if let Some(tab) = TabId::from_index(index) {
                if tab != state.active_tab {
                    state.active_tab = tab;
                    state.scroll = 0;
                }
            }
        }
        KeyCode::Char('w') => {
            let _ = cmd_tx.send(UserCommand::CycleWinner).await;
        }
        KeyCode::Char('o') => {
            let _ = cmd_tx.send(UserCommand::CycleRole).await;
        }
        KeyCode::Char('g') => {
            let _ = cmd_tx.send(UserCommand::ToggleListedOnly).await;
        }
        KeyCode::Char('x') => {
            state.search_input.clear();
            let _ = cmd_tx.send(UserCommand::ResetFilters).await;
        }
        KeyCode::Char('r') => {
            let _ = cmd_tx.send(UserCommand::Reload).await;
        }
        KeyCode::Up => {
            state.scroll = state.scroll.saturating_sub(1);
        }
        KeyCode::Down => {
            state.scroll = state.scroll.saturating_add(1);
        }
        KeyCode::PageUp => {
            state.scroll = state.scroll.saturating_sub(PAGE_STEP);
        }
        KeyCode::PageDown => {
            state.scroll = state.scroll.saturating_add(PAGE_STEP);
        }
        _ => {}
    }
}

async fn handle_search_key(
    key: KeyEvent,
    state: &mut ViewState,
    cmd_tx: &mpsc::Sender<UserCommand>,
) {
    match key.code {
        KeyCode::Esc => {
            state.search_mode = false;
            state.search_input.clear();
            let _ = cmd_tx.send(UserCommand::SetSearch(String::new())).await;
        }
        KeyCode::Enter => {
            state.search_mode = false;
        }
        KeyCode::Backspace => {
            state.search_input.pop();
            let _ = cmd_tx
                .send(UserCommand::SetSearch(state.search_input.clone()))
                .await;
        }
        KeyCode::Char(c) => {
            state.search_input.push(c);
            let _ = cmd_tx
                .send(UserCommand::SetSearch(state.search_input.clone()))
                .await;
        }
        _ => {}
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crossterm::event::KeyModifiers;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn setup() -> (ViewState, mpsc::Sender<UserCommand>, mpsc::Receiver<UserCommand>) {
        let (tx, rx) = mpsc::channel(16);
        (ViewState::default(), tx, rx)
    }

    #[tokio::test]
    async fn number_keys_switch_tabs_and_reset_scroll() {
        let (mut state, tx, _rx) = setup();
        state.scroll = 7;

        handle_key(key(KeyCode::Char('3')), &mut state, &tx).await;
        assert_eq!(state.active_tab, TabId::Heroes);
        assert_eq!(state.scroll, 0);
    }

    #[tokio::test]
    async fn same_tab_keeps_scroll() {
        let (mut state, tx, _rx) = setup();
        state.active_tab = TabId::Players;
        state.scroll = 4;

        handle_key(key(KeyCode::Char('2')), &mut state, &tx).await;
        assert_eq!(state.scroll, 4);
    }

    #[tokio::test]
    async fn filter_keys_send_commands() {
        let (mut state, tx, mut rx) = setup();

        handle_key(key(KeyCode::Char('w')), &mut state, &tx).await;
        handle_key(key(KeyCode::Char('o')), &mut state, &tx).await;
        handle_key(key(KeyCode::Char('g')), &mut state, &tx).await;
        handle_key(key(KeyCode::Char('x')), &mut state, &tx).await;
        handle_key(key(KeyCode::Char('r')), &mut state, &tx).await;

        assert_eq!(rx.recv().await, Some(UserCommand::CycleWinner));
        assert_eq!(rx.recv().await, Some(UserCommand::CycleRole));
        assert_eq!(rx.recv().await, Some(UserCommand::ToggleListedOnly));
        assert_eq!(rx.recv().await, Some(UserCommand::ResetFilters));
        assert_eq!(rx.recv().await, Some(UserCommand::Reload));
    }

    #[tokio::test]
    async fn scroll_keys_adjust_offset() {
        let (mut state, tx, _rx) = setup();

        handle_key(key(KeyCode::Down), &mut state, &tx).await;
        handle_key(key(KeyCode::Down), &mut state, &tx).await;
        assert_eq!(state.scroll, 2);

        handle_key(key(KeyCode::Up), &mut state, &tx).await;
        assert_eq!(state.scroll, 1);

        handle_key(key(KeyCode::PageDown), &mut state, &tx).await;
        assert_eq!(state.scroll, 11);

        handle_key(key(KeyCode::PageUp), &mut state, &tx).await;
        assert_eq!(state.scroll, 1);

        // Never underflows
        handle_key(key(KeyCode::PageUp), &mut state, &tx).await;
        assert_eq!(state.scroll, 0);
    }

    #[tokio::test]
    async fn search_mode_edits_query_live() {
        let (mut state, tx, mut rx) = setup();

        handle_key(key(KeyCode::Char('/')), &mut state, &tx).await;
        assert!(state.search_mode);

        handle_key(key(KeyCode::Char('v')), &mut state, &tx).await;
        handle_key(key(KeyCode::Char('a')), &mut state, &tx).await;
        assert_eq!(state.search_input, "va");
        assert_eq!(rx.recv().await, Some(UserCommand::SetSearch("v".to_string())));
        assert_eq!(rx.recv().await, Some(UserCommand::SetSearch("va".to_string())));

        handle_key(key(KeyCode::Backspace), &mut state, &tx).await;
        assert_eq!(rx.recv().await, Some(UserCommand::SetSearch("v".to_string())));

        handle_key(key(KeyCode::Enter), &mut state, &tx).await;
        assert!(!state.search_mode);
        assert_eq!(state.search_input, "v");
    }

    #[tokio::test]
    async fn escape_cancels_search() {
        let (mut state, tx, mut rx) = setup();
        state.search_mode = true;
        state.search_input = "valla".to_string();

        handle_key(key(KeyCode::Esc), &mut state, &tx).await;
        assert!(!state.search_mode);
        assert!(state.search_input.is_empty());
        assert_eq!(rx.recv().await, Some(UserCommand::SetSearch(String::new())));
    }

    #[tokio::test]
    async fn command_keys_are_inert_in_search_mode() {
        let (mut state, tx, mut rx) = setup();
        state.search_mode = true;

        // 'w' must edit the query, not cycle the winner filter
        handle_key(key(KeyCode::Char('w')), &mut state, &tx).await;
        assert_eq!(state.search_input, "w");
        assert_eq!(rx.recv().await, Some(UserCommand::SetSearch("w".to_string())));
    }
}
