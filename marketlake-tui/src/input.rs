//! Keyboard input dispatch: overlays → global keys → panel-specific handlers.

use crossterm::event::{KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use marketlake_core::catalog;
use marketlake_core::domain::{format_date, parse_date};

use crate::app::{AppState, DateField, ErrorCategory, Overlay, Panel};

pub fn handle_key(app: &mut AppState, key: KeyEvent) {
    // Only handle key press events (Windows sends both Press and Release).
    if key.kind != KeyEventKind::Press {
        return;
    }

    // 1. Overlays consume input first.
    match app.overlay {
        Overlay::DateInput { .. } => {
            handle_date_input(app, key);
            return;
        }
        Overlay::ErrorHistory => {
            handle_error_overlay(app, key);
            return;
        }
        Overlay::None => {}
    }

    // 2. Global keys.
    match key.code {
        KeyCode::Char('q') => {
            app.running = false;
            return;
        }
        KeyCode::Char(c @ '1'..='4') => {
            let index = c as usize - '1' as usize;
            if let Some(panel) = Panel::from_index(index) {
                app.switch_panel(panel);
            }
            return;
        }
        KeyCode::Tab => {
            let panel = if key.modifiers.contains(KeyModifiers::SHIFT) {
                app.active_panel.prev()
            } else {
                app.active_panel.next()
            };
            app.switch_panel(panel);
            return;
        }
        KeyCode::BackTab => {
            app.switch_panel(app.active_panel.prev());
            return;
        }
        KeyCode::Char('E') => {
            app.error_scroll = 0;
            app.overlay = Overlay::ErrorHistory;
            return;
        }
        _ => {}
    }

    // 3. Panel-specific keys.
    match app.active_panel {
        Panel::Explore => handle_explore_key(app, key),
        Panel::Queries => handle_queries_key(app, key),
        Panel::Coin => handle_coin_key(app, key),
        Panel::Help => {}
    }
}

fn open_date_input(app: &mut AppState, field: DateField) {
    app.overlay = Overlay::DateInput {
        field,
        buffer: format_date(app.date(field)),
    };
}

fn handle_date_input(app: &mut AppState, key: KeyEvent) {
    let Overlay::DateInput { field, buffer } = &mut app.overlay else {
        return;
    };
    let field = *field;

    match key.code {
        KeyCode::Esc => app.overlay = Overlay::None,
        KeyCode::Enter => match parse_date("date", buffer.trim()) {
            Ok(date) => {
                app.overlay = Overlay::None;
                app.set_date(field, date);
            }
            Err(e) => app.push_error(ErrorCategory::Input, e.to_string(), field.label().into()),
        },
        KeyCode::Backspace => {
            buffer.pop();
        }
        KeyCode::Char(c) if (c.is_ascii_digit() || c == '-') && buffer.len() < 10 => {
            buffer.push(c);
        }
        _ => {}
    }
}

fn handle_error_overlay(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('E') => {
            app.overlay = Overlay::None;
        }
        KeyCode::Char('j') | KeyCode::Down => {
            if app.error_scroll + 1 < app.error_history.len() {
                app.error_scroll += 1;
            }
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.error_scroll = app.error_scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn scroll_down(scroll: &mut usize, len: usize) {
    if *scroll + 1 < len {
        *scroll += 1;
    }
}

fn handle_explore_key(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Char('s') => open_date_input(app, DateField::ExploreStart),
        KeyCode::Char('e') => open_date_input(app, DateField::ExploreEnd),
        KeyCode::Char('r') => app.reset_explore_range(),
        KeyCode::Enter => app.refresh_explore(),
        KeyCode::Char('j') | KeyCode::Down => {
            scroll_down(&mut app.explore.scroll, app.explore.snapshot.len());
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.explore.scroll = app.explore.scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_queries_key(app: &mut AppState, key: KeyEvent) {
    let count = catalog::catalog().len();
    match key.code {
        KeyCode::Char('j') | KeyCode::Down => {
            scroll_down(&mut app.queries.cursor, count);
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.queries.cursor = app.queries.cursor.saturating_sub(1);
        }
        KeyCode::Char('g') | KeyCode::Home => app.queries.cursor = 0,
        KeyCode::Char('G') | KeyCode::End => app.queries.cursor = count.saturating_sub(1),
        KeyCode::Enter => app.run_selected_query(),
        KeyCode::Char('t') => {
            app.queries.cycle_ticker();
            if let Some(ticker) = app.queries.ticker() {
                let msg = format!("Ticker: {ticker}");
                app.set_status(msg);
            }
        }
        KeyCode::Char('J') | KeyCode::PageDown => {
            let rows = app.queries.result.as_ref().map_or(0, |r| r.row_count());
            scroll_down(&mut app.queries.scroll, rows);
        }
        KeyCode::Char('K') | KeyCode::PageUp => {
            app.queries.scroll = app.queries.scroll.saturating_sub(1);
        }
        _ => {}
    }
}

fn handle_coin_key(app: &mut AppState, key: KeyEvent) {
    match key.code {
        KeyCode::Char('l') | KeyCode::Right => app.cycle_coin(true),
        KeyCode::Char('h') | KeyCode::Left => app.cycle_coin(false),
        KeyCode::Char('s') => open_date_input(app, DateField::CoinStart),
        KeyCode::Char('e') => open_date_input(app, DateField::CoinEnd),
        KeyCode::Char('r') => app.reset_coin_range(),
        KeyCode::Enter => app.refresh_coin(),
        KeyCode::Char('j') | KeyCode::Down => {
            scroll_down(&mut app.coin.scroll, app.coin.history.len());
        }
        KeyCode::Char('k') | KeyCode::Up => {
            app.coin.scroll = app.coin.scroll.saturating_sub(1);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::{d, seeded_app};
    use crate::app::StatusLevel;

    fn press(app: &mut AppState, code: KeyCode) {
        handle_key(app, KeyEvent::new(code, KeyModifiers::NONE));
    }

    fn type_text(app: &mut AppState, text: &str) {
        for c in text.chars() {
            press(app, KeyCode::Char(c));
        }
    }

    #[test]
    fn number_keys_and_tab_switch_panels() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('3'));
        assert_eq!(app.active_panel, Panel::Coin);
        assert_eq!(app.coin.coins.len(), 3);

        press(&mut app, KeyCode::Tab);
        assert_eq!(app.active_panel, Panel::Help);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.active_panel, Panel::Explore);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.active_panel, Panel::Help);
        handle_key(&mut app, KeyEvent::new(KeyCode::Tab, KeyModifiers::SHIFT));
        assert_eq!(app.active_panel, Panel::Coin);
    }

    #[test]
    fn release_events_are_ignored() {
        let mut app = seeded_app();
        let mut key = KeyEvent::new(KeyCode::Char('q'), KeyModifiers::NONE);
        key.kind = KeyEventKind::Release;
        handle_key(&mut app, key);
        assert!(app.running);
        press(&mut app, KeyCode::Char('q'));
        assert!(!app.running);
    }

    #[test]
    fn date_overlay_edits_and_applies_the_range() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('s'));
        assert_eq!(
            app.overlay,
            Overlay::DateInput {
                field: DateField::ExploreStart,
                buffer: "2024-02-01".into()
            }
        );

        for _ in 0..10 {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "2025-01-03xyz");
        press(&mut app, KeyCode::Enter);

        assert_eq!(app.overlay, Overlay::None);
        assert_eq!(app.explore.start, d(2025, 1, 3));
        assert_eq!(app.explore.snapshot.len(), 1);
    }

    #[test]
    fn invalid_date_keeps_the_overlay_open() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('e'));
        for _ in 0..10 {
            press(&mut app, KeyCode::Backspace);
        }
        type_text(&mut app, "2025-13-01");
        press(&mut app, KeyCode::Enter);

        assert!(matches!(app.overlay, Overlay::DateInput { .. }));
        assert_eq!(app.error_history[0].category, ErrorCategory::Input);
        assert_eq!(app.explore.end, d(2025, 1, 31));

        press(&mut app, KeyCode::Esc);
        assert_eq!(app.overlay, Overlay::None);
    }

    #[test]
    fn query_keys_select_run_and_cycle_ticker() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('2'));
        press(&mut app, KeyCode::Char('k'));
        assert_eq!(app.queries.cursor, 0);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.queries.cursor, 1);
        press(&mut app, KeyCode::Char('G'));
        assert_eq!(app.queries.cursor, catalog::catalog().len() - 1);
        press(&mut app, KeyCode::Char('j'));
        assert_eq!(app.queries.cursor, catalog::catalog().len() - 1);

        press(&mut app, KeyCode::Char('g'));
        press(&mut app, KeyCode::Enter);
        assert!(app.queries.result.is_some());
        assert_eq!(app.queries.last_run, Some(0));

        press(&mut app, KeyCode::Char('t'));
        assert_eq!(app.queries.ticker(), Some("^IXIC"));
        assert_eq!(app.status_message.as_ref().unwrap().1, StatusLevel::Info);
    }

    #[test]
    fn coin_keys_cycle_coins() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('3'));
        press(&mut app, KeyCode::Char('h'));
        assert_eq!(app.coin.selected_coin().unwrap().id, "tether");
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.coin.selected_coin().unwrap().id, "bitcoin");
    }

    #[test]
    fn error_overlay_opens_and_closes() {
        let mut app = seeded_app();
        press(&mut app, KeyCode::Char('E'));
        assert_eq!(app.overlay, Overlay::ErrorHistory);
        press(&mut app, KeyCode::Char('q'));
        assert_eq!(app.overlay, Overlay::None);
        assert!(app.running);
    }
}
