//! Top-level UI layout: one view at a time, status bar, overlays on top.

pub mod coin;
pub mod explore;
pub mod help;
pub mod overlays;
pub mod queries;
pub mod status_bar;

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::widgets::{Block, Borders};
use ratatui::Frame;

use crate::app::{AppState, Overlay, Panel};
use crate::theme;

/// Draw the entire UI.
pub fn draw(f: &mut Frame, app: &AppState) {
    f.render_widget(
        Block::default().style(Style::default().bg(theme::BACKGROUND)),
        f.area(),
    );

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(1)])
        .split(f.area());
    let main_area = chunks[0];
    let status_area = chunks[1];

    draw_panel(f, main_area, app);
    status_bar::render(f, status_area, app);

    match &app.overlay {
        Overlay::DateInput { field, buffer } => {
            overlays::render_date_input(f, main_area, field.label(), buffer)
        }
        Overlay::ErrorHistory => overlays::render_error_history(f, main_area, app),
        Overlay::None => {}
    }
}

fn draw_panel(f: &mut Frame, area: Rect, app: &AppState) {
    let panel = app.active_panel;

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(theme::panel_border(true))
        .title(format!(" {} [{}] ", panel.label(), panel.index() + 1))
        .title_style(theme::panel_title(true));

    let inner = block.inner(area);
    f.render_widget(block, area);

    match panel {
        Panel::Explore => explore::render(f, inner, app),
        Panel::Queries => queries::render(f, inner, app),
        Panel::Coin => coin::render(f, inner, app),
        Panel::Help => help::render(f, inner),
    }
}

/// Compute a centered rect for overlays.
pub fn centered_rect(percent_x: u16, percent_y: u16, area: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(area);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Format an optional number with thousands separators, or a dash.
pub fn fmt_money(value: Option<f64>) -> String {
    let Some(v) = value else {
        return "—".to_string();
    };
    let fixed = format!("{:.2}", v.abs());
    let (int_part, frac) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    let sign = if v < 0.0 { "-" } else { "" };
    format!("{sign}{grouped}.{frac}")
}

/// First row to show so that `cursor` stays inside a window of `height` rows.
pub fn window_start(cursor: usize, height: usize) -> usize {
    if height == 0 {
        return cursor;
    }
    cursor.saturating_sub(height - 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::tests::seeded_app;
    use crate::app::DateField;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;

    #[test]
    fn money_format() {
        assert_eq!(fmt_money(None), "—");
        assert_eq!(fmt_money(Some(97_500.0)), "97,500.00");
        assert_eq!(fmt_money(Some(73.567)), "73.57");
        assert_eq!(fmt_money(Some(1_234_567.891)), "1,234,567.89");
        assert_eq!(fmt_money(Some(-12.5)), "-12.50");
    }

    #[test]
    fn window_keeps_cursor_visible() {
        assert_eq!(window_start(0, 10), 0);
        assert_eq!(window_start(9, 10), 0);
        assert_eq!(window_start(12, 10), 3);
    }

    fn screen(app: &AppState) -> String {
        let mut terminal = Terminal::new(TestBackend::new(120, 40)).unwrap();
        terminal.draw(|f| draw(f, app)).unwrap();
        let buffer = terminal.backend().buffer().clone();
        let mut text = String::new();
        for y in 0..buffer.area.height {
            for x in 0..buffer.area.width {
                text.push_str(buffer[(x, y)].symbol());
            }
            text.push('\n');
        }
        text
    }

    #[test]
    fn every_panel_renders() {
        let mut app = seeded_app();
        for panel in Panel::ALL {
            app.switch_panel(panel);
            let text = screen(&app);
            assert!(text.contains(panel.label()), "{} missing", panel.label());
        }
    }

    #[test]
    fn explore_shows_the_inverted_range_warning() {
        let mut app = seeded_app();
        app.set_date(DateField::ExploreEnd, chrono::NaiveDate::from_ymd_opt(2020, 1, 1).unwrap());
        assert!(screen(&app).contains("Start date must be before end date."));
    }

    #[test]
    fn coin_view_reports_an_empty_range() {
        let mut app = seeded_app();
        app.switch_panel(Panel::Coin);
        app.cycle_coin(false);
        assert!(screen(&app).contains("No daily prices in this range."));
    }

    #[test]
    fn query_output_shows_its_row_count() {
        let mut app = seeded_app();
        app.switch_panel(Panel::Queries);
        app.run_selected_query();
        let rows = app.queries.result.as_ref().unwrap().row_count();
        assert!(screen(&app).contains(&format!("{rows} rows")));
    }
}
