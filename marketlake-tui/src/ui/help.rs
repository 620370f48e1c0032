//! Help view: keyboard shortcuts.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::theme;

pub fn render(f: &mut Frame, area: Rect) {
    let mut lines: Vec<Line> = Vec::new();

    section(&mut lines, "Global");
    key(&mut lines, "1-4", "Switch to view by number");
    key(&mut lines, "Tab / Shift+Tab", "Cycle views forward / back");
    key(&mut lines, "E", "Error history");
    key(&mut lines, "q", "Quit");
    lines.push(Line::from(""));

    section(&mut lines, "1 Explore");
    key(&mut lines, "s / e", "Edit start / end date (YYYY-MM-DD)");
    key(&mut lines, "r", "Reset to the default range");
    key(&mut lines, "Enter", "Recompute averages and snapshot");
    key(&mut lines, "j / k", "Scroll the snapshot table");
    lines.push(Line::from(""));

    section(&mut lines, "2 Queries");
    key(&mut lines, "j / k, g / G", "Select query, jump to first / last");
    key(&mut lines, "Enter", "Run the selected query");
    key(&mut lines, "t", "Cycle the ticker used by ticker queries");
    key(&mut lines, "J / K", "Scroll the output");
    lines.push(Line::from(""));

    section(&mut lines, "3 Coin");
    key(&mut lines, "h / l", "Previous / next coin");
    key(&mut lines, "s / e", "Edit start / end date");
    key(&mut lines, "r", "Reset to the default range");
    key(&mut lines, "j / k", "Scroll the price table");
    lines.push(Line::from(""));

    section(&mut lines, "Date input");
    key(&mut lines, "Enter / Esc", "Apply / cancel");

    f.render_widget(Paragraph::new(lines), area);
}

fn section(lines: &mut Vec<Line<'_>>, title: &str) {
    lines.push(Line::from(Span::styled(title.to_string(), theme::accent_bold())));
}

fn key(lines: &mut Vec<Line<'_>>, keys: &str, desc: &str) {
    lines.push(Line::from(vec![
        Span::styled(format!("  {keys:>16}  "), theme::accent()),
        Span::styled(desc.to_string(), theme::muted()),
    ]));
}
