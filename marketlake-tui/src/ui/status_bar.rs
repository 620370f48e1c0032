//! Bottom status bar: view hints and the last status message.

use ratatui::layout::Rect;
use ratatui::text::{Line, Span};
use ratatui::widgets::Paragraph;
use ratatui::Frame;

use crate::app::{AppState, Panel, StatusLevel};
use crate::theme;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let mut spans: Vec<Span> = vec![Span::raw(" ")];

    for panel in Panel::ALL {
        let style = if panel == app.active_panel {
            theme::accent_bold()
        } else {
            theme::muted()
        };
        spans.push(Span::styled(
            format!("{}:{} ", panel.index() + 1, panel.label()),
            style,
        ));
    }

    if !app.error_history.is_empty() {
        spans.push(Span::styled(
            format!("E:{} errors ", app.error_history.len()),
            theme::negative(),
        ));
    }

    spans.push(Span::raw("| "));

    if let Some((msg, level)) = &app.status_message {
        let style = match level {
            StatusLevel::Info => theme::accent(),
            StatusLevel::Warning => theme::warning(),
            StatusLevel::Error => theme::negative(),
        };
        spans.push(Span::styled(msg.as_str(), style));
    }

    f.render_widget(Paragraph::new(Line::from(spans)), area);
}
