//! Queries view: the predefined catalog and the output of the last run.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, Borders, Paragraph, Row, Table, Wrap};
use ratatui::Frame;

use marketlake_core::catalog;

use crate::app::AppState;
use crate::theme;
use crate::ui::window_start;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(42), Constraint::Percentage(58)])
        .split(area);

    render_list(f, chunks[0], app);
    render_output(f, chunks[1], app);
}

fn render_list(f: &mut Frame, area: Rect, app: &AppState) {
    let q = &app.queries;
    let ticker = q.ticker().unwrap_or("-");
    let mut lines = vec![
        Line::from(vec![
            Span::styled("Ticker: ", theme::muted()),
            Span::styled(ticker.to_string(), theme::accent_bold()),
            Span::styled("  [j/k]select [Enter]run [t]icker", theme::muted()),
        ]),
        Line::from(""),
    ];

    let height = area.height.saturating_sub(2) as usize;
    let start = window_start(q.cursor, height);
    for (i, query) in catalog::catalog().iter().enumerate().skip(start).take(height) {
        let style = if i == q.cursor {
            theme::selected()
        } else if q.last_run == Some(i) {
            theme::accent()
        } else {
            theme::text()
        };
        let mut label = query.label();
        if query.takes_ticker() {
            label.push_str(&format!(" [{ticker}]"));
        }
        lines.push(Line::from(Span::styled(format!("{:>2} {label}", i + 1), style)));
    }

    f.render_widget(Paragraph::new(lines), area);
}

fn render_output(f: &mut Frame, area: Rect, app: &AppState) {
    let q = &app.queries;
    let title = match q.last_run.and_then(|i| catalog::catalog().get(i)) {
        Some(query) => format!(" {} ", query.name),
        None => " Output ".to_string(),
    };
    let block = Block::default()
        .borders(Borders::LEFT)
        .border_style(theme::muted())
        .title(title)
        .title_style(theme::accent_bold());
    let inner = block.inner(area);
    f.render_widget(block, area);

    if let Some(error) = &q.error {
        f.render_widget(
            Paragraph::new(Span::styled(error.as_str(), theme::negative())).wrap(Wrap { trim: true }),
            inner,
        );
        return;
    }

    let Some(result) = &q.result else {
        f.render_widget(
            Paragraph::new(Span::styled("Select a query and press Enter.", theme::muted())),
            inner,
        );
        return;
    };

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(inner);
    f.render_widget(
        Paragraph::new(Span::styled(
            format!("{} rows  [J/K]scroll", result.row_count()),
            theme::muted(),
        )),
        chunks[0],
    );

    if result.columns.is_empty() {
        return;
    }
    let header = Row::new(result.columns.iter().map(String::as_str)).style(theme::accent_bold());
    let visible = chunks[1].height.saturating_sub(1) as usize;
    let rows = result
        .rows
        .iter()
        .skip(q.scroll)
        .take(visible)
        .map(|row| Row::new(row.iter().map(|cell| cell.to_string())).style(theme::text()));
    let widths = vec![Constraint::Fill(1); result.columns.len()];

    f.render_widget(Table::new(rows, widths).header(header), chunks[1]);
}
