//! Coin view: top coins by market cap rank, braille price chart and table.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::Style;
use ratatui::symbols;
use ratatui::text::{Line, Span};
use ratatui::widgets::{Axis, Chart, Dataset, GraphType, Paragraph, Row, Table};
use ratatui::Frame;

use marketlake_core::domain::format_date;
use marketlake_core::report::PricePoint;

use crate::app::AppState;
use crate::theme;
use crate::ui::fmt_money;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let c = &app.coin;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(2),
            Constraint::Min(3),
        ])
        .split(area);

    // Coin selector
    let mut tabs: Vec<Span> = Vec::new();
    if c.coins.is_empty() {
        tabs.push(Span::styled("No coins in the snapshot table.", theme::muted()));
    }
    for (i, coin) in c.coins.iter().enumerate() {
        let style = if i == c.selected {
            theme::selected()
        } else {
            theme::text()
        };
        tabs.push(Span::styled(format!(" {} ", coin.label()), style));
        tabs.push(Span::raw(" "));
    }
    f.render_widget(Paragraph::new(Line::from(tabs)), chunks[0]);

    let range = Line::from(vec![
        Span::styled("Range: ", theme::muted()),
        Span::styled(
            format!("{} to {}", format_date(c.start), format_date(c.end)),
            theme::accent_bold(),
        ),
        Span::styled(
            "  [h/l]coin [s]tart [e]nd [r]eset [j/k]scroll",
            theme::muted(),
        ),
    ]);
    f.render_widget(Paragraph::new(range), chunks[1]);

    if let Some(warning) = &c.warning {
        f.render_widget(
            Paragraph::new(Span::styled(warning.as_str(), theme::warning())),
            chunks[2],
        );
        return;
    }
    if c.history.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled("No daily prices in this range.", theme::muted())),
            chunks[2],
        );
        return;
    }

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(70), Constraint::Percentage(30)])
        .split(chunks[2]);
    let name = c.selected_coin().map(|coin| coin.name.as_str()).unwrap_or("");
    render_chart(f, body[0], name, &c.history);
    render_table(f, body[1], &c.history, c.scroll);
}

fn render_chart(f: &mut Frame, area: Rect, name: &str, history: &[PricePoint]) {
    let data: Vec<(f64, f64)> = history
        .iter()
        .enumerate()
        .map(|(i, p)| (i as f64, p.price_usd))
        .collect();

    let min_y = history.iter().map(|p| p.price_usd).fold(f64::INFINITY, f64::min);
    let max_y = history
        .iter()
        .map(|p| p.price_usd)
        .fold(f64::NEG_INFINITY, f64::max);
    let padding = ((max_y - min_y).abs() * 0.05).max(max_y.abs() * 0.01).max(0.01);
    let y_min = (min_y - padding).max(0.0);
    let y_max = max_y + padding;
    let x_max = history.len().saturating_sub(1) as f64;

    let (first, last) = match (history.first(), history.last()) {
        (Some(first), Some(last)) => (first, last),
        _ => return,
    };
    let line_style = theme::trend(first.price_usd, last.price_usd);

    let dataset = Dataset::default()
        .name(name)
        .marker(symbols::Marker::Braille)
        .style(line_style)
        .graph_type(GraphType::Line)
        .data(&data);

    let chart = Chart::new(vec![dataset])
        .x_axis(
            Axis::default()
                .style(theme::muted())
                .bounds([0.0, x_max.max(1.0)])
                .labels(vec![
                    Span::styled(format_date(first.date), theme::muted()),
                    Span::styled(format_date(last.date), theme::muted()),
                ]),
        )
        .y_axis(
            Axis::default()
                .title(Span::styled("USD", theme::muted()))
                .style(theme::muted())
                .bounds([y_min, y_max])
                .labels(vec![
                    Span::styled(format!("{y_min:.2}"), theme::muted()),
                    Span::styled(format!("{y_max:.2}"), theme::muted()),
                ]),
        )
        .style(Style::default());

    f.render_widget(chart, area);
}

fn render_table(f: &mut Frame, area: Rect, history: &[PricePoint], scroll: usize) {
    let header = Row::new(vec!["Date", "Price (USD)"]).style(theme::accent_bold());
    let visible = area.height.saturating_sub(1) as usize;
    let rows = history.iter().skip(scroll).take(visible).map(|p| {
        Row::new(vec![format_date(p.date), fmt_money(Some(p.price_usd))]).style(theme::text())
    });
    let table = Table::new(rows, [Constraint::Length(12), Constraint::Min(12)]).header(header);
    f.render_widget(table, area);
}
