//! Explore view: four-series averages and the aligned daily snapshot.

use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Paragraph, Row, Table};
use ratatui::Frame;

use marketlake_core::domain::format_date;

use crate::app::AppState;
use crate::theme;
use crate::ui::fmt_money;

pub fn render(f: &mut Frame, area: Rect, app: &AppState) {
    let ex = &app.explore;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Length(6),
            Constraint::Min(3),
        ])
        .split(area);

    let header = Line::from(vec![
        Span::styled("Range: ", theme::muted()),
        Span::styled(
            format!("{} to {}", format_date(ex.start), format_date(ex.end)),
            theme::accent_bold(),
        ),
        Span::styled(
            "  [s]tart [e]nd [r]eset [Enter]refresh [j/k]scroll",
            theme::muted(),
        ),
    ]);
    f.render_widget(Paragraph::new(header), chunks[0]);

    if let Some(warning) = &ex.warning {
        f.render_widget(
            Paragraph::new(Span::styled(warning.as_str(), theme::warning())),
            chunks[1],
        );
        return;
    }

    let averages = ex.averages.unwrap_or_default();
    let s = &app.series;
    let avg_line = |label: String, value: Option<f64>| {
        Line::from(vec![
            Span::styled(format!("  {label:<28}"), theme::text()),
            Span::styled(
                fmt_money(value),
                if value.is_some() {
                    theme::accent()
                } else {
                    theme::muted()
                },
            ),
        ])
    };
    let lines = vec![
        Line::from(Span::styled("Averages", theme::accent_bold())),
        avg_line(format!("Bitcoin ({})", s.bitcoin_id), averages.bitcoin),
        avg_line("WTI crude (USD/bbl)".to_string(), averages.oil),
        avg_line(format!("S&P 500 close ({})", s.sp500_ticker), averages.sp500),
        avg_line(format!("NIFTY 50 close ({})", s.nifty_ticker), averages.nifty),
    ];
    f.render_widget(Paragraph::new(lines), chunks[1]);

    render_snapshot(f, chunks[2], app);
}

fn render_snapshot(f: &mut Frame, area: Rect, app: &AppState) {
    let ex = &app.explore;
    if ex.snapshot.is_empty() {
        f.render_widget(
            Paragraph::new(Span::styled(
                "No date carries all four series in this range.",
                theme::muted(),
            )),
            area,
        );
        return;
    }

    let title = Line::from(vec![
        Span::styled("Daily snapshot ", theme::accent_bold()),
        Span::styled(format!("({} dates)", ex.snapshot.len()), theme::muted()),
    ]);
    let header = Row::new(vec!["Date", "BTC", "Oil", "S&P 500", "NIFTY 50"]).style(theme::accent_bold());
    let visible = area.height.saturating_sub(2) as usize;
    let rows = ex
        .snapshot
        .iter()
        .skip(ex.scroll)
        .take(visible)
        .map(|r| {
            Row::new(vec![
                format_date(r.date),
                fmt_money(Some(r.btc_price)),
                fmt_money(Some(r.oil_price)),
                fmt_money(Some(r.sp500_close)),
                fmt_money(Some(r.nifty_close)),
            ])
            .style(theme::text())
        });

    let table = Table::new(
        rows,
        [
            Constraint::Length(12),
            Constraint::Length(14),
            Constraint::Length(10),
            Constraint::Length(12),
            Constraint::Length(12),
        ],
    )
    .header(header);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(1), Constraint::Min(1)])
        .split(area);
    f.render_widget(Paragraph::new(title), chunks[0]);
    f.render_widget(table, chunks[1]);
}
