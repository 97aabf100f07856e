use chrono::{DateTime, Local};
use ratatui::layout::{Constraint, Direction as LayoutDirection, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Span};
use ratatui::widgets::{Block, BorderType, Borders, Cell, Paragraph, Row, Table};
use ratatui::Frame;
use std::time::SystemTime;

use crate::app::App;
use crate::flap::CELL_WIDTHS;
use crate::model::{Direction, StatusTier};

struct Theme {
    accent: Color,
    danger: Color,
    caution: Color,
    normal: Color,
    dim: Color,
    text: Color,
    row_even_bg: Color,
    row_odd_bg: Color,
    header_bg: Color,
    panel_bg: Color,
}

pub fn ui(f: &mut Frame, app: &App) {
    let area = f.area();
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(6),
            Constraint::Length(1),
        ])
        .split(area);

    render_header(f, chunks[0], app);

    let boards = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[1]);
    render_board(f, boards[0], app, Direction::Departure);
    render_board(f, boards[1], app, Direction::Arrival);

    render_footer(f, chunks[2], app);
}

fn status_label(app: &App) -> String {
    match (&app.last_error, app.partial_failure) {
        (Some(err), _) => format!("ERR: {err}"),
        (None, Some((failed, total))) => format!("OK ({failed}/{total} failed)"),
        (None, None) => "OK".to_string(),
    }
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme();
    let clock = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let update_time = app
        .last_update
        .map(format_system_time)
        .unwrap_or_else(|| "--".to_string());

    let status = status_label(app);
    let status_color = match (&app.last_error, app.partial_failure) {
        (Some(_), _) => theme.danger,
        (None, Some(_)) => theme.caution,
        (None, None) => theme.normal,
    };

    let (arr_page, arr_pages) = app.page_indicator(Direction::Arrival);
    let (dep_page, dep_pages) = app.page_indicator(Direction::Departure);

    let line_top = Line::from(vec![
        Span::styled(
            "FLIGHT INFORMATION",
            Style::default()
                .fg(theme.accent)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(clock, Style::default().fg(theme.text)),
        Span::raw(" | "),
        Span::styled(
            format!("DEP {}  ARR {}", app.flights.departures.len(), app.flights.arrivals.len()),
            Style::default().fg(Color::Cyan),
        ),
        Span::raw(" | "),
        Span::raw(format!("ROWS {}", app.rows_per_page)),
    ]);

    let line_bottom = Line::from(vec![
        Span::raw(format!("LAST {update_time}")),
        Span::raw(" | "),
        Span::styled(
            status,
            Style::default()
                .fg(status_color)
                .add_modifier(Modifier::BOLD),
        ),
        Span::raw(" | "),
        Span::styled(
            format!("ARR {arr_page}/{arr_pages}  DEP {dep_page}/{dep_pages}"),
            Style::default().fg(theme.accent),
        ),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title("BOARD");
    let paragraph = Paragraph::new(vec![line_top, line_bottom])
        .block(block)
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn render_board(f: &mut Frame, area: Rect, app: &App, direction: Direction) {
    let theme = theme();
    let labels = ["FLIGHT", direction.place_header(), "TIME", "STATUS"];
    let header_cells = labels.iter().map(|label| {
        Cell::from(*label).style(
            Style::default()
                .fg(theme.accent)
                .bg(theme.header_bg)
                .add_modifier(Modifier::BOLD),
        )
    });
    let header = Row::new(header_cells)
        .style(Style::default().bg(theme.header_bg))
        .height(1);

    let rows = app.board(direction).rows().iter().enumerate().map(|(i, row)| {
        let base = if i % 2 == 0 {
            Style::default().bg(theme.row_even_bg).fg(theme.text)
        } else {
            Style::default().bg(theme.row_odd_bg).fg(theme.text)
        };
        let [flight, place, time, status] = row.texts();
        let status_style = match tier_color(row.tier, &theme) {
            Some(color) => base.fg(color).add_modifier(Modifier::BOLD),
            None => base,
        };
        Row::new(vec![
            Cell::from(flight).style(base.add_modifier(Modifier::BOLD)),
            Cell::from(place),
            Cell::from(time),
            Cell::from(status).style(status_style),
        ])
        .style(base)
    });

    let widths = CELL_WIDTHS.map(|width| Constraint::Length(width as u16));
    let (page, pages) = app.page_indicator(direction);
    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .title(format!("{} {page}/{pages}", direction.label()));
    let table = Table::new(rows, widths)
        .header(header)
        .block(block)
        .column_spacing(1)
        .style(Style::default().bg(theme.panel_bg));
    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let theme = theme();
    let help = format!(
        "q quit  r refresh  n next page  REF {}s  SRC {}",
        app.refresh.as_secs(),
        short_source(&app.proxy_url)
    );
    let line = Line::from(vec![Span::styled(help, Style::default().fg(theme.dim))]);
    let paragraph = Paragraph::new(line).style(Style::default().bg(theme.panel_bg));
    f.render_widget(paragraph, area);
}

fn tier_color(tier: StatusTier, theme: &Theme) -> Option<Color> {
    match tier {
        StatusTier::Critical => Some(theme.danger),
        StatusTier::Caution => Some(theme.caution),
        StatusTier::Normal => Some(theme.normal),
        StatusTier::Neutral => None,
    }
}

fn short_source(url: &str) -> String {
    let text = url.trim();
    let text = text.split_once("://").map_or(text, |(_, rest)| rest);
    let host = text.split('/').next().unwrap_or(text);
    let short: String = host.chars().take(24).collect();
    if short.is_empty() {
        "--".to_string()
    } else {
        short
    }
}

fn format_system_time(time: SystemTime) -> String {
    let dt: DateTime<Local> = time.into();
    dt.format("%H:%M:%S").to_string()
}

fn theme() -> Theme {
    Theme {
        accent: Color::Rgb(255, 204, 0),
        danger: Color::Red,
        caution: Color::Rgb(255, 140, 0),
        normal: Color::Green,
        dim: Color::DarkGray,
        text: Color::Rgb(235, 235, 235),
        row_even_bg: Color::Rgb(20, 20, 24),
        row_odd_bg: Color::Rgb(12, 12, 16),
        header_bg: Color::Rgb(24, 24, 28),
        panel_bg: Color::Rgb(18, 18, 22),
    }
}
