use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Row, Table},
};

use super::app::App;
use crate::analytics::{AnalyticsSummary, DashboardSnapshot, GroupCount};

/// 每个分组面板的最大行数
const GROUP_ROWS: usize = 8;

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(title)
        .title_style(Style::default().fg(Color::Cyan))
}

/// Main UI rendering entry point
pub fn ui(frame: &mut Frame, app: &App) {
    let snapshot = app.snapshot();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title
            Constraint::Length(4), // KPI
            Constraint::Min(8),    // Groups
            Constraint::Length(10), // Live feed
            Constraint::Length(3), // Status
            Constraint::Length(2), // Footer
        ])
        .split(frame.area());

    draw_title_bar(frame, app, &snapshot, chunks[0]);

    match snapshot.last_summary.as_ref() {
        Some(summary) => {
            draw_kpis(frame, summary, chunks[1]);
            draw_groups(frame, summary, chunks[2]);
            draw_live_feed(frame, summary, chunks[3]);
        }
        None => {
            let waiting = Paragraph::new(vec![
                Line::from(""),
                Line::from(Span::styled(
                    "Loading analytics...",
                    Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD),
                )),
            ])
            .alignment(Alignment::Center)
            .block(panel("Analytics"));
            let area = Rect {
                height: chunks[1].height + chunks[2].height + chunks[3].height,
                ..chunks[1]
            };
            frame.render_widget(waiting, area);
        }
    }

    draw_status_bar(frame, app, &snapshot, chunks[4]);
    draw_footer(frame, chunks[5]);
}

fn draw_title_bar(frame: &mut Frame, app: &App, snapshot: &DashboardSnapshot, area: Rect) {
    let refresh = if snapshot.is_refreshing {
        Span::styled("refreshing...", Style::default().fg(Color::Yellow).bold())
    } else {
        Span::styled(
            format!("next refresh in {}s", snapshot.seconds_until_next_refresh),
            Style::default().fg(Color::Green),
        )
    };

    let title = Paragraph::new(Line::from(vec![
        Span::styled("linkpulse", Style::default().fg(Color::Cyan).bold()),
        Span::styled(
            format!(" v{} ", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::DarkGray),
        ),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        Span::styled(
            format!("{} ", app.operator),
            Style::default().fg(Color::Yellow),
        ),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
        refresh,
    ]))
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::Cyan)),
    )
    .alignment(Alignment::Center);

    frame.render_widget(title, area);
}

fn kpi_card(label: &str, value: usize, color: Color) -> Paragraph<'_> {
    Paragraph::new(vec![
        Line::from(Span::styled(
            value.to_string(),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(label, Style::default().fg(Color::DarkGray))),
    ])
    .alignment(Alignment::Center)
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_type(BorderType::Rounded)
            .border_style(Style::default().fg(Color::DarkGray)),
    )
}

fn draw_kpis(frame: &mut Frame, summary: &AnalyticsSummary, area: Rect) {
    let cards = [
        ("Visits today", summary.today_total_visits, Color::Green),
        ("Clicks today", summary.today_total_clicks, Color::Green),
        ("Visits overall", summary.overall_total_visits, Color::Cyan),
        ("Clicks overall", summary.overall_total_clicks, Color::Cyan),
        ("Countries", summary.country_count(), Color::Magenta),
        ("Referrers", summary.referrer_count(), Color::Magenta),
    ];
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, cards.len() as u32); 6])
        .split(area);

    for (i, (label, value, color)) in cards.into_iter().enumerate() {
        frame.render_widget(kpi_card(label, value, color), cols[i]);
    }
}

fn group_table<'a>(title: &'a str, groups: &'a [GroupCount]) -> Table<'a> {
    let rows: Vec<Row> = groups
        .iter()
        .take(GROUP_ROWS)
        .map(|g| Row::new(vec![g.key.clone(), g.count.to_string()]))
        .collect();

    Table::new(rows, [Constraint::Min(10), Constraint::Length(7)])
        .header(
            Row::new(vec!["Key", "Count"]).style(
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
        )
        .block(panel(title))
}

fn draw_groups(frame: &mut Frame, summary: &AnalyticsSummary, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Ratio(1, 5); 5])
        .split(area);

    let groups: [(&str, &[GroupCount]); 5] = [
        ("Top links", &summary.top_links),
        ("Countries", &summary.by_country),
        ("Devices", &summary.by_device),
        ("Referrers", &summary.by_referrer),
        ("Browsers", &summary.by_browser),
    ];
    for (i, (title, data)) in groups.into_iter().enumerate() {
        frame.render_widget(group_table(title, data), cols[i]);
    }
}

fn draw_live_feed(frame: &mut Frame, summary: &AnalyticsSummary, area: Rect) {
    let rows: Vec<Row> = summary
        .recent
        .iter()
        .map(|e| {
            let kind = if e.is_page_visit() { "visit" } else { "click" };
            Row::new(vec![
                e.created_at.format("%H:%M:%S").to_string(),
                kind.to_string(),
                e.slug.clone(),
                e.country.clone(),
                e.device.to_string(),
                e.referrer.clone(),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(9),
            Constraint::Length(6),
            Constraint::Min(12),
            Constraint::Length(14),
            Constraint::Length(8),
            Constraint::Min(12),
        ],
    )
    .header(
        Row::new(vec!["Time", "Kind", "Slug", "Country", "Device", "Referrer"]).style(
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        ),
    )
    .block(panel("Live feed"));

    frame.render_widget(table, area);
}

fn draw_status_bar(frame: &mut Frame, app: &App, snapshot: &DashboardSnapshot, area: Rect) {
    let (text, style) = if let Some(err) = snapshot.last_error.as_deref() {
        (
            format!("[STALE] last refresh failed: {}", err),
            Style::default().fg(Color::White).bg(Color::Red).bold(),
        )
    } else if !app.error_message.is_empty() {
        (
            format!("[ERROR] {}", app.error_message),
            Style::default().fg(Color::White).bg(Color::Red).bold(),
        )
    } else if !app.status_message.is_empty() {
        (
            format!("[OK] {}", app.status_message),
            Style::default().fg(Color::Black).bg(Color::Green).bold(),
        )
    } else {
        ("Ready".to_string(), Style::default().fg(Color::Cyan))
    };

    let status = Paragraph::new(text)
        .style(style)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded),
        )
        .alignment(Alignment::Center);

    frame.render_widget(status, area);
}

fn draw_footer(frame: &mut Frame, area: Rect) {
    let shortcuts = [("r", "Refresh", Color::Green), ("q/Esc", "Quit", Color::Magenta)];

    let mut spans = Vec::new();
    for (i, (key, desc, color)) in shortcuts.iter().enumerate() {
        if i > 0 {
            spans.push(Span::styled(" | ", Style::default().fg(Color::DarkGray)));
        }
        spans.push(Span::styled(
            format!("[{}]", key),
            Style::default().fg(*color).bold(),
        ));
        spans.push(Span::styled(
            format!(" {}", desc),
            Style::default().fg(Color::Gray),
        ));
    }

    frame.render_widget(
        Paragraph::new(Line::from(spans)).alignment(Alignment::Center),
        area,
    );
}
