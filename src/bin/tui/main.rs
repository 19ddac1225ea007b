mod app;

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction as LayoutDirection, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table},
    Frame, Terminal,
};

use app::{AppState, ConnectionStatus};
use polymarket_movers::cli::{format_percent, format_time_ns, truncate};

const REFRESH_INTERVAL: Duration = Duration::from_secs(5);

// ---------------------------------------------------------------------------
// Entry point
// ---------------------------------------------------------------------------

#[tokio::main]
async fn main() -> io::Result<()> {
    let base_url = std::env::var("API_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(5))
        .build()
        .map_err(io::Error::other)?;

    let mut app = AppState::new(base_url);

    // Initial fetch before rendering
    app.refresh(&client).await;

    // Terminal setup
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let result = run_loop(&mut terminal, &mut app, &client).await;

    // Restore terminal regardless of result
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    result
}

// ---------------------------------------------------------------------------
// Main event loop
// ---------------------------------------------------------------------------

async fn run_loop(
    terminal: &mut Terminal<CrosstermBackend<io::Stdout>>,
    app: &mut AppState,
    client: &reqwest::Client,
) -> io::Result<()> {
    let mut last_tick = std::time::Instant::now();

    loop {
        terminal.draw(|f| render(f, app))?;

        let timeout = REFRESH_INTERVAL
            .checked_sub(last_tick.elapsed())
            .unwrap_or(Duration::ZERO);

        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Char('Q') => return Ok(()),
                        KeyCode::Char('r') | KeyCode::Char('R') => {
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        KeyCode::Char('d') | KeyCode::Char('D') => {
                            app.cycle_direction();
                            app.refresh(client).await;
                            last_tick = std::time::Instant::now();
                        }
                        _ => {}
                    }
                }
            }
        }

        if last_tick.elapsed() >= REFRESH_INTERVAL {
            app.refresh(client).await;
            last_tick = std::time::Instant::now();
        }
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

fn render(f: &mut Frame, app: &AppState) {
    let area = f.area();

    // Outer vertical split: header | body | footer
    let chunks = Layout::default()
        .direction(LayoutDirection::Vertical)
        .constraints([
            Constraint::Length(3), // header
            Constraint::Min(0),    // body
            Constraint::Length(1), // footer
        ])
        .split(area);

    render_header(f, app, chunks[0]);
    render_body(f, app, chunks[1]);
    render_footer(f, app, chunks[2]);
}

fn render_header(f: &mut Frame, app: &AppState, area: Rect) {
    let (status_text, status_color) = match &app.status {
        ConnectionStatus::Connected => ("● connected".to_string(), Color::Green),
        ConnectionStatus::Connecting => ("◌ connecting".to_string(), Color::Yellow),
        ConnectionStatus::Error(e) => (format!("✗ {}", truncate(e, 40)), Color::Red),
    };

    let scan_str = match (app.health.scanning, app.health.last_scan_at_ns) {
        (Some(true), _) => "scanning…".to_string(),
        (_, Some(ns)) => format!("last scan {}", format_time_ns(ns)),
        _ => "no scan yet".to_string(),
    };
    let failed = app.health.scans_failed.unwrap_or(0);

    let title_spans = vec![
        Span::styled(
            " Polymarket Movers  ",
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        ),
        Span::styled(status_text, Style::default().fg(status_color)),
        Span::raw("  │  "),
        Span::styled(scan_str, Style::default().fg(Color::White)),
        Span::raw("  │  "),
        Span::styled(
            format!(
                "{} / {} markets active",
                app.stats.active_markets, app.stats.total_markets
            ),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("{} price points", app.stats.total_price_points),
            Style::default().fg(Color::White),
        ),
        Span::raw("  │  "),
        Span::styled(
            format!("{failed} failed scans"),
            Style::default().fg(if failed > 0 { Color::Red } else { Color::DarkGray }),
        ),
    ];

    let paragraph = Paragraph::new(Line::from(title_spans)).block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::DarkGray)),
    );

    f.render_widget(paragraph, area);
}

fn render_body(f: &mut Frame, app: &AppState, area: Rect) {
    // Horizontal split: movers (60%) | trending (40%)
    let halves = Layout::default()
        .direction(LayoutDirection::Horizontal)
        .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
        .split(area);

    render_movers_table(f, app, halves[0]);
    render_trending_table(f, app, halves[1]);
}

fn header_row(labels: &[&'static str]) -> Row<'static> {
    let cells = labels.iter().map(|h| {
        Cell::from(*h).style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
    });
    Row::new(cells).height(1)
}

fn titled_block(title: String) -> Block<'static> {
    Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray))
        .title(Span::styled(
            title,
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ))
}

fn render_movers_table(f: &mut Frame, app: &AppState, area: Rect) {
    let rows: Vec<Row> = app
        .movers
        .iter()
        .enumerate()
        .map(|(i, c)| {
            let change_color = if c.change_percent > 0.0 {
                Color::Green
            } else if c.change_percent < 0.0 {
                Color::Red
            } else {
                Color::White
            };

            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&c.question, 40)),
                Cell::from(truncate(&c.outcome, 8)),
                Cell::from(format!("{:.4}", c.new_price)),
                Cell::from(format_percent(c.change_percent))
                    .style(Style::default().fg(change_color)),
                Cell::from(format_time_ns(c.new_timestamp_ns))
                    .style(Style::default().fg(Color::DarkGray)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(7),
            Constraint::Length(9),
            Constraint::Length(8),
        ],
    )
    .header(header_row(&["#", "Market", "Outcome", "Price", "Change", "At"]))
    .block(titled_block(format!(" TOP MOVERS ({}) ", app.direction)));

    f.render_widget(table, area);
}

fn render_trending_table(f: &mut Frame, app: &AppState, area: Rect) {
    let rows: Vec<Row> = app
        .trending
        .iter()
        .enumerate()
        .map(|(i, m)| {
            let total_color = if m.total_volatility >= 20.0 {
                Color::Green
            } else if m.total_volatility >= 5.0 {
                Color::Yellow
            } else {
                Color::White
            };

            Row::new(vec![
                Cell::from(format!("{}", i + 1)).style(Style::default().fg(Color::DarkGray)),
                Cell::from(truncate(&m.question, 30)),
                Cell::from(format!("{:.2}%", m.max_change)),
                Cell::from(format!("{:.2}%", m.total_volatility))
                    .style(Style::default().fg(total_color)),
                Cell::from(m.num_changes.to_string()).style(Style::default().fg(Color::Cyan)),
            ])
        })
        .collect();

    let table = Table::new(
        rows,
        [
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(8),
            Constraint::Length(3),
        ],
    )
    .header(header_row(&["#", "Market", "Max", "Total", "N"]))
    .block(titled_block(" TRENDING ".to_string()));

    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, app: &AppState, area: Rect) {
    let latency_str = match (app.latency.p99_ms, app.latency.samples) {
        (Some(p99), Some(n)) => format!("api p99 {p99:.1}ms ({n} calls)  "),
        _ => String::new(),
    };

    let line = Line::from(vec![
        Span::styled(" [q] ", Style::default().fg(Color::Yellow)),
        Span::raw("quit  "),
        Span::styled("[r] ", Style::default().fg(Color::Yellow)),
        Span::raw("refresh  "),
        Span::styled("[d] ", Style::default().fg(Color::Yellow)),
        Span::raw(format!("direction: {}  ", app.direction)),
        Span::styled(latency_str, Style::default().fg(Color::DarkGray)),
        Span::styled("auto-refresh: 5s", Style::default().fg(Color::DarkGray)),
    ]);
    let paragraph = Paragraph::new(line).style(Style::default().fg(Color::White));
    f.render_widget(paragraph, area);
}
