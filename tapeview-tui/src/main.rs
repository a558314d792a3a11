//! Terminal dashboard for the tapeview feed.
//!
//! Thin render layer over [`tapeview::DashboardSession`]: every frame
//! is a pure function of the latest [`RenderedView`] and the feed
//! connection status. All invariants (dedup, bucketing, selection)
//! live in the library.

use std::{
    io,
    sync::{Arc, Mutex as StdMutex},
    time::Duration,
};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{
        canvas::{Canvas, Line as CanvasLine, Rectangle},
        Block, Borders, List, ListItem, Paragraph, Tabs,
    },
    Frame, Terminal,
};
use rust_decimal::prelude::ToPrimitive;
use tokio::sync::Mutex;
use tracing::info;

use tapeview::{
    ConnectionStatus, DashboardSession, FeedClient, FeedConfig, OhlcBucket, RenderedView,
    SessionConfig,
};

const C_BID: Color = Color::Rgb(100, 220, 100);
const C_ASK: Color = Color::Rgb(220, 100, 100);
const C_DIM: Color = Color::Rgb(120, 120, 120);
const C_BRIGHT: Color = Color::Rgb(220, 220, 220);
const C_ACCENT: Color = Color::Rgb(100, 180, 220);

/// Log to the file named by TAPEVIEW_LOG, if set.
///
/// Stdout belongs to the alternate screen, so logging is opt-in and
/// file-only.
fn init_tracing() {
    if let Ok(path) = std::env::var("TAPEVIEW_LOG") {
        if let Ok(file) = std::fs::File::create(&path) {
            let _ = tracing_subscriber::fmt()
                .with_writer(StdMutex::new(file))
                .with_ansi(false)
                .try_init();
        }
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_tracing();
    info!("starting tapeview dashboard");

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let session = Arc::new(Mutex::new(DashboardSession::new(SessionConfig::default())));
    let status = Arc::new(Mutex::new(ConnectionStatus::Reconnecting));

    let (mut messages, mut statuses) = FeedClient::with_config(FeedConfig::default()).start();

    // Pump feed events into the session; one message at a time
    {
        let session = session.clone();
        let status = status.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    msg = messages.recv() => match msg {
                        Some(msg) => {
                            session.lock().await.apply(msg);
                        }
                        None => break,
                    },
                    st = statuses.recv() => match st {
                        Some(st) => {
                            *status.lock().await = st;
                        }
                        None => break,
                    },
                }
            }
        });
    }

    let res = run_app(&mut terminal, session, status).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    session: Arc<Mutex<DashboardSession>>,
    status: Arc<Mutex<ConnectionStatus>>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);

    loop {
        let view = session.lock().await.view();
        let connection = *status.lock().await;

        terminal.draw(|f| ui(f, &view, connection))?;

        if crossterm::event::poll(tick_rate)? {
            if let Event::Key(key) = event::read()? {
                match key.code {
                    KeyCode::Char('q') | KeyCode::Esc => return Ok(()),
                    KeyCode::Right | KeyCode::Tab => {
                        if let Some(next) = cycle_symbol(&view, 1) {
                            session.lock().await.select(next);
                        }
                    }
                    KeyCode::Left => {
                        if let Some(prev) = cycle_symbol(&view, -1) {
                            session.lock().await.select(prev);
                        }
                    }
                    KeyCode::Char('r') => session.lock().await.reset_selection(),
                    _ => {}
                }
            }
        }
    }
}

/// Next/previous symbol in the visible tab list, wrapping around.
fn cycle_symbol(view: &RenderedView, step: isize) -> Option<String> {
    if view.symbols.is_empty() {
        return None;
    }
    let len = view.symbols.len() as isize;
    let current = view
        .selected
        .as_ref()
        .and_then(|sel| view.symbols.iter().position(|s| s == sel))
        .map(|i| i as isize)
        .unwrap_or(-step);
    let next = (current + step).rem_euclid(len);
    Some(view.symbols[next as usize].to_string())
}

fn ui(f: &mut Frame, view: &RenderedView, connection: ConnectionStatus) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(f.area());

    render_status_bar(f, chunks[0], connection);
    render_tabs(f, chunks[1], view);

    let content = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
        .split(chunks[2]);

    render_book(f, content[0], view);
    render_chart(f, content[1], view);
}

fn render_status_bar(f: &mut Frame, area: Rect, connection: ConnectionStatus) {
    let (symbol, label, color) = match connection {
        ConnectionStatus::Connected => ("●", "CONNECTED", C_BID),
        ConnectionStatus::Disconnected => ("○", "DISCONNECTED", C_ASK),
        ConnectionStatus::Reconnecting => ("◌", "RECONNECTING", Color::Yellow),
    };

    let line = Line::from(vec![
        Span::styled(
            format!(" {} {} ", symbol, label),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            " ◆ TAPEVIEW ◆ ",
            Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD),
        ),
        Span::styled(
            " [←/→] Symbol  [R] Reset  [Q] Quit ",
            Style::default().fg(C_DIM),
        ),
    ]);

    let bar = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
    f.render_widget(bar, area);
}

fn render_tabs(f: &mut Frame, area: Rect, view: &RenderedView) {
    let block = Block::default().borders(Borders::ALL).title(" Symbols ");

    if view.symbols.is_empty() {
        let placeholder =
            Paragraph::new(Span::styled("Waiting for data...", Style::default().fg(C_DIM)))
                .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    let titles: Vec<Line> = view
        .symbols
        .iter()
        .map(|s| Line::from(s.as_str().to_string()))
        .collect();
    let selected = view
        .selected
        .as_ref()
        .and_then(|sel| view.symbols.iter().position(|s| s == sel))
        .unwrap_or(0);

    let tabs = Tabs::new(titles)
        .select(selected)
        .block(block)
        .style(Style::default().fg(C_DIM))
        .highlight_style(Style::default().fg(C_ACCENT).add_modifier(Modifier::BOLD));
    f.render_widget(tabs, area);
}

fn render_book(f: &mut Frame, area: Rect, view: &RenderedView) {
    let title = match view.selected.as_ref() {
        Some(symbol) => format!(" Book: {} ", symbol),
        None => " Book ".to_string(),
    };
    let block = Block::default().borders(Borders::ALL).title(title);

    let Some(book) = view.book.as_ref() else {
        // Absent book (not yet received, or dropped from the latest
        // list) is distinct from an empty one
        let placeholder =
            Paragraph::new(Span::styled("Waiting for data...", Style::default().fg(C_DIM)))
                .block(block);
        f.render_widget(placeholder, area);
        return;
    };

    let inner = block.inner(area);
    f.render_widget(block, area);

    let sides = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(inner);

    let bids: Vec<ListItem> = book
        .bids
        .iter()
        .map(|level| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>12}", level.price), Style::default().fg(C_BID)),
                Span::styled(
                    format!("  x {}", level.quantity),
                    Style::default().fg(C_DIM),
                ),
            ]))
        })
        .collect();
    let asks: Vec<ListItem> = book
        .asks
        .iter()
        .map(|level| {
            ListItem::new(Line::from(vec![
                Span::styled(format!("{:>12}", level.price), Style::default().fg(C_ASK)),
                Span::styled(
                    format!("  x {}", level.quantity),
                    Style::default().fg(C_DIM),
                ),
            ]))
        })
        .collect();

    f.render_widget(
        List::new(bids).block(Block::default().borders(Borders::RIGHT).title("Bids")),
        sides[0],
    );
    f.render_widget(
        List::new(asks).block(Block::default().title("Asks")),
        sides[1],
    );
}

fn render_chart(f: &mut Frame, area: Rect, view: &RenderedView) {
    let block = Block::default()
        .borders(Borders::ALL)
        .title(" Candlesticks ");

    if !view.chart_ready {
        let placeholder = Paragraph::new(Span::styled(
            "Waiting for enough data points to display the candlestick chart.",
            Style::default().fg(C_DIM),
        ))
        .block(block);
        f.render_widget(placeholder, area);
        return;
    }

    let candles: Vec<(usize, OhlcBucket)> = view
        .buckets
        .iter()
        .enumerate()
        .filter_map(|(i, slot)| slot.map(|bucket| (i, bucket)))
        .collect();

    let (mut low, mut high) = (f64::MAX, f64::MIN);
    for (_, bucket) in &candles {
        low = low.min(bucket.low.to_f64().unwrap_or(0.0));
        high = high.max(bucket.high.to_f64().unwrap_or(0.0));
    }
    if candles.is_empty() || low >= high {
        // Flat series: give the bounds some height so bodies stay visible
        let mid = if candles.is_empty() { 0.0 } else { low };
        low = mid - 1.0;
        high = mid + 1.0;
    }

    // Placeholder slots still occupy x positions, so sparse data pads
    // blank space on the right of the axis
    let width = view.buckets.len().max(1) as f64;

    let chart = Canvas::default()
        .block(block)
        .x_bounds([0.0, width])
        .y_bounds([low, high])
        .paint(|ctx| {
            for (i, bucket) in &candles {
                let x = *i as f64 + 0.5;
                let open = bucket.open.to_f64().unwrap_or(0.0);
                let close = bucket.close.to_f64().unwrap_or(0.0);
                let color = if close >= open { C_BID } else { C_ASK };

                // Wick: full low..high range
                ctx.draw(&CanvasLine {
                    x1: x,
                    y1: bucket.low.to_f64().unwrap_or(0.0),
                    x2: x,
                    y2: bucket.high.to_f64().unwrap_or(0.0),
                    color,
                });
                // Body: open..close box around the wick
                ctx.draw(&Rectangle {
                    x: x - 0.3,
                    y: open.min(close),
                    width: 0.6,
                    height: (open - close).abs(),
                    color,
                });
            }
        });
    f.render_widget(chart, area);
}
