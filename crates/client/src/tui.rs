use std::collections::VecDeque;

use glam::Vec2;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Points};
use ratatui::widgets::{Block, Borders, List, ListItem, Paragraph};

use ghostlink::{Arena, AuthorityState, InterpolationMode};

use crate::session::ClientStats;

const MAX_LOG_LINES: usize = 100;

pub struct TuiState {
    log: VecDeque<(Color, String)>,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            log: VecDeque::with_capacity(MAX_LOG_LINES),
        }
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.push(Color::White, message.into());
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        self.push(Color::Yellow, message.into());
    }

    fn push(&mut self, color: Color, message: String) {
        if self.log.len() == MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back((color, message));
    }
}

pub struct View<'a> {
    pub stats: &'a ClientStats,
    pub arena: Arena,
    pub server: &'a str,
    pub entities: &'a [(Vec2, AuthorityState)],
}

pub fn render(frame: &mut Frame, state: &TuiState, view: &View) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(6),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(rows[1]);

    render_header(frame, rows[0], view);
    render_arena(frame, middle[0], view);
    render_sync(frame, middle[1], view.stats);
    render_log(frame, rows[2], state);
    render_help(frame, rows[3]);
}

fn render_header(frame: &mut Frame, area: Rect, view: &View) {
    let stats = view.stats;
    let (status, color) = if stats.connected {
        ("connected", Color::Cyan)
    } else {
        ("disconnected", Color::Red)
    };

    let block = Block::default()
        .title(format!(" Ghostlink Client - {} ({}) ", view.server, status))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(color));

    let text = format!(
        "Frame: {}  |  {} Hz  |  Predicted: {}  |  Confirmed: {}  |  Spawns sent: {}",
        stats.frame, stats.tick_rate, stats.predicted, stats.confirmed, stats.spawns_requested
    );

    frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_arena(frame: &mut Frame, area: Rect, view: &View) {
    let mut predicted = Vec::new();
    let mut confirmed = Vec::new();
    for (position, state) in view.entities {
        let point = canvas_point(&view.arena, *position);
        match state {
            AuthorityState::Predicted => predicted.push(point),
            AuthorityState::Confirmed => confirmed.push(point),
            AuthorityState::Unseen => {}
        }
    }
    let avatar = [canvas_point(&view.arena, view.stats.avatar.position)];

    let canvas = Canvas::default()
        .block(
            Block::default()
                .title(" Arena ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Blue)),
        )
        .marker(Marker::Braille)
        .x_bounds([0.0, view.arena.width as f64])
        .y_bounds([0.0, view.arena.height as f64])
        .paint(|ctx| {
            ctx.draw(&Points {
                coords: &confirmed,
                color: Color::Yellow,
            });
            ctx.draw(&Points {
                coords: &predicted,
                color: Color::Magenta,
            });
            ctx.draw(&Points {
                coords: &avatar,
                color: Color::Cyan,
            });
        });

    frame.render_widget(canvas, area);
}

/// Arena y grows downward, canvas y grows upward.
fn canvas_point(arena: &Arena, position: Vec2) -> (f64, f64) {
    (position.x as f64, (arena.height - position.y) as f64)
}

fn render_sync(frame: &mut Frame, area: Rect, stats: &ClientStats) {
    let block = Block::default()
        .title(" Sync ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let mode = match stats.mode {
        InterpolationMode::Blend => format!("blend 1/{}", stats.frames_per_packet),
        InterpolationMode::Snap => "snap".to_string(),
    };
    let net = &stats.network;

    let lines = vec![
        stat_line("Mode: ", mode),
        stat_line("Buffered: ", format!("{} ({} evicted)", stats.buffered, stats.evicted)),
        stat_line(
            "Avatar: ",
            format!(
                "({:.0}, {:.0}) {:.2} rad",
                stats.avatar.position.x, stats.avatar.position.y, stats.avatar.angle
            ),
        ),
        stat_line(
            "Snapshots: ",
            format!("{} ({} bytes)", net.messages_received, net.bytes_received),
        ),
        stat_line("Malformed: ", net.malformed_messages.to_string()),
        stat_line(
            "Sent: ",
            format!("{} ({} dropped)", net.messages_sent, net.dropped_messages),
        ),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = state
        .log
        .iter()
        .skip(state.log.len().saturating_sub(visible))
        .map(|(color, message)| {
            ListItem::new(Span::styled(message.as_str(), Style::default().fg(*color)))
        })
        .collect();

    let list = List::new(items).block(
        Block::default()
            .title(" Events ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Magenta)),
    );
    frame.render_widget(list, area);
}

fn render_help(frame: &mut Frame, area: Rect) {
    let text = Paragraph::new("Space requests a spawn  |  'q' or ESC quits")
        .block(
            Block::default()
                .title(" Controls ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

fn stat_line(label: &'static str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(Color::White)),
    ])
}
