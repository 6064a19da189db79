use std::collections::VecDeque;

use glam::Vec2;
use ratatui::Frame;
use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::symbols::Marker;
use ratatui::text::{Line, Span};
use ratatui::widgets::canvas::{Canvas, Points};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph};

use ghostlink::Arena;

use crate::server::ServerStats;

const MAX_LOG_LINES: usize = 200;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogLevel {
    Info,
    Warn,
    Error,
}

#[derive(Debug, Clone)]
struct LogLine {
    level: LogLevel,
    message: String,
}

pub struct TuiState {
    log: VecDeque<LogLine>,
}

impl TuiState {
    pub fn new() -> Self {
        Self {
            log: VecDeque::with_capacity(MAX_LOG_LINES),
        }
    }

    pub fn log_info(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Info, message.into());
    }

    pub fn log_warn(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Warn, message.into());
    }

    pub fn log_error(&mut self, message: impl Into<String>) {
        self.push(LogLevel::Error, message.into());
    }

    fn push(&mut self, level: LogLevel, message: String) {
        if self.log.len() == MAX_LOG_LINES {
            self.log.pop_front();
        }
        self.log.push_back(LogLine { level, message });
    }
}

pub struct View<'a> {
    pub stats: &'a ServerStats,
    pub arena: Arena,
    pub entities: &'a [(u16, Vec2)],
    pub peers: &'a [String],
}

pub fn render(frame: &mut Frame, state: &TuiState, view: &View) {
    let rows = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(10),
            Constraint::Length(8),
            Constraint::Length(3),
        ])
        .split(frame.area());

    let middle = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(65), Constraint::Percentage(35)])
        .split(rows[2]);

    let side = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(0)])
        .split(middle[1]);

    render_header(frame, rows[0], view.stats);
    render_peers_gauge(frame, rows[1], view.stats);
    render_arena(frame, middle[0], view);
    render_network(frame, side[0], view.stats);
    render_peer_list(frame, side[1], view.peers);
    render_log(frame, rows[3], state);
    render_help(frame, rows[4]);
}

fn render_header(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let title = format!(" Ghostlink Host - Uptime: {} ", format_duration(stats.uptime_secs));

    let block = Block::default()
        .title(title)
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Cyan));

    let text = format!(
        "Frame: {}  |  {} Hz  |  Entities: {}/{}  |  Snapshots: {}  |  Avatar: ({:.0}, {:.0}) {:.2} rad",
        stats.frame,
        stats.tick_rate,
        stats.confirmed,
        stats.entity_slots,
        stats.snapshots_sent,
        stats.avatar.position.x,
        stats.avatar.position.y,
        stats.avatar.angle,
    );

    let paragraph = Paragraph::new(text)
        .block(block)
        .style(Style::default().fg(Color::White));

    frame.render_widget(paragraph, area);
}

fn render_peers_gauge(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Peers ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Green));

    let ratio = stats.peer_count as f64 / stats.max_peers.max(1) as f64;
    let gauge = Gauge::default()
        .block(block)
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(ratio.min(1.0))
        .label(format!("{}/{} peers", stats.peer_count, stats.max_peers));

    frame.render_widget(gauge, area);
}

fn render_arena(frame: &mut Frame, area: Rect, view: &View) {
    let entities: Vec<(f64, f64)> = view
        .entities
        .iter()
        .map(|(_, p)| canvas_point(&view.arena, *p))
        .collect();
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
                coords: &entities,
                color: Color::Yellow,
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

fn render_network(frame: &mut Frame, area: Rect, stats: &ServerStats) {
    let block = Block::default()
        .title(" Network ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow));

    let net = &stats.network;
    let lines = vec![
        stat_line(
            "Messages: ",
            format!("{} sent / {} recv", net.messages_sent, net.messages_received),
            Color::White,
        ),
        stat_line(
            "Bytes: ",
            format!(
                "{} sent / {} recv",
                format_bytes(net.bytes_sent),
                format_bytes(net.bytes_received)
            ),
            Color::White,
        ),
        stat_line(
            "Send failures: ",
            net.send_failures.to_string(),
            if net.send_failures > 0 {
                Color::Red
            } else {
                Color::White
            },
        ),
        stat_line(
            "Dropped: ",
            net.dropped_messages.to_string(),
            if net.dropped_messages > 0 {
                Color::Yellow
            } else {
                Color::White
            },
        ),
        stat_line(
            "Malformed: ",
            net.malformed_messages.to_string(),
            if net.malformed_messages > 0 {
                Color::Red
            } else {
                Color::White
            },
        ),
    ];

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_peer_list(frame: &mut Frame, area: Rect, peers: &[String]) {
    let items: Vec<ListItem> = peers.iter().map(|p| ListItem::new(p.as_str())).collect();
    let list = List::new(items).block(
        Block::default()
            .title(" Connected ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Green)),
    );
    frame.render_widget(list, area);
}

fn render_log(frame: &mut Frame, area: Rect, state: &TuiState) {
    let visible = area.height.saturating_sub(2) as usize;
    let items: Vec<ListItem> = state
        .log
        .iter()
        .skip(state.log.len().saturating_sub(visible))
        .map(|line| {
            let color = match line.level {
                LogLevel::Info => Color::White,
                LogLevel::Warn => Color::Yellow,
                LogLevel::Error => Color::Red,
            };
            ListItem::new(Span::styled(line.message.as_str(), Style::default().fg(color)))
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
    let block = Block::default()
        .title(" Controls ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::DarkGray));

    let text = Paragraph::new("Arrows steer  |  Space spawns ahead  |  'q' or ESC quits")
        .block(block)
        .style(
            Style::default()
                .fg(Color::DarkGray)
                .add_modifier(Modifier::ITALIC),
        );

    frame.render_widget(text, area);
}

fn stat_line(label: &'static str, value: String, color: Color) -> Line<'static> {
    Line::from(vec![
        Span::styled(label, Style::default().fg(Color::Gray)),
        Span::styled(value, Style::default().fg(color)),
    ])
}

fn format_duration(secs: u64) -> String {
    let hours = secs / 3600;
    let mins = (secs % 3600) / 60;
    let secs = secs % 60;
    format!("{:02}:{:02}:{:02}", hours, mins, secs)
}

fn format_bytes(bytes: u64) -> String {
    if bytes < 1024 {
        format!("{}B", bytes)
    } else if bytes < 1024 * 1024 {
        format!("{:.1}KB", bytes as f64 / 1024.0)
    } else {
        format!("{:.1}MB", bytes as f64 / (1024.0 * 1024.0))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_keeps_newest_lines() {
        let mut state = TuiState::new();
        for i in 0..MAX_LOG_LINES + 5 {
            state.log_info(format!("line {}", i));
        }
        assert_eq!(state.log.len(), MAX_LOG_LINES);
        assert_eq!(state.log.front().unwrap().message, "line 5");
    }

    #[test]
    fn test_canvas_flips_arena_y() {
        let arena = Arena::default();
        assert_eq!(canvas_point(&arena, Vec2::new(10.0, 0.0)), (10.0, 400.0));
        assert_eq!(canvas_point(&arena, Vec2::new(10.0, 400.0)), (10.0, 0.0));
    }

    #[test]
    fn test_formats_sizes_and_durations() {
        assert_eq!(format_bytes(512), "512B");
        assert_eq!(format_bytes(2048), "2.0KB");
        assert_eq!(format_duration(3725), "01:02:05");
    }
}
