mod config;
mod events;
mod server;
mod tui;

use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use crossterm::event::{self, Event, KeyCode, KeyEventKind};
use crossterm::terminal::{self, EnterAlternateScreen, LeaveAlternateScreen};
use crossterm::{cursor, execute};
use ratatui::Terminal;
use ratatui::backend::CrosstermBackend;

use ghostlink::{Arena, NetworkThread, SimulationConfig};

use config::ServerConfig;
use events::ServerEvent;
use server::GameServer;
use tui::{TuiState, View};

#[derive(Parser)]
#[command(name = "ghostlink-host")]
#[command(about = "Authoritative host for the ghostlink arena")]
struct Args {
    #[arg(short, long, default_value = "0.0.0.0")]
    bind: String,

    #[arg(short, long, default_value_t = ghostlink::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = ghostlink::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(long, default_value_t = 100, help = "Milliseconds between snapshots")]
    send_interval_ms: u64,

    #[arg(short, long, default_value_t = ghostlink::DEFAULT_MAX_PEERS)]
    max_peers: usize,

    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = ServerConfig {
        bind_addr: format!("{}:{}", args.bind, args.port),
        max_peers: args.max_peers,
        simulation: SimulationConfig {
            tick_rate: args.tick_rate,
            send_interval: Duration::from_millis(args.send_interval_ms),
            ..Default::default()
        },
    };

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let arena = config.simulation.arena;
    let mut server = GameServer::new(config.clone())
        .with_context(|| format!("failed to start host on {}", config.bind_addr))?;

    if args.headless {
        log::info!("Host started on {}", server.local_addr());
        let _interrupt = watch_interrupt(server.running())?;
        server.run();
        log::info!("Host shutting down");
    } else {
        run_with_tui(&mut server, arena)?;
    }

    Ok(())
}

/// Clears `running` on Ctrl-C.
fn watch_interrupt(running: Arc<AtomicBool>) -> io::Result<NetworkThread> {
    NetworkThread::spawn("ghostlink-signal", move |cancel| async move {
        tokio::select! {
            _ = cancel.cancelled() => {}
            result = tokio::signal::ctrl_c() => {
                if let Err(e) = result {
                    log::warn!("Failed to listen for Ctrl-C: {}", e);
                    return;
                }
                log::info!("Interrupted");
                running.store(false, Ordering::SeqCst);
            }
        }
    })
}

fn run_with_tui(server: &mut GameServer, arena: Arena) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let running = server.running();
    let mut tui_state = TuiState::new();

    tui_state.log_info(format!("Host started on {}", server.local_addr()));

    while running.load(Ordering::SeqCst) {
        server.tick_once();

        for event in server.drain_events() {
            match event {
                ServerEvent::PeerConnected { peer, addr } => {
                    tui_state.log_info(format!("Peer {} connected from {}", peer, addr));
                }
                ServerEvent::PeerDisconnected { peer } => {
                    tui_state.log_info(format!("Peer {} disconnected", peer));
                }
                ServerEvent::PeerRejected { addr } => {
                    tui_state.log_warn(format!("Rejected {}: peer limit reached", addr));
                }
                ServerEvent::EntitySpawned { id, origin } => {
                    tui_state.log_info(format!("Entity {} spawned by {}", id, origin));
                }
                ServerEvent::SpawnIgnored { origin, reason } => {
                    tui_state.log_warn(format!("Spawn from {} ignored: {}", origin, reason));
                }
                ServerEvent::Error { message } => {
                    tui_state.log_error(message);
                }
            }
        }

        if event::poll(Duration::from_millis(1))? {
            if let Event::Key(key) = event::read()? {
                if key.kind == KeyEventKind::Press {
                    match key.code {
                        KeyCode::Char('q') | KeyCode::Esc => {
                            running.store(false, Ordering::SeqCst);
                        }
                        KeyCode::Left => server.steer(1.0, 0.0),
                        KeyCode::Right => server.steer(-1.0, 0.0),
                        KeyCode::Up => server.steer(0.0, 1.0),
                        KeyCode::Char(' ') => server.spawn_ahead(),
                        _ => {}
                    }
                }
            }
        }

        let stats = server.stats();
        let entities = server.entity_positions();
        let peers = server.peer_addrs();
        let view = View {
            stats: &stats,
            arena,
            entities: &entities,
            peers: &peers,
        };
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &view);
        })?;
    }

    tui_state.log_info("Shutting down...");
    server.shutdown();

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
