mod config;
mod session;
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

use config::ClientConfig;
use session::{ClientEvent, GameClient};
use tui::{TuiState, View};

#[derive(Parser)]
#[command(name = "ghostlink-client")]
#[command(about = "Participant for the ghostlink arena")]
struct Args {
    #[arg(short, long, default_value = "127.0.0.1", help = "Host to connect to")]
    server: String,

    #[arg(short, long, default_value_t = ghostlink::DEFAULT_PORT)]
    port: u16,

    #[arg(short, long, default_value_t = ghostlink::DEFAULT_TICK_RATE)]
    tick_rate: u32,

    #[arg(long, default_value_t = 100, help = "Milliseconds between host snapshots")]
    send_interval_ms: u64,

    #[arg(long, default_value_t = 5, help = "Connect timeout in seconds")]
    connect_timeout: u64,

    #[arg(long, help = "Apply snapshots directly instead of blending")]
    no_interp: bool,

    #[arg(long, help = "Request a spawn every N milliseconds")]
    auto_spawn_ms: Option<u64>,

    #[arg(long)]
    headless: bool,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let config = ClientConfig {
        server_addr: format!("{}:{}", args.server, args.port),
        connect_timeout: Duration::from_secs(args.connect_timeout),
        auto_spawn: args.auto_spawn_ms.map(Duration::from_millis),
        simulation: SimulationConfig {
            tick_rate: args.tick_rate,
            send_interval: Duration::from_millis(args.send_interval_ms),
            interpolation: !args.no_interp,
            ..Default::default()
        },
    };

    if args.headless {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    }

    let arena = config.simulation.arena;
    let mut client = GameClient::connect(config.clone())
        .with_context(|| format!("failed to connect to {}", config.server_addr))?;

    if args.headless {
        let _interrupt = watch_interrupt(client.running())?;
        client.run();
        log::info!("Client shutting down");
    } else {
        run_with_tui(&mut client, arena)?;
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

fn run_with_tui(client: &mut GameClient, arena: Arena) -> io::Result<()> {
    terminal::enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, cursor::Hide)?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let running = client.running();
    let server = client.remote_addr().to_string();
    let mut tui_state = TuiState::new();

    tui_state.log_info(format!("Connected to {}", server));

    while running.load(Ordering::SeqCst) {
        client.tick_once();

        for event in client.drain_events() {
            match event {
                ClientEvent::SpawnRequested { id, command_frame } => {
                    tui_state.log_info(format!("Requested entity {} at frame {}", id, command_frame));
                }
                ClientEvent::SpawnIgnored { reason } => {
                    tui_state.log_warn(format!("Spawn ignored: {}", reason));
                }
                ClientEvent::SendFailed { error } => {
                    tui_state.log_warn(format!("Spawn request not sent: {}", error));
                }
                ClientEvent::Disconnected => {
                    tui_state.log_warn("Connection to host lost");
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
                        KeyCode::Char(' ') => client.request_spawn(),
                        _ => {}
                    }
                }
            }
        }

        let stats = client.stats();
        let entities = client.entities();
        let view = View {
            stats: &stats,
            arena,
            server: &server,
            entities: &entities,
        };
        terminal.draw(|frame| {
            tui::render(frame, &tui_state, &view);
        })?;
    }

    client.shutdown();

    terminal::disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, cursor::Show)?;

    Ok(())
}
