use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use glam::Vec2;

use ghostlink::{
    Authority, AuthorityState, Avatar, FixedTimestep, GameStatePayload, HostEvent, HostLink,
    MAX_MESSAGE_SIZE, NetworkStats, TransportError,
};

use crate::config::ServerConfig;
use crate::events::{ServerEvent, SpawnOrigin};

/// Terminals only report key presses, so one press steers for a few ticks.
const STEER_HOLD_TICKS: u32 = 4;
/// Local spawns appear this far in front of the avatar.
const SPAWN_DISTANCE: f32 = 30.0;

#[derive(Debug, Default, Clone, Copy)]
struct SteerInput {
    turn: f32,
    throttle: f32,
    ticks_left: u32,
}

pub struct GameServer {
    link: HostLink,
    authority: Authority,
    config: ServerConfig,
    timestep: FixedTimestep,
    last_frame_time: Instant,
    encode_buf: Vec<u8>,
    input: SteerInput,
    snapshots_sent: u64,
    running: Arc<AtomicBool>,
    start_time: Instant,
    pending_events: VecDeque<ServerEvent>,
}

impl GameServer {
    pub fn new(config: ServerConfig) -> Result<Self, TransportError> {
        let link = HostLink::bind(config.bind_addr.as_str(), config.max_peers)?;
        let authority = Authority::new(config.simulation.clone());
        let timestep = FixedTimestep::new(config.simulation.tick_rate);

        Ok(Self {
            link,
            authority,
            timestep,
            last_frame_time: Instant::now(),
            encode_buf: vec![0; MAX_MESSAGE_SIZE],
            input: SteerInput::default(),
            snapshots_sent: 0,
            running: Arc::new(AtomicBool::new(true)),
            start_time: Instant::now(),
            pending_events: VecDeque::new(),
            config,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.link.local_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ServerEvent> + '_ {
        self.pending_events.drain(..)
    }

    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.tick_once();
            std::thread::sleep(Duration::from_millis(1));
        }
        self.shutdown();
    }

    pub fn shutdown(&mut self) {
        self.link.shutdown();
    }

    pub fn steer(&mut self, turn: f32, throttle: f32) {
        self.input = SteerInput {
            turn,
            throttle,
            ticks_left: STEER_HOLD_TICKS,
        };
    }

    /// Spawns an entity just ahead of the avatar, moving the way it faces.
    pub fn spawn_ahead(&mut self) {
        let avatar = self.authority.avatar();
        let heading = avatar.heading();
        let position = avatar.position + heading * SPAWN_DISTANCE;

        let event = match self.authority.spawn_local(position, heading) {
            Ok(id) => ServerEvent::EntitySpawned {
                id,
                origin: SpawnOrigin::Local,
            },
            Err(reason) => {
                log::debug!("Ignoring local spawn: {}", reason);
                ServerEvent::SpawnIgnored {
                    origin: SpawnOrigin::Local,
                    reason,
                }
            }
        };
        self.pending_events.push_back(event);
    }

    pub fn tick_once(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame_time;
        self.last_frame_time = now;
        self.timestep.accumulate(delta.as_secs_f32());

        self.process_link_events();

        while self.timestep.consume_tick() {
            self.tick();
        }
    }

    fn tick(&mut self) {
        if self.input.ticks_left > 0 {
            self.authority.steer(self.input.turn, self.input.throttle);
            self.input.ticks_left -= 1;
        }

        if let Some(snapshot) = self.authority.tick() {
            self.broadcast_snapshot(&snapshot);
        }
    }

    fn broadcast_snapshot(&mut self, snapshot: &GameStatePayload) {
        let len = match snapshot.encode(&mut self.encode_buf) {
            Ok(len) => len,
            Err(e) => {
                log::error!(
                    "Failed to encode snapshot for frame {}: {}",
                    snapshot.command_frame,
                    e
                );
                self.pending_events.push_back(ServerEvent::Error {
                    message: format!("Snapshot {} not sent: {}", snapshot.command_frame, e),
                });
                return;
            }
        };

        let report = self
            .link
            .broadcast(Bytes::copy_from_slice(&self.encode_buf[..len]));
        self.snapshots_sent += 1;
        log::trace!(
            "Snapshot {} queued for {} peers ({} dropped)",
            snapshot.command_frame,
            report.delivered,
            report.dropped
        );
    }

    fn process_link_events(&mut self) {
        for event in self.link.drain_events() {
            let event = match event {
                HostEvent::PeerConnected { peer, addr } => ServerEvent::PeerConnected { peer, addr },
                HostEvent::PeerDisconnected { peer } => ServerEvent::PeerDisconnected { peer },
                HostEvent::PeerRejected { addr } => ServerEvent::PeerRejected { addr },
                HostEvent::SpawnRequested { peer, request } => {
                    let origin = SpawnOrigin::Peer {
                        peer,
                        command_frame: request.command_frame,
                    };
                    match self.authority.handle_spawn_request(&request) {
                        Ok(id) => ServerEvent::EntitySpawned { id, origin },
                        Err(reason) => {
                            log::debug!("Ignoring spawn request from peer {}: {}", peer, reason);
                            ServerEvent::SpawnIgnored { origin, reason }
                        }
                    }
                }
            };
            self.pending_events.push_back(event);
        }
    }

    pub fn stats(&self) -> ServerStats {
        ServerStats {
            frame: self.authority.clock().frame(),
            tick_rate: self.timestep.tick_rate(),
            peer_count: self.link.peer_count(),
            max_peers: self.config.max_peers,
            confirmed: self.authority.registry().count(AuthorityState::Confirmed),
            entity_slots: self.authority.registry().len(),
            snapshots_sent: self.snapshots_sent,
            uptime_secs: self.start_time.elapsed().as_secs(),
            avatar: *self.authority.avatar(),
            network: self.link.stats(),
        }
    }

    pub fn peer_addrs(&self) -> Vec<String> {
        self.link
            .peers()
            .into_iter()
            .map(|(peer, addr)| format!("{} {}", peer, addr))
            .collect()
    }

    pub fn entity_positions(&self) -> Vec<(u16, Vec2)> {
        self.authority.registry().visible().collect()
    }
}

#[derive(Debug, Clone)]
pub struct ServerStats {
    pub frame: u64,
    pub tick_rate: u32,
    pub peer_count: usize,
    pub max_peers: usize,
    pub confirmed: usize,
    pub entity_slots: usize,
    pub snapshots_sent: u64,
    pub uptime_secs: u64,
    pub avatar: Avatar,
    pub network: NetworkStats,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn server() -> GameServer {
        GameServer::new(ServerConfig {
            bind_addr: "127.0.0.1:0".to_string(),
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_spawn_ahead_confirms_in_front_of_avatar() {
        let mut server = server();
        server.spawn_ahead();

        let events: Vec<_> = server.drain_events().collect();
        assert!(matches!(
            events.as_slice(),
            [ServerEvent::EntitySpawned {
                id: 0,
                origin: SpawnOrigin::Local
            }]
        ));

        // Avatar starts at the arena center facing +y.
        let entities = server.entity_positions();
        assert_eq!(entities.len(), 1);
        assert!((entities[0].1 - Vec2::new(350.0, 230.0)).length() < 1e-3);
        assert_eq!(server.stats().confirmed, 1);
    }

    #[test]
    fn test_steering_lasts_a_few_ticks() {
        let mut server = server();
        server.steer(1.0, 0.0);
        for _ in 0..10 {
            server.tick();
        }

        let expected = STEER_HOLD_TICKS as f32 * 3.0 / 60.0;
        assert!((server.stats().avatar.angle - expected).abs() < 1e-5);
        assert_eq!(server.stats().frame, 10);
    }

    #[test]
    fn test_snapshots_counted_per_packet_interval() {
        let mut server = server();
        for _ in 0..12 {
            server.tick();
        }
        assert_eq!(server.stats().snapshots_sent, 2);
    }
}
