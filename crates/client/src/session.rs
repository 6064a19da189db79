use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

use bytes::Bytes;
use glam::Vec2;

use ghostlink::{
    AuthorityState, Avatar, ClientLink, FixedTimestep, InterpolationMode, NetworkStats,
    Participant, RegistryError, SharedStateBuffer, SpawnEntityPayload, TransportError,
};

use crate::config::ClientConfig;

/// Spawn requests are placed this far in front of the avatar.
const SPAWN_DISTANCE: f32 = 30.0;

#[derive(Debug, Clone)]
pub enum ClientEvent {
    SpawnRequested { id: u16, command_frame: u64 },
    SpawnIgnored { reason: RegistryError },
    SendFailed { error: String },
    Disconnected,
}

/// Participant session: the local simulation plus the link feeding it.
pub struct GameClient {
    link: ClientLink,
    participant: Participant,
    timestep: FixedTimestep,
    last_frame_time: Instant,
    auto_spawn: Option<Duration>,
    last_auto_spawn: Instant,
    spawn_buf: [u8; SpawnEntityPayload::ENCODED_LEN],
    spawns_requested: u64,
    disconnect_reported: bool,
    running: Arc<AtomicBool>,
    pending_events: VecDeque<ClientEvent>,
}

impl GameClient {
    pub fn connect(config: ClientConfig) -> Result<Self, TransportError> {
        let states = SharedStateBuffer::default();
        let link = ClientLink::connect(
            config.server_addr.as_str(),
            config.connect_timeout,
            states.clone(),
        )?;
        let timestep = FixedTimestep::new(config.simulation.tick_rate);
        let participant = Participant::new(config.simulation, states);

        Ok(Self {
            link,
            participant,
            timestep,
            last_frame_time: Instant::now(),
            auto_spawn: config.auto_spawn,
            last_auto_spawn: Instant::now(),
            spawn_buf: [0; SpawnEntityPayload::ENCODED_LEN],
            spawns_requested: 0,
            disconnect_reported: false,
            running: Arc::new(AtomicBool::new(true)),
            pending_events: VecDeque::new(),
        })
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.link.remote_addr()
    }

    pub fn running(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.running)
    }

    pub fn drain_events(&mut self) -> impl Iterator<Item = ClientEvent> + '_ {
        self.pending_events.drain(..)
    }

    /// Headless loop; ends on shutdown request or when the host goes away.
    pub fn run(&mut self) {
        while self.running.load(Ordering::SeqCst) {
            self.tick_once();
            for event in self.pending_events.drain(..) {
                if let ClientEvent::SpawnRequested { id, command_frame } = event {
                    log::info!("Requested entity {} at frame {}", id, command_frame);
                }
            }
            if !self.link.is_connected() {
                break;
            }
            std::thread::sleep(Duration::from_millis(1));
        }
        self.shutdown();
    }

    pub fn shutdown(&mut self) {
        self.link.shutdown();
    }

    pub fn tick_once(&mut self) {
        let now = Instant::now();
        let delta = now - self.last_frame_time;
        self.last_frame_time = now;
        self.timestep.accumulate(delta.as_secs_f32());

        while self.timestep.consume_tick() {
            self.participant.tick();
        }

        if let Some(period) = self.auto_spawn {
            if now.duration_since(self.last_auto_spawn) >= period {
                self.last_auto_spawn = now;
                self.request_spawn();
            }
        }

        if !self.disconnect_reported && !self.link.is_connected() {
            self.disconnect_reported = true;
            log::warn!("Connection to host {} lost", self.link.remote_addr());
            self.pending_events.push_back(ClientEvent::Disconnected);
        }
    }

    /// Predicts an entity ahead of the avatar and asks the host to confirm
    /// it. A full registry ignores the request; a request that cannot be
    /// sent takes its ghost back.
    pub fn request_spawn(&mut self) {
        let avatar = self.participant.avatar();
        let heading = avatar.heading();
        let position = avatar.position + heading * SPAWN_DISTANCE;

        let request = match self.participant.request_spawn(position, heading) {
            Ok(request) => request,
            Err(reason) => {
                log::debug!("Ignoring spawn request: {}", reason);
                self.pending_events
                    .push_back(ClientEvent::SpawnIgnored { reason });
                return;
            }
        };

        let event = match request
            .encode(&mut self.spawn_buf)
            .map_err(|e| e.to_string())
            .and_then(|len| {
                self.link
                    .send(Bytes::copy_from_slice(&self.spawn_buf[..len]))
                    .map_err(|e| e.to_string())
            }) {
            Ok(()) => {
                self.spawns_requested += 1;
                ClientEvent::SpawnRequested {
                    id: request.id,
                    command_frame: request.command_frame,
                }
            }
            Err(error) => {
                log::warn!("Failed to send spawn request for entity {}: {}", request.id, error);
                if let Err(e) = self.participant.cancel_spawn(request.id) {
                    log::error!("Could not retract entity {}: {}", request.id, e);
                }
                ClientEvent::SendFailed { error }
            }
        };
        self.pending_events.push_back(event);
    }

    /// Every visible entity with its authority state.
    pub fn entities(&self) -> Vec<(Vec2, AuthorityState)> {
        self.participant
            .registry()
            .iter()
            .filter(|e| e.is_visible())
            .map(|e| (e.position, e.state))
            .collect()
    }

    pub fn stats(&self) -> ClientStats {
        let registry = self.participant.registry();
        let states = self.participant.states();
        let interpolator = self.participant.interpolator();

        ClientStats {
            frame: self.participant.clock().frame(),
            tick_rate: self.timestep.tick_rate(),
            connected: self.link.is_connected(),
            buffered: states.len(),
            evicted: states.evicted(),
            predicted: registry.count(AuthorityState::Predicted),
            confirmed: registry.count(AuthorityState::Confirmed),
            spawns_requested: self.spawns_requested,
            avatar: *self.participant.avatar(),
            mode: interpolator.mode(),
            frames_per_packet: interpolator.frames_per_packet(),
            network: self.link.stats(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientStats {
    pub frame: u64,
    pub tick_rate: u32,
    pub connected: bool,
    pub buffered: usize,
    pub evicted: u64,
    pub predicted: usize,
    pub confirmed: usize,
    pub spawns_requested: u64,
    pub avatar: Avatar,
    pub mode: InterpolationMode,
    pub frames_per_packet: u32,
    pub network: NetworkStats,
}

#[cfg(test)]
mod tests {
    use std::net::TcpListener;
    use std::thread;

    use ghostlink::{HostEvent, HostLink, SimulationConfig};

    use super::*;

    fn connect_to(host: &HostLink, entity_count: u16) -> GameClient {
        GameClient::connect(ClientConfig {
            server_addr: host.local_addr().to_string(),
            simulation: SimulationConfig {
                entity_count,
                ..Default::default()
            },
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_spawn_request_reaches_host() {
        let mut host = HostLink::bind("127.0.0.1:0", 4).unwrap();
        let mut client = connect_to(&host, 4);

        client.request_spawn();
        let events: Vec<_> = client.drain_events().collect();
        assert!(matches!(
            events.as_slice(),
            [ClientEvent::SpawnRequested { id: 0, .. }]
        ));
        assert_eq!(client.stats().predicted, 1);

        let start = Instant::now();
        let request = loop {
            let found = host.drain_events().into_iter().find_map(|e| match e {
                HostEvent::SpawnRequested { request, .. } => Some(request),
                _ => None,
            });
            if let Some(request) = found {
                break request;
            }
            assert!(start.elapsed() < Duration::from_secs(2), "no spawn request");
            thread::sleep(Duration::from_millis(5));
        };

        assert_eq!(request.id, 0);
        // Avatar starts centered, facing +y.
        assert!((request.position - Vec2::new(350.0, 230.0)).length() < 1e-3);
        assert_eq!(request.direction, Vec2::new(0.0, 1.0));
    }

    #[test]
    fn test_full_registry_ignores_spawn() {
        let host = HostLink::bind("127.0.0.1:0", 4).unwrap();
        let mut client = connect_to(&host, 1);

        client.request_spawn();
        client.request_spawn();

        let events: Vec<_> = client.drain_events().collect();
        assert!(matches!(
            events.as_slice(),
            [
                ClientEvent::SpawnRequested { .. },
                ClientEvent::SpawnIgnored {
                    reason: RegistryError::SlotExhausted
                }
            ]
        ));
        assert_eq!(client.stats().spawns_requested, 1);
    }

    #[test]
    fn test_unsent_spawn_releases_its_slot() {
        let mut host = HostLink::bind("127.0.0.1:0", 4).unwrap();
        let mut client = connect_to(&host, 2);

        host.shutdown();
        let start = Instant::now();
        while client.stats().connected {
            assert!(start.elapsed() < Duration::from_secs(2), "still connected");
            thread::sleep(Duration::from_millis(5));
        }

        for _ in 0..3 {
            client.request_spawn();
        }
        let events: Vec<_> = client.drain_events().collect();
        assert_eq!(events.len(), 3);
        assert!(
            events
                .iter()
                .all(|e| matches!(e, ClientEvent::SendFailed { .. }))
        );

        let stats = client.stats();
        assert_eq!(stats.predicted, 0);
        assert_eq!(stats.spawns_requested, 0);
        assert!(client.entities().is_empty());
    }

    #[test]
    fn test_connect_failure_is_reported() {
        let addr = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap()
        };
        let result = GameClient::connect(ClientConfig {
            server_addr: addr.to_string(),
            ..Default::default()
        });
        assert!(matches!(result, Err(TransportError::Connect { .. })));
    }
}
