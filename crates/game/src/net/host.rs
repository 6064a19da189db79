use std::net::{SocketAddr, TcpListener as StdTcpListener, ToSocketAddrs};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use super::peers::{BroadcastReport, PeerId, PeerList};
use super::protocol::{
    MAX_MESSAGE_SIZE, PEER_LIMIT_NOTICE, SpawnEntityPayload, decode_all, decode_spawn_request,
};
use super::runtime::NetworkThread;
use super::stats::{LinkStats, NetworkStats};
use super::transport::TransportError;

/// Frames queued per peer before new ones are dropped.
pub const PEER_QUEUE_DEPTH: usize = 8;
pub const DEFAULT_MAX_PEERS: usize = 255;

/// Pause after a failed accept before trying again.
const ACCEPT_BACKOFF: Duration = Duration::from_millis(100);
/// How long a turned-away connection gets to take the notice.
const REJECT_WRITE_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Debug, Clone, PartialEq)]
pub enum HostEvent {
    PeerConnected { peer: PeerId, addr: SocketAddr },
    PeerDisconnected { peer: PeerId },
    PeerRejected { addr: SocketAddr },
    SpawnRequested { peer: PeerId, request: SpawnEntityPayload },
}

type SharedPeers = Arc<Mutex<PeerList>>;

fn lock_peers(peers: &SharedPeers) -> MutexGuard<'_, PeerList> {
    peers.lock().unwrap_or_else(PoisonError::into_inner)
}

#[derive(Clone)]
struct HostShared {
    peers: SharedPeers,
    events: mpsc::UnboundedSender<HostEvent>,
    stats: Arc<LinkStats>,
}

/// Authority side of the transport: accepts participants, fans snapshots
/// out to them and hands their spawn requests to the simulation.
pub struct HostLink {
    local_addr: SocketAddr,
    peers: SharedPeers,
    events: mpsc::UnboundedReceiver<HostEvent>,
    stats: Arc<LinkStats>,
    thread: NetworkThread,
}

impl HostLink {
    pub fn bind<A: ToSocketAddrs>(addr: A, max_peers: usize) -> Result<Self, TransportError> {
        let addrs: Vec<SocketAddr> = addr
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve)?
            .collect();
        let first = *addrs.first().ok_or(TransportError::Resolve)?;

        let listener = StdTcpListener::bind(&addrs[..])
            .map_err(|source| TransportError::Bind { addr: first, source })?;
        listener
            .set_nonblocking(true)
            .map_err(TransportError::Runtime)?;
        let local_addr = listener.local_addr().map_err(TransportError::Runtime)?;

        let peers: SharedPeers = Arc::new(Mutex::new(PeerList::new(max_peers)));
        let stats = Arc::new(LinkStats::default());
        let (events_tx, events) = mpsc::unbounded_channel();

        let shared = HostShared {
            peers: Arc::clone(&peers),
            events: events_tx,
            stats: Arc::clone(&stats),
        };

        let thread = NetworkThread::spawn("ghostlink-host-net", move |cancel| {
            accept_loop(listener, shared, cancel)
        })
        .map_err(TransportError::Runtime)?;

        log::info!("Listening on {}", local_addr);

        Ok(Self {
            local_addr,
            peers,
            events,
            stats,
            thread,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Queues one encoded message for every connected peer.
    pub fn broadcast(&self, frame: Bytes) -> BroadcastReport {
        let report = lock_peers(&self.peers).broadcast(&frame);
        for _ in 0..report.dropped {
            self.stats.record_dropped();
        }
        report
    }

    /// Events received since the last call, oldest first.
    pub fn drain_events(&mut self) -> Vec<HostEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }

    pub fn peer_count(&self) -> usize {
        lock_peers(&self.peers).len()
    }

    pub fn peers(&self) -> Vec<(PeerId, SocketAddr)> {
        lock_peers(&self.peers).addrs()
    }

    pub fn stats(&self) -> NetworkStats {
        self.stats.snapshot()
    }

    pub fn shutdown(&mut self) {
        self.thread.shutdown();
    }
}

async fn accept_loop(listener: StdTcpListener, shared: HostShared, cancel: CancellationToken) {
    let listener = match TcpListener::from_std(listener) {
        Ok(listener) => listener,
        Err(e) => {
            log::error!("Failed to register listener: {}", e);
            return;
        }
    };

    let mut peer_tasks = JoinSet::new();

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, addr)) => {
                    let (outbound_tx, outbound_rx) = mpsc::channel(PEER_QUEUE_DEPTH);
                    let Some(peer) = lock_peers(&shared.peers).insert(addr, outbound_tx) else {
                        log::warn!("Rejecting {}: peer limit reached", addr);
                        let _ = shared.events.send(HostEvent::PeerRejected { addr });
                        peer_tasks.spawn(reject_peer(stream, addr));
                        continue;
                    };

                    log::info!("Peer {} connected from {}", peer, addr);
                    let _ = shared.events.send(HostEvent::PeerConnected { peer, addr });

                    peer_tasks.spawn(serve_peer(
                        peer,
                        stream,
                        outbound_rx,
                        shared.clone(),
                        cancel.child_token(),
                    ));
                }
                Err(e) => {
                    log::warn!("Failed to accept incoming connection: {}", e);
                    if !accept_backoff(&cancel).await {
                        break;
                    }
                }
            },
            Some(_) = peer_tasks.join_next(), if !peer_tasks.is_empty() => {}
        }
    }

    peer_tasks.shutdown().await;
}

/// Waits out `ACCEPT_BACKOFF`. Returns `false` if cancelled meanwhile.
async fn accept_backoff(cancel: &CancellationToken) -> bool {
    tokio::select! {
        _ = cancel.cancelled() => false,
        _ = tokio::time::sleep(ACCEPT_BACKOFF) => true,
    }
}

/// Tells a connection over the peer limit why it is being closed.
async fn reject_peer(mut stream: TcpStream, addr: SocketAddr) {
    match tokio::time::timeout(REJECT_WRITE_TIMEOUT, stream.write_all(PEER_LIMIT_NOTICE)).await {
        Ok(Ok(())) => {
            let _ = stream.shutdown().await;
        }
        Ok(Err(e)) => log::debug!("Could not notify rejected {}: {}", addr, e),
        Err(_) => log::debug!("Timed out notifying rejected {}", addr),
    }
}

async fn serve_peer(
    peer: PeerId,
    stream: TcpStream,
    mut outbound: mpsc::Receiver<Bytes>,
    shared: HostShared,
    cancel: CancellationToken,
) {
    if let Err(e) = stream.set_nodelay(true) {
        log::debug!("Peer {}: could not disable Nagle: {}", peer, e);
    }
    let (mut reader, mut writer) = stream.into_split();

    let write_loop = async {
        while let Some(frame) = outbound.recv().await {
            match writer.write_all(&frame).await {
                Ok(()) => shared.stats.record_sent(frame.len()),
                Err(e) => {
                    log::warn!("Failed to send game state to peer {}: {}", peer, e);
                    shared.stats.record_send_failure();
                }
            }
        }
    };

    let read_loop = async {
        let mut buf = [0u8; MAX_MESSAGE_SIZE];
        loop {
            let len = match reader.read(&mut buf).await {
                Ok(0) => break,
                Ok(len) => len,
                Err(e) => {
                    log::warn!("Failed to read from peer {}: {}", peer, e);
                    break;
                }
            };

            let (requests, error) = decode_all(&buf[..len], decode_spawn_request);
            shared.stats.record_received(requests.len(), len);
            if let Some(e) = error {
                log::warn!("Dropping malformed message from peer {}: {}", peer, e);
                shared.stats.record_malformed();
            }
            for request in requests {
                let _ = shared
                    .events
                    .send(HostEvent::SpawnRequested { peer, request });
            }
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = write_loop => {}
        _ = read_loop => {}
    }

    lock_peers(&shared.peers).mark_closed(peer);
    log::info!("Peer {} disconnected", peer);
    let _ = shared.events.send(HostEvent::PeerDisconnected { peer });
}
