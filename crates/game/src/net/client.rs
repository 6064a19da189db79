use std::net::{SocketAddr, TcpStream as StdTcpStream, ToSocketAddrs};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use bytes::Bytes;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::{self, error::TrySendError};
use tokio_util::sync::CancellationToken;

use super::protocol::{MAX_MESSAGE_SIZE, PEER_LIMIT_NOTICE, decode_all, decode_game_state};
use super::runtime::NetworkThread;
use super::stats::{LinkStats, NetworkStats};
use super::transport::TransportError;
use crate::snapshot::SharedStateBuffer;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const OUTBOUND_QUEUE_DEPTH: usize = 32;

/// Participant side of the transport. Received snapshots go straight into
/// the shared state buffer; spawn requests are written from a queue.
pub struct ClientLink {
    remote_addr: SocketAddr,
    outbound: mpsc::Sender<Bytes>,
    connected: Arc<AtomicBool>,
    stats: Arc<LinkStats>,
    thread: NetworkThread,
}

impl ClientLink {
    pub fn connect<A: ToSocketAddrs>(
        addr: A,
        timeout: Duration,
        states: SharedStateBuffer,
    ) -> Result<Self, TransportError> {
        let remote_addr = addr
            .to_socket_addrs()
            .map_err(|_| TransportError::Resolve)?
            .next()
            .ok_or(TransportError::Resolve)?;

        log::info!("Connecting to {}", remote_addr);
        let stream = StdTcpStream::connect_timeout(&remote_addr, timeout).map_err(|source| {
            TransportError::Connect {
                addr: remote_addr,
                source,
            }
        })?;
        stream.set_nonblocking(true).map_err(TransportError::Runtime)?;
        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("Could not disable Nagle: {}", e);
        }

        let connected = Arc::new(AtomicBool::new(true));
        let stats = Arc::new(LinkStats::default());
        let (outbound, outbound_rx) = mpsc::channel(OUTBOUND_QUEUE_DEPTH);

        let task_connected = Arc::clone(&connected);
        let task_stats = Arc::clone(&stats);
        let thread = NetworkThread::spawn("ghostlink-client-net", move |cancel| {
            run_connection(stream, outbound_rx, states, task_connected, task_stats, cancel)
        })
        .map_err(TransportError::Runtime)?;

        log::info!("Connected to {}", remote_addr);

        Ok(Self {
            remote_addr,
            outbound,
            connected,
            stats,
            thread,
        })
    }

    pub fn remote_addr(&self) -> SocketAddr {
        self.remote_addr
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    /// Queues one encoded message for the host without blocking.
    pub fn send(&self, frame: Bytes) -> Result<(), TransportError> {
        if !self.is_connected() {
            return Err(TransportError::Disconnected);
        }
        match self.outbound.try_send(frame) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => {
                self.stats.record_dropped();
                Err(TransportError::QueueFull)
            }
            Err(TrySendError::Closed(_)) => Err(TransportError::Disconnected),
        }
    }

    pub fn stats(&self) -> NetworkStats {
        self.stats.snapshot()
    }

    pub fn shutdown(&mut self) {
        self.thread.shutdown();
        self.connected.store(false, Ordering::SeqCst);
    }
}

async fn run_connection(
    stream: StdTcpStream,
    mut outbound: mpsc::Receiver<Bytes>,
    states: SharedStateBuffer,
    connected: Arc<AtomicBool>,
    stats: Arc<LinkStats>,
    cancel: CancellationToken,
) {
    let stream = match TcpStream::from_std(stream) {
        Ok(stream) => stream,
        Err(e) => {
            log::error!("Failed to register connection: {}", e);
            connected.store(false, Ordering::SeqCst);
            return;
        }
    };
    let (mut reader, mut writer) = stream.into_split();

    let write_loop = async {
        while let Some(frame) = outbound.recv().await {
            match writer.write_all(&frame).await {
                Ok(()) => stats.record_sent(frame.len()),
                Err(e) => {
                    log::warn!("Failed to send to host: {}", e);
                    stats.record_send_failure();
                }
            }
        }
    };

    let read_loop = async {
        let mut buf = [0u8; MAX_MESSAGE_SIZE];
        loop {
            let len = match reader.read(&mut buf).await {
                Ok(0) => {
                    log::info!("Connection closed by host");
                    break;
                }
                Ok(len) => len,
                Err(e) => {
                    log::warn!("Failed to read from host: {}", e);
                    break;
                }
            };

            if buf[..len].starts_with(PEER_LIMIT_NOTICE) {
                log::warn!("Host refused the connection: peer limit reached");
                break;
            }

            let (snapshots, error) = decode_all(&buf[..len], decode_game_state);
            stats.record_received(snapshots.len(), len);
            if let Some(e) = error {
                log::warn!("Dropping malformed message from host: {}", e);
                stats.record_malformed();
            }
            for snapshot in snapshots {
                states.push(snapshot);
            }
        }
    };

    tokio::select! {
        _ = cancel.cancelled() => {}
        _ = write_loop => {}
        _ = read_loop => {}
    }

    connected.store(false, Ordering::SeqCst);
}
