use std::io;
use std::net::SocketAddr;

#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind { addr: SocketAddr, source: io::Error },
    #[error("failed to connect to {addr}: {source}")]
    Connect { addr: SocketAddr, source: io::Error },
    #[error("address did not resolve")]
    Resolve,
    #[error("network runtime error: {0}")]
    Runtime(io::Error),
    #[error("outbound queue is full")]
    QueueFull,
    #[error("connection closed")]
    Disconnected,
}
