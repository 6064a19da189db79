use std::fmt;
use std::net::SocketAddr;

use bytes::Bytes;
use tokio::sync::mpsc::{self, error::TrySendError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeerId(pub u32);

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug)]
struct Peer {
    id: PeerId,
    addr: SocketAddr,
    outbound: mpsc::Sender<Bytes>,
    alive: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BroadcastReport {
    pub delivered: usize,
    pub dropped: usize,
    pub removed: usize,
}

/// Connected participants on the host side.
///
/// Dead peers are only marked during a pass and removed afterwards, so a
/// removal never shifts an entry that has not been visited yet.
#[derive(Debug)]
pub struct PeerList {
    peers: Vec<Peer>,
    next_id: u32,
    max_peers: usize,
}

impl PeerList {
    pub fn new(max_peers: usize) -> Self {
        Self {
            peers: Vec::with_capacity(max_peers),
            next_id: 1,
            max_peers,
        }
    }

    /// Registers a peer and returns its id, or `None` when the list is full.
    pub fn insert(&mut self, addr: SocketAddr, outbound: mpsc::Sender<Bytes>) -> Option<PeerId> {
        self.compact();
        if self.peers.len() >= self.max_peers {
            return None;
        }

        let id = PeerId(self.next_id);
        self.next_id = self.next_id.wrapping_add(1);
        self.peers.push(Peer {
            id,
            addr,
            outbound,
            alive: true,
        });
        Some(id)
    }

    pub fn mark_closed(&mut self, id: PeerId) {
        if let Some(peer) = self.peers.iter_mut().find(|p| p.id == id) {
            peer.alive = false;
        }
    }

    /// Queues `frame` for every live peer without waiting on any of them.
    pub fn broadcast(&mut self, frame: &Bytes) -> BroadcastReport {
        let mut report = BroadcastReport::default();

        for peer in self.peers.iter_mut().filter(|p| p.alive) {
            match peer.outbound.try_send(frame.clone()) {
                Ok(()) => report.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    log::warn!(
                        "Peer {} ({}) is not keeping up, dropping message",
                        peer.id,
                        peer.addr
                    );
                    report.dropped += 1;
                }
                Err(TrySendError::Closed(_)) => {
                    peer.alive = false;
                }
            }
        }

        report.removed = self.compact();
        report
    }

    /// Removes every peer marked dead and returns how many were dropped.
    pub fn compact(&mut self) -> usize {
        let before = self.peers.len();
        self.peers.retain(|peer| {
            if !peer.alive {
                log::info!("Peer {} ({}) removed", peer.id, peer.addr);
            }
            peer.alive
        });
        before - self.peers.len()
    }

    pub fn len(&self) -> usize {
        self.peers.iter().filter(|p| p.alive).count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn addrs(&self) -> Vec<(PeerId, SocketAddr)> {
        self.peers
            .iter()
            .filter(|p| p.alive)
            .map(|p| (p.id, p.addr))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    #[test]
    fn test_rejects_beyond_capacity() {
        let mut peers = PeerList::new(2);
        let (tx, _rx) = mpsc::channel(4);

        assert!(peers.insert(addr(1), tx.clone()).is_some());
        assert!(peers.insert(addr(2), tx.clone()).is_some());
        assert!(peers.insert(addr(3), tx).is_none());
        assert_eq!(peers.len(), 2);
    }

    #[test]
    fn test_adjacent_dead_peers_are_all_removed() {
        let mut peers = PeerList::new(8);
        let mut receivers = Vec::new();
        let mut ids = Vec::new();
        for port in 0..4 {
            let (tx, rx) = mpsc::channel(4);
            ids.push(peers.insert(addr(port), tx).unwrap());
            receivers.push(Some(rx));
        }

        // Two neighbours go away at once; a swap-remove during iteration
        // would skip the second one.
        receivers[1] = None;
        receivers[2] = None;

        let report = peers.broadcast(&Bytes::from_static(b"snapshot"));
        assert_eq!(report.delivered, 2);
        assert_eq!(report.removed, 2);

        let remaining: Vec<PeerId> = peers.addrs().into_iter().map(|(id, _)| id).collect();
        assert_eq!(remaining, vec![ids[0], ids[3]]);

        for rx in receivers.iter_mut().flatten() {
            assert_eq!(rx.try_recv().unwrap(), Bytes::from_static(b"snapshot"));
        }
    }

    #[test]
    fn test_full_queue_drops_without_disconnecting() {
        let mut peers = PeerList::new(4);
        let (slow_tx, _slow_rx) = mpsc::channel(1);
        let (fast_tx, mut fast_rx) = mpsc::channel(4);
        peers.insert(addr(1), slow_tx).unwrap();
        peers.insert(addr(2), fast_tx).unwrap();

        peers.broadcast(&Bytes::from_static(b"a"));
        let report = peers.broadcast(&Bytes::from_static(b"b"));

        assert_eq!(report.delivered, 1);
        assert_eq!(report.dropped, 1);
        assert_eq!(report.removed, 0);
        assert_eq!(peers.len(), 2);
        assert_eq!(fast_rx.try_recv().unwrap(), Bytes::from_static(b"a"));
        assert_eq!(fast_rx.try_recv().unwrap(), Bytes::from_static(b"b"));
    }

    #[test]
    fn test_marked_peer_is_skipped_then_compacted() {
        let mut peers = PeerList::new(4);
        let (tx, mut rx) = mpsc::channel(4);
        let id = peers.insert(addr(1), tx).unwrap();

        peers.mark_closed(id);
        let report = peers.broadcast(&Bytes::from_static(b"x"));

        assert_eq!(report.delivered, 0);
        assert_eq!(report.removed, 1);
        assert!(peers.is_empty());
        assert!(rx.try_recv().is_err());
    }
}
