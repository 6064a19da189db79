use std::net::{SocketAddr, TcpListener};
use std::thread;
use std::time::{Duration, Instant};

use bytes::Bytes;
use glam::Vec2;

use ghostlink::{
    ClientLink, EntityPayload, GameStatePayload, HostEvent, HostLink, MAX_MESSAGE_SIZE,
    SharedStateBuffer, SpawnEntityPayload, TransportError,
};

const TIMEOUT: Duration = Duration::from_secs(2);

fn wait_for<T>(mut poll: impl FnMut() -> Option<T>) -> Option<T> {
    let start = Instant::now();
    while start.elapsed() < TIMEOUT {
        if let Some(value) = poll() {
            return Some(value);
        }
        thread::sleep(Duration::from_millis(5));
    }
    None
}

fn wait_for_event(host: &mut HostLink, mut matches: impl FnMut(&HostEvent) -> bool) -> HostEvent {
    wait_for(|| host.drain_events().into_iter().find(|e| matches(e)))
        .expect("host event not received")
}

fn encode_state(state: &GameStatePayload) -> Bytes {
    let mut buf = [0u8; MAX_MESSAGE_SIZE];
    let len = state.encode(&mut buf).unwrap();
    Bytes::copy_from_slice(&buf[..len])
}

fn connect(host: &HostLink) -> (ClientLink, SharedStateBuffer) {
    let states = SharedStateBuffer::default();
    let client = ClientLink::connect(host.local_addr(), TIMEOUT, states.clone()).unwrap();
    (client, states)
}

#[test]
fn test_snapshot_reaches_participant() {
    let mut host = HostLink::bind("127.0.0.1:0", 8).unwrap();
    let (_client, states) = connect(&host);
    wait_for_event(&mut host, |e| matches!(e, HostEvent::PeerConnected { .. }));

    let mut state = GameStatePayload::new(42, Vec2::new(1.0, 2.0), 0.5);
    state.entities.push(EntityPayload::new(3, Vec2::new(10.0, 20.0)));
    state.entities.push(EntityPayload::new(7, Vec2::new(30.0, 40.0)));

    let report = host.broadcast(encode_state(&state));
    assert_eq!(report.delivered, 1);

    let received = wait_for(|| states.front()).expect("snapshot not received");
    assert_eq!(received, state);
}

#[test]
fn test_spawn_request_reaches_host() {
    let mut host = HostLink::bind("127.0.0.1:0", 8).unwrap();
    let (client, _states) = connect(&host);
    let HostEvent::PeerConnected { peer, .. } =
        wait_for_event(&mut host, |e| matches!(e, HostEvent::PeerConnected { .. }))
    else {
        unreachable!()
    };

    let request = SpawnEntityPayload {
        command_frame: 77,
        id: 0,
        position: Vec2::new(5.0, 6.0),
        direction: Vec2::new(0.0, 1.0),
    };
    let mut buf = [0u8; SpawnEntityPayload::ENCODED_LEN];
    request.encode(&mut buf).unwrap();
    client.send(Bytes::copy_from_slice(&buf)).unwrap();

    let event = wait_for_event(&mut host, |e| matches!(e, HostEvent::SpawnRequested { .. }));
    assert_eq!(event, HostEvent::SpawnRequested { peer, request });
}

#[test]
fn test_broadcast_reaches_every_peer() {
    let mut host = HostLink::bind("127.0.0.1:0", 8).unwrap();
    let (_a, states_a) = connect(&host);
    let (_b, states_b) = connect(&host);
    wait_for(|| (host.peer_count() == 2).then_some(())).expect("peers not registered");
    host.drain_events();

    let state = GameStatePayload::new(6, Vec2::ZERO, 0.0);
    assert_eq!(host.broadcast(encode_state(&state)).delivered, 2);

    assert_eq!(wait_for(|| states_a.front()), Some(state.clone()));
    assert_eq!(wait_for(|| states_b.front()), Some(state));
}

#[test]
fn test_disconnected_peer_is_removed() {
    let mut host = HostLink::bind("127.0.0.1:0", 8).unwrap();
    let (mut client, _states) = connect(&host);
    wait_for_event(&mut host, |e| matches!(e, HostEvent::PeerConnected { .. }));

    client.shutdown();
    assert!(!client.is_connected());
    wait_for_event(&mut host, |e| matches!(e, HostEvent::PeerDisconnected { .. }));

    let report = host.broadcast(encode_state(&GameStatePayload::new(1, Vec2::ZERO, 0.0)));
    assert_eq!(report.delivered, 0);
    assert_eq!(host.peer_count(), 0);
}

#[test]
fn test_participant_sees_host_close() {
    let mut host = HostLink::bind("127.0.0.1:0", 8).unwrap();
    let (client, _states) = connect(&host);
    wait_for_event(&mut host, |e| matches!(e, HostEvent::PeerConnected { .. }));

    host.shutdown();
    wait_for(|| (!client.is_connected()).then_some(())).expect("client still connected");
    assert!(matches!(
        client.send(Bytes::from_static(b"late")),
        Err(TransportError::Disconnected)
    ));
}

#[test]
fn test_peer_limit_rejects_extra_connections() {
    let mut host = HostLink::bind("127.0.0.1:0", 1).unwrap();
    let (first, _) = connect(&host);
    wait_for_event(&mut host, |e| matches!(e, HostEvent::PeerConnected { .. }));

    let (second, _) = connect(&host);
    wait_for_event(&mut host, |e| matches!(e, HostEvent::PeerRejected { .. }));
    assert_eq!(host.peer_count(), 1);

    // The refused participant is told why and sees the link close.
    wait_for(|| (!second.is_connected()).then_some(())).expect("rejected link stayed open");
    assert_eq!(second.stats().malformed_messages, 0);
    assert!(first.is_connected());
}

#[test]
fn test_bind_and_connect_failures_are_reported() {
    let host = HostLink::bind("127.0.0.1:0", 8).unwrap();
    let taken = host.local_addr();
    assert!(matches!(
        HostLink::bind(taken, 8),
        Err(TransportError::Bind { .. })
    ));

    let free: SocketAddr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };
    assert!(matches!(
        ClientLink::connect(free, TIMEOUT, SharedStateBuffer::default()),
        Err(TransportError::Connect { .. })
    ));
}
