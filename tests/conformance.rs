//! Both backends must be indistinguishable to the caller.

mod support;

use pixmatrix::{
    Canvas, DeviceTransport, Endpoint, Error, NetworkBackend, Rgb, Session, SessionConfig,
    ShapeStyle, SimulatorBackend, TransportError, encoder,
};
use std::{net::SocketAddr, time::Duration};
use support::{MockPeer, Reply, dead_addr};

const TIMEOUT: Duration = Duration::from_millis(300);

trait Target: DeviceTransport {
    fn endpoint(addr: SocketAddr) -> Endpoint;
    fn wrong_endpoint() -> Endpoint;
}

impl Target for NetworkBackend {
    fn endpoint(addr: SocketAddr) -> Endpoint {
        Endpoint::Device(addr)
    }

    fn wrong_endpoint() -> Endpoint {
        Endpoint::simulator()
    }
}

impl Target for SimulatorBackend {
    fn endpoint(addr: SocketAddr) -> Endpoint {
        Endpoint::Simulator { port: addr.port() }
    }

    fn wrong_endpoint() -> Endpoint {
        Endpoint::Device("127.0.0.1:80".parse().unwrap())
    }
}

fn draw(canvas: &mut Canvas) {
    canvas.clear(Rgb::RED);
    pixmatrix::raster::draw_rectangle(canvas, 27, 12, 37, 52, ShapeStyle::filled(Rgb::WHITE));
    pixmatrix::raster::draw_rectangle(canvas, 12, 27, 52, 37, ShapeStyle::filled(Rgb::WHITE));
    pixmatrix::raster::draw_line(canvas, 0, 0, 63, 63, Rgb::BLUE);
}

fn push_drawing<T: Target>() -> Vec<u8> {
    let peer = MockPeer::spawn(Reply::Status(0), 1);
    let transport = T::connect(&T::endpoint(peer.addr()), TIMEOUT).unwrap();
    assert_eq!(transport.peer().port(), peer.port());

    let mut session = Session::with_transport(transport, &SessionConfig::default());
    draw(session.canvas_mut());
    let ack = session.push(None).unwrap();
    assert!(ack.is_ok());

    session.close();
    peer.finish()
}

fn rejected_status_is_reported<T: Target>() {
    let peer = MockPeer::spawn(Reply::Status(3), 1);
    let mut transport = T::connect(&T::endpoint(peer.addr()), TIMEOUT).unwrap();

    let frame = encoder::encode_still(&Canvas::new());
    assert!(matches!(
        transport.send_frame(&frame),
        Err(TransportError::Rejected(3))
    ));

    transport.close();
    peer.finish();
}

fn silent_peer_times_out_then_redials<T: Target>() {
    let peer = MockPeer::spawn(Reply::Silent, 2);
    let mut transport = T::connect(&T::endpoint(peer.addr()), TIMEOUT).unwrap();
    let frame = encoder::encode_still(&Canvas::new());

    assert!(matches!(
        transport.send_frame(&frame),
        Err(TransportError::Timeout(timeout)) if timeout == TIMEOUT
    ));
    // the same frame goes out again over a fresh connection
    assert!(matches!(
        transport.send_frame(&frame),
        Err(TransportError::Timeout(_))
    ));

    transport.close();
    let received = peer.finish();
    assert_eq!(received.len(), 2 * frame.bytes().len());
}

fn closed_transport_refuses_to_send<T: Target>() {
    let peer = MockPeer::spawn(Reply::Status(0), 1);
    let mut transport = T::connect(&T::endpoint(peer.addr()), TIMEOUT).unwrap();

    transport.close();
    transport.close();
    assert!(matches!(
        transport.send_frame(&encoder::encode_still(&Canvas::new())),
        Err(TransportError::Closed)
    ));
    assert!(peer.finish().is_empty());
}

fn unreachable_endpoint_fails_to_connect<T: Target>() {
    let result = T::connect(&T::endpoint(dead_addr()), TIMEOUT);
    assert!(matches!(result, Err(Error::Connection { .. })));
}

fn foreign_endpoint_kind_is_rejected<T: Target>() {
    let result = T::connect(&T::wrong_endpoint(), TIMEOUT);
    assert!(matches!(result, Err(Error::InvalidArgument(_))));
}

fn run_suite<T: Target>() {
    let received = push_drawing::<T>();
    let mut expected = Canvas::new();
    draw(&mut expected);
    assert_eq!(received, encoder::encode_canvas(&expected, 1, 100).bytes());

    rejected_status_is_reported::<T>();
    silent_peer_times_out_then_redials::<T>();
    closed_transport_refuses_to_send::<T>();
    unreachable_endpoint_fails_to_connect::<T>();
    foreign_endpoint_kind_is_rejected::<T>();
}

#[test]
fn network_backend_conformance() {
    run_suite::<NetworkBackend>();
}

#[test]
fn simulator_backend_conformance() {
    run_suite::<SimulatorBackend>();
}

#[test]
fn backends_produce_identical_bytes() {
    let network = push_drawing::<NetworkBackend>();
    let simulator = push_drawing::<SimulatorBackend>();

    assert!(!network.is_empty());
    assert_eq!(network, simulator);
}

#[test]
fn session_connect_picks_backend_from_endpoint() {
    let peer = MockPeer::spawn(Reply::Status(0), 1);
    let config = SessionConfig {
        endpoint: Endpoint::Simulator { port: peer.port() },
        timeout: TIMEOUT,
        ..SessionConfig::default()
    };

    let mut session = Session::connect(&config).unwrap();
    assert!(matches!(session.transport(), pixmatrix::Backend::Simulator(_)));
    session.set_brightness(40).unwrap();
    session.close();

    assert!(!peer.finish().is_empty());
}

#[test]
fn unreachable_session_leaves_nothing_behind() {
    let config = SessionConfig {
        endpoint: Endpoint::Device(dead_addr()),
        timeout: TIMEOUT,
        ..SessionConfig::default()
    };

    assert!(matches!(
        Session::connect(&config),
        Err(Error::Connection { .. })
    ));
}

#[test]
fn failed_send_keeps_canvas_and_frame_can_be_resent() {
    let peer = MockPeer::spawn(Reply::Silent, 1);
    let config = SessionConfig {
        endpoint: Endpoint::Device(peer.addr()),
        timeout: TIMEOUT,
        ..SessionConfig::default()
    };

    let mut session = Session::connect(&config).unwrap();
    draw(session.canvas_mut());
    let before = session.canvas().clone();

    let frame = session.encode(None);
    assert!(matches!(
        session.send(&frame),
        Err(Error::Transport(TransportError::Timeout(_)))
    ));
    assert_eq!(session.canvas(), &before);
    session.close();
    peer.finish();

    let peer = MockPeer::spawn(Reply::Status(0), 1);
    let mut retry = NetworkBackend::connect(&Endpoint::Device(peer.addr()), TIMEOUT).unwrap();
    retry.send_frame(&frame).unwrap();
    retry.close();
    assert_eq!(peer.finish(), frame.bytes());
}
